use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::diagnostics::PlotConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::ingest::{FrameLoadOptions, FrameSource};
use crate::interpolation::WindowConfig;
use crate::join::{ClassMap, ClassScheme, Polarity};
use crate::segmentation::config::{default_emotion_map, default_exclusion_fragments};
use crate::segmentation::SegmentationConfig;

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "PUPILFUSE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "pupilfuse.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlotSettings {
    pub enabled: bool,
    pub dir: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl Default for PlotSettings {
    fn default() -> Self {
        let defaults = PlotConfig::default();
        Self {
            enabled: defaults.enabled,
            dir: defaults.dir,
            width: defaults.width,
            height: defaults.height,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Holds `segments_{p}.csv` and `data_{p}.csv` per participant.
    pub pupil_dir: PathBuf,
    /// One sub-directory per class label with frames and times files.
    pub face_dir: PathBuf,
    pub output_dir: PathBuf,
    pub database_path: PathBuf,
    pub exclusion_fragments: Vec<String>,
    pub emotion_map: BTreeMap<String, String>,
    pub window_size: usize,
    pub period_ms: f64,
    pub class_scheme: ClassScheme,
    /// Sides for the `binary` scheme.
    pub polarity: Polarity,
    pub frame_source: FrameSource,
    pub require_images: bool,
    pub plot: PlotSettings,
}

impl Default for Settings {
    fn default() -> Self {
        let window = WindowConfig::default();
        Self {
            pupil_dir: PathBuf::from("pupil"),
            face_dir: PathBuf::from("faces"),
            output_dir: PathBuf::from("output"),
            database_path: PathBuf::from("output/interpolants.sqlite3"),
            exclusion_fragments: default_exclusion_fragments(),
            emotion_map: default_emotion_map(),
            window_size: window.window_size,
            period_ms: window.period_ms,
            class_scheme: ClassScheme::default(),
            polarity: Polarity::default(),
            frame_source: FrameSource::default(),
            require_images: true,
            plot: PlotSettings::default(),
        }
    }
}

impl Settings {
    /// Read settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let settings = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse settings in {}", path.display()))?
        } else {
            log::info!("No settings file at {}; using defaults", path.display());
            Settings::default()
        };

        settings
            .validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;
        Ok(settings)
    }

    /// Load from the path in `PUPILFUSE_CONFIG`, or `pupilfuse.json`.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        Self::load(&path)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.window_size == 0 {
            return Err(PipelineError::config("window_size", "must be at least 1"));
        }
        if !self.period_ms.is_finite() || self.period_ms <= 0.0 {
            return Err(PipelineError::config(
                "period_ms",
                format!("must be a positive number, got {}", self.period_ms),
            ));
        }
        if self.plot.width == 0 || self.plot.height == 0 {
            return Err(PipelineError::config(
                "plot",
                format!(
                    "dimensions must be non-zero, got {}x{}",
                    self.plot.width, self.plot.height
                ),
            ));
        }
        self.class_map()?;
        Ok(())
    }

    /// Classes for this run, built from the emotions the map can produce.
    pub fn class_map(&self) -> PipelineResult<ClassMap> {
        ClassMap::new(
            self.class_scheme,
            self.emotion_map.values().map(String::as_str),
            &self.polarity,
        )
    }

    pub fn segmentation(&self) -> SegmentationConfig {
        SegmentationConfig {
            exclusion_fragments: self.exclusion_fragments.clone(),
            emotion_map: self.emotion_map.clone(),
        }
    }

    pub fn window(&self) -> WindowConfig {
        WindowConfig {
            window_size: self.window_size,
            period_ms: self.period_ms,
        }
    }

    pub fn plot(&self) -> PlotConfig {
        PlotConfig {
            enabled: self.plot.enabled,
            dir: self.plot.dir.clone(),
            width: self.plot.width,
            height: self.plot.height,
        }
    }

    pub fn frames(&self) -> FrameLoadOptions {
        FrameLoadOptions {
            source: self.frame_source,
            require_images: self.require_images,
        }
    }

    pub fn joined_path(&self) -> PathBuf {
        self.output_dir.join("joined.jsonl")
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join("report.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.window().window_size, 100);
        assert_eq!(settings.window().period_ms, 10.0);
        assert_eq!(settings.class_scheme, ClassScheme::Multiclass);
    }

    #[test]
    fn partial_file_overrides_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pupilfuse.json");
        fs::write(
            &path,
            r#"{
                "window_size": 50,
                "class_scheme": "binary",
                "frame_source": "image_names",
                "plot": {"enabled": true}
            }"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();

        assert_eq!(settings.window_size, 50);
        assert_eq!(settings.class_scheme, ClassScheme::Binary);
        assert_eq!(settings.frame_source, FrameSource::ImageNames);
        assert!(settings.plot().enabled);
        assert_eq!(settings.plot().width, 1000);
        assert_eq!(settings.segmentation().emotion_for("3.mp4"), Some("fear"));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.window_size = 0;
        assert!(matches!(
            settings.validate(),
            Err(PipelineError::Config { field: "window_size", .. })
        ));

        let mut settings = Settings::default();
        settings.period_ms = f64::NAN;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.period_ms = -1.0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.plot.height = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pupilfuse.json");
        fs::write(&path, r#"{"period_ms": 0}"#).unwrap();
        assert!(Settings::load(&path).is_err());
    }

    #[test]
    fn custom_emotions_extend_the_class_vocabulary() {
        let mut settings = Settings::default();
        settings
            .emotion_map
            .insert("8.mp4".to_string(), "surprise".to_string());

        let classes = settings.class_map().unwrap();
        assert_eq!(classes.class_for("surprise"), Some("surprise"));
        assert_eq!(classes.index().len(), 8);

        settings.class_scheme = ClassScheme::Binary;
        assert!(matches!(
            settings.validate(),
            Err(PipelineError::Config { field: "polarity", .. })
        ));

        settings.polarity.negative.push("surprise".to_string());
        assert!(settings.validate().is_ok());
        assert_eq!(settings.class_map().unwrap().class_for("surprise"), Some("negative"));
    }
}

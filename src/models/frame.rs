//! Per-frame timestamp records and the joined records built from them.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::InterpolantKey;

/// Suffix the frame extractor appends to cropped frames.
pub const CROPPED_SUFFIX: &str = "c";
pub const FRAME_EXTENSION: &str = "png";

/// One extracted video frame, as listed by the imaging side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FrameRecord {
    pub participant: String,
    pub emotion: String,
    pub class_label: String,
    pub end_time: f64,
    pub image_reference: PathBuf,
}

impl FrameRecord {
    pub fn key(&self) -> InterpolantKey {
        InterpolantKey::new(self.participant.clone(), self.emotion.clone())
    }
}

/// A frame paired with the pupil window ending at its timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinedRecord {
    pub image_reference: PathBuf,
    pub window: Vec<f64>,
    pub class_label: String,
    pub class_index: usize,
    pub participant: String,
    pub emotion: String,
    pub end_time: f64,
}

/// Renders a millisecond timestamp the way frame file names carry it:
/// shortest round-trip digits, integral values keep a trailing `.0`.
pub fn format_time_ms(time_ms: f64) -> String {
    format!("{time_ms:?}")
}

/// `{participant}_{emotion}_{end_time}_{suffix}` frame file name.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameName {
    pub participant: String,
    pub emotion: String,
    pub end_time: f64,
    pub suffix: String,
}

impl FrameName {
    pub fn cropped(participant: &str, emotion: &str, end_time: f64) -> Self {
        Self {
            participant: participant.to_string(),
            emotion: emotion.to_string(),
            end_time,
            suffix: CROPPED_SUFFIX.to_string(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("{self}.{FRAME_EXTENSION}")
    }
}

impl fmt::Display for FrameName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.participant,
            self.emotion,
            format_time_ms(self.end_time),
            self.suffix
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameNameError(pub String);

impl fmt::Display for FrameNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognised frame name `{}`", self.0)
    }
}

impl std::error::Error for FrameNameError {}

impl FromStr for FrameName {
    type Err = FrameNameError;

    /// Parses from the right so participant ids may contain underscores.
    /// A trailing file extension is ignored.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let is_extension =
            |ext: &str| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphabetic());
        let stem = match raw.rsplit_once('.') {
            Some((stem, ext)) if is_extension(ext) => stem,
            _ => raw,
        };

        let mut parts = stem.rsplitn(4, '_');
        let suffix = parts.next();
        let end_time = parts.next();
        let emotion = parts.next();
        let participant = parts.next();

        match (participant, emotion, end_time, suffix) {
            (Some(participant), Some(emotion), Some(end_time), Some(suffix))
                if !participant.is_empty() && !emotion.is_empty() && !suffix.is_empty() =>
            {
                let end_time: f64 = end_time
                    .parse()
                    .map_err(|_| FrameNameError(raw.to_string()))?;
                Ok(Self {
                    participant: participant.to_string(),
                    emotion: emotion.to_string(),
                    end_time,
                    suffix: suffix.to_string(),
                })
            }
            _ => Err(FrameNameError(raw.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_integral_times_with_trailing_zero() {
        assert_eq!(format_time_ms(600.0), "600.0");
        assert_eq!(format_time_ms(1234.5), "1234.5");
        assert_eq!(
            FrameName::cropped("ab", "joy", 600.0).file_name(),
            "ab_joy_600.0_c.png"
        );
    }

    #[test]
    fn parses_names_with_underscored_participants() {
        let name: FrameName = "p_07_fear_1500.0_c.png".parse().unwrap();
        assert_eq!(name.participant, "p_07");
        assert_eq!(name.emotion, "fear");
        assert_eq!(name.end_time, 1500.0);
        assert_eq!(name.suffix, "c");
    }

    #[test]
    fn parse_and_display_agree() {
        let name = FrameName::cropped("jd", "calm", 2048.25);
        let parsed: FrameName = name.file_name().parse().unwrap();
        assert_eq!(parsed, name);
    }

    #[test]
    fn rejects_short_or_non_numeric_names() {
        assert!("joy_600.0.png".parse::<FrameName>().is_err());
        assert!("ab_joy_late_c.png".parse::<FrameName>().is_err());
    }
}

//! Frame records from the face directory.
//!
//! The face directory holds one sub-directory per class label. Each class
//! directory contains the cropped frames and, for the `times_files` source,
//! one `times_{participant}_{emotion}.csv` per clip.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::ingest::tables::read_frame_times;
use crate::models::{frame::CROPPED_SUFFIX, frame::FRAME_EXTENSION, FrameName, FrameRecord};
use crate::report::{SkipEvent, SkipLog, SkipReason, Stage};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

const TIMES_PREFIX: &str = "times_";
const TIMES_EXTENSION: &str = ".csv";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FrameSource {
    /// Frame times listed in `times_{participant}_{emotion}.csv` files.
    #[default]
    TimesFiles,
    /// Frame times recovered from the cropped image file names.
    ImageNames,
}

#[derive(Debug, Clone)]
pub struct FrameLoadOptions {
    pub source: FrameSource,
    /// Skip listed frames whose image file is absent.
    pub require_images: bool,
}

/// `(participant, emotion)` from a `times_{participant}_{emotion}.csv` name.
/// The emotion is the last `_`-separated part.
pub fn parse_times_file_name(file_name: &str) -> Option<(String, String)> {
    let stem = file_name
        .strip_prefix(TIMES_PREFIX)?
        .strip_suffix(TIMES_EXTENSION)?;
    let (participant, emotion) = stem.rsplit_once('_')?;
    if participant.is_empty() || emotion.is_empty() {
        return None;
    }
    Some((participant.to_string(), emotion.to_string()))
}

pub fn times_file_name(participant: &str, emotion: &str) -> String {
    format!("{TIMES_PREFIX}{participant}_{emotion}{TIMES_EXTENSION}")
}

fn sorted_entries(dir: &Path) -> PipelineResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|err| PipelineError::io(dir, err))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| PipelineError::io(dir, err))?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

fn file_name_of(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

/// Load every frame record under `face_dir`, in class/file order.
///
/// Only an unreadable `face_dir` itself is an error. A class directory or
/// times file that cannot be read is reported to `skips` and passed over.
pub fn load_frame_records(
    face_dir: &Path,
    options: &FrameLoadOptions,
    skips: &mut SkipLog,
) -> PipelineResult<Vec<FrameRecord>> {
    let mut records = Vec::new();

    for class_dir in sorted_entries(face_dir)? {
        if !class_dir.is_dir() {
            continue;
        }
        let Some(class_label) = file_name_of(&class_dir).map(str::to_string) else {
            continue;
        };

        let entries = match sorted_entries(&class_dir) {
            Ok(entries) => entries,
            Err(err) => {
                skips.record(
                    SkipEvent::new(Stage::Join, SkipReason::UnreadableFrames, "")
                        .detail(format!("class `{class_label}` not listed: {err}")),
                );
                continue;
            }
        };

        let before = records.len();
        match options.source {
            FrameSource::TimesFiles => load_from_times_files(
                &class_dir,
                &entries,
                &class_label,
                options,
                &mut records,
                skips,
            ),
            FrameSource::ImageNames => load_from_image_names(&entries, &class_label, &mut records),
        }
        log_debug!(
            "class `{class_label}`: {} frame records",
            records.len() - before
        );
    }

    log_info!(
        "loaded {} frame records from {}",
        records.len(),
        face_dir.display()
    );
    Ok(records)
}

/// A times file that cannot be read drops only its own
/// `(participant, emotion)` group.
fn load_from_times_files(
    class_dir: &Path,
    entries: &[PathBuf],
    class_label: &str,
    options: &FrameLoadOptions,
    records: &mut Vec<FrameRecord>,
    skips: &mut SkipLog,
) {
    for path in entries {
        let Some((participant, emotion)) = file_name_of(path).and_then(parse_times_file_name)
        else {
            continue;
        };

        let end_times = match read_frame_times(path) {
            Ok(end_times) => end_times,
            Err(err) => {
                skips.record(
                    SkipEvent::new(Stage::Join, SkipReason::UnreadableFrames, &participant)
                        .emotion(&emotion)
                        .detail(err.to_string()),
                );
                continue;
            }
        };

        for end_time in end_times {
            let image_reference =
                class_dir.join(FrameName::cropped(&participant, &emotion, end_time).file_name());

            if options.require_images && !image_reference.is_file() {
                skips.record(
                    SkipEvent::new(Stage::Join, SkipReason::MissingImage, &participant)
                        .emotion(&emotion)
                        .detail(format!("{} does not exist", image_reference.display())),
                );
                continue;
            }

            records.push(FrameRecord {
                participant: participant.clone(),
                emotion: emotion.clone(),
                class_label: class_label.to_string(),
                end_time,
                image_reference,
            });
        }
    }
}

fn load_from_image_names(entries: &[PathBuf], class_label: &str, records: &mut Vec<FrameRecord>) {
    for path in entries {
        let is_frame = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(FRAME_EXTENSION));
        if !is_frame {
            continue;
        }
        let Some(name) = file_name_of(path) else {
            continue;
        };
        let parsed: FrameName = match name.parse() {
            Ok(parsed) => parsed,
            Err(err) => {
                log_debug!("ignoring {}: {err}", path.display());
                continue;
            }
        };
        if parsed.suffix != CROPPED_SUFFIX {
            continue;
        }

        records.push(FrameRecord {
            participant: parsed.participant,
            emotion: parsed.emotion,
            class_label: class_label.to_string(),
            end_time: parsed.end_time,
            image_reference: path.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let joy = dir.path().join("joy");
        fs::create_dir(&joy).unwrap();
        fs::write(joy.join("times_ab_joy.csv"), "times\n600\n1200\n").unwrap();
        fs::write(joy.join("ab_joy_600.0_c.png"), b"").unwrap();
        fs::write(joy.join("ab_joy_900.0_c.png"), b"").unwrap();
        fs::write(joy.join("ab_joy_900.0_raw.png"), b"").unwrap();
        dir
    }

    #[test]
    fn times_file_names_split_from_the_right() {
        assert_eq!(
            parse_times_file_name("times_p_01_joy.csv"),
            Some(("p_01".to_string(), "joy".to_string()))
        );
        assert_eq!(parse_times_file_name("times_joy.csv"), None);
        assert_eq!(parse_times_file_name("data_ab.csv"), None);
        assert_eq!(times_file_name("ab", "joy"), "times_ab_joy.csv");
    }

    #[test]
    fn times_files_skip_missing_images() {
        let dir = face_dir();
        let options = FrameLoadOptions {
            source: FrameSource::TimesFiles,
            require_images: true,
        };
        let mut skips = SkipLog::new();

        let records = load_frame_records(dir.path(), &options, &mut skips).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].end_time, 600.0);
        assert_eq!(records[0].class_label, "joy");
        assert_eq!(
            records[0].image_reference,
            dir.path().join("joy").join("ab_joy_600.0_c.png")
        );
        assert_eq!(skips.count(SkipReason::MissingImage), 1);
    }

    #[test]
    fn times_files_keep_unverified_frames_when_images_optional() {
        let dir = face_dir();
        let options = FrameLoadOptions {
            source: FrameSource::TimesFiles,
            require_images: false,
        };
        let mut skips = SkipLog::new();

        let records = load_frame_records(dir.path(), &options, &mut skips).unwrap();

        assert_eq!(records.len(), 2);
        assert!(skips.is_empty());
    }

    #[test]
    fn image_names_parse_cropped_frames_only() {
        let dir = face_dir();
        let options = FrameLoadOptions {
            source: FrameSource::ImageNames,
            require_images: true,
        };
        let mut skips = SkipLog::new();

        let records = load_frame_records(dir.path(), &options, &mut skips).unwrap();

        let times: Vec<f64> = records.iter().map(|r| r.end_time).collect();
        assert_eq!(times, vec![600.0, 900.0]);
        assert!(records.iter().all(|r| r.participant == "ab" && r.emotion == "joy"));
    }

    #[test]
    fn unreadable_times_file_skips_only_its_group() {
        let dir = face_dir();
        fs::write(dir.path().join("joy").join("times_cd_joy.csv"), "times\nbogus\n").unwrap();
        let options = FrameLoadOptions {
            source: FrameSource::TimesFiles,
            require_images: false,
        };
        let mut skips = SkipLog::new();

        let records = load_frame_records(dir.path(), &options, &mut skips).unwrap();

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.participant == "ab"));
        assert_eq!(skips.count(SkipReason::UnreadableFrames), 1);
        let event = &skips.events()[0];
        assert_eq!(event.participant, "cd");
        assert_eq!(event.emotion.as_deref(), Some("joy"));
        assert!(event.detail.contains("times_cd_joy.csv"));
    }
}

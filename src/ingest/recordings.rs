//! Discovery and loading of per-participant recordings.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, PipelineResult};
use crate::ingest::tables::{read_samples, read_segment_table};
use crate::models::{Sample, SegmentTable};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

const SEGMENTS_PREFIX: &str = "segments_";
const DATA_PREFIX: &str = "data_";
const TABLE_EXTENSION: &str = ".csv";

/// One participant's segment table and raw sample stream.
#[derive(Debug, Clone)]
pub struct Recording {
    pub participant: String,
    pub table: SegmentTable,
    pub samples: Vec<Sample>,
}

/// Produces recordings for the fitting stage.
///
/// Listing is cheap; loading does the parsing and runs on the blocking pool,
/// so a bad file only fails its own recording.
pub trait RecordingSource: Send + Sync {
    fn participants(&self) -> PipelineResult<Vec<String>>;

    fn load(&self, participant: &str) -> PipelineResult<Recording>;
}

/// Reads `segments_{p}.csv` / `data_{p}.csv` pairs from one directory.
#[derive(Debug, Clone)]
pub struct DirectoryRecordingSource {
    dir: PathBuf,
}

impl DirectoryRecordingSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn segments_path(&self, participant: &str) -> PathBuf {
        self.dir
            .join(format!("{SEGMENTS_PREFIX}{participant}{TABLE_EXTENSION}"))
    }

    pub fn data_path(&self, participant: &str) -> PathBuf {
        self.dir
            .join(format!("{DATA_PREFIX}{participant}{TABLE_EXTENSION}"))
    }
}

impl RecordingSource for DirectoryRecordingSource {
    fn participants(&self) -> PipelineResult<Vec<String>> {
        let entries = fs::read_dir(&self.dir).map_err(|err| PipelineError::io(&self.dir, err))?;

        let mut participants = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| PipelineError::io(&self.dir, err))?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(participant) = name
                .strip_prefix(SEGMENTS_PREFIX)
                .and_then(|rest| rest.strip_suffix(TABLE_EXTENSION))
            else {
                continue;
            };
            if participant.is_empty() {
                continue;
            }
            if self.data_path(participant).is_file() {
                participants.push(participant.to_string());
            } else {
                log_warn!(
                    "ignoring {}: no {DATA_PREFIX}{participant}{TABLE_EXTENSION} next to it",
                    entry.path().display()
                );
            }
        }

        participants.sort();
        log_debug!(
            "found {} recordings in {}",
            participants.len(),
            self.dir.display()
        );
        Ok(participants)
    }

    fn load(&self, participant: &str) -> PipelineResult<Recording> {
        let table = read_segment_table(&self.segments_path(participant))?;
        let samples = read_samples(&self.data_path(participant))?;
        Ok(Recording {
            participant: participant.to_string(),
            table,
            samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_only_complete_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let segments = "segmentName,segmentStart,segmentEnd\n1.mp4,0,1\n";
        let data = "times,diameters\n0,3.0\n500,3.2\n";
        fs::write(dir.path().join("segments_ab.csv"), segments).unwrap();
        fs::write(dir.path().join("data_ab.csv"), data).unwrap();
        fs::write(dir.path().join("segments_cd.csv"), segments).unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let source = DirectoryRecordingSource::new(dir.path());

        assert_eq!(source.participants().unwrap(), vec!["ab".to_string()]);
        let recording = source.load("ab").unwrap();
        assert_eq!(recording.table.len(), 1);
        assert_eq!(recording.samples.len(), 2);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let source = DirectoryRecordingSource::new("/definitely/not/here");
        assert!(matches!(source.participants(), Err(PipelineError::Io { .. })));
    }
}

use std::collections::BTreeMap;

/// Configuration for splitting and labelling one recording's segments.
#[derive(Debug, Clone)]
pub struct SegmentationConfig {
    /// Segments whose name contains any of these fragments are dropped
    /// before fitting (case-sensitive substring match).
    pub exclusion_fragments: Vec<String>,

    /// Stimulus file name -> emotion label.
    pub emotion_map: BTreeMap<String, String>,
}

impl SegmentationConfig {
    /// Emotion label for a segment name. Surrounding whitespace in the name
    /// is ignored, the export pads some names.
    pub fn emotion_for(&self, segment_name: &str) -> Option<&str> {
        self.emotion_map
            .get(segment_name.trim())
            .map(String::as_str)
    }
}

pub fn default_exclusion_fragments() -> Vec<String> {
    vec!["transition".to_string()]
}

pub fn default_emotion_map() -> BTreeMap<String, String> {
    [
        ("1.mp4", "joy"),
        ("2.mp4", "anger"),
        ("3.mp4", "fear"),
        ("4.mp4", "fun"),
        ("5.mp4", "sad"),
        ("6.mp4", "happy"),
        ("7.mp4", "calm"),
    ]
    .into_iter()
    .map(|(name, emotion)| (name.to_string(), emotion.to_string()))
    .collect()
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            exclusion_fragments: default_exclusion_fragments(),
            emotion_map: default_emotion_map(),
        }
    }
}

//! Class labels for the joined dataset.
//!
//! The vocabulary comes from the emotions a run can fit (the values of the
//! configured emotion map), not from a fixed list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

pub const POSITIVE: &str = "positive";
pub const NEGATIVE: &str = "negative";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ClassScheme {
    /// One class per emotion.
    #[default]
    Multiclass,
    /// Emotions folded into `positive` / `negative`.
    Binary,
}

/// Which emotions fold into which side under [`ClassScheme::Binary`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Polarity {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

impl Default for Polarity {
    fn default() -> Self {
        Self {
            positive: owned(&["happy", "fun", "calm", "joy"]),
            negative: owned(&["anger", "sad", "fear"]),
        }
    }
}

impl Polarity {
    fn side_of(&self, emotion: &str) -> Option<&'static str> {
        if self.positive.iter().any(|e| e == emotion) {
            Some(POSITIVE)
        } else if self.negative.iter().any(|e| e == emotion) {
            Some(NEGATIVE)
        } else {
            None
        }
    }
}

/// Label -> index mapping, ordered alphabetically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassIndex {
    indices: BTreeMap<String, usize>,
}

impl ClassIndex {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sorted: Vec<String> = labels.into_iter().map(Into::into).collect();
        sorted.sort();
        sorted.dedup();
        let indices = sorted
            .into_iter()
            .enumerate()
            .map(|(index, label)| (label, index))
            .collect();
        Self { indices }
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.indices.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Labels in index order.
    pub fn labels(&self) -> Vec<&str> {
        self.indices.keys().map(String::as_str).collect()
    }
}

/// Emotion -> class label for one run, with the enumeration of those labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMap {
    by_emotion: BTreeMap<String, String>,
    index: ClassIndex,
}

impl ClassMap {
    /// Build the run's classes from the emotions it can produce.
    ///
    /// Under `Binary` every emotion needs a side in `polarity`; an emotion
    /// with none is a configuration error. Both sides are always enumerated.
    pub fn new<'a, I>(
        scheme: ClassScheme,
        emotions: I,
        polarity: &Polarity,
    ) -> PipelineResult<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut by_emotion = BTreeMap::new();
        for emotion in emotions {
            let class = match scheme {
                ClassScheme::Multiclass => emotion.to_string(),
                ClassScheme::Binary => polarity
                    .side_of(emotion)
                    .ok_or_else(|| {
                        PipelineError::config(
                            "polarity",
                            format!("emotion `{emotion}` is neither positive nor negative"),
                        )
                    })?
                    .to_string(),
            };
            by_emotion.insert(emotion.to_string(), class);
        }

        let index = match scheme {
            ClassScheme::Multiclass => ClassIndex::new(by_emotion.values().cloned()),
            ClassScheme::Binary => ClassIndex::new([POSITIVE, NEGATIVE]),
        };
        Ok(Self { by_emotion, index })
    }

    /// Class an emotion belongs to, or `None` when the run has no such emotion.
    pub fn class_for(&self, emotion: &str) -> Option<&str> {
        self.by_emotion.get(emotion).map(String::as_str)
    }

    pub fn index(&self) -> &ClassIndex {
        &self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_EMOTIONS: [&str; 7] = ["joy", "anger", "fear", "fun", "sad", "happy", "calm"];

    #[test]
    fn binary_scheme_folds_emotions() {
        let map = ClassMap::new(ClassScheme::Binary, DEFAULT_EMOTIONS, &Polarity::default())
            .unwrap();
        assert_eq!(map.class_for("joy"), Some(POSITIVE));
        assert_eq!(map.class_for("fear"), Some(NEGATIVE));
        assert_eq!(map.class_for("bored"), None);
        assert_eq!(map.index().labels(), vec![NEGATIVE, POSITIVE]);
    }

    #[test]
    fn multiclass_enumeration_follows_configured_emotions() {
        let map = ClassMap::new(ClassScheme::Multiclass, DEFAULT_EMOTIONS, &Polarity::default())
            .unwrap();
        assert_eq!(
            map.index().labels(),
            vec!["anger", "calm", "fear", "fun", "happy", "joy", "sad"]
        );
        assert_eq!(map.index().index_of("anger"), Some(0));
        assert_eq!(map.index().index_of("sad"), Some(6));
        assert_eq!(map.class_for("calm"), Some("calm"));
    }

    #[test]
    fn non_default_emotion_gets_its_own_class() {
        let map = ClassMap::new(
            ClassScheme::Multiclass,
            ["joy", "surprise", "joy"],
            &Polarity::default(),
        )
        .unwrap();
        assert_eq!(map.index().labels(), vec!["joy", "surprise"]);
        assert_eq!(map.class_for("surprise"), Some("surprise"));
        assert_eq!(map.class_for("fear"), None);
    }

    #[test]
    fn binary_rejects_emotion_without_polarity() {
        let err = ClassMap::new(ClassScheme::Binary, ["joy", "surprise"], &Polarity::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config { field: "polarity", .. }));

        let polarity = Polarity {
            positive: vec!["joy".into(), "surprise".into()],
            ..Polarity::default()
        };
        let map = ClassMap::new(ClassScheme::Binary, ["joy", "surprise"], &polarity).unwrap();
        assert_eq!(map.class_for("surprise"), Some(POSITIVE));
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a stored interpolant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpolantKey {
    pub participant: String,
    pub emotion: String,
}

impl InterpolantKey {
    pub fn new(participant: impl Into<String>, emotion: impl Into<String>) -> Self {
        Self {
            participant: participant.into(),
            emotion: emotion.into(),
        }
    }

    /// Deterministic artifact name, shared by the store row and the plot file.
    pub fn artifact_name(&self) -> String {
        format!("pupil_{}_{}", self.participant, self.emotion)
    }
}

impl fmt::Display for InterpolantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.participant, self.emotion)
    }
}

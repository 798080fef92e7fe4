use serde::{Deserialize, Serialize};

/// One raw pupil diameter reading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub time_ms: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(time_ms: f64, value: f64) -> Self {
        Self { time_ms, value }
    }
}

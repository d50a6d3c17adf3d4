use serde::{Deserialize, Serialize};

/// One reading from the gaze tracker, in window pixels.
///
/// `time` is milliseconds since the session clock started, matching the
/// resolution eye-tracking exports are usually analysed at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    pub x: f64,
    pub y: f64,
    pub time: f64,
}

impl GazeSample {
    pub fn new(x: f64, y: f64, time: f64) -> Self {
        Self { x, y, time }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.time.is_finite()
    }
}

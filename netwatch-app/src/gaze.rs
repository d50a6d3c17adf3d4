use netwatch_session::{GazeTracker, SessionError};
use std::time::Duration;

/// Stands in for an eye tracker by sampling the pointer position once per
/// timestep. Reports `None` while the pointer is outside the window.
pub struct CursorGazeTracker {
    timestep_ms: f64,
    cursor: Option<(f64, f64)>,
    last_sample_ms: Option<f64>,
    running: bool,
}

impl CursorGazeTracker {
    pub fn new(timestep: Duration) -> Self {
        Self {
            timestep_ms: timestep.as_secs_f64() * 1000.0,
            cursor: None,
            last_sample_ms: None,
            running: false,
        }
    }

    pub fn cursor_moved(&mut self, x: f64, y: f64) {
        self.cursor = Some((x, y));
    }

    pub fn cursor_left(&mut self) {
        self.cursor = None;
    }
}

impl GazeTracker for CursorGazeTracker {
    fn begin(&mut self) -> Result<(), SessionError> {
        if self.timestep_ms <= 0.0 {
            return Err(SessionError::Tracker("gaze timestep must be positive".into()));
        }
        self.running = true;
        log::info!("Pointer gaze tracker sampling every {}ms", self.timestep_ms);
        Ok(())
    }

    fn drain(&mut self, now_ms: f64, listener: &mut dyn FnMut(Option<(f64, f64)>, f64)) {
        if !self.running {
            return;
        }
        if let Some(last) = self.last_sample_ms {
            if now_ms - last < self.timestep_ms {
                return;
            }
        }
        self.last_sample_ms = Some(now_ms);
        listener(self.cursor, now_ms);
    }
}

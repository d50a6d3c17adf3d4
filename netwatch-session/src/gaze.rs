use netwatch_core::GazeSample;

use crate::error::SessionError;

/// Source of gaze estimates, polled once per frame.
///
/// Implementations call `listener` for every estimate produced since the
/// last poll with the estimate (or `None` when the tracker lost the eyes)
/// and its timestamp in session milliseconds.
pub trait GazeTracker {
    fn begin(&mut self) -> Result<(), SessionError> {
        Ok(())
    }

    fn drain(&mut self, now_ms: f64, listener: &mut dyn FnMut(Option<(f64, f64)>, f64));
}

/// Append-only sample store, flushed once at trial end
#[derive(Debug, Clone)]
pub struct GazeBuffer {
    samples: Vec<GazeSample>,
    capacity: usize,
    dropped: usize,
    flushed: bool,
}

impl GazeBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity.min(4096)),
            capacity,
            dropped: 0,
            flushed: false,
        }
    }

    /// Returns false when the sample was not stored.
    pub fn push(&mut self, sample: GazeSample) -> bool {
        if self.flushed || !sample.is_finite() {
            return false;
        }
        if self.samples.len() >= self.capacity {
            if self.dropped == 0 {
                log::warn!(
                    "Gaze buffer full at {} samples, dropping further samples",
                    self.capacity
                );
            }
            self.dropped += 1;
            return false;
        }
        self.samples.push(sample);
        true
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Hands over the recorded samples. Later calls return nothing and
    /// later pushes are refused.
    pub fn flush(&mut self) -> Vec<GazeSample> {
        if self.flushed {
            return Vec::new();
        }
        self.flushed = true;
        if self.dropped > 0 {
            log::warn!("{} gaze samples were dropped", self.dropped);
        }
        std::mem::take(&mut self.samples)
    }
}

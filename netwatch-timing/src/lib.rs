pub mod choreography;
pub mod timer;

pub use choreography::{effective_packet_duration, AnimationPhase, AnimationSlot, Choreography};
pub use timer::{FrameTimingStats, HighPrecisionTimer, ManualTimer, Timer};

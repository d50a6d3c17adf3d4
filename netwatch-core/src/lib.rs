pub mod gaze;
pub mod packet;
pub mod record;
pub mod state;

pub use gaze::GazeSample;
pub use packet::{Classification, ConnectionInfo, InfoField, Packet};
pub use record::TrialRecord;
pub use state::SessionState;

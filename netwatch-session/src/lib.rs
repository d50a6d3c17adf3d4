pub mod config;
pub mod display;
pub mod error;
pub mod gaze;
pub mod state;
pub mod trial;

pub use config::{
    AdvisorHidePolicy, CensorKey, CensorSelection, Condition, SessionManifest, TrialConfig,
};
pub use display::{AdviceDisplay, DisplayRules, PanelDirection};
pub use error::SessionError;
pub use gaze::{GazeBuffer, GazeTracker};
pub use state::{SessionEvent, TrialOutcome, TrialSession};
pub use trial::{CENTER, PacketSlot, PacketVisibility};

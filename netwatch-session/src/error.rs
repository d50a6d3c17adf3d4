use netwatch_core::SessionState;
use std::path::PathBuf;

use crate::config::CensorKey;

/// Errors raised while configuring or driving a trial session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The manifest file could not be read.
    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The manifest was not valid JSON for the expected shape.
    #[error("Malformed manifest: {0}")]
    Manifest(#[from] serde_json::Error),
    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// The censor index does not name a field of the censor group.
    #[error("Censor group {key} has no entry {index}")]
    CensorIndex { key: CensorKey, index: usize },
    /// An operation was attempted in the wrong lifecycle state.
    #[error("Cannot {op} while {from:?}")]
    InvalidTransition { from: SessionState, op: &'static str },
    /// Participant input arrived while packets are not on screen.
    #[error("Input is not accepted while {0:?}")]
    InputNotAllowed(SessionState),
    #[error("No packet with index {0}")]
    UnknownPacket(usize),
    #[error("Packet {0} is not on screen")]
    PacketNotVisible(usize),
    #[error("No packet is selected")]
    NoSelection,
    #[error("Selected packet has no recommendation")]
    NoRecommendation,
    #[error("Advisor controls are hidden for this condition")]
    AdvisorHidden,
    /// The gaze tracker failed to start.
    #[error("Gaze tracker unavailable: {0}")]
    Tracker(String),
}

use serde::{Deserialize, Serialize};

use crate::packet::{Classification, Packet};

/// Per-packet result submitted at trial end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub user: Option<Classification>,
    pub advisor: Option<Classification>,
    pub accepted: bool,
    pub time: Option<u64>,
}

impl From<&Packet> for TrialRecord {
    fn from(packet: &Packet) -> Self {
        Self {
            user: packet.classification,
            advisor: packet.recommendation,
            accepted: packet.accepted_recommendation,
            time: packet.input_time,
        }
    }
}

use netwatch_core::{Classification, ConnectionInfo, InfoField, Packet};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::error::SessionError;

/// Group that keeps the default panel layout
pub const BASELINE_GROUP: &str = "A";

/// Condition text that means "advisor arm without an advisor"
pub const NO_ADVISOR_TEXT: &str = "No Advisor";

/// Which condition texts hide the advice line and the accept control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdvisorHidePolicy {
    /// Hide only when the condition text is empty.
    EmptyOnly,
    /// Hide when the condition text is empty or reads "No Advisor".
    #[default]
    EmptyOrNoAdvisor,
}

impl AdvisorHidePolicy {
    pub fn hides(&self, condition_text: &str) -> bool {
        match self {
            AdvisorHidePolicy::EmptyOnly => condition_text.is_empty(),
            AdvisorHidePolicy::EmptyOrNoAdvisor => {
                condition_text.is_empty() || condition_text == NO_ADVISOR_TEXT
            }
        }
    }
}

/// Session timing and collection settings. Read-only once a session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrialConfig {
    /// Whole trial, in minutes
    pub trial_length: f64,
    /// Per-packet animation, in seconds
    pub packet_time_on_screen: f64,
    pub censoring: bool,
    pub max_gaze_samples: usize,
    pub gaze_timestep_ms: u64,
    pub advisor_hide_policy: AdvisorHidePolicy,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            trial_length: 5.0,
            packet_time_on_screen: 10.0,
            censoring: false,
            max_gaze_samples: 200_000,
            gaze_timestep_ms: 100,
            advisor_hide_policy: AdvisorHidePolicy::default(),
        }
    }
}

impl TrialConfig {
    pub fn validate(&self) -> Result<(), SessionError> {
        if !(self.trial_length.is_finite() && self.trial_length > 0.0) {
            return Err(SessionError::InvalidConfig(format!(
                "trialLength must be a positive number of minutes, got {}",
                self.trial_length
            )));
        }
        if !(self.packet_time_on_screen.is_finite() && self.packet_time_on_screen > 0.0) {
            return Err(SessionError::InvalidConfig(format!(
                "packetTimeOnScreen must be a positive number of seconds, got {}",
                self.packet_time_on_screen
            )));
        }
        if self.gaze_timestep_ms == 0 {
            return Err(SessionError::InvalidConfig(
                "gazeTimestepMs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn trial_length_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.trial_length * 60.0).unwrap_or_default()
    }

    pub fn packet_time_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.packet_time_on_screen).unwrap_or_default()
    }

    pub fn gaze_timestep(&self) -> Duration {
        Duration::from_millis(self.gaze_timestep_ms)
    }
}

/// Censor groups and the info fields they obscure, by index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CensorKey {
    #[serde(rename = "RIO")]
    Rio,
    #[serde(rename = "SIO")]
    Sio,
}

impl CensorKey {
    pub fn fields(&self) -> &'static [InfoField] {
        match self {
            CensorKey::Rio => &[
                InfoField::PortNumber,
                InfoField::Protocol,
                InfoField::Certificates,
            ],
            CensorKey::Sio => &[
                InfoField::Checksum,
                InfoField::ConnectionTime,
                InfoField::IpAddress,
                InfoField::Country,
            ],
        }
    }
}

impl fmt::Display for CensorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CensorKey::Rio => "RIO",
            CensorKey::Sio => "SIO",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CensorSelection {
    pub key: CensorKey,
    /// One entry of the group; `None` obscures the whole group.
    #[serde(default)]
    pub index: Option<usize>,
}

impl CensorSelection {
    pub fn fields(&self) -> Result<Vec<InfoField>, SessionError> {
        let group = self.key.fields();
        match self.index {
            None => Ok(group.to_vec()),
            Some(index) => group
                .get(index)
                .map(|field| vec![*field])
                .ok_or(SessionError::CensorIndex {
                    key: self.key,
                    index,
                }),
        }
    }
}

/// Experimental arm the participant was assigned to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Condition {
    pub group: String,
    /// Advisor text; empty when the arm has no advisor.
    pub condition_text: String,
    /// Advice line restored whenever a packet is selected
    pub advice_template: String,
    pub censor: Option<CensorSelection>,
}

impl Condition {
    pub fn is_baseline(&self) -> bool {
        self.group == BASELINE_GROUP
    }
}

/// Everything a session needs, as delivered by the experiment server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionManifest {
    #[serde(flatten)]
    pub condition: Condition,
    #[serde(default)]
    pub config: TrialConfig,
    pub packets: Vec<Packet>,
}

impl SessionManifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| SessionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest = Self::from_json(&raw)?;
        log::info!(
            "Loaded manifest {} ({} packets, group {:?})",
            path.display(),
            manifest.packets.len(),
            manifest.condition.group
        );
        Ok(manifest)
    }

    pub fn from_json(raw: &str) -> Result<Self, SessionError> {
        let manifest: SessionManifest = serde_json::from_str(raw)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        self.config.validate()?;
        if let Some(censor) = &self.condition.censor {
            censor.fields()?;
        }
        if let Some((i, _)) = self.packets.iter().enumerate().find(|(_, p)| {
            p.location
                .iter()
                .any(|v| !v.is_finite() || !(0.0..=100.0).contains(v))
        }) {
            return Err(SessionError::InvalidConfig(format!(
                "packet {} location must be within 0..=100 percent",
                i
            )));
        }
        Ok(())
    }

    /// Random packet list for dry runs without an experiment server.
    pub fn demo<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Self {
        const COUNTRIES: [&str; 6] = ["NL", "US", "DE", "BR", "JP", "KE"];
        const PROTOCOLS: [&str; 4] = ["TCP", "UDP", "HTTPS", "SSH"];
        const CERTIFICATES: [&str; 3] = ["valid", "expired", "self-signed"];

        let packets = (0..count)
            .map(|_| {
                let recommendation =
                    Classification::ALL[rng.random_range(0..Classification::ALL.len())];
                let info = ConnectionInfo {
                    ip_address: format!(
                        "{}.{}.{}.{}",
                        rng.random_range(1..=223),
                        rng.random_range(0..=255),
                        rng.random_range(0..=255),
                        rng.random_range(1..=254)
                    ),
                    country: COUNTRIES[rng.random_range(0..COUNTRIES.len())].into(),
                    check_sum: format!("{:08x}", rng.random::<u32>()),
                    protocol: PROTOCOLS[rng.random_range(0..PROTOCOLS.len())].into(),
                    time: format!("{}ms", rng.random_range(5..900)),
                    certificates: CERTIFICATES[rng.random_range(0..CERTIFICATES.len())].into(),
                    port_number: rng.random_range(1..=65535u32).to_string(),
                };
                Packet::new(
                    [rng.random_range(5.0..95.0), rng.random_range(5.0..95.0)],
                    Some(recommendation),
                )
                .with_info(info)
            })
            .collect();

        Self {
            condition: Condition {
                group: BASELINE_GROUP.into(),
                condition_text: "The advisor recommends a classification for each packet.".into(),
                advice_template: String::new(),
                censor: None,
            },
            config: TrialConfig {
                trial_length: 1.0,
                packet_time_on_screen: 8.0,
                ..TrialConfig::default()
            },
            packets,
        }
    }
}

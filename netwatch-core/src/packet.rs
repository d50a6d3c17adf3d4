use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Participant verdict for a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Trusted,
    Suspect,
    Hostile,
}

impl Classification {
    pub const ALL: [Classification; 3] = [
        Classification::Trusted,
        Classification::Suspect,
        Classification::Hostile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Trusted => "trusted",
            Classification::Suspect => "suspect",
            Classification::Hostile => "hostile",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Classification::Trusted => "Trusted",
            Classification::Suspect => "Suspect",
            Classification::Hostile => "Hostile",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection details shown in the info panel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    #[serde(default, deserialize_with = "loose_text")]
    pub ip_address: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub country: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub check_sum: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub protocol: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub time: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub certificates: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub port_number: String,
}

/// A simulated connection event the participant has to classify.
///
/// `location` is a percentage of the game area, `[x, y]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Packet {
    pub location: [f32; 2],
    #[serde(flatten)]
    pub info: ConnectionInfo,
    #[serde(default, deserialize_with = "optional_classification")]
    pub classification: Option<Classification>,
    #[serde(default, deserialize_with = "optional_classification")]
    pub recommendation: Option<Classification>,
    #[serde(default)]
    pub accepted_recommendation: bool,
    #[serde(default)]
    pub input_time: Option<u64>,
}

impl Packet {
    pub fn new(location: [f32; 2], recommendation: Option<Classification>) -> Self {
        Self {
            location,
            info: ConnectionInfo::default(),
            classification: None,
            recommendation,
            accepted_recommendation: false,
            input_time: None,
        }
    }

    pub fn with_info(mut self, info: ConnectionInfo) -> Self {
        self.info = info;
        self
    }

    pub fn matches_recommendation(&self) -> bool {
        self.classification == self.recommendation
    }
}

/// Rows of the info panel, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InfoField {
    IpAddress,
    Country,
    Checksum,
    Protocol,
    ConnectionTime,
    Certificates,
    PortNumber,
    Classification,
}

impl InfoField {
    pub const ALL: [InfoField; 8] = [
        InfoField::IpAddress,
        InfoField::Country,
        InfoField::Checksum,
        InfoField::Protocol,
        InfoField::ConnectionTime,
        InfoField::Certificates,
        InfoField::PortNumber,
        InfoField::Classification,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            InfoField::IpAddress => "IP Address",
            InfoField::Country => "Country",
            InfoField::Checksum => "Checksum",
            InfoField::Protocol => "Protocol",
            InfoField::ConnectionTime => "Connection Time",
            InfoField::Certificates => "Certificates",
            InfoField::PortNumber => "Port Number",
            InfoField::Classification => "Classification",
        }
    }

    /// The participant's own verdict is never obscured.
    pub fn is_censorable(&self) -> bool {
        !matches!(self, InfoField::Classification)
    }

    pub fn row(&self) -> usize {
        *self as usize
    }

    pub fn value<'a>(&self, packet: &'a Packet) -> &'a str {
        let info = &packet.info;
        match self {
            InfoField::IpAddress => &info.ip_address,
            InfoField::Country => &info.country,
            InfoField::Checksum => &info.check_sum,
            InfoField::Protocol => &info.protocol,
            InfoField::ConnectionTime => &info.time,
            InfoField::Certificates => &info.certificates,
            InfoField::PortNumber => &info.port_number,
            InfoField::Classification => packet
                .classification
                .map(|c| c.as_str())
                .unwrap_or_default(),
        }
    }

    /// Panel line for `packet`, or the bare label when nothing is selected
    pub fn display(&self, packet: Option<&Packet>) -> String {
        match packet {
            Some(p) => format!("{}: {}", self.label(), self.value(p)),
            None => format!("{}:", self.label()),
        }
    }
}

// Connection details arrive as strings or bare numbers depending on the
// generator that produced the packet list.
fn loose_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Text(String),
        Int(i64),
        Float(f64),
        Bool(bool),
        Null(()),
    }

    Ok(match Loose::deserialize(deserializer)? {
        Loose::Text(s) => s,
        Loose::Int(i) => i.to_string(),
        Loose::Float(f) => f.to_string(),
        Loose::Bool(b) => b.to_string(),
        Loose::Null(()) => String::new(),
    })
}

fn optional_classification<'de, D>(deserializer: D) -> Result<Option<Classification>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("none") || s.eq_ignore_ascii_case("unset") => Ok(None),
        Some(s) => match s.to_ascii_lowercase().as_str() {
            "trusted" => Ok(Some(Classification::Trusted)),
            "suspect" => Ok(Some(Classification::Suspect)),
            "hostile" => Ok(Some(Classification::Hostile)),
            other => Err(serde::de::Error::unknown_variant(
                other,
                &["trusted", "suspect", "hostile", "none"],
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_accepts_numeric_details_and_empty_recommendation() {
        let json = r#"{
            "location": [12.5, 40],
            "ipAddress": "10.0.0.4",
            "country": "NL",
            "checkSum": 48213,
            "protocol": "TCP",
            "time": "00:42",
            "certificates": "valid",
            "portNumber": 443,
            "recommendation": ""
        }"#;
        let packet: Packet = serde_json::from_str(json).unwrap();
        assert_eq!(packet.location, [12.5, 40.0]);
        assert_eq!(packet.info.check_sum, "48213");
        assert_eq!(packet.info.port_number, "443");
        assert_eq!(packet.recommendation, None);
        assert_eq!(packet.classification, None);
        assert!(!packet.accepted_recommendation);
    }

    #[test]
    fn recommendation_is_case_insensitive() {
        let json = r#"{"location": [0, 0], "recommendation": "Hostile"}"#;
        let packet: Packet = serde_json::from_str(json).unwrap();
        assert_eq!(packet.recommendation, Some(Classification::Hostile));
    }

    #[test]
    fn unknown_classification_is_rejected() {
        let json = r#"{"location": [0, 0], "recommendation": "friendly"}"#;
        assert!(serde_json::from_str::<Packet>(json).is_err());
    }

    #[test]
    fn info_rows_render_label_and_value() {
        let mut packet = Packet::new([0.0, 0.0], None).with_info(ConnectionInfo {
            ip_address: "192.168.1.9".into(),
            ..Default::default()
        });
        assert_eq!(
            InfoField::IpAddress.display(Some(&packet)),
            "IP Address: 192.168.1.9"
        );
        assert_eq!(InfoField::Classification.display(Some(&packet)), "Classification: ");
        packet.classification = Some(Classification::Suspect);
        assert_eq!(
            InfoField::Classification.display(Some(&packet)),
            "Classification: suspect"
        );
        assert_eq!(InfoField::Country.display(None), "Country:");
    }

    #[test]
    fn only_classification_row_is_uncensorable() {
        let uncensorable: Vec<_> = InfoField::ALL
            .iter()
            .filter(|f| !f.is_censorable())
            .collect();
        assert_eq!(uncensorable, vec![&InfoField::Classification]);
    }
}

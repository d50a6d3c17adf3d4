use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, SecondsFormat, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use netwatch_core::{GazeSample, TrialRecord};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::error::UploadError;

/// Body of the results stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialSubmission {
    pub input: Vec<TrialRecord>,
    pub trial_end_time: String,
}

impl TrialSubmission {
    pub fn new(input: Vec<TrialRecord>, ended_at: DateTime<Utc>) -> Self {
        Self {
            input,
            trial_end_time: ended_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Body of the gaze stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeSubmission {
    pub data: String,
}

impl GazeSubmission {
    pub fn new(samples: &[GazeSample]) -> Result<Self, UploadError> {
        Ok(Self {
            data: encode_gaze(samples)?,
        })
    }
}

/// JSON array, gzip, base64.
pub fn encode_gaze(samples: &[GazeSample]) -> Result<String, UploadError> {
    let json = serde_json::to_vec(samples)?;
    let mut encoder = GzEncoder::new(Vec::with_capacity(json.len() / 4), Compression::default());
    encoder.write_all(&json)?;
    let gz = encoder.finish()?;
    Ok(BASE64.encode(gz))
}

pub fn decode_gaze(data: &str) -> Result<Vec<GazeSample>, UploadError> {
    let gz = BASE64
        .decode(data)
        .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;
    let mut json = Vec::new();
    GzDecoder::new(gz.as_slice())
        .read_to_end(&mut json)
        .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;
    serde_json::from_slice(&json).map_err(|e| UploadError::InvalidResponse(e.to_string()))
}

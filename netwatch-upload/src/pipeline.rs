use chrono::Utc;
use netwatch_core::{GazeSample, TrialRecord};

use crate::error::UploadError;
use crate::payload::{GazeSubmission, TrialSubmission};
use crate::transport::Transport;

pub const ADD_TRIAL_PATH: &str = "/trial/addTrial";
pub const ADD_GAZE_DATA_PATH: &str = "/trial/addGazeData";
/// Where the participant goes once everything is stored
pub const NEXT_LOCATION: &str = "/information/rules";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SubmitResults,
    SubmitGaze,
}

#[derive(Debug)]
pub enum PipelineOutcome {
    Completed { next: String },
    Failed { stage: Stage, error: UploadError },
}

impl PipelineOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PipelineOutcome::Completed { .. })
    }

    pub fn next_location(&self) -> Option<&str> {
        match self {
            PipelineOutcome::Completed { next } => Some(next),
            PipelineOutcome::Failed { .. } => None,
        }
    }
}

/// Results first, then gaze. A failed stage ends the run; nothing is retried.
pub struct SubmissionPipeline<T>
where
    T: Transport,
{
    transport: T,
}

impl<T> SubmissionPipeline<T>
where
    T: Transport,
{
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn run(&self, records: Vec<TrialRecord>, gaze: &[GazeSample]) -> PipelineOutcome {
        match self.submit_results(records).await {
            Ok(reply) => log::info!("Regular data response: {}", reply),
            Err(error) => {
                log::error!("Error submitting trial results: {}", error);
                return PipelineOutcome::Failed {
                    stage: Stage::SubmitResults,
                    error,
                };
            }
        }

        if let Err(error) = self.submit_gaze(gaze).await {
            log::error!("Error sending gaze payload: {}", error);
            return PipelineOutcome::Failed {
                stage: Stage::SubmitGaze,
                error,
            };
        }

        log::info!("Submission complete, continuing to {}", NEXT_LOCATION);
        PipelineOutcome::Completed {
            next: NEXT_LOCATION.to_string(),
        }
    }

    /// Posts the classification records; the server answers with JSON.
    pub async fn submit_results(
        &self,
        records: Vec<TrialRecord>,
    ) -> Result<serde_json::Value, UploadError> {
        let body = serde_json::to_value(TrialSubmission::new(records, Utc::now()))?;
        let response = self.transport.post_json(ADD_TRIAL_PATH, &body).await?;
        if !response.is_success() {
            return Err(UploadError::Status {
                status: response.status,
            });
        }
        serde_json::from_str(&response.body).map_err(|e| UploadError::InvalidResponse(e.to_string()))
    }

    pub async fn submit_gaze(&self, samples: &[GazeSample]) -> Result<(), UploadError> {
        let body = serde_json::to_value(GazeSubmission::new(samples)?)?;
        log::info!(
            "Sending {} gaze samples ({} bytes encoded)",
            samples.len(),
            body["data"].as_str().map_or(0, str::len)
        );
        let response = self.transport.post_json(ADD_GAZE_DATA_PATH, &body).await?;
        if !response.is_success() {
            return Err(UploadError::Status {
                status: response.status,
            });
        }
        Ok(())
    }
}

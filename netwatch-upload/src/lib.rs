pub mod error;
pub mod payload;
pub mod pipeline;
pub mod transport;

pub use error::UploadError;
pub use payload::{GazeSubmission, TrialSubmission, decode_gaze, encode_gaze};
pub use pipeline::{
    ADD_GAZE_DATA_PATH, ADD_TRIAL_PATH, NEXT_LOCATION, PipelineOutcome, Stage,
    SubmissionPipeline,
};
pub use transport::{HttpTransport, Transport, TransportResponse};

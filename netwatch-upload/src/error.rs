/// Failures of a submission stage. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The server answered with a non-success status.
    #[error("HTTP error! Status: {status}")]
    Status { status: u16 },
    /// The request never produced a response.
    #[error("Network error: {0}")]
    Network(String),
    /// The response body was not the JSON the stage expects.
    #[error("Invalid response body: {0}")]
    InvalidResponse(String),
    /// The server base URL or a stage path is not a valid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// The payload could not be serialized or compressed.
    #[error("Failed to encode payload: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for UploadError {
    fn from(e: serde_json::Error) -> Self {
        UploadError::Encode(e.to_string())
    }
}

impl From<std::io::Error> for UploadError {
    fn from(e: std::io::Error) -> Self {
        UploadError::Encode(e.to_string())
    }
}

use thiserror::Error;

/// Error taxonomy for the generation pipeline.
///
/// Every stage catches these and degrades to its documented fallback, so
/// they rarely escape the library. They are still typed so tests and log
/// output can tell a dead remote service from a garbled reply.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("remote service error: {0}")]
    RemoteService(String),

    #[error("malformed service reply: {0}")]
    MalformedResponse(String),

    #[error("synthesis deadline of {seconds}s exceeded")]
    SynthesisTimeout { seconds: u64 },

    #[error("audio assembly failed: {0}")]
    Assembly(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        PipelineError::RemoteService(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::MalformedResponse(err.to_string())
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

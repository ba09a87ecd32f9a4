use thiserror::Error;

use crate::validator::SchemaViolation;

/// Error taxonomy for an extraction session.
///
/// Only `SchemaViolation` is recoverable (it drives the bounded retry loop);
/// every other kind is fatal for the session that raised it. None of these
/// cross the caller boundary — the public entry points reduce them to an
/// empty item list and leave the detail to logs and the session transcript.
#[derive(Error, Debug)]
pub enum RfqError {
    #[error("Missing generative service credential: {0}")]
    Configuration(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Response is not parseable JSON: {0}")]
    MalformedResponse(String),

    #[error("Schema violation at {0}")]
    SchemaViolation(SchemaViolation),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RfqError>;

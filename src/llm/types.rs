use serde::{Deserialize, Serialize};

/// Progress events emitted over an optional channel while a session runs.
/// Purely observational; dropping the receiver never affects the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExtractionEvent {
    Starting,
    Requesting { attempt: usize },
    Validating { attempt: usize },
    CorrectionNeeded { attempt: usize, path: String, reason: String },
    Success { item_count: usize },
    Failed { reason: String },
}

//! The extraction and repair loop.
//!
//! One [`ExtractionSession`] owns one inquiry text and a bounded
//! conversation with the generative service. Each attempt sends the
//! accumulated conversation, strips code fences from the reply, parses it,
//! runs the normalizer's repair pass, then validates. A schema violation is
//! the only recoverable failure: the violating reply and a correction
//! instruction are appended to the conversation and the loop retries, up to
//! a bound fixed at construction. Transport and parse failures end the
//! session immediately — retrying them cannot change the outcome the way a
//! correction turn can.
//!
//! Nothing escapes the boundary: every failure mode reduces to an empty
//! item list, with the distinguishing detail kept in the session transcript
//! and the log.

use log::{debug, info, warn};
use tokio::sync::mpsc::Sender;

use crate::catalog::OptionCatalog;
use crate::error::RfqError;
use crate::llm::client::{ChatMessage, ChatService};
use crate::llm::prompts;
use crate::llm::types::ExtractionEvent;
use crate::normalizer::normalize;
use crate::schema::{LineItem, RfqItems};
use crate::validator::{validate_items, SchemaViolation};

/// Retry bound applied when none is configured.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Where a session currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Requested,
    Validating,
    Accepted,
    Retrying,
    Exhausted,
}

/// Which fatal taxonomy member ended a failed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Configuration,
    Transport,
    MalformedResponse,
    Exhausted,
}

/// Terminal result of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Succeeded(Vec<LineItem>),
    Failed(FailureKind),
}

/// One attempt's reply and, when it failed validation, why.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub response: String,
    pub violation: Option<SchemaViolation>,
}

/// The transcript and outcome of one analysis invocation. Created per call,
/// consumed by the caller, never shared across invocations.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionSession {
    pub raw_text: String,
    pub transcript: Vec<AttemptRecord>,
    pub state: SessionState,
    pub outcome: SessionOutcome,
}

impl ExtractionSession {
    fn new(raw_text: &str) -> Self {
        Self {
            raw_text: raw_text.to_string(),
            transcript: Vec::new(),
            state: SessionState::Init,
            outcome: SessionOutcome::Failed(FailureKind::Exhausted),
        }
    }

    /// Number of service replies consumed.
    pub fn attempts(&self) -> usize {
        self.transcript.len()
    }

    /// Reduces the outcome to the boundary contract: a fully valid item
    /// list, or empty on any failure.
    pub fn into_items(self) -> Vec<LineItem> {
        match self.outcome {
            SessionOutcome::Succeeded(items) => items,
            SessionOutcome::Failed(_) => Vec::new(),
        }
    }
}

/// Drives extraction sessions against a [`ChatService`].
pub struct RfqExtractor<C: ChatService> {
    client: C,
    catalog: OptionCatalog,
    max_attempts: usize,
}

impl<C: ChatService> RfqExtractor<C> {
    pub fn new(client: C, catalog: OptionCatalog) -> Self {
        Self {
            client,
            catalog,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Overrides the retry bound. Clamped to at least one attempt.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// The caller boundary: a valid non-empty list on success, an empty
    /// list on any failure. Never panics, never returns an error.
    pub async fn analyze(&self, raw_text: &str) -> Vec<LineItem> {
        self.extract(raw_text, None).await.into_items()
    }

    /// Runs the full state machine and returns the session with its
    /// transcript, for callers that want diagnostics alongside the items.
    pub async fn extract(
        &self,
        raw_text: &str,
        progress: Option<Sender<ExtractionEvent>>,
    ) -> ExtractionSession {
        self.send_event(&progress, ExtractionEvent::Starting).await;
        let mut session = ExtractionSession::new(raw_text);

        // Init -> Exhausted without consuming an attempt: no credential, no
        // network call.
        if !self.client.is_configured() {
            warn!("generative service credential missing; session fails with zero attempts");
            session.state = SessionState::Exhausted;
            session.outcome = SessionOutcome::Failed(FailureKind::Configuration);
            self.send_event(
                &progress,
                ExtractionEvent::Failed {
                    reason: "missing credential".to_string(),
                },
            )
            .await;
            return session;
        }

        let mut conversation = prompts::initial_conversation(&self.catalog, raw_text);

        for attempt in 1..=self.max_attempts {
            session.state = SessionState::Requested;
            self.send_event(&progress, ExtractionEvent::Requesting { attempt })
                .await;

            let raw = match self.client.chat(&conversation).await {
                Ok(text) => text,
                Err(err) => {
                    warn!("attempt {attempt}: fatal service failure: {err}");
                    session.state = SessionState::Exhausted;
                    session.outcome = SessionOutcome::Failed(failure_kind(&err));
                    self.send_event(
                        &progress,
                        ExtractionEvent::Failed {
                            reason: err.to_string(),
                        },
                    )
                    .await;
                    return session;
                }
            };

            session.state = SessionState::Validating;
            self.send_event(&progress, ExtractionEvent::Validating { attempt })
                .await;

            match evaluate_response(&raw) {
                Ok(items) => {
                    info!("attempt {attempt}: accepted {} line item(s)", items.len());
                    session.transcript.push(AttemptRecord {
                        response: raw,
                        violation: None,
                    });
                    session.state = SessionState::Accepted;
                    self.send_event(
                        &progress,
                        ExtractionEvent::Success {
                            item_count: items.len(),
                        },
                    )
                    .await;
                    session.outcome = SessionOutcome::Succeeded(items);
                    return session;
                }
                Err(RfqError::SchemaViolation(violation)) => {
                    debug!(
                        "attempt {attempt}: schema violation at {}: {}",
                        violation.path, violation.reason
                    );
                    self.send_event(
                        &progress,
                        ExtractionEvent::CorrectionNeeded {
                            attempt,
                            path: violation.path.clone(),
                            reason: violation.reason.clone(),
                        },
                    )
                    .await;

                    session.transcript.push(AttemptRecord {
                        response: raw.clone(),
                        violation: Some(violation.clone()),
                    });

                    if attempt < self.max_attempts {
                        // The service sees its own bad answer, then the
                        // correction, as two fresh conversation turns.
                        session.state = SessionState::Retrying;
                        conversation.push(ChatMessage::assistant(raw));
                        conversation.push(ChatMessage::user(prompts::build_correction_prompt(
                            &violation,
                        )));
                    } else {
                        warn!(
                            "retry bound of {} reached; last violation at {}",
                            self.max_attempts, violation.path
                        );
                        session.state = SessionState::Exhausted;
                        session.outcome = SessionOutcome::Failed(FailureKind::Exhausted);
                        self.send_event(
                            &progress,
                            ExtractionEvent::Failed {
                                reason: format!("attempts exhausted; last violation: {violation}"),
                            },
                        )
                        .await;
                        return session;
                    }
                }
                Err(err) => {
                    warn!("attempt {attempt}: unparseable response ends the session: {err}");
                    session.transcript.push(AttemptRecord {
                        response: raw,
                        violation: None,
                    });
                    session.state = SessionState::Exhausted;
                    session.outcome = SessionOutcome::Failed(failure_kind(&err));
                    self.send_event(
                        &progress,
                        ExtractionEvent::Failed {
                            reason: err.to_string(),
                        },
                    )
                    .await;
                    return session;
                }
            }
        }

        session.state = SessionState::Exhausted;
        session.outcome = SessionOutcome::Failed(FailureKind::Exhausted);
        session
    }

    async fn send_event(&self, sender: &Option<Sender<ExtractionEvent>>, event: ExtractionEvent) {
        if let Some(tx) = sender {
            let _ = tx.send(event).await;
        }
    }
}

/// One attempt's reply reduced to `Result`: items on success, a
/// recoverable `SchemaViolation`, or a fatal parse error.
fn evaluate_response(raw: &str) -> Result<Vec<LineItem>, RfqError> {
    let stripped = strip_code_fences(raw);
    let parsed: serde_json::Value = serde_json::from_str(stripped)
        .map_err(|e| RfqError::MalformedResponse(e.to_string()))?;

    let candidate = normalize(&parsed);
    validate_items(&candidate).map_err(RfqError::SchemaViolation)?;

    // A validated candidate deserializes by construction.
    let rfq: RfqItems = serde_json::from_value(candidate)?;
    Ok(rfq.items)
}

fn failure_kind(err: &RfqError) -> FailureKind {
    match err {
        RfqError::Configuration(_) => FailureKind::Configuration,
        RfqError::Transport(_) => FailureKind::Transport,
        RfqError::MalformedResponse(_) | RfqError::Serialization(_) => {
            FailureKind::MalformedResponse
        }
        RfqError::SchemaViolation(_) => FailureKind::Exhausted,
    }
}

/// Strips an optional Markdown code fence (```json ... ``` or ``` ... ```)
/// from a reply, returning the inner text.
fn strip_code_fences(raw: &str) -> &str {
    let text = raw.trim();

    if let Some(start) = text.find("```json") {
        let rest = &text[start + "```json".len()..];
        let end = rest.find("```").unwrap_or(rest.len());
        return rest[..end].trim();
    }

    if let Some(start) = text.find("```") {
        let rest = &text[start + "```".len()..];
        let end = rest.find("```").unwrap_or(rest.len());
        return rest[..end].trim();
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted stand-in for the generative service: replays a fixed list
    /// of replies (or transport failures) and records every conversation it
    /// was sent.
    struct ScriptedClient {
        configured: bool,
        script: Mutex<Vec<Step>>,
        calls: AtomicUsize,
        conversations: Mutex<Vec<Vec<ChatMessage>>>,
    }

    enum Step {
        Reply(String),
        TransportFailure,
    }

    impl ScriptedClient {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                configured: true,
                script: Mutex::new(steps),
                calls: AtomicUsize::new(0),
                conversations: Mutex::new(Vec::new()),
            }
        }

        fn unconfigured() -> Self {
            let mut client = Self::new(Vec::new());
            client.configured = false;
            client
        }

        fn replies(replies: &[&str]) -> Self {
            Self::new(replies.iter().map(|r| Step::Reply(r.to_string())).collect())
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn conversation(&self, call: usize) -> Vec<ChatMessage> {
            self.conversations.lock().unwrap()[call].clone()
        }
    }

    impl ChatService for &ScriptedClient {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.conversations.lock().unwrap().push(messages.to_vec());
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                return Err(RfqError::Transport("script exhausted".to_string()));
            }
            match script.remove(0) {
                Step::Reply(text) => Ok(text),
                Step::TransportFailure => {
                    Err(RfqError::Transport("service unreachable".to_string()))
                }
            }
        }
    }

    fn valid_response() -> String {
        serde_json::json!({
            "items": [{
                "material_type": "Stainless Steel",
                "material_spec": "316L",
                "form": "Plate",
                "dimensions": "30mm*30mm*40mm",
                "quantity": "10 pcs",
                "qualification": "ISO",
                "notes": "block, smallest edge 30mm",
                "confidence": 0.95,
                "item_index": 0
            }]
        })
        .to_string()
    }

    fn extractor(client: &ScriptedClient) -> RfqExtractor<&ScriptedClient> {
        RfqExtractor::new(client, OptionCatalog::default())
    }

    #[tokio::test]
    async fn compliant_first_response_accepts_on_attempt_one() {
        let client = ScriptedClient::replies(&[&valid_response()]);
        let session = extractor(&client).extract("316L block", None).await;

        assert_eq!(session.state, SessionState::Accepted);
        assert_eq!(session.attempts(), 1);
        assert_eq!(client.calls(), 1);

        let items = session.into_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].material_spec, "316L");
        assert_eq!(items[0].quantity, "10 pcs");
        assert_eq!(items[0].confidence, 0.95);
    }

    #[tokio::test]
    async fn fenced_response_is_unwrapped() {
        let fenced = format!("```json\n{}\n```", valid_response());
        let client = ScriptedClient::replies(&[&fenced]);
        let session = extractor(&client).extract("316L block", None).await;
        assert_eq!(session.state, SessionState::Accepted);
    }

    #[tokio::test]
    async fn violation_feeds_back_and_second_attempt_succeeds() {
        let missing_unit = serde_json::json!({
            "items": [{
                "material_type": "Stainless Steel",
                "material_spec": "316L",
                "form": "Plate",
                "dimensions": "30mm*30mm*40mm",
                "quantity": "2000",
                "qualification": "ISO",
                "notes": ""
            }]
        })
        .to_string();

        let client = ScriptedClient::replies(&[&missing_unit, &valid_response()]);
        let session = extractor(&client).extract("316L block", None).await;

        assert_eq!(session.state, SessionState::Accepted);
        assert_eq!(session.attempts(), 2);
        assert_eq!(client.calls(), 2);

        let first = &session.transcript[0];
        let violation = first.violation.as_ref().unwrap();
        assert_eq!(violation.path, "$.items[0].quantity");

        // Retry conversation = original two turns + bad answer + correction.
        let retry = client.conversation(1);
        assert_eq!(retry.len(), 4);
        assert_eq!(retry[2].content, missing_unit);
        assert!(retry[3].content.contains("$.items[0].quantity"));
    }

    #[tokio::test]
    async fn correlated_violations_exhaust_the_bound() {
        let bad = serde_json::json!({ "items": [{ "material_type": "Copper" }] }).to_string();
        let client = ScriptedClient::replies(&[&bad, &bad, &bad, &bad, &bad]);
        let session = extractor(&client).extract("copper", None).await;

        assert_eq!(session.state, SessionState::Exhausted);
        assert_eq!(
            session.outcome,
            SessionOutcome::Failed(FailureKind::Exhausted)
        );
        assert_eq!(session.attempts(), DEFAULT_MAX_ATTEMPTS);
        assert_eq!(client.calls(), DEFAULT_MAX_ATTEMPTS);
        assert!(session.into_items().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_is_fatal_without_retry() {
        let client = ScriptedClient::new(vec![
            Step::TransportFailure,
            Step::Reply(valid_response()),
        ]);
        let session = extractor(&client).extract("316L block", None).await;

        assert_eq!(session.state, SessionState::Exhausted);
        assert_eq!(
            session.outcome,
            SessionOutcome::Failed(FailureKind::Transport)
        );
        // the scripted valid reply was never requested
        assert_eq!(client.calls(), 1);
        assert!(session.into_items().is_empty());
    }

    #[tokio::test]
    async fn unparseable_response_is_fatal_without_retry() {
        let client = ScriptedClient::replies(&["not json at all", &valid_response()]);
        let session = extractor(&client).extract("316L block", None).await;

        assert_eq!(
            session.outcome,
            SessionOutcome::Failed(FailureKind::MalformedResponse)
        );
        assert_eq!(client.calls(), 1);
        assert_eq!(session.attempts(), 1);
    }

    #[tokio::test]
    async fn missing_credential_short_circuits_before_any_call() {
        let client = ScriptedClient::unconfigured();
        let session = extractor(&client).extract("316L block", None).await;

        assert_eq!(
            session.outcome,
            SessionOutcome::Failed(FailureKind::Configuration)
        );
        assert_eq!(session.attempts(), 0);
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn analyze_reduces_every_failure_to_empty() {
        let client = ScriptedClient::replies(&["garbage"]);
        let items = extractor(&client).analyze("whatever").await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn aliased_response_is_repaired_before_validation() {
        let aliased = serde_json::json!({
            "RFQ_items": [{
                "material": "Stainless Steel",
                "material_spec": "316L",
                "form_type": "Plate",
                "dimensions": "30mm*30mm*40mm",
                "quantity": "10 pcs",
                "notes": ""
            }]
        })
        .to_string();

        let client = ScriptedClient::replies(&[&aliased]);
        let session = extractor(&client).extract("316L block", None).await;

        assert_eq!(session.state, SessionState::Accepted);
        let items = session.into_items();
        assert_eq!(items[0].material_type, crate::catalog::MaterialType::StainlessSteel);
        assert_eq!(items[0].form, crate::catalog::Form::Plate);
        assert_eq!(items[0].qualification, crate::catalog::Qualification::Iso);
        assert_eq!(items[0].confidence, 0.9);
    }

    #[tokio::test]
    async fn progress_events_trace_the_retry() {
        let bad = serde_json::json!({ "items": [{ "material_type": "Copper" }] }).to_string();
        let client = ScriptedClient::replies(&[&bad, &valid_response()]);

        let (tx, mut rx) = tokio::sync::mpsc::channel(32);
        let session = extractor(&client).extract("316L block", Some(tx)).await;
        assert_eq!(session.state, SessionState::Accepted);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(matches!(events.first(), Some(ExtractionEvent::Starting)));
        assert!(events
            .iter()
            .any(|e| matches!(e, ExtractionEvent::CorrectionNeeded { .. })));
        assert!(matches!(
            events.last(),
            Some(ExtractionEvent::Success { item_count: 1 })
        ));
    }

    #[test]
    fn fence_stripping_handles_the_common_shapes() {
        assert_eq!(strip_code_fences("{\"items\":[]}"), "{\"items\":[]}");
        assert_eq!(strip_code_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("Here you go:\n```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("```json\n{}"), "{}");
    }

    #[test]
    fn retry_bound_is_clamped_to_at_least_one() {
        let client = ScriptedClient::replies(&[]);
        let extractor = RfqExtractor::new(&client, OptionCatalog::default()).with_max_attempts(0);
        assert_eq!(extractor.max_attempts, 1);
    }
}

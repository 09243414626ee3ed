//! Chat transcript and the per-turn request lifecycle.
//!
//! A turn starts with [`Session::begin`], which records the user's message and
//! marks the session as pending, and ends with [`Session::complete`], which
//! records exactly one assistant message whatever the outcome was.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::client::TripApi;
use crate::config::DEFAULT_WELCOME_MESSAGE;
use crate::errors::{TripAgentError, TripAgentResult};
use crate::types::{FinalResponseRequest, FinalResponseResponse};

/// Raised locally when the server reports success without usable text.
pub const EMPTY_RESPONSE_MESSAGE: &str = "Failed to generate response";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Author {
    User,
    Assistant,
}

/// One transcript entry. Immutable once created.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    id: Uuid,
    text: String,
    author: Author,
    created_at: DateTime<Utc>,
}

impl Message {
    fn new(author: Author, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            author,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn author(&self) -> Author {
        self.author
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Why a submission was refused before anything was sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("message is empty")]
    EmptyInput,

    #[error("a response is still pending")]
    Busy,
}

/// Ticket for the outstanding request of a session.
///
/// Must be handed back to [`Session::complete`] or [`Session::abandon`].
#[derive(Debug)]
#[must_use = "a pending turn must be completed or abandoned"]
pub struct PendingTurn {
    session_id: Uuid,
    seq: u64,
    query: String,
}

impl PendingTurn {
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The request the chat flow sends for this turn.
    pub fn request(&self) -> FinalResponseRequest {
        FinalResponseRequest::for_user_query(self.query.clone())
    }
}

/// Transcript plus the "awaiting response" flag.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    transcript: Vec<Message>,
    // Sequence number of the outstanding turn; `None` while idle.
    outstanding: Option<u64>,
    next_seq: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_WELCOME_MESSAGE)
    }
}

impl Session {
    /// A new idle session whose transcript holds only the welcome message.
    pub fn new(welcome: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            transcript: vec![Message::new(Author::Assistant, welcome)],
            outstanding: None,
            next_seq: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn len(&self) -> usize {
        self.transcript.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }

    pub fn is_pending(&self) -> bool {
        self.outstanding.is_some()
    }

    pub fn last(&self) -> Option<&Message> {
        self.transcript.last()
    }

    /// Records the user's message and moves the session to awaiting.
    pub fn begin(&mut self, text: &str) -> Result<PendingTurn, SubmitError> {
        if self.is_pending() {
            return Err(SubmitError::Busy);
        }
        if text.trim().is_empty() {
            return Err(SubmitError::EmptyInput);
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.outstanding = Some(seq);
        self.transcript.push(Message::new(Author::User, text));
        debug!("Session {} awaiting turn {}", self.id, seq);

        Ok(PendingTurn {
            session_id: self.id,
            seq,
            query: text.to_string(),
        })
    }

    /// Applies the outcome of `turn` and returns the appended assistant message.
    ///
    /// Returns `None` and leaves the session untouched when `turn` is not the
    /// one this session is waiting for.
    pub fn complete(
        &mut self,
        turn: PendingTurn,
        outcome: TripAgentResult<FinalResponseResponse>,
    ) -> Option<&Message> {
        if !self.owns(&turn) {
            warn!(
                "Discarding late response for turn {} of session {}",
                turn.seq, turn.session_id
            );
            return None;
        }

        let text = match outcome.and_then(validate_response) {
            Ok(text) => {
                info!("Turn {} answered ({} bytes)", turn.seq, text.len());
                text
            }
            Err(e) => {
                warn!("Turn {} failed: {}", turn.seq, e);
                e.user_message()
            }
        };

        self.outstanding = None;
        self.transcript.push(Message::new(Author::Assistant, text));
        self.transcript.last()
    }

    /// Gives up on `turn` without recording a reply. Anything that arrives
    /// for it afterwards is discarded by [`Session::complete`].
    pub fn abandon(&mut self, turn: PendingTurn) {
        if self.owns(&turn) {
            debug!("Session {} abandoned turn {}", self.id, turn.seq);
            self.outstanding = None;
        }
    }

    /// Runs a full turn against `api`: record, send, record the reply.
    pub async fn submit<A>(&mut self, api: &A, text: &str) -> Result<&Message, SubmitError>
    where
        A: TripApi + ?Sized,
    {
        let turn = self.begin(text)?;
        let outcome = api.generate_final_response(turn.request()).await;
        let session_id = self.id;
        self.complete(turn, outcome).ok_or_else(|| {
            // Unreachable: the turn was issued by this session a moment ago.
            warn!("Session {} lost its own turn", session_id);
            SubmitError::Busy
        })
    }

    fn owns(&self, turn: &PendingTurn) -> bool {
        turn.session_id == self.id && self.outstanding == Some(turn.seq)
    }
}

fn validate_response(response: FinalResponseResponse) -> TripAgentResult<String> {
    if response.response.trim().is_empty() {
        return Err(TripAgentError::Validation(
            EMPTY_RESPONSE_MESSAGE.to_string(),
        ));
    }
    Ok(response.response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    enum Reply {
        Ok(FinalResponseResponse),
        Err(fn() -> TripAgentError),
    }

    struct MockApi {
        reply: Reply,
        requests: Mutex<Vec<FinalResponseRequest>>,
    }

    impl MockApi {
        fn answering(text: &str) -> Self {
            Self::new(Reply::Ok(FinalResponseResponse {
                success: true,
                response: text.to_string(),
                message: None,
            }))
        }

        fn new(reply: Reply) -> Self {
            Self {
                reply,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TripApi for MockApi {
        async fn check_health(&self) -> TripAgentResult<HealthResponse> {
            Ok(HealthResponse::default())
        }

        async fn get_api_info(&self) -> TripAgentResult<ApiInfo> {
            Ok(serde_json::Value::Null)
        }

        async fn generate_final_response(
            &self,
            request: FinalResponseRequest,
        ) -> TripAgentResult<FinalResponseResponse> {
            self.requests.lock().unwrap().push(request);
            match &self.reply {
                Reply::Ok(resp) => Ok(resp.clone()),
                Reply::Err(make) => Err(make()),
            }
        }

        async fn gather_additional_info(
            &self,
            request: AdditionalInfoRequest,
        ) -> TripAgentResult<AdditionalInfoResponse> {
            Ok(AdditionalInfoResponse {
                query: request.query,
                ..AdditionalInfoResponse::default()
            })
        }
    }

    #[test]
    fn new_session_is_idle_with_welcome() {
        let session = Session::default();
        assert!(!session.is_pending());
        assert_eq!(session.len(), 1);
        let welcome = &session.transcript()[0];
        assert_eq!(welcome.author(), Author::Assistant);
        assert_eq!(welcome.text(), DEFAULT_WELCOME_MESSAGE);
    }

    #[tokio::test]
    async fn successful_turn_appends_user_then_assistant() {
        let api = MockApi::answering("Paris is lovely");
        let mut session = Session::default();

        let reply = session.submit(&api, "Where should I go?").await.unwrap();
        assert_eq!(reply.text(), "Paris is lovely");
        assert_eq!(reply.author(), Author::Assistant);

        assert_eq!(session.len(), 3);
        assert_eq!(session.transcript()[1].author(), Author::User);
        assert_eq!(session.transcript()[1].text(), "Where should I go?");
        assert!(!session.is_pending());

        let sent = api.requests.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].content.as_deref(), Some(""));
        assert_eq!(sent[0].user_query.as_deref(), Some("Where should I go?"));
    }

    #[test]
    fn pending_spans_begin_to_complete() {
        let mut session = Session::default();
        let turn = session.begin("Rome?").unwrap();
        assert!(session.is_pending());
        assert_eq!(session.len(), 2);

        assert_eq!(session.begin("again").unwrap_err(), SubmitError::Busy);
        assert_eq!(session.len(), 2);

        session.complete(
            turn,
            Ok(FinalResponseResponse {
                success: true,
                response: "Rome is great".to_string(),
                message: None,
            }),
        );
        assert!(!session.is_pending());
        assert_eq!(session.len(), 3);
    }

    #[test]
    fn blank_input_is_refused_without_side_effects() {
        let mut session = Session::default();
        assert_eq!(session.begin("   \n").unwrap_err(), SubmitError::EmptyInput);
        assert_eq!(session.len(), 1);
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn empty_response_becomes_failure_message() {
        let api = MockApi::answering("");
        let mut session = Session::default();
        let reply = session.submit(&api, "hello").await.unwrap();
        assert_eq!(reply.text(), EMPTY_RESPONSE_MESSAGE);
        assert_eq!(session.len(), 3);
    }

    #[tokio::test]
    async fn missing_response_body_becomes_failure_message() {
        let api = MockApi::new(Reply::Ok(FinalResponseResponse::default()));
        let mut session = Session::default();
        let reply = session.submit(&api, "hello").await.unwrap();
        assert_eq!(reply.text(), EMPTY_RESPONSE_MESSAGE);
        assert!(!reply.text().is_empty());
    }

    #[tokio::test]
    async fn network_failure_message_is_shown() {
        let api = MockApi::new(Reply::Err(|| TripAgentError::Network("timeout".to_string())));
        let mut session = Session::default();
        let reply = session.submit(&api, "hello").await.unwrap();
        assert_eq!(reply.text(), "timeout");
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn server_detail_is_preferred() {
        let api = MockApi::new(Reply::Err(|| TripAgentError::Request {
            status: 500,
            detail: Some("Internal server error: quota exceeded".to_string()),
        }));
        let mut session = Session::default();
        let reply = session.submit(&api, "hello").await.unwrap();
        assert_eq!(reply.text(), "Internal server error: quota exceeded");
    }

    #[test]
    fn late_outcome_for_abandoned_turn_is_discarded() {
        let mut session = Session::default();
        let turn = session.begin("Lisbon?").unwrap();
        let stale = PendingTurn {
            session_id: turn.session_id,
            seq: turn.seq,
            query: turn.query.clone(),
        };
        session.abandon(turn);
        assert!(!session.is_pending());

        let applied = session.complete(
            stale,
            Ok(FinalResponseResponse {
                success: true,
                response: "too late".to_string(),
                message: None,
            }),
        );
        assert!(applied.is_none());
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn turn_from_another_session_is_ignored() {
        let mut first = Session::default();
        let mut second = Session::default();
        let foreign = first.begin("Oslo?").unwrap();
        let own = second.begin("Bergen?").unwrap();

        assert!(second.complete(foreign, Err(TripAgentError::Network("x".into()))).is_none());
        assert!(second.is_pending());
        assert_eq!(second.len(), 2);

        assert!(second.complete(own, Err(TripAgentError::Network("x".into()))).is_some());
        assert_eq!(second.len(), 3);
    }

    #[tokio::test]
    async fn each_submission_adds_exactly_two_entries() {
        let api = MockApi::answering("ok");
        let mut session = Session::default();
        for (i, text) in ["one", "two", "three"].iter().enumerate() {
            session.submit(&api, text).await.unwrap();
            assert_eq!(session.len(), 1 + 2 * (i + 1));
        }
        let authors: Vec<Author> = session.transcript().iter().map(Message::author).collect();
        assert_eq!(
            authors,
            vec![
                Author::Assistant,
                Author::User,
                Author::Assistant,
                Author::User,
                Author::Assistant,
                Author::User,
                Author::Assistant,
            ]
        );
    }
}

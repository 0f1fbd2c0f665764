//! Conversation session: an append-only transcript driven by one chat request at a time.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::{
    domain::{Product, Role},
    protocol::{ChatReply, ReplyKind},
};
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    error::ValidationError,
    navigation::{Navigator, ProductRoute},
    transport::ChatTransport,
};

pub const WELCOME_MESSAGE: &str = "Hello! I'm your furniture shopping assistant. I can help you find the perfect furniture for your home. Try asking me something like: 'I need furniture for my living room' or 'What's good for a small bedroom?'";
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub recommendations: Vec<Product>,
    pub follow_ups: Vec<String>,
    pub reply_kind: Option<ReplyKind>,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            recommendations: Vec::new(),
            follow_ups: Vec::new(),
            reply_kind: None,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            ..Self::user(text)
        }
    }

    pub fn from_reply(reply: ChatReply) -> Self {
        Self {
            recommendations: reply.products.unwrap_or_default(),
            follow_ups: reply.clarifying_questions.unwrap_or_default(),
            reply_kind: reply.response_type,
            ..Self::assistant(reply.message)
        }
    }

    pub fn fallback() -> Self {
        Self::assistant(FALLBACK_REPLY)
    }

    pub fn welcome() -> Self {
        Self::assistant(WELCOME_MESSAGE)
    }
}

/// Ordered history of turns. `append` is the only mutator.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    turns: Vec<Arc<Turn>>,
}

impl Transcript {
    pub fn append(&mut self, turn: Turn) -> Arc<Turn> {
        let turn = Arc::new(turn);
        self.turns.push(Arc::clone(&turn));
        turn
    }

    pub fn turns(&self) -> &[Arc<Turn>] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last_recommendations(&self) -> &[Product] {
        self.turns
            .iter()
            .rev()
            .find(|turn| turn.role == Role::Assistant && !turn.recommendations.is_empty())
            .map(|turn| turn.recommendations.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    Invalid(ValidationError),
    AwaitingReply,
    TornDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Answered,
    FellBack,
    Rejected(SubmitRejection),
    /// The reply arrived after `shutdown` and was dropped.
    Discarded,
}

#[derive(Debug, Clone)]
pub enum ConversationEvent {
    TurnAppended(Arc<Turn>),
    AwaitingReply(bool),
}

#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub transcript: Transcript,
    pub pending_input: String,
    pub is_awaiting_reply: bool,
}

struct SessionState {
    transcript: Transcript,
    pending_input: String,
    awaiting_reply: bool,
}

/// State shared with the task that completes an in-flight exchange.
struct Session {
    state: Mutex<SessionState>,
    events: broadcast::Sender<ConversationEvent>,
    lifecycle: CancellationToken,
}

impl Session {
    fn emit(&self, event: ConversationEvent) {
        let _ = self.events.send(event);
    }

    /// Lands the assistant turn for an accepted submission; `None` appends the fallback.
    async fn finish_exchange(&self, reply: Option<ChatReply>) -> SubmitOutcome {
        let mut state = self.state.lock().await;
        if self.lifecycle.is_cancelled() {
            debug!("discarding chat reply that arrived after teardown");
            return SubmitOutcome::Discarded;
        }

        let (turn, outcome) = match reply {
            Some(reply) => {
                let turn = Turn::from_reply(reply);
                info!(
                    recommendations = turn.recommendations.len(),
                    follow_ups = turn.follow_ups.len(),
                    "assistant replied"
                );
                (turn, SubmitOutcome::Answered)
            }
            None => (Turn::fallback(), SubmitOutcome::FellBack),
        };

        let turn = state.transcript.append(turn);
        state.awaiting_reply = false;
        self.emit(ConversationEvent::TurnAppended(turn));
        self.emit(ConversationEvent::AwaitingReply(false));
        outcome
    }
}

pub struct ConversationController {
    transport: Arc<dyn ChatTransport>,
    navigator: Arc<dyn Navigator>,
    session: Arc<Session>,
}

impl ConversationController {
    pub fn new(transport: Arc<dyn ChatTransport>, navigator: Arc<dyn Navigator>) -> Self {
        let (events, _) = broadcast::channel(64);
        let mut transcript = Transcript::default();
        transcript.append(Turn::welcome());
        Self {
            transport,
            navigator,
            session: Arc::new(Session {
                state: Mutex::new(SessionState {
                    transcript,
                    pending_input: String::new(),
                    awaiting_reply: false,
                }),
                events,
                lifecycle: CancellationToken::new(),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.session.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.session.state.lock().await;
        SessionSnapshot {
            transcript: state.transcript.clone(),
            pending_input: state.pending_input.clone(),
            is_awaiting_reply: state.awaiting_reply,
        }
    }

    pub async fn is_awaiting_reply(&self) -> bool {
        self.session.state.lock().await.awaiting_reply
    }

    pub async fn set_pending_input(&self, text: impl Into<String>) {
        self.session.state.lock().await.pending_input = text.into();
    }

    pub async fn submit_pending(&self) -> SubmitOutcome {
        let pending = self.session.state.lock().await.pending_input.clone();
        self.submit(&pending).await
    }

    /// Sends one message and appends the reply (or the fallback turn) to the transcript.
    ///
    /// Transport failures never surface here. Submissions made while a reply is
    /// outstanding are dropped, not queued. The exchange runs on its own task, so the
    /// assistant turn lands even if the caller stops polling this future.
    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let message = text.trim();
        if message.is_empty() {
            debug!("ignoring empty chat submission");
            return SubmitOutcome::Rejected(SubmitRejection::Invalid(
                ValidationError::EmptyMessage,
            ));
        }

        {
            let mut state = self.session.state.lock().await;
            if self.session.lifecycle.is_cancelled() {
                return SubmitOutcome::Rejected(SubmitRejection::TornDown);
            }
            if state.awaiting_reply {
                debug!("dropping chat submission while a reply is outstanding");
                return SubmitOutcome::Rejected(SubmitRejection::AwaitingReply);
            }
            let turn = state.transcript.append(Turn::user(message));
            state.pending_input.clear();
            state.awaiting_reply = true;
            self.session.emit(ConversationEvent::TurnAppended(turn));
            self.session.emit(ConversationEvent::AwaitingReply(true));
        }

        let transport = Arc::clone(&self.transport);
        let session = Arc::clone(&self.session);
        let message = message.to_string();
        let exchange = tokio::spawn(async move {
            let reply = match transport.send_message(&message).await {
                Ok(reply) => Some(reply),
                Err(error) => {
                    warn!(%error, "chat request failed; appending fallback reply");
                    None
                }
            };
            session.finish_exchange(reply).await
        });

        match exchange.await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(%error, "chat exchange task failed; appending fallback reply");
                self.session.finish_exchange(None).await
            }
        }
    }

    pub fn select_product(&self, product: Product) {
        self.navigator
            .open_product(ProductRoute::for_product(&product), product);
    }

    /// Tears the session down; replies still in flight are discarded when they land.
    pub fn shutdown(&self) {
        self.session.lifecycle.cancel();
    }
}

#[cfg(test)]
#[path = "tests/conversation_tests.rs"]
mod tests;

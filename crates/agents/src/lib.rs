use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use guardian_core::{
    ChatInput, ChatReply, ConversationMessage, ConversationSession, EngineError, IntentEngine,
    QuickAccessInput, Sender, SnapshotProvider, StateSnapshot, TypingState, WELCOME_TEXT,
};
use guardian_observability::AppMetrics;
use guardian_storage::SessionRepository;
use thiserror::Error;
use tracing::{debug, info, instrument, warn, Level};
use uuid::Uuid;

pub const DEFAULT_TYPING_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_HISTORY_LIMIT: usize = 200;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("message text is empty")]
    EmptyMessage,
    #[error("session `{0}` not found")]
    UnknownSession(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("session store failure: {0}")]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub typing_delay: Duration,
    pub history_limit: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            typing_delay: DEFAULT_TYPING_DELAY,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// Owns the chat conversations: appends messages, runs the typing delay and
/// asks the intent engine for replies.
#[derive(Clone)]
pub struct ChatAgent<S>
where
    S: SessionRepository,
{
    engine: Arc<IntentEngine>,
    snapshots: Arc<dyn SnapshotProvider>,
    store: Arc<S>,
    metrics: Arc<AppMetrics>,
    config: AgentConfig,
}

impl<S> ChatAgent<S>
where
    S: SessionRepository,
{
    pub fn new(
        engine: Arc<IntentEngine>,
        snapshots: Arc<dyn SnapshotProvider>,
        store: Arc<S>,
        metrics: Arc<AppMetrics>,
        config: AgentConfig,
    ) -> Self {
        Self {
            engine,
            snapshots,
            store,
            metrics,
            config,
        }
    }

    pub fn engine(&self) -> &IntentEngine {
        &self.engine
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.snapshots.snapshot()
    }

    #[instrument(skip(self, input), fields(session_id = ?input.session_id))]
    pub async fn handle_chat(&self, input: ChatInput) -> Result<ChatReply, AgentError> {
        if input.text.trim().is_empty() {
            return Err(AgentError::EmptyMessage);
        }

        let started = Instant::now();
        self.metrics.inc_request();

        let mut session = self.load_or_create(input.session_id.as_deref()).await?;
        let session_id = session.session_id.clone();
        session
            .messages
            .push(message(&input.text, Sender::User, None));
        session.typing = TypingState::AwaitingResponse;
        self.store.upsert_session(&session).await?;

        if !self.config.typing_delay.is_zero() {
            tokio::time::sleep(self.config.typing_delay).await;
        }

        let resolution = self.engine.resolve(&input.text, &self.snapshots.snapshot());
        self.metrics.record_resolve(&resolution.intent);
        if tracing::enabled!(Level::DEBUG) {
            let trace = self.engine.matched_pattern(&input.text);
            debug!(intent = %trace.intent, pattern = ?trace.pattern, "intent matched");
        }

        // Reload so turns appended while this one was typing are kept.
        let mut session = self.load_or_create(Some(&session_id)).await?;
        session.messages.push(message(
            &resolution.text,
            Sender::Bot,
            Some(&resolution.intent),
        ));
        session.typing = TypingState::Idle;
        self.save(&mut session).await?;

        self.metrics.observe_latency(started.elapsed());
        info!(
            session_id = %session_id,
            intent = %resolution.intent,
            "chat handled"
        );

        Ok(ChatReply {
            session_id,
            intent: resolution.intent,
            reply_text: resolution.text,
            messages: session.messages,
        })
    }

    /// Answers a quick-access button. No typing delay and no user message;
    /// an unknown intent name is reported, never replaced by the fallback.
    #[instrument(skip(self, input), fields(intent = %input.intent))]
    pub async fn quick_access(&self, input: QuickAccessInput) -> Result<ChatReply, AgentError> {
        let started = Instant::now();
        self.metrics.inc_request();

        let text = match self.engine.respond_to(&input.intent, &self.snapshots.snapshot()) {
            Ok(text) => text,
            Err(err) => {
                self.metrics.inc_unknown_intent();
                warn!(intent = %input.intent, "quick access referenced an unknown intent");
                return Err(err.into());
            }
        };
        self.metrics.inc_quick_access();

        let mut session = self.load_or_create(input.session_id.as_deref()).await?;
        session
            .messages
            .push(message(&text, Sender::Bot, Some(&input.intent)));
        self.save(&mut session).await?;
        self.metrics.observe_latency(started.elapsed());

        Ok(ChatReply {
            session_id: session.session_id,
            intent: input.intent,
            reply_text: text,
            messages: session.messages,
        })
    }

    pub async fn history(&self, session_id: &str) -> Result<ConversationSession, AgentError> {
        self.store
            .load_session(session_id)
            .await?
            .ok_or_else(|| AgentError::UnknownSession(session_id.to_string()))
    }

    pub async fn purge_sessions_older_than(&self, max_age: chrono::Duration) -> Result<u64, AgentError> {
        Ok(self.store.purge_created_before(Utc::now() - max_age).await?)
    }

    async fn load_or_create(&self, session_id: Option<&str>) -> Result<ConversationSession, AgentError> {
        if let Some(id) = session_id {
            if let Some(session) = self.store.load_session(id).await? {
                return Ok(session);
            }
        }

        Ok(ConversationSession {
            session_id: session_id
                .map(ToString::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            created_at: Utc::now(),
            typing: TypingState::Idle,
            messages: vec![message(WELCOME_TEXT, Sender::Bot, None)],
        })
    }

    async fn save(&self, session: &mut ConversationSession) -> Result<(), AgentError> {
        let limit = self.config.history_limit.max(1);
        if session.messages.len() > limit {
            let keep_from = session.messages.len() - limit;
            session.messages = session.messages.split_off(keep_from);
        }

        self.store.upsert_session(session).await?;
        Ok(())
    }
}

fn message(text: &str, sender: Sender, intent: Option<&str>) -> ConversationMessage {
    ConversationMessage {
        id: Uuid::new_v4().to_string(),
        text: text.to_string(),
        sender,
        timestamp: Utc::now(),
        intent: intent.map(ToString::to_string),
    }
}

//! The assistant: classify, look up, respond.
//!
//! One [`Assistant`] is shared by every connection. Each connection owns a
//! [`Session`] carrying its own conversation history, so conversations never
//! see each other's turns.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use lettings_core::config::AssistantConfig;
use lettings_store::DataExecutor;

use crate::classifier;
use crate::completion::CompletionClient;
use crate::context::{ConversationContext, Lookup};
use crate::error::AssistantError;
use crate::router::Router;

/// Reply to any message received after [`Assistant::cleanup`].
pub const CLOSED_REPLY: &str = "This assistant session has been closed. Please reconnect to continue.";

/// Lifecycle of an [`Assistant`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    /// The executor is connected but no message has been handled yet.
    Initialized,
    Ready,
    Closed,
}

/// Per-connection conversation state.
#[derive(Debug, Clone)]
pub struct Session {
    context: ConversationContext,
    messages: u64,
}

impl Session {
    pub fn new(config: &AssistantConfig) -> Self {
        Self {
            context: ConversationContext::new(config),
            messages: 0,
        }
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    /// Number of messages handled in this session.
    pub fn message_count(&self) -> u64 {
        self.messages
    }

    pub fn clear(&mut self) {
        self.context.clear();
    }
}

pub struct Assistant {
    router: Router,
    completion: Arc<dyn CompletionClient>,
    config: AssistantConfig,
    state: Mutex<LifecycleState>,
}

impl Assistant {
    pub fn new(
        executor: Arc<dyn DataExecutor>,
        completion: Arc<dyn CompletionClient>,
        config: AssistantConfig,
    ) -> Self {
        Self {
            router: Router::new(executor),
            completion,
            config,
            state: Mutex::new(LifecycleState::Uninitialized),
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.lock().await
    }

    /// Start a conversation.
    pub fn new_session(&self) -> Session {
        Session::new(&self.config)
    }

    /// Connect the executor.
    ///
    /// A no-op once initialized; fails after [`cleanup`](Self::cleanup).
    pub async fn initialize(&self) -> Result<(), AssistantError> {
        let mut state = self.state.lock().await;
        self.initialize_locked(&mut state).await
    }

    async fn initialize_locked(&self, state: &mut LifecycleState) -> Result<(), AssistantError> {
        match *state {
            LifecycleState::Closed => Err(AssistantError::Closed),
            LifecycleState::Initialized | LifecycleState::Ready => Ok(()),
            LifecycleState::Uninitialized => {
                self.router.executor().connect().await?;
                *state = LifecycleState::Initialized;
                info!("Assistant initialized");
                Ok(())
            }
        }
    }

    /// Disconnect the executor and refuse further messages.
    pub async fn cleanup(&self) {
        let mut state = self.state.lock().await;
        if *state == LifecycleState::Closed {
            return;
        }
        if let Err(e) = self.router.executor().disconnect().await {
            warn!(error = %e, "Failed to disconnect executor");
        }
        *state = LifecycleState::Closed;
        info!("Assistant closed");
    }

    /// Handle one user message and return the reply text.
    ///
    /// Lookup and completion failures are absorbed into apologetic replies;
    /// the only error is a blank message.
    pub async fn process_message(
        &self,
        session: &mut Session,
        text: &str,
    ) -> Result<String, AssistantError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AssistantError::EmptyMessage);
        }

        if !self.ensure_ready().await {
            return Ok(CLOSED_REPLY.to_string());
        }
        session.messages += 1;

        let descriptor = classifier::classify(text);
        if !descriptor.ambiguities.is_empty() {
            debug!(ambiguities = ?descriptor.ambiguities, "Extraction was ambiguous");
        }

        let lookup = if descriptor.requires_lookup() {
            let response = self.router.dispatch(&descriptor, None).await;
            let correlation_id = response.correlation_id.clone();
            match response.into_result() {
                Ok(result) => Lookup::Found(result),
                Err(e) => {
                    warn!(
                        code = e.code,
                        message = %e.message,
                        detail = ?e.detail,
                        correlation_id = %correlation_id,
                        "Lookup failed"
                    );
                    Lookup::Unavailable
                }
            }
        } else {
            Lookup::Skipped
        };

        Ok(session
            .context
            .respond(self.completion.as_ref(), text, &lookup)
            .await)
    }

    /// Move towards Ready. Returns false when closed.
    async fn ensure_ready(&self) -> bool {
        let mut state = self.state.lock().await;
        match *state {
            LifecycleState::Closed => false,
            LifecycleState::Ready => true,
            LifecycleState::Initialized => {
                *state = LifecycleState::Ready;
                true
            }
            LifecycleState::Uninitialized => {
                // Stay uninitialized on failure so the next call retries.
                match self.initialize_locked(&mut state).await {
                    Ok(()) => *state = LifecycleState::Ready,
                    Err(e) => warn!(error = %e, "Lazy initialization failed"),
                }
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Role, Turn, APOLOGY};
    use async_trait::async_trait;
    use lettings_core::error::LettingsError;
    use lettings_core::protocol::{RequestEnvelope, ResponseEnvelope, RpcError};
    use lettings_store::{Database, DocumentExecutor};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Replies with the system prompt so tests can see the lookup context.
    #[derive(Default)]
    struct PromptEcho {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionClient for PromptEcho {
        async fn complete(&self, messages: &[Turn]) -> Result<String, AssistantError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(messages[0].role, Role::System);
            Ok(messages[0].content.clone())
        }
    }

    struct FailingExecutor {
        connects: StdMutex<u32>,
    }

    #[async_trait]
    impl DataExecutor for FailingExecutor {
        async fn connect(&self) -> Result<(), LettingsError> {
            *self.connects.lock().unwrap() += 1;
            Err(LettingsError::Storage("connection refused".to_string()))
        }

        async fn execute(&self, request: &RequestEnvelope) -> ResponseEnvelope {
            ResponseEnvelope::failure(
                RpcError::internal("connection refused"),
                request.correlation_id.clone(),
            )
        }

        async fn disconnect(&self) -> Result<(), LettingsError> {
            Ok(())
        }

        async fn is_connected(&self) -> bool {
            false
        }
    }

    async fn seeded_assistant() -> (Assistant, Arc<PromptEcho>) {
        let executor = DocumentExecutor::with_database(Arc::new(Database::in_memory().unwrap()));
        executor.seed_sample_data().await.unwrap();
        let completion = Arc::new(PromptEcho::default());
        let assistant = Assistant::new(
            Arc::new(executor),
            completion.clone(),
            AssistantConfig::default(),
        );
        (assistant, completion)
    }

    #[tokio::test]
    async fn test_lifecycle_transitions() {
        let (assistant, _) = seeded_assistant().await;
        assert_eq!(assistant.state().await, LifecycleState::Uninitialized);

        assistant.initialize().await.unwrap();
        assert_eq!(assistant.state().await, LifecycleState::Initialized);
        assistant.initialize().await.unwrap();
        assert_eq!(assistant.state().await, LifecycleState::Initialized);

        let mut session = assistant.new_session();
        assistant.process_message(&mut session, "hello").await.unwrap();
        assert_eq!(assistant.state().await, LifecycleState::Ready);

        assistant.cleanup().await;
        assert_eq!(assistant.state().await, LifecycleState::Closed);
        assert!(matches!(assistant.initialize().await, Err(AssistantError::Closed)));

        let reply = assistant.process_message(&mut session, "hello again").await.unwrap();
        assert_eq!(reply, CLOSED_REPLY);
        assert_eq!(session.message_count(), 1);
    }

    #[tokio::test]
    async fn test_first_message_initializes_lazily() {
        let (assistant, _) = seeded_assistant().await;
        let mut session = assistant.new_session();
        assistant.process_message(&mut session, "hi").await.unwrap();
        assert_eq!(assistant.state().await, LifecycleState::Ready);
    }

    #[tokio::test]
    async fn test_search_embeds_lookup_result() {
        let (assistant, completion) = seeded_assistant().await;
        let mut session = assistant.new_session();

        let reply = assistant
            .process_message(&mut session, "Show me 2-bedroom flats under £2000 in Manchester")
            .await
            .unwrap();
        assert!(reply.contains("PROP-001"));
        assert!(!reply.contains("PROP-002"));
        assert_eq!(completion.calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.context().len(), 2);
    }

    #[tokio::test]
    async fn test_city_before_rent_bound_still_matches() {
        let (assistant, _) = seeded_assistant().await;
        let mut session = assistant.new_session();
        let reply = assistant
            .process_message(&mut session, "Show me flats in Manchester under £2000")
            .await
            .unwrap();
        assert!(reply.contains("PROP-001"));
        assert!(!reply.contains("PROP-003"));
    }

    #[tokio::test]
    async fn test_tenant_lookup_embeds_resident() {
        let (assistant, _) = seeded_assistant().await;
        let mut session = assistant.new_session();
        let reply = assistant
            .process_message(&mut session, "Who is the current tenant of PROP-001?")
            .await
            .unwrap();
        assert!(reply.contains("James"));
        assert!(reply.contains("RES-001"));
    }

    #[tokio::test]
    async fn test_general_chat_has_empty_records() {
        let (assistant, _) = seeded_assistant().await;
        let mut session = assistant.new_session();
        let reply = assistant
            .process_message(&mut session, "What can you help me with?")
            .await
            .unwrap();
        assert!(reply.ends_with("Records:\n"));
    }

    #[tokio::test]
    async fn test_failed_lookup_still_replies() {
        let executor = Arc::new(FailingExecutor {
            connects: StdMutex::new(0),
        });
        let assistant = Assistant::new(
            executor.clone(),
            Arc::new(PromptEcho::default()),
            AssistantConfig::default(),
        );
        assert!(assistant.initialize().await.is_err());
        assert_eq!(assistant.state().await, LifecycleState::Uninitialized);

        let mut session = assistant.new_session();
        let reply = assistant
            .process_message(&mut session, "find flats in Leeds")
            .await
            .unwrap();
        assert!(reply.contains("could not be retrieved"));
        assert_eq!(assistant.state().await, LifecycleState::Uninitialized);
        assert_eq!(*executor.connects.lock().unwrap(), 2);

        // Still uninitialized, so each later attempt reconnects.
        assistant
            .process_message(&mut session, "hello")
            .await
            .unwrap();
        assert_eq!(*executor.connects.lock().unwrap(), 3);
        assert!(assistant.initialize().await.is_err());
        assert_eq!(*executor.connects.lock().unwrap(), 4);
        assert_eq!(assistant.state().await, LifecycleState::Uninitialized);
    }

    #[tokio::test]
    async fn test_completion_failure_gives_apology() {
        struct Down;

        #[async_trait]
        impl CompletionClient for Down {
            async fn complete(&self, _messages: &[Turn]) -> Result<String, AssistantError> {
                Err(AssistantError::CompletionStatus {
                    status: 503,
                    message: "overloaded".to_string(),
                })
            }
        }

        let executor = DocumentExecutor::with_database(Arc::new(Database::in_memory().unwrap()));
        let assistant = Assistant::new(Arc::new(executor), Arc::new(Down), AssistantConfig::default());
        let mut session = assistant.new_session();
        let reply = assistant.process_message(&mut session, "hello").await.unwrap();
        assert_eq!(reply, APOLOGY);
        assert!(session.context().is_empty());
    }

    #[tokio::test]
    async fn test_blank_message_rejected() {
        let (assistant, completion) = seeded_assistant().await;
        let mut session = assistant.new_session();
        let err = assistant.process_message(&mut session, "   ").await.unwrap_err();
        assert!(matches!(err, AssistantError::EmptyMessage));
        assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let (assistant, _) = seeded_assistant().await;
        let mut a = assistant.new_session();
        let mut b = assistant.new_session();
        assistant.process_message(&mut a, "hello").await.unwrap();
        assistant.process_message(&mut a, "again").await.unwrap();
        assistant.process_message(&mut b, "hi").await.unwrap();
        assert_eq!(a.context().len(), 4);
        assert_eq!(b.context().len(), 2);

        a.clear();
        assert!(a.context().is_empty());
    }
}

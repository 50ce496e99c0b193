//! Conversational assistant for the lettings system.
//!
//! Classifies free-text messages with a rule table, routes lookups to the
//! data-access executor, and composes replies through a chat-completion API
//! with per-connection conversation history.

pub mod assistant;
pub mod classifier;
pub mod completion;
pub mod context;
pub mod error;
pub mod extractor;
pub mod intent;
pub mod router;

pub use assistant::{Assistant, LifecycleState, Session, CLOSED_REPLY};
pub use classifier::{classify, Keyword, Rule, RULES};
pub use completion::{CompletionClient, OpenAiClient, EMPTY_COMPLETION};
pub use context::{ConversationContext, Lookup, Role, Turn, APOLOGY};
pub use error::AssistantError;
pub use intent::{Action, Ambiguity, Intent, IntentDescriptor};
pub use router::Router;

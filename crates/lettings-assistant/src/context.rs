//! Conversation context management.
//!
//! Holds one conversation's history, builds the completion prompt from it
//! and the lookup result, and keeps the history bounded.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use lettings_core::config::AssistantConfig;

use crate::completion::CompletionClient;

/// Reply used when the completion call fails.
pub const APOLOGY: &str =
    "Sorry, I encountered an error while processing your message. Please try again.";

const SYSTEM_PROMPT: &str = "You are a helpful AI assistant for a property management system. \
You can help users with property searches, tenant information, and general inquiries. \
Be friendly, professional, and concise in your responses.";

const GUIDELINES: &str = "Guidelines:\n\
- Rents and deposits are monthly amounts in GBP.\n\
- Only describe properties and residents that appear in the records below.\n\
- If no records match, say so and suggest widening the search.\n\
- Never reveal internal identifiers other than property and resident ids.";

const LOOKUP_UNAVAILABLE: &str = "The property records could not be retrieved for this \
message. Apologise briefly, do not guess any details, and suggest trying again shortly.";

// =============================================================================
// Turns
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// What the data-store lookup produced for the current message.
#[derive(Clone, Debug, PartialEq)]
pub enum Lookup {
    /// No lookup was needed.
    Skipped,
    /// The lookup succeeded with this result.
    Found(Value),
    /// A lookup was attempted and failed.
    Unavailable,
}

// =============================================================================
// ConversationContext
// =============================================================================

/// A single conversation's rolling history.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    history: VecDeque<Turn>,
    history_limit: usize,
    prompt_turns: usize,
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::new(&AssistantConfig::default())
    }
}

impl ConversationContext {
    pub fn new(config: &AssistantConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(config.history_limit + 1),
            history_limit: config.history_limit,
            prompt_turns: config.prompt_turns,
        }
    }

    /// Answer `user_text`, recording both sides of the exchange.
    ///
    /// Never fails: a completion error yields [`APOLOGY`] and leaves the
    /// history exactly as it was before the call.
    pub async fn respond(
        &mut self,
        client: &dyn CompletionClient,
        user_text: &str,
        lookup: &Lookup,
    ) -> String {
        let messages = self.build_prompt(user_text, lookup);
        self.history.push_back(Turn::new(Role::User, user_text));

        match client.complete(&messages).await {
            Ok(reply) => {
                self.history.push_back(Turn::new(Role::Assistant, reply.clone()));
                self.truncate();
                info!(history = self.history.len(), "AI response generated");
                reply
            }
            Err(e) => {
                self.history.pop_back();
                warn!(error = %e, "Completion failed");
                APOLOGY.to_string()
            }
        }
    }

    /// System prompt, the most recent prior turns, then the new user turn.
    pub fn build_prompt(&self, user_text: &str, lookup: &Lookup) -> Vec<Turn> {
        let mut messages = Vec::with_capacity(self.prompt_turns + 2);
        messages.push(Turn::new(Role::System, system_prompt(lookup)));

        let skip = self.history.len().saturating_sub(self.prompt_turns);
        messages.extend(self.history.iter().skip(skip).cloned());

        messages.push(Turn::new(Role::User, user_text));
        messages
    }

    fn truncate(&mut self) {
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }
        // Keep the log starting on a user turn.
        while matches!(self.history.front(), Some(turn) if turn.role == Role::Assistant) {
            self.history.pop_front();
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &Turn> {
        self.history.iter()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
        info!("Conversation history cleared");
    }
}

fn system_prompt(lookup: &Lookup) -> String {
    match lookup {
        Lookup::Skipped => format!("{}\n\n{}\n\nRecords:\n", SYSTEM_PROMPT, GUIDELINES),
        // Value's Display is compact JSON.
        Lookup::Found(value) => format!("{}\n\n{}\n\nRecords:\n{}", SYSTEM_PROMPT, GUIDELINES, value),
        Lookup::Unavailable => {
            format!("{}\n\n{}\n\n{}", SYSTEM_PROMPT, GUIDELINES, LOOKUP_UNAVAILABLE)
        }
    }
}

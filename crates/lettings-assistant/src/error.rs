//! Error types for the assistant pipeline.

use lettings_core::error::LettingsError;

/// Errors from the assistant.
///
/// None of these reach a chat client verbatim: the pipeline turns them into
/// short apology text and logs the detail.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("assistant session is closed")]
    Closed,
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("completion error: {0}")]
    Completion(String),
    #[error("completion API returned {status}: {message}")]
    CompletionStatus { status: u16, message: String },
    #[error("data store error: {0}")]
    Store(String),
}

impl From<LettingsError> for AssistantError {
    fn from(err: LettingsError) -> Self {
        AssistantError::Store(err.to_string())
    }
}

impl From<reqwest::Error> for AssistantError {
    fn from(err: reqwest::Error) -> Self {
        AssistantError::Completion(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assistant_error_display() {
        assert_eq!(AssistantError::Closed.to_string(), "assistant session is closed");
        assert_eq!(AssistantError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(
            AssistantError::Completion("timed out".to_string()).to_string(),
            "completion error: timed out"
        );
        assert_eq!(
            AssistantError::CompletionStatus {
                status: 429,
                message: "Rate limit reached".to_string()
            }
            .to_string(),
            "completion API returned 429: Rate limit reached"
        );
    }

    #[test]
    fn test_from_lettings_error() {
        let err: AssistantError = LettingsError::Storage("disk full".to_string()).into();
        assert!(matches!(err, AssistantError::Store(_)));
        assert!(err.to_string().contains("disk full"));

        let err: AssistantError = LettingsError::NotConnected.into();
        assert!(matches!(err, AssistantError::Store(_)));
    }
}

//! Question-answering collaborator

use std::time::Duration;

use async_trait::async_trait;

/// Errors returned by a question-answering provider
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnswerError {
    #[error("provider error: {0}")]
    Provider(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("no answer provider available: {0}")]
    Unavailable(String),

    #[error("no answer within {0:?}")]
    TimedOut(Duration),
}

/// Answers free-form questions, e.g. through an AI provider
#[async_trait]
pub trait QuestionAnswerer: Send + Sync {
    async fn answer(&self, query: &str) -> Result<String, AnswerError>;
}

/// Answerer used when no provider is wired in
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineAnswerer;

#[async_trait]
impl QuestionAnswerer for OfflineAnswerer {
    async fn answer(&self, _query: &str) -> Result<String, AnswerError> {
        Err(AnswerError::Unavailable(
            "no question-answering provider configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_answerer_is_unavailable() {
        let err = OfflineAnswerer.answer("what time is it").await.unwrap_err();
        assert!(matches!(err, AnswerError::Unavailable(_)));
    }
}

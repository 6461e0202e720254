//! Completion backend seam

use super::error::LlmResult;

/// Blocking text completion used to phrase workflow summaries.
///
/// Implementations must not retry; the caller falls back to a template on
/// any error.
pub trait CompletionClient: Send + Sync {
    fn complete(&self, prompt: &str) -> LlmResult<String>;

    /// Model identifier, for diagnostics
    fn model_name(&self) -> &str;
}

/// Canned completion backend for unit tests
#[cfg(test)]
pub struct MockCompletionClient {
    reply: Option<String>,
}

#[cfg(test)]
impl MockCompletionClient {
    /// Always answers with `reply`
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
        }
    }

    /// Always fails as if the backend were down
    pub fn failing() -> Self {
        Self { reply: None }
    }
}

#[cfg(test)]
impl CompletionClient for MockCompletionClient {
    fn complete(&self, _prompt: &str) -> LlmResult<String> {
        self.reply
            .clone()
            .ok_or_else(|| super::error::LlmError::Unreachable {
                url: "mock://".to_string(),
                message: "mock backend is down".to_string(),
            })
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

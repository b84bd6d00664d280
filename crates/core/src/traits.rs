use crate::error::ProviderError;
use async_trait::async_trait;

/// Generation settings passed alongside every prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionContext {
    pub system: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for CompletionContext {
    fn default() -> Self {
        Self {
            system: None,
            temperature: 0.7,
            max_output_tokens: 512,
        }
    }
}

impl CompletionContext {
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// A text-completion backend. Implementations hold their own credentials
/// and map every failure onto [`ProviderError`].
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        context: &CompletionContext,
    ) -> Result<String, ProviderError>;

    fn name(&self) -> &str;
}

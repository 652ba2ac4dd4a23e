use async_trait::async_trait;

use crate::Result;

/// One plain-text generation request against a provider.
#[derive(Debug, Clone, Default)]
pub struct TextRequest {
    pub prompt: String,
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Ask the provider for a JSON-only response where it supports that.
    pub json_output: bool,
}

impl TextRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn json(prompt: impl Into<String>) -> Self {
        Self {
            json_output: true,
            ..Self::new(prompt)
        }
    }
}

#[async_trait]
pub trait TextModel: Send + Sync {
    fn provider(&self) -> &str;
    fn model_id(&self) -> &str;

    /// Whether the client holds the credentials it needs to make calls.
    fn configured(&self) -> bool {
        true
    }

    /// Human-readable note about the provider's rate limits, if any.
    fn rate_limit_note(&self) -> &str {
        ""
    }

    async fn generate(&self, request: TextRequest) -> Result<String>;
}

/// Image generation seam. Returns the hosted image URL, or `Ok(None)` when
/// the provider completed without producing one.
#[async_trait]
pub trait ImageModel: Send + Sync {
    fn provider(&self) -> &str;
    fn model_id(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<Option<String>>;
}

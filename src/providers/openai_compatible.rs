use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::{Env, ProviderSettings};
use crate::model::{ImageModel, TextModel, TextRequest};
use crate::{Result, SlideCraftError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat-completions client for OpenAI and OpenAI-compatible deployments.
#[derive(Clone)]
pub struct OpenAICompatible {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAICompatible {
    pub fn new(api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: String::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn from_env(env: &Env) -> Self {
        let mut out = Self::new(env.get("OPENAI_API_KEY").unwrap_or_default());
        if let Some(base_url) = env.get("OPENAI_BASE_URL").filter(|s| !s.trim().is_empty()) {
            out = out.with_base_url(base_url);
        }
        if let Some(model) = env.get("OPENAI_MODEL").filter(|s| !s.trim().is_empty()) {
            out = out.with_model(model);
        }
        out
    }

    pub fn from_settings(settings: &ProviderSettings) -> Self {
        let mut out = Self::new(settings.api_key.clone().unwrap_or_default());
        if let Some(base_url) = settings.base_url.as_deref().filter(|s| !s.trim().is_empty()) {
            out = out.with_base_url(base_url);
        }
        if let Some(model) = settings.model.as_deref().filter(|s| !s.trim().is_empty()) {
            out = out.with_model(model);
        }
        out
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn resolve_model(&self) -> Result<&str> {
        let model = self.model.trim();
        if model.is_empty() {
            return Err(SlideCraftError::InvalidResponse(
                "model is not set (use OpenAICompatible::with_model)".to_string(),
            ));
        }
        Ok(model)
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl TextModel for OpenAICompatible {
    fn provider(&self) -> &str {
        "openai-compatible"
    }

    fn model_id(&self) -> &str {
        self.model.as_str()
    }

    fn configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn generate(&self, request: TextRequest) -> Result<String> {
        let model = self.resolve_model()?.to_string();

        let mut body = Map::<String, Value>::new();
        body.insert("model".to_string(), Value::String(model));
        body.insert(
            "messages".to_string(),
            serde_json::json!([{ "role": "user", "content": request.prompt }]),
        );
        if let Some(max_tokens) = request.max_output_tokens {
            body.insert("max_tokens".to_string(), Value::Number(max_tokens.into()));
        }
        if let Some(temperature) = request.temperature {
            body.insert(
                "temperature".to_string(),
                Value::Number(
                    serde_json::Number::from_f64(temperature as f64).unwrap_or_else(|| 0.into()),
                ),
            );
        }
        if request.json_output {
            body.insert(
                "response_format".to_string(),
                serde_json::json!({ "type": "json_object" }),
            );
        }

        let response = self
            .http
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SlideCraftError::Api { status, body: text });
        }

        let parsed = response.json::<ChatCompletionResponse>().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(SlideCraftError::InvalidResponse(
                "empty completion content".to_string(),
            ));
        }
        Ok(text)
    }
}

/// `images/generations` client for image-capable deployments. Produces a
/// hosted URL; deployments that answer with base64 only are treated as
/// having produced no image.
#[derive(Clone)]
pub struct OpenAICompatibleImages {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    size: String,
}

impl OpenAICompatibleImages {
    pub fn new(api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: "dall-e-3".to_string(),
            size: "1024x1024".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    fn images_url(&self) -> String {
        format!("{}/images/generations", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageItem>,
}

#[derive(Debug, Deserialize)]
struct ImageItem {
    #[serde(default)]
    url: Option<String>,
}

#[async_trait]
impl ImageModel for OpenAICompatibleImages {
    fn provider(&self) -> &str {
        "openai-compatible"
    }

    fn model_id(&self) -> &str {
        self.model.as_str()
    }

    async fn generate(&self, prompt: &str) -> Result<Option<String>> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "n": 1,
            "size": self.size,
        });

        let response = self
            .http
            .post(self.images_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SlideCraftError::Api { status, body: text });
        }

        let parsed = response.json::<ImagesResponse>().await?;
        Ok(parsed
            .data
            .into_iter()
            .next()
            .and_then(|item| item.url)
            .filter(|url| !url.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn generate_requests_json_mode_and_reads_first_choice() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer sk-test")
                    .body_includes("\"model\":\"gpt-4o-mini\"")
                    .body_includes("\"response_format\":{\"type\":\"json_object\"}");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(
                        serde_json::json!({
                            "choices": [{ "message": { "role": "assistant", "content": "{\"title\":\"T\"}" } }]
                        })
                        .to_string(),
                    );
            })
            .await;

        let client = OpenAICompatible::new("sk-test")
            .with_base_url(server.url("/v1"))
            .with_model("gpt-4o-mini");
        let text = client.generate(TextRequest::json("deck please")).await?;

        mock.assert_async().await;
        assert_eq!(text, "{\"title\":\"T\"}");
        Ok(())
    }

    #[tokio::test]
    async fn missing_model_fails_before_any_request() {
        let client = OpenAICompatible::new("sk-test");
        let err = client.generate(TextRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, SlideCraftError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn image_generation_returns_hosted_url() -> Result<()> {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/images/generations")
                    .body_includes("\"prompt\":\"a chart\"");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(
                        serde_json::json!({ "data": [{ "url": "https://img.example/1.png" }] })
                            .to_string(),
                    );
            })
            .await;

        let client = OpenAICompatibleImages::new("sk-test").with_base_url(server.url("/v1"));
        let url = client.generate("a chart").await?;
        assert_eq!(url.as_deref(), Some("https://img.example/1.png"));
        Ok(())
    }

    #[tokio::test]
    async fn image_generation_without_url_is_none_not_an_error() -> Result<()> {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/images/generations");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(serde_json::json!({ "data": [{}] }).to_string());
            })
            .await;

        let client = OpenAICompatibleImages::new("sk-test").with_base_url(server.url("/v1"));
        assert_eq!(client.generate("a chart").await?, None);
        Ok(())
    }
}

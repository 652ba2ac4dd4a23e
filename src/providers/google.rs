use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::{Env, ProviderSettings};
use crate::model::{TextModel, TextRequest};
use crate::{Result, SlideCraftError};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const FREE_TIER_RATE_LIMIT: &str = "15 requests per minute (free tier)";

/// Google Gemini `generateContent` client. Text only; imagery is limited to
/// prompt descriptions on this provider.
#[derive(Clone)]
pub struct Google {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl Google {
    pub fn new(api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
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
        const DEFAULT_KEYS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY"];
        let mut out = Self::new(env.first_of(DEFAULT_KEYS).unwrap_or_default());
        if let Some(model) = env.get("GEMINI_MODEL").filter(|m| !m.trim().is_empty()) {
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

    fn generate_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let model = self.model.trim();
        let path = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        };
        format!("{base}/{path}:generateContent")
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Value>,
}

fn candidate_text(candidate: &Value) -> String {
    let Some(parts) = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
    else {
        return String::new();
    };
    let mut out = String::new();
    for part in parts {
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            out.push_str(text);
        }
    }
    out
}

#[async_trait]
impl TextModel for Google {
    fn provider(&self) -> &str {
        "google"
    }

    fn model_id(&self) -> &str {
        self.model.as_str()
    }

    fn configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    fn rate_limit_note(&self) -> &str {
        FREE_TIER_RATE_LIMIT
    }

    async fn generate(&self, request: TextRequest) -> Result<String> {
        let mut body = Map::<String, Value>::new();
        body.insert(
            "contents".to_string(),
            serde_json::json!([{ "role": "user", "parts": [{ "text": request.prompt }] }]),
        );

        let mut generation_config = Map::<String, Value>::new();
        if let Some(max_tokens) = request.max_output_tokens {
            generation_config.insert(
                "maxOutputTokens".to_string(),
                Value::Number(max_tokens.into()),
            );
        }
        if let Some(temperature) = request.temperature {
            generation_config.insert(
                "temperature".to_string(),
                Value::Number(
                    serde_json::Number::from_f64(temperature as f64).unwrap_or_else(|| 0.into()),
                ),
            );
        }
        if request.json_output {
            generation_config.insert(
                "responseMimeType".to_string(),
                Value::String("application/json".to_string()),
            );
        }
        if !generation_config.is_empty() {
            body.insert(
                "generationConfig".to_string(),
                Value::Object(generation_config),
            );
        }

        let response = self
            .http
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SlideCraftError::Api { status, body: text });
        }

        let parsed = response.json::<GenerateContentResponse>().await?;
        let text = parsed
            .candidates
            .first()
            .map(candidate_text)
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(SlideCraftError::InvalidResponse(
                "empty response from gemini".to_string(),
            ));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn generate_posts_prompt_and_collects_candidate_text() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-2.0-flash:generateContent")
                    .header("x-goog-api-key", "test-key")
                    .body_includes("\"text\":\"say hi\"")
                    .body_includes("\"responseMimeType\":\"application/json\"");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(
                        serde_json::json!({
                            "candidates": [{
                                "content": { "parts": [{ "text": "{\"ok\":" }, { "text": "true}" }] }
                            }]
                        })
                        .to_string(),
                    );
            })
            .await;

        let client = Google::new("test-key").with_base_url(server.url("/v1beta"));
        let text = client.generate(TextRequest::json("say hi")).await?;

        mock.assert_async().await;
        assert_eq!(text, "{\"ok\":true}");
        Ok(())
    }

    #[tokio::test]
    async fn non_success_status_becomes_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-2.0-flash:generateContent");
                then.status(429).body("Resource exhausted: quota");
            })
            .await;

        let client = Google::new("test-key").with_base_url(server.url("/v1beta"));
        let err = client
            .generate(TextRequest::new("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, SlideCraftError::Api { status, .. }
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS));
    }

    #[tokio::test]
    async fn empty_candidates_are_an_invalid_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-2.0-flash:generateContent");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(serde_json::json!({ "candidates": [] }).to_string());
            })
            .await;

        let client = Google::new("test-key").with_base_url(server.url("/v1beta"));
        let err = client.generate(TextRequest::new("hello")).await.unwrap_err();
        assert!(matches!(err, SlideCraftError::InvalidResponse(_)));
    }

    #[test]
    fn configured_requires_an_api_key() {
        assert!(Google::new("key").configured());
        assert!(!Google::new("  ").configured());
    }
}

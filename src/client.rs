//! The provider client. Every deck-producing operation here is total: the
//! caller always receives usable content, provider-authored or synthetic.

use std::sync::Arc;

use crate::config::RetryPolicy;
use crate::deck::SlideDeck;
use crate::error::FailureKind;
use crate::fallback::{fallback_deck, fallback_image_prompt};
use crate::model::{ImageModel, TextModel, TextRequest};
use crate::parser::parse_deck;
use crate::prompt::{
    deck_prompt, enhance_prompt, image_prompt_instruction, regenerate_content_prompt,
};
use crate::{Result, SlideCraftError};

/// Where a generated deck's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckSource {
    Provider,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct GeneratedDeck {
    pub deck: SlideDeck,
    pub source: DeckSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientStatus {
    pub provider: String,
    pub model: String,
    pub configured: bool,
    pub images: bool,
    pub rate_limit_note: String,
}

pub struct DeckClient {
    text: Arc<dyn TextModel>,
    image: Option<Arc<dyn ImageModel>>,
    retry: RetryPolicy,
    max_output_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl DeckClient {
    pub fn new(text: Arc<dyn TextModel>) -> Self {
        Self {
            text,
            image: None,
            retry: RetryPolicy::default(),
            max_output_tokens: Some(4096),
            temperature: Some(0.7),
        }
    }

    pub fn with_image_model(mut self, image: Arc<dyn ImageModel>) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: Option<u32>) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    fn text_request(&self, prompt: String, json_output: bool) -> TextRequest {
        TextRequest {
            prompt,
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
            json_output,
        }
    }

    /// Generate a full deck for `topic`. Rate-limit failures are retried
    /// with backoff; anything else — including retry exhaustion and
    /// unparsable output — substitutes the deterministic fallback deck.
    /// Never returns an error.
    pub async fn generate_deck(&self, topic: &str, slide_count: u8) -> GeneratedDeck {
        match self.try_generate_deck(topic, slide_count).await {
            Ok(deck) => GeneratedDeck {
                deck,
                source: DeckSource::Provider,
            },
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    topic,
                    slide_count,
                    "deck generation failed, substituting fallback content"
                );
                GeneratedDeck {
                    deck: fallback_deck(topic, slide_count),
                    source: DeckSource::Fallback,
                }
            }
        }
    }

    async fn try_generate_deck(&self, topic: &str, slide_count: u8) -> Result<SlideDeck> {
        let request = self.text_request(deck_prompt(topic, slide_count), true);
        let raw = self.generate_with_retry(request).await?;
        parse_deck(&raw)
    }

    /// One text generation with the configured retry budget. Only
    /// rate-limit failures are retried; others propagate on first sight.
    async fn generate_with_retry(&self, request: TextRequest) -> Result<String> {
        let mut attempts = 0u32;
        loop {
            match self.text.generate(request.clone()).await {
                Ok(text) => return Ok(text),
                Err(err) if err.failure_kind() == FailureKind::RateLimited => {
                    attempts += 1;
                    if attempts >= self.retry.max_attempts {
                        return Err(SlideCraftError::MaxRetriesExceeded { attempts });
                    }
                    let delay = self.retry.delay_for(attempts - 1);
                    tracing::warn!(
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "provider rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Ask for an image description for one slide. Total: provider failure
    /// or an empty answer yields a templated description instead.
    pub async fn generate_image_prompt(&self, slide_title: &str, slide_content: &str) -> String {
        let request =
            self.text_request(image_prompt_instruction(slide_title, slide_content), false);
        match self.text.generate(request).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => format!("Professional illustration related to {slide_title}"),
            Err(err) => {
                tracing::warn!(error = %err, slide_title, "image prompt generation failed");
                fallback_image_prompt(slide_title)
            }
        }
    }

    /// Request an image for `image_prompt`. Absence of an image is an
    /// expected outcome, not an error: returns `None` when no image model
    /// is configured or on any provider failure.
    pub async fn generate_image(&self, image_prompt: &str) -> Option<String> {
        let model = self.image.as_ref()?;
        match model.generate(image_prompt).await {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(error = %err, "image generation failed, continuing without image");
                None
            }
        }
    }

    /// Rewrite an existing deck with the same structure. On any failure or
    /// unparsable response the input deck is returned unchanged.
    pub async fn enhance_deck(&self, deck: &SlideDeck) -> SlideDeck {
        let request = self.text_request(enhance_prompt(deck), true);
        let outcome = match self.text.generate(request).await {
            Ok(raw) => parse_deck(&raw),
            Err(err) => Err(err),
        };
        match outcome {
            Ok(enhanced) => enhanced,
            Err(err) => {
                tracing::warn!(error = %err, "deck enhancement failed, keeping original");
                deck.clone()
            }
        }
    }

    /// Three fresh bullets for one slide. `None` on provider failure or an
    /// empty answer; the caller keeps the existing content in that case.
    pub async fn regenerate_slide_content(
        &self,
        topic: &str,
        slide_title: &str,
    ) -> Option<String> {
        let request = self.text_request(regenerate_content_prompt(topic, slide_title), false);
        match self.text.generate(request).await {
            Ok(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Err(err) => {
                tracing::warn!(error = %err, slide_title, "slide regeneration failed");
                None
            }
        }
    }

    pub fn status(&self) -> ClientStatus {
        ClientStatus {
            provider: self.text.provider().to_string(),
            model: self.text.model_id().to_string(),
            configured: self.text.configured(),
            images: self.image.is_some(),
            rate_limit_note: self.text.rate_limit_note().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    enum Script {
        Ok(&'static str),
        RateLimited,
        ServerError,
    }

    struct ScriptedModel {
        calls: AtomicU32,
        script: Mutex<Vec<Script>>,
    }

    impl ScriptedModel {
        fn new(script: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                script: Mutex::new(script),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextModel for ScriptedModel {
        fn provider(&self) -> &str {
            "scripted"
        }

        fn model_id(&self) -> &str {
            "scripted-1"
        }

        async fn generate(&self, _request: TextRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self
                .script
                .lock()
                .map_err(|_| SlideCraftError::Store("script lock poisoned".to_string()))?
                .pop();
            match step {
                Some(Script::Ok(text)) => Ok(text.to_string()),
                Some(Script::RateLimited) | None => Err(SlideCraftError::Api {
                    status: reqwest::StatusCode::TOO_MANY_REQUESTS,
                    body: "rate limit exceeded".to_string(),
                }),
                Some(Script::ServerError) => Err(SlideCraftError::Api {
                    status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                    body: "boom".to_string(),
                }),
            }
        }
    }

    struct FailingImageModel;

    #[async_trait]
    impl ImageModel for FailingImageModel {
        fn provider(&self) -> &str {
            "scripted"
        }

        fn model_id(&self) -> &str {
            "img"
        }

        async fn generate(&self, _prompt: &str) -> Result<Option<String>> {
            Err(SlideCraftError::InvalidResponse("no images today".to_string()))
        }
    }

    const GOOD_DECK: &str = r#"{
        "title": "Presentation: Rust",
        "description": "Overview",
        "slides": [
            {"slide_number": 1, "title": "Intro", "content": "• a", "image_prompt": "p"},
            {"slide_number": 2, "title": "Middle", "content": "• b", "image_prompt": "p"},
            {"slide_number": 3, "title": "Conclusion", "content": "• c", "image_prompt": "p"}
        ]
    }"#;

    // Scripts pop from the back.
    #[tokio::test(start_paused = true)]
    async fn rate_limited_twice_then_success_makes_three_attempts() {
        let model = ScriptedModel::new(vec![
            Script::Ok(GOOD_DECK),
            Script::RateLimited,
            Script::RateLimited,
        ]);
        let client = DeckClient::new(model.clone());

        let generated = client.generate_deck("Rust", 3).await;
        assert_eq!(model.calls(), 3);
        assert_eq!(generated.source, DeckSource::Provider);
        assert_eq!(generated.deck.slides.len(), 3);
    }

    #[tokio::test]
    async fn non_rate_limit_error_is_not_retried() {
        let model = ScriptedModel::new(vec![Script::ServerError]);
        let client = DeckClient::new(model.clone());

        let generated = client.generate_deck("Rust", 3).await;
        assert_eq!(model.calls(), 1);
        assert_eq!(generated.source, DeckSource::Fallback);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_fall_back_after_three_attempts() {
        let model = ScriptedModel::new(vec![
            Script::RateLimited,
            Script::RateLimited,
            Script::RateLimited,
        ]);
        let client = DeckClient::new(model.clone());

        let generated = client.generate_deck("Rust", 5).await;
        assert_eq!(model.calls(), 3);
        assert_eq!(generated.source, DeckSource::Fallback);
        assert_eq!(generated.deck.slides.len(), 5);
        assert_eq!(generated.deck.slides[0].title, "Introduction to Rust");
    }

    #[tokio::test]
    async fn malformed_output_falls_back_without_error() {
        let model = ScriptedModel::new(vec![Script::Ok("not json at all")]);
        let client = DeckClient::new(model);

        let generated = client.generate_deck("Rust", 4).await;
        assert_eq!(generated.source, DeckSource::Fallback);
        assert_eq!(generated.deck.slides.len(), 4);
    }

    #[tokio::test]
    async fn fenced_output_is_accepted_as_provider_content() {
        let fenced: &'static str =
            Box::leak(format!("```json\n{GOOD_DECK}\n```").into_boxed_str());
        let model = ScriptedModel::new(vec![Script::Ok(fenced)]);
        let client = DeckClient::new(model);

        let generated = client.generate_deck("Rust", 3).await;
        assert_eq!(generated.source, DeckSource::Provider);
        assert_eq!(generated.deck.title, "Presentation: Rust");
    }

    #[tokio::test]
    async fn image_prompt_falls_back_on_provider_failure() {
        let model = ScriptedModel::new(vec![Script::ServerError]);
        let client = DeckClient::new(model);

        let prompt = client.generate_image_prompt("Market Size", "• big").await;
        assert_eq!(prompt, "Professional business illustration about Market Size");
    }

    #[tokio::test]
    async fn image_generation_failure_is_none() {
        let model = ScriptedModel::new(vec![]);
        let client = DeckClient::new(model).with_image_model(Arc::new(FailingImageModel));
        assert_eq!(client.generate_image("anything").await, None);
    }

    #[tokio::test]
    async fn image_generation_without_model_is_none() {
        let model = ScriptedModel::new(vec![]);
        let client = DeckClient::new(model);
        assert_eq!(client.generate_image("anything").await, None);
    }

    #[tokio::test]
    async fn enhance_on_failure_returns_input_unchanged() {
        let model = ScriptedModel::new(vec![Script::ServerError]);
        let client = DeckClient::new(model);

        let deck = parse_deck(GOOD_DECK).unwrap();
        let enhanced = client.enhance_deck(&deck).await;
        assert_eq!(enhanced, deck);
    }

    #[tokio::test]
    async fn enhance_on_unparsable_response_returns_input_unchanged() {
        let model = ScriptedModel::new(vec![Script::Ok("```\nbroken\n```")]);
        let client = DeckClient::new(model);

        let deck = parse_deck(GOOD_DECK).unwrap();
        let enhanced = client.enhance_deck(&deck).await;
        assert_eq!(enhanced, deck);
    }

    #[tokio::test]
    async fn regenerate_returns_none_on_failure() {
        let model = ScriptedModel::new(vec![Script::ServerError]);
        let client = DeckClient::new(model);
        assert_eq!(client.regenerate_slide_content("Rust", "Intro").await, None);
    }

    #[tokio::test]
    async fn regenerate_trims_provider_text() {
        let model = ScriptedModel::new(vec![Script::Ok("• a\n• b\n• c\n")]);
        let client = DeckClient::new(model);
        assert_eq!(
            client.regenerate_slide_content("Rust", "Intro").await.as_deref(),
            Some("• a\n• b\n• c")
        );
    }

    #[tokio::test]
    async fn status_reflects_the_configured_models() {
        let model = ScriptedModel::new(vec![]);
        let client = DeckClient::new(model);
        let status = client.status();
        assert_eq!(status.provider, "scripted");
        assert_eq!(status.model, "scripted-1");
        assert!(status.configured);
        assert!(!status.images);
    }
}

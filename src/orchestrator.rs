//! End-to-end generation flows over the provider client and the
//! persistence collaborator.
//!
//! Failure policy: deck generation never fails — persistent provider
//! trouble substitutes fallback content, the presentation completes, and
//! one credit is debited. Only persistence failures mark the record
//! `Failed` and surface a hard error to the caller.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::client::{ClientStatus, DeckClient, DeckSource};
use crate::deck::{GenerationRequest, PresentationStatus, SlideDeck, SlideSpec};
use crate::store::{
    DeckStore, NewPresentation, NewSlide, PresentationRecord, RecordId, SlideRecord,
};
use crate::{Result, SlideCraftError};

#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    pub presentation: PresentationRecord,
    pub slides: Vec<SlideRecord>,
    pub credits_remaining: i64,
    pub source: DeckSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegeneratedSlide {
    pub slide_id: RecordId,
    pub content: String,
    /// False when the provider failed and the stored content was kept.
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub client: ClientStatus,
    pub credits: i64,
}

pub struct Orchestrator {
    client: DeckClient,
    store: Arc<dyn DeckStore>,
}

impl Orchestrator {
    pub fn new(client: DeckClient, store: Arc<dyn DeckStore>) -> Self {
        Self { client, store }
    }

    /// Generate and persist a deck for `topic`.
    pub async fn generate(
        &self,
        user_id: RecordId,
        topic: &str,
        slide_count: u8,
    ) -> Result<GenerateOutcome> {
        let request = GenerationRequest::new(topic, slide_count);
        request.validate()?;

        let balance = self.store.credits(user_id).await?;
        if balance < 1 {
            return Err(SlideCraftError::InsufficientCredits { remaining: balance });
        }

        let mut presentation = self
            .store
            .create_presentation(NewPresentation {
                user_id,
                title: format!("Presentation about {topic}"),
                topic: topic.to_string(),
                slide_count,
                status: PresentationStatus::Generating,
            })
            .await?;

        let generated = self.client.generate_deck(topic, slide_count).await;
        tracing::info!(
            presentation_id = presentation.id,
            slides = generated.deck.slides.len(),
            source = ?generated.source,
            "deck generated"
        );

        match self
            .persist_deck(&mut presentation, generated.deck, user_id)
            .await
        {
            Ok((slides, credits_remaining)) => Ok(GenerateOutcome {
                presentation,
                slides,
                credits_remaining,
                source: generated.source,
            }),
            Err(err) => {
                presentation.status = PresentationStatus::Failed;
                if let Err(update_err) = self.store.update_presentation(&presentation).await {
                    tracing::error!(
                        presentation_id = presentation.id,
                        error = %update_err,
                        "failed to mark presentation as failed"
                    );
                }
                Err(err)
            }
        }
    }

    async fn persist_deck(
        &self,
        presentation: &mut PresentationRecord,
        deck: SlideDeck,
        user_id: RecordId,
    ) -> Result<(Vec<SlideRecord>, i64)> {
        if !deck.title.trim().is_empty() {
            presentation.title = deck.title;
        }
        presentation.description = deck.description;

        let mut new_slides = Vec::with_capacity(deck.slides.len());
        for spec in deck.slides {
            let image_prompt = if spec.image_prompt.trim().is_empty() {
                self.client
                    .generate_image_prompt(&spec.title, &spec.content)
                    .await
            } else {
                spec.image_prompt
            };
            let image_url = match spec.image_url {
                Some(url) => Some(url),
                None => self.client.generate_image(&image_prompt).await,
            };
            new_slides.push(NewSlide {
                slide_number: spec.slide_number,
                title: spec.title,
                content: spec.content,
                image_url,
                image_prompt,
            });
        }

        let slides = self.store.replace_slides(presentation.id, new_slides).await?;
        let credits_remaining = self.store.debit_credit(user_id).await?;
        presentation.status = PresentationStatus::Completed;
        self.store.update_presentation(presentation).await?;
        Ok((slides, credits_remaining))
    }

    /// Re-prompt for one slide's bullets. Provider failure leaves the
    /// stored content untouched.
    pub async fn regenerate_slide(&self, slide_id: RecordId) -> Result<RegeneratedSlide> {
        let mut slide = self.store.slide(slide_id).await?;
        let presentation = self.store.presentation(slide.presentation_id).await?;

        match self
            .client
            .regenerate_slide_content(&presentation.topic, &slide.title)
            .await
        {
            Some(content) => {
                slide.content = content.clone();
                self.store.update_slide(&slide).await?;
                Ok(RegeneratedSlide {
                    slide_id,
                    content,
                    changed: true,
                })
            }
            None => Ok(RegeneratedSlide {
                slide_id,
                content: slide.content,
                changed: false,
            }),
        }
    }

    /// Rewrite a persisted deck via the provider, merging returned slides
    /// back by `slide_number` and skipping numbers with no persisted
    /// counterpart. A provider failure is a no-op.
    pub async fn enhance(
        &self,
        presentation_id: RecordId,
    ) -> Result<(PresentationRecord, Vec<SlideRecord>)> {
        let mut presentation = self.store.presentation(presentation_id).await?;
        let slides = self.store.slides(presentation_id).await?;

        let deck = deck_from_records(&presentation, &slides);
        let enhanced = self.client.enhance_deck(&deck).await;

        if !enhanced.title.trim().is_empty() {
            presentation.title = enhanced.title;
        }
        if !enhanced.description.trim().is_empty() {
            presentation.description = enhanced.description;
        }
        self.store.update_presentation(&presentation).await?;

        let mut by_number: BTreeMap<u32, SlideRecord> = slides
            .into_iter()
            .map(|slide| (slide.slide_number, slide))
            .collect();
        for spec in enhanced.slides {
            let Some(slide) = by_number.get_mut(&spec.slide_number) else {
                tracing::warn!(
                    presentation_id,
                    slide_number = spec.slide_number,
                    "enhanced slide has no persisted counterpart, skipping"
                );
                continue;
            };
            if !spec.title.trim().is_empty() {
                slide.title = spec.title;
            }
            if !spec.content.trim().is_empty() {
                slide.content = spec.content;
            }
            if !spec.image_prompt.trim().is_empty() {
                slide.image_prompt = spec.image_prompt;
            }
            self.store.update_slide(slide).await?;
        }

        Ok((presentation, by_number.into_values().collect()))
    }

    pub async fn status(&self, user_id: RecordId) -> Result<StatusReport> {
        Ok(StatusReport {
            client: self.client.status(),
            credits: self.store.credits(user_id).await?,
        })
    }
}

pub(crate) fn deck_from_records(
    presentation: &PresentationRecord,
    slides: &[SlideRecord],
) -> SlideDeck {
    SlideDeck {
        title: presentation.title.clone(),
        description: presentation.description.clone(),
        slides: slides
            .iter()
            .map(|slide| SlideSpec {
                slide_number: slide.slide_number,
                title: slide.title.clone(),
                content: slide.content.clone(),
                image_prompt: slide.image_prompt.clone(),
                image_url: slide.image_url.clone(),
            })
            .collect(),
    }
}

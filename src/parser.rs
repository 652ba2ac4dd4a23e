//! Normalization of raw provider text into a [`SlideDeck`].
//!
//! Providers routinely wrap otherwise-valid JSON in a markdown code fence,
//! so a failed decode is retried once with a single leading/trailing fence
//! stripped. Anything still undecodable is reported as
//! [`SlideCraftError::UnparsableContent`] for the caller to substitute
//! fallback content; the error never reaches the orchestrator.

use serde::Deserialize;

use crate::deck::{SlideDeck, SlideSpec};
use crate::{Result, SlideCraftError};

// Raw wire shapes. Optional-field defaults are applied here, exactly once.
#[derive(Debug, Deserialize)]
struct RawDeck {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    slides: Vec<RawSlide>,
}

#[derive(Debug, Deserialize)]
struct RawSlide {
    #[serde(default)]
    slide_number: Option<u32>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    image_prompt: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
}

pub fn parse_deck(raw: &str) -> Result<SlideDeck> {
    let deck = match serde_json::from_str::<RawDeck>(raw) {
        Ok(deck) => deck,
        Err(first_err) => {
            let stripped = strip_code_fence(raw);
            if stripped == raw.trim() {
                return Err(SlideCraftError::UnparsableContent(first_err.to_string()));
            }
            serde_json::from_str::<RawDeck>(stripped)
                .map_err(|err| SlideCraftError::UnparsableContent(err.to_string()))?
        }
    };
    Ok(normalize(deck))
}

/// Strip one leading/trailing fenced-code delimiter, tolerating a language
/// tag on the opening fence (```json) as well as a bare ```.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag up to the first newline, if any.
    let rest = match rest.split_once('\n') {
        Some((tag, body)) if !tag.trim().contains('`') => body,
        _ => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn normalize(raw: RawDeck) -> SlideDeck {
    let slides = raw
        .slides
        .into_iter()
        .enumerate()
        .map(|(index, slide)| SlideSpec {
            // Missing numbers default to the 1-based position.
            slide_number: slide.slide_number.unwrap_or(index as u32 + 1),
            title: slide.title.unwrap_or_default(),
            content: slide.content.unwrap_or_default(),
            image_prompt: slide.image_prompt.unwrap_or_default(),
            image_url: slide.image_url.filter(|url| !url.trim().is_empty()),
        })
        .collect();

    SlideDeck {
        title: raw.title.unwrap_or_default(),
        description: raw.description.unwrap_or_default(),
        slides,
    }
}

use serde::{Deserialize, Serialize};

use crate::{Result, SlideCraftError};

pub const SLIDE_COUNT_MIN: u8 = 3;
pub const SLIDE_COUNT_MAX: u8 = 10;

/// One "generate a deck" request. Validated before any provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub topic: String,
    pub slide_count: u8,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>, slide_count: u8) -> Self {
        Self {
            topic: topic.into(),
            slide_count,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(SlideCraftError::Validation("topic is required".to_string()));
        }
        if !(SLIDE_COUNT_MIN..=SLIDE_COUNT_MAX).contains(&self.slide_count) {
            return Err(SlideCraftError::Validation(format!(
                "slide count must be between {SLIDE_COUNT_MIN} and {SLIDE_COUNT_MAX}"
            )));
        }
        Ok(())
    }
}

/// Transient generation result, provider-authored or synthetic. Projected
/// into store records by the orchestrator and then discarded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlideDeck {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub slides: Vec<SlideSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlideSpec {
    /// 1-based, contiguous within a deck.
    pub slide_number: u32,
    pub title: String,
    /// Expected to hold three bullet lines of at most 12 words each. This is
    /// a request made of the provider, not enforced locally.
    pub content: String,
    #[serde(default)]
    pub image_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PresentationStatus {
    #[default]
    Draft,
    Generating,
    Completed,
    Failed,
}

impl PresentationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

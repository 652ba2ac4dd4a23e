//! AI slide-deck generation pipeline: prompt construction, provider
//! clients with a retry/fallback contract, content normalization, and the
//! orchestration that projects generated decks into persisted records.

mod client;
mod config;
mod deck;
mod error;
mod fallback;
mod orchestrator;
mod parser;

pub mod export;
pub mod model;
pub mod prompt;
pub mod providers;
pub mod store;

pub use client::{ClientStatus, DeckClient, DeckSource, GeneratedDeck};
pub use config::{Env, ProviderSettings, RetryPolicy};
pub use deck::{
    GenerationRequest, PresentationStatus, SLIDE_COUNT_MAX, SLIDE_COUNT_MIN, SlideDeck, SlideSpec,
};
pub use error::{FailureKind, Result, SlideCraftError};
pub use fallback::{fallback_deck, fallback_image_prompt};
pub use orchestrator::{GenerateOutcome, Orchestrator, RegeneratedSlide, StatusReport};
pub use parser::parse_deck;

#[cfg(feature = "provider-google")]
pub use providers::Google;
#[cfg(feature = "provider-openai-compatible")]
pub use providers::{OpenAICompatible, OpenAICompatibleImages};

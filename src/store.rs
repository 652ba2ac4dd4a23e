//! Persistence collaborator boundary. The core hands finished decks to a
//! [`DeckStore`]; real database mechanics live outside this crate.
//! [`MemoryStore`] is the reference implementation used by tests and by
//! embedders that do not need durable storage.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::deck::PresentationStatus;
use crate::{Result, SlideCraftError};

pub type RecordId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationRecord {
    pub id: RecordId,
    pub user_id: RecordId,
    pub title: String,
    pub description: String,
    pub topic: String,
    pub slide_count: u8,
    pub status: PresentationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideRecord {
    pub id: RecordId,
    pub presentation_id: RecordId,
    pub slide_number: u32,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub image_prompt: String,
}

#[derive(Debug, Clone)]
pub struct NewPresentation {
    pub user_id: RecordId,
    pub title: String,
    pub topic: String,
    pub slide_count: u8,
    pub status: PresentationStatus,
}

#[derive(Debug, Clone)]
pub struct NewSlide {
    pub slide_number: u32,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub image_prompt: String,
}

#[async_trait]
pub trait DeckStore: Send + Sync {
    async fn create_presentation(&self, new: NewPresentation) -> Result<PresentationRecord>;
    async fn presentation(&self, id: RecordId) -> Result<PresentationRecord>;
    async fn update_presentation(&self, record: &PresentationRecord) -> Result<()>;

    /// Replace all slides of a presentation in one shot. Returned records
    /// are ordered by `slide_number`.
    async fn replace_slides(
        &self,
        presentation_id: RecordId,
        slides: Vec<NewSlide>,
    ) -> Result<Vec<SlideRecord>>;
    /// Ordered by `slide_number`.
    async fn slides(&self, presentation_id: RecordId) -> Result<Vec<SlideRecord>>;
    async fn slide(&self, id: RecordId) -> Result<SlideRecord>;
    async fn update_slide(&self, record: &SlideRecord) -> Result<()>;

    async fn credits(&self, user_id: RecordId) -> Result<i64>;
    /// Deduct one credit, rejecting when the balance is below one. Returns
    /// the remaining balance.
    async fn debit_credit(&self, user_id: RecordId) -> Result<i64>;
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: RecordId,
    presentations: BTreeMap<RecordId, PresentationRecord>,
    slides: BTreeMap<RecordId, SlideRecord>,
    credits: BTreeMap<RecordId, i64>,
}

impl MemoryState {
    fn next_id(&mut self) -> RecordId {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user's credit balance.
    pub fn grant_credits(&self, user_id: RecordId, amount: i64) {
        if let Ok(mut state) = self.state.lock() {
            *state.credits.entry(user_id).or_insert(0) += amount;
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| SlideCraftError::Store("memory store lock is poisoned".to_string()))
    }
}

#[async_trait]
impl DeckStore for MemoryStore {
    async fn create_presentation(&self, new: NewPresentation) -> Result<PresentationRecord> {
        let mut state = self.lock()?;
        let id = state.next_id();
        let record = PresentationRecord {
            id,
            user_id: new.user_id,
            title: new.title,
            description: String::new(),
            topic: new.topic,
            slide_count: new.slide_count,
            status: new.status,
            thumbnail: None,
        };
        state.presentations.insert(id, record.clone());
        Ok(record)
    }

    async fn presentation(&self, id: RecordId) -> Result<PresentationRecord> {
        self.lock()?
            .presentations
            .get(&id)
            .cloned()
            .ok_or_else(|| SlideCraftError::NotFound(format!("presentation {id}")))
    }

    async fn update_presentation(&self, record: &PresentationRecord) -> Result<()> {
        let mut state = self.lock()?;
        if !state.presentations.contains_key(&record.id) {
            return Err(SlideCraftError::NotFound(format!(
                "presentation {}",
                record.id
            )));
        }
        state.presentations.insert(record.id, record.clone());
        Ok(())
    }

    async fn replace_slides(
        &self,
        presentation_id: RecordId,
        slides: Vec<NewSlide>,
    ) -> Result<Vec<SlideRecord>> {
        let mut state = self.lock()?;
        if !state.presentations.contains_key(&presentation_id) {
            return Err(SlideCraftError::NotFound(format!(
                "presentation {presentation_id}"
            )));
        }
        state
            .slides
            .retain(|_, slide| slide.presentation_id != presentation_id);

        let mut out = Vec::with_capacity(slides.len());
        for new in slides {
            let id = state.next_id();
            let record = SlideRecord {
                id,
                presentation_id,
                slide_number: new.slide_number,
                title: new.title,
                content: new.content,
                image_url: new.image_url,
                image_prompt: new.image_prompt,
            };
            state.slides.insert(id, record.clone());
            out.push(record);
        }
        out.sort_by_key(|slide| slide.slide_number);
        Ok(out)
    }

    async fn slides(&self, presentation_id: RecordId) -> Result<Vec<SlideRecord>> {
        let state = self.lock()?;
        let mut out: Vec<SlideRecord> = state
            .slides
            .values()
            .filter(|slide| slide.presentation_id == presentation_id)
            .cloned()
            .collect();
        out.sort_by_key(|slide| slide.slide_number);
        Ok(out)
    }

    async fn slide(&self, id: RecordId) -> Result<SlideRecord> {
        self.lock()?
            .slides
            .get(&id)
            .cloned()
            .ok_or_else(|| SlideCraftError::NotFound(format!("slide {id}")))
    }

    async fn update_slide(&self, record: &SlideRecord) -> Result<()> {
        let mut state = self.lock()?;
        if !state.slides.contains_key(&record.id) {
            return Err(SlideCraftError::NotFound(format!("slide {}", record.id)));
        }
        state.slides.insert(record.id, record.clone());
        Ok(())
    }

    async fn credits(&self, user_id: RecordId) -> Result<i64> {
        Ok(self.lock()?.credits.get(&user_id).copied().unwrap_or(0))
    }

    async fn debit_credit(&self, user_id: RecordId) -> Result<i64> {
        let mut state = self.lock()?;
        let balance = state.credits.entry(user_id).or_insert(0);
        if *balance < 1 {
            return Err(SlideCraftError::InsufficientCredits { remaining: *balance });
        }
        *balance -= 1;
        Ok(*balance)
    }
}

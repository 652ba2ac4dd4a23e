//! Deterministic substitute content. Whatever the provider does, the
//! pipeline can always hand the orchestrator a complete, schema-valid deck.

use crate::deck::{SlideDeck, SlideSpec};

/// Build a deck for `topic` with exactly `slide_count` slides: an
/// introduction, templated key-point slides, and a conclusion. No external
/// calls; cannot fail.
pub fn fallback_deck(topic: &str, slide_count: u8) -> SlideDeck {
    let slide_count = u32::from(slide_count);
    let mut slides = Vec::with_capacity(slide_count as usize);

    slides.push(SlideSpec {
        slide_number: 1,
        title: format!("Introduction to {topic}"),
        content: format!(
            "• Overview of {topic}\n• Key concepts and importance\n• What we'll cover today"
        ),
        image_prompt: format!("Professional illustration representing {topic}"),
        image_url: None,
    });

    for number in 2..slide_count {
        slides.push(SlideSpec {
            slide_number: number,
            title: format!("{topic} - Key Point {}", number - 1),
            content: format!(
                "• Important aspect of {topic}\n• Detailed explanation and benefits\n• Real-world applications"
            ),
            image_prompt: format!("Business chart or diagram about {topic}"),
            image_url: None,
        });
    }

    slides.push(SlideSpec {
        slide_number: slide_count,
        title: "Conclusion".to_string(),
        content: format!(
            "• Summary of {topic} key points\n• Next steps and recommendations\n• Thank you for your attention"
        ),
        image_prompt: "Professional thank you or conclusion image".to_string(),
        image_url: None,
    });

    SlideDeck {
        title: format!("Presentation: {topic}"),
        description: format!("A comprehensive overview of {topic} and its key aspects."),
        slides,
    }
}

/// Deterministic image prompt used when the provider cannot supply one.
pub fn fallback_image_prompt(slide_title: &str) -> String {
    format!("Professional business illustration about {slide_title}")
}

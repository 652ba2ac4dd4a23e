//! Prompt construction. Pure string formatting; every builder succeeds.

use crate::deck::SlideDeck;

/// Instruction for the primary deck generation call. Pins the exact JSON
/// shape the parser expects and forbids surrounding prose.
pub fn deck_prompt(topic: &str, slide_count: u8) -> String {
    format!(
        r#"Generate a professional {slide_count}-slide presentation about "{topic}".

You MUST return a valid JSON object with this EXACT structure:
{{
    "title": "Professional presentation title about {topic}",
    "description": "Brief 1-2 sentence description",
    "slides": [
        {{
            "slide_number": 1,
            "title": "Introduction to {topic}",
            "content": "• First key point (max 12 words)\n• Second key point (max 12 words)\n• Third key point (max 12 words)",
            "image_prompt": "Professional image description"
        }}
    ]
}}

CRITICAL REQUIREMENTS:
- Generate exactly {slide_count} slides
- Each slide must have exactly 3 bullet points
- Each bullet point maximum 12 words
- First slide: Title/Introduction slide
- Last slide: Conclusion/Thank you slide
- Middle slides: Key topics about {topic}
- Professional, business-appropriate content
- Image prompts should describe professional, clean imagery
- Return ONLY valid JSON, no markdown formatting, no extra text

Topic: {topic}
Slide count: {slide_count}"#
    )
}

/// Secondary instruction asking for an image description for one slide.
pub fn image_prompt_instruction(slide_title: &str, slide_content: &str) -> String {
    format!(
        r#"Create a detailed image description for a professional presentation slide.

Slide Title: {slide_title}
Slide Content: {slide_content}

Generate a description for a professional, clean, modern image that would complement this slide.
The description should be suitable for image generation tools.
Keep it under 100 words and focus on professional business imagery.

Return only the image description, nothing else."#
    )
}

/// Instruction for regenerating one slide's bullet content in place.
pub fn regenerate_content_prompt(topic: &str, slide_title: &str) -> String {
    format!(
        r#"Regenerate content for a presentation slide about "{topic}".
Current slide title: "{slide_title}"

Generate 3 bullet points (maximum 12 words each) that are:
- Professional and engaging
- Relevant to the topic and title
- Different from the current content

Return only the bullet points in this format:
• Point 1
• Point 2
• Point 3"#
    )
}

/// Instruction for rewriting an existing deck with the same structure.
pub fn enhance_prompt(deck: &SlideDeck) -> String {
    let serialized = serde_json::to_string_pretty(deck).unwrap_or_default();
    format!(
        r#"Enhance the following presentation content to make it more engaging and professional:

{serialized}

Improve the content while maintaining the same structure. Make bullet points more impactful,
improve titles, and ensure professional language throughout.

Return the enhanced content in the same JSON format."#
    )
}

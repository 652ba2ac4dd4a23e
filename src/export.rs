//! Export collaborator boundary. Turning a persisted presentation into a
//! document is pure format translation and stays outside this crate; the
//! core owns only the projection handed across and the image fetches that
//! feed it.

use std::time::Duration;

use bytes::Bytes;

use crate::store::{PresentationRecord, SlideRecord};
use crate::Result;

const IMAGE_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// 16:9 slides, title + content layout, optional embedded image.
    Pptx,
    /// Title page followed by per-slide heading and body paragraphs.
    Pdf,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Self::Pdf => "application/pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pptx => "pptx",
            Self::Pdf => "pdf",
        }
    }
}

/// What an exporter renders: the presentation projected into ordered pages
/// with any imagery already fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckDocument {
    pub title: String,
    pub description: String,
    pub pages: Vec<DocumentPage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPage {
    pub number: u32,
    pub heading: String,
    pub body: String,
    pub image: Option<Bytes>,
}

/// Rendering seam implemented by the external document libraries.
pub trait DeckExporter: Send + Sync {
    fn format(&self) -> ExportFormat;
    fn render(&self, document: &DeckDocument) -> Result<Bytes>;
}

/// Download one slide image. Any failure is expected and non-fatal; the
/// document simply ships without that image.
pub async fn fetch_slide_image(http: &reqwest::Client, url: &str) -> Option<Bytes> {
    let response = match http
        .get(url)
        .timeout(IMAGE_FETCH_TIMEOUT)
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(error = %err, url, "slide image fetch failed");
            return None;
        }
    };
    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), url, "slide image fetch rejected");
        return None;
    }
    response.bytes().await.ok()
}

/// Project records into a [`DeckDocument`] (ordered by slide number, images
/// fetched) and hand it to the exporter.
pub async fn export_presentation(
    http: &reqwest::Client,
    exporter: &dyn DeckExporter,
    presentation: &PresentationRecord,
    slides: &[SlideRecord],
) -> Result<Bytes> {
    let mut ordered: Vec<&SlideRecord> = slides.iter().collect();
    ordered.sort_by_key(|slide| slide.slide_number);

    let mut pages = Vec::with_capacity(ordered.len());
    for slide in ordered {
        let image = match slide.image_url.as_deref() {
            Some(url) => fetch_slide_image(http, url).await,
            None => None,
        };
        pages.push(DocumentPage {
            number: slide.slide_number,
            heading: slide.title.clone(),
            body: slide.content.clone(),
            image,
        });
    }

    exporter.render(&DeckDocument {
        title: presentation.title.clone(),
        description: presentation.description.clone(),
        pages,
    })
}

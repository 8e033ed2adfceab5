//! Content builder: composes one outgoing turn from text plus images.

use crate::message::{Content, ContentPart};
use serde::{Deserialize, Serialize};

/// Media type assumed for caller-supplied screenshots.
pub const DEFAULT_IMAGE_MEDIA_TYPE: &str = "image/png";

/// Where images go relative to the text part.
///
/// Declared by each provider variant; vendors associate image references
/// by position, so this must never drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageOrder {
    TextFirst,
    ImagesFirst,
}

/// Base64 images attached to a turn.
///
/// Accepts a single string for callers that only ever send one screenshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Images(Vec<String>);

impl Images {
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl From<String> for Images {
    fn from(image: String) -> Self {
        Self(vec![image])
    }
}

impl From<&str> for Images {
    fn from(image: &str) -> Self {
        Self(vec![image.to_string()])
    }
}

impl From<Vec<String>> for Images {
    fn from(images: Vec<String>) -> Self {
        Self(images)
    }
}

impl<T: Into<Images>> From<Option<T>> for Images {
    fn from(images: Option<T>) -> Self {
        images.map(Into::into).unwrap_or_default()
    }
}

/// Build the content for one turn.
///
/// No images → the text verbatim as scalar content. Otherwise a part list
/// in the requested order.
pub fn build(text: &str, images: impl Into<Images>, order: ImageOrder) -> Content {
    let images = images.into();
    if images.is_empty() {
        return Content::Text(text.to_string());
    }

    let image_parts = images
        .iter()
        .map(|data| ContentPart::image(data, DEFAULT_IMAGE_MEDIA_TYPE));
    let text_part = std::iter::once(ContentPart::text(text));

    let parts = match order {
        ImageOrder::TextFirst => text_part.chain(image_parts).collect(),
        ImageOrder::ImagesFirst => image_parts.chain(text_part).collect(),
    };
    Content::Parts(parts)
}

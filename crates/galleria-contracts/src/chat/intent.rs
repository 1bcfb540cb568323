use serde::{Deserialize, Serialize};

pub const DESCRIBE_KEYWORDS: &[&str] = &[
    "describe",
    "tell me more",
    "what is",
    "explain",
    "information",
    "details",
];

pub const THIS_IMAGE_PHRASES: &[&str] = &["this image", "this"];

pub const IMAGE_RELATED_KEYWORDS: &[&str] = &[
    "image", "picture", "photo", "gallery", "show me", "similar", "describe",
];

/// Handling path chosen for one user turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatIntent {
    DescribeImage,
    General,
    Gallery,
}

impl ChatIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DescribeImage => "describe_image",
            Self::General => "general",
            Self::Gallery => "gallery",
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

fn normalized_text(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_lowercase)
}

pub fn is_description_request(text: &str) -> bool {
    let lower = text.to_lowercase();
    contains_any(&lower, DESCRIBE_KEYWORDS) && contains_any(&lower, THIS_IMAGE_PHRASES)
}

pub fn is_image_related_query(text: &str) -> bool {
    contains_any(&text.to_lowercase(), IMAGE_RELATED_KEYWORDS)
}

/// Picks the handling path for a turn.
///
/// Empty or whitespace-only text counts as no text, so an image on its own
/// always falls through to [`ChatIntent::Gallery`].
pub fn classify(text: Option<&str>, has_image: bool) -> ChatIntent {
    let Some(lower) = normalized_text(text) else {
        return ChatIntent::Gallery;
    };
    if has_image && is_description_request(&lower) {
        return ChatIntent::DescribeImage;
    }
    if !has_image && !is_image_related_query(&lower) {
        return ChatIntent::General;
    }
    ChatIntent::Gallery
}

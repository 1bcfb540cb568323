use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Embedding-space vector for one query. Unit length for single-modality
/// queries; the mean of two unit vectors when text and image are fused.
pub type QueryVector = Vec<f32>;

pub const METADATA_SEPARATOR: &str = ", ";

pub fn split_metadata_field(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    value
        .split(METADATA_SEPARATOR)
        .map(str::to_string)
        .collect()
}

pub fn join_metadata_field(values: &[String]) -> String {
    values.join(METADATA_SEPARATOR)
}

fn metadata_text(metadata: &Map<String, Value>, key: &str) -> String {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryItem {
    pub id: String,
    pub path: String,
    pub document: String,
    pub tags: Vec<String>,
    pub color_palette: Vec<String>,
    pub detected_objects: Vec<String>,
    #[serde(default)]
    pub potential_use_cases: Vec<String>,
}

impl GalleryItem {
    /// Builds an item from an index record. Multi-valued fields are stored as
    /// `", "`-joined strings; `path` comes from `image_path`.
    pub fn from_metadata(id: &str, document: &str, metadata: &Map<String, Value>) -> Self {
        Self {
            id: id.to_string(),
            path: metadata_text(metadata, "image_path"),
            document: document.to_string(),
            tags: split_metadata_field(&metadata_text(metadata, "tags")),
            color_palette: split_metadata_field(&metadata_text(metadata, "color_palette")),
            detected_objects: split_metadata_field(&metadata_text(metadata, "detected_objects")),
            potential_use_cases: split_metadata_field(&metadata_text(
                metadata,
                "potential_use_cases",
            )),
        }
    }
}

/// Parallel, equal-length sequences ranked by similarity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    pub documents: Vec<String>,
    pub metadatas: Vec<Map<String, Value>>,
    pub paths: Vec<String>,
}

impl RetrievalResult {
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn push(&mut self, document: String, metadata: Map<String, Value>) {
        self.paths.push(metadata_text(&metadata, "image_path"));
        self.documents.push(document);
        self.metadatas.push(metadata);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResult {
    pub response: String,
    pub paths: Vec<String>,
    pub combined_description: String,
}

impl ChatResult {
    pub fn text_only(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            paths: Vec::new(),
            combined_description: String::new(),
        }
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::chat::DEFAULT_MAX_HISTORY;
use crate::gallery::{PathMapper, DEFAULT_STORAGE_PREFIX, DEFAULT_WEB_PREFIX};
use crate::prompts::DEFAULT_ANALYSIS_LANGUAGE;

pub const DEFAULT_COLLECTION: &str = "image_embeddings2";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_EMBEDDING_MODEL: &str = "clip-vit-base-patch32";
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_REQUEST_RETRIES: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    pub index_path: PathBuf,
    pub collection: String,
    pub image_dir: PathBuf,
    pub text_model: String,
    pub embedding_model: String,
    pub embedding_base_url: Option<String>,
    pub max_history: usize,
    pub top_k: usize,
    pub storage_prefix: String,
    pub web_prefix: String,
    pub describe_delay_ms: u64,
    pub ingest_delay_ms: u64,
    pub request_timeout_s: u64,
    /// Extra attempts after a timeout, refused connection or throttling reply.
    pub request_retries: usize,
    /// Language the analyzer writes tags and metadata in.
    pub analysis_language: String,
    pub events_path: Option<PathBuf>,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("storage/gallery_index.json"),
            collection: DEFAULT_COLLECTION.to_string(),
            image_dir: PathBuf::from("static/image_data"),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_base_url: None,
            max_history: DEFAULT_MAX_HISTORY,
            top_k: DEFAULT_TOP_K,
            storage_prefix: DEFAULT_STORAGE_PREFIX.to_string(),
            web_prefix: DEFAULT_WEB_PREFIX.to_string(),
            describe_delay_ms: 0,
            ingest_delay_ms: 2000,
            request_timeout_s: 90,
            request_retries: DEFAULT_REQUEST_RETRIES,
            analysis_language: DEFAULT_ANALYSIS_LANGUAGE.to_string(),
            events_path: None,
        }
    }
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl GalleryConfig {
    /// Defaults, then the optional JSON file, then `GALLERIA_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid config JSON in {}", path.display()))
    }

    /// Applies overrides from `lookup`. Blank values and unparseable numbers
    /// are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| lookup(key).and_then(non_empty);
        let number = |key: &str| text(key).and_then(|raw| raw.parse::<usize>().ok());

        if let Some(value) = text("GALLERIA_INDEX_PATH") {
            self.index_path = PathBuf::from(value);
        }
        if let Some(value) = text("GALLERIA_COLLECTION") {
            self.collection = value;
        }
        if let Some(value) = text("GALLERIA_IMAGE_DIR") {
            self.image_dir = PathBuf::from(value);
        }
        if let Some(value) = text("GALLERIA_TEXT_MODEL") {
            self.text_model = value;
        }
        if let Some(value) = text("GALLERIA_EMBEDDING_MODEL") {
            self.embedding_model = value;
        }
        if let Some(value) = text("GALLERIA_EMBEDDING_URL") {
            self.embedding_base_url = Some(value);
        }
        if let Some(value) = number("GALLERIA_MAX_HISTORY") {
            self.max_history = value;
        }
        if let Some(value) = number("GALLERIA_TOP_K") {
            self.top_k = value;
        }
        if let Some(value) = number("GALLERIA_REQUEST_RETRIES") {
            self.request_retries = value;
        }
        if let Some(value) = text("GALLERIA_ANALYSIS_LANGUAGE") {
            self.analysis_language = value;
        }
        if let Some(value) = text("GALLERIA_EVENTS_PATH") {
            self.events_path = Some(PathBuf::from(value));
        }
    }

    pub fn path_mapper(&self) -> PathMapper {
        PathMapper::new(self.storage_prefix.clone(), self.web_prefix.clone())
    }
}

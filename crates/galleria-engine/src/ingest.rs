use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use galleria_contracts::chat::ChatMessage;
use galleria_contracts::error::{error_chain_text, ERROR_MESSAGE_MAX_CHARS};
use galleria_contracts::events::EventWriter;
use galleria_contracts::gallery::join_metadata_field;
use galleria_contracts::prompts::{
    image_analysis_prompt, DEFAULT_ANALYSIS_LANGUAGE, IMAGE_ANALYSIS_REQUEST,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::embedding::{l2_normalize, EmbeddingModel};
use crate::images::is_supported_image;
use crate::index::{IndexRecord, VectorIndex};
use crate::providers::{extract_json_object_from_text, TextGenerator};
use crate::summarizer::ImageDescriber;

/// Structured metadata extracted from one image by the analyzer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub detected_objects: Vec<String>,
    pub color_palette: Vec<String>,
    pub potential_use_cases: Vec<String>,
    pub tags: Vec<String>,
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text.trim().to_string()),
                Value::Number(number) => Some(number.to_string()),
                _ => None,
            })
            .filter(|text| !text.is_empty())
            .collect(),
        Some(Value::String(text)) => text
            .split(',')
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

impl ImageMetadata {
    /// Lenient read of an analyzer object. Lists may arrive as arrays or as
    /// comma-separated strings; missing keys are empty.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            detected_objects: string_list(object.get("detected_objects")),
            color_palette: string_list(object.get("color_palette")),
            potential_use_cases: string_list(object.get("potential_use_cases")),
            tags: string_list(object.get("tags")),
        }
    }

    pub fn parse_reply(reply: &str) -> Result<Self> {
        let Some(object) = extract_json_object_from_text(reply) else {
            bail!("analyzer reply did not contain a JSON object");
        };
        Ok(Self::from_object(&object))
    }

    pub fn to_index_metadata(&self, image_path: &str) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert("image_path".to_string(), json!(image_path));
        metadata.insert(
            "detected_objects".to_string(),
            json!(join_metadata_field(&self.detected_objects)),
        );
        metadata.insert(
            "color_palette".to_string(),
            json!(join_metadata_field(&self.color_palette)),
        );
        metadata.insert(
            "potential_use_cases".to_string(),
            json!(join_metadata_field(&self.potential_use_cases)),
        );
        metadata.insert("tags".to_string(), json!(join_metadata_field(&self.tags)));
        metadata
    }
}

/// Index id for an image: its file name without the extension.
pub fn image_id(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .filter(|stem| !stem.trim().is_empty())
        .with_context(|| format!("cannot derive an image id from {}", path.display()))
}

pub fn posix_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Stored(String),
    Skipped(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub stored: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl IngestReport {
    pub fn total(&self) -> usize {
        self.stored.len() + self.skipped.len() + self.failed.len()
    }
}

/// Supported images directly inside `dir`, ordered by file name.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_supported_image(path))
        .collect();
    paths.sort_by(|left, right| left.file_name().cmp(&right.file_name()));
    Ok(paths)
}

/// Copies supported files into `image_dir`, creating it if needed. Returns
/// the destination paths; unsupported sources are ignored.
pub fn import_files(sources: &[PathBuf], image_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(image_dir)
        .with_context(|| format!("failed to create {}", image_dir.display()))?;
    let mut copied = Vec::new();
    for source in sources {
        if !is_supported_image(source) {
            warn!("not an image, skipping {}", source.display());
            continue;
        }
        let Some(name) = source.file_name() else {
            continue;
        };
        let dest = image_dir.join(name);
        fs::copy(source, &dest).with_context(|| {
            format!("failed to copy {} to {}", source.display(), dest.display())
        })?;
        copied.push(dest);
    }
    Ok(copied)
}

/// Batch producer for the gallery index: embed, describe, analyze, store.
pub struct Ingestor {
    embedder: Arc<dyn EmbeddingModel>,
    describer: Arc<dyn ImageDescriber>,
    analyzer: Arc<dyn TextGenerator>,
    index: Arc<dyn VectorIndex>,
    collection: String,
    language: String,
    delay: Duration,
    events: Option<EventWriter>,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn EmbeddingModel>,
        describer: Arc<dyn ImageDescriber>,
        analyzer: Arc<dyn TextGenerator>,
        index: Arc<dyn VectorIndex>,
        collection: &str,
    ) -> Self {
        Self {
            embedder,
            describer,
            analyzer,
            index,
            collection: collection.to_string(),
            language: DEFAULT_ANALYSIS_LANGUAGE.to_string(),
            delay: Duration::ZERO,
            events: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn analyze(&self, path: &Path) -> Result<ImageMetadata> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let messages = [
            ChatMessage::system(image_analysis_prompt(&self.language)),
            ChatMessage::user(IMAGE_ANALYSIS_REQUEST).with_image(path),
        ];
        let reply = self
            .analyzer
            .generate(&messages)
            .with_context(|| format!("analyzing {} failed", path.display()))?;
        ImageMetadata::parse_reply(&reply)
            .with_context(|| format!("unusable metadata for {}", path.display()))
    }

    /// Stores one image. An id already in the collection is skipped before
    /// any model call.
    pub fn ingest_image(&self, path: &Path) -> Result<IngestOutcome> {
        let id = image_id(path)?;
        if self.index.contains(&self.collection, &id)? {
            info!("{id} already in '{}', skipping", self.collection);
            self.emit("ingest_skipped", json!({ "id": id }));
            return Ok(IngestOutcome::Skipped(id));
        }

        let embedding = self
            .embedder
            .embed_image(path)
            .with_context(|| format!("embedding {} failed", path.display()))?;
        let description = self.describer.describe(path)?;
        let metadata = self.analyze(path)?;
        let image_path = posix_path(path);

        let stored = self.index.add(
            &self.collection,
            IndexRecord {
                id: id.clone(),
                document: description.trim().to_string(),
                metadata: metadata.to_index_metadata(&image_path),
                embedding: l2_normalize(embedding),
            },
        )?;
        if !stored {
            // Another writer stored the same id between the check and the add.
            self.emit("ingest_skipped", json!({ "id": id }));
            return Ok(IngestOutcome::Skipped(id));
        }
        info!("stored {id} in '{}'", self.collection);
        self.emit(
            "ingest_stored",
            json!({ "id": id, "image_path": image_path, "tags": metadata.tags }),
        );
        Ok(IngestOutcome::Stored(id))
    }

    pub fn ingest_paths(&self, paths: &[PathBuf]) -> IngestReport {
        let mut report = IngestReport::default();
        for path in paths {
            match self.ingest_image(path) {
                Ok(IngestOutcome::Stored(id)) => report.stored.push(id),
                Ok(IngestOutcome::Skipped(id)) => report.skipped.push(id),
                Err(err) => {
                    let message = error_chain_text(&err, ERROR_MESSAGE_MAX_CHARS);
                    warn!("failed to ingest {}: {message}", path.display());
                    report.failed.push((posix_path(path), message));
                }
            }
        }
        report
    }

    pub fn ingest_directory(&self, dir: &Path) -> Result<IngestReport> {
        let paths = list_images(dir)?;
        info!(
            "ingesting {} image(s) from {} into '{}'",
            paths.len(),
            dir.display(),
            self.collection
        );
        Ok(self.ingest_paths(&paths))
    }

    fn emit(&self, event_type: &str, payload: Value) {
        let Some(events) = &self.events else {
            return;
        };
        if let Err(err) = events.emit_json(event_type, payload) {
            warn!("failed to record {event_type} event: {err:#}");
        }
    }
}

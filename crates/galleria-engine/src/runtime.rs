use std::sync::Arc;
use std::time::Duration;

use anyhow::{Error, Result};
use galleria_contracts::config::GalleryConfig;
use galleria_contracts::events::EventWriter;
use galleria_contracts::models::{
    ModelSelection, ModelSelector, CAPABILITY_EMBEDDING, CAPABILITY_TEXT, CAPABILITY_VISION,
};
use log::{info, warn};

use crate::embedding::{build_embedding_model, EmbeddingFuser, EmbeddingModel};
use crate::gallery::GalleryIndexClient;
use crate::http::HttpTransport;
use crate::index::{LocalVectorIndex, VectorIndex};
use crate::ingest::Ingestor;
use crate::orchestrator::{ChatSettings, GalleryChat};
use crate::providers::{build_text_generator, TextGenerator};
use crate::sessions::InMemorySessionStore;
use crate::summarizer::{GeneratorImageDescriber, Summarizer};

/// Concrete collaborators resolved from a [`GalleryConfig`].
pub struct GalleryRuntime {
    config: GalleryConfig,
    text: ModelSelection,
    embedding: ModelSelection,
    generator: Arc<dyn TextGenerator>,
    embedder: Arc<dyn EmbeddingModel>,
    index: Arc<dyn VectorIndex>,
    events: Option<EventWriter>,
}

fn select(selector: &ModelSelector, requested: &str, capability: &str) -> Result<ModelSelection> {
    let requested = Some(requested.trim()).filter(|value| !value.is_empty());
    let selection = selector.select(requested, capability).map_err(Error::msg)?;
    if let Some(reason) = &selection.fallback_reason {
        if selection.requested.is_some() {
            warn!("{reason} Using '{}'.", selection.model.name);
        }
    }
    Ok(selection)
}

impl GalleryRuntime {
    pub fn from_config(config: GalleryConfig) -> Result<Self> {
        let selector = ModelSelector::new(None);
        let text = select(&selector, &config.text_model, CAPABILITY_TEXT)?;
        let embedding = select(&selector, &config.embedding_model, CAPABILITY_EMBEDDING)?;
        if !text.model.supports(CAPABILITY_VISION) {
            warn!(
                "text model '{}' has no vision support; image descriptions will fail",
                text.model.name
            );
        }

        let transport = HttpTransport::new(Duration::from_secs(config.request_timeout_s.max(1)))
            .with_retries(config.request_retries);
        let generator = build_text_generator(&text.model, &transport)?;
        let embedder = build_embedding_model(
            &embedding.model,
            config.embedding_base_url.as_deref(),
            &transport,
        )?;
        let index: Arc<dyn VectorIndex> = Arc::new(LocalVectorIndex::new(&config.index_path));
        let events = config
            .events_path
            .as_ref()
            .map(|path| EventWriter::new(path, uuid::Uuid::new_v4().simple().to_string()));
        if let Some(events) = &events {
            info!(
                "recording events to {} as instance {}",
                events.path().display(),
                events.instance_id()
            );
        }
        info!(
            "text model '{}' ({}), embedding model '{}' ({}), collection '{}'",
            text.model.name,
            text.model.provider,
            embedding.model.name,
            embedding.model.provider,
            config.collection
        );

        Ok(Self {
            config,
            text,
            embedding,
            generator,
            embedder,
            index,
            events,
        })
    }

    pub fn config(&self) -> &GalleryConfig {
        &self.config
    }

    pub fn text_selection(&self) -> &ModelSelection {
        &self.text
    }

    pub fn embedding_selection(&self) -> &ModelSelection {
        &self.embedding
    }

    pub fn gallery(&self) -> GalleryIndexClient {
        GalleryIndexClient::new(
            self.index.clone(),
            &self.config.collection,
            self.config.path_mapper(),
        )
    }

    pub fn chat(&self) -> GalleryChat {
        let describer = Arc::new(GeneratorImageDescriber::new(
            self.generator.clone(),
            Duration::from_millis(self.config.describe_delay_ms),
        ));
        let chat = GalleryChat::new(
            Arc::new(InMemorySessionStore::new()),
            EmbeddingFuser::new(self.embedder.clone()),
            self.gallery(),
            self.generator.clone(),
            Summarizer::new(describer, self.generator.clone()),
        )
        .with_settings(ChatSettings {
            max_history: self.config.max_history,
            top_k: self.config.top_k,
            ..ChatSettings::default()
        });
        match &self.events {
            Some(events) => chat.with_events(events.clone()),
            None => chat,
        }
    }

    pub fn ingestor(&self) -> Ingestor {
        let delay = Duration::from_millis(self.config.ingest_delay_ms);
        let describer = Arc::new(GeneratorImageDescriber::new(self.generator.clone(), delay));
        let ingestor = Ingestor::new(
            self.embedder.clone(),
            describer,
            self.generator.clone(),
            self.index.clone(),
            &self.config.collection,
        )
        .with_delay(delay)
        .with_language(&self.config.analysis_language);
        match &self.events {
            Some(events) => ingestor.with_events(events.clone()),
            None => ingestor,
        }
    }
}

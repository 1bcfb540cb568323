use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use galleria_contracts::error::{ChatError, ExternalStage};
use galleria_contracts::gallery::QueryVector;
use galleria_contracts::models::ModelSpec;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::http::HttpTransport;
use crate::images::{encode_base64, humanized_stem, mime_for_path};

/// Shared text/image embedding space. Both methods return vectors of the same
/// width; callers normalize before comparing.
pub trait EmbeddingModel: Send + Sync {
    fn name(&self) -> &str;
    fn embed_text(&self, text: &str) -> Result<Vec<f32>>;
    fn embed_image(&self, path: &Path) -> Result<Vec<f32>>;
}

/// Scales `vector` to unit length. A zero vector has no direction and comes
/// back unchanged, so models must not produce one.
pub fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for value in &mut vector {
            *value /= norm;
        }
    }
    vector
}

/// Elementwise mean. Not renormalized.
pub fn fuse(text: &[f32], image: &[f32]) -> Result<QueryVector> {
    if text.len() != image.len() {
        bail!(
            "embedding width mismatch: text {} vs image {}",
            text.len(),
            image.len()
        );
    }
    Ok(text
        .iter()
        .zip(image)
        .map(|(left, right)| (left + right) / 2.0)
        .collect())
}

/// Turns a `(text?, image?)` pair into one query vector.
#[derive(Clone)]
pub struct EmbeddingFuser {
    model: Arc<dyn EmbeddingModel>,
}

impl EmbeddingFuser {
    pub fn new(model: Arc<dyn EmbeddingModel>) -> Self {
        Self { model }
    }

    pub fn embed_query(
        &self,
        text: Option<&str>,
        image: Option<&Path>,
    ) -> Result<QueryVector, ChatError> {
        let text = text.map(str::trim).filter(|value| !value.is_empty());
        let embedded = match (text, image) {
            (None, None) => return Err(ChatError::no_input()),
            (Some(text), None) => self.text_vector(text),
            (None, Some(image)) => self.image_vector(image),
            (Some(text), Some(image)) => self
                .text_vector(text)
                .and_then(|text_vec| {
                    let image_vec = self.image_vector(image)?;
                    fuse(&text_vec, &image_vec)
                }),
        };
        embedded.map_err(|err| ChatError::external(ExternalStage::Embedding, &err))
    }

    fn text_vector(&self, text: &str) -> Result<Vec<f32>> {
        let raw = self
            .model
            .embed_text(text)
            .with_context(|| format!("{} text embedding failed", self.model.name()))?;
        Ok(l2_normalize(raw))
    }

    fn image_vector(&self, path: &Path) -> Result<Vec<f32>> {
        let raw = self.model.embed_image(path).with_context(|| {
            format!(
                "{} image embedding failed for {}",
                self.model.name(),
                path.display()
            )
        })?;
        Ok(l2_normalize(raw))
    }
}

/// Client for a CLIP embedding service exposing `/embed/text` and
/// `/embed/image`.
pub struct HttpEmbeddingModel {
    model: String,
    base_url: String,
    transport: HttpTransport,
}

impl HttpEmbeddingModel {
    pub fn new(model: &str, base_url: &str, transport: HttpTransport) -> Self {
        Self {
            model: model.to_string(),
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            transport,
        }
    }

    fn post(&self, route: &str, payload: Value) -> Result<Vec<f32>> {
        let endpoint = format!("{}/{route}", self.base_url);
        let response = self
            .transport
            .post_json("embedding", &endpoint, |http| http.post(&endpoint).json(&payload))?;
        parse_embedding_response(&response)
    }
}

impl EmbeddingModel for HttpEmbeddingModel {
    fn name(&self) -> &str {
        &self.model
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.post("embed/text", json!({ "text": text, "model": self.model }))
    }

    fn embed_image(&self, path: &Path) -> Result<Vec<f32>> {
        let bytes = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
        self.post(
            "embed/image",
            json!({
                "image_b64": encode_base64(&bytes),
                "mime_type": mime_for_path(path),
                "model": self.model,
            }),
        )
    }
}

fn parse_embedding_response(response: &Value) -> Result<Vec<f32>> {
    let row = response
        .get("embedding")
        .or_else(|| {
            response
                .get("embeddings")
                .and_then(Value::as_array)
                .and_then(|rows| rows.first())
        })
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("embedding response has no `embedding` array"))?;
    let mut out = Vec::with_capacity(row.len());
    for value in row {
        let number = value
            .as_f64()
            .ok_or_else(|| anyhow!("embedding response contains a non-numeric value"))?;
        out.push(number as f32);
    }
    if out.is_empty() {
        bail!("embedding response is empty");
    }
    Ok(out)
}

/// Offline hashed bag-of-words model. Images embed through their file stem
/// words, so `giraffe_01.jpg` lands near the text "giraffe".
pub struct HashEmbeddingModel {
    model: String,
    dimensions: usize,
}

impl HashEmbeddingModel {
    pub fn new(model: &str, dimensions: usize) -> Self {
        Self {
            model: model.to_string(),
            dimensions: dimensions.max(1),
        }
    }

    fn embed_words(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        let lowered = text.to_lowercase();
        let mut tokens = lowered
            .split(|ch: char| !ch.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .peekable();
        if tokens.peek().is_none() {
            bail!("{} found no words to embed in {text:?}", self.model);
        }
        for token in tokens {
            let digest = Sha256::digest(token.as_bytes());
            let bucket = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize
                % self.dimensions;
            let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        Ok(l2_normalize(vector))
    }
}

impl EmbeddingModel for HashEmbeddingModel {
    fn name(&self) -> &str {
        &self.model
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_words(text)
    }

    fn embed_image(&self, path: &Path) -> Result<Vec<f32>> {
        fs::metadata(path).with_context(|| format!("failed reading {}", path.display()))?;
        self.embed_words(&humanized_stem(path))
    }
}

/// Builds the embedding client for a registry entry. Non-dryrun models need
/// a service URL.
pub fn build_embedding_model(
    model: &ModelSpec,
    base_url: Option<&str>,
    transport: &HttpTransport,
) -> Result<Arc<dyn EmbeddingModel>> {
    if model.provider == "dryrun" {
        return Ok(Arc::new(HashEmbeddingModel::new(
            &model.name,
            model.dimensions.unwrap_or(64),
        )));
    }
    let Some(base_url) = base_url.map(str::trim).filter(|value| !value.is_empty()) else {
        bail!(
            "embedding model '{}' needs an embedding service URL (GALLERIA_EMBEDDING_URL)",
            model.name
        );
    };
    Ok(Arc::new(HttpEmbeddingModel::new(
        &model.name,
        base_url,
        transport.clone(),
    )))
}

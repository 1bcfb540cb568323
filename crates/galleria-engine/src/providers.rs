use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use galleria_contracts::chat::{ChatMessage, Role, RELEVANT_IMAGES_MARKER};
use galleria_contracts::models::ModelSpec;
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Map, Value};

use crate::http::{api_base_from_env, first_non_empty_env, HttpTransport};
use crate::images::{data_url, encode_base64, humanized_stem, prepare_vision_image, VISION_MAX_DIM};

const GEMINI_DEFAULT_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_DEFAULT_BASE: &str = "https://api.openai.com/v1";

/// Stateless single-shot text generation over an ordered message list.
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, messages: &[ChatMessage]) -> Result<String>;
}

#[derive(Default)]
pub struct TextGeneratorRegistry {
    generators: BTreeMap<String, Arc<dyn TextGenerator>>,
}

impl TextGeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: &str, generator: Arc<dyn TextGenerator>) {
        self.generators.insert(provider.to_string(), generator);
    }

    pub fn get(&self, provider: &str) -> Option<Arc<dyn TextGenerator>> {
        self.generators.get(provider).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.generators.keys().cloned().collect()
    }
}

/// Generator for `model`, keyed by its provider.
pub fn build_text_generator(
    model: &ModelSpec,
    transport: &HttpTransport,
) -> Result<Arc<dyn TextGenerator>> {
    let mut registry = TextGeneratorRegistry::new();
    registry.register("dryrun", Arc::new(DryrunTextGenerator));
    registry.register(
        "gemini",
        Arc::new(GeminiTextGenerator::new(&model.name, transport.clone())),
    );
    registry.register(
        "openai",
        Arc::new(OpenAiTextGenerator::new(&model.name, transport.clone())),
    );
    registry.get(&model.provider).with_context(|| {
        format!(
            "no text generator for provider '{}' (known: {})",
            model.provider,
            registry.names().join(", ")
        )
    })
}

pub struct GeminiTextGenerator {
    model: String,
    api_base: String,
    transport: HttpTransport,
}

impl GeminiTextGenerator {
    pub fn new(model: &str, transport: HttpTransport) -> Self {
        Self {
            model: model.trim().to_string(),
            api_base: api_base_from_env("GEMINI_API_BASE", GEMINI_DEFAULT_BASE),
            transport,
        }
    }

    fn api_key() -> Option<String> {
        first_non_empty_env(&["GEMINI_API_KEY", "GOOGLE_API_KEY"])
    }

    fn endpoint(&self) -> String {
        let model_path = if self.model.starts_with("models/") {
            self.model.clone()
        } else {
            format!("models/{}", self.model)
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn build_payload(messages: &[ChatMessage]) -> Result<Value> {
        let mut system_parts: Vec<Value> = Vec::new();
        let mut contents: Vec<Value> = Vec::new();
        for message in messages {
            if message.role == Role::System {
                system_parts.push(json!({ "text": message.content }));
                continue;
            }
            let mut parts: Vec<Value> = Vec::new();
            for image in &message.images {
                let (bytes, mime) = prepare_vision_image(image, VISION_MAX_DIM)?;
                parts.push(json!({
                    "inlineData": {
                        "mimeType": mime,
                        "data": encode_base64(&bytes),
                    }
                }));
            }
            parts.push(json!({ "text": message.content }));
            let role = match message.role {
                Role::Assistant => "model",
                _ => "user",
            };
            contents.push(json!({ "role": role, "parts": parts }));
        }

        let mut payload = Map::new();
        payload.insert("contents".to_string(), Value::Array(contents));
        if !system_parts.is_empty() {
            payload.insert(
                "systemInstruction".to_string(),
                json!({ "parts": system_parts }),
            );
        }
        Ok(Value::Object(payload))
    }

    fn extract_text(response: &Value) -> String {
        let candidates = response
            .get("candidates")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let Some(first) = candidates.first() else {
            return String::new();
        };
        first
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part.get("text").and_then(Value::as_str))
                    .collect::<Vec<&str>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

impl TextGenerator for GeminiTextGenerator {
    fn name(&self) -> &str {
        "gemini"
    }

    fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let Some(api_key) = Self::api_key() else {
            bail!("GEMINI_API_KEY (or GOOGLE_API_KEY) not set");
        };
        let payload = Self::build_payload(messages)?;
        let endpoint = self.endpoint();
        let response = self.transport.post_json("Gemini", &endpoint, |http| {
            http.post(&endpoint)
                .query(&[("key", api_key.as_str())])
                .json(&payload)
        })?;
        let text = Self::extract_text(&response);
        if text.trim().is_empty() {
            bail!("Gemini returned no text for model {}", self.model);
        }
        Ok(text)
    }
}

/// Any `chat/completions` compatible endpoint.
pub struct OpenAiTextGenerator {
    model: String,
    api_base: String,
    transport: HttpTransport,
}

impl OpenAiTextGenerator {
    pub fn new(model: &str, transport: HttpTransport) -> Self {
        Self {
            model: model.trim().to_string(),
            api_base: api_base_from_env("OPENAI_API_BASE", OPENAI_DEFAULT_BASE),
            transport,
        }
    }

    fn build_payload(&self, messages: &[ChatMessage]) -> Result<Value> {
        let mut rows: Vec<Value> = Vec::with_capacity(messages.len());
        for message in messages {
            let content = if message.images.is_empty() {
                Value::String(message.content.clone())
            } else {
                let mut parts = vec![json!({ "type": "text", "text": message.content })];
                for image in &message.images {
                    let (bytes, mime) = prepare_vision_image(image, VISION_MAX_DIM)?;
                    parts.push(json!({
                        "type": "image_url",
                        "image_url": { "url": data_url(&bytes, &mime) },
                    }));
                }
                Value::Array(parts)
            };
            rows.push(json!({ "role": message.role.as_str(), "content": content }));
        }
        Ok(json!({ "model": self.model, "messages": rows }))
    }

    fn extract_text(response: &Value) -> String {
        response
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }
}

impl TextGenerator for OpenAiTextGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let Some(api_key) = first_non_empty_env(&["OPENAI_API_KEY"]) else {
            bail!("OPENAI_API_KEY not set");
        };
        let payload = self.build_payload(messages)?;
        let endpoint = format!("{}/chat/completions", self.api_base);
        let response = self.transport.post_json("OpenAI", &endpoint, |http| {
            http.post(&endpoint)
                .bearer_auth(&api_key)
                .header(CONTENT_TYPE, "application/json")
                .json(&payload)
        })?;
        let text = Self::extract_text(&response);
        if text.trim().is_empty() {
            bail!("OpenAI returned no text for model {}", self.model);
        }
        Ok(text)
    }
}

/// Offline generator with deterministic replies shaped like the real ones.
pub struct DryrunTextGenerator;

impl DryrunTextGenerator {
    fn analysis_reply(stem: &str) -> String {
        let words: Vec<String> = stem.split_whitespace().map(str::to_string).collect();
        json!({
            "detected_objects": words,
            "color_palette": ["neutral"],
            "potential_use_cases": ["gallery browsing"],
            "tags": words,
        })
        .to_string()
    }

    fn gallery_reply(prompt: &str) -> String {
        let paths = prompt
            .lines()
            .rev()
            .find_map(|line| line.strip_prefix("Image paths: "))
            .map(str::trim)
            .unwrap_or("None");
        if paths == "None" || paths.is_empty() {
            return "I couldn't find a close match in the gallery.".to_string();
        }
        format!("Here are some images from the gallery. I'll show the images below.\n\n{RELEVANT_IMAGES_MARKER} {paths}")
    }

    fn summary_reply(prompt: &str) -> String {
        let items: Vec<&str> = prompt
            .lines()
            .filter_map(|line| line.strip_prefix("- "))
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        format!("These images show {}.", items.join("; ").trim_end_matches('.'))
    }
}

impl TextGenerator for DryrunTextGenerator {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate(&self, messages: &[ChatMessage]) -> Result<String> {
        let Some(last) = messages.last() else {
            bail!("dryrun generator received no messages");
        };
        for image in &last.images {
            fs::metadata(image).with_context(|| format!("failed reading {}", image.display()))?;
        }
        let wants_metadata = messages
            .iter()
            .any(|message| message.content.contains("detected_objects"));

        if let Some(image) = last.images.first() {
            let stem = humanized_stem(image);
            if wants_metadata {
                return Ok(Self::analysis_reply(&stem));
            }
            return Ok(format!("A photo of {stem}."));
        }
        if last.content.contains("\nImage paths: ") {
            return Ok(Self::gallery_reply(&last.content));
        }
        if last.content.starts_with("Summarize the following image descriptions") {
            return Ok(Self::summary_reply(&last.content));
        }
        Ok(format!("Dryrun answer to: {}", last.content.trim()))
    }
}

pub(crate) fn strip_code_fence(text: &str) -> String {
    let raw = text.trim();
    if !(raw.starts_with("```") && raw.ends_with("```")) {
        return raw.to_string();
    }
    let lines: Vec<&str> = raw.lines().collect();
    if lines.len() < 2 {
        return raw.to_string();
    }
    let mut body = lines[1..lines.len() - 1].join("\n").trim().to_string();
    if body.to_ascii_lowercase().starts_with("json") {
        body = body[4..].trim().to_string();
    }
    body
}

/// First JSON object in a model reply. Tolerates code fences and prose around
/// the object.
pub fn extract_json_object_from_text(text: &str) -> Option<Map<String, Value>> {
    let raw = strip_code_fence(text);
    if raw.trim().is_empty() {
        return None;
    }
    let mut candidates = vec![raw.clone()];
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if end > start {
            candidates.push(raw[start..=end].to_string());
        }
    }
    for candidate in candidates {
        if let Ok(parsed) = serde_json::from_str::<Value>(&candidate) {
            if let Some(object) = parsed.as_object() {
                return Some(object.clone());
            }
        }
    }
    None
}

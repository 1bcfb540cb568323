use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use galleria_contracts::chat::ChatMessage;
use galleria_contracts::error::{error_chain_text, ERROR_MESSAGE_MAX_CHARS};
use galleria_contracts::prompts::{
    summary_prompt, FAILED_IMAGE_LOAD, IMAGE_DESCRIPTION_PROMPT, NO_DESCRIPTION_AVAILABLE,
};
use log::{debug, warn};

use crate::providers::TextGenerator;

/// Produces a free-text description of one local image.
pub trait ImageDescriber: Send + Sync {
    fn describe(&self, path: &Path) -> Result<String>;
}

/// Describer backed by a vision-capable text generator.
pub struct GeneratorImageDescriber {
    generator: Arc<dyn TextGenerator>,
    delay: Duration,
}

impl GeneratorImageDescriber {
    pub fn new(generator: Arc<dyn TextGenerator>, delay: Duration) -> Self {
        Self { generator, delay }
    }
}

impl ImageDescriber for GeneratorImageDescriber {
    fn describe(&self, path: &Path) -> Result<String> {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let message = ChatMessage::user(IMAGE_DESCRIPTION_PROMPT).with_image(path);
        self.generator
            .generate(&[message])
            .with_context(|| format!("describing {} failed", path.display()))
    }
}

/// Folds the descriptions of several images into one short paragraph.
#[derive(Clone)]
pub struct Summarizer {
    describer: Arc<dyn ImageDescriber>,
    generator: Arc<dyn TextGenerator>,
}

impl Summarizer {
    pub fn new(describer: Arc<dyn ImageDescriber>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            describer,
            generator,
        }
    }

    pub fn describe(&self, path: &Path) -> Result<String> {
        self.describer.describe(path)
    }

    /// Per-image failures are logged and skipped. Only the final compression
    /// call can fail.
    pub fn summarize(&self, paths: &[String]) -> Result<String> {
        let mut descriptions: Vec<String> = Vec::with_capacity(paths.len());
        for path in paths {
            match self.describer.describe(Path::new(path)) {
                Ok(text) => {
                    let trimmed = text.trim();
                    if trimmed.is_empty() || trimmed == FAILED_IMAGE_LOAD {
                        debug!("no usable description for {path}");
                        continue;
                    }
                    descriptions.push(trimmed.to_string());
                }
                Err(err) => {
                    warn!(
                        "skipping {path} in summary: {}",
                        error_chain_text(&err, ERROR_MESSAGE_MAX_CHARS)
                    );
                }
            }
        }
        if descriptions.is_empty() {
            return Ok(NO_DESCRIPTION_AVAILABLE.to_string());
        }
        let prompt = summary_prompt(&descriptions);
        self.generator
            .generate(&[ChatMessage::user(prompt)])
            .context("summary generation failed")
    }
}

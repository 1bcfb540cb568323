use thiserror::Error;

/// Bound for error text stored in events and ingest reports.
pub const ERROR_MESSAGE_MAX_CHARS: usize = 300;

/// Collaborator call that failed during a turn or an ingestion step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalStage {
    Embedding,
    Index,
    Generation,
    Description,
    Summary,
}

impl ExternalStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Embedding => "embedding",
            Self::Index => "index",
            Self::Generation => "generation",
            Self::Description => "description",
            Self::Summary => "summary",
        }
    }
}

impl std::fmt::Display for ExternalStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    /// Neither text nor an image was supplied.
    #[error("{0}")]
    InvalidInput(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// An embedding, index, or generator call raised. `message` is the
    /// flattened cause chain.
    #[error("{stage} call failed: {message}")]
    ExternalCall {
        stage: ExternalStage,
        message: String,
    },
}

impl ChatError {
    pub fn no_input() -> Self {
        Self::InvalidInput(crate::prompts::NO_INPUT_ERROR.to_string())
    }

    pub fn external(stage: ExternalStage, err: &anyhow::Error) -> Self {
        Self::ExternalCall {
            stage,
            message: error_chain_text(err, ERROR_MESSAGE_MAX_CHARS),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::SessionNotFound(_) => "session_not_found",
            Self::ExternalCall { .. } => "external_call",
        }
    }
}

/// Flattens an error and its causes into one line, outermost first, the way
/// `{:#}` prints them. Repeated adjacent causes collapse.
pub fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string().trim().to_string();
        if text.is_empty() || parts.last() == Some(&text) {
            continue;
        }
        parts.push(text);
    }
    truncate_text(&parts.join(": "), max_chars)
}

/// Cuts `value` to `max_chars` characters and marks the cut with `...`.
pub fn truncate_text(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &value[..cut]),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{anyhow, Context};

    use super::{error_chain_text, truncate_text, ChatError, ExternalStage};

    #[test]
    fn chain_text_keeps_nested_contexts_in_order() {
        let err = Err::<(), _>(anyhow!("connection reset"))
            .context("gemini request failed")
            .context("generation step")
            .unwrap_err();
        assert_eq!(
            error_chain_text(&err, 512),
            "generation step: gemini request failed: connection reset"
        );
        let repeated = Err::<(), _>(anyhow!("timeout"))
            .context("timeout")
            .unwrap_err();
        assert_eq!(error_chain_text(&repeated, 3), "tim...");
    }

    #[test]
    fn external_error_names_stage_and_cause() {
        let err = anyhow!("index file is corrupt");
        let chat_err = ChatError::external(ExternalStage::Index, &err);
        assert_eq!(chat_err.kind(), "external_call");
        assert_eq!(chat_err.to_string(), "index call failed: index file is corrupt");
    }

    #[test]
    fn no_input_carries_user_facing_message() {
        assert_eq!(
            ChatError::no_input().to_string(),
            "Please provide either text input or an image."
        );
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("abc", 3), "abc");
        assert_eq!(truncate_text("żółw!", 4), "żółw...");
    }
}

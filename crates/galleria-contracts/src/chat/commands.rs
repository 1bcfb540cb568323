use super::command_registry::{
    CommandSpec, IMAGE_TEXT_COMMANDS, NO_ARG_COMMANDS, SINGLE_PATH_COMMANDS,
};

/// One line of REPL input, resolved into an action the CLI can dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplCommand {
    pub action: String,
    pub raw: String,
    pub text: Option<String>,
    pub path: Option<String>,
}

impl ReplCommand {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            text: None,
            path: None,
        }
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.action)
}

fn split_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn parse_command(text: &str) -> ReplCommand {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return ReplCommand::new("noop", text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return ReplCommand::new(action, text);
            }

            if let Some(action) = find_action(&command, IMAGE_TEXT_COMMANDS) {
                let mut parts = split_args(arg).into_iter();
                let mut parsed = ReplCommand::new(action, text);
                parsed.path = parts.next().and_then(non_empty);
                parsed.text = non_empty(parts.collect::<Vec<String>>().join(" "));
                return parsed;
            }

            if let Some(action) = find_action(&command, SINGLE_PATH_COMMANDS) {
                let mut parsed = ReplCommand::new(action, text);
                parsed.path = non_empty(split_args(arg).join(" "));
                return parsed;
            }

            let mut parsed = ReplCommand::new("unknown", text);
            parsed.text = Some(command);
            return parsed;
        }
    }

    let mut parsed = ReplCommand::new("chat", text);
    parsed.text = Some(raw_trimmed.to_string());
    parsed
}

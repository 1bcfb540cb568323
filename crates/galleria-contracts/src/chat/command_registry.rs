#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "new",
        action: "new_session",
    },
    CommandSpec {
        command: "reset",
        action: "new_session",
    },
    CommandSpec {
        command: "history",
        action: "history",
    },
    CommandSpec {
        command: "clear",
        action: "clear_history",
    },
    CommandSpec {
        command: "gallery",
        action: "gallery",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

/// Commands whose first argument is an image path and whose remainder is chat text.
pub(crate) const IMAGE_TEXT_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "image",
        action: "image_turn",
    },
    CommandSpec {
        command: "img",
        action: "image_turn",
    },
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "show",
        action: "show",
    },
    CommandSpec {
        command: "ingest",
        action: "ingest",
    },
];

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/image <path> [text]",
    "/show <path>",
    "/gallery",
    "/ingest [dir]",
    "/history",
    "/clear",
    "/new",
    "/help",
    "/quit",
];

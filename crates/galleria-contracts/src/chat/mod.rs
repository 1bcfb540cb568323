mod command_registry;
mod commands;
mod history;
mod intent;
mod response;

pub use command_registry::CHAT_HELP_COMMANDS;
pub use commands::{parse_command, ReplCommand};
pub use history::{ChatMessage, ConversationState, Role, Turn, DEFAULT_MAX_HISTORY};
pub use intent::{
    classify, is_description_request, is_image_related_query, ChatIntent, DESCRIBE_KEYWORDS,
    IMAGE_RELATED_KEYWORDS, THIS_IMAGE_PHRASES,
};
pub use response::{clean_display_text, extract_referenced_paths, RELEVANT_IMAGES_MARKER};

pub const DEFAULT_STORAGE_PREFIX: &str = "app/";
pub const DEFAULT_WEB_PREFIX: &str = "../";

/// Rewrites image paths between the form stored in the index and the form
/// served to clients. Only a leading prefix is swapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapper {
    storage_prefix: String,
    web_prefix: String,
}

impl Default for PathMapper {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_PREFIX, DEFAULT_WEB_PREFIX)
    }
}

impl PathMapper {
    pub fn new(storage_prefix: impl Into<String>, web_prefix: impl Into<String>) -> Self {
        Self {
            storage_prefix: storage_prefix.into(),
            web_prefix: web_prefix.into(),
        }
    }

    pub fn to_web(&self, storage_path: &str) -> String {
        swap_prefix(storage_path, &self.storage_prefix, &self.web_prefix)
    }

    pub fn to_storage(&self, web_path: &str) -> String {
        swap_prefix(web_path, &self.web_prefix, &self.storage_prefix)
    }

    pub fn all_to_web(&self, storage_paths: &[String]) -> Vec<String> {
        storage_paths.iter().map(|path| self.to_web(path)).collect()
    }
}

fn swap_prefix(path: &str, from: &str, to: &str) -> String {
    if from.is_empty() {
        return path.to_string();
    }
    match path.strip_prefix(from) {
        Some(rest) => format!("{to}{rest}"),
        None => path.to_string(),
    }
}

use indexmap::IndexMap;

pub const CAPABILITY_TEXT: &str = "text";
pub const CAPABILITY_VISION: &str = "vision";
pub const CAPABILITY_EMBEDDING: &str = "embedding";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub provider: String,
    pub capabilities: Vec<String>,
    pub context_window: Option<u64>,
    /// Output width for embedding models.
    pub dimensions: Option<usize>,
}

impl ModelSpec {
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|item| item == capability)
    }
}

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl ModelRegistry {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(default_models),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name)
    }

    pub fn list(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.values()
    }

    pub fn by_capability(&self, capability: &str) -> Vec<ModelSpec> {
        self.list()
            .filter(|model| model.supports(capability))
            .cloned()
            .collect()
    }

    /// The named model, if it exists and has `capability`.
    pub fn ensure(&self, name: &str, capability: &str) -> Option<ModelSpec> {
        self.get(name)
            .filter(|model| model.supports(capability))
            .cloned()
    }
}

struct BuiltinModel {
    name: &'static str,
    provider: &'static str,
    capabilities: &'static [&'static str],
    context_window: Option<u64>,
    dimensions: Option<usize>,
}

const TEXT_AND_VISION: &[&str] = &[CAPABILITY_TEXT, CAPABILITY_VISION];
const EMBEDDING_ONLY: &[&str] = &[CAPABILITY_EMBEDDING];

// First entry per capability is the default pick.
const BUILTIN_MODELS: &[BuiltinModel] = &[
    BuiltinModel {
        name: "gemini-2.0-flash",
        provider: "gemini",
        capabilities: TEXT_AND_VISION,
        context_window: Some(1_048_576),
        dimensions: None,
    },
    BuiltinModel {
        name: "gemini-1.5-flash",
        provider: "gemini",
        capabilities: TEXT_AND_VISION,
        context_window: Some(1_048_576),
        dimensions: None,
    },
    BuiltinModel {
        name: "gpt-4o-mini",
        provider: "openai",
        capabilities: TEXT_AND_VISION,
        context_window: Some(128_000),
        dimensions: None,
    },
    BuiltinModel {
        name: "dryrun-text-1",
        provider: "dryrun",
        capabilities: TEXT_AND_VISION,
        context_window: Some(8192),
        dimensions: None,
    },
    BuiltinModel {
        name: "clip-vit-base-patch32",
        provider: "clip",
        capabilities: EMBEDDING_ONLY,
        context_window: None,
        dimensions: Some(512),
    },
    BuiltinModel {
        name: "dryrun-embed-1",
        provider: "dryrun",
        capabilities: EMBEDDING_ONLY,
        context_window: None,
        dimensions: Some(64),
    },
];

impl From<&BuiltinModel> for ModelSpec {
    fn from(entry: &BuiltinModel) -> Self {
        Self {
            name: entry.name.to_string(),
            provider: entry.provider.to_string(),
            capabilities: entry.capabilities.iter().map(|c| c.to_string()).collect(),
            context_window: entry.context_window,
            dimensions: entry.dimensions,
        }
    }
}

fn default_models() -> IndexMap<String, ModelSpec> {
    BUILTIN_MODELS
        .iter()
        .map(|entry| (entry.name.to_string(), ModelSpec::from(entry)))
        .collect()
}

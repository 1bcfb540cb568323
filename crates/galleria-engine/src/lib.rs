//! Gallery chat engine: every collaborator that touches the network, the
//! filesystem, or a model sits behind a trait here.

mod embedding;
mod gallery;
mod http;
mod images;
mod index;
mod ingest;
mod orchestrator;
mod providers;
mod runtime;
mod sessions;
mod summarizer;

pub use embedding::{
    build_embedding_model, fuse, l2_normalize, EmbeddingFuser, EmbeddingModel,
    HashEmbeddingModel, HttpEmbeddingModel,
};
pub use gallery::GalleryIndexClient;
pub use http::HttpTransport;
pub use images::{is_supported_image, prepare_vision_image, SUPPORTED_IMAGE_EXTENSIONS};
pub use index::{rank_records, IndexMatch, IndexRecord, LocalVectorIndex, VectorIndex};
pub use ingest::{
    image_id, import_files, list_images, ImageMetadata, IngestOutcome, IngestReport, Ingestor,
};
pub use orchestrator::{ChatSettings, GalleryChat};
pub use providers::{
    build_text_generator, extract_json_object_from_text, DryrunTextGenerator,
    GeminiTextGenerator, OpenAiTextGenerator, TextGenerator, TextGeneratorRegistry,
};
pub use runtime::GalleryRuntime;
pub use sessions::{lock_session, InMemorySessionStore, SessionHandle, SessionStore};
pub use summarizer::{GeneratorImageDescriber, ImageDescriber, Summarizer};

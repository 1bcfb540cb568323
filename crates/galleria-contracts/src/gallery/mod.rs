mod paths;
mod types;

pub use paths::{PathMapper, DEFAULT_STORAGE_PREFIX, DEFAULT_WEB_PREFIX};
pub use types::{
    join_metadata_field, split_metadata_field, ChatResult, GalleryItem, QueryVector,
    RetrievalResult, METADATA_SEPARATOR,
};

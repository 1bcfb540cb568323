use std::sync::Arc;

use anyhow::{Context, Result};
use galleria_contracts::gallery::{GalleryItem, PathMapper, RetrievalResult};
use log::debug;

use crate::index::VectorIndex;

/// Read side of the gallery index, bound to one collection.
#[derive(Clone)]
pub struct GalleryIndexClient {
    index: Arc<dyn VectorIndex>,
    collection: String,
    paths: PathMapper,
}

impl GalleryIndexClient {
    pub fn new(index: Arc<dyn VectorIndex>, collection: &str, paths: PathMapper) -> Self {
        Self {
            index,
            collection: collection.to_string(),
            paths,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn path_mapper(&self) -> &PathMapper {
        &self.paths
    }

    /// Top-k neighbours in storage-path form. An empty or absent collection
    /// gives an empty result.
    pub fn retrieve(&self, query: &[f32], top_k: usize) -> Result<RetrievalResult> {
        let hits = self
            .index
            .query(&self.collection, query, top_k)
            .with_context(|| format!("query against collection '{}' failed", self.collection))?;
        let mut result = RetrievalResult::default();
        for hit in hits.into_iter().take(top_k) {
            debug!("retrieved '{}' at distance {:.4}", hit.id, hit.distance);
            result.push(hit.document, hit.metadata);
        }
        Ok(result)
    }

    /// Every stored item, newest first, with web-form paths.
    pub fn items(&self) -> Result<Vec<GalleryItem>> {
        let records = self
            .index
            .records(&self.collection)
            .with_context(|| format!("listing collection '{}' failed", self.collection))?;
        Ok(records
            .iter()
            .rev()
            .map(|record| {
                let mut item =
                    GalleryItem::from_metadata(&record.id, &record.document, &record.metadata);
                item.path = self.paths.to_web(&item.path);
                item
            })
            .collect())
    }

    /// Looks an item up by its web-form path.
    pub fn item_by_path(&self, web_path: &str) -> Result<Option<GalleryItem>> {
        let wanted = web_path.trim();
        Ok(self.items()?.into_iter().find(|item| item.path == wanted))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use galleria_contracts::gallery::PathMapper;
    use serde_json::json;

    use super::GalleryIndexClient;
    use crate::index::{IndexRecord, LocalVectorIndex, VectorIndex};

    fn seeded(temp: &tempfile::TempDir) -> anyhow::Result<Arc<LocalVectorIndex>> {
        let index = Arc::new(LocalVectorIndex::new(temp.path().join("index.json")));
        for (id, embedding, tags) in [
            ("giraffe", vec![1.0f32, 0.0], "giraffe, savanna"),
            ("boat", vec![0.0f32, 1.0], "boat"),
        ] {
            index.add(
                "photos",
                IndexRecord {
                    id: id.to_string(),
                    document: format!("A {id}."),
                    metadata: json!({
                        "image_path": format!("app/static/image_data/{id}.jpg"),
                        "tags": tags,
                        "color_palette": "blue",
                    })
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
                    embedding,
                },
            )?;
        }
        Ok(index)
    }

    #[test]
    fn retrieve_returns_parallel_ranked_sequences() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let client = GalleryIndexClient::new(seeded(&temp)?, "photos", PathMapper::default());

        let result = client.retrieve(&[0.9, 0.1], 5)?;
        assert_eq!(result.documents, vec!["A giraffe.", "A boat."]);
        assert_eq!(result.metadatas.len(), 2);
        assert_eq!(
            result.paths,
            vec![
                "app/static/image_data/giraffe.jpg",
                "app/static/image_data/boat.jpg"
            ]
        );
        assert_eq!(client.retrieve(&[0.9, 0.1], 1)?.len(), 1);
        Ok(())
    }

    #[test]
    fn absent_collection_is_empty_not_an_error() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let client = GalleryIndexClient::new(seeded(&temp)?, "missing", PathMapper::default());
        assert!(client.retrieve(&[1.0, 0.0], 5)?.is_empty());
        assert!(client.items()?.is_empty());
        Ok(())
    }

    #[test]
    fn items_are_newest_first_with_web_paths() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let client = GalleryIndexClient::new(seeded(&temp)?, "photos", PathMapper::default());

        let items = client.items()?;
        let paths: Vec<&str> = items.iter().map(|item| item.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "../static/image_data/boat.jpg",
                "../static/image_data/giraffe.jpg"
            ]
        );

        let giraffe = client.item_by_path("../static/image_data/giraffe.jpg")?;
        assert_eq!(
            giraffe.map(|item| item.tags),
            Some(vec!["giraffe".to_string(), "savanna".to_string()])
        );
        assert!(client.item_by_path("app/static/image_data/giraffe.jpg")?.is_none());
        Ok(())
    }
}

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One stored gallery entry. `metadata` holds `image_path` plus the
/// `", "`-joined multi-valued fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub document: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexMatch {
    pub id: String,
    pub document: String,
    pub metadata: Map<String, Value>,
    pub distance: f32,
}

/// Nearest-neighbour store with named collections.
pub trait VectorIndex: Send + Sync {
    /// Up to `top_k` records closest to `vector`, nearest first. A missing
    /// collection yields no matches.
    fn query(&self, collection: &str, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>>;
    fn contains(&self, collection: &str, id: &str) -> Result<bool>;
    /// Stores `record` unless its id exists. Returns whether it was stored.
    fn add(&self, collection: &str, record: IndexRecord) -> Result<bool>;
    /// Every record in insertion order.
    fn records(&self, collection: &str) -> Result<Vec<IndexRecord>>;
}

pub fn squared_l2(left: &[f32], right: &[f32]) -> f32 {
    left.iter()
        .zip(right)
        .map(|(a, b)| (a - b) * (a - b))
        .sum()
}

/// Ranks `records` against `vector`. Records of a different width are
/// skipped; equal distances keep insertion order.
pub fn rank_records(records: &[IndexRecord], vector: &[f32], top_k: usize) -> Vec<IndexMatch> {
    let mut scored: Vec<(f32, &IndexRecord)> = records
        .iter()
        .filter(|record| record.embedding.len() == vector.len())
        .map(|record| (squared_l2(&record.embedding, vector), record))
        .collect();
    scored.sort_by(|left, right| left.0.total_cmp(&right.0));
    scored
        .into_iter()
        .take(top_k)
        .map(|(distance, record)| IndexMatch {
            id: record.id.clone(),
            document: record.document.clone(),
            metadata: record.metadata.clone(),
            distance,
        })
        .collect()
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexFile {
    #[serde(default)]
    collections: BTreeMap<String, Vec<IndexRecord>>,
}

/// JSON-file index. Reads always refresh from disk. Writes hold an exclusive
/// lock on `<index>.lock` while they re-read, merge and replace the file, so
/// handles in other threads or processes never drop each other's records.
#[derive(Debug)]
pub struct LocalVectorIndex {
    path: PathBuf,
}

impl LocalVectorIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<IndexFile> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(IndexFile::default()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed reading index {}", self.path.display()))
            }
        };
        if raw.trim().is_empty() {
            return Ok(IndexFile::default());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid index JSON in {}", self.path.display()))
    }

    fn collection(&self, collection: &str) -> Result<Vec<IndexRecord>> {
        let mut file = self.load()?;
        Ok(file.collections.remove(collection).unwrap_or_default())
    }

    fn lock_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| OsString::from("index.json"));
        name.push(".lock");
        self.path.with_file_name(name)
    }

    /// Blocks until this process owns the write lock. Dropping the handle
    /// releases it.
    fn lock_for_write(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let lock_path = self.lock_path();
        let lock = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("failed to open {}", lock_path.display()))?;
        lock.lock_exclusive()
            .with_context(|| format!("failed to lock {}", lock_path.display()))?;
        Ok(lock)
    }
}

/// Writes `bytes` next to `target` and renames over it. The temp file is
/// removed if either step fails.
fn replace_atomically(target: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = target
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("index.json");
    let tmp_path =
        target.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4().simple()));
    if let Err(err) = fs::write(&tmp_path, bytes) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err).with_context(|| format!("failed writing {}", tmp_path.display()));
    }
    if let Err(err) = fs::rename(&tmp_path, target) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err).with_context(|| {
            format!(
                "failed replacing {} with {}",
                target.display(),
                tmp_path.display()
            )
        });
    }
    Ok(())
}

impl VectorIndex for LocalVectorIndex {
    fn query(&self, collection: &str, vector: &[f32], top_k: usize) -> Result<Vec<IndexMatch>> {
        let records = self.collection(collection)?;
        Ok(rank_records(&records, vector, top_k))
    }

    fn contains(&self, collection: &str, id: &str) -> Result<bool> {
        Ok(self
            .collection(collection)?
            .iter()
            .any(|record| record.id == id))
    }

    fn add(&self, collection: &str, record: IndexRecord) -> Result<bool> {
        let _lock = self.lock_for_write()?;
        let mut file = self.load()?;
        let rows = file.collections.entry(collection.to_string()).or_default();
        if rows.iter().any(|existing| existing.id == record.id) {
            return Ok(false);
        }
        rows.push(record);
        replace_atomically(&self.path, &serde_json::to_vec_pretty(&file)?)?;
        Ok(true)
    }

    fn records(&self, collection: &str) -> Result<Vec<IndexRecord>> {
        self.collection(collection)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::{json, Map, Value};

    use std::thread;

    use super::{rank_records, replace_atomically, IndexRecord, LocalVectorIndex, VectorIndex};

    fn record(id: &str, embedding: Vec<f32>) -> IndexRecord {
        let metadata: Map<String, Value> = json!({"image_path": format!("app/{id}.jpg")})
            .as_object()
            .cloned()
            .unwrap_or_default();
        IndexRecord {
            id: id.to_string(),
            document: format!("doc {id}"),
            metadata,
            embedding,
        }
    }

    #[test]
    fn ranking_is_ascending_distance_with_stable_ties() {
        let records = vec![
            record("far", vec![0.0, 1.0]),
            record("tie_a", vec![1.0, 0.5]),
            record("exact", vec![1.0, 0.0]),
            record("tie_b", vec![1.0, -0.5]),
            record("wrong_width", vec![1.0, 0.0, 0.0]),
        ];
        let ids: Vec<String> = rank_records(&records, &[1.0, 0.0], 10)
            .into_iter()
            .map(|hit| hit.id)
            .collect();
        assert_eq!(ids, vec!["exact", "tie_a", "tie_b", "far"]);
        assert_eq!(rank_records(&records, &[1.0, 0.0], 2).len(), 2);
        assert!(rank_records(&records, &[1.0, 0.0], 0).is_empty());
    }

    #[test]
    fn missing_file_and_collection_read_as_empty() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let index = LocalVectorIndex::new(temp.path().join("nested/index.json"));
        assert!(index.query("photos", &[1.0], 5)?.is_empty());
        assert!(!index.contains("photos", "a")?);

        index.add("photos", record("a", vec![1.0]))?;
        assert!(index.query("other", &[1.0], 5)?.is_empty());
        Ok(())
    }

    #[test]
    fn add_skips_existing_ids() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let index = LocalVectorIndex::new(temp.path().join("index.json"));
        assert!(index.add("photos", record("a", vec![1.0]))?);
        assert!(!index.add("photos", record("a", vec![2.0]))?);
        let rows = index.records("photos")?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].embedding, vec![1.0]);
        Ok(())
    }

    #[test]
    fn writers_on_separate_handles_merge() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("index.json");
        let index_a = LocalVectorIndex::new(&path);
        let index_b = LocalVectorIndex::new(&path);

        index_a.add("photos", record("a", vec![1.0]))?;
        index_b.add("photos", record("b", vec![2.0]))?;
        index_a.add("sketches", record("c", vec![3.0]))?;

        let reloaded = LocalVectorIndex::new(&path);
        let ids: Vec<String> = reloaded
            .records("photos")?
            .into_iter()
            .map(|row| row.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(reloaded.contains("sketches", "c")?);

        let leftovers = fs::read_dir(temp.path())?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
        Ok(())
    }

    #[test]
    fn concurrent_writers_on_separate_handles_keep_every_record() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("index.json");

        thread::scope(|scope| -> anyhow::Result<()> {
            let writers: Vec<_> = ["left", "right"]
                .into_iter()
                .map(|writer| {
                    let path = &path;
                    scope.spawn(move || -> anyhow::Result<()> {
                        let index = LocalVectorIndex::new(path);
                        for n in 0..40 {
                            index.add("photos", record(&format!("{writer}_{n}"), vec![n as f32]))?;
                        }
                        Ok(())
                    })
                })
                .collect();
            for writer in writers {
                writer
                    .join()
                    .map_err(|_| anyhow::anyhow!("index writer panicked"))??;
            }
            Ok(())
        })?;

        let rows = LocalVectorIndex::new(&path).records("photos")?;
        assert_eq!(rows.len(), 80);
        for writer in ["left", "right"] {
            let ids: Vec<&str> = rows
                .iter()
                .map(|row| row.id.as_str())
                .filter(|id| id.starts_with(writer))
                .collect();
            let expected: Vec<String> = (0..40).map(|n| format!("{writer}_{n}")).collect();
            assert_eq!(ids, expected);
        }
        Ok(())
    }

    #[test]
    fn failed_replace_removes_the_temp_file() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let target = temp.path().join("index.json");
        fs::create_dir_all(target.join("occupied"))?;

        assert!(replace_atomically(&target, b"{}").is_err());
        let leftovers = fs::read_dir(temp.path())?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
        Ok(())
    }

    #[test]
    fn corrupt_file_is_an_error() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("index.json");
        fs::write(&path, "{broken")?;
        let index = LocalVectorIndex::new(&path);
        assert!(index.query("photos", &[1.0], 5).is_err());
        assert!(index.add("photos", record("a", vec![1.0])).is_err());
        Ok(())
    }
}

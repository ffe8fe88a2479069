use crate::error::{IngestError, QueryError};
use crate::models::Chunk;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Embedding configuration an index was built with. Persisted inside the
/// index file and checked on load, so querying with a different embedding
/// model fails loudly instead of returning garbage similarities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbeddingSignature {
    pub model: String,
    pub dimensions: usize,
}

impl std::fmt::Display for EmbeddingSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}d)", self.model, self.dimensions)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub vector: Vec<f32>,
    pub chunk: Chunk,
}

#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// In-memory nearest-neighbour index over (vector, chunk) pairs.
/// Linear-scan cosine similarity; entries are only ever added, a
/// reprocess replaces the whole index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    signature: EmbeddingSignature,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    pub fn build(
        signature: EmbeddingSignature,
        entries: Vec<IndexEntry>,
    ) -> Result<Self, IngestError> {
        if entries.is_empty() {
            return Err(IngestError::InvalidArgument(
                "cannot build an index from zero entries".to_string(),
            ));
        }

        let index = Self { signature, entries };
        index.check_dimensions()?;
        Ok(index)
    }

    pub fn extend(&mut self, entries: Vec<IndexEntry>) -> Result<(), IngestError> {
        for entry in &entries {
            if entry.vector.len() != self.signature.dimensions {
                return Err(IngestError::InvalidArgument(format!(
                    "entry vector has {} dimensions, index expects {}",
                    entry.vector.len(),
                    self.signature.dimensions
                )));
            }
        }
        self.entries.extend(entries);
        Ok(())
    }

    pub fn signature(&self) -> &EmbeddingSignature {
        &self.signature
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top-k entries by cosine similarity to `query_vector`, best first.
    pub fn search(&self, query_vector: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(query_vector, &entry.vector),
            })
            .collect();

        scored.sort_by(|left, right| {
            right
                .score
                .partial_cmp(&left.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        scored
    }

    /// Serializes the full index. Written to a sibling temp file first and
    /// renamed into place, so a crash mid-write never leaves a torn index.
    pub fn persist(&self, path: &Path) -> Result<(), IngestError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let payload = serde_json::to_vec(self)?;
        let staging = staging_path(path);
        fs::write(&staging, payload)?;
        fs::rename(&staging, path)?;

        info!(path = %path.display(), entries = self.entries.len(), "index persisted");
        Ok(())
    }

    /// Loads a persisted index and validates its embedding signature
    /// against the one currently configured.
    pub fn load(path: &Path, expected: &EmbeddingSignature) -> Result<Self, QueryError> {
        if !path.exists() {
            return Err(QueryError::IndexNotFound {
                path: path.display().to_string(),
            });
        }

        let payload = fs::read(path).map_err(QueryError::Io)?;
        let index: VectorIndex = serde_json::from_slice(&payload)?;

        if &index.signature != expected {
            return Err(QueryError::EmbeddingMismatch {
                stored: index.signature.to_string(),
                configured: expected.to_string(),
            });
        }

        Ok(index)
    }

    fn check_dimensions(&self) -> Result<(), IngestError> {
        for entry in &self.entries {
            if entry.vector.len() != self.signature.dimensions {
                return Err(IngestError::InvalidArgument(format!(
                    "entry vector has {} dimensions, index expects {}",
                    entry.vector.len(),
                    self.signature.dimensions
                )));
            }
        }
        Ok(())
    }
}

/// Staging sibling for atomic writes. The suffix is appended to the full
/// file name, so `a.json` and `a.idx` in one directory never share a
/// staging file.
fn staging_path(path: &Path) -> std::path::PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    if left.len() != right.len() || left.is_empty() {
        return 0.0;
    }

    let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    let left_norm: f32 = left.iter().map(|v| v * v).sum::<f32>().sqrt();
    let right_norm: f32 = right.iter().map(|v| v * v).sum::<f32>().sqrt();

    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }

    dot / (left_norm * right_norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn chunk(id: &str, text: &str) -> Chunk {
        Chunk {
            chunk_id: id.to_string(),
            document_id: "doc-1".to_string(),
            source_document: "test.pdf".to_string(),
            page_number: Some(1),
            chunk_index: 0,
            text: text.to_string(),
        }
    }

    fn signature() -> EmbeddingSignature {
        EmbeddingSignature {
            model: "hashing-trigram-3".to_string(),
            dimensions: 3,
        }
    }

    fn entry(id: &str, text: &str, vector: Vec<f32>) -> IndexEntry {
        IndexEntry {
            vector,
            chunk: chunk(id, text),
        }
    }

    #[test]
    fn build_rejects_empty_entries() {
        let result = VectorIndex::build(signature(), Vec::new());
        assert!(result.is_err());
    }

    #[test]
    fn build_rejects_dimension_mismatch() {
        let result = VectorIndex::build(signature(), vec![entry("a", "a", vec![1.0, 0.0])]);
        assert!(result.is_err());
    }

    #[test]
    fn nearest_chunk_wins_at_k_one() {
        let index = VectorIndex::build(
            signature(),
            vec![
                entry("a", "chunk a", vec![1.0, 0.0, 0.0]),
                entry("b", "chunk b", vec![0.0, 1.0, 0.0]),
                entry("c", "chunk c", vec![0.0, 0.0, 1.0]),
            ],
        )
        .unwrap();

        let hits = index.search(&[0.9, 0.1, 0.0], 1);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.chunk_id, "a");
    }

    #[test]
    fn search_orders_descending_and_truncates() {
        let index = VectorIndex::build(
            signature(),
            vec![
                entry("a", "chunk a", vec![1.0, 0.0, 0.0]),
                entry("b", "chunk b", vec![0.7, 0.7, 0.0]),
                entry("c", "chunk c", vec![0.0, 0.0, 1.0]),
            ],
        )
        .unwrap();

        let hits = index.search(&[1.0, 0.2, 0.0], 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.chunk_id, "a");
        assert_eq!(hits[1].chunk.chunk_id, "b");
        assert!(hits[0].score >= hits[1].score);
    }

    #[test]
    fn extend_checks_dimensions() {
        let mut index = VectorIndex::build(
            signature(),
            vec![entry("a", "chunk a", vec![1.0, 0.0, 0.0])],
        )
        .unwrap();

        assert!(index.extend(vec![entry("b", "chunk b", vec![1.0])]).is_err());
        assert!(index
            .extend(vec![entry("b", "chunk b", vec![0.0, 1.0, 0.0])])
            .is_ok());
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn persist_and_load_round_trip_preserves_search_results() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.json");

        let index = VectorIndex::build(
            signature(),
            vec![
                entry("a", "apple pie recipe", vec![1.0, 0.0, 0.0]),
                entry("b", "rocket engine design", vec![0.0, 1.0, 0.0]),
            ],
        )
        .unwrap();

        let query = [0.9, 0.1, 0.0];
        let before = index.search(&query, 1);
        index.persist(&path).unwrap();

        let reloaded = VectorIndex::load(&path, &signature()).unwrap();
        let after = reloaded.search(&query, 1);

        assert_eq!(before[0].chunk.chunk_id, after[0].chunk.chunk_id);
        assert_eq!(before[0].score, after[0].score);
        assert!(!dir.path().join("index.json.tmp").exists());
    }

    #[test]
    fn sibling_indices_do_not_share_a_staging_file() {
        let dir = tempdir().unwrap();
        let json_path = dir.path().join("index.json");
        let idx_path = dir.path().join("index.idx");

        let first = VectorIndex::build(
            signature(),
            vec![entry("a", "apple pie recipe", vec![1.0, 0.0, 0.0])],
        )
        .unwrap();
        let second = VectorIndex::build(
            signature(),
            vec![entry("b", "rocket engine design", vec![0.0, 1.0, 0.0])],
        )
        .unwrap();

        first.persist(&json_path).unwrap();
        second.persist(&idx_path).unwrap();

        let from_json = VectorIndex::load(&json_path, &signature()).unwrap();
        let from_idx = VectorIndex::load(&idx_path, &signature()).unwrap();
        assert_eq!(from_json.search(&[1.0, 0.0, 0.0], 1)[0].chunk.chunk_id, "a");
        assert_eq!(from_idx.search(&[0.0, 1.0, 0.0], 1)[0].chunk.chunk_id, "b");
        assert!(!dir.path().join("index.tmp").exists());
        assert!(!dir.path().join("index.json.tmp").exists());
        assert!(!dir.path().join("index.idx.tmp").exists());
    }

    #[test]
    fn load_with_mismatched_signature_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.json");

        let index = VectorIndex::build(
            signature(),
            vec![entry("a", "apple pie recipe", vec![1.0, 0.0, 0.0])],
        )
        .unwrap();
        index.persist(&path).unwrap();

        let other = EmbeddingSignature {
            model: "models/embedding-001".to_string(),
            dimensions: 768,
        };
        let result = VectorIndex::load(&path, &other);
        assert!(matches!(result, Err(QueryError::EmbeddingMismatch { .. })));
    }

    #[test]
    fn missing_index_is_a_distinct_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nothing.json");
        let result = VectorIndex::load(&path, &signature());
        assert!(matches!(result, Err(QueryError::IndexNotFound { .. })));
    }
}

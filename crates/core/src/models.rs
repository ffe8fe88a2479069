use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of one ingested PDF, computed before extraction so that
/// chunk provenance survives index persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    pub document_id: String,
    pub document_title: String,
    pub source_path: String,
    pub checksum: String,
    pub ingested_at: DateTime<Utc>,
}

/// A bounded substring of a source document. Immutable once created;
/// order within a document is preserved but retrieval is similarity-ranked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub chunk_id: String,
    pub document_id: String,
    pub source_document: String,
    pub page_number: Option<u32>,
    pub chunk_index: u64,
    pub text: String,
}

/// Citation payload surfaced alongside a generated answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceRef {
    pub document: String,
    pub page: Option<u32>,
    pub excerpt: String,
}

impl SourceRef {
    pub fn from_chunk(chunk: &Chunk, excerpt_chars: usize) -> Self {
        let excerpt = chunk.text.chars().take(excerpt_chars).collect::<String>();
        Self {
            document: chunk.source_document.clone(),
            page: chunk.page_number,
            excerpt,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SourceRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_ref_truncates_excerpt_on_char_boundary() {
        let chunk = Chunk {
            chunk_id: "c1".to_string(),
            document_id: "d1".to_string(),
            source_document: "manual.pdf".to_string(),
            page_number: Some(4),
            chunk_index: 0,
            text: "héllo wörld, this text is longer than the excerpt".to_string(),
        };

        let source = SourceRef::from_chunk(&chunk, 11);
        assert_eq!(source.excerpt, "héllo wörld");
        assert_eq!(source.page, Some(4));
        assert_eq!(source.document, "manual.pdf");
    }
}

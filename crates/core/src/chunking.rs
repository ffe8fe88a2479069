use crate::error::IngestError;
use crate::extractor::PageText;
use crate::models::{Chunk, DocumentFingerprint};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters shared between a chunk's tail and the next chunk's head.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1_000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "chunk_overlap {} must be smaller than chunk_size {}",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Break preference for a cut inside a full window, best first.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Splits `text` into overlapping pieces of at most `chunk_size` characters.
///
/// Each window is cut at the latest paragraph break in its second half,
/// falling back to a line break, then a space, then a hard character cut.
/// Every piece after the first repeats the previous piece's last
/// `chunk_overlap` characters, so a sentence severed by a cut stays
/// readable in the follow-up chunk.
pub fn split_text(text: &str, config: ChunkingConfig) -> Result<Vec<String>, IngestError> {
    config.validate()?;

    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Ok(Vec::new());
    }
    if chars.len() <= config.chunk_size {
        return Ok(vec![text.to_string()]);
    }

    let mut pieces = Vec::new();
    let mut start = 0usize;

    while start < chars.len() {
        let window_end = (start + config.chunk_size).min(chars.len());
        let cut = if window_end == chars.len() {
            window_end
        } else {
            natural_cut(&chars, start, window_end).unwrap_or(window_end)
        };

        pieces.push(chars[start..cut].iter().collect());

        if cut == chars.len() {
            break;
        }

        let next = cut.saturating_sub(config.chunk_overlap);
        // Overlap must never stall the walk.
        start = if next > start { next } else { cut };
    }

    Ok(pieces)
}

/// Latest natural break inside `[start, window_end)`, restricted to the
/// window's second half so chunks stay reasonably full. Returns the index
/// just past the separator, keeping the separator on the earlier chunk.
fn natural_cut(chars: &[char], start: usize, window_end: usize) -> Option<usize> {
    let floor = start + (window_end - start) / 2;

    for separator in SEPARATORS {
        let sep: Vec<char> = separator.chars().collect();
        let mut found = None;
        let mut index = floor;
        while index + sep.len() <= window_end {
            if chars[index..index + sep.len()] == sep[..] {
                found = Some(index + sep.len());
            }
            index += 1;
        }
        if found.is_some() {
            return found;
        }
    }

    None
}

/// Page-aware chunking: each page is split independently and its number is
/// stamped on every derived chunk, so no chunk ever spans two pages.
pub fn chunk_pages(
    document: &DocumentFingerprint,
    pages: &[PageText],
    config: ChunkingConfig,
    start_index: u64,
) -> Result<(Vec<Chunk>, u64), IngestError> {
    let mut chunks = Vec::new();
    let mut cursor = start_index;

    for page in pages {
        for piece in split_text(&page.text, config)? {
            if piece.trim().is_empty() {
                continue;
            }
            chunks.push(make_chunk(
                document,
                Some(page.number),
                cursor,
                piece,
            ));
            cursor = cursor.saturating_add(1);
        }
    }

    Ok((chunks, cursor))
}

fn make_chunk(
    document: &DocumentFingerprint,
    page_number: Option<u32>,
    index: u64,
    text: String,
) -> Chunk {
    Chunk {
        chunk_id: make_chunk_id(&document.document_id, page_number, index, &text),
        document_id: document.document_id.clone(),
        source_document: document.document_title.clone(),
        page_number,
        chunk_index: index,
        text,
    }
}

fn make_chunk_id(document_id: &str, page: Option<u32>, index: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update(page.unwrap_or(0).to_le_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::PageText;
    use chrono::Utc;

    fn fingerprint() -> DocumentFingerprint {
        DocumentFingerprint {
            document_id: "doc-1".to_string(),
            document_title: "test.pdf".to_string(),
            source_path: "/tmp/test.pdf".to_string(),
            checksum: "checksum".to_string(),
            ingested_at: Utc::now(),
        }
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let config = ChunkingConfig::default();
        let pieces = split_text("short text", config).unwrap();
        assert_eq!(pieces, vec!["short text".to_string()]);
    }

    #[test]
    fn invalid_overlap_is_rejected() {
        let config = ChunkingConfig {
            chunk_size: 100,
            chunk_overlap: 100,
        };
        assert!(split_text("anything", config).is_err());

        let config = ChunkingConfig {
            chunk_size: 0,
            chunk_overlap: 0,
        };
        assert!(split_text("anything", config).is_err());
    }

    #[test]
    fn chunks_respect_maximum_size() {
        let config = ChunkingConfig {
            chunk_size: 50,
            chunk_overlap: 10,
        };
        let text = "word ".repeat(100);
        let pieces = split_text(&text, config).unwrap();

        assert!(pieces.len() > 1);
        for piece in &pieces {
            assert!(piece.chars().count() <= 50);
        }
    }

    #[test]
    fn consecutive_chunks_share_the_configured_overlap() {
        let config = ChunkingConfig {
            chunk_size: 40,
            chunk_overlap: 8,
        };
        let text = "abcdefghij ".repeat(30);
        let pieces = split_text(&text, config).unwrap();
        assert!(pieces.len() > 2);

        for pair in pieces.windows(2) {
            let tail: String = {
                let chars: Vec<char> = pair[0].chars().collect();
                chars[chars.len() - 8..].iter().collect()
            };
            let head: String = pair[1].chars().take(8).collect();
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn overlap_removed_concatenation_reconstructs_input() {
        let config = ChunkingConfig {
            chunk_size: 64,
            chunk_overlap: 16,
        };
        let text = "The rain in Spain falls mainly on the plain.\n\n".repeat(20);
        let pieces = split_text(&text, config).unwrap();

        let mut rebuilt = String::new();
        for (position, piece) in pieces.iter().enumerate() {
            if position == 0 {
                rebuilt.push_str(piece);
            } else {
                let skipped: String = piece.chars().skip(16).collect();
                rebuilt.push_str(&skipped);
            }
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn paragraph_breaks_are_preferred_over_hard_cuts() {
        let config = ChunkingConfig {
            chunk_size: 100,
            chunk_overlap: 0,
        };
        let text = format!("{}\n\n{}", "a".repeat(70), "b".repeat(70));
        let pieces = split_text(&text, config).unwrap();

        assert_eq!(pieces.len(), 2);
        assert!(pieces[0].ends_with("\n\n"));
        assert!(pieces[1].chars().all(|c| c == 'b'));
    }

    #[test]
    fn page_chunks_never_span_pages_and_stay_ordered() {
        let config = ChunkingConfig {
            chunk_size: 30,
            chunk_overlap: 5,
        };
        let pages = vec![
            PageText {
                number: 1,
                text: "first page sentence one. first page sentence two.".to_string(),
            },
            PageText {
                number: 2,
                text: "second page sentence one. second page sentence two.".to_string(),
            },
        ];

        let (chunks, next) = chunk_pages(&fingerprint(), &pages, config, 0).unwrap();
        assert!(next >= chunks.len() as u64);
        assert!(chunks.len() >= 2);

        let mut last_page = 0;
        for chunk in &chunks {
            let page = chunk.page_number.expect("page-aware chunk");
            assert!(page >= last_page, "pages must be non-decreasing");
            last_page = page;

            let from_first = chunk.text.contains("first");
            let from_second = chunk.text.contains("second");
            assert!(!(from_first && from_second), "chunk spans a page boundary");
        }
    }

    #[test]
    fn chunk_ids_are_stable_for_identical_input() {
        let config = ChunkingConfig::default();
        let pages = vec![PageText {
            number: 1,
            text: "deterministic identity".to_string(),
        }];

        let (first, _) = chunk_pages(&fingerprint(), &pages, config, 0).unwrap();
        let (second, _) = chunk_pages(&fingerprint(), &pages, config, 0).unwrap();
        assert_eq!(first[0].chunk_id, second[0].chunk_id);
    }
}

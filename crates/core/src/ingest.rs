use crate::chunking::{chunk_pages, ChunkingConfig};
use crate::error::IngestError;
use crate::extractor::{LopdfExtractor, PageText, PdfExtractor};
use crate::models::{Chunk, DocumentFingerprint};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn digest_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

pub struct SkippedPdf {
    pub path: PathBuf,
    pub reason: String,
}

pub struct ExtractedDocument {
    pub fingerprint: DocumentFingerprint,
    pub pages: Vec<PageText>,
}

pub struct ExtractionReport {
    pub documents: Vec<ExtractedDocument>,
    pub skipped: Vec<SkippedPdf>,
}

/// Extracts every file best-effort: a corrupt or text-free PDF is recorded
/// as skipped and the rest of the batch continues. A batch where nothing
/// at all was extractable is an `EmptyCorpus` error, never an empty index.
pub fn extract_corpus(paths: &[PathBuf]) -> Result<ExtractionReport, IngestError> {
    extract_corpus_with(&LopdfExtractor, paths)
}

pub fn extract_corpus_with(
    extractor: &dyn PdfExtractor,
    paths: &[PathBuf],
) -> Result<ExtractionReport, IngestError> {
    if paths.is_empty() {
        return Err(IngestError::InvalidArgument(
            "no pdf files to ingest".to_string(),
        ));
    }

    let mut documents = Vec::new();
    let mut skipped = Vec::new();

    for path in paths {
        let extracted = (|| {
            let fingerprint = build_document_fingerprint(path)?;
            let pages = extractor.extract_pages(path)?;
            Ok::<_, IngestError>(ExtractedDocument { fingerprint, pages })
        })();

        match extracted {
            Ok(document) => documents.push(document),
            Err(error) => {
                warn!(path = %path.display(), error = %error, "skipping pdf");
                skipped.push(SkippedPdf {
                    path: path.clone(),
                    reason: error.to_string(),
                });
            }
        }
    }

    if documents.is_empty() {
        return Err(IngestError::EmptyCorpus);
    }

    Ok(ExtractionReport { documents, skipped })
}

/// Chunks an extracted corpus, preserving file order and page order.
pub fn chunk_corpus(
    report: &ExtractionReport,
    config: ChunkingConfig,
) -> Result<Vec<Chunk>, IngestError> {
    let mut chunks = Vec::new();
    let mut cursor = 0u64;

    for document in &report.documents {
        let (document_chunks, next) =
            chunk_pages(&document.fingerprint, &document.pages, config, cursor)?;
        cursor = next;
        chunks.extend(document_chunks);
    }

    if chunks.is_empty() {
        return Err(IngestError::EmptyCorpus);
    }

    Ok(chunks)
}

fn build_document_fingerprint(path: &Path) -> Result<DocumentFingerprint, IngestError> {
    let checksum = digest_file(path)?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            IngestError::MissingFileName(format!("path missing filename: {}", path.display()))
        })?;

    Ok(DocumentFingerprint {
        document_id: generate_document_id(path),
        document_title: name.to_string(),
        source_path: path.to_string_lossy().to_string(),
        checksum,
        ingested_at: Utc::now(),
    })
}

fn generate_document_id(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}

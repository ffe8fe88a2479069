pub mod batcher;
pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod index;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod retry;
pub mod session;

pub use batcher::embed_chunks;
pub use chunking::{chunk_pages, split_text, ChunkingConfig};
pub use config::{BatchOptions, Settings, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL, DEFAULT_TOP_K};
pub use embeddings::{Embedder, GeminiEmbedder, HashingEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{IngestError, QueryError};
pub use extractor::{extract_page_texts, LopdfExtractor, PageText, PdfExtractor};
pub use generator::{is_greeting, render_prompt, ChatModel, GeminiChat, REFUSAL_PHRASE};
pub use index::{EmbeddingSignature, IndexEntry, ScoredChunk, VectorIndex};
pub use ingest::{
    discover_pdf_files, extract_corpus, ExtractionReport, ExtractedDocument, SkippedPdf,
};
pub use models::{Answer, Chunk, DocumentFingerprint, SourceRef};
pub use orchestrator::{DocumentAssistant, IngestionSummary};
pub use retry::RetryPolicy;
pub use session::{ConversationTurn, Role, SessionContext};

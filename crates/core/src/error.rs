use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no extractable text found in any input document")]
    EmptyCorpus,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding provider returned {status}: {detail}")]
    Provider { status: u16, detail: String },

    #[error("embedding batch failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("missing configuration: {0}")]
    MissingConfig(String),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("no index found at {path}; process a document first")]
    IndexNotFound { path: String },

    #[error("index was built with embedding '{stored}' but '{configured}' is configured")]
    EmbeddingMismatch { stored: String, configured: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat provider returned {status}: {detail}")]
    Provider { status: u16, detail: String },

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("query request failed: {0}")]
    Request(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

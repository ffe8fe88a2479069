use crate::chunking::ChunkingConfig;
use crate::error::IngestError;
use crate::retry::RetryPolicy;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_EMBEDDING_MODEL: &str = "models/embedding-001";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_INDEX_PATH: &str = "vector_index";
pub const DEFAULT_TOP_K: usize = 4;

/// Pacing for embedding calls against a rate-limited provider.
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub batch_size: usize,
    /// Unconditional pause between batches, regardless of outcome.
    pub batch_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 8,
            batch_delay: Duration::from_secs(1),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub temperature: f32,
    pub chunking: ChunkingConfig,
    pub index_path: PathBuf,
    pub batch: BatchOptions,
}

impl Settings {
    /// Resolves settings from the environment. A missing `GEMINI_API_KEY`
    /// fails here, before any document is touched.
    pub fn from_env() -> Result<Self, IngestError> {
        let api_key = required_env("GEMINI_API_KEY")?;

        let mut chunking = ChunkingConfig::default();
        if let Some(size) = parsed_env::<usize>("ASKPDF_CHUNK_SIZE") {
            chunking.chunk_size = size;
        }
        if let Some(overlap) = parsed_env::<usize>("ASKPDF_CHUNK_OVERLAP") {
            chunking.chunk_overlap = overlap;
        }
        chunking.validate()?;

        Ok(Self {
            api_key,
            embedding_model: env_or("ASKPDF_EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            chat_model: env_or("ASKPDF_CHAT_MODEL", DEFAULT_CHAT_MODEL),
            temperature: parsed_env::<f32>("ASKPDF_TEMPERATURE").unwrap_or(DEFAULT_TEMPERATURE),
            chunking,
            index_path: PathBuf::from(env_or("ASKPDF_INDEX_PATH", DEFAULT_INDEX_PATH)),
            batch: BatchOptions::default(),
        })
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            chunking: ChunkingConfig::default(),
            index_path: PathBuf::from(DEFAULT_INDEX_PATH),
            batch: BatchOptions::default(),
        }
    }
}

fn required_env(name: &str) -> Result<String, IngestError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(IngestError::MissingConfig(format!(
            "{name} is not set; export it or add it to your .env file"
        ))),
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parsed_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|value| value.trim().parse().ok())
}

use crate::batcher::embed_chunks;
use crate::chunking::ChunkingConfig;
use crate::config::BatchOptions;
use crate::embeddings::Embedder;
use crate::error::{IngestError, QueryError};
use crate::generator::{greeting_reply, is_greeting, render_prompt, ChatModel};
use crate::index::{EmbeddingSignature, VectorIndex};
use crate::ingest::{chunk_corpus, extract_corpus, ExtractionReport, SkippedPdf};
use crate::models::{Answer, SourceRef};
use crate::session::SessionContext;
use std::path::{Path, PathBuf};
use tracing::info;

const EXCERPT_CHARS: usize = 200;

pub struct IngestionSummary {
    pub documents: usize,
    pub chunks: usize,
    pub skipped: Vec<SkippedPdf>,
}

/// Facade over the whole pipeline: extraction, chunking, batched
/// embedding, index persistence, retrieval, and answer generation.
/// Embedding and chat providers are injected at the trait seams.
pub struct DocumentAssistant<E, C>
where
    E: Embedder,
    C: ChatModel,
{
    embedder: E,
    chat: C,
    chunking: ChunkingConfig,
    batch: BatchOptions,
    index_path: PathBuf,
}

impl<E, C> DocumentAssistant<E, C>
where
    E: Embedder,
    C: ChatModel,
{
    pub fn new(
        embedder: E,
        chat: C,
        chunking: ChunkingConfig,
        batch: BatchOptions,
        index_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            embedder,
            chat,
            chunking,
            batch,
            index_path: index_path.into(),
        }
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Runs the full ingestion pipeline over `paths`. Each run builds a
    /// fresh index and replaces the persisted one wholesale; nothing is
    /// written until every batch has embedded successfully.
    pub async fn ingest(&self, paths: &[PathBuf]) -> Result<IngestionSummary, IngestError> {
        let report = extract_corpus(paths)?;
        self.ingest_extracted(report).await
    }

    pub async fn ingest_extracted(
        &self,
        report: ExtractionReport,
    ) -> Result<IngestionSummary, IngestError> {
        let documents = report.documents.len();
        let chunks = chunk_corpus(&report, self.chunking)?;
        let chunk_count = chunks.len();
        info!(documents, chunks = chunk_count, "corpus chunked");

        let entries = embed_chunks(&self.embedder, chunks, &self.batch).await?;
        let dimensions = entries
            .first()
            .map(|entry| entry.vector.len())
            .unwrap_or_default();

        let signature = EmbeddingSignature {
            model: self.embedder.model_id().to_string(),
            dimensions,
        };
        let index = VectorIndex::build(signature, entries)?;
        index.persist(&self.index_path)?;

        Ok(IngestionSummary {
            documents,
            chunks: chunk_count,
            skipped: report.skipped,
        })
    }

    /// Answers `question` grounded in the persisted index. Greetings are
    /// answered conversationally without retrieval. The session records
    /// the exchange only when generation succeeds.
    pub async fn ask(
        &self,
        session: &mut SessionContext,
        question: &str,
        top_k: usize,
    ) -> Result<Answer, QueryError> {
        if question.trim().is_empty() {
            return Err(QueryError::Request("question is empty".to_string()));
        }

        if is_greeting(question) {
            let reply = greeting_reply();
            session.push_user(question);
            session.push_assistant(reply.clone(), Vec::new());
            return Ok(Answer {
                text: reply,
                sources: Vec::new(),
            });
        }

        // Embedding the query first pins down the configured dimensionality
        // the stored signature is checked against.
        let query_vector = self
            .batch
            .retry
            .run("embed query", || self.embedder.embed_query(question))
            .await
            .map_err(QueryError::Ingest)?;
        let expected = EmbeddingSignature {
            model: self.embedder.model_id().to_string(),
            dimensions: query_vector.len(),
        };
        let index = VectorIndex::load(&self.index_path, &expected)?;

        let hits = index.search(&query_vector, top_k.max(1));
        let prompt = render_prompt(&hits, question);
        let text = self.chat.complete(&prompt).await?;

        let sources = hits
            .iter()
            .map(|scored| SourceRef::from_chunk(&scored.chunk, EXCERPT_CHARS))
            .collect::<Vec<_>>();

        session.push_user(question);
        session.push_assistant(text.clone(), sources.clone());

        Ok(Answer { text, sources })
    }
}

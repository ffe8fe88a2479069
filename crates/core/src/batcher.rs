use crate::config::BatchOptions;
use crate::embeddings::Embedder;
use crate::error::IngestError;
use crate::index::IndexEntry;
use crate::models::Chunk;
use tracing::info;

/// Embeds every chunk in fixed-size batches, pausing between batches to
/// stay under the provider's request quota. Each batch is driven through
/// the retry policy; if one batch exhausts its attempts the whole run
/// fails and nothing embedded so far escapes. Chunk order and the
/// chunk-to-vector association are preserved.
pub async fn embed_chunks(
    embedder: &dyn Embedder,
    chunks: Vec<Chunk>,
    options: &BatchOptions,
) -> Result<Vec<IndexEntry>, IngestError> {
    if chunks.is_empty() {
        return Err(IngestError::InvalidArgument(
            "no chunks to embed".to_string(),
        ));
    }

    let batch_size = options.batch_size.max(1);
    let batch_count = chunks.len().div_ceil(batch_size);
    let mut entries = Vec::with_capacity(chunks.len());

    for (position, batch) in chunks.chunks(batch_size).enumerate() {
        let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();

        let vectors = options
            .retry
            .run("embed batch", || embedder.embed_batch(&texts))
            .await
            .map_err(|error| IngestError::RetriesExhausted {
                attempts: options.retry.max_attempts,
                last_error: error.to_string(),
            })?;

        if vectors.len() != batch.len() {
            return Err(IngestError::Provider {
                status: 200,
                detail: format!(
                    "batch of {} chunks came back with {} vectors",
                    batch.len(),
                    vectors.len()
                ),
            });
        }

        for (chunk, vector) in batch.iter().cloned().zip(vectors) {
            entries.push(IndexEntry { vector, chunk });
        }

        info!(
            batch = position + 1,
            batches = batch_count,
            embedded = entries.len(),
            "embedding batch complete"
        );

        // Paced regardless of outcome, to smooth request rate.
        if position + 1 < batch_count {
            tokio::time::sleep(options.batch_delay).await;
        }
    }

    Ok(entries)
}

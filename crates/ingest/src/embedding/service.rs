use std::sync::Arc;

use tracing::{info, warn};

use edgar_core::DocumentChunk;
use edgar_warehouse::Warehouse;

use super::traits::{Embedder, EmbeddingError};

/// Totals for one embedding run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddingReport {
    pub embedded: usize,
    pub failed: usize,
}

/// Drains the embedding backlog in batches and answers similarity queries.
pub struct EmbeddingService {
    warehouse: Arc<dyn Warehouse>,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
}

impl EmbeddingService {
    pub fn new(
        warehouse: Arc<dyn Warehouse>,
        embedder: Arc<dyn Embedder>,
        batch_size: usize,
    ) -> Self {
        Self {
            warehouse,
            embedder,
            batch_size: batch_size.max(1),
        }
    }

    /// Embed every chunk that does not yet have a stored vector.
    ///
    /// Failures are counted and skipped. A batch that makes no progress
    /// ends the run instead of refetching the same failing chunks forever.
    pub async fn process_pending(&self) -> Result<EmbeddingReport, EmbeddingError> {
        let mut report = EmbeddingReport::default();
        loop {
            let batch = self
                .warehouse
                .chunks_without_embeddings(self.batch_size)
                .await?;
            if batch.is_empty() {
                break;
            }

            let mut stored_this_batch = 0;
            for chunk in &batch {
                match self.embed_and_store(&chunk.chunk_id, &chunk.chunk_text).await {
                    Ok(()) => {
                        report.embedded += 1;
                        stored_this_batch += 1;
                    }
                    Err(err) => {
                        warn!(chunk_id = %chunk.chunk_id, error = %err, "embedding failed");
                        report.failed += 1;
                    }
                }
            }

            if stored_this_batch == 0 {
                warn!("no progress in embedding batch, stopping run");
                break;
            }
        }
        info!(embedded = report.embedded, failed = report.failed, "embedding run complete");
        Ok(report)
    }

    async fn embed_and_store(&self, chunk_id: &str, text: &str) -> Result<(), EmbeddingError> {
        let vector = self.embedder.embed(text).await?;
        self.warehouse.store_embedding(chunk_id, &vector).await?;
        Ok(())
    }

    /// Embed the query and return the closest stored chunks, optionally
    /// narrowed to one company and/or section.
    pub async fn search_similar(
        &self,
        query: &str,
        ticker: Option<&str>,
        section_name: Option<&str>,
        limit: usize,
    ) -> Result<Vec<DocumentChunk>, EmbeddingError> {
        let query_vector = self.embedder.embed(query).await?;
        Ok(self
            .warehouse
            .vector_search(&query_vector, ticker, section_name, limit)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use edgar_core::{ChunkMetadata, EmbeddingConfig};
    use edgar_warehouse::MemoryWarehouse;

    use crate::embedding::CortexEmbedder;

    use super::*;

    fn chunk(id: &str, index: usize, text: &str) -> DocumentChunk {
        DocumentChunk {
            chunk_id: id.to_string(),
            cik: "0000320193".into(),
            company_ticker: "AAPL".into(),
            company_name: "Apple Inc.".into(),
            filing_type: "10-K".into(),
            adsh: "0000320193-24-000123".into(),
            period_end_date: NaiveDate::from_ymd_opt(2024, 9, 28).unwrap(),
            section_name: "RISK_FACTORS".into(),
            chunk_text: text.to_string(),
            chunk_index: index,
            metadata: ChunkMetadata {
                sec_document_id: "DOC-1".into(),
                char_count: text.chars().count(),
            },
        }
    }

    fn service(warehouse: Arc<MemoryWarehouse>, batch_size: usize) -> EmbeddingService {
        let embedder = CortexEmbedder::new(warehouse.clone(), &EmbeddingConfig {
            model: "snowflake-arctic-embed-m".into(),
            dimensions: 768,
            batch_size,
        });
        EmbeddingService::new(warehouse, Arc::new(embedder), batch_size)
    }

    #[tokio::test]
    async fn drains_backlog_across_batches() {
        let wh = Arc::new(MemoryWarehouse::new());
        for i in 0..5 {
            wh.insert_chunk(&chunk(&format!("DOC-1_RISK_FACTORS_{i}"), i, "risk text"))
                .await
                .unwrap();
        }

        let report = service(wh.clone(), 2).process_pending().await.unwrap();
        assert_eq!(report, EmbeddingReport { embedded: 5, failed: 0 });
        assert_eq!(wh.stored_embeddings().len(), 5);
        assert!(wh.chunks_without_embeddings(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stops_when_a_batch_makes_no_progress() {
        let wh = Arc::new(MemoryWarehouse::new());
        for i in 0..3 {
            wh.insert_chunk(&chunk(&format!("DOC-1_RISK_FACTORS_{i}"), i, "risk text"))
                .await
                .unwrap();
        }
        wh.set_fail_embeddings(true);

        let report = service(wh.clone(), 2).process_pending().await.unwrap();
        // First batch of 2 fails with zero stored, run ends there.
        assert_eq!(report, EmbeddingReport { embedded: 0, failed: 2 });
        assert!(wh.stored_embeddings().is_empty());
    }

    #[tokio::test]
    async fn empty_backlog_is_a_clean_noop() {
        let wh = Arc::new(MemoryWarehouse::new());
        let report = service(wh, 10).process_pending().await.unwrap();
        assert_eq!(report, EmbeddingReport::default());
    }

    #[tokio::test]
    async fn search_embeds_query_and_honors_filters() {
        let wh = Arc::new(MemoryWarehouse::new());
        wh.insert_chunk(&chunk("DOC-1_RISK_FACTORS_0", 0, "supply chain exposure"))
            .await
            .unwrap();
        let svc = service(wh.clone(), 10);
        svc.process_pending().await.unwrap();

        let hits = svc
            .search_similar("supply chain", Some("AAPL"), Some("RISK_FACTORS"), 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "DOC-1_RISK_FACTORS_0");

        let misses = svc
            .search_similar("supply chain", Some("MSFT"), None, 5)
            .await
            .unwrap();
        assert!(misses.is_empty());
    }
}

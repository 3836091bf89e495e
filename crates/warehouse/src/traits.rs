use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use edgar_core::{Company, DocumentChunk, Filing, FilingText, FinancialMetric, RiskAssessment};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("warehouse API error: {status} — {body}")]
    Api { status: u16, body: String },

    #[error("failed to decode warehouse row: {0}")]
    Decode(String),

    #[error("warehouse not configured: {0}")]
    NotConfigured(String),

    #[error("store failed: {0}")]
    Store(String),
}

/// A chunk id/text pair, as returned by embedding-backlog queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRef {
    pub chunk_id: String,
    pub chunk_text: String,
}

/// The parameterized-query collaborator surface the pipeline consumes.
///
/// Reads come from the shared SEC filing database; writes go to the
/// application database. `insert_chunk` and `store_embedding` are upserts
/// keyed by chunk id — reprocessing a filing produces identical ids.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Active target companies, ordered by ticker.
    async fn list_companies(&self) -> Result<Vec<Company>, WarehouseError>;

    /// Filing metadata, newest period first.
    async fn list_filings(
        &self,
        ticker: Option<&str>,
        filing_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Filing>, WarehouseError>;

    /// Full filing content by document id. `None` when unknown.
    async fn fetch_filing(
        &self,
        sec_document_id: &str,
    ) -> Result<Option<FilingText>, WarehouseError>;

    /// Upsert one processed chunk.
    async fn insert_chunk(&self, chunk: &DocumentChunk) -> Result<(), WarehouseError>;

    /// Chunks that do not yet have a stored embedding, oldest first.
    async fn chunks_without_embeddings(
        &self,
        limit: usize,
    ) -> Result<Vec<ChunkRef>, WarehouseError>;

    /// Compute an embedding vector inside the warehouse (Cortex).
    async fn embed_text(&self, model: &str, text: &str) -> Result<Vec<f32>, WarehouseError>;

    /// Upsert one embedding vector keyed by chunk id.
    async fn store_embedding(
        &self,
        chunk_id: &str,
        embedding: &[f32],
    ) -> Result<(), WarehouseError>;

    /// Cosine-similarity search over stored chunk embeddings, optionally
    /// filtered by company ticker and/or section name.
    async fn vector_search(
        &self,
        embedding: &[f32],
        ticker: Option<&str>,
        section_name: Option<&str>,
        limit: usize,
    ) -> Result<Vec<DocumentChunk>, WarehouseError>;

    /// FINANCIAL_STATEMENTS chunk texts for one filing, in chunk order.
    async fn financial_chunks(
        &self,
        ticker: &str,
        sec_document_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, WarehouseError>;

    async fn insert_metric(&self, metric: &FinancialMetric) -> Result<(), WarehouseError>;

    /// Most recent stored value per metric name for filings strictly
    /// before `before`, for year-over-year comparison.
    async fn previous_metrics(
        &self,
        ticker: &str,
        before: NaiveDate,
    ) -> Result<HashMap<String, f64>, WarehouseError>;

    async fn insert_assessment(
        &self,
        assessment: &RiskAssessment,
    ) -> Result<(), WarehouseError>;
}

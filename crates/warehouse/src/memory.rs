//! In-memory warehouse double for tests and local development.
//!
//! Implements the full [`Warehouse`] trait over mutex-guarded maps, with
//! upsert-by-id semantics for chunks and embeddings, a deterministic toy
//! embedding, and per-operation failure toggles so best-effort counting
//! paths can be exercised.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use edgar_core::{Company, DocumentChunk, Filing, FilingText, FinancialMetric, RiskAssessment};

use crate::traits::{ChunkRef, Warehouse, WarehouseError};

#[derive(Default)]
struct Inner {
    companies: Vec<Company>,
    filings: Vec<FilingText>,
    /// Chunks in insertion order; upserts replace in place.
    chunks: Vec<DocumentChunk>,
    embeddings: HashMap<String, Vec<f32>>,
    metrics: Vec<FinancialMetric>,
    assessments: Vec<RiskAssessment>,
}

#[derive(Default)]
pub struct MemoryWarehouse {
    inner: Mutex<Inner>,
    fail_chunk_inserts: AtomicBool,
    fail_embeddings: AtomicBool,
    embedding_dimensions: usize,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self {
            embedding_dimensions: 768,
            ..Default::default()
        }
    }

    pub fn seed_company(&self, company: Company) {
        self.inner.lock().unwrap().companies.push(company);
    }

    pub fn seed_filing(&self, filing: FilingText) {
        self.inner.lock().unwrap().filings.push(filing);
    }

    /// Make every subsequent `insert_chunk` fail.
    pub fn set_fail_chunk_inserts(&self, fail: bool) {
        self.fail_chunk_inserts.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `embed_text` fail.
    pub fn set_fail_embeddings(&self, fail: bool) {
        self.fail_embeddings.store(fail, Ordering::SeqCst);
    }

    pub fn stored_chunks(&self) -> Vec<DocumentChunk> {
        self.inner.lock().unwrap().chunks.clone()
    }

    pub fn stored_embeddings(&self) -> HashMap<String, Vec<f32>> {
        self.inner.lock().unwrap().embeddings.clone()
    }

    pub fn stored_metrics(&self) -> Vec<FinancialMetric> {
        self.inner.lock().unwrap().metrics.clone()
    }

    pub fn stored_assessments(&self) -> Vec<RiskAssessment> {
        self.inner.lock().unwrap().assessments.clone()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn list_companies(&self) -> Result<Vec<Company>, WarehouseError> {
        let mut companies = self.inner.lock().unwrap().companies.clone();
        companies.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        Ok(companies)
    }

    async fn list_filings(
        &self,
        ticker: Option<&str>,
        filing_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Filing>, WarehouseError> {
        let inner = self.inner.lock().unwrap();
        let mut filings: Vec<Filing> = inner
            .filings
            .iter()
            .map(|f| f.filing.clone())
            .filter(|f| ticker.is_none_or(|t| f.ticker.eq_ignore_ascii_case(t)))
            .filter(|f| filing_type.is_none_or(|ft| f.filing_type == ft))
            .collect();
        filings.sort_by(|a, b| b.period_end_date.cmp(&a.period_end_date));
        filings.truncate(limit);
        Ok(filings)
    }

    async fn fetch_filing(
        &self,
        sec_document_id: &str,
    ) -> Result<Option<FilingText>, WarehouseError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .filings
            .iter()
            .find(|f| f.filing.sec_document_id == sec_document_id)
            .cloned())
    }

    async fn insert_chunk(&self, chunk: &DocumentChunk) -> Result<(), WarehouseError> {
        if self.fail_chunk_inserts.load(Ordering::SeqCst) {
            return Err(WarehouseError::Store("injected chunk insert failure".to_string()));
        }
        let mut inner = self.inner.lock().unwrap();
        match inner.chunks.iter_mut().find(|c| c.chunk_id == chunk.chunk_id) {
            Some(existing) => *existing = chunk.clone(),
            None => inner.chunks.push(chunk.clone()),
        }
        Ok(())
    }

    async fn chunks_without_embeddings(
        &self,
        limit: usize,
    ) -> Result<Vec<ChunkRef>, WarehouseError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .chunks
            .iter()
            .filter(|c| !inner.embeddings.contains_key(&c.chunk_id))
            .take(limit)
            .map(|c| ChunkRef {
                chunk_id: c.chunk_id.clone(),
                chunk_text: c.chunk_text.clone(),
            })
            .collect())
    }

    async fn embed_text(&self, _model: &str, text: &str) -> Result<Vec<f32>, WarehouseError> {
        if self.fail_embeddings.load(Ordering::SeqCst) {
            return Err(WarehouseError::Store("injected embedding failure".to_string()));
        }
        // Deterministic toy vector: cycle the text bytes through the
        // dimensions so identical text embeds identically.
        let bytes = text.as_bytes();
        let mut vector = vec![0.0f32; self.embedding_dimensions];
        for (i, b) in bytes.iter().enumerate() {
            vector[i % self.embedding_dimensions] += *b as f32 / 255.0;
        }
        Ok(vector)
    }

    async fn store_embedding(
        &self,
        chunk_id: &str,
        embedding: &[f32],
    ) -> Result<(), WarehouseError> {
        let mut inner = self.inner.lock().unwrap();
        inner.embeddings.insert(chunk_id.to_string(), embedding.to_vec());
        Ok(())
    }

    async fn vector_search(
        &self,
        embedding: &[f32],
        ticker: Option<&str>,
        section_name: Option<&str>,
        limit: usize,
    ) -> Result<Vec<DocumentChunk>, WarehouseError> {
        let inner = self.inner.lock().unwrap();
        let mut scored: Vec<(f32, DocumentChunk)> = inner
            .chunks
            .iter()
            .filter(|c| ticker.is_none_or(|t| c.company_ticker.eq_ignore_ascii_case(t)))
            .filter(|c| section_name.is_none_or(|s| c.section_name == s))
            .filter_map(|c| {
                inner
                    .embeddings
                    .get(&c.chunk_id)
                    .map(|v| (cosine(embedding, v), c.clone()))
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored.into_iter().take(limit).map(|(_, c)| c).collect())
    }

    async fn financial_chunks(
        &self,
        ticker: &str,
        sec_document_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, WarehouseError> {
        let inner = self.inner.lock().unwrap();
        let mut chunks: Vec<&DocumentChunk> = inner
            .chunks
            .iter()
            .filter(|c| c.company_ticker.eq_ignore_ascii_case(ticker))
            .filter(|c| c.section_name == "FINANCIAL_STATEMENTS")
            .filter(|c| c.chunk_id.starts_with(sec_document_id))
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        Ok(chunks
            .into_iter()
            .take(limit)
            .map(|c| c.chunk_text.clone())
            .collect())
    }

    async fn insert_metric(&self, metric: &FinancialMetric) -> Result<(), WarehouseError> {
        self.inner.lock().unwrap().metrics.push(metric.clone());
        Ok(())
    }

    async fn previous_metrics(
        &self,
        ticker: &str,
        before: chrono::NaiveDate,
    ) -> Result<HashMap<String, f64>, WarehouseError> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<&FinancialMetric> = inner
            .metrics
            .iter()
            .filter(|m| m.company_ticker.eq_ignore_ascii_case(ticker))
            .filter(|m| m.filing_date < before)
            .collect();
        rows.sort_by(|a, b| b.filing_date.cmp(&a.filing_date));

        let mut metrics = HashMap::new();
        for row in rows {
            if let Some(value) = row.metric_value {
                metrics.entry(row.metric_name.clone()).or_insert(value);
            }
        }
        Ok(metrics)
    }

    async fn insert_assessment(
        &self,
        assessment: &RiskAssessment,
    ) -> Result<(), WarehouseError> {
        self.inner.lock().unwrap().assessments.push(assessment.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use edgar_core::ChunkMetadata;

    fn chunk(id: &str, section: &str, index: usize, text: &str) -> DocumentChunk {
        DocumentChunk {
            chunk_id: id.to_string(),
            cik: "0000320193".to_string(),
            company_ticker: "AAPL".to_string(),
            company_name: "Apple Inc.".to_string(),
            filing_type: "10-K".to_string(),
            adsh: "0000320193-23-000106".to_string(),
            period_end_date: NaiveDate::from_ymd_opt(2023, 9, 30).unwrap(),
            section_name: section.to_string(),
            chunk_text: text.to_string(),
            chunk_index: index,
            metadata: ChunkMetadata {
                sec_document_id: "doc1".to_string(),
                char_count: text.chars().count(),
            },
        }
    }

    #[tokio::test]
    async fn chunk_insert_is_upsert() {
        let wh = MemoryWarehouse::new();
        wh.insert_chunk(&chunk("doc1_BUSINESS_0", "BUSINESS", 0, "first"))
            .await
            .unwrap();
        wh.insert_chunk(&chunk("doc1_BUSINESS_0", "BUSINESS", 0, "replaced"))
            .await
            .unwrap();
        let stored = wh.stored_chunks();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].chunk_text, "replaced");
    }

    #[tokio::test]
    async fn embedding_backlog_shrinks_as_vectors_land() {
        let wh = MemoryWarehouse::new();
        wh.insert_chunk(&chunk("doc1_BUSINESS_0", "BUSINESS", 0, "alpha"))
            .await
            .unwrap();
        wh.insert_chunk(&chunk("doc1_BUSINESS_1", "BUSINESS", 1, "beta"))
            .await
            .unwrap();
        assert_eq!(wh.chunks_without_embeddings(10).await.unwrap().len(), 2);

        let vector = wh.embed_text("arctic", "alpha").await.unwrap();
        wh.store_embedding("doc1_BUSINESS_0", &vector).await.unwrap();
        let pending = wh.chunks_without_embeddings(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].chunk_id, "doc1_BUSINESS_1");
    }

    #[tokio::test]
    async fn vector_search_filters_by_ticker_and_section() {
        let wh = MemoryWarehouse::new();
        let c = chunk("doc1_RISK_FACTORS_0", "RISK_FACTORS", 0, "supply chain risk");
        wh.insert_chunk(&c).await.unwrap();
        let v = wh.embed_text("arctic", &c.chunk_text).await.unwrap();
        wh.store_embedding(&c.chunk_id, &v).await.unwrap();

        let query = wh.embed_text("arctic", "supply chain").await.unwrap();
        let hits = wh
            .vector_search(&query, Some("AAPL"), Some("RISK_FACTORS"), 5)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let misses = wh
            .vector_search(&query, Some("MSFT"), None, 5)
            .await
            .unwrap();
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn financial_chunks_ordered_by_index() {
        let wh = MemoryWarehouse::new();
        wh.insert_chunk(&chunk("doc1_FINANCIAL_STATEMENTS_3", "FINANCIAL_STATEMENTS", 3, "c"))
            .await
            .unwrap();
        wh.insert_chunk(&chunk("doc1_FINANCIAL_STATEMENTS_2", "FINANCIAL_STATEMENTS", 2, "b"))
            .await
            .unwrap();
        let texts = wh.financial_chunks("AAPL", "doc1", 10).await.unwrap();
        assert_eq!(texts, vec!["b".to_string(), "c".to_string()]);
    }
}

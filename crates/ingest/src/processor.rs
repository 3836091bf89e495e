//! Turns a raw filing into warehouse-ready chunks.
//!
//! The processor ties section extraction and chunking together and owns
//! chunk identity: ids are derived from the filing id, section name, and a
//! filing-wide running index, so re-processing the same filing always
//! produces the same ids.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use edgar_core::{ChunkMetadata, DocumentChunk, FilingText, ProcessingConfig};
use edgar_warehouse::{Warehouse, WarehouseError};

use crate::chunker::{ChunkConfigError, TextChunker};
use crate::sections::SectionExtractor;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("filing is missing required field `{0}`")]
    MissingField(&'static str),
    #[error(transparent)]
    Config(#[from] ChunkConfigError),
}

/// Where finished chunks go. Blanket-implemented for every [`Warehouse`],
/// and narrow enough to stub out in tests.
#[async_trait]
pub trait ChunkSink: Send + Sync {
    async fn store_chunk(&self, chunk: &DocumentChunk) -> Result<(), WarehouseError>;
}

#[async_trait]
impl<T: Warehouse + ?Sized> ChunkSink for T {
    async fn store_chunk(&self, chunk: &DocumentChunk) -> Result<(), WarehouseError> {
        self.insert_chunk(chunk).await
    }
}

/// Per-filing tally of chunk persistence.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreOutcome {
    pub stored: usize,
    pub failed: usize,
}

pub struct FilingProcessor {
    extractor: SectionExtractor,
    chunker: TextChunker,
}

impl FilingProcessor {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ProcessError> {
        Ok(Self {
            extractor: SectionExtractor::new(),
            chunker: TextChunker::new(chunk_size, chunk_overlap)?,
        })
    }

    pub fn from_config(config: &ProcessingConfig) -> Result<Self, ProcessError> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Section and chunk a filing. Chunks come back in section order, then
    /// chunk order, with a single index running across the whole filing.
    ///
    /// A filing with no recognized sections yields an empty vec, which is
    /// a valid outcome, not an error.
    pub fn process_filing(&self, filing: &FilingText) -> Result<Vec<DocumentChunk>, ProcessError> {
        validate(filing)?;

        let sections = self.extractor.extract_sections(&filing.body);
        debug!(
            sec_document_id = %filing.filing.sec_document_id,
            sections = sections.len(),
            "extracted sections"
        );

        let mut chunks = Vec::new();
        let mut index = 0usize;
        for (kind, text) in &sections {
            for chunk_text in self.chunker.chunk_text(text) {
                let meta = filing.filing.clone();
                chunks.push(DocumentChunk {
                    chunk_id: format!(
                        "{}_{}_{}",
                        meta.sec_document_id,
                        kind.as_str(),
                        index
                    ),
                    cik: meta.cik,
                    company_ticker: meta.ticker,
                    company_name: meta.company_name,
                    filing_type: meta.filing_type,
                    adsh: meta.adsh,
                    period_end_date: meta.period_end_date,
                    section_name: kind.as_str().to_string(),
                    metadata: ChunkMetadata {
                        sec_document_id: meta.sec_document_id.clone(),
                        char_count: chunk_text.chars().count(),
                    },
                    chunk_text,
                    chunk_index: index,
                });
                index += 1;
            }
        }
        Ok(chunks)
    }

    /// Process a filing and push every chunk to `sink`, best effort. A
    /// failed insert is logged and counted; the remaining chunks are still
    /// attempted.
    pub async fn process_and_store<S>(
        &self,
        filing: &FilingText,
        sink: &S,
    ) -> Result<StoreOutcome, ProcessError>
    where
        S: ChunkSink + ?Sized,
    {
        let chunks = self.process_filing(filing)?;
        let mut outcome = StoreOutcome::default();
        for chunk in &chunks {
            match sink.store_chunk(chunk).await {
                Ok(()) => outcome.stored += 1,
                Err(err) => {
                    warn!(chunk_id = %chunk.chunk_id, error = %err, "chunk insert failed");
                    outcome.failed += 1;
                }
            }
        }
        Ok(outcome)
    }
}

fn validate(filing: &FilingText) -> Result<(), ProcessError> {
    if filing.filing.sec_document_id.trim().is_empty() {
        return Err(ProcessError::MissingField("sec_document_id"));
    }
    if filing.filing.cik.trim().is_empty() {
        return Err(ProcessError::MissingField("cik"));
    }
    if filing.filing.ticker.trim().is_empty() {
        return Err(ProcessError::MissingField("ticker"));
    }
    Ok(())
}

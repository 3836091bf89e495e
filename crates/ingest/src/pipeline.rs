//! Batch orchestration: companies -> filings -> chunks.
//!
//! One bad filing never aborts the run. Anything that fails is logged,
//! counted, and skipped, so a nightly batch over the full company list
//! always finishes with a report.

use std::sync::Arc;

use tracing::{info, warn};

use edgar_core::ProcessingConfig;
use edgar_warehouse::Warehouse;

use crate::processor::{FilingProcessor, ProcessError};

/// Totals for one batch run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineReport {
    pub filings_processed: usize,
    pub filings_skipped: usize,
    pub chunks_stored: usize,
    pub chunks_failed: usize,
}

pub struct IngestPipeline {
    warehouse: Arc<dyn Warehouse>,
    processor: FilingProcessor,
    /// Most recent filings fetched per company.
    filings_per_company: usize,
}

impl IngestPipeline {
    pub fn new(
        warehouse: Arc<dyn Warehouse>,
        processing: &ProcessingConfig,
        filings_per_company: usize,
    ) -> Result<Self, ProcessError> {
        Ok(Self {
            warehouse,
            processor: FilingProcessor::from_config(processing)?,
            filings_per_company: filings_per_company.max(1),
        })
    }

    /// Process the latest filings for each ticker, best effort.
    pub async fn process_companies(
        &self,
        tickers: &[String],
        filing_type: Option<&str>,
    ) -> PipelineReport {
        let mut report = PipelineReport::default();
        for ticker in tickers {
            self.process_company(ticker, filing_type, &mut report).await;
        }
        info!(
            processed = report.filings_processed,
            skipped = report.filings_skipped,
            chunks_stored = report.chunks_stored,
            chunks_failed = report.chunks_failed,
            "ingest run complete"
        );
        report
    }

    async fn process_company(
        &self,
        ticker: &str,
        filing_type: Option<&str>,
        report: &mut PipelineReport,
    ) {
        let filings = match self
            .warehouse
            .list_filings(Some(ticker), filing_type, self.filings_per_company)
            .await
        {
            Ok(filings) => filings,
            Err(err) => {
                warn!(ticker, error = %err, "listing filings failed, skipping company");
                return;
            }
        };
        if filings.is_empty() {
            info!(ticker, "no filings found");
            return;
        }

        for filing in filings {
            let doc_id = filing.sec_document_id.clone();
            let filing_text = match self.warehouse.fetch_filing(&doc_id).await {
                Ok(Some(text)) => text,
                Ok(None) => {
                    warn!(ticker, sec_document_id = %doc_id, "filing body missing, skipping");
                    report.filings_skipped += 1;
                    continue;
                }
                Err(err) => {
                    warn!(ticker, sec_document_id = %doc_id, error = %err, "fetch failed, skipping");
                    report.filings_skipped += 1;
                    continue;
                }
            };

            match self.processor.process_and_store(&filing_text, self.warehouse.as_ref()).await {
                Ok(outcome) => {
                    info!(
                        ticker,
                        sec_document_id = %doc_id,
                        stored = outcome.stored,
                        failed = outcome.failed,
                        "filing processed"
                    );
                    report.filings_processed += 1;
                    report.chunks_stored += outcome.stored;
                    report.chunks_failed += outcome.failed;
                }
                Err(err) => {
                    warn!(ticker, sec_document_id = %doc_id, error = %err, "processing failed, skipping");
                    report.filings_skipped += 1;
                }
            }
        }
    }
}

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use edgar_analysis::{MetricsEngine, RiskAnalyzer};
use edgar_core::Config;
use edgar_ingest::embedding::{CortexEmbedder, EmbeddingService};
use edgar_ingest::IngestPipeline;
use edgar_llm::FilingAnalyst;
use edgar_warehouse::Warehouse;

/// 10-K filings inspected per company for metric extraction.
const METRIC_FILINGS_PER_COMPANY: usize = 5;
/// Recent filings inspected per company for risk analysis.
const RISK_FILINGS_PER_COMPANY: usize = 10;

pub async fn run_process(
    warehouse: Arc<dyn Warehouse>,
    config: &Config,
    tickers: &[String],
    filing_type: Option<&str>,
    limit: usize,
) -> Result<()> {
    info!("processing filings for {} companies", tickers.len());
    let pipeline = IngestPipeline::new(warehouse, &config.processing, limit)
        .context("invalid chunking configuration")?;
    let report = pipeline.process_companies(tickers, filing_type).await;
    info!(
        processed = report.filings_processed,
        skipped = report.filings_skipped,
        chunks_stored = report.chunks_stored,
        chunks_failed = report.chunks_failed,
        "filing processing complete"
    );
    Ok(())
}

pub async fn run_embed(warehouse: Arc<dyn Warehouse>, config: &Config) -> Result<()> {
    info!("generating embeddings");
    let embedder = CortexEmbedder::new(warehouse.clone(), &config.embedding);
    let service = EmbeddingService::new(warehouse, Arc::new(embedder), config.embedding.batch_size);
    let report = service
        .process_pending()
        .await
        .context("embedding run failed")?;
    info!(
        embedded = report.embedded,
        failed = report.failed,
        "embedding generation complete"
    );
    Ok(())
}

pub async fn run_metrics(
    warehouse: Arc<dyn Warehouse>,
    config: &Config,
    tickers: &[String],
) -> Result<()> {
    if !config.llm.is_configured() {
        warn!("skipping metrics: ANTHROPIC_API_KEY is not configured");
        return Ok(());
    }
    let analyst = FilingAnalyst::from_config(&config.llm).context("creating LLM provider")?;
    let engine = MetricsEngine::new(warehouse.clone(), analyst);

    info!("extracting financial metrics from 10-K statements");
    let mut total = 0;
    for ticker in tickers {
        let filings = match warehouse
            .list_filings(Some(ticker.as_str()), Some("10-K"), METRIC_FILINGS_PER_COMPANY)
            .await
        {
            Ok(filings) => filings,
            Err(err) => {
                warn!(ticker, error = %err, "listing filings failed, skipping company");
                continue;
            }
        };
        for filing in filings {
            match engine.process_filing_metrics(&filing).await {
                Ok(rows) if rows.is_empty() => {}
                Ok(rows) => {
                    let stored = engine.store_metrics(&rows).await;
                    total += stored;
                    info!(ticker, sec_document_id = %filing.sec_document_id, stored, "metrics stored");
                }
                Err(err) => {
                    warn!(ticker, sec_document_id = %filing.sec_document_id, error = %err, "metric extraction failed");
                }
            }
        }
    }
    info!(total, "metric extraction complete");
    Ok(())
}

pub async fn run_risks(
    warehouse: Arc<dyn Warehouse>,
    config: &Config,
    tickers: &[String],
) -> Result<()> {
    if !config.llm.is_configured() {
        warn!("skipping risk analysis: ANTHROPIC_API_KEY is not configured");
        return Ok(());
    }
    let analyst = FilingAnalyst::from_config(&config.llm).context("creating LLM provider")?;
    let analyzer = RiskAnalyzer::new(warehouse.clone(), analyst);

    info!("running risk analysis");
    let mut total = 0;
    for ticker in tickers {
        let filings = match warehouse
            .list_filings(Some(ticker.as_str()), None, RISK_FILINGS_PER_COMPANY)
            .await
        {
            Ok(filings) => filings,
            Err(err) => {
                warn!(ticker, error = %err, "listing filings failed, skipping company");
                continue;
            }
        };
        for filing in filings {
            let doc_id = &filing.sec_document_id;
            let text = match warehouse.fetch_filing(doc_id).await {
                Ok(Some(text)) if !text.body.is_empty() => text,
                Ok(_) => continue,
                Err(err) => {
                    warn!(ticker, sec_document_id = %doc_id, error = %err, "fetch failed");
                    continue;
                }
            };
            match analyzer
                .analyze_filing(&text.body, ticker, &filing.company_name, filing.period_end_date)
                .await
            {
                Ok(assessments) => {
                    let stored = analyzer.store_assessments(&assessments).await;
                    total += stored;
                    info!(ticker, sec_document_id = %doc_id, stored, "risk assessments stored");
                }
                Err(err) => {
                    warn!(ticker, sec_document_id = %doc_id, error = %err, "risk analysis failed");
                }
            }
        }
    }
    info!(total, "risk analysis complete");
    Ok(())
}

//! Financial metric derivation, year-over-year deltas, and anomaly flags.
//!
//! Raw figures come out of the LLM extraction task; everything here is
//! plain arithmetic over them. Ratio formulas treat a missing numerator as
//! zero and yield nothing when the denominator is missing or zero, so one
//! unextracted figure never poisons the whole set.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use edgar_core::{Filing, FinancialMetric};
use edgar_llm::{FilingAnalyst, LlmError};
use edgar_warehouse::{Warehouse, WarehouseError};

/// FINANCIAL_STATEMENTS chunks pulled per filing.
const FINANCIAL_CHUNK_LIMIT: usize = 10;
/// Character cap on the combined statement text sent to the model.
const FINANCIAL_TEXT_BUDGET: usize = 50_000;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
}

type Formula = fn(&HashMap<String, f64>) -> Option<f64>;

/// Ratio metrics computed from the extracted figures, in output order.
const DERIVED_METRICS: &[(&str, &str, Formula)] = &[
    ("gross_margin", "percent", |m| pct(m, "gross_profit", "revenue")),
    ("operating_margin", "percent", |m| {
        pct(m, "operating_income", "revenue")
    }),
    ("net_margin", "percent", |m| pct(m, "net_income", "revenue")),
    ("roe", "percent", |m| pct(m, "net_income", "shareholders_equity")),
    ("roa", "percent", |m| pct(m, "net_income", "total_assets")),
    ("debt_to_equity", "ratio", |m| {
        ratio(m, "total_debt", "shareholders_equity")
    }),
    ("current_ratio", "ratio", |m| {
        ratio(m, "current_assets", "current_liabilities")
    }),
    ("quick_ratio", "ratio", |m| {
        let den = nonzero(m, "current_liabilities")?;
        Some(round2((get(m, "current_assets") - get(m, "inventory")) / den))
    }),
    ("interest_coverage", "ratio", |m| {
        ratio(m, "ebit", "interest_expense")
    }),
    // EBITDA approximated from EBIT plus depreciation; extraction rarely
    // supplies depreciation, in which case it counts as zero.
    ("debt_to_ebitda", "ratio", |m| {
        let den = get(m, "ebit") + get(m, "depreciation");
        if den == 0.0 {
            return None;
        }
        Some(round2(get(m, "total_debt") / den))
    }),
];

struct Threshold {
    min: f64,
    max: f64,
    yoy: f64,
}

/// Absolute bounds and year-over-year jump limits (percent change) beyond
/// which a derived metric gets flagged.
const ANOMALY_THRESHOLDS: &[(&str, Threshold)] = &[
    ("gross_margin", Threshold { min: 0.0, max: 80.0, yoy: 10.0 }),
    ("operating_margin", Threshold { min: -20.0, max: 50.0, yoy: 15.0 }),
    ("net_margin", Threshold { min: -30.0, max: 40.0, yoy: 20.0 }),
    ("roe", Threshold { min: -50.0, max: 50.0, yoy: 25.0 }),
    ("debt_to_equity", Threshold { min: 0.0, max: 5.0, yoy: 0.5 }),
    ("current_ratio", Threshold { min: 0.5, max: 5.0, yoy: 0.5 }),
    ("interest_coverage", Threshold { min: 0.0, max: 50.0, yoy: 5.0 }),
];

fn get(metrics: &HashMap<String, f64>, name: &str) -> f64 {
    metrics.get(name).copied().unwrap_or(0.0)
}

fn nonzero(metrics: &HashMap<String, f64>, name: &str) -> Option<f64> {
    metrics.get(name).copied().filter(|v| *v != 0.0)
}

fn ratio(metrics: &HashMap<String, f64>, num: &str, den: &str) -> Option<f64> {
    Some(round2(get(metrics, num) / nonzero(metrics, den)?))
}

fn pct(metrics: &HashMap<String, f64>, num: &str, den: &str) -> Option<f64> {
    Some(round2(get(metrics, num) / nonzero(metrics, den)? * 100.0))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Pull numeric values out of the extraction map. Entries are either
/// `{ "value": .., "period": .., "source": .. }` or a bare number; nulls
/// and non-numeric values come back as `None`.
pub fn raw_metric_values(metrics: &Map<String, Value>) -> Vec<(String, Option<f64>)> {
    metrics
        .iter()
        .map(|(name, data)| {
            let value = match data {
                Value::Object(obj) => obj.get("value").and_then(Value::as_f64),
                other => other.as_f64(),
            };
            (name.clone(), value)
        })
        .collect()
}

/// Derived metrics in table order: `(name, value, unit)`.
pub fn compute_derived(raw: &HashMap<String, f64>) -> Vec<(String, f64, String)> {
    DERIVED_METRICS
        .iter()
        .filter_map(|(name, unit, formula)| {
            formula(raw).map(|value| (name.to_string(), value, unit.to_string()))
        })
        .collect()
}

/// Percent change per derived metric against the previous period.
pub fn yoy_changes(
    derived: &[(String, f64, String)],
    previous: &HashMap<String, f64>,
) -> HashMap<String, f64> {
    derived
        .iter()
        .filter_map(|(name, value, _)| {
            let prev = previous.get(name).copied().filter(|p| *p != 0.0)?;
            Some((name.clone(), round2((value - prev) / prev * 100.0)))
        })
        .collect()
}

/// Flag derived metrics that breach absolute bounds or jump more than the
/// per-metric year-over-year limit.
pub fn detect_anomalies(
    derived: &[(String, f64, String)],
    previous: &HashMap<String, f64>,
) -> HashMap<String, bool> {
    derived
        .iter()
        .map(|(name, value, _)| {
            let mut is_anomaly = false;
            if let Some((_, threshold)) =
                ANOMALY_THRESHOLDS.iter().find(|(n, _)| n == name)
            {
                if *value < threshold.min || *value > threshold.max {
                    is_anomaly = true;
                }
                if let Some(prev) = previous.get(name).copied().filter(|p| *p != 0.0) {
                    let change = ((value - prev) / prev * 100.0).abs();
                    if change > threshold.yoy {
                        is_anomaly = true;
                    }
                }
            }
            (name.clone(), is_anomaly)
        })
        .collect()
}

/// Extracts, derives, and stores metrics for one filing's financial
/// statements.
pub struct MetricsEngine {
    warehouse: Arc<dyn Warehouse>,
    analyst: FilingAnalyst,
}

impl MetricsEngine {
    pub fn new(warehouse: Arc<dyn Warehouse>, analyst: FilingAnalyst) -> Self {
        Self { warehouse, analyst }
    }

    /// Build metric rows for one filing. Both the raw extracted figures
    /// and the derived ratios become rows; ids are deterministic per
    /// ticker, period, and metric name.
    ///
    /// A filing with no FINANCIAL_STATEMENTS chunks yields no rows.
    pub async fn process_filing_metrics(
        &self,
        filing: &Filing,
    ) -> Result<Vec<FinancialMetric>, AnalysisError> {
        let chunks = self
            .warehouse
            .financial_chunks(&filing.ticker, &filing.sec_document_id, FINANCIAL_CHUNK_LIMIT)
            .await?;
        if chunks.is_empty() {
            info!(
                ticker = %filing.ticker,
                sec_document_id = %filing.sec_document_id,
                "no financial statement chunks, skipping"
            );
            return Ok(Vec::new());
        }
        let text = truncate_chars(&chunks.join("\n\n"), FINANCIAL_TEXT_BUDGET);

        let extraction = self
            .analyst
            .extract_financial_metrics(&text, &filing.company_name)
            .await?;
        if let Some(err) = &extraction.error {
            warn!(ticker = %filing.ticker, error = %err, "metric extraction degraded");
        }

        let raw_values = raw_metric_values(&extraction.metrics);
        let numeric: HashMap<String, f64> = raw_values
            .iter()
            .filter_map(|(name, value)| value.map(|v| (name.clone(), v)))
            .collect();
        let derived = compute_derived(&numeric);

        let previous = self
            .warehouse
            .previous_metrics(&filing.ticker, filing.period_end_date)
            .await?;
        let changes = yoy_changes(&derived, &previous);
        let anomalies = detect_anomalies(&derived, &previous);

        let mut rows = Vec::new();
        for (name, value) in raw_values {
            rows.push(self.metric_row(
                filing,
                &name,
                value,
                "millions_usd".to_string(),
                &changes,
                &anomalies,
                "extracted",
            ));
        }
        for (name, value, unit) in derived {
            rows.push(self.metric_row(
                filing,
                &name,
                Some(value),
                unit,
                &changes,
                &anomalies,
                "computed",
            ));
        }
        Ok(rows)
    }

    #[allow(clippy::too_many_arguments)]
    fn metric_row(
        &self,
        filing: &Filing,
        name: &str,
        value: Option<f64>,
        unit: String,
        changes: &HashMap<String, f64>,
        anomalies: &HashMap<String, bool>,
        source: &str,
    ) -> FinancialMetric {
        FinancialMetric {
            metric_id: format!("{}_{}_{}", filing.ticker, filing.period_end_date, name),
            company_ticker: filing.ticker.clone(),
            filing_type: filing.filing_type.clone(),
            filing_date: filing.period_end_date,
            metric_name: name.to_string(),
            metric_value: value,
            metric_unit: unit,
            yoy_change: changes.get(name).copied(),
            is_anomaly: anomalies.get(name).copied().unwrap_or(false),
            metadata: Some(json!({ "source": source })),
        }
    }

    /// Store rows best effort, returning how many landed.
    pub async fn store_metrics(&self, metrics: &[FinancialMetric]) -> usize {
        let mut stored = 0;
        for metric in metrics {
            match self.warehouse.insert_metric(metric).await {
                Ok(()) => stored += 1,
                Err(err) => {
                    warn!(metric_id = %metric.metric_id, error = %err, "metric insert failed");
                }
            }
        }
        stored
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One extracted or derived financial metric for a company period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialMetric {
    pub metric_id: String,
    pub company_ticker: String,
    pub filing_type: String,
    pub filing_date: NaiveDate,
    pub metric_name: String,
    pub metric_value: Option<f64>,
    /// "millions_usd", "percent", "ratio", ...
    pub metric_unit: String,
    pub yoy_change: Option<f64>,
    pub is_anomaly: bool,
    pub metadata: Option<serde_json::Value>,
}

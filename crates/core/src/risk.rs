use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Supporting quote for a risk finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskEvidence {
    pub text: String,
    pub severity: String,
}

/// One scored risk finding for a company filing period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub assessment_id: String,
    pub company_ticker: String,
    pub filing_date: NaiveDate,
    /// REGULATORY, LITIGATION, FINANCIAL, OPERATIONAL, MARKET, ACCOUNTING.
    pub risk_category: String,
    /// 0-100.
    pub risk_score: f64,
    pub summary: String,
    pub evidence: Vec<RiskEvidence>,
}

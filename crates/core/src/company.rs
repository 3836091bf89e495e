use serde::{Deserialize, Serialize};

/// One of the tracked public companies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub cik: String,
    pub ticker: String,
    pub company_name: String,
    pub sector: Option<String>,
}

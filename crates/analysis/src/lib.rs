//! Derived financial metrics and risk scoring over processed filings.
//!
//! Both engines consume LLM extraction results and warehouse state:
//! [`metrics`] turns raw extracted figures into ratio metrics with
//! year-over-year changes and anomaly flags, [`risk`] merges model
//! findings with keyword red-flag scanning into scored assessments.

pub mod metrics;
pub mod risk;

pub use metrics::{AnalysisError, MetricsEngine};
pub use risk::RiskAnalyzer;

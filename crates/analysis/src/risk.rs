//! Risk assessment: model findings merged with keyword red-flag scanning.

use std::sync::Arc;

use chrono::NaiveDate;
use regex::RegexBuilder;
use tracing::warn;
use uuid::Uuid;

use edgar_core::{RiskAssessment, RiskEvidence};
use edgar_llm::{FilingAnalyst, RiskFinding};
use edgar_warehouse::Warehouse;

use crate::metrics::AnalysisError;

/// Characters of surrounding text kept as evidence for a keyword hit.
const CONTEXT_CHARS: usize = 100;

/// Red-flag keywords per risk category. The first keyword found in a
/// filing produces one finding for that category.
const RED_FLAG_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "LITIGATION",
        &[
            "lawsuit",
            "litigation",
            "legal proceedings",
            "plaintiff",
            "defendant",
            "settlement",
            "damages",
            "injunction",
        ],
    ),
    (
        "ACCOUNTING",
        &[
            "restatement",
            "material weakness",
            "going concern",
            "auditor change",
            "internal control deficiency",
            "irregularities",
        ],
    ),
    (
        "FINANCIAL",
        &[
            "default",
            "covenant violation",
            "liquidity concerns",
            "credit downgrade",
            "impairment",
            "write-off",
        ],
    ),
    (
        "REGULATORY",
        &[
            "investigation",
            "subpoena",
            "SEC inquiry",
            "DOJ",
            "enforcement action",
            "consent decree",
            "penalty",
        ],
    ),
];

/// Category weights for the overall score, accounting concerns weighted
/// heaviest.
const CATEGORY_WEIGHTS: &[(&str, f64)] = &[
    ("ACCOUNTING", 1.5),
    ("FINANCIAL", 1.3),
    ("LITIGATION", 1.2),
    ("REGULATORY", 1.1),
    ("OPERATIONAL", 1.0),
    ("MARKET", 0.9),
];

/// 0-100 score for a severity label; unknown labels score as MEDIUM.
pub fn severity_score(severity: &str) -> f64 {
    match severity.to_uppercase().as_str() {
        "LOW" => 25.0,
        "MEDIUM" => 50.0,
        "HIGH" => 75.0,
        "CRITICAL" => 100.0,
        _ => 50.0,
    }
}

/// Merges LLM risk findings with keyword scanning into scored, storable
/// assessments.
pub struct RiskAnalyzer {
    warehouse: Arc<dyn Warehouse>,
    analyst: FilingAnalyst,
    keyword_patterns: Vec<(&'static str, &'static str, regex::Regex)>,
}

impl RiskAnalyzer {
    pub fn new(warehouse: Arc<dyn Warehouse>, analyst: FilingAnalyst) -> Self {
        let keyword_patterns = RED_FLAG_KEYWORDS
            .iter()
            .flat_map(|(category, keywords)| {
                keywords.iter().map(|keyword| {
                    let pattern = RegexBuilder::new(&regex::escape(keyword))
                        .case_insensitive(true)
                        .build()
                        .expect("escaped keyword is a valid pattern");
                    (*category, *keyword, pattern)
                })
            })
            .collect();
        Self {
            warehouse,
            analyst,
            keyword_patterns,
        }
    }

    /// Run the model analysis, add keyword findings for categories the
    /// model missed, and score everything.
    pub async fn analyze_filing(
        &self,
        filing_text: &str,
        ticker: &str,
        company_name: &str,
        filing_date: NaiveDate,
    ) -> Result<Vec<RiskAssessment>, AnalysisError> {
        let analysis = self.analyst.analyze_risks(filing_text, company_name).await?;
        if let Some(err) = &analysis.error {
            warn!(ticker, error = %err, "risk analysis degraded, keyword findings only");
        }

        let keyword_findings = self.detect_keyword_risks(filing_text);
        let merged = merge_findings(analysis.risks, keyword_findings);

        Ok(merged
            .into_iter()
            .map(|finding| {
                let category = normalize_category(&finding.category);
                let severity = if finding.severity.is_empty() {
                    "MEDIUM".to_string()
                } else {
                    finding.severity.to_uppercase()
                };
                RiskAssessment {
                    assessment_id: format!(
                        "{ticker}_{filing_date}_{category}_{}",
                        &Uuid::new_v4().simple().to_string()[..8]
                    ),
                    company_ticker: ticker.to_string(),
                    filing_date,
                    risk_category: category,
                    risk_score: severity_score(&severity),
                    summary: finding.description,
                    evidence: vec![RiskEvidence {
                        text: finding.evidence,
                        severity,
                    }],
                }
            })
            .collect())
    }

    /// Scan for red-flag keywords, at most one finding per category, with
    /// the surrounding text as evidence.
    pub fn detect_keyword_risks(&self, text: &str) -> Vec<RiskFinding> {
        let mut findings = Vec::new();
        let mut last_category = "";
        for (category, keyword, pattern) in &self.keyword_patterns {
            if *category == last_category {
                continue;
            }
            if let Some(m) = pattern.find(text) {
                findings.push(RiskFinding {
                    category: category.to_string(),
                    severity: "MEDIUM".to_string(),
                    description: format!("Mention of '{keyword}' detected"),
                    evidence: format!("...{}...", context_around(text, m.start(), m.end())),
                });
                last_category = *category;
            }
        }
        findings
    }

    /// Average assessment score weighted by category.
    pub fn overall_risk_score(assessments: &[RiskAssessment]) -> f64 {
        if assessments.is_empty() {
            return 0.0;
        }
        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;
        for assessment in assessments {
            let weight = CATEGORY_WEIGHTS
                .iter()
                .find(|(cat, _)| *cat == assessment.risk_category)
                .map_or(1.0, |(_, w)| *w);
            weighted_sum += assessment.risk_score * weight;
            total_weight += weight;
        }
        (weighted_sum / total_weight * 100.0).round() / 100.0
    }

    /// Store assessments best effort, returning how many landed.
    pub async fn store_assessments(&self, assessments: &[RiskAssessment]) -> usize {
        let mut stored = 0;
        for assessment in assessments {
            match self.warehouse.insert_assessment(assessment).await {
                Ok(()) => stored += 1,
                Err(err) => {
                    warn!(
                        assessment_id = %assessment.assessment_id,
                        error = %err,
                        "assessment insert failed"
                    );
                }
            }
        }
        stored
    }
}

fn normalize_category(category: &str) -> String {
    if category.trim().is_empty() {
        "OPERATIONAL".to_string()
    } else {
        category.to_uppercase()
    }
}

/// Model findings win; keyword findings only fill categories the model
/// did not report.
fn merge_findings(model: Vec<RiskFinding>, keyword: Vec<RiskFinding>) -> Vec<RiskFinding> {
    let mut seen: Vec<String> = Vec::new();
    let mut merged = Vec::new();
    for finding in model.into_iter().chain(keyword) {
        let category = normalize_category(&finding.category);
        if !seen.contains(&category) {
            seen.push(category);
            merged.push(finding);
        }
    }
    merged
}

/// Up to `CONTEXT_CHARS` characters either side of the match, snapped to
/// character boundaries.
fn context_around(text: &str, start: usize, end: usize) -> &str {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(CONTEXT_CHARS)
        .last()
        .map_or(start, |(i, _)| i);
    let to = text[end..]
        .char_indices()
        .nth(CONTEXT_CHARS)
        .map_or(text.len(), |(i, _)| end + i);
    &text[from..to]
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use edgar_llm::{LlmError, LlmProvider, Message};
    use edgar_warehouse::MemoryWarehouse;

    use super::*;

    struct CannedProvider(String);

    #[async_trait]
    impl LlmProvider for CannedProvider {
        async fn complete(
            &self,
            _messages: Vec<Message>,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            Ok(self.0.clone())
        }
    }

    fn analyzer(response: &str) -> (Arc<MemoryWarehouse>, RiskAnalyzer) {
        let warehouse = Arc::new(MemoryWarehouse::new());
        let analyst = FilingAnalyst::new(Box::new(CannedProvider(response.to_string())), 4096);
        (warehouse.clone(), RiskAnalyzer::new(warehouse, analyst))
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
    }

    #[test]
    fn severity_scores_map_to_fixed_points() {
        assert_eq!(severity_score("LOW"), 25.0);
        assert_eq!(severity_score("medium"), 50.0);
        assert_eq!(severity_score("HIGH"), 75.0);
        assert_eq!(severity_score("CRITICAL"), 100.0);
        assert_eq!(severity_score("whatever"), 50.0);
    }

    #[test]
    fn keyword_scan_yields_one_finding_per_category() {
        let (_, analyzer) = analyzer("{}");
        let text = "The company faces a lawsuit and further litigation. \
                    A restatement of prior results is expected. \
                    An investigation by regulators is ongoing.";
        let findings = analyzer.detect_keyword_risks(text);
        let categories: Vec<&str> = findings.iter().map(|f| f.category.as_str()).collect();
        assert_eq!(categories, vec!["LITIGATION", "ACCOUNTING", "REGULATORY"]);
        assert!(findings[0].description.contains("lawsuit"));
        assert!(findings[0].evidence.contains("lawsuit"));
    }

    #[test]
    fn keyword_evidence_carries_surrounding_context() {
        let (_, analyzer) = analyzer("{}");
        let pad = "x".repeat(300);
        let text = format!("{pad} impairment {pad}");
        let findings = analyzer.detect_keyword_risks(&text);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, "FINANCIAL");
        // keyword plus 100 chars each side plus ellipses
        let len = findings[0].evidence.chars().count();
        assert_eq!(len, "impairment".len() + 2 * CONTEXT_CHARS + 6);
    }

    #[test]
    fn merge_prefers_model_findings_per_category() {
        let model = vec![RiskFinding {
            category: "LITIGATION".into(),
            severity: "HIGH".into(),
            description: "Pending class action".into(),
            evidence: "quote".into(),
        }];
        let keyword = vec![
            RiskFinding {
                category: "LITIGATION".into(),
                severity: "MEDIUM".into(),
                description: "Mention of 'lawsuit' detected".into(),
                evidence: "...".into(),
            },
            RiskFinding {
                category: "REGULATORY".into(),
                severity: "MEDIUM".into(),
                description: "Mention of 'subpoena' detected".into(),
                evidence: "...".into(),
            },
        ];
        let merged = merge_findings(model, keyword);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].description, "Pending class action");
        assert_eq!(merged[1].category, "REGULATORY");
    }

    #[test]
    fn overall_score_weights_accounting_heaviest() {
        let mk = |category: &str, score: f64| RiskAssessment {
            assessment_id: "id".into(),
            company_ticker: "AAPL".into(),
            filing_date: date(),
            risk_category: category.into(),
            risk_score: score,
            summary: String::new(),
            evidence: Vec::new(),
        };
        assert_eq!(RiskAnalyzer::overall_risk_score(&[]), 0.0);

        let even = RiskAnalyzer::overall_risk_score(&[mk("MARKET", 50.0), mk("MARKET", 50.0)]);
        assert_eq!(even, 50.0);

        // 75 weighted 1.5 vs 25 weighted 0.9 pulls above the plain mean.
        let skewed =
            RiskAnalyzer::overall_risk_score(&[mk("ACCOUNTING", 75.0), mk("MARKET", 25.0)]);
        assert!(skewed > 50.0);
    }

    #[tokio::test]
    async fn analyze_filing_scores_and_ids_assessments() {
        let (_, analyzer) = analyzer(
            r#"{"risks": [{"category": "FINANCIAL", "severity": "HIGH",
                 "description": "Covenant pressure", "evidence": "net leverage rose"}]}"#,
        );
        let assessments = analyzer
            .analyze_filing("clean text without red flags", "AAPL", "Apple Inc.", date())
            .await
            .unwrap();

        assert_eq!(assessments.len(), 1);
        let a = &assessments[0];
        assert!(a.assessment_id.starts_with("AAPL_2024-12-31_FINANCIAL_"));
        assert_eq!(a.assessment_id.len(), "AAPL_2024-12-31_FINANCIAL_".len() + 8);
        assert_eq!(a.risk_score, 75.0);
        assert_eq!(a.summary, "Covenant pressure");
        assert_eq!(a.evidence[0].severity, "HIGH");
    }

    #[tokio::test]
    async fn unparseable_model_output_still_yields_keyword_assessments() {
        let (_, analyzer) = analyzer("no json here");
        let assessments = analyzer
            .analyze_filing(
                "a covenant violation occurred during the quarter",
                "AAPL",
                "Apple Inc.",
                date(),
            )
            .await
            .unwrap();
        assert_eq!(assessments.len(), 1);
        assert_eq!(assessments[0].risk_category, "FINANCIAL");
        assert_eq!(assessments[0].risk_score, 50.0);
    }

    #[tokio::test]
    async fn store_assessments_counts_inserts() {
        let (warehouse, analyzer) = analyzer(
            r#"{"risks": [{"category": "MARKET", "severity": "LOW",
                 "description": "Competitive pressure", "evidence": "..."}]}"#,
        );
        let assessments = analyzer
            .analyze_filing("text", "AAPL", "Apple Inc.", date())
            .await
            .unwrap();
        let stored = analyzer.store_assessments(&assessments).await;
        assert_eq!(stored, 1);
        assert_eq!(warehouse.stored_assessments().len(), 1);
    }
}

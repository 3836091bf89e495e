//! Filing-analysis tasks over an [`LlmProvider`].
//!
//! Every task returns a typed result with an explicit `error` marker:
//! malformed or non-JSON model output degrades to a result carrying that
//! marker, never an `Err`. Transport and API failures still propagate as
//! [`LlmError`] so call sites can count them.

use edgar_core::config::LlmConfig;
use edgar_core::DocumentChunk;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::provider::{LlmError, LlmProvider, Message};
use crate::providers::create_provider;

/// Character budgets for filing text sent to the model.
const RISK_TEXT_BUDGET: usize = 8_000;
const METRIC_TEXT_BUDGET: usize = 10_000;
const COMPARE_TEXT_BUDGET: usize = 5_000;

const PARSE_FAILED: &str = "Failed to parse response";

// ── Result types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskFinding {
    pub category: String,
    pub severity: String,
    pub description: String,
    pub evidence: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskAnalysis {
    pub risks: Vec<RiskFinding>,
    /// Set when the model's output could not be parsed.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricExtraction {
    /// Metric name -> `{ "value": .., "period": .., "source": .. }` (or a
    /// bare number — the model does not always honor the shape).
    pub metrics: Map<String, Value>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QaAnswer {
    pub answer: String,
    pub confidence: String,
    pub sources: Vec<String>,
    pub caveats: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeSummary {
    pub summary: String,
    pub additions: Vec<String>,
    pub removals: Vec<String>,
    pub tone_changes: Vec<String>,
    pub red_flags: Vec<String>,
    pub significance: String,
    pub error: Option<String>,
}

// ── Analyst ─────────────────────────────────────────────────────────

/// Task-level wrapper around an LLM provider for SEC filing analysis.
pub struct FilingAnalyst {
    provider: Box<dyn LlmProvider>,
    max_tokens: u32,
}

impl FilingAnalyst {
    pub fn new(provider: Box<dyn LlmProvider>, max_tokens: u32) -> Self {
        Self {
            provider,
            max_tokens,
        }
    }

    /// Build from config, creating the configured provider.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let provider = create_provider(config)?;
        Ok(Self::new(provider, config.max_tokens))
    }

    async fn generate(
        &self,
        system: &str,
        prompt: String,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let messages = vec![Message::system(system), Message::user(prompt)];
        self.provider
            .complete(messages, temperature, self.max_tokens)
            .await
    }

    /// Identify and categorize risks in a filing excerpt.
    pub async fn analyze_risks(
        &self,
        filing_text: &str,
        company_name: &str,
    ) -> Result<RiskAnalysis, LlmError> {
        let system = "You are a financial analyst specializing in SEC filing analysis. \
             Analyze the provided text and identify key risks and red flags. \
             Return your analysis as structured JSON.";
        let prompt = format!(
            "Analyze the following SEC filing excerpt for {company_name}.\n\
             Identify and categorize risks into these categories:\n\
             - REGULATORY: Regulatory and compliance risks\n\
             - LITIGATION: Legal proceedings and litigation risks\n\
             - FINANCIAL: Financial and credit risks\n\
             - OPERATIONAL: Operational and business risks\n\
             - MARKET: Market and competitive risks\n\
             - ACCOUNTING: Accounting and reporting concerns\n\n\
             For each risk found, provide:\n\
             - category: One of the categories above\n\
             - severity: LOW, MEDIUM, or HIGH\n\
             - description: Brief description of the risk\n\
             - evidence: Quote from the text supporting this finding\n\n\
             Return as JSON with format: {{\"risks\": [...]}}\n\n\
             Filing text:\n{}",
            truncate_chars(filing_text, RISK_TEXT_BUDGET)
        );

        let response = self.generate(system, prompt, 0.3).await?;
        Ok(match parse_response::<RiskAnalysis>(&response) {
            Some(analysis) => analysis,
            None => {
                warn!(company = company_name, "risk analysis response was not valid JSON");
                RiskAnalysis {
                    risks: Vec::new(),
                    error: Some(PARSE_FAILED.to_string()),
                }
            }
        })
    }

    /// Extract named financial metrics from a filing excerpt.
    pub async fn extract_financial_metrics(
        &self,
        filing_text: &str,
        company_name: &str,
    ) -> Result<MetricExtraction, LlmError> {
        let system = "You are a financial analyst specializing in extracting \
             structured financial data from SEC filings. \
             Extract precise numerical values and return as structured JSON.";
        let prompt = format!(
            "Extract the following financial metrics from this SEC filing for {company_name}.\n\n\
             Required metrics (extract actual values, use null if not found):\n\
             - revenue: Total revenue/net sales\n\
             - gross_profit: Gross profit\n\
             - operating_income: Operating income\n\
             - net_income: Net income\n\
             - total_assets: Total assets\n\
             - total_liabilities: Total liabilities\n\
             - shareholders_equity: Total shareholders' equity\n\
             - total_debt: Total debt (long-term + short-term)\n\
             - current_assets: Current assets\n\
             - current_liabilities: Current liabilities\n\
             - inventory: Total inventory\n\
             - ebit: Earnings before interest and taxes\n\
             - interest_expense: Interest expense\n\
             - eps: Earnings per share (diluted)\n\n\
             For each metric, provide:\n\
             - value: The numerical value (in millions USD unless specified)\n\
             - period: The fiscal period (e.g., \"FY2023\", \"Q3 2023\")\n\
             - source: Brief quote showing where this was found\n\n\
             Return as JSON: {{\"metrics\": {{\"metric_name\": {{\"value\": X, \"period\": \"...\", \"source\": \"...\"}}}}}}\n\n\
             Filing text:\n{}",
            truncate_chars(filing_text, METRIC_TEXT_BUDGET)
        );

        let response = self.generate(system, prompt, 0.1).await?;
        Ok(match parse_response::<MetricExtraction>(&response) {
            Some(extraction) => extraction,
            None => {
                warn!(company = company_name, "metric extraction response was not valid JSON");
                MetricExtraction {
                    metrics: Map::new(),
                    error: Some(PARSE_FAILED.to_string()),
                }
            }
        })
    }

    /// Answer a question over retrieved chunk context.
    pub async fn answer_question(
        &self,
        question: &str,
        context_chunks: &[DocumentChunk],
        company_name: &str,
    ) -> Result<QaAnswer, LlmError> {
        let system = "You are a helpful financial analyst assistant. \
             Answer questions about companies based on their SEC filings. \
             Always cite your sources and be precise with financial information. \
             If you're uncertain, say so clearly.";

        let context = context_chunks
            .iter()
            .map(|c| {
                format!(
                    "[Source: {} - {} filed {}]\n{}",
                    c.section_name, c.filing_type, c.period_end_date, c.chunk_text
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");

        let prompt = format!(
            "Based on the following SEC filing excerpts for {company_name},\n\
             answer this question: {question}\n\n\
             Context from SEC filings:\n{context}\n\n\
             Provide a clear, concise answer. Include specific citations to the filing sections.\n\
             If the context doesn't contain enough information to answer fully, say so.\n\n\
             Format your response as JSON:\n\
             {{\n\
                 \"answer\": \"Your detailed answer here\",\n\
                 \"confidence\": \"HIGH/MEDIUM/LOW\",\n\
                 \"sources\": [\"List of sections/filings used\"],\n\
                 \"caveats\": [\"Any limitations or uncertainties\"]\n\
             }}"
        );

        let response = self.generate(system, prompt, 0.3).await?;
        Ok(match parse_response::<QaAnswer>(&response) {
            Some(answer) => answer,
            // Plain-prose answers are still useful; keep the raw text.
            None => QaAnswer {
                answer: response,
                confidence: "LOW".to_string(),
                sources: Vec::new(),
                caveats: vec!["Response parsing failed".to_string()],
                error: Some(PARSE_FAILED.to_string()),
            },
        })
    }

    /// Compare two versions of a filing section and summarize the changes.
    pub async fn summarize_changes(
        &self,
        current_text: &str,
        previous_text: &str,
        section_name: &str,
        company_name: &str,
    ) -> Result<ChangeSummary, LlmError> {
        let system = "You are a financial analyst tracking changes in SEC filings. \
             Compare two versions of a filing section and identify significant changes.";
        let prompt = format!(
            "Compare these two versions of the {section_name} section for {company_name}.\n\n\
             PREVIOUS VERSION:\n{}\n\n\
             CURRENT VERSION:\n{}\n\n\
             Identify:\n\
             1. New risks or concerns added\n\
             2. Risks removed or reduced\n\
             3. Changes in language tone or severity\n\
             4. New legal or regulatory mentions\n\
             5. Any red flags\n\n\
             Return as JSON:\n\
             {{\n\
                 \"summary\": \"Brief overall summary of changes\",\n\
                 \"additions\": [\"List of new content/risks\"],\n\
                 \"removals\": [\"List of removed content\"],\n\
                 \"tone_changes\": [\"Notable changes in language\"],\n\
                 \"red_flags\": [\"Any concerning changes\"],\n\
                 \"significance\": \"HIGH/MEDIUM/LOW\"\n\
             }}",
            truncate_chars(previous_text, COMPARE_TEXT_BUDGET),
            truncate_chars(current_text, COMPARE_TEXT_BUDGET),
        );

        let response = self.generate(system, prompt, 0.3).await?;
        Ok(match parse_response::<ChangeSummary>(&response) {
            Some(summary) => summary,
            None => ChangeSummary {
                summary: response,
                significance: "UNKNOWN".to_string(),
                error: Some(PARSE_FAILED.to_string()),
                ..Default::default()
            },
        })
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// First `max_chars` Unicode scalar values of `text`.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn parse_response<T: serde::de::DeserializeOwned>(response: &str) -> Option<T> {
    let json = extract_json(response);
    debug!(len = json.len(), "parsing model response");
    serde_json::from_str(json).ok()
}

/// Extract JSON from an LLM response, handling markdown code blocks.
fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    // Handle ```json ... ``` blocks
    if let Some(start) = trimmed.find("```json") {
        let json_start = start + 7;
        if let Some(end) = trimmed[json_start..].find("```") {
            return trimmed[json_start..json_start + end].trim();
        }
    }

    // Handle ``` ... ``` blocks
    if let Some(start) = trimmed.find("```") {
        let json_start = start + 3;
        // Skip past any language identifier on the same line
        let after_tick = &trimmed[json_start..];
        let content_start = after_tick.find('\n').map_or(0, |n| n + 1);
        if let Some(end) = after_tick[content_start..].find("```") {
            return after_tick[content_start..content_start + end].trim();
        }
    }

    // Try raw JSON (starts with {)
    if let Some(start) = trimmed.find('{') {
        if let Some(end) = trimmed.rfind('}') {
            return &trimmed[start..=end];
        }
    }

    trimmed
}

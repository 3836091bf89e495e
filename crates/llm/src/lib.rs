pub mod analysis;
pub mod provider;
pub mod providers;

pub use analysis::{
    ChangeSummary, FilingAnalyst, MetricExtraction, QaAnswer, RiskAnalysis, RiskFinding,
};
pub use provider::{LlmError, LlmProvider, Message, Role};
pub use providers::claude::ClaudeProvider;

pub mod claude;

use edgar_core::config::LlmConfig;

use crate::provider::{LlmError, LlmProvider};
use claude::ClaudeProvider;

/// Build the configured provider, failing fast when no API key is set.
pub fn create_provider(config: &LlmConfig) -> Result<Box<dyn LlmProvider>, LlmError> {
    let api_key = config
        .anthropic_api_key
        .clone()
        .filter(|k| k != "YOUR_ANTHROPIC_API_KEY_HERE")
        .ok_or_else(|| {
            LlmError::NotConfigured("ANTHROPIC_API_KEY is not set".to_string())
        })?;
    Ok(Box::new(ClaudeProvider::new(api_key, config.model.clone())))
}

use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u32(key: &str, default: u32) -> u32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f32(key: &str, default: f32) -> f32 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Tickers processed by default when no explicit list is configured.
const DEFAULT_TARGET_COMPANIES: &[&str] = &[
    "AAPL", "MSFT", "GOOGL", // Technology
    "JPM", "BAC", // Financials
    "JNJ", "UNH", // Healthcare
    "XOM", "CVX", // Energy
    "WMT", "PG", // Consumer Staples
    "CAT", "UPS", // Industrials
    "AMT", // Real Estate
    "NEE", // Utilities
];

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub warehouse: WarehouseConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub processing: ProcessingConfig,
    /// Tickers to process in batch runs.
    pub target_companies: Vec<String>,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        let target_companies = env_opt("TARGET_COMPANIES")
            .map(|v| {
                v.split(',')
                    .map(|t| t.trim().to_uppercase())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_else(|| {
                DEFAULT_TARGET_COMPANIES.iter().map(|t| t.to_string()).collect()
            });

        Self {
            warehouse: WarehouseConfig::from_env(),
            llm: LlmConfig::from_env(),
            embedding: EmbeddingConfig::from_env(),
            processing: ProcessingConfig::from_env(),
            target_companies,
        }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!(
            "  warehouse:  account={}, sec_db={}, app_db={}",
            self.warehouse.account,
            self.warehouse.sec_db(),
            self.warehouse.app_db()
        );
        tracing::info!(
            "  llm:        model={}, configured={}",
            self.llm.model,
            self.llm.is_configured()
        );
        tracing::info!(
            "  embedding:  model={}, dimensions={}",
            self.embedding.model,
            self.embedding.dimensions
        );
        tracing::info!(
            "  processing: chunk_size={}, chunk_overlap={}",
            self.processing.chunk_size,
            self.processing.chunk_overlap
        );
        tracing::info!("  companies:  {} tickers", self.target_companies.len());
    }
}

// ── Warehouse (Snowflake) ─────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    pub account: String,
    pub user: String,
    pub password: Option<String>,
    pub warehouse: String,
    pub role: String,
    /// Shared read-only SEC filing database.
    pub sec_database: String,
    pub sec_schema: String,
    /// Writable application database.
    pub app_database: String,
    pub app_schema: String,
}

impl WarehouseConfig {
    fn from_env() -> Self {
        Self {
            account: env_or("SNOWFLAKE_ACCOUNT", ""),
            user: env_or("SNOWFLAKE_USER", ""),
            password: env_opt("SNOWFLAKE_PASSWORD"),
            warehouse: env_or("SNOWFLAKE_WAREHOUSE", "COMPUTE_WH"),
            role: env_or("SNOWFLAKE_ROLE", "ACCOUNTADMIN"),
            sec_database: env_or("SEC_DATABASE", "SEC_FILINGS_DEMO_DATA"),
            sec_schema: env_or("SEC_SCHEMA", "CYBERSYN"),
            app_database: env_or("APP_DATABASE", "COMPANY_INTELLIGENCE"),
            app_schema: env_or("APP_SCHEMA", "APP_DATA"),
        }
    }

    /// Fully qualified SEC database.schema.
    pub fn sec_db(&self) -> String {
        format!("{}.{}", self.sec_database, self.sec_schema)
    }

    /// Fully qualified app database.schema.
    pub fn app_db(&self) -> String {
        format!("{}.{}", self.app_database, self.app_schema)
    }

    pub fn is_configured(&self) -> bool {
        !self.account.is_empty() && !self.user.is_empty() && self.password.is_some()
    }
}

// ── LLM (Anthropic) ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub anthropic_api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    fn from_env() -> Self {
        Self {
            anthropic_api_key: env_opt("ANTHROPIC_API_KEY"),
            model: env_or("ANTHROPIC_MODEL", "claude-sonnet-4-20250514"),
            temperature: env_f32("LLM_TEMPERATURE", 0.3),
            max_tokens: env_u32("LLM_MAX_TOKENS", 4096),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.anthropic_api_key
            .as_deref()
            .is_some_and(|k| k != "YOUR_ANTHROPIC_API_KEY_HERE")
    }
}

// ── Embedding ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimensions: u32,
    pub batch_size: usize,
}

impl EmbeddingConfig {
    fn from_env() -> Self {
        Self {
            model: env_or("EMBEDDING_MODEL", "snowflake-arctic-embed-m"),
            dimensions: env_u32("EMBEDDING_DIMENSIONS", 768),
            batch_size: env_usize("EMBEDDING_BATCH_SIZE", 50),
        }
    }
}

// ── Document processing ───────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters carried from one chunk into the next.
    pub chunk_overlap: usize,
}

impl ProcessingConfig {
    fn from_env() -> Self {
        Self {
            chunk_size: env_usize("CHUNK_SIZE", 1500),
            chunk_overlap: env_usize("CHUNK_OVERLAP", 200),
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_overlap: 200,
        }
    }
}

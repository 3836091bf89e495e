use clap::{Parser, Subcommand};

/// Batch processor for SEC filing intelligence: chunks filings, generates
/// embeddings, extracts financial metrics, and scores risks.
#[derive(Parser, Debug)]
#[command(name = "edgar-batch", version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Restrict the run to these tickers (defaults to the configured
    /// target companies).
    #[arg(long, value_delimiter = ',', global = true)]
    pub tickers: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Chunk filings into the document store.
    Process {
        /// Only process filings of this form type, e.g. 10-K.
        #[arg(long)]
        filing_type: Option<String>,

        /// Most recent filings per company.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Generate embeddings for chunks that do not have one yet.
    Embed,
    /// Extract financial metrics from 10-K financial statements.
    Metrics,
    /// Run risk analysis over recent filings.
    Risks,
    /// Run the full pipeline: process, embed, metrics, risks.
    All,
}

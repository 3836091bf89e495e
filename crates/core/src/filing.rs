use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Metadata row for one SEC filing, as listed by the warehouse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filing {
    /// Globally unique document id assigned by the data provider.
    pub sec_document_id: String,
    /// SEC Central Index Key.
    pub cik: String,
    /// SEC accession number.
    pub adsh: String,
    pub ticker: String,
    pub company_name: String,
    /// Form type: "10-K", "10-Q", "8-K".
    pub filing_type: String,
    pub period_end_date: NaiveDate,
    pub sector: Option<String>,
}

/// A filing's metadata plus its full plain-text body.
///
/// The body is immutable input — processing only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingText {
    #[serde(flatten)]
    pub filing: Filing,
    pub body: String,
}

/// Free-form chunk metadata stored alongside the chunk row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub sec_document_id: String,
    pub char_count: usize,
}

/// One bounded span of a filing section, sized for embedding and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// `{sec_document_id}_{section_name}_{chunk_index}` — identical ids on
    /// reprocessing, so downstream storage can upsert.
    pub chunk_id: String,
    pub cik: String,
    pub company_ticker: String,
    pub company_name: String,
    pub filing_type: String,
    pub adsh: String,
    pub period_end_date: NaiveDate,
    pub section_name: String,
    pub chunk_text: String,
    /// 0-based, unique within the filing across all sections.
    pub chunk_index: usize,
    pub metadata: ChunkMetadata,
}

impl Filing {
    /// Map a provider document type label to the plain form type,
    /// e.g. "10-K Filing Text" -> "10-K".
    pub fn form_type_from_document_type(document_type: &str) -> String {
        document_type
            .strip_suffix(" Filing Text")
            .unwrap_or(document_type)
            .to_string()
    }
}

//! Snowflake SQL REST API client.
//!
//! Executes parameterized statements via `POST /api/v2/statements`,
//! authenticated with a programmatic access token. Reads hit the shared SEC
//! filing views; writes go to the application database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use edgar_core::config::WarehouseConfig;
use edgar_core::{
    ChunkMetadata, Company, DocumentChunk, Filing, FilingText, FinancialMetric, RiskAssessment,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::traits::{ChunkRef, Warehouse, WarehouseError};

pub struct SnowflakeClient {
    client: Client,
    config: WarehouseConfig,
    base_url: String,
}

impl SnowflakeClient {
    /// Fails fast when account/user/token are missing — a misconfigured
    /// warehouse is a deployment error, not a runtime condition.
    pub fn new(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if !config.is_configured() {
            return Err(WarehouseError::NotConfigured(
                "SNOWFLAKE_ACCOUNT, SNOWFLAKE_USER and SNOWFLAKE_PASSWORD must be set".to_string(),
            ));
        }
        let base_url = format!("https://{}.snowflakecomputing.com", config.account);
        Ok(Self {
            client: Client::new(),
            config,
            base_url,
        })
    }

    /// Execute one statement with positional binds, returning column names
    /// and string-typed rows.
    async fn execute(
        &self,
        statement: &str,
        binds: &[Value],
    ) -> Result<(Vec<String>, Vec<Vec<Option<String>>>), WarehouseError> {
        let bindings: serde_json::Map<String, Value> = binds
            .iter()
            .enumerate()
            .map(|(i, v)| {
                // The SQL API takes every bind as a typed string (or null).
                let (type_name, value) = match v {
                    Value::Null => ("TEXT", Value::Null),
                    Value::Bool(b) => ("BOOLEAN", json!(b.to_string())),
                    Value::Number(n) if n.is_f64() => ("REAL", json!(n.to_string())),
                    Value::Number(n) => ("FIXED", json!(n.to_string())),
                    Value::String(s) => ("TEXT", json!(s)),
                    other => ("TEXT", json!(other.to_string())),
                };
                ((i + 1).to_string(), json!({ "type": type_name, "value": value }))
            })
            .collect();

        let body = json!({
            "statement": statement,
            "bindings": bindings,
            "warehouse": self.config.warehouse,
            "role": self.config.role,
        });

        debug!(statement, "executing warehouse statement");

        let token = self.config.password.as_deref().unwrap_or_default();
        let response = self
            .client
            .post(format!("{}/api/v2/statements", self.base_url))
            .bearer_auth(token)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.text().await.unwrap_or_default();
            return Err(WarehouseError::Api { status, body });
        }

        let parsed: StatementResponse = response
            .json()
            .await
            .map_err(|e| WarehouseError::Decode(e.to_string()))?;

        let columns = parsed
            .result_set_meta_data
            .map(|m| m.row_type.into_iter().map(|c| c.name).collect())
            .unwrap_or_default();
        Ok((columns, parsed.data.unwrap_or_default()))
    }

    fn app_db(&self) -> String {
        self.config.app_db()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    result_set_meta_data: Option<ResultSetMetaData>,
    data: Option<Vec<Vec<Option<String>>>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColumnType {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultSetMetaData {
    row_type: Vec<ColumnType>,
}

// ── Row decoding ────────────────────────────────────────────────────

fn col<'a>(
    columns: &[String],
    row: &'a [Option<String>],
    name: &str,
) -> Result<&'a str, WarehouseError> {
    col_opt(columns, row, name)?
        .ok_or_else(|| WarehouseError::Decode(format!("column {name} is NULL")))
}

fn col_opt<'a>(
    columns: &[String],
    row: &'a [Option<String>],
    name: &str,
) -> Result<Option<&'a str>, WarehouseError> {
    let idx = columns
        .iter()
        .position(|c| c == name)
        .ok_or_else(|| WarehouseError::Decode(format!("missing column {name}")))?;
    Ok(row.get(idx).and_then(|v| v.as_deref()))
}

fn col_date(
    columns: &[String],
    row: &[Option<String>],
    name: &str,
) -> Result<NaiveDate, WarehouseError> {
    let raw = col(columns, row, name)?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| WarehouseError::Decode(format!("bad date in {name}: {raw}: {e}")))
}

fn decode_filing(columns: &[String], row: &[Option<String>]) -> Result<Filing, WarehouseError> {
    Ok(Filing {
        sec_document_id: col(columns, row, "SEC_DOCUMENT_ID")?.to_string(),
        cik: col(columns, row, "CIK")?.to_string(),
        adsh: col_opt(columns, row, "ADSH")?.unwrap_or_default().to_string(),
        ticker: col(columns, row, "TICKER")?.to_string(),
        company_name: col(columns, row, "COMPANY_NAME")?.to_string(),
        filing_type: Filing::form_type_from_document_type(col(columns, row, "DOCUMENT_TYPE")?),
        period_end_date: col_date(columns, row, "PERIOD_END_DATE")?,
        sector: col_opt(columns, row, "SECTOR")?.map(str::to_string),
    })
}

#[async_trait]
impl Warehouse for SnowflakeClient {
    async fn list_companies(&self) -> Result<Vec<Company>, WarehouseError> {
        let statement = format!(
            "SELECT CIK, TICKER, COMPANY_NAME, SECTOR \
             FROM {}.target_companies WHERE IS_ACTIVE = TRUE ORDER BY TICKER",
            self.app_db()
        );
        let (columns, rows) = self.execute(&statement, &[]).await?;
        rows.iter()
            .map(|row| {
                Ok(Company {
                    cik: col(&columns, row, "CIK")?.to_string(),
                    ticker: col(&columns, row, "TICKER")?.to_string(),
                    company_name: col(&columns, row, "COMPANY_NAME")?.to_string(),
                    sector: col_opt(&columns, row, "SECTOR")?.map(str::to_string),
                })
            })
            .collect()
    }

    async fn list_filings(
        &self,
        ticker: Option<&str>,
        filing_type: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Filing>, WarehouseError> {
        let mut conditions = vec!["1=1".to_string()];
        let mut binds = Vec::new();

        if let Some(ticker) = ticker {
            conditions.push("TICKER = ?".to_string());
            binds.push(json!(ticker.to_uppercase()));
        }
        if let Some(filing_type) = filing_type {
            // The provider labels full-text rows "{form} Filing Text".
            conditions.push("DOCUMENT_TYPE = ?".to_string());
            binds.push(json!(format!("{filing_type} Filing Text")));
        }

        let statement = format!(
            "SELECT SEC_DOCUMENT_ID, CIK, ADSH, TICKER, COMPANY_NAME, DOCUMENT_TYPE, \
             PERIOD_END_DATE, SECTOR \
             FROM {}.v_sec_filing_text WHERE {} \
             ORDER BY PERIOD_END_DATE DESC LIMIT {limit}",
            self.app_db(),
            conditions.join(" AND "),
        );
        let (columns, rows) = self.execute(&statement, &binds).await?;
        rows.iter().map(|row| decode_filing(&columns, row)).collect()
    }

    async fn fetch_filing(
        &self,
        sec_document_id: &str,
    ) -> Result<Option<FilingText>, WarehouseError> {
        let statement = format!(
            "SELECT SEC_DOCUMENT_ID, CIK, ADSH, TICKER, COMPANY_NAME, DOCUMENT_TYPE, \
             PERIOD_END_DATE, SECTOR, FILING_TEXT \
             FROM {}.v_sec_filing_text WHERE SEC_DOCUMENT_ID = ?",
            self.app_db()
        );
        let (columns, rows) = self
            .execute(&statement, &[json!(sec_document_id)])
            .await?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        Ok(Some(FilingText {
            filing: decode_filing(&columns, row)?,
            body: col_opt(&columns, row, "FILING_TEXT")?
                .unwrap_or_default()
                .to_string(),
        }))
    }

    async fn insert_chunk(&self, chunk: &DocumentChunk) -> Result<(), WarehouseError> {
        let metadata = serde_json::to_string(&chunk.metadata)
            .map_err(|e| WarehouseError::Decode(e.to_string()))?;
        let statement = format!(
            "MERGE INTO {db}.document_chunks t USING (SELECT ? AS chunk_id) s \
             ON t.chunk_id = s.chunk_id \
             WHEN MATCHED THEN UPDATE SET chunk_text = ?, metadata = PARSE_JSON(?) \
             WHEN NOT MATCHED THEN INSERT \
             (chunk_id, cik, company_ticker, company_name, filing_type, adsh, \
              period_end_date, section_name, chunk_text, chunk_index, metadata) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, PARSE_JSON(?))",
            db = self.app_db()
        );
        let binds = vec![
            json!(chunk.chunk_id),
            json!(chunk.chunk_text),
            json!(metadata),
            json!(chunk.chunk_id),
            json!(chunk.cik),
            json!(chunk.company_ticker),
            json!(chunk.company_name),
            json!(chunk.filing_type),
            json!(chunk.adsh),
            json!(chunk.period_end_date.to_string()),
            json!(chunk.section_name),
            json!(chunk.chunk_text),
            json!(chunk.chunk_index),
            json!(metadata),
        ];
        self.execute(&statement, &binds).await?;
        Ok(())
    }

    async fn chunks_without_embeddings(
        &self,
        limit: usize,
    ) -> Result<Vec<ChunkRef>, WarehouseError> {
        let statement = format!(
            "SELECT dc.CHUNK_ID, dc.CHUNK_TEXT \
             FROM {db}.document_chunks dc \
             LEFT JOIN {db}.document_embeddings de ON dc.chunk_id = de.chunk_id \
             WHERE de.chunk_id IS NULL LIMIT {limit}",
            db = self.app_db()
        );
        let (columns, rows) = self.execute(&statement, &[]).await?;
        rows.iter()
            .map(|row| {
                Ok(ChunkRef {
                    chunk_id: col(&columns, row, "CHUNK_ID")?.to_string(),
                    chunk_text: col(&columns, row, "CHUNK_TEXT")?.to_string(),
                })
            })
            .collect()
    }

    async fn embed_text(&self, model: &str, text: &str) -> Result<Vec<f32>, WarehouseError> {
        let statement =
            "SELECT SNOWFLAKE.CORTEX.EMBED_TEXT_768(?, ?) AS EMBEDDING".to_string();
        let (columns, rows) = self
            .execute(&statement, &[json!(model), json!(text)])
            .await?;
        let row = rows
            .first()
            .ok_or_else(|| WarehouseError::Decode("empty embedding result".to_string()))?;
        let raw = col(&columns, row, "EMBEDDING")?;
        serde_json::from_str(raw)
            .map_err(|e| WarehouseError::Decode(format!("bad embedding vector: {e}")))
    }

    async fn store_embedding(
        &self,
        chunk_id: &str,
        embedding: &[f32],
    ) -> Result<(), WarehouseError> {
        // VECTOR values cannot be bound, so the literal goes into the
        // statement text; the chunk id stays a bind.
        let vector = serde_json::to_string(embedding)
            .map_err(|e| WarehouseError::Decode(e.to_string()))?;
        let delete = format!(
            "DELETE FROM {}.document_embeddings WHERE chunk_id = ?",
            self.app_db()
        );
        self.execute(&delete, &[json!(chunk_id)]).await?;
        let insert = format!(
            "INSERT INTO {db}.document_embeddings (chunk_id, embedding) \
             SELECT ?, {vector}::VECTOR(FLOAT, {dim})",
            db = self.app_db(),
            dim = embedding.len(),
        );
        self.execute(&insert, &[json!(chunk_id)]).await?;
        Ok(())
    }

    async fn vector_search(
        &self,
        embedding: &[f32],
        ticker: Option<&str>,
        section_name: Option<&str>,
        limit: usize,
    ) -> Result<Vec<DocumentChunk>, WarehouseError> {
        let vector = serde_json::to_string(embedding)
            .map_err(|e| WarehouseError::Decode(e.to_string()))?;
        let mut conditions = vec!["1=1".to_string()];
        let mut binds = Vec::new();
        if let Some(ticker) = ticker {
            conditions.push("dc.COMPANY_TICKER = ?".to_string());
            binds.push(json!(ticker.to_uppercase()));
        }
        if let Some(section) = section_name {
            conditions.push("dc.SECTION_NAME = ?".to_string());
            binds.push(json!(section));
        }
        let statement = format!(
            "SELECT dc.CHUNK_ID, dc.CIK, dc.COMPANY_TICKER, dc.COMPANY_NAME, \
             dc.FILING_TYPE, dc.ADSH, dc.PERIOD_END_DATE, dc.SECTION_NAME, \
             dc.CHUNK_TEXT, dc.CHUNK_INDEX, dc.METADATA, \
             VECTOR_COSINE_SIMILARITY(de.EMBEDDING, {vector}::VECTOR(FLOAT, {dim})) AS SIMILARITY \
             FROM {db}.document_chunks dc \
             JOIN {db}.document_embeddings de ON dc.chunk_id = de.chunk_id \
             WHERE {conds} ORDER BY SIMILARITY DESC LIMIT {limit}",
            db = self.app_db(),
            dim = embedding.len(),
            conds = conditions.join(" AND "),
        );
        let (columns, rows) = self.execute(&statement, &binds).await?;
        rows.iter()
            .map(|row| {
                let chunk_id = col(&columns, row, "CHUNK_ID")?.to_string();
                let chunk_text = col(&columns, row, "CHUNK_TEXT")?.to_string();
                let metadata = col_opt(&columns, row, "METADATA")?
                    .and_then(|raw| serde_json::from_str::<ChunkMetadata>(raw).ok())
                    .unwrap_or(ChunkMetadata {
                        sec_document_id: String::new(),
                        char_count: chunk_text.chars().count(),
                    });
                Ok(DocumentChunk {
                    chunk_id,
                    cik: col(&columns, row, "CIK")?.to_string(),
                    company_ticker: col(&columns, row, "COMPANY_TICKER")?.to_string(),
                    company_name: col(&columns, row, "COMPANY_NAME")?.to_string(),
                    filing_type: col(&columns, row, "FILING_TYPE")?.to_string(),
                    adsh: col_opt(&columns, row, "ADSH")?.unwrap_or_default().to_string(),
                    period_end_date: col_date(&columns, row, "PERIOD_END_DATE")?,
                    section_name: col(&columns, row, "SECTION_NAME")?.to_string(),
                    chunk_text,
                    chunk_index: col(&columns, row, "CHUNK_INDEX")?
                        .parse()
                        .map_err(|e| WarehouseError::Decode(format!("bad chunk_index: {e}")))?,
                    metadata,
                })
            })
            .collect()
    }

    async fn financial_chunks(
        &self,
        ticker: &str,
        sec_document_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, WarehouseError> {
        let statement = format!(
            "SELECT CHUNK_TEXT FROM {}.document_chunks \
             WHERE company_ticker = ? AND section_name = 'FINANCIAL_STATEMENTS' \
             AND chunk_id LIKE ? ORDER BY chunk_index LIMIT {limit}",
            self.app_db()
        );
        let binds = vec![
            json!(ticker.to_uppercase()),
            json!(format!("{sec_document_id}%")),
        ];
        let (columns, rows) = self.execute(&statement, &binds).await?;
        rows.iter()
            .map(|row| Ok(col(&columns, row, "CHUNK_TEXT")?.to_string()))
            .collect()
    }

    async fn insert_metric(&self, metric: &FinancialMetric) -> Result<(), WarehouseError> {
        let metadata = metric
            .metadata
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "{}".to_string());
        let statement = format!(
            "INSERT INTO {}.financial_metrics \
             (metric_id, company_ticker, filing_type, period_end_date, metric_name, \
              metric_value, metric_unit, yoy_change, is_anomaly, metadata) \
             SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, PARSE_JSON(?)",
            self.app_db()
        );
        let binds = vec![
            json!(metric.metric_id),
            json!(metric.company_ticker),
            json!(metric.filing_type),
            json!(metric.filing_date.to_string()),
            json!(metric.metric_name),
            metric.metric_value.map(|v| json!(v)).unwrap_or(Value::Null),
            json!(metric.metric_unit),
            metric.yoy_change.map(|v| json!(v)).unwrap_or(Value::Null),
            json!(metric.is_anomaly),
            json!(metadata),
        ];
        self.execute(&statement, &binds).await?;
        Ok(())
    }

    async fn previous_metrics(
        &self,
        ticker: &str,
        before: NaiveDate,
    ) -> Result<HashMap<String, f64>, WarehouseError> {
        let statement = format!(
            "SELECT METRIC_NAME, METRIC_VALUE FROM {}.financial_metrics \
             WHERE company_ticker = ? AND period_end_date < ? \
             ORDER BY period_end_date DESC",
            self.app_db()
        );
        let binds = vec![json!(ticker.to_uppercase()), json!(before.to_string())];
        let (columns, rows) = self.execute(&statement, &binds).await?;

        // Rows are newest-first; keep the first value seen per name.
        let mut metrics = HashMap::new();
        for row in &rows {
            let name = col(&columns, row, "METRIC_NAME")?.to_string();
            let Some(raw) = col_opt(&columns, row, "METRIC_VALUE")? else {
                continue;
            };
            let value: f64 = raw
                .parse()
                .map_err(|e| WarehouseError::Decode(format!("bad metric value: {e}")))?;
            metrics.entry(name).or_insert(value);
        }
        Ok(metrics)
    }

    async fn insert_assessment(
        &self,
        assessment: &RiskAssessment,
    ) -> Result<(), WarehouseError> {
        let evidence = serde_json::to_string(&assessment.evidence)
            .map_err(|e| WarehouseError::Decode(e.to_string()))?;
        let statement = format!(
            "INSERT INTO {}.risk_assessments \
             (assessment_id, company_ticker, period_end_date, risk_category, \
              risk_score, summary, evidence) \
             SELECT ?, ?, ?, ?, ?, ?, PARSE_JSON(?)",
            self.app_db()
        );
        let binds = vec![
            json!(assessment.assessment_id),
            json!(assessment.company_ticker),
            json!(assessment.filing_date.to_string()),
            json!(assessment.risk_category),
            json!(assessment.risk_score),
            json!(assessment.summary),
            json!(evidence),
        ];
        self.execute(&statement, &binds).await?;
        Ok(())
    }
}

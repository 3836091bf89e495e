use async_trait::async_trait;
use thiserror::Error;

use edgar_warehouse::WarehouseError;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error("embedding has {got} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Produces fixed-size embedding vectors for chunk text.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Expected vector length. Implementations reject anything else.
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

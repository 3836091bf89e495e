use std::sync::Arc;

use async_trait::async_trait;

use edgar_core::EmbeddingConfig;
use edgar_warehouse::Warehouse;

use super::traits::{Embedder, EmbeddingError};

/// Embeds text by calling the warehouse's in-database embedding function,
/// so chunk text never leaves the warehouse for vectorization.
pub struct CortexEmbedder {
    warehouse: Arc<dyn Warehouse>,
    model: String,
    dimensions: usize,
}

impl CortexEmbedder {
    pub fn new(warehouse: Arc<dyn Warehouse>, config: &EmbeddingConfig) -> Self {
        Self {
            warehouse,
            model: config.model.clone(),
            dimensions: config.dimensions as usize,
        }
    }
}

#[async_trait]
impl Embedder for CortexEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let vector = self.warehouse.embed_text(&self.model, text).await?;
        if vector.len() != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions,
                got: vector.len(),
            });
        }
        Ok(vector)
    }
}

//! Embedding generation for stored chunks.

mod cortex;
mod service;
mod traits;

pub use cortex::CortexEmbedder;
pub use service::{EmbeddingReport, EmbeddingService};
pub use traits::{Embedder, EmbeddingError};

pub mod company;
pub mod config;
pub mod filing;
pub mod metrics;
pub mod risk;

pub use company::Company;
pub use config::{
    Config, EmbeddingConfig, LlmConfig, ProcessingConfig, WarehouseConfig,
};
pub use filing::*;
pub use metrics::*;
pub use risk::*;

//! Warehouse collaborator for the filing-intelligence pipeline.
//!
//! The pipeline only sees the [`Warehouse`] trait: a parameterized-query
//! surface over the shared SEC filing database (read) and the application
//! database (write, upsert-by-id). [`SnowflakeClient`] implements it against
//! the Snowflake SQL REST API; [`MemoryWarehouse`] is an in-memory double
//! for tests.

pub mod memory;
pub mod snowflake;
mod traits;

pub use memory::MemoryWarehouse;
pub use snowflake::SnowflakeClient;
pub use traits::{ChunkRef, Warehouse, WarehouseError};

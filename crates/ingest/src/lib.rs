//! Filing segmentation and chunking pipeline.
//!
//! Turns raw SEC filing text into ordered, identifiable chunk records:
//! regex-driven section boundary detection ([`sections`]), size-bounded
//! greedy chunking with controlled overlap ([`chunker`]), filing-level
//! orchestration and chunk identity ([`processor`]), plus the embedding
//! collaborator ([`embedding`]) and the best-effort batch loop
//! ([`pipeline`]).

pub mod chunker;
pub mod embedding;
pub mod pipeline;
pub mod processor;
pub mod sections;

pub use chunker::{ChunkConfigError, TextChunker};
pub use pipeline::{IngestPipeline, PipelineReport};
pub use processor::{ChunkSink, FilingProcessor, ProcessError, StoreOutcome};
pub use sections::{SectionExtractor, SectionKind};

//! Influence-weighted answer generation with per-span source attribution.
//!
//! Callers hand [`InfluenceEngine::respond`] a query and a set of weighted,
//! possibly poisoned or excluded documents. The engine asks a [`Generator`]
//! for an answer (or builds one from templates), then splits that answer into
//! spans credited to base knowledge or to a document, and scores sentiment,
//! bias and trust.

pub mod config;
pub mod docs;
pub mod error;
pub mod influence;
pub mod llm;
pub mod query;

pub use config::PipelineConfig;
pub use docs::types::Document;
pub use error::PipelineError;
pub use influence::InfluenceEngine;
pub use llm::{Generator, LlmClient};
pub use query::{PipelineResponse, QueryRequest};

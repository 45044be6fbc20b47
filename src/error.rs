//! Error types for the attribution pipeline.

use thiserror::Error;

/// Errors the pipeline can report to its caller.
///
/// Only malformed input shapes are rejected. Degenerate but valid input
/// (empty content, zero influence, no documents) is handled in-band.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Generator unavailable: {0}")]
    GeneratorUnavailable(String),
}

impl PipelineError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn generator_unavailable(msg: impl Into<String>) -> Self {
        Self::GeneratorUnavailable(msg.into())
    }
}

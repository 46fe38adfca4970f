//! Rule-based personalization: learner profiling, four selection strategies,
//! exam composition, and learning-path and knowledge-point ranking.

pub mod aggregator;
pub mod config;
pub mod engine;
pub mod exam;
pub mod knowledge_points;
pub mod metrics;
pub mod paths;
pub mod profile;
pub mod source;
pub mod strategies;
pub mod types;

use thiserror::Error;

use crate::recommend::source::SourceError;

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("invalid recommender config: {0}")]
    InvalidConfig(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

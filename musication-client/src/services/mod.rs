//! Service modules for the analysis client
//!
//! - `analysis_client`: HTTP adapter for the Analysis Service
//! - `classifier`: similarity tier classification
//! - `media_validator`: pre-flight audio file checks

pub mod analysis_client;
pub mod classifier;
pub mod media_validator;

pub use analysis_client::{AnalysisService, AnalysisServiceClient, Operation};
pub use classifier::{annotate, check_ranks, classify, classify_match};

//! Analysis Service data model

pub mod job;
pub mod phase;
pub mod results;

pub use job::{Job, JobStatus, StartAck, UploadAck};
pub use phase::{FailureReason, JobFailure, JobPhase, PhaseKind, PhaseTransition};
pub use results::{
    AnalysisResults, ClassifiedMatch, ClassifiedResults, LibraryStats, MatchedSegment, RankCheck,
    SimilarityResult, SimilarityTier, TierLevel, VisualizationPaths,
};

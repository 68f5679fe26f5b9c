//! Similarity results returned by the Analysis Service and their classified form

use serde::{Deserialize, Deserializer, Serialize};

/// Pair of aligned time ranges, one per compared track (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchedSegment {
    pub start1: f64,
    pub end1: f64,
    pub start2: f64,
    pub end2: f64,
}

impl MatchedSegment {
    /// Finite, non-negative offsets with `end >= start` on both sides
    pub fn is_well_formed(&self) -> bool {
        let offsets = [self.start1, self.end1, self.start2, self.end2];
        offsets.iter().all(|v| v.is_finite() && *v >= 0.0)
            && self.end1 >= self.start1
            && self.end2 >= self.start2
    }
}

/// Relative paths of the three plots rendered by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizationPaths {
    pub fingerprint: String,
    pub chroma_heatmap: String,
    pub dtw_path: String,
}

/// One matched library track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityResult {
    pub id: String,
    pub library_track_id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    /// Percentage, nominally 0-100
    #[serde(deserialize_with = "percentage")]
    pub similarity_score: i32,
    #[serde(deserialize_with = "percentage")]
    pub melody_similarity: i32,
    pub fingerprint_match: bool,
    /// Service relevance order, never re-sorted
    #[serde(default)]
    pub matched_segments: Vec<MatchedSegment>,
    pub visualization_paths: VisualizationPaths,
    /// 1-based rank assigned by the service
    pub rank: u32,
}

/// `GET /api/results/{jobId}` payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResults {
    pub job_id: String,
    pub status: String,
    pub uploaded_file_name: String,
    /// Seconds
    pub processing_time: f64,
    #[serde(default)]
    pub matches: Vec<SimilarityResult>,
}

/// `GET /api/library/stats` payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryStats {
    pub total_tracks: u64,
    #[serde(default)]
    pub genres: Vec<String>,
    pub artists: u64,
}

/// Accepts integral or fractional JSON numbers, rounding to the nearest integer
fn percentage<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    Ok(value.round() as i32)
}

// ============================================================================
// Classified form (produced by the result classifier)
// ============================================================================

/// Similarity bucket, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TierLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
}

/// Display attributes of a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SimilarityTier {
    pub level: TierLevel,
    pub label: &'static str,
    pub color_class: &'static str,
    pub emoji: &'static str,
}

/// Outcome of the rank integrity check over a result set
///
/// Ranks are reported, never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RankCheck {
    Consistent,
    Inconsistent {
        /// Ranks that appear more than once
        duplicates: Vec<u32>,
        /// Ranks in `1..=len` that never appear
        missing: Vec<u32>,
    },
}

impl RankCheck {
    pub fn is_consistent(&self) -> bool {
        matches!(self, RankCheck::Consistent)
    }
}

/// A similarity result annotated for presentation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedMatch {
    #[serde(flatten)]
    pub result: SimilarityResult,
    /// Tier of `similarity_score` (clamped to 0-100)
    pub tier: SimilarityTier,
    /// Tier of `melody_similarity` (clamped to 0-100)
    pub melody_tier: SimilarityTier,
    /// Well-formed segments, in service order
    pub valid_segments: Vec<MatchedSegment>,
    /// Number of malformed segments left out of `valid_segments`
    pub skipped_segments: usize,
}

/// Immutable, classified snapshot handed to presentation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedResults {
    pub job_id: String,
    pub status: String,
    pub uploaded_file_name: String,
    pub processing_time: f64,
    pub matches: Vec<ClassifiedMatch>,
    pub rank_check: RankCheck,
}

impl ClassifiedResults {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

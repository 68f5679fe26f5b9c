//! Similarity result classification
//!
//! Pure, stateless mapping from a similarity percentage to a display tier,
//! plus annotation of a whole result set. Nothing here performs I/O.
//!
//! | score   | tier      |
//! |---------|-----------|
//! | ≥ 80    | Very High |
//! | 60 - 79 | High      |
//! | 40 - 59 | Moderate  |
//! | < 40    | Low       |

use std::collections::BTreeMap;

use musication_common::models::{
    AnalysisResults, ClassifiedMatch, ClassifiedResults, RankCheck, SimilarityResult,
    SimilarityTier, TierLevel,
};

/// Lower edge (inclusive) of the Very High tier
pub const VERY_HIGH_MIN: i32 = 80;
/// Lower edge (inclusive) of the High tier
pub const HIGH_MIN: i32 = 60;
/// Lower edge (inclusive) of the Moderate tier
pub const MODERATE_MIN: i32 = 40;

const VERY_HIGH: SimilarityTier = SimilarityTier {
    level: TierLevel::VeryHigh,
    label: "Very High",
    color_class: "bg-red-100 text-red-800 border-red-300",
    emoji: "🔴",
};

const HIGH: SimilarityTier = SimilarityTier {
    level: TierLevel::High,
    label: "High",
    color_class: "bg-orange-100 text-orange-800 border-orange-300",
    emoji: "🟠",
};

const MODERATE: SimilarityTier = SimilarityTier {
    level: TierLevel::Moderate,
    label: "Moderate",
    color_class: "bg-yellow-100 text-yellow-800 border-yellow-300",
    emoji: "🟡",
};

const LOW: SimilarityTier = SimilarityTier {
    level: TierLevel::Low,
    label: "Low",
    color_class: "bg-green-100 text-green-800 border-green-300",
    emoji: "🟢",
};

/// Clamp a percentage into `0..=100`
pub fn clamp_score(score: i32) -> i32 {
    score.clamp(0, 100)
}

/// Tier for a similarity percentage
///
/// Total over `i32`: out-of-range scores are clamped first.
pub fn classify(score: i32) -> SimilarityTier {
    match clamp_score(score) {
        s if s >= VERY_HIGH_MIN => VERY_HIGH,
        s if s >= HIGH_MIN => HIGH,
        s if s >= MODERATE_MIN => MODERATE,
        _ => LOW,
    }
}

/// Display attributes of a tier level
pub fn tier(level: TierLevel) -> SimilarityTier {
    match level {
        TierLevel::VeryHigh => VERY_HIGH,
        TierLevel::High => HIGH,
        TierLevel::Moderate => MODERATE,
        TierLevel::Low => LOW,
    }
}

/// Check that ranks are unique and contiguous from 1
///
/// Reports problems; never reorders or rewrites anything.
pub fn check_ranks(matches: &[SimilarityResult]) -> RankCheck {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for m in matches {
        *counts.entry(m.rank).or_default() += 1;
    }

    let duplicates: Vec<u32> = counts
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(rank, _)| *rank)
        .collect();

    let missing: Vec<u32> = (1..=matches.len() as u32)
        .filter(|rank| !counts.contains_key(rank))
        .collect();

    if duplicates.is_empty() && missing.is_empty() {
        RankCheck::Consistent
    } else {
        RankCheck::Inconsistent {
            duplicates,
            missing,
        }
    }
}

/// Annotate one match with its tiers and well-formed segments
pub fn classify_match(result: SimilarityResult) -> ClassifiedMatch {
    let valid_segments: Vec<_> = result
        .matched_segments
        .iter()
        .copied()
        .filter(|s| s.is_well_formed())
        .collect();
    let skipped_segments = result.matched_segments.len() - valid_segments.len();

    if skipped_segments > 0 {
        tracing::warn!(
            match_id = %result.id,
            skipped_segments,
            "Skipping malformed matched segments"
        );
    }
    if result.similarity_score != clamp_score(result.similarity_score) {
        tracing::warn!(
            match_id = %result.id,
            score = result.similarity_score,
            "Similarity score outside 0-100, clamped for classification"
        );
    }

    ClassifiedMatch {
        tier: classify(result.similarity_score),
        melody_tier: classify(result.melody_similarity),
        valid_segments,
        skipped_segments,
        result,
    }
}

/// Annotate a full result set, keeping service order and ranks
pub fn annotate(results: AnalysisResults) -> ClassifiedResults {
    let rank_check = check_ranks(&results.matches);
    if let RankCheck::Inconsistent {
        duplicates,
        missing,
    } = &rank_check
    {
        tracing::warn!(
            job_id = %results.job_id,
            ?duplicates,
            ?missing,
            "Result ranks are not unique and contiguous"
        );
    }

    ClassifiedResults {
        job_id: results.job_id,
        status: results.status,
        uploaded_file_name: results.uploaded_file_name,
        processing_time: results.processing_time,
        matches: results.matches.into_iter().map(classify_match).collect(),
        rank_check,
    }
}

//! Plain-text presentation of controller events and results
//!
//! Formatting only. Everything here reads snapshots; nothing feeds back into
//! the lifecycle.

use musication_common::events::MusicationEvent;
use musication_common::human_time::{
    format_file_size, format_processing_time, format_segment_summary,
};
use musication_common::models::{
    ClassifiedMatch, ClassifiedResults, JobPhase, LibraryStats, RankCheck,
};

use crate::models::AudioFile;
use crate::services::analysis_client::resolve_asset_url;

/// One status line for a phase
pub fn render_phase(phase: &JobPhase) -> String {
    match phase {
        JobPhase::Idle => "Waiting for an audio file".to_string(),
        JobPhase::Uploading { file_name } => format!("Uploading {}...", file_name),
        JobPhase::Starting { job_id } => format!("Starting analysis (job {})...", job_id),
        JobPhase::Polling { job_id } => format!("Analyzing (job {})...", job_id),
        JobPhase::Fetching { job_id } => format!("Loading results (job {})...", job_id),
        JobPhase::Ready { results } => format!(
            "Analysis complete: {} match{}",
            results.matches.len(),
            if results.matches.len() == 1 { "" } else { "es" }
        ),
        JobPhase::Failed { failure } => format!("Error: {}", failure.message),
    }
}

/// Status line for an event, or None for events not worth a line
pub fn render_event(event: &MusicationEvent) -> Option<String> {
    match event {
        MusicationEvent::PhaseChanged { new_phase, .. } => Some(render_phase(new_phase)),
        MusicationEvent::PollProgress {
            attempt,
            max_attempts,
            error_streak,
            status,
            ..
        } => Some(match status {
            Some(status) if !status.is_terminal() => {
                format!(
                    "  status: {} (attempt {}/{})",
                    status, attempt, max_attempts
                )
            }
            Some(status) => format!("  status: {}", status),
            None => format!("  status check failed ({} in a row)", error_streak),
        }),
        MusicationEvent::JobCancelled { phase, .. } => Some(format!(
            "Cancelled while {}",
            phase.to_string().to_lowercase()
        )),
    }
}

/// Short description of the file about to be uploaded
pub fn render_upload_candidate(file: &AudioFile) -> String {
    format!(
        "{} ({}, {})",
        file.file_name(),
        file.mime_type(),
        format_file_size(file.size())
    )
}

/// Lines for one ranked match
pub fn render_match(entry: &ClassifiedMatch, base_url: &str) -> Vec<String> {
    let result = &entry.result;
    let mut lines = Vec::with_capacity(8);

    let mut heading = format!(
        "#{} {} {} - {}",
        result.rank, entry.tier.emoji, result.title, result.artist
    );
    if let Some(album) = result.album.as_deref().filter(|a| !a.is_empty()) {
        heading.push_str(&format!(" ({})", album));
    }
    lines.push(heading);

    lines.push(format!(
        "   Similarity: {}% [{}]  Melody: {}% [{}]",
        result.similarity_score,
        entry.tier.label,
        result.melody_similarity,
        entry.melody_tier.label
    ));
    if result.fingerprint_match {
        lines.push("   Fingerprint match: exact or near-exact duplicate".to_string());
    }
    lines.push(format!(
        "   Matched segments: {}",
        format_segment_summary(&entry.valid_segments)
    ));

    let paths = &result.visualization_paths;
    lines.push(format!(
        "   Fingerprint: {}",
        resolve_asset_url(base_url, &paths.fingerprint)
    ));
    lines.push(format!(
        "   Chroma heatmap: {}",
        resolve_asset_url(base_url, &paths.chroma_heatmap)
    ));
    lines.push(format!(
        "   DTW path: {}",
        resolve_asset_url(base_url, &paths.dtw_path)
    ));
    lines
}

/// Full results report
pub fn render_results(results: &ClassifiedResults, base_url: &str) -> Vec<String> {
    let mut lines = vec![
        format!("Results for {}", results.uploaded_file_name),
        format!(
            "Processing time: {}",
            format_processing_time(results.processing_time)
        ),
    ];

    if results.is_empty() {
        lines.push("No Matches Found".to_string());
        lines.push("This track does not closely resemble anything in the library.".to_string());
        return lines;
    }

    lines.push(format!("{} similar track(s):", results.matches.len()));
    for entry in &results.matches {
        lines.push(String::new());
        lines.extend(render_match(entry, base_url));
    }

    if let RankCheck::Inconsistent {
        duplicates,
        missing,
    } = &results.rank_check
    {
        lines.push(String::new());
        lines.push(format!(
            "Note: service ranks are inconsistent (duplicates: {:?}, missing: {:?})",
            duplicates, missing
        ));
    }
    lines
}

pub fn render_library_stats(stats: &LibraryStats) -> Vec<String> {
    let mut lines = vec![
        format!("Tracks:  {}", stats.total_tracks),
        format!("Artists: {}", stats.artists),
    ];
    if stats.genres.is_empty() {
        lines.push("Genres:  none".to_string());
    } else {
        lines.push(format!("Genres:  {}", stats.genres.join(", ")));
    }
    lines
}

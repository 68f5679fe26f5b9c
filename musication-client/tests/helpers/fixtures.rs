//! Sample payloads

use musication_client::AudioFile;
use musication_common::models::{
    AnalysisResults, Job, JobStatus, MatchedSegment, SimilarityResult, VisualizationPaths,
};

/// Minimal MP3 (ID3 header) accepted by pre-flight validation
pub fn audio_file(name: &str) -> AudioFile {
    AudioFile::from_bytes(name, None, b"ID3\x04\x00\x00\x00\x00\x00\x00".to_vec())
        .expect("fixture audio should validate")
}

pub fn job(id: &str, status: JobStatus) -> Job {
    Job {
        id: id.to_string(),
        status,
        created_at: Some("2024-05-01T10:00:00Z".to_string()),
        completed_at: None,
        processing_time_seconds: None,
    }
}

pub fn completed_job(id: &str) -> Job {
    Job {
        completed_at: Some("2024-05-01T10:00:12Z".to_string()),
        processing_time_seconds: Some(12.3),
        ..job(id, JobStatus::Completed)
    }
}

pub fn similarity_result(id: &str, score: i32, rank: u32) -> SimilarityResult {
    SimilarityResult {
        id: id.to_string(),
        library_track_id: format!("track-{}", id),
        title: format!("Song {}", id),
        artist: "Test Artist".to_string(),
        album: None,
        similarity_score: score,
        melody_similarity: score,
        fingerprint_match: score >= 95,
        matched_segments: vec![MatchedSegment {
            start1: 10.0,
            end1: 40.0,
            start2: 20.0,
            end2: 50.0,
        }],
        visualization_paths: VisualizationPaths {
            fingerprint: format!("/static/viz/{}/fingerprint.png", id),
            chroma_heatmap: format!("/static/viz/{}/chroma.png", id),
            dtw_path: format!("/static/viz/{}/dtw.png", id),
        },
        rank,
    }
}

pub fn sample_results(job_id: &str, matches: Vec<SimilarityResult>) -> AnalysisResults {
    AnalysisResults {
        job_id: job_id.to_string(),
        status: "completed".to_string(),
        uploaded_file_name: "query.mp3".to_string(),
        processing_time: 12.3,
        matches,
    }
}

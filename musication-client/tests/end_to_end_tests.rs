//! End-to-end lifecycle tests
//!
//! Real `AnalysisServiceClient` + real controller against a wiremock service,
//! with a short poll interval and wall-clock time.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::{audio_file, drain_events, phase_kinds};
use musication_client::{AnalysisServiceClient, ControllerSettings, JobLifecycleController};
use musication_common::events::EventBus;
use musication_common::models::{FailureReason, JobPhase, PhaseKind};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

fn controller_for(server: &MockServer) -> JobLifecycleController {
    let client = AnalysisServiceClient::new(server.uri(), Duration::from_secs(5)).unwrap();
    let settings = ControllerSettings {
        poll_interval: Duration::from_millis(20),
        ..ControllerSettings::default()
    };
    JobLifecycleController::new(Arc::new(client), settings, EventBus::new(256))
}

async fn wait_terminal(controller: &JobLifecycleController) -> JobPhase {
    tokio::time::timeout(TEST_TIMEOUT, controller.wait())
        .await
        .expect("job should reach a terminal phase")
}

async fn mount_upload_and_start(server: &MockServer, job_id: &str) {
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "jobId": job_id })))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/api/analyze/{}", job_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "processing" })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_job_42_reaches_ready() {
    // Given: two `processing` polls, then `completed`
    let server = MockServer::start().await;
    mount_upload_and_start(&server, "job-42").await;
    Mock::given(method("GET"))
        .and(path("/api/status/job-42"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "job-42", "status": "processing" })),
        )
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/status/job-42"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "job-42", "status": "completed" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/results/job-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobId": "job-42",
            "status": "completed",
            "uploadedFileName": "query.mp3",
            "processingTime": 4.2,
            "matches": [{
                "id": "m1",
                "libraryTrackId": "t1",
                "title": "Song",
                "artist": "Artist",
                "album": "Album",
                "similarityScore": 85,
                "melodySimilarity": 62,
                "fingerprintMatch": true,
                "matchedSegments": [],
                "visualizationPaths": {
                    "fingerprint": "/viz/fp.png",
                    "chromaHeatmap": "/viz/chroma.png",
                    "dtwPath": "/viz/dtw.png"
                },
                "rank": 1
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let controller = controller_for(&server);
    let mut rx = controller.subscribe();

    // When
    controller.submit(audio_file("query.mp3")).unwrap();
    let phase = wait_terminal(&controller).await;

    // Then
    let results = phase.results().expect("phase should be READY");
    assert_eq!(results.matches[0].tier.label, "Very High");
    assert_eq!(results.matches[0].melody_tier.label, "High");
    assert_eq!(results.matches[0].result.rank, 1);
    assert!(results.rank_check.is_consistent());
    assert_eq!(
        phase_kinds(&drain_events(&mut rx)),
        vec![
            PhaseKind::Uploading,
            PhaseKind::Starting,
            PhaseKind::Polling,
            PhaseKind::Fetching,
            PhaseKind::Ready,
        ]
    );
}

#[tokio::test]
async fn test_repeated_server_errors_fail_status_check() {
    let server = MockServer::start().await;
    mount_upload_and_start(&server, "job-500").await;
    Mock::given(method("GET"))
        .and(path("/api/status/job-500"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/results/job-500"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let controller = controller_for(&server);
    controller.submit(audio_file("query.mp3")).unwrap();
    let phase = wait_terminal(&controller).await;

    let failure = phase.failure().expect("phase should be FAILED");
    assert_eq!(failure.reason, FailureReason::StatusCheckFailed);
    assert_eq!(failure.message, "Failed to check analysis status.");
}

#[tokio::test]
async fn test_upload_rejection_surfaces_service_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(
            ResponseTemplate::new(413)
                .set_body_json(json!({ "message": "File exceeds 50MB limit" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/analyze/unused"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let controller = controller_for(&server);
    controller.submit(audio_file("huge.wav")).unwrap();
    let phase = wait_terminal(&controller).await;

    let failure = phase.failure().expect("phase should be FAILED");
    assert_eq!(failure.reason, FailureReason::UploadError);
    assert_eq!(failure.message, "File exceeds 50MB limit");
}

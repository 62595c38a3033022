//! End-to-end flow: extract media from a document fragment, track the work
//! through the session state machine, fetch under bounded concurrency, and
//! persist through the filesystem sink.

use std::sync::Arc;

use mediagrab_core::extract::{DomNode, ExtractOptions, MediaKind, extract_media};
use mediagrab_core::fetch::{BulkFetchOptions, BulkFetchService, ReqwestFetcher};
use mediagrab_core::progress::ProgressSink;
use mediagrab_core::session::{Action, DownloadState, DownloadTask, SessionStatus, transition};
use mediagrab_core::sink::FsSink;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds the descriptor list for a fragment mimicking a gallery post:
/// two images (one referenced twice) and a video.
fn gallery_fragment(base: &str) -> DomNode {
    DomNode::element("article")
        .child(DomNode::element("img").attr("src", format!("{base}/media/one.jpg")))
        .child(
            DomNode::element("picture")
                .child(DomNode::element("source").attr("src", format!("{base}/media/two.jpg")))
                .child(DomNode::element("img").attr("src", format!("{base}/media/two.jpg"))),
        )
        .child(
            DomNode::element("video")
                .attr("src", format!("{base}/media/clip.mp4"))
                .child(DomNode::element("source").attr("src", format!("{base}/media/clip.mp4"))),
        )
}

#[tokio::test]
async fn test_extract_enqueue_fetch_save_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
    let mock_server = MockServer::start().await;
    for (route, body) in [
        ("/media/one.jpg", "one-bytes"),
        ("/media/two.jpg", "two-bytes"),
        ("/media/clip.mp4", "clip-bytes"),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;
    }

    // Extraction: duplicates collapse, kinds follow the source elements.
    let fragment = gallery_fragment(&mock_server.uri());
    let descriptors = extract_media(
        &fragment,
        &ExtractOptions::default(),
        &ProgressSink::disabled(),
    )?;
    assert_eq!(descriptors.len(), 3);
    assert_eq!(descriptors[0].kind, MediaKind::Image);
    assert_eq!(descriptors[1].kind, MediaKind::Image);
    assert_eq!(descriptors[2].kind, MediaKind::Video);

    // Session bookkeeping: one task per descriptor.
    let tasks: Vec<DownloadTask> = descriptors
        .iter()
        .enumerate()
        .map(|(i, descriptor)| {
            let filename = descriptor
                .url
                .rsplit('/')
                .next()
                .unwrap_or("download.bin")
                .to_string();
            DownloadTask::new(
                format!("task-{i}"),
                format!("media-{i}"),
                filename,
                descriptor.best_variant_url(),
            )
        })
        .collect();

    let mut state = Arc::new(DownloadState::initial());
    for action_task in &tasks {
        state = transition(&state, &Action::Enqueue(action_task.clone())).state;
    }
    assert_eq!(state.status, SessionStatus::Queued);
    assert_eq!(state.queue.len(), 3);

    // Fetch everything through the real HTTP client and filesystem sink.
    let output_dir = TempDir::new()?;
    let service = BulkFetchService::new(
        Arc::new(ReqwestFetcher::new()),
        Arc::new(FsSink::new(output_dir.path())),
    );
    let result = service
        .download_all(&tasks, &BulkFetchOptions::default(), &ProgressSink::disabled())
        .await?;
    assert!(result.success);
    assert_eq!(result.files_successful, 3);

    // Reflect the outcome back into the session, driving each task through
    // start/complete.
    for action_task in &tasks {
        state = transition(
            &state,
            &Action::Start {
                task_id: action_task.task_id.clone(),
            },
        )
        .state;
        state = transition(
            &state,
            &Action::Complete {
                task_id: action_task.task_id.clone(),
            },
        )
        .state;
    }
    assert_eq!(state.status, SessionStatus::Idle);
    assert_eq!(state.completed_count, 3);
    assert_eq!(state.failed_count, 0);
    assert!(state.queue.is_empty());

    // Bytes landed under the extracted names.
    assert_eq!(
        std::fs::read(output_dir.path().join("one.jpg"))?,
        b"one-bytes"
    );
    assert_eq!(
        std::fs::read(output_dir.path().join("two.jpg"))?,
        b"two-bytes"
    );
    assert_eq!(
        std::fs::read(output_dir.path().join("clip.mp4"))?,
        b"clip-bytes"
    );
    Ok(())
}

#[tokio::test]
async fn test_extraction_stage_counts_surface_to_caller() -> Result<(), Box<dyn std::error::Error>>
{
    let fragment = gallery_fragment("https://example.com");
    let events = Arc::new(std::sync::Mutex::new(Vec::new()));
    let events_clone = Arc::clone(&events);
    let progress = ProgressSink::disabled().with_stage_callback(move |name, count| {
        events_clone.lock().unwrap().push((name.to_string(), count));
    });

    extract_media(&fragment, &ExtractOptions::default(), &progress)?;

    let events = events.lock().unwrap();
    // collect: img + source + img + video + source = 5 candidates
    // extract: all carry URLs = 5; dedupe collapses to 3.
    assert_eq!(
        *events,
        vec![
            ("collect".to_string(), 5),
            ("extract".to_string(), 5),
            ("normalize".to_string(), 5),
            ("dedupe".to_string(), 3),
            ("validate".to_string(), 3),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_session_auto_advance_mirrors_sequential_worker()
-> Result<(), Box<dyn std::error::Error>> {
    // A single-worker consumer never issues Start after the first task:
    // Complete auto-advances for it.
    let mut state = Arc::new(DownloadState::initial());
    for i in 0..3 {
        let download = DownloadTask::new(
            format!("t{i}"),
            format!("m{i}"),
            format!("f{i}.jpg"),
            format!("https://example.com/{i}.jpg"),
        );
        state = transition(&state, &Action::Enqueue(download)).state;
    }

    state = transition(&state, &Action::Start { task_id: "t0".into() }).state;
    assert_eq!(state.active_task.as_deref(), Some("t0"));

    state = transition(&state, &Action::Complete { task_id: "t0".into() }).state;
    assert_eq!(state.active_task.as_deref(), Some("t1"));
    assert_eq!(state.status, SessionStatus::Processing);

    state = transition(&state, &Action::Complete { task_id: "t1".into() }).state;
    assert_eq!(state.active_task.as_deref(), Some("t2"));

    state = transition(&state, &Action::Complete { task_id: "t2".into() }).state;
    assert_eq!(state.status, SessionStatus::Idle);
    assert_eq!(state.completed_count, 3);
    Ok(())
}

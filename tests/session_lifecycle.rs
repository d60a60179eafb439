//! End-to-end session tests: a manual capture source, a fixed save prompt
//! and fake encoders drive the coordinator through every outcome.

use async_trait::async_trait;
use recast::capture::{
    CaptureProvider, CaptureStream, ChunkSink, SinkError, SourceInfo, SourceUnavailable,
};
use recast::coordinator::{Coordinator, Finalizer, RecorderHandle};
use recast::storage::{ExtensionFilter, RetentionPolicy, SaveChoice, SavePrompt};
use recast::transcode::{EncodeFailure, EncodeProfile, Encoder, TranscodePipeline};
use recast::{ErrorKind, SessionError, SessionPhase};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Hands the sink of the most recently opened session to the test.
#[derive(Default)]
struct ManualCapture {
    sink: Mutex<Option<ChunkSink>>,
    stopped: Arc<AtomicU32>,
}

impl ManualCapture {
    fn sink(&self) -> ChunkSink {
        self.sink.lock().unwrap().clone().expect("no session opened")
    }
}

struct ManualStream {
    stopped: Arc<AtomicU32>,
}

impl CaptureStream for ManualStream {
    fn stop(&mut self) {
        self.stopped.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CaptureProvider for ManualCapture {
    fn list_sources(&self) -> anyhow::Result<Vec<SourceInfo>> {
        Ok(vec![SourceInfo {
            id: "screen:0".to_string(),
            display_name: "Entire screen".to_string(),
            preview_image: None,
        }])
    }

    async fn open(
        &self,
        source_id: &str,
        sink: ChunkSink,
    ) -> Result<Box<dyn CaptureStream>, SourceUnavailable> {
        if source_id != "screen:0" {
            return Err(SourceUnavailable {
                source_id: source_id.to_string(),
                reason: "no such source".to_string(),
            });
        }
        *self.sink.lock().unwrap() = Some(sink);
        Ok(Box::new(ManualStream {
            stopped: self.stopped.clone(),
        }))
    }
}

enum Answer {
    Save(PathBuf),
    Cancel,
}

struct FixedPrompt {
    answer: Answer,
}

#[async_trait]
impl SavePrompt for FixedPrompt {
    async fn prompt_save_path(
        &self,
        suggested_name: &str,
        filter: &ExtensionFilter,
    ) -> anyhow::Result<SaveChoice> {
        assert!(suggested_name.ends_with(".webm"));
        Ok(match &self.answer {
            Answer::Save(path) => SaveChoice::Path(filter.apply(path.clone())),
            Answer::Cancel => SaveChoice::Cancelled,
        })
    }
}

/// Copies the container to the output, or fails with a fixed diagnostic.
struct FakeEncoder {
    calls: Arc<AtomicU32>,
    failure: Option<String>,
}

impl Encoder for FakeEncoder {
    fn encode(&self, input: &Path, output: &Path, _: &EncodeProfile) -> Result<(), EncodeFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(diagnostic) = &self.failure {
            return Err(EncodeFailure::Diagnostic(diagnostic.clone()));
        }
        std::fs::copy(input, output)
            .map(|_| ())
            .map_err(|e| EncodeFailure::Diagnostic(e.to_string()))
    }
}

struct Harness {
    recorder: RecorderHandle,
    capture: Arc<ManualCapture>,
    encodes: Arc<AtomicU32>,
}

struct Setup {
    answer: Answer,
    encoder_failure: Option<String>,
    retention: RetentionPolicy,
}

impl Setup {
    fn saving_to(path: PathBuf) -> Self {
        Self {
            answer: Answer::Save(path),
            encoder_failure: None,
            retention: RetentionPolicy::Keep,
        }
    }

    fn spawn(self) -> Harness {
        let capture = Arc::new(ManualCapture::default());
        let encodes = Arc::new(AtomicU32::new(0));
        let encoder = FakeEncoder {
            calls: encodes.clone(),
            failure: self.encoder_failure,
        };
        let finalizer = Finalizer::new(
            Arc::new(FixedPrompt {
                answer: self.answer,
            }),
            TranscodePipeline::new(Arc::new(encoder)),
        )
        .with_retention(self.retention);

        let recorder = Coordinator::new(capture.clone(), finalizer)
            .with_chunk_queue(16)
            .spawn();

        Harness {
            recorder,
            capture,
            encodes,
        }
    }
}

fn pattern(len: usize, byte: u8) -> Vec<u8> {
    vec![byte; len]
}

#[tokio::test]
async fn test_chunks_become_container_then_mp4() {
    let dir = TempDir::new().unwrap();
    let container = dir.path().join("session.webm");
    let h = Setup::saving_to(container.clone()).spawn();

    let started = h.recorder.start("screen:0").await.unwrap();
    assert_eq!(started.state, SessionPhase::Capturing);

    let sink = h.capture.sink();
    sink.push(pattern(1000, 1)).unwrap();
    sink.push(pattern(2000, 2)).unwrap();
    sink.push(pattern(1500, 3)).unwrap();

    let completion = h.recorder.stop().await.unwrap();
    assert_eq!(completion.state(), SessionPhase::Finalizing);
    let output = completion.wait().await.unwrap();

    assert_eq!(output, dir.path().join("session.mp4"));
    let written = std::fs::read(&container).unwrap();
    assert_eq!(written.len(), 4500);
    assert_eq!(
        written,
        [pattern(1000, 1), pattern(2000, 2), pattern(1500, 3)].concat()
    );
    assert!(output.exists());
    assert_eq!(h.encodes.load(Ordering::SeqCst), 1);

    let snapshot = h.recorder.snapshot();
    assert_eq!(snapshot.state, SessionPhase::Completed);
    assert_eq!(snapshot.chunk_count, 3);
    assert_eq!(snapshot.byte_count, 4500);
    assert_eq!(snapshot.container_path, Some(container));
    assert_eq!(snapshot.output_path, Some(output));
    assert_eq!(h.capture.stopped.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stop_without_chunks_is_empty_recording() {
    let dir = TempDir::new().unwrap();
    let h = Setup::saving_to(dir.path().join("empty.webm")).spawn();

    h.recorder.start("screen:0").await.unwrap();
    let completion = h.recorder.stop().await.unwrap();

    // No finalization runs: the session is already Failed when stop returns.
    assert_eq!(completion.state(), SessionPhase::Failed);
    assert_eq!(h.recorder.snapshot().state, SessionPhase::Failed);
    assert_eq!(
        h.recorder.snapshot().error.map(|e| e.kind),
        Some(ErrorKind::EmptyRecording)
    );

    let err = completion.wait().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyRecording);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    assert_eq!(h.encodes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_cancelled_prompt_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let h = Setup {
        answer: Answer::Cancel,
        ..Setup::saving_to(PathBuf::new())
    }
    .spawn();

    h.recorder.start("screen:0").await.unwrap();
    h.capture.sink().push(pattern(10, 7)).unwrap();
    let err = h.recorder.stop().await.unwrap().wait().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UserCancelled);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    assert_eq!(h.encodes.load(Ordering::SeqCst), 0);

    let report = h.recorder.snapshot().error.unwrap();
    assert_eq!(report.kind, ErrorKind::UserCancelled);
}

#[tokio::test]
async fn test_second_start_is_rejected_without_side_effects() {
    let dir = TempDir::new().unwrap();
    let h = Setup::saving_to(dir.path().join("a.webm")).spawn();

    let first = h.recorder.start("screen:0").await.unwrap();
    let sink = h.capture.sink();
    sink.push(pattern(100, 1)).unwrap();

    let err = h.recorder.start("screen:0").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    // The original session keeps capturing into its own queue.
    sink.push(pattern(50, 2)).unwrap();
    let output = h.recorder.stop().await.unwrap().wait().await.unwrap();
    assert!(output.exists());

    let snapshot = h.recorder.snapshot();
    assert_eq!(snapshot.session_id, first.session_id);
    assert_eq!(snapshot.byte_count, 150);
}

#[tokio::test]
async fn test_write_failure_never_reaches_encoder() {
    let dir = TempDir::new().unwrap();
    let h = Setup::saving_to(dir.path().join("missing").join("out.webm")).spawn();

    h.recorder.start("screen:0").await.unwrap();
    h.capture.sink().push(pattern(64, 9)).unwrap();
    let err = h.recorder.stop().await.unwrap().wait().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::IoError);
    assert_eq!(h.encodes.load(Ordering::SeqCst), 0);
    assert_eq!(h.recorder.snapshot().container_path, None);
}

#[tokio::test]
async fn test_transcode_failure_keeps_container() {
    let dir = TempDir::new().unwrap();
    let container = dir.path().join("broken.webm");
    let h = Setup {
        encoder_failure: Some("Invalid data found when processing input".to_string()),
        ..Setup::saving_to(container.clone())
    }
    .spawn();

    h.recorder.start("screen:0").await.unwrap();
    h.capture.sink().push(pattern(32, 4)).unwrap();
    let err = h.recorder.stop().await.unwrap().wait().await.unwrap_err();

    assert_eq!(
        err,
        SessionError::Transcode("Invalid data found when processing input".to_string())
    );
    assert_eq!(std::fs::read(&container).unwrap(), pattern(32, 4));
    assert!(!dir.path().join("broken.mp4").exists());

    let snapshot = h.recorder.snapshot();
    assert_eq!(snapshot.state, SessionPhase::Failed);
    assert_eq!(snapshot.container_path, Some(container));
}

#[tokio::test]
async fn test_stop_twice_observes_same_session() {
    let dir = TempDir::new().unwrap();
    let h = Setup::saving_to(dir.path().join("twice.webm")).spawn();

    h.recorder.start("screen:0").await.unwrap();
    h.capture.sink().push(pattern(8, 1)).unwrap();

    let first = h.recorder.stop().await.unwrap();
    let second = h.recorder.stop().await.unwrap();
    assert_eq!(first.session_id(), second.session_id());

    let a = first.wait().await.unwrap();
    let b = second.wait().await.unwrap();
    assert_eq!(a, b);
    assert_eq!(h.encodes.load(Ordering::SeqCst), 1);

    // Still idempotent once finished.
    let third = h.recorder.stop().await.unwrap();
    assert_eq!(third.state(), SessionPhase::Completed);
    assert_eq!(third.wait().await.unwrap(), a);
}

#[tokio::test]
async fn test_acknowledge_returns_to_idle() {
    let dir = TempDir::new().unwrap();
    let h = Setup::saving_to(dir.path().join("ack.webm")).spawn();

    h.recorder.start("screen:0").await.unwrap();
    h.capture.sink().push(pattern(8, 1)).unwrap();
    h.recorder.stop().await.unwrap().wait().await.unwrap();

    let snapshot = h.recorder.acknowledge().await.unwrap();
    assert_eq!(snapshot.state, SessionPhase::Idle);
    assert_eq!(snapshot.session_id, None);

    let err = h.recorder.stop().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    // A fresh session can start after acknowledgement.
    let next = h.recorder.start("screen:0").await.unwrap();
    assert_eq!(next.state, SessionPhase::Capturing);
    assert_eq!(next.chunk_count, 0);
}

#[tokio::test]
async fn test_failed_session_can_be_acknowledged() {
    let dir = TempDir::new().unwrap();
    let h = Setup::saving_to(dir.path().join("f.webm")).spawn();

    h.recorder.start("screen:0").await.unwrap();
    h.recorder.stop().await.unwrap().wait().await.unwrap_err();

    let snapshot = h.recorder.acknowledge().await.unwrap();
    assert_eq!(snapshot.state, SessionPhase::Idle);
    assert!(snapshot.error.is_none());
}

#[tokio::test]
async fn test_delete_on_success_removes_container() {
    let dir = TempDir::new().unwrap();
    let container = dir.path().join("temp.webm");
    let h = Setup {
        retention: RetentionPolicy::DeleteOnSuccess,
        ..Setup::saving_to(container.clone())
    }
    .spawn();

    h.recorder.start("screen:0").await.unwrap();
    h.capture.sink().push(pattern(16, 5)).unwrap();
    let output = h.recorder.stop().await.unwrap().wait().await.unwrap();

    assert!(output.exists());
    assert!(!container.exists());
}

#[tokio::test]
async fn test_chunks_after_stop_are_rejected() {
    let dir = TempDir::new().unwrap();
    let container = dir.path().join("late.webm");
    let h = Setup::saving_to(container.clone()).spawn();

    h.recorder.start("screen:0").await.unwrap();
    let sink = h.capture.sink();
    sink.push(pattern(10, 1)).unwrap();

    let completion = h.recorder.stop().await.unwrap();
    assert_eq!(sink.push(pattern(99, 2)), Err(SinkError::Closed));
    completion.wait().await.unwrap();

    assert_eq!(std::fs::read(&container).unwrap(), pattern(10, 1));
    assert_eq!(h.recorder.snapshot().byte_count, 10);
}

#[tokio::test]
async fn test_unknown_source_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let h = Setup::saving_to(dir.path().join("x.webm")).spawn();

    let err = h.recorder.start("window:42").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    assert_eq!(h.recorder.snapshot().state, SessionPhase::Idle);
}

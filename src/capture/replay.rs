//! Replays pre-recorded media files as capture sources.
//!
//! Each file in the replay directory is a source with id `file:<name>`.
//! Opening one streams the file into the sink in fixed-size pieces on a
//! timer, the way a media recorder emits a chunk per timeslice.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{CaptureProvider, CaptureStream, ChunkSink, SinkError, SourceInfo, SourceUnavailable};

const SOURCE_PREFIX: &str = "file:";

pub struct ReplayCaptureProvider {
    dir: PathBuf,
    chunk_size: usize,
    interval: Duration,
}

impl ReplayCaptureProvider {
    pub fn new(dir: impl Into<PathBuf>, chunk_size: usize, interval: Duration) -> Self {
        Self {
            dir: dir.into(),
            chunk_size: chunk_size.max(1),
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    fn resolve(&self, source_id: &str) -> Result<PathBuf, SourceUnavailable> {
        let unavailable = |reason: &str| SourceUnavailable {
            source_id: source_id.to_string(),
            reason: reason.to_string(),
        };

        let name = source_id
            .strip_prefix(SOURCE_PREFIX)
            .ok_or_else(|| unavailable("not a replay source"))?;

        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return Err(unavailable("invalid file name")),
        }

        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(unavailable("no such file"));
        }
        Ok(path)
    }
}

#[async_trait]
impl CaptureProvider for ReplayCaptureProvider {
    fn list_sources(&self) -> Result<Vec<SourceInfo>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read replay directory {:?}", self.dir))?;

        let mut sources: Vec<SourceInfo> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().to_str().map(String::from))
            .map(|name| SourceInfo {
                id: format!("{}{}", SOURCE_PREFIX, name),
                display_name: name,
                preview_image: None,
            })
            .collect();

        sources.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(sources)
    }

    async fn open(
        &self,
        source_id: &str,
        sink: ChunkSink,
    ) -> Result<Box<dyn CaptureStream>, SourceUnavailable> {
        let path = self.resolve(source_id)?;
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| SourceUnavailable {
                source_id: source_id.to_string(),
                reason: e.to_string(),
            })?;

        info!("Replaying {:?} as capture source {}", path, source_id);

        let token = CancellationToken::new();
        tokio::spawn(replay(
            file,
            sink,
            self.chunk_size,
            self.interval,
            token.clone(),
        ));

        Ok(Box::new(ReplayStream { token }))
    }
}

async fn replay(
    mut file: tokio::fs::File,
    sink: ChunkSink,
    chunk_size: usize,
    interval: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    let mut sent = 0usize;

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let mut buf = vec![0u8; chunk_size];
                match file.read(&mut buf).await {
                    Ok(0) => {
                        info!("Replay source exhausted after {} chunks", sent);
                        break;
                    }
                    Ok(n) => {
                        buf.truncate(n);
                        match sink.push(buf) {
                            Ok(()) => sent += 1,
                            Err(SinkError::Full) => warn!("Chunk queue full, dropping replay chunk"),
                            Err(SinkError::Closed) => break,
                        }
                    }
                    Err(e) => {
                        let _ = sink.report_lost(format!("replay read failed: {e}"));
                        break;
                    }
                }
            }
        }
    }

    debug!("Replay task finished");
}

struct ReplayStream {
    token: CancellationToken,
}

impl CaptureStream for ReplayStream {
    fn stop(&mut self) {
        self.token.cancel();
    }
}

impl Drop for ReplayStream {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureEvent;
    use tempfile::TempDir;

    fn provider(dir: &Path) -> ReplayCaptureProvider {
        ReplayCaptureProvider::new(dir, 4, Duration::from_millis(1))
    }

    #[test]
    fn test_list_sources_sorted() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.webm"), b"b").unwrap();
        std::fs::write(dir.path().join("a.webm"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let sources = provider(dir.path()).list_sources().unwrap();
        let ids: Vec<_> = sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["file:a.webm", "file:b.webm"]);
        assert_eq!(sources[0].display_name, "a.webm");
    }

    #[test]
    fn test_missing_directory_has_no_sources() {
        let dir = TempDir::new().unwrap();
        let sources = provider(&dir.path().join("absent")).list_sources().unwrap();
        assert!(sources.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_sources_are_unavailable() {
        let dir = TempDir::new().unwrap();
        let provider = provider(dir.path());

        for id in ["screen:0", "file:missing.webm", "file:../etc/passwd", "file:"] {
            let (sink, _rx) = ChunkSink::channel(8);
            let err = provider.open(id, sink).await.err().unwrap();
            assert_eq!(err.source_id, id);
        }
    }

    #[tokio::test]
    async fn test_replay_streams_whole_file_in_order() {
        let dir = TempDir::new().unwrap();
        let bytes: Vec<u8> = (0..10).collect();
        std::fs::write(dir.path().join("clip.webm"), &bytes).unwrap();

        let (sink, mut rx) = ChunkSink::channel(16);
        let _stream = provider(dir.path())
            .open("file:clip.webm", sink)
            .await
            .unwrap();

        let mut received = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                CaptureEvent::Chunk(data) => received.push(data),
                CaptureEvent::Lost(reason) => panic!("lost: {reason}"),
            }
        }

        assert_eq!(received, vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9]]);
    }

    #[tokio::test]
    async fn test_stop_ends_replay() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("long.webm"), vec![0u8; 4096]).unwrap();

        let slow = ReplayCaptureProvider::new(dir.path(), 4, Duration::from_secs(60));
        let (sink, mut rx) = ChunkSink::channel(16);
        let mut stream = slow.open("file:long.webm", sink).await.unwrap();

        // The first tick fires immediately.
        assert!(matches!(rx.recv().await, Some(CaptureEvent::Chunk(_))));
        stream.stop();
        assert_eq!(rx.recv().await, None);
    }
}

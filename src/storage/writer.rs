//! Atomic container persistence.
//!
//! Bytes are written to a temp file next to the destination, synced, and
//! renamed into place. The destination either holds the full concatenation
//! or is left untouched.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::SessionError;
use crate::session::ChunkSequence;

#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerWriter;

impl ContainerWriter {
    pub fn new() -> Self {
        Self
    }

    /// Persist `chunks` at `path`, returning the number of bytes written.
    pub async fn write(&self, path: &Path, chunks: ChunkSequence) -> Result<u64, SessionError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || write_atomic(&path, &chunks))
            .await
            .map_err(|e| SessionError::Io(format!("container writer task failed: {e}")))?
    }
}

fn write_atomic(path: &Path, chunks: &ChunkSequence) -> Result<u64, SessionError> {
    let dir = destination_dir(path);
    let mut temp = NamedTempFile::new_in(&dir).map_err(|e| io_error(path, e))?;

    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        for chunk in chunks.iter() {
            writer.write_all(&chunk.data).map_err(|e| io_error(path, e))?;
        }
        writer.flush().map_err(|e| io_error(path, e))?;
    }
    temp.as_file().sync_all().map_err(|e| io_error(path, e))?;

    debug!(
        "Wrote {} chunks to temp file {:?}",
        chunks.len(),
        temp.path()
    );

    // On failure the temp file is dropped (and removed) with the error.
    temp.persist(path).map_err(|e| io_error(path, e.error))?;

    info!(
        "Container saved: {:?} ({} bytes, {} chunks)",
        path,
        chunks.byte_count(),
        chunks.len()
    );
    Ok(chunks.byte_count())
}

fn destination_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn io_error(path: &Path, err: std::io::Error) -> SessionError {
    SessionError::Io(format!("{}: {}", path.display(), err))
}

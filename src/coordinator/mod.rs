//! Recording coordinator.
//!
//! Owns the one session that may exist at a time and runs as a single task:
//!
//! ```text
//! RecorderHandle ──commands──▶ ┌─────────────┐ ◀──chunks── capture provider
//!                              │ coordinator │
//!  watch<SessionSnapshot> ◀─── └─────────────┘ ◀──events── finalizer task
//! ```
//!
//! Every phase change goes through `session::machine::next`; the side
//! effects (opening capture, draining, spawning the finalizer) happen here.

pub mod completion;
pub mod finalize;

pub use completion::Completion;
pub use finalize::{Finalizer, PipelineEvent};

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::capture::{CaptureEvent, CaptureProvider, CaptureStream, ChunkSink};
use crate::error::SessionError;
use crate::session::{
    machine, Session, SessionEvent, SessionPhase, SessionSnapshot, SessionStatusHandle, Transition,
};

const COMMAND_QUEUE: usize = 10;
const EVENT_QUEUE: usize = 8;
pub const DEFAULT_CHUNK_QUEUE: usize = 256;

enum Command {
    Start {
        source_id: String,
        reply: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    },
    Stop {
        reply: oneshot::Sender<Result<Completion, SessionError>>,
    },
    Acknowledge {
        reply: oneshot::Sender<Result<SessionSnapshot, SessionError>>,
    },
}

/// Builder for the coordinator task.
pub struct Coordinator {
    capture: Arc<dyn CaptureProvider>,
    finalizer: Finalizer,
    chunk_queue: usize,
}

impl Coordinator {
    pub fn new(capture: Arc<dyn CaptureProvider>, finalizer: Finalizer) -> Self {
        Self {
            capture,
            finalizer,
            chunk_queue: DEFAULT_CHUNK_QUEUE,
        }
    }

    pub fn with_chunk_queue(mut self, capacity: usize) -> Self {
        self.chunk_queue = capacity.max(1);
        self
    }

    /// Start the coordinator on the current runtime. It runs until every
    /// handle is dropped.
    pub fn spawn(self) -> RecorderHandle {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);
        let status = SessionStatusHandle::default();

        let actor = Actor {
            capture: self.capture,
            finalizer: Arc::new(self.finalizer),
            chunk_queue: self.chunk_queue,
            session: None,
            stream: None,
            chunks: None,
            events_tx,
            events_rx,
            status: status.clone(),
        };
        tokio::spawn(actor.run(rx));

        RecorderHandle { tx, status }
    }
}

/// Caller-facing control surface: start, stop, acknowledge, observe.
#[derive(Clone)]
pub struct RecorderHandle {
    tx: mpsc::Sender<Command>,
    status: SessionStatusHandle,
}

impl RecorderHandle {
    pub async fn start(&self, source_id: impl Into<String>) -> Result<SessionSnapshot, SessionError> {
        let source_id = source_id.into();
        self.request(|reply| Command::Start { source_id, reply }).await
    }

    /// Stop capturing and begin finalization. Calling it again while the
    /// session is finalizing, converting or finished returns a completion
    /// for the same session.
    pub async fn stop(&self) -> Result<Completion, SessionError> {
        self.request(|reply| Command::Stop { reply }).await
    }

    pub async fn acknowledge(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| Command::Acknowledge { reply }).await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.status.get()
    }

    pub fn status(&self) -> SessionStatusHandle {
        self.status.clone()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<T, SessionError>>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| not_running())?;
        rx.await.map_err(|_| not_running())?
    }
}

fn not_running() -> SessionError {
    SessionError::InvalidState("recorder is not running".to_string())
}

struct Actor {
    capture: Arc<dyn CaptureProvider>,
    finalizer: Arc<Finalizer>,
    chunk_queue: usize,
    session: Option<Session>,
    stream: Option<Box<dyn CaptureStream>>,
    chunks: Option<mpsc::Receiver<CaptureEvent>>,
    events_tx: mpsc::Sender<PipelineEvent>,
    events_rx: mpsc::Receiver<PipelineEvent>,
    status: SessionStatusHandle,
}

impl Actor {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        debug!("Coordinator running");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                event = next_capture_event(&mut self.chunks) => self.handle_capture_event(event),
                Some(event) = self.events_rx.recv() => self.handle_pipeline_event(event),
            }
        }

        self.stop_capture();
        debug!("Coordinator stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start { source_id, reply } => {
                let _ = reply.send(self.start(source_id).await);
            }
            Command::Stop { reply } => {
                let _ = reply.send(self.stop());
            }
            Command::Acknowledge { reply } => {
                let _ = reply.send(self.acknowledge());
            }
        }
    }

    async fn start(&mut self, source_id: String) -> Result<SessionSnapshot, SessionError> {
        let phase = self.phase();
        if machine::next(phase, SessionEvent::Start) == Transition::Reject {
            return Err(SessionError::InvalidState(format!(
                "cannot start while a session is {}",
                phase.as_str()
            )));
        }

        let (sink, rx) = ChunkSink::channel(self.chunk_queue);
        let stream = self.capture.open(&source_id, sink).await?;

        let session = Session::start(source_id);
        info!(
            "Session {} capturing from {}",
            session.id(),
            session.source_id()
        );

        self.stream = Some(stream);
        self.chunks = Some(rx);
        self.session = Some(session);
        Ok(self.publish())
    }

    fn stop(&mut self) -> Result<Completion, SessionError> {
        let Some(session) = self.session.as_ref() else {
            return Err(SessionError::InvalidState(
                "no recording session to stop".to_string(),
            ));
        };

        match machine::next(session.phase(), SessionEvent::Stop) {
            Transition::Move(_) => {}
            Transition::Stay => {
                debug!("Stop requested while {}", session.phase().as_str());
                return Ok(self.completion());
            }
            Transition::Reject => {
                return Err(SessionError::InvalidState(format!(
                    "cannot stop while {}",
                    session.phase().as_str()
                )));
            }
        }

        // Everything already queued belongs to this session; nothing after.
        self.stop_capture();
        if let Some(mut rx) = self.chunks.take() {
            rx.close();
            while let Ok(event) = rx.try_recv() {
                match event {
                    CaptureEvent::Chunk(data) => self.accept_chunk(data),
                    CaptureEvent::Lost(reason) => debug!("Ignoring capture loss at stop: {}", reason),
                }
            }
        }

        let Some(session) = self.session.as_mut() else {
            return Err(not_running());
        };
        let chunks = session.take_chunks();
        if chunks.is_empty() {
            self.fail(SessionError::EmptyRecording(
                "no media was captured before stop".to_string(),
            ));
            return Ok(self.completion());
        }

        session.fire(SessionEvent::Stop);
        let session_id = session.id();
        info!(
            "Session {} stopped: {} chunks, {} bytes",
            session_id,
            chunks.len(),
            chunks.byte_count()
        );

        let finalizer = Arc::clone(&self.finalizer);
        let events = self.events_tx.clone();
        tokio::spawn(async move {
            let _ = finalizer.finalize_session(session_id, chunks, &events).await;
        });

        self.publish();
        Ok(self.completion())
    }

    fn acknowledge(&mut self) -> Result<SessionSnapshot, SessionError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(self.publish());
        };

        match session.fire(SessionEvent::Acknowledge) {
            Transition::Move(_) => {
                info!("Session {} acknowledged", session.id());
                self.session = None;
                Ok(self.publish())
            }
            Transition::Stay => Ok(self.publish()),
            Transition::Reject => Err(SessionError::InvalidState(format!(
                "cannot acknowledge while {}",
                session.phase().as_str()
            ))),
        }
    }

    fn handle_capture_event(&mut self, event: Option<CaptureEvent>) {
        match event {
            Some(CaptureEvent::Chunk(data)) => {
                self.accept_chunk(data);
                self.publish();
            }
            Some(CaptureEvent::Lost(reason)) => {
                warn!("Capture source lost: {}", reason);
                self.stop_capture();
                self.chunks = None;
                self.fail(SessionError::SourceUnavailable(reason));
            }
            None => {
                info!("Capture stream ended");
                self.chunks = None;
            }
        }
    }

    fn accept_chunk(&mut self, data: Vec<u8>) {
        let len = data.len();
        match self.session.as_mut().and_then(|s| s.accept_chunk(data)) {
            Some(seq) => debug!("Chunk {} accepted ({} bytes)", seq, len),
            None => warn!("Rejected {} byte chunk: no session is capturing", len),
        }
    }

    fn handle_pipeline_event(&mut self, event: PipelineEvent) {
        let (session_id, edge) = match &event {
            PipelineEvent::Persisted { session_id, .. } => (*session_id, SessionEvent::Persisted),
            PipelineEvent::Converted { session_id, .. } => (*session_id, SessionEvent::Converted),
            PipelineEvent::Failed { session_id, .. } => (*session_id, SessionEvent::Fail),
        };

        let Some(session) = self.session.as_mut().filter(|s| s.id() == session_id) else {
            warn!("Dropping pipeline event for unknown session {}", session_id);
            return;
        };

        if session.fire(edge) == Transition::Reject {
            warn!(
                "Pipeline event {:?} not valid while {}",
                edge,
                session.phase().as_str()
            );
            return;
        }

        match event {
            PipelineEvent::Persisted { path, .. } => session.record_container(path),
            PipelineEvent::Converted { path, .. } => session.record_output(path),
            PipelineEvent::Failed { error, .. } => session.record_error(error),
        }
        self.publish();
    }

    fn fail(&mut self, error: SessionError) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.fire(SessionEvent::Fail) == Transition::Reject {
            return;
        }
        error!("Session {} failed: {}", session.id(), error);
        session.record_error(error);
        self.publish();
    }

    fn stop_capture(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
        }
    }

    fn phase(&self) -> SessionPhase {
        self.session
            .as_ref()
            .map(Session::phase)
            .unwrap_or(SessionPhase::Idle)
    }

    fn completion(&self) -> Completion {
        let snapshot = self.status.get();
        Completion::new(
            snapshot.session_id.unwrap_or_default(),
            snapshot.state,
            self.status.subscribe(),
        )
    }

    fn publish(&self) -> SessionSnapshot {
        let snapshot = self
            .session
            .as_ref()
            .map(Session::snapshot)
            .unwrap_or_default();
        self.status.publish(snapshot.clone());
        snapshot
    }
}

async fn next_capture_event(
    chunks: &mut Option<mpsc::Receiver<CaptureEvent>>,
) -> Option<CaptureEvent> {
    match chunks {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

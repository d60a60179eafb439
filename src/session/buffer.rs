//! Ordered in-memory accumulation of captured media chunks.

/// One fragment of encoded media, tagged with its arrival sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub seq: u64,
    pub data: Vec<u8>,
}

/// Everything a session captured, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkSequence {
    chunks: Vec<Chunk>,
    byte_count: u64,
}

impl ChunkSequence {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total payload size across all chunks.
    pub fn byte_count(&self) -> u64 {
        self.byte_count
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }
}

/// Accumulates chunks for the active session.
///
/// `append` is amortised O(1). `drain` hands over the whole sequence and
/// leaves the buffer empty; there are no partial reads.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    pending: ChunkSequence,
    next_seq: u64,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a chunk and return its sequence number. Empty payloads are
    /// still sequenced so arrival order stays observable.
    pub fn append(&mut self, data: Vec<u8>) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.byte_count += data.len() as u64;
        self.pending.chunks.push(Chunk { seq, data });
        seq
    }

    pub fn drain(&mut self) -> ChunkSequence {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn byte_count(&self) -> u64 {
        self.pending.byte_count
    }
}

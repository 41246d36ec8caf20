use crate::coherence::snapshot::MemorySnapshot;

/// Flat backing store of last resort. Misses refer to it conceptually; its
/// contents are never fetched and only `reset` writes it.
#[derive(Debug, Clone)]
pub struct FlatMemory {
    bytes: Vec<u8>,
}

impl FlatMemory {
    pub fn new_with_size(size: usize) -> Self {
        let bytes = vec![0u8; size];
        Self { bytes }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr < self.bytes.len() as u64
    }

    pub fn data(&self) -> &[u8] {
        &self.bytes
    }

    /// Zeroes every location in place.
    pub fn reset(&mut self) {
        self.bytes.fill(0);
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            data: self.bytes.clone(),
        }
    }
}

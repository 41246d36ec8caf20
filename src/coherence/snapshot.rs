//! Owned copies of engine state for external inspection. Nothing here aliases
//! the live caches.

use serde::{Deserialize, Serialize};

use crate::coherence::cache::Address;
use crate::coherence::state::CoherenceState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSnapshot {
    pub tag: Option<Address>,
    pub state: CoherenceState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetSnapshot {
    pub lines: Vec<LineSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub sets: Vec<SetSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorSnapshot {
    pub id: usize,
    pub cache: CacheSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub processors: Vec<ProcessorSnapshot>,
    pub memory: MemorySnapshot,
}

impl EngineSnapshot {
    pub fn line(&self, processor_id: usize, set_index: usize, way: usize) -> &LineSnapshot {
        &self.processors[processor_id].cache.sets[set_index].lines[way]
    }
}

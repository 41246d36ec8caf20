use crate::coherence::engine::CoherenceEngine;
use crate::coherence::policy::ReplacementKind;
use crate::sim::config::{CacheConfig, MemConfig};


pub(crate) fn engine(
    num_processors: usize,
    num_sets: usize,
    associativity: usize,
    replacement: ReplacementKind,
) -> CoherenceEngine {
    let cache = CacheConfig {
        num_processors,
        num_sets,
        associativity,
        replacement,
        seed: Some(1),
    };
    CoherenceEngine::from_config(&cache, &MemConfig { size: 256 }).unwrap()
}

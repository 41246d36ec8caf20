pub mod cache;
pub mod engine;
pub mod error;
pub mod event;
pub mod policy;
pub mod snapshot;
pub mod state;

#[cfg(test)]
mod unit_tests;

pub use cache::{Address, Cache, CacheLine, CacheSet};
pub use engine::{Access, CoherenceEngine, Processor};
pub use error::SimError;
pub use event::{Event, EventKind, EventLog};
pub use policy::{ReplacementKind, ReplacementPolicy};
pub use snapshot::EngineSnapshot;
pub use state::CoherenceState;

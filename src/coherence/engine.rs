use log::info;

use crate::coherence::cache::{Address, Cache};
use crate::coherence::error::SimError;
use crate::coherence::event::{EventKind, EventLog};
use crate::coherence::policy::ReplacementPolicy;
use crate::coherence::snapshot::{EngineSnapshot, ProcessorSnapshot};
use crate::coherence::state::CoherenceState;
use crate::sim::config::{CacheConfig, MemConfig};
use crate::sim::flat_mem::FlatMemory;

#[derive(Debug)]
pub struct Processor {
    pub id: usize,
    pub cache: Cache,
}

/// Outcome of one `read`/`write` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Access {
    pub hit: bool,
    pub log: EventLog,
}

/// MOESI protocol engine. Owns memory and every processor's cache; requests
/// are applied one at a time in call order.
#[derive(Debug)]
pub struct CoherenceEngine {
    memory: FlatMemory,
    processors: Vec<Processor>,
}

impl CoherenceEngine {
    pub fn new(
        num_processors: usize,
        memory_size: usize,
        num_sets: usize,
        associativity: usize,
    ) -> Result<Self, SimError> {
        let cache = CacheConfig {
            num_processors,
            num_sets,
            associativity,
            ..CacheConfig::default()
        };
        Self::from_config(&cache, &MemConfig { size: memory_size })
    }

    pub fn from_config(cache: &CacheConfig, mem: &MemConfig) -> Result<Self, SimError> {
        cache.validate()?;
        let policies = (0..cache.num_processors)
            .map(|pid| {
                cache
                    .replacement
                    .build(cache.num_sets, cache.associativity, cache.seed, pid as u64)
            })
            .collect();
        Self::with_policies(cache, mem, policies)
    }

    /// Builds an engine with one caller-supplied replacement policy per
    /// processor, in processor id order.
    pub fn with_policies(
        cache: &CacheConfig,
        mem: &MemConfig,
        policies: Vec<Box<dyn ReplacementPolicy>>,
    ) -> Result<Self, SimError> {
        cache.validate()?;
        mem.validate()?;
        if policies.len() != cache.num_processors {
            return Err(SimError::InvalidConfig(format!(
                "expected {} replacement policies, got {}",
                cache.num_processors,
                policies.len()
            )));
        }
        if let Some(pid) = policies
            .iter()
            .position(|policy| !policy.fits(cache.num_sets, cache.associativity))
        {
            return Err(SimError::InvalidConfig(format!(
                "replacement policy of processor {} does not fit {} sets x {} ways",
                pid, cache.num_sets, cache.associativity
            )));
        }
        let processors = policies
            .into_iter()
            .enumerate()
            .map(|(id, policy)| Processor {
                id,
                cache: Cache::new(cache.num_sets, cache.associativity, policy),
            })
            .collect();
        info!(
            "coherence engine: {} processors, {} sets x {} ways, {} bytes of memory",
            cache.num_processors, cache.num_sets, cache.associativity, mem.size
        );
        Ok(Self {
            memory: FlatMemory::new_with_size(mem.size),
            processors,
        })
    }

    pub fn num_processors(&self) -> usize {
        self.processors.len()
    }

    pub fn processors(&self) -> &[Processor] {
        &self.processors
    }

    pub fn memory(&self) -> &FlatMemory {
        &self.memory
    }

    pub(crate) fn cache_mut(&mut self, processor_id: usize) -> &mut Cache {
        &mut self.processors[processor_id].cache
    }

    fn check(&self, processor_id: usize, address: Address) -> Result<(), SimError> {
        if processor_id >= self.processors.len() {
            return Err(SimError::OutOfRange {
                processor_id,
                num_processors: self.processors.len(),
            });
        }
        if !self.memory.contains(address) {
            return Err(SimError::InvalidAddress {
                address,
                memory_size: self.memory.size(),
            });
        }
        Ok(())
    }

    pub fn read(&mut self, processor_id: usize, address: Address) -> Result<Access, SimError> {
        self.check(processor_id, address)?;
        let mut log = EventLog::new();
        let cache = &mut self.processors[processor_id].cache;
        let (set_index, tag) = cache.decode(address);

        if let Some(way) = cache.find(set_index, tag) {
            cache.touch(set_index, way);
            let line = cache.line_mut(set_index, way);
            if line.state.is_valid() {
                log.push(processor_id, EventKind::ReadHit { address });
                return Ok(Access { hit: true, log });
            }
            line.state = CoherenceState::Shared;
            log.push(processor_id, EventKind::ReadMiss { address });
            log.push(
                processor_id,
                EventKind::SetState {
                    state: CoherenceState::Shared,
                },
            );
            return Ok(Access { hit: false, log });
        }

        log.push(processor_id, EventKind::ReadMiss { address });
        let way = cache.replace(set_index, tag, CoherenceState::Shared);
        log.push(
            processor_id,
            EventKind::Replace {
                way,
                tag,
                state: CoherenceState::Shared,
            },
        );
        Ok(Access { hit: false, log })
    }

    pub fn write(&mut self, processor_id: usize, address: Address) -> Result<Access, SimError> {
        self.check(processor_id, address)?;
        let mut log = EventLog::new();
        let cache = &mut self.processors[processor_id].cache;
        let (set_index, tag) = cache.decode(address);

        if let Some(way) = cache.find(set_index, tag) {
            cache.touch(set_index, way);
            let line = cache.line_mut(set_index, way);
            if line.state.grants_write() {
                log.push(processor_id, EventKind::WriteHit { address });
                line.state = CoherenceState::Modified;
                log.push(
                    processor_id,
                    EventKind::SetState {
                        state: CoherenceState::Modified,
                    },
                );
                return Ok(Access { hit: true, log });
            }
            line.state = CoherenceState::Modified;
            log.push(processor_id, EventKind::WriteUpgrade { address });
            self.invalidate_other_copies(processor_id, address, &mut log);
            log.push(
                processor_id,
                EventKind::SetState {
                    state: CoherenceState::Modified,
                },
            );
            return Ok(Access { hit: false, log });
        }

        log.push(processor_id, EventKind::WriteMiss { address });
        let way = cache.replace(set_index, tag, CoherenceState::Modified);
        log.push(
            processor_id,
            EventKind::Replace {
                way,
                tag,
                state: CoherenceState::Modified,
            },
        );
        self.invalidate_other_copies(processor_id, address, &mut log);
        Ok(Access { hit: false, log })
    }

    /// Forces every other processor's line matching `address` to `Invalid`,
    /// whatever its prior state. `(set_index, tag)` come from processor 0's
    /// geometry, which all caches share.
    fn invalidate_other_copies(
        &mut self,
        processor_id: usize,
        address: Address,
        log: &mut EventLog,
    ) {
        let (set_index, tag) = self.processors[0].cache.decode(address);
        for other in self.processors.iter_mut().filter(|p| p.id != processor_id) {
            let ways = other.cache.set(set_index).associativity();
            for way in 0..ways {
                let line = other.cache.line_mut(set_index, way);
                if line.matches(tag) {
                    line.state = CoherenceState::Invalid;
                    log.push(other.id, EventKind::Invalidate { tag });
                }
            }
        }
    }

    /// Clears every line to `(None, Invalid)` and zeroes memory. Geometry is
    /// left untouched.
    pub fn reset(&mut self) {
        for processor in self.processors.iter_mut() {
            processor.cache.reset();
        }
        self.memory.reset();
        info!("coherence engine reset");
    }

    pub fn get_cache_state(&self) -> EngineSnapshot {
        EngineSnapshot {
            processors: self
                .processors
                .iter()
                .map(|p| ProcessorSnapshot {
                    id: p.id,
                    cache: p.cache.snapshot(),
                })
                .collect(),
            memory: self.memory.snapshot(),
        }
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.get_cache_state()
    }
}

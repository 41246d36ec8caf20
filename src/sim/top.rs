use std::fs;

use anyhow::Context;
use log::info;
use serde::Serialize;

use crate::coherence::engine::CoherenceEngine;
use crate::coherence::snapshot::EngineSnapshot;
use crate::sim::config::{CacheConfig, MemConfig, SimConfig};
use crate::sim::trace::{AccessOp, Tracer};

/// Console output of a replay: `0` quiet, `1` one line per request, `2`
/// every protocol event as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    Requests,
    Events,
}

impl Verbosity {
    pub fn from_level(level: u64) -> Self {
        match level {
            0 => Self::Quiet,
            1 => Self::Requests,
            _ => Self::Events,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplayStats {
    pub reads: u64,
    pub writes: u64,
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

/// Replays an access trace against a `CoherenceEngine`.
pub struct Sim {
    config: SimConfig,
    verbosity: Verbosity,
    engine: CoherenceEngine,
    stats: ReplayStats,
}

impl Sim {
    pub fn new(
        sim_config: SimConfig,
        cache_config: CacheConfig,
        mem_config: MemConfig,
    ) -> anyhow::Result<Sim> {
        let engine = CoherenceEngine::from_config(&cache_config, &mem_config)
            .context("cannot build coherence engine")?;
        Ok(Sim {
            verbosity: Verbosity::from_level(sim_config.log_level),
            config: sim_config,
            engine,
            stats: ReplayStats::default(),
        })
    }

    pub fn engine(&self) -> &CoherenceEngine {
        &self.engine
    }

    pub fn stats(&self) -> ReplayStats {
        self.stats
    }

    /// Applies every request of `trace` in order. Stops at the first request
    /// the engine rejects.
    pub fn replay(&mut self, trace: &mut Tracer) -> anyhow::Result<ReplayStats> {
        while let Some(line) = trace.consume() {
            let access = match line.op {
                AccessOp::Read => {
                    self.stats.reads += 1;
                    self.engine.read(line.processor_id, line.address)
                }
                AccessOp::Write => {
                    self.stats.writes += 1;
                    self.engine.write(line.processor_id, line.address)
                }
            }
            .with_context(|| format!("trace line {}", line.lineno))?;

            if access.hit {
                self.stats.hits += 1;
            } else {
                self.stats.misses += 1;
            }
            self.stats.invalidations += access.log.invalidations() as u64;

            if self.verbosity >= Verbosity::Requests {
                println!(
                    "[{}] {:?} cpu={} addr={} -> {}",
                    line.lineno,
                    line.op,
                    line.processor_id,
                    line.address,
                    if access.hit { "hit" } else { "miss" }
                );
            }
            if self.verbosity >= Verbosity::Events {
                for event in access.log.iter() {
                    println!("      {}", event);
                }
            }
        }
        Ok(self.stats)
    }

    /// Loads the configured trace, replays it and writes the final snapshot
    /// where configured.
    pub fn simulate(&mut self) -> anyhow::Result<ReplayStats> {
        let mut trace = Tracer::from_file(&self.config.trace)?;
        info!("replaying {} requests", trace.len());
        let stats = self.replay(&mut trace)?;

        let snapshot = self.engine.get_cache_state();
        if self.config.print_snapshot {
            print!("{}", render_snapshot(&snapshot));
        }
        if let Some(path) = &self.config.snapshot {
            let payload = serde_json::to_string_pretty(&snapshot)?;
            fs::write(path, payload)
                .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
        }
        Ok(stats)
    }
}

/// One row per processor and set: `P<id> set <n>: [tag/state, ...]`.
pub fn render_snapshot(snapshot: &EngineSnapshot) -> String {
    let mut out = String::new();
    for processor in &snapshot.processors {
        for (set_index, set) in processor.cache.sets.iter().enumerate() {
            let lines: Vec<String> = set
                .lines
                .iter()
                .map(|line| match line.tag {
                    Some(tag) => format!("{}/{}", tag, line.state),
                    None => format!("-/{}", line.state),
                })
                .collect();
            out.push_str(&format!(
                "P{} set {}: [{}]\n",
                processor.id,
                set_index,
                lines.join(", ")
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coherence::error::SimError;
    use crate::coherence::policy::ReplacementKind;

    fn sim(num_processors: usize) -> Sim {
        let cache = CacheConfig {
            num_processors,
            num_sets: 1,
            associativity: 1,
            replacement: ReplacementKind::Lru,
            seed: None,
        };
        Sim::new(
            SimConfig {
                log_level: 0,
                ..SimConfig::default()
            },
            cache,
            MemConfig { size: 16 },
        )
        .unwrap()
    }

    #[test]
    fn verbosity_maps_from_log_level() {
        assert_eq!(Verbosity::from_level(0), Verbosity::Quiet);
        assert_eq!(Verbosity::from_level(1), Verbosity::Requests);
        assert_eq!(Verbosity::from_level(2), Verbosity::Events);
        assert!(Verbosity::Events > Verbosity::Requests);
    }

    #[test]
    fn replay_counts_hits_misses_and_invalidations() {
        let mut sim = sim(2);
        let mut trace = Tracer::parse("r 0 0\nr 1 0\nw 0 0\nr 1 0\nr 1 0\n").unwrap();
        let stats = sim.replay(&mut trace).unwrap();
        assert_eq!(
            stats,
            ReplayStats {
                reads: 4,
                writes: 1,
                hits: 1,
                misses: 4,
                invalidations: 1,
            }
        );
    }

    #[test]
    fn replay_stops_on_bad_processor() {
        let mut sim = sim(2);
        let mut trace = Tracer::parse("r 0 0\nr 5 0\nr 1 0\n").unwrap();
        let err = sim.replay(&mut trace).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SimError>(),
            Some(&SimError::OutOfRange {
                processor_id: 5,
                num_processors: 2
            })
        );
        assert_eq!(trace.len(), 1);
    }

    #[test]
    fn render_snapshot_lists_every_set() {
        let mut sim = sim(2);
        let mut trace = Tracer::parse("w 1 3\n").unwrap();
        sim.replay(&mut trace).unwrap();
        let text = render_snapshot(&sim.engine().get_cache_state());
        assert_eq!(text, "P0 set 0: [-/I]\nP1 set 0: [3/M]\n");
    }

    #[test]
    fn snapshot_serializes_state_letters() {
        let mut sim = sim(1);
        let mut trace = Tracer::parse("r 0 2\n").unwrap();
        sim.replay(&mut trace).unwrap();
        let json = serde_json::to_value(sim.engine().get_cache_state()).unwrap();
        assert_eq!(json["processors"][0]["cache"]["sets"][0]["lines"][0]["state"], "S");
        assert_eq!(json["processors"][0]["cache"]["sets"][0]["lines"][0]["tag"], 2);
        assert_eq!(json["memory"]["data"].as_array().unwrap().len(), 16);
    }
}

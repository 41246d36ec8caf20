use std::fmt::Debug;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

/// Victim selection within one associative set.
///
/// Every processor's cache owns its own policy instance. `touch` is called on
/// each hit and each fill so recency-based policies can track use.
pub trait ReplacementPolicy: Debug + Send {
    fn victim(&mut self, set_index: usize, ways: usize) -> usize;

    fn touch(&mut self, _set_index: usize, _way: usize) {}

    fn reset(&mut self) {}

    /// Whether per-set state covers a cache of `sets` x `ways`.
    fn fits(&self, _sets: usize, _ways: usize) -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReplacementKind {
    #[default]
    Random,
    Lru,
    RoundRobin,
}

impl FromStr for ReplacementKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "random" => Ok(Self::Random),
            "lru" => Ok(Self::Lru),
            "round_robin" => Ok(Self::RoundRobin),
            _ => Err(format!(
                "unsupported replacement policy '{}', expected one of: random, lru, round_robin",
                value
            )),
        }
    }
}

impl ReplacementKind {
    /// Builds a fresh policy for a cache of `sets` x `ways`. `seed` only
    /// affects `Random`; processor `salt` keeps seeded streams distinct.
    pub fn build(
        self,
        sets: usize,
        ways: usize,
        seed: Option<u64>,
        salt: u64,
    ) -> Box<dyn ReplacementPolicy> {
        match self {
            Self::Random => Box::new(RandomReplacement::new(seed.map(|s| s ^ salt))),
            Self::Lru => Box::new(LruReplacement::new(sets, ways)),
            Self::RoundRobin => Box::new(RoundRobinReplacement::new(sets)),
        }
    }
}

/// Uniform choice over `[0, ways)`. Empty lines get no preference.
#[derive(Debug)]
pub struct RandomReplacement {
    seed: Option<u64>,
    rng: StdRng,
}

impl RandomReplacement {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            seed,
            rng: Self::make_rng(seed),
        }
    }

    fn make_rng(seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl ReplacementPolicy for RandomReplacement {
    fn victim(&mut self, _set_index: usize, ways: usize) -> usize {
        self.rng.gen_range(0..ways.max(1))
    }

    fn reset(&mut self) {
        self.rng = Self::make_rng(self.seed);
    }
}

/// Least-recently-touched way per set. Front of each order is MRU.
#[derive(Debug)]
pub struct LruReplacement {
    ways: usize,
    order: Vec<Vec<usize>>,
}

impl LruReplacement {
    pub fn new(sets: usize, ways: usize) -> Self {
        let ways = ways.max(1);
        let order = (0..sets.max(1)).map(|_| (0..ways).collect()).collect();
        Self { ways, order }
    }
}

impl ReplacementPolicy for LruReplacement {
    fn victim(&mut self, set_index: usize, ways: usize) -> usize {
        self.order[set_index]
            .iter()
            .rev()
            .copied()
            .find(|&way| way < ways)
            .unwrap_or(0)
    }

    fn touch(&mut self, set_index: usize, way: usize) {
        let order = &mut self.order[set_index];
        if let Some(pos) = order.iter().position(|&idx| idx == way) {
            order.remove(pos);
        }
        order.insert(0, way);
    }

    fn reset(&mut self) {
        for order in self.order.iter_mut() {
            order.clear();
            order.extend(0..self.ways);
        }
    }

    fn fits(&self, sets: usize, ways: usize) -> bool {
        self.order.len() == sets && self.ways == ways
    }
}

/// Per-set cursor advancing one way on every eviction.
#[derive(Debug)]
pub struct RoundRobinReplacement {
    next: Vec<usize>,
}

impl RoundRobinReplacement {
    pub fn new(sets: usize) -> Self {
        Self {
            next: vec![0; sets.max(1)],
        }
    }
}

impl ReplacementPolicy for RoundRobinReplacement {
    fn victim(&mut self, set_index: usize, ways: usize) -> usize {
        let ways = ways.max(1);
        let way = self.next[set_index] % ways;
        self.next[set_index] = (way + 1) % ways;
        way
    }

    fn reset(&mut self) {
        self.next.iter_mut().for_each(|cursor| *cursor = 0);
    }

    fn fits(&self, sets: usize, _ways: usize) -> bool {
        self.next.len() == sets
    }
}

use crate::coherence::policy::ReplacementPolicy;
use crate::coherence::snapshot::{CacheSnapshot, LineSnapshot, SetSnapshot};
use crate::coherence::state::CoherenceState;

pub type Address = u64;

/// Splits `address` into `(set_index, tag)` for a cache of `num_sets` sets.
pub fn decode(address: Address, num_sets: usize) -> (usize, Address) {
    let sets = num_sets as u64;
    ((address % sets) as usize, address / sets)
}

/// Smallest coherence unit. An unused line has no tag and is `Invalid`; an
/// invalidated line may keep its stale tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheLine {
    pub tag: Option<Address>,
    pub state: CoherenceState,
}

impl CacheLine {
    pub fn matches(&self, tag: Address) -> bool {
        self.tag.map_or(false, |t| t == tag)
    }

    fn clear(&mut self) {
        self.tag = None;
        self.state = CoherenceState::Invalid;
    }
}

#[derive(Debug, Clone)]
pub struct CacheSet {
    lines: Vec<CacheLine>,
}

impl CacheSet {
    fn new(ways: usize) -> Self {
        Self {
            lines: vec![CacheLine::default(); ways],
        }
    }

    /// First way whose tag matches, whatever its state.
    pub fn find(&self, tag: Address) -> Option<usize> {
        self.lines.iter().position(|line| line.matches(tag))
    }

    pub fn lines(&self) -> &[CacheLine] {
        &self.lines
    }

    pub fn associativity(&self) -> usize {
        self.lines.len()
    }
}

/// Private cache of one processor: `num_sets` sets of `associativity` ways.
#[derive(Debug)]
pub struct Cache {
    sets: Vec<CacheSet>,
    ways: usize,
    policy: Box<dyn ReplacementPolicy>,
}

impl Cache {
    pub fn new(num_sets: usize, ways: usize, policy: Box<dyn ReplacementPolicy>) -> Self {
        assert!(num_sets > 0, "cache must have at least one set");
        assert!(ways > 0, "cache must have at least one way");
        let sets = (0..num_sets).map(|_| CacheSet::new(ways)).collect();
        Self { sets, ways, policy }
    }

    pub fn num_sets(&self) -> usize {
        self.sets.len()
    }

    pub fn associativity(&self) -> usize {
        self.ways
    }

    pub fn decode(&self, address: Address) -> (usize, Address) {
        decode(address, self.num_sets())
    }

    pub fn set(&self, set_index: usize) -> &CacheSet {
        &self.sets[set_index]
    }

    pub fn sets(&self) -> &[CacheSet] {
        &self.sets
    }

    pub fn find(&self, set_index: usize, tag: Address) -> Option<usize> {
        self.sets[set_index].find(tag)
    }

    pub fn line(&self, set_index: usize, way: usize) -> &CacheLine {
        &self.sets[set_index].lines[way]
    }

    pub(crate) fn line_mut(&mut self, set_index: usize, way: usize) -> &mut CacheLine {
        &mut self.sets[set_index].lines[way]
    }

    /// Records a use of `way` with the replacement policy.
    pub(crate) fn touch(&mut self, set_index: usize, way: usize) {
        self.policy.touch(set_index, way);
    }

    /// Overwrites a policy-chosen victim with `(tag, state)` and returns its
    /// way. The victim's previous contents are dropped with no writeback,
    /// even when it held `Modified` data.
    pub(crate) fn replace(
        &mut self,
        set_index: usize,
        tag: Address,
        state: CoherenceState,
    ) -> usize {
        let way = self.policy.victim(set_index, self.ways) % self.ways;
        let line = self.line_mut(set_index, way);
        line.tag = Some(tag);
        line.state = state;
        self.policy.touch(set_index, way);
        way
    }

    pub fn reset(&mut self) {
        self.sets
            .iter_mut()
            .flat_map(|set| set.lines.iter_mut())
            .for_each(CacheLine::clear);
        self.policy.reset();
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            sets: self
                .sets
                .iter()
                .map(|set| SetSnapshot {
                    lines: set
                        .lines
                        .iter()
                        .map(|line| LineSnapshot {
                            tag: line.tag,
                            state: line.state,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coherence::policy::{LruReplacement, RoundRobinReplacement};

    fn lru_cache(sets: usize, ways: usize) -> Cache {
        Cache::new(sets, ways, Box::new(LruReplacement::new(sets, ways)))
    }

    #[test]
    fn decode_splits_by_set_count() {
        assert_eq!(decode(0, 4), (0, 0));
        assert_eq!(decode(13, 4), (1, 3));
        assert_eq!(decode(13, 1), (0, 13));
    }

    #[test]
    fn new_cache_is_empty_and_invalid() {
        let cache = lru_cache(4, 2);
        assert_eq!(cache.num_sets(), 4);
        assert_eq!(cache.associativity(), 2);
        for set in cache.sets() {
            for line in set.lines() {
                assert_eq!(*line, CacheLine::default());
            }
        }
    }

    #[test]
    fn empty_line_never_matches() {
        let cache = lru_cache(1, 2);
        assert_eq!(cache.find(0, 0), None);
    }

    #[test]
    fn replace_fills_victim_and_is_found() {
        let mut cache = lru_cache(2, 2);
        let way = cache.replace(1, 7, CoherenceState::Shared);
        assert_eq!(cache.find(1, 7), Some(way));
        assert_eq!(cache.line(1, way).state, CoherenceState::Shared);
        assert_eq!(cache.find(0, 7), None);
    }

    #[test]
    fn replace_discards_modified_victim() {
        let mut cache = Cache::new(1, 1, Box::new(RoundRobinReplacement::new(1)));
        cache.replace(0, 1, CoherenceState::Modified);
        cache.replace(0, 2, CoherenceState::Shared);
        assert_eq!(cache.find(0, 1), None);
        assert_eq!(
            *cache.line(0, 0),
            CacheLine {
                tag: Some(2),
                state: CoherenceState::Shared
            }
        );
    }

    #[test]
    fn stale_tag_survives_invalidation() {
        let mut cache = lru_cache(1, 1);
        cache.replace(0, 3, CoherenceState::Shared);
        cache.line_mut(0, 0).state = CoherenceState::Invalid;
        assert_eq!(cache.find(0, 3), Some(0));
    }

    #[test]
    fn reset_clears_tags_and_states() {
        let mut cache = lru_cache(2, 2);
        cache.replace(0, 1, CoherenceState::Modified);
        cache.replace(1, 2, CoherenceState::Shared);
        cache.reset();
        assert!(cache
            .sets()
            .iter()
            .flat_map(|set| set.lines())
            .all(|line| line.tag.is_none() && line.state == CoherenceState::Invalid));
    }
}

use std::fmt;

use smallvec::SmallVec;

use crate::coherence::cache::Address;
use crate::coherence::state::CoherenceState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    ReadHit { address: Address },
    ReadMiss { address: Address },
    WriteHit { address: Address },
    /// Write to a present but `Shared`/`Invalid` line.
    WriteUpgrade { address: Address },
    /// Write with no tag match in the set.
    WriteMiss { address: Address },
    SetState { state: CoherenceState },
    Replace { way: usize, tag: Address, state: CoherenceState },
    Invalidate { tag: Address },
}

/// One trace line, attributed to the processor whose cache it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub processor_id: usize,
    pub kind: EventKind,
}

impl Event {
    pub fn is_invalidation(&self) -> bool {
        matches!(self.kind, EventKind::Invalidate { .. })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CPU{}: ", self.processor_id)?;
        match self.kind {
            EventKind::ReadHit { address } => write!(f, "Read hit for address {}", address),
            EventKind::ReadMiss { address } => {
                write!(f, "Read miss for address {}, fetching from memory", address)
            }
            EventKind::WriteHit { address } => write!(f, "Write hit for address {}", address),
            EventKind::WriteUpgrade { address } => write!(
                f,
                "Write miss for address {}, invalidating other copies",
                address
            ),
            EventKind::WriteMiss { address } => {
                write!(f, "Write miss for address {}, fetching from memory", address)
            }
            EventKind::SetState { state } => write!(f, "Setting cache line state to {}", state),
            EventKind::Replace { way, tag, state } => write!(
                f,
                "Replacing cache line {} with tag {}, setting state to {}",
                way, tag, state
            ),
            EventKind::Invalidate { tag } => {
                write!(f, "Invalidating cache line with tag {}", tag)
            }
        }
    }
}

/// Ordered trace of a single `read`/`write` call. Built fresh per call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    events: SmallVec<[Event; 4]>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, processor_id: usize, kind: EventKind) {
        let event = Event { processor_id, kind };
        log::debug!("{}", event);
        self.events.push(event);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn lines(&self) -> Vec<String> {
        self.events.iter().map(Event::to_string).collect()
    }

    pub fn invalidations(&self) -> usize {
        self.events.iter().filter(|e| e.is_invalidation()).count()
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_render_trace_lines() {
        let mut log = EventLog::new();
        log.push(0, EventKind::ReadMiss { address: 5 });
        log.push(
            0,
            EventKind::Replace {
                way: 1,
                tag: 2,
                state: CoherenceState::Shared,
            },
        );
        log.push(3, EventKind::Invalidate { tag: 2 });
        assert_eq!(
            log.lines(),
            vec![
                "CPU0: Read miss for address 5, fetching from memory",
                "CPU0: Replacing cache line 1 with tag 2, setting state to S",
                "CPU3: Invalidating cache line with tag 2",
            ]
        );
        assert_eq!(log.invalidations(), 1);
    }

    #[test]
    fn write_events_render_trace_lines() {
        let mut log = EventLog::new();
        log.push(1, EventKind::WriteHit { address: 9 });
        log.push(1, EventKind::WriteUpgrade { address: 9 });
        log.push(1, EventKind::WriteMiss { address: 9 });
        log.push(
            1,
            EventKind::SetState {
                state: CoherenceState::Modified,
            },
        );
        assert_eq!(
            log.lines(),
            vec![
                "CPU1: Write hit for address 9",
                "CPU1: Write miss for address 9, invalidating other copies",
                "CPU1: Write miss for address 9, fetching from memory",
                "CPU1: Setting cache line state to M",
            ]
        );
    }

    #[test]
    fn new_log_is_empty() {
        let log = EventLog::new();
        assert!(log.is_empty());
        assert_eq!(log.len(), 0);
    }
}

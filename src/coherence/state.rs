use std::fmt;

use serde::{Deserialize, Serialize};

/// MOESI coherence state of a single cache line.
///
/// `Exclusive` and `Owned` are not distinguished operationally: both count as
/// silent-hit states for reads and writes, same as `Modified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CoherenceState {
    #[default]
    #[serde(rename = "I")]
    Invalid,
    #[serde(rename = "S")]
    Shared,
    #[serde(rename = "E")]
    Exclusive,
    #[serde(rename = "M")]
    Modified,
    #[serde(rename = "O")]
    Owned,
}

impl CoherenceState {
    pub fn as_char(self) -> char {
        match self {
            Self::Invalid => 'I',
            Self::Shared => 'S',
            Self::Exclusive => 'E',
            Self::Modified => 'M',
            Self::Owned => 'O',
        }
    }

    pub fn is_valid(self) -> bool {
        !matches!(self, Self::Invalid)
    }

    /// States in which a write completes locally without a broadcast.
    pub fn grants_write(self) -> bool {
        matches!(self, Self::Modified | Self::Owned | Self::Exclusive)
    }
}

impl fmt::Display for CoherenceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

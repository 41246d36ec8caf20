use std::path::PathBuf;

use anyhow::Context;
use log::warn;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use toml::*;

use crate::coherence::error::SimError;
use crate::coherence::policy::ReplacementKind;

pub trait Config: DeserializeOwned + Default {
    fn from_section(section: Option<&Value>) -> anyhow::Result<Self> {
        match section {
            Some(value) => value.clone().try_into().context("cannot deserialize config"),
            None => {
                warn!("config section not found");
                Ok(Self::default())
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimConfig {
    pub trace: PathBuf,
    pub log_level: u64,
    pub snapshot: Option<PathBuf>,
    pub print_snapshot: bool,
}

impl Config for SimConfig {}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            trace: PathBuf::new(),
            log_level: 1,
            snapshot: None,
            print_snapshot: false,
        }
    }
}

/// Geometry shared by every processor's cache.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct CacheConfig {
    pub num_processors: usize,
    pub num_sets: usize,
    pub associativity: usize,
    pub replacement: ReplacementKind,
    pub seed: Option<u64>,
}

impl Config for CacheConfig {}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            num_processors: 4,
            num_sets: 4,
            associativity: 2,
            replacement: ReplacementKind::Random,
            seed: None,
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.num_processors == 0 {
            return Err(SimError::InvalidConfig("num_processors must be > 0".into()));
        }
        if self.num_sets == 0 {
            return Err(SimError::InvalidConfig("num_sets must be > 0".into()));
        }
        if self.associativity == 0 {
            return Err(SimError::InvalidConfig("associativity must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct MemConfig {
    pub size: usize,
}

impl Config for MemConfig {}

impl Default for MemConfig {
    fn default() -> Self {
        Self { size: 1024 }
    }
}

impl MemConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.size == 0 {
            return Err(SimError::InvalidConfig("memory size must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_deserialize_with_defaults() {
        let table: Table = toml::from_str(
            r#"
            [cache]
            num_processors = 2
            replacement = "round_robin"
            seed = 11

            [mem]
            size = 64
            "#,
        )
        .unwrap();
        let cache = CacheConfig::from_section(table.get("cache")).unwrap();
        let mem = MemConfig::from_section(table.get("mem")).unwrap();
        let sim = SimConfig::from_section(table.get("sim")).unwrap();
        assert_eq!(cache.num_processors, 2);
        assert_eq!(cache.num_sets, 4);
        assert_eq!(cache.associativity, 2);
        assert_eq!(cache.replacement, ReplacementKind::RoundRobin);
        assert_eq!(cache.seed, Some(11));
        assert_eq!(mem.size, 64);
        assert_eq!(sim.log_level, 1);
    }

    #[test]
    fn unknown_replacement_is_an_error() {
        let table: Table = toml::from_str(
            r#"
            [cache]
            replacement = "fifo"
            "#,
        )
        .unwrap();
        let err = CacheConfig::from_section(table.get("cache")).unwrap_err();
        assert!(format!("{:#}", err).contains("cannot deserialize config"));
    }

    #[test]
    fn zero_geometry_is_rejected() {
        let cache = CacheConfig {
            associativity: 0,
            ..CacheConfig::default()
        };
        assert!(matches!(cache.validate(), Err(SimError::InvalidConfig(_))));
        assert!(MemConfig { size: 0 }.validate().is_err());
        assert!(CacheConfig::default().validate().is_ok());
    }
}

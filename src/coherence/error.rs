use thiserror::Error;

use crate::coherence::cache::Address;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("processor id {processor_id} out of range (have {num_processors} processors)")]
    OutOfRange {
        processor_id: usize,
        num_processors: usize,
    },
    #[error("invalid address {address} (memory holds {memory_size} locations)")]
    InvalidAddress { address: Address, memory_size: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

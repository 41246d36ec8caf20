pub mod config;
pub mod flat_mem;
pub mod top;
pub mod trace;

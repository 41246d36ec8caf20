pub mod coherence;
pub mod sim;

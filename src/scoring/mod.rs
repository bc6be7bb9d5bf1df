pub mod autoencoder;
pub mod ensemble;
pub mod isolation_forest;
pub mod synthetic;

pub use ensemble::{EnsembleScorer, Scorer};

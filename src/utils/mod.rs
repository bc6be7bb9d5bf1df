pub mod geo;
pub mod hash;

pub use geo::{distance_km, Coordinate};
pub use hash::{encode_categorical, stable_hash};

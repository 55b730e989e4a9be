//! Configuration data structures for simulation setups.

mod parameters;

pub use parameters::{FitnessInput, ModelParameters, Parameters, ReplicationModel};

//! This module contains the core datatypes of the library.

pub mod fitness;
pub mod growth;
pub mod network;

pub use fitness::{Basis, FitnessLandscape};
pub use growth::{FitnessContext, GrowthModel, IntrahostModel, TransitionMatrix};
pub use network::{HostId, HostNetwork};

//! Readers for the plain text inputs: fitness landscapes, host networks and host-tagged
//! sequences.

mod landscape;
mod network;
mod sequences;

pub use landscape::LandscapeIO;
pub use network::NetworkIO;
pub use sequences::{Inoculum, read_sequences, read_sequences_from_file};

//! Model module for the disease classification network (Burn)
//!
//! The network is only ever restored from a checkpoint and run forward;
//! training happens elsewhere.

pub mod cnn;

pub use cnn::{LeafDiseaseNet, LeafDiseaseNetConfig};

//! Lineage graph storage and read-only analyses over it.

pub mod analysis;
pub mod lineage;

pub use analysis::{contacts_to_notify, detect_cycles, downstream_closure};
pub use lineage::{LineageGraph, Node};

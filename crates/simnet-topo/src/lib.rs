//! Topology graph model for simnet.
//!
//! This crate contains:
//! - **Graph model** - nodes, interfaces, and point-to-point links with
//!   uniqueness and referential invariants
//! - **Snapshots** - lossless JSON round-trip of a whole topology, the
//!   handoff mechanism between a `run` and a later `stop` invocation
//!
//! The graph is deliberately plain data: the build backends in
//! `simnet-build` assign ports and pids onto it, then persist it.

pub mod graph;
pub mod snapshot;

pub use graph::{Endpoint, Link, LinkId, Node, TopoError, Topology, DEFAULT_VM_TYPE};
pub use snapshot::{SnapshotError, SNAPSHOT_FILE};

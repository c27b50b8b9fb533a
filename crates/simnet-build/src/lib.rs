//! Build backends for simnet.
//!
//! Turns a resource-free topology graph into running virtual machines:
//! - **Builder selection** - explicit registry of backends, filtered by
//!   host support, picked by preference
//! - **Port leasing** - cross-process-safe UDP/TCP port allocation over
//!   durable marker files
//! - **Command synthesis** - per-vendor hypervisor argument lists from a
//!   node's allocated resources
//! - **Process lifecycle** - detached launch, snapshot handoff, and
//!   recursive tree teardown on stop

pub mod builder;
pub mod config;
pub mod depot;
pub mod error;
pub mod kvm;
pub mod ports;
pub mod proc;
pub mod vm;

pub use builder::{select, Builder, BuilderKind};
pub use config::SimConfig;
pub use depot::ImageDepot;
pub use error::BuildError;
pub use kvm::KvmBuilder;
pub use ports::PortAllocator;

//! Build error taxonomy.
//!
//! Resource and configuration errors abort the whole `run`; stop-side
//! conditions (stale pids, lock contention, missing markers) are handled
//! locally by the components and never surface here.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    /// Missing or invalid simulation directory, depot path, or config
    /// value. Fatal to the node's build before anything is launched.
    #[error("configuration error: {0}")]
    Config(String),

    /// The allocator ran out of free ports before the node's block was
    /// complete. Not retried.
    #[error("not enough free ports: needed {needed}, got {got}")]
    ResourceExhausted { needed: usize, got: usize },

    /// Interface index maps past the last usable PCI slot. Hard ceiling.
    #[error("no more pci slots available to add interfaces (slot {slot})")]
    NoMorePciSlots { slot: usize },

    /// No backend in the registry is usable on this host.
    #[error("no builders supported on this host")]
    NoBuildersSupported,

    /// The requested vendor has no directory in the image depot.
    #[error("unknown vm type for image {0:?}")]
    UnknownVmType(String),

    /// The vendor directory exists but holds no bootable image.
    #[error("no qcow2 image found for {0:?}")]
    ImageNotFound(String),

    /// qemu-img failed while deriving the per-node copy-on-write image.
    #[error("backer image creation failed: {0}")]
    BackerImage(String),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] simnet_topo::SnapshotError),

    #[error("config file parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

//! Backend selection.
//!
//! Backends are a closed registry: each kind declares a preference
//! (lower wins) and a host-support predicate. Selection filters the
//! registry to supported kinds, sorts by preference, and instantiates
//! the first. No backend usable means the run cannot proceed at all.

use std::path::Path;

use simnet_topo::Topology;

use crate::config::SimConfig;
use crate::error::BuildError;
use crate::kvm::{self, KvmBuilder};

/// A backend capable of turning a topology into running processes.
pub trait Builder: std::fmt::Debug {
    fn run(&mut self) -> Result<(), BuildError>;
    fn stop(&mut self) -> Result<(), BuildError>;
}

/// Registered backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderKind {
    Kvm,
}

/// Every backend this build knows about.
pub const REGISTRY: &[BuilderKind] = &[BuilderKind::Kvm];

impl BuilderKind {
    /// Lower is more preferred.
    pub const fn preference(self) -> u32 {
        match self {
            BuilderKind::Kvm => kvm::PREFERENCE,
        }
    }

    /// Whether this backend can run on the current host.
    pub fn is_supported(self, config: &SimConfig) -> bool {
        match self {
            BuilderKind::Kvm => config.hypervisor.is_file(),
        }
    }

    pub fn instantiate(
        self,
        topology: Topology,
        sim_dir: &Path,
        image_depot: &Path,
        config: SimConfig,
    ) -> Result<Box<dyn Builder>, BuildError> {
        match self {
            BuilderKind::Kvm => Ok(Box::new(KvmBuilder::new(
                topology,
                sim_dir,
                image_depot,
                config,
            )?)),
        }
    }
}

impl Builder for KvmBuilder {
    fn run(&mut self) -> Result<(), BuildError> {
        KvmBuilder::run(self)
    }

    fn stop(&mut self) -> Result<(), BuildError> {
        KvmBuilder::stop(self)
    }
}

/// Pick the most preferred supported backend and instantiate it.
pub fn select(
    topology: Topology,
    sim_dir: &Path,
    image_depot: &Path,
    config: &SimConfig,
) -> Result<Box<dyn Builder>, BuildError> {
    let mut supported: Vec<BuilderKind> = REGISTRY
        .iter()
        .copied()
        .filter(|kind| kind.is_supported(config))
        .collect();
    supported.sort_by_key(|kind| kind.preference());

    let Some(kind) = supported.first().copied() else {
        return Err(BuildError::NoBuildersSupported);
    };
    tracing::info!(builder = ?kind, preference = kind.preference(), "selected builder");
    kind.instantiate(topology, sim_dir, image_depot, config.clone())
}

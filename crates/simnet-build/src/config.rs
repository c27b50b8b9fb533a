//! Simulation configuration.
//!
//! Optional TOML file mapped through `#[serde(default)]` input structs,
//! then resolved into a fully-populated [`SimConfig`]. Everything has a
//! usable default so the file is only needed to override the hypervisor
//! path, the port range, or the per-node sizing floors.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::BuildError;

pub const DEFAULT_HYPERVISOR: &str = "/usr/bin/kvm";
pub const DEFAULT_MARKER_DIR: &str = "/var/run/simnet/ports";
pub const DEFAULT_PORT_START: u16 = 61001;
pub const DEFAULT_PORT_END: u16 = 65535;
pub const DEFAULT_CORES: u32 = 2;
pub const DEFAULT_RAM_MB: u32 = 2048;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimConfigInput {
    pub hypervisor: Option<String>,
    pub ports: PortsInput,
    pub defaults: DefaultsInput,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PortsInput {
    pub start: Option<u16>,
    pub end: Option<u16>,
    pub marker_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DefaultsInput {
    pub cores: Option<u32>,
    pub ram_mb: Option<u32>,
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Hypervisor binary launched (under sudo) for every node.
    pub hypervisor: PathBuf,
    /// Inclusive port range the allocator leases from.
    pub port_start: u16,
    pub port_end: u16,
    /// Directory holding one durable lease marker per port.
    pub marker_dir: PathBuf,
    /// Core count for nodes without a `cores` attribute.
    pub cores: u32,
    /// RAM in MB for nodes without a `ram` attribute.
    pub ram_mb: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            hypervisor: PathBuf::from(DEFAULT_HYPERVISOR),
            port_start: DEFAULT_PORT_START,
            port_end: DEFAULT_PORT_END,
            marker_dir: PathBuf::from(DEFAULT_MARKER_DIR),
            cores: DEFAULT_CORES,
            ram_mb: DEFAULT_RAM_MB,
        }
    }
}

impl SimConfig {
    /// Load and resolve a TOML config file.
    pub fn load(path: &Path) -> Result<Self, BuildError> {
        let raw = fs::read_to_string(path)?;
        let input: SimConfigInput = toml::from_str(&raw)?;
        Self::resolve(input)
    }

    pub fn resolve(input: SimConfigInput) -> Result<Self, BuildError> {
        let base = Self::default();
        let config = Self {
            hypervisor: input.hypervisor.map(PathBuf::from).unwrap_or(base.hypervisor),
            port_start: input.ports.start.unwrap_or(base.port_start),
            port_end: input.ports.end.unwrap_or(base.port_end),
            marker_dir: input
                .ports
                .marker_dir
                .map(PathBuf::from)
                .unwrap_or(base.marker_dir),
            cores: input.defaults.cores.unwrap_or(base.cores),
            ram_mb: input.defaults.ram_mb.unwrap_or(base.ram_mb),
        };
        if config.port_start > config.port_end {
            return Err(BuildError::Config(format!(
                "port range start {} is past end {}",
                config.port_start, config.port_end
            )));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_resolves_to_defaults() {
        let config = SimConfig::resolve(SimConfigInput::default()).unwrap();
        assert_eq!(config.hypervisor, PathBuf::from(DEFAULT_HYPERVISOR));
        assert_eq!(config.port_start, DEFAULT_PORT_START);
        assert_eq!(config.port_end, DEFAULT_PORT_END);
        assert_eq!(config.cores, DEFAULT_CORES);
    }

    #[test]
    fn toml_overrides_take_effect() {
        let input: SimConfigInput = toml::from_str(
            r#"
            hypervisor = "/usr/bin/qemu-system-x86_64"

            [ports]
            start = 62000
            end = 62100
            marker_dir = "/tmp/markers"

            [defaults]
            ram_mb = 4096
            "#,
        )
        .unwrap();
        let config = SimConfig::resolve(input).unwrap();
        assert_eq!(
            config.hypervisor,
            PathBuf::from("/usr/bin/qemu-system-x86_64")
        );
        assert_eq!(config.port_start, 62000);
        assert_eq!(config.port_end, 62100);
        assert_eq!(config.marker_dir, PathBuf::from("/tmp/markers"));
        assert_eq!(config.cores, DEFAULT_CORES);
        assert_eq!(config.ram_mb, 4096);
    }

    #[test]
    fn inverted_port_range_is_rejected() {
        let input: SimConfigInput = toml::from_str(
            r#"
            [ports]
            start = 63000
            end = 62000
            "#,
        )
        .unwrap();
        assert!(matches!(
            SimConfig::resolve(input),
            Err(BuildError::Config(_))
        ));
    }
}

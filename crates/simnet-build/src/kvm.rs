//! The KVM/QEMU build backend.
//!
//! Brings a topology up as one raw hypervisor process per node, wired
//! together with UDP socket netdevs. `run` leases port blocks, assigns
//! link tunnel ports, synthesizes each vendor command line, launches the
//! processes detached, and persists the whole topology (ports and pids
//! included) to the snapshot. `stop` works entirely from that snapshot,
//! so it can run in a different process long after `run` exited.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use sysinfo::System;

use simnet_topo::{snapshot, Topology};

use crate::config::SimConfig;
use crate::depot::ImageDepot;
use crate::error::BuildError;
use crate::ports::PortAllocator;
use crate::proc;
use crate::vm::{VmBuildSpec, VmInstance, VmType, BASE_PORTS};

/// Selector preference; lower is more preferred.
pub const PREFERENCE: u32 = 10;

#[derive(Debug)]
pub struct KvmBuilder {
    topology: Topology,
    sim_dir: PathBuf,
    depot: ImageDepot,
    allocator: PortAllocator,
    config: SimConfig,
    instances: Vec<VmInstance>,
}

impl KvmBuilder {
    pub fn new(
        topology: Topology,
        sim_dir: &Path,
        image_depot: &Path,
        config: SimConfig,
    ) -> Result<Self, BuildError> {
        if !sim_dir.is_dir() {
            return Err(BuildError::Config(format!(
                "simulation directory {} is missing or not a directory",
                sim_dir.display()
            )));
        }
        let depot = ImageDepot::open(image_depot)?;
        let allocator = PortAllocator::new(
            config.marker_dir.clone(),
            config.port_start..=config.port_end,
        )?;
        Ok(Self {
            topology,
            sim_dir: sim_dir.to_path_buf(),
            depot,
            allocator,
            config,
            instances: Vec::new(),
        })
    }

    /// The owner tag written into port markers: the simulation
    /// directory, unique per running simulation on the host.
    fn owner_tag(&self) -> String {
        self.sim_dir.display().to_string()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Resource-assignment phase: per node (in insertion order) resolve
    /// the image, lease the port block, record it on the node, and
    /// assign the link tunnel ports. Idempotent; `run` calls it first.
    pub fn prepare(&mut self) -> Result<(), BuildError> {
        if !self.instances.is_empty() {
            return Ok(());
        }
        let owner = self.owner_tag();
        for name in self.topology.node_names() {
            let Some(node) = self.topology.node(&name) else {
                continue;
            };
            let vm_type = VmType::from_tag(&node.vm_type);
            let image_name = node
                .image
                .clone()
                .unwrap_or_else(|| vm_type.default_image().to_string());
            let node_id = node.id;
            let cores = attr_u32(node, "cores").unwrap_or(self.config.cores);
            let ram_mb = attr_u32(node, "ram").unwrap_or(self.config.ram_mb);
            let needed = BASE_PORTS + node.links.len();

            let base_image = self.depot.resolve_image(&image_name)?;

            let ports = self.allocator.get_free_ports(needed, &owner);
            if ports.len() < needed {
                let got = ports.len();
                self.allocator.release_ports(&ports, &owner);
                return Err(BuildError::ResourceExhausted { needed, got });
            }
            tracing::debug!(node = %name, ports = needed, "leased port block");

            if let Some(node) = self.topology.node_mut(&name) {
                node.udp_ports = ports.clone();
            }

            let instance = VmInstance::new(VmBuildSpec {
                name: name.clone(),
                node_id,
                vm_type,
                ports,
                cores,
                ram_mb,
                base_image,
                sim_dir: self.sim_dir.clone(),
                hypervisor: self.config.hypervisor.clone(),
            })?;
            instance.assign_link_ports(&mut self.topology)?;
            self.instances.push(instance);
        }
        Ok(())
    }

    /// Synthesized command line per prepared node, without touching the
    /// filesystem. Empty before [`prepare`] has run.
    ///
    /// [`prepare`]: KvmBuilder::prepare
    pub fn synthesized_commands(&self) -> Result<Vec<(String, Vec<String>)>, BuildError> {
        self.instances
            .iter()
            .map(|instance| {
                instance
                    .command_line(&self.topology, &instance.backer_image_path())
                    .map(|argv| (instance.name().to_string(), argv))
            })
            .collect()
    }

    /// Launch every node and persist the snapshot. On a mid-build
    /// failure the error propagates and already-launched siblings are
    /// left running; the snapshot is still written so a later `stop`
    /// can find their pids.
    pub fn run(&mut self) -> Result<(), BuildError> {
        self.prepare()?;
        tracing::info!(nodes = self.instances.len(), "starting kvm nodes");

        let mut launched = 0usize;
        let result = self.launch_all(&mut launched);
        if let Err(e) = result {
            if launched > 0 {
                tracing::warn!(
                    error = %e,
                    launched,
                    "build failed partway, leaving launched nodes running"
                );
                if let Err(save_err) = snapshot::save(&self.topology, &self.sim_dir) {
                    tracing::warn!(error = %save_err, "failed to persist partial snapshot");
                }
            }
            return Err(e);
        }

        snapshot::save(&self.topology, &self.sim_dir)?;
        Ok(())
    }

    fn launch_all(&mut self, launched: &mut usize) -> Result<(), BuildError> {
        let Self {
            instances,
            topology,
            ..
        } = self;
        for instance in instances.iter() {
            let backer = instance.create_backer_image()?;
            let argv = instance.command_line(topology, &backer)?;
            tracing::debug!(node = instance.name(), cmd = %argv.join(" "), "launching node");

            let child = Command::new("sudo")
                .args(&argv)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()?;
            let pid = child.id();
            // The child is detached from here on; stop() resolves it
            // again from the snapshot.
            drop(child);

            if let Some(node) = topology.node_mut(instance.name()) {
                node.pid = Some(pid);
            }
            *launched += 1;
            tracing::info!(node = instance.name(), pid, "node started");
        }
        Ok(())
    }

    /// Tear down the simulation recorded in this sim dir's snapshot:
    /// kill each recorded pid's process tree and release every port the
    /// snapshot mentions, node-level blocks and link-level tunnel ports
    /// unioned. Tolerant throughout: exited pids, missing markers, and
    /// foreign-owned markers never abort cleanup of the rest.
    pub fn stop(&mut self) -> Result<(), BuildError> {
        let topology = snapshot::load(&self.sim_dir)?;
        let owner = self.owner_tag();
        tracing::info!(
            sim_dir = %self.sim_dir.display(),
            nodes = topology.node_count(),
            "stopping simulation"
        );

        let sys = System::new_all();
        for node in topology.nodes() {
            match node.pid {
                Some(pid) => proc::kill_tree_in(&sys, pid),
                None => tracing::debug!(node = %node.name, "no pid recorded"),
            }

            let mut ports = node.udp_ports.clone();
            for id in topology.get_links_for_node(&node.name) {
                if let Some(link) = topology.link(id) {
                    ports.extend(link.local_port);
                    ports.extend(link.remote_port);
                }
            }
            ports.sort_unstable();
            ports.dedup();
            self.allocator.release_ports(&ports, &owner);
            tracing::debug!(node = %node.name, ports = ports.len(), "released node ports");
        }
        Ok(())
    }
}

fn attr_u32(node: &simnet_topo::Node, key: &str) -> Option<u32> {
    node.attrs.get(key).and_then(|v| v.parse().ok())
}

//! Per-vendor VM command synthesis.
//!
//! Every vendor follows the same algorithm with different formatting:
//! the front of the node's allocated port block is assigned to fixed
//! roles (serial console, monitor, then the well-known TCP forward
//! targets), the remainder becomes per-link UDP tunnel ports in link
//! declaration order, interfaces map to PCI slots eight functions at a
//! time, and MAC addresses derive deterministically from the node id so
//! they are stable across rebuilds.
//!
//! The vendors are a closed set: shared logic lives in free functions
//! here, vendor-specific option ordering and device models in the
//! [`VmType`] match arms.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use simnet_topo::{LinkId, Topology};

use crate::error::BuildError;

/// Ports taken off the front of every node's block: serial, monitor,
/// and the four TCP forward targets below.
pub const BASE_PORTS: usize = 6;

/// Guest-side TCP ports forwarded to allocated host ports, in role
/// order (ssh, http, https, rest).
const FWD_GUEST_PORTS: [&str; 4] = ["22", "80", "443", "8080"];

const LOOPBACK: &str = "127.0.0.1";
const MGMT_USER_NET: &str = "192.168.0.15/24";

/// First PCI slot handed to link interfaces.
const BASE_PCI_SLOT: usize = 6;

// ── Vendor registry ─────────────────────────────────────────────────

/// Closed set of vendor strategies. Unrecognized tags fall back to the
/// baseline (Cumulus) variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmType {
    Cumulus,
    Cisco,
    Arista,
}

impl VmType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "cumulus" | "default" => Self::Cumulus,
            "cisco" => Self::Cisco,
            "arista" => Self::Arista,
            other => {
                tracing::debug!(vm_type = other, "unrecognized vm type tag, using baseline");
                Self::Cumulus
            }
        }
    }

    /// Image reference used when a node carries no explicit `image`.
    pub fn default_image(self) -> &'static str {
        match self {
            Self::Cumulus => "cumulus-3.7.6",
            Self::Cisco => "cisco_nxosv-7.0.3",
            Self::Arista => "arista_eos-4.21.3",
        }
    }

    /// Vendor sizing floors. Values below the floor are raised, never
    /// lowered.
    fn apply_floors(self, cores: u32, ram_mb: u32) -> (u32, u32) {
        match self {
            // NXOSv will not boot small.
            Self::Cisco => (cores.max(4), ram_mb.max(8192)),
            _ => (cores, ram_mb),
        }
    }
}

// ── Shared helpers ──────────────────────────────────────────────────

/// PCI placement for one link interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PciAddr {
    pub slot: usize,
    pub function: usize,
    pub multifunction: bool,
}

impl PciAddr {
    fn multifunction_str(self) -> &'static str {
        if self.multifunction {
            "on"
        } else {
            "off"
        }
    }
}

/// PCI slot/function for the i-th interface (0-indexed in link order):
/// eight functions per slot starting at slot 6, multifunction flagged on
/// the first function of each slot. Slots from 31 up are out of reach.
pub fn pci_addr(idx: usize) -> Result<PciAddr, BuildError> {
    let slot = BASE_PCI_SLOT + idx / 8;
    if slot >= 31 {
        return Err(BuildError::NoMorePciSlots { slot });
    }
    Ok(PciAddr {
        slot,
        function: idx % 8,
        multifunction: idx % 8 == 0,
    })
}

/// Management interface MAC, derived from the node id alone.
pub fn mgmt_mac(node_id: u32) -> String {
    format!(
        "00:0a:00:{:02x}:{:02x}:00",
        (node_id >> 8) & 0xff,
        node_id & 0xff
    )
}

/// Link interface MAC, derived from the node id and interface index.
pub fn intf_mac(node_id: u32, intf_id: usize) -> String {
    format!(
        "00:02:00:{:02x}:{:02x}:{:02x}",
        (node_id >> 8) & 0xff,
        node_id & 0xff,
        intf_id & 0xff
    )
}

// ── Build spec and instance ─────────────────────────────────────────

/// Resource set a node was granted for this build. Ephemeral: owned by
/// the builder during construction, not persisted beyond the snapshot's
/// port and pid fields.
#[derive(Debug, Clone)]
pub struct VmBuildSpec {
    pub name: String,
    pub node_id: u32,
    pub vm_type: VmType,
    /// Allocated port block; roles off the front, link tunnels after.
    pub ports: Vec<u16>,
    pub cores: u32,
    pub ram_mb: u32,
    pub base_image: PathBuf,
    pub sim_dir: PathBuf,
    pub hypervisor: PathBuf,
}

/// One UDP tunnel endpoint of this node: local source port, peer
/// destination port, and the interface name on this side.
#[derive(Debug, Clone)]
struct Wire {
    intf: String,
    sport: u16,
    dport: u16,
}

/// A node with its port roles resolved, ready to synthesize a
/// hypervisor invocation.
#[derive(Debug)]
pub struct VmInstance {
    spec: VmBuildSpec,
    cores: u32,
    ram_mb: u32,
    serial_port: u16,
    monitor_port: u16,
    /// (host port, guest port) TCP forwards on the management NIC.
    forwards: Vec<(u16, &'static str)>,
}

impl VmInstance {
    pub fn new(spec: VmBuildSpec) -> Result<Self, BuildError> {
        if !spec.sim_dir.is_dir() {
            return Err(BuildError::Config(format!(
                "simulation directory {} is missing or not a directory",
                spec.sim_dir.display()
            )));
        }
        if spec.ports.len() < BASE_PORTS {
            return Err(BuildError::ResourceExhausted {
                needed: BASE_PORTS,
                got: spec.ports.len(),
            });
        }
        let (cores, ram_mb) = spec.vm_type.apply_floors(spec.cores, spec.ram_mb);
        let serial_port = spec.ports[0];
        let monitor_port = spec.ports[1];
        let forwards = FWD_GUEST_PORTS
            .iter()
            .enumerate()
            .map(|(i, guest)| (spec.ports[2 + i], *guest))
            .collect();
        Ok(Self {
            spec,
            cores,
            ram_mb,
            serial_port,
            monitor_port,
            forwards,
        })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &VmBuildSpec {
        &self.spec
    }

    pub fn cores(&self) -> u32 {
        self.cores
    }

    pub fn ram_mb(&self) -> u32 {
        self.ram_mb
    }

    /// Write this node's tunnel ports onto the topology's links: the
    /// block after the role ports, one per link endpoint this node
    /// owns, in link declaration order. The src side takes
    /// `local_port`, the dst side `remote_port`; a self-loop consumes
    /// one of each.
    pub fn assign_link_ports(&self, topology: &mut Topology) -> Result<(), BuildError> {
        let node_links = topology
            .node(&self.spec.name)
            .map(|n| n.links.clone())
            .unwrap_or_default();
        let mut cursor = BASE_PORTS;
        let mut seen: HashMap<LinkId, usize> = HashMap::new();
        for id in node_links {
            let occurrence = seen.entry(id).or_insert(0);
            let Some(link) = topology.link_mut(id) else {
                continue;
            };
            let port = self.spec.ports.get(cursor).copied().ok_or_else(|| {
                BuildError::ResourceExhausted {
                    needed: cursor + 1,
                    got: self.spec.ports.len(),
                }
            })?;
            if link.src.node == self.spec.name && *occurrence == 0 {
                link.local_port = Some(port);
            } else {
                link.remote_port = Some(port);
            }
            cursor += 1;
            *occurrence += 1;
        }
        Ok(())
    }

    /// Path of this node's copy-on-write disk image.
    pub fn backer_image_path(&self) -> PathBuf {
        self.spec
            .sim_dir
            .join(&self.spec.name)
            .join(format!("{}.qcow2", self.spec.name))
    }

    /// Derive the per-node copy-on-write image from the base image.
    /// qemu-img failures surface as build errors.
    pub fn create_backer_image(&self) -> Result<PathBuf, BuildError> {
        let node_dir = self.spec.sim_dir.join(&self.spec.name);
        fs::create_dir_all(&node_dir)?;
        let target = self.backer_image_path();

        let output = Command::new("sudo")
            .arg("qemu-img")
            .arg("create")
            .arg("-b")
            .arg(&self.spec.base_image)
            .arg("-f")
            .arg("qcow2")
            .arg(&target)
            .output()?;
        if !output.status.success() {
            return Err(BuildError::BackerImage(format!(
                "qemu-img create for {} failed: {}",
                self.spec.name,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        tracing::debug!(node = %self.spec.name, backer = %target.display(), "created backer image");
        Ok(target)
    }

    /// Synthesize the full hypervisor argument list (hypervisor binary
    /// first) for this node against the port-assigned topology.
    pub fn command_line(
        &self,
        topology: &Topology,
        backer: &Path,
    ) -> Result<Vec<String>, BuildError> {
        let wires = self.wires(topology)?;
        match self.spec.vm_type {
            VmType::Cumulus => self.baseline_cmdline(&wires, backer),
            VmType::Arista => self.arista_cmdline(&wires, backer),
            VmType::Cisco => self.cisco_cmdline(&wires, backer),
        }
    }

    /// Resolve this node's tunnel endpoints from the topology. Each
    /// entry of the node's link list yields one wire; the side the node
    /// plays decides which of the link's two ports is the source.
    fn wires(&self, topology: &Topology) -> Result<Vec<Wire>, BuildError> {
        let node = topology.node(&self.spec.name).ok_or_else(|| {
            BuildError::Config(format!("node {} not present in topology", self.spec.name))
        })?;
        let mut wires = Vec::with_capacity(node.links.len());
        let mut seen: HashMap<LinkId, usize> = HashMap::new();
        for &id in &node.links {
            let occurrence = *seen.get(&id).unwrap_or(&0);
            let link = topology.link(id).ok_or_else(|| {
                BuildError::Config(format!("dangling link reference on node {}", self.spec.name))
            })?;
            let as_src = link.src.node == self.spec.name && occurrence == 0;
            let (sport, dport, intf) = if as_src {
                (link.local_port, link.remote_port, link.src.intf.clone())
            } else {
                (link.remote_port, link.local_port, link.dst.intf.clone())
            };
            let missing = || {
                BuildError::Config(format!(
                    "link {}:{} -- {}:{} has unassigned tunnel ports",
                    link.src.node, link.src.intf, link.dst.node, link.dst.intf
                ))
            };
            wires.push(Wire {
                intf,
                sport: sport.ok_or_else(missing)?,
                dport: dport.ok_or_else(missing)?,
            });
            seen.insert(id, occurrence + 1);
        }
        Ok(wires)
    }

    fn hostfwd_suffix(&self) -> String {
        self.forwards
            .iter()
            .map(|(host, guest)| format!(",hostfwd=tcp::{host}-:{guest}"))
            .collect()
    }

    /// Option head shared by the baseline-ordered vendors.
    fn common_head(&self) -> Vec<String> {
        vec![
            self.spec.hypervisor.display().to_string(),
            "-enable-kvm".into(),
            "-nographic".into(),
            "-name".into(),
            self.spec.name.clone(),
            "-cpu".into(),
            "host".into(),
            "-serial".into(),
            format!("telnet::{},server,nowait", self.serial_port),
            "-monitor".into(),
            format!("telnet::{},server,nowait", self.monitor_port),
            "-smp".into(),
            self.cores.to_string(),
            "-m".into(),
            self.ram_mb.to_string(),
        ]
    }

    /// UDP socket netdev plus device pair per wire.
    fn wire_args(
        &self,
        wires: &[Wire],
        device_model: &str,
        with_mac: bool,
    ) -> Result<Vec<String>, BuildError> {
        let mut args = Vec::with_capacity(wires.len() * 4);
        for (i, wire) in wires.iter().enumerate() {
            let pci = pci_addr(i)?;
            args.push("-netdev".into());
            args.push(format!(
                "socket,udp={LOOPBACK}:{},localaddr={LOOPBACK}:{},id=dev{i}",
                wire.dport, wire.sport
            ));
            let mac_part = if with_mac {
                format!("mac={},", intf_mac(self.spec.node_id, i))
            } else {
                String::new()
            };
            args.push("-device".into());
            args.push(format!(
                "{device_model},{mac_part}addr={}.{},multifunction={},netdev=dev{i},id={}",
                pci.slot,
                pci.function,
                pci.multifunction_str(),
                wire.intf
            ));
        }
        Ok(args)
    }

    /// Legacy-style user-mode management NIC with the TCP forwards.
    fn mgmt_user_net(&self) -> Vec<String> {
        vec![
            "-net".into(),
            format!("user,vlan=10,net={MGMT_USER_NET}{}", self.hostfwd_suffix()),
            "-net".into(),
            format!(
                "nic,vlan=10,macaddr={},model=virtio",
                mgmt_mac(self.spec.node_id)
            ),
        ]
    }

    fn baseline_cmdline(&self, wires: &[Wire], backer: &Path) -> Result<Vec<String>, BuildError> {
        let mut args = self.common_head();
        args.extend(self.wire_args(wires, "virtio-net-pci", true)?);
        args.extend(self.mgmt_user_net());
        args.push("-drive".into());
        args.push(format!("file={},if=virtio,werror=report", backer.display()));
        Ok(args)
    }

    fn arista_cmdline(&self, wires: &[Wire], backer: &Path) -> Result<Vec<String>, BuildError> {
        let mut args = self.common_head();
        args.extend(self.wire_args(wires, "virtio-net-pci", true)?);
        args.extend(self.mgmt_user_net());
        args.push("-hda".into());
        args.push(backer.display().to_string());
        Ok(args)
    }

    /// NXOSv needs its options in a specific order to boot: BIOS and
    /// storage before the network devices, name near the end.
    fn cisco_cmdline(&self, wires: &[Wire], backer: &Path) -> Result<Vec<String>, BuildError> {
        // The UEFI image is expected as bios.bin next to the base image.
        let bios_dir = self
            .spec
            .base_image
            .parent()
            .unwrap_or_else(|| Path::new("."));
        let mut args = vec![
            self.spec.hypervisor.display().to_string(),
            "-enable-kvm".into(),
            "-cpu".into(),
            "host".into(),
            "-bios".into(),
            bios_dir.join("bios.bin").display().to_string(),
            "-serial".into(),
            format!("telnet::{},server,nowait", self.serial_port),
            "-monitor".into(),
            format!("telnet::{},server,nowait", self.monitor_port),
            "-netdev".into(),
            format!(
                "user,net={MGMT_USER_NET}{},id=mgmt0",
                self.hostfwd_suffix()
            ),
            "-device".into(),
            "ahci,id=ahci0,bus=pci.0,multifunction=on".into(),
            "-drive".into(),
            format!(
                "file={},if=none,id=drive-sata-disk0,format=qcow2",
                backer.display()
            ),
            "-device".into(),
            "ide-drive,bus=ahci0.0,drive=drive-sata-disk0".into(),
            "-nographic".into(),
            "-smp".into(),
            self.cores.to_string(),
            "-m".into(),
            self.ram_mb.to_string(),
            "-device".into(),
            format!("e1000,netdev=mgmt0,mac={}", mgmt_mac(self.spec.node_id)),
            "-name".into(),
            self.spec.name.clone(),
        ];
        args.extend(self.wire_args(wires, "e1000", false)?);
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn spec(name: &str, node_id: u32, vm_type: VmType, ports: Vec<u16>, dir: &Path) -> VmBuildSpec {
        VmBuildSpec {
            name: name.to_string(),
            node_id,
            vm_type,
            ports,
            cores: 2,
            ram_mb: 2048,
            base_image: PathBuf::from("/depot/cumulus/3.7.6/base.qcow2"),
            sim_dir: dir.to_path_buf(),
            hypervisor: PathBuf::from("/usr/bin/kvm"),
        }
    }

    fn linked_pair(dir: &Path) -> (Topology, VmInstance, VmInstance) {
        let mut topo = Topology::new();
        topo.add_node("r1", "default", IndexMap::new());
        topo.add_node("r2", "default", IndexMap::new());
        topo.add_interface("r1", "swp1");
        topo.add_interface("r2", "eth1");
        topo.add_link("r1", "swp1", "r2", "eth1", IndexMap::new())
            .unwrap();

        let r1 = VmInstance::new(spec(
            "r1",
            1,
            VmType::Cumulus,
            (62000..62007).collect(),
            dir,
        ))
        .unwrap();
        let r2 = VmInstance::new(spec(
            "r2",
            2,
            VmType::Cumulus,
            (62010..62017).collect(),
            dir,
        ))
        .unwrap();
        r1.assign_link_ports(&mut topo).unwrap();
        r2.assign_link_ports(&mut topo).unwrap();
        (topo, r1, r2)
    }

    #[test]
    fn pci_layout_follows_slot_function_math() {
        assert_eq!(
            pci_addr(0).unwrap(),
            PciAddr {
                slot: 6,
                function: 0,
                multifunction: true
            }
        );
        assert_eq!(
            pci_addr(1).unwrap(),
            PciAddr {
                slot: 6,
                function: 1,
                multifunction: false
            }
        );
        assert_eq!(
            pci_addr(8).unwrap(),
            PciAddr {
                slot: 7,
                function: 0,
                multifunction: true
            }
        );
        assert_eq!(pci_addr(199).unwrap().slot, 30);
    }

    #[test]
    fn pci_slots_run_out_at_two_hundred_interfaces() {
        assert!(matches!(
            pci_addr(200),
            Err(BuildError::NoMorePciSlots { slot: 31 })
        ));
    }

    #[test]
    fn macs_are_deterministic_and_distinct_per_node() {
        assert_eq!(mgmt_mac(258), "00:0a:00:01:02:00");
        assert_eq!(mgmt_mac(258), mgmt_mac(258));
        assert_ne!(mgmt_mac(1), mgmt_mac(2));
        assert_eq!(intf_mac(258, 3), "00:02:00:01:02:03");
        assert_ne!(intf_mac(1, 0), mgmt_mac(1));
    }

    #[test]
    fn unknown_tag_falls_back_to_baseline() {
        assert_eq!(VmType::from_tag("juniper"), VmType::Cumulus);
        assert_eq!(VmType::from_tag("default"), VmType::Cumulus);
        assert_eq!(VmType::from_tag("cisco"), VmType::Cisco);
    }

    #[test]
    fn cisco_floors_raise_but_never_lower() {
        let dir = tempfile::tempdir().unwrap();
        let mut small = spec("n1", 1, VmType::Cisco, (62000..62006).collect(), dir.path());
        small.cores = 2;
        small.ram_mb = 2048;
        let inst = VmInstance::new(small).unwrap();
        assert_eq!(inst.cores(), 4);
        assert_eq!(inst.ram_mb(), 8192);

        let mut big = spec("n2", 2, VmType::Cisco, (62010..62016).collect(), dir.path());
        big.cores = 8;
        big.ram_mb = 16384;
        let inst = VmInstance::new(big).unwrap();
        assert_eq!(inst.cores(), 8);
        assert_eq!(inst.ram_mb(), 16384);
    }

    #[test]
    fn link_ports_come_after_the_role_block() {
        let dir = tempfile::tempdir().unwrap();
        let (topo, _r1, _r2) = linked_pair(dir.path());
        let ids = topo.get_links_for_node("r1");
        let link = topo.link(ids[0]).unwrap();
        // r1 is src: 7th port of its block. r2 is dst: 7th of its own.
        assert_eq!(link.local_port, Some(62006));
        assert_eq!(link.remote_port, Some(62016));
    }

    #[test]
    fn baseline_command_wires_both_directions() {
        let dir = tempfile::tempdir().unwrap();
        let (topo, r1, r2) = linked_pair(dir.path());
        let backer = PathBuf::from("/sims/one/r1/r1.qcow2");

        let args = r1.command_line(&topo, &backer).unwrap();
        assert_eq!(args[0], "/usr/bin/kvm");
        assert!(args.contains(&format!(
            "socket,udp={LOOPBACK}:62016,localaddr={LOOPBACK}:62006,id=dev0"
        )));
        let device = args.iter().find(|a| a.starts_with("virtio-net-pci,")).unwrap();
        assert!(device.contains("mac=00:02:00:00:01:00"));
        assert!(device.contains("addr=6.0,multifunction=on"));
        assert!(device.ends_with("id=swp1"));
        assert!(args.contains(&format!("file={},if=virtio,werror=report", backer.display())));

        // The peer's wire points back the other way.
        let args = r2.command_line(&topo, &backer).unwrap();
        assert!(args.contains(&format!(
            "socket,udp={LOOPBACK}:62006,localaddr={LOOPBACK}:62016,id=dev0"
        )));
    }

    #[test]
    fn management_forwards_use_the_role_ports() {
        let dir = tempfile::tempdir().unwrap();
        let (topo, r1, _) = linked_pair(dir.path());
        let args = r1.command_line(&topo, Path::new("/b.qcow2")).unwrap();
        let user_net = args.iter().find(|a| a.starts_with("user,vlan=10")).unwrap();
        for (host, guest) in [(62002, "22"), (62003, "80"), (62004, "443"), (62005, "8080")] {
            assert!(user_net.contains(&format!("hostfwd=tcp::{host}-:{guest}")));
        }
        assert!(args.contains(&"telnet::62000,server,nowait".to_string()));
        assert!(args.contains(&"telnet::62001,server,nowait".to_string()));
    }

    #[test]
    fn cisco_orders_bios_and_storage_before_links() {
        let dir = tempfile::tempdir().unwrap();
        let mut topo = Topology::new();
        topo.add_node("sw1", "cisco", IndexMap::new());
        topo.add_node("sw2", "cisco", IndexMap::new());
        topo.add_link("sw1", "eth1", "sw2", "eth1", IndexMap::new())
            .unwrap();
        let sw1 = VmInstance::new(spec(
            "sw1",
            1,
            VmType::Cisco,
            (62020..62027).collect(),
            dir.path(),
        ))
        .unwrap();
        let sw2 = VmInstance::new(spec(
            "sw2",
            2,
            VmType::Cisco,
            (62030..62037).collect(),
            dir.path(),
        ))
        .unwrap();
        sw1.assign_link_ports(&mut topo).unwrap();
        sw2.assign_link_ports(&mut topo).unwrap();

        let args = sw1.command_line(&topo, Path::new("/b.qcow2")).unwrap();
        let pos = |needle: &str| args.iter().position(|a| a.contains(needle)).unwrap();
        assert!(pos("bios.bin") < pos("ahci,id=ahci0"));
        assert!(pos("ahci,id=ahci0") < pos("-name"));
        assert!(pos("-name") < pos("socket,udp="));
        // Link devices are e1000 without a per-interface mac.
        let wire_dev = args
            .iter()
            .find(|a| a.starts_with("e1000,addr="))
            .unwrap();
        assert!(!wire_dev.contains("mac="));
    }

    #[test]
    fn arista_uses_hda_storage() {
        let dir = tempfile::tempdir().unwrap();
        let mut topo = Topology::new();
        topo.add_node("a1", "arista", IndexMap::new());
        let a1 = VmInstance::new(spec(
            "a1",
            1,
            VmType::Arista,
            (62040..62046).collect(),
            dir.path(),
        ))
        .unwrap();
        a1.assign_link_ports(&mut topo).unwrap();
        let args = a1.command_line(&topo, Path::new("/b.qcow2")).unwrap();
        let hda = args.iter().position(|a| a == "-hda").unwrap();
        assert_eq!(args[hda + 1], "/b.qcow2");
        assert!(!args.iter().any(|a| a.starts_with("file=")));
    }

    #[test]
    fn self_loop_consumes_local_and_remote() {
        let dir = tempfile::tempdir().unwrap();
        let mut topo = Topology::new();
        topo.add_node("r1", "default", IndexMap::new());
        topo.add_link("r1", "swp1", "r1", "swp2", IndexMap::new())
            .unwrap();
        let r1 = VmInstance::new(spec(
            "r1",
            1,
            VmType::Cumulus,
            (62050..62058).collect(),
            dir.path(),
        ))
        .unwrap();
        r1.assign_link_ports(&mut topo).unwrap();
        let ids = topo.get_links_for_node("r1");
        let link = topo.link(ids[0]).unwrap();
        assert_eq!(link.local_port, Some(62056));
        assert_eq!(link.remote_port, Some(62057));
    }

    #[test]
    fn missing_sim_dir_is_a_config_error() {
        let s = spec(
            "r1",
            1,
            VmType::Cumulus,
            (62060..62066).collect(),
            Path::new("/definitely/not/here"),
        );
        assert!(matches!(VmInstance::new(s), Err(BuildError::Config(_))));
    }
}

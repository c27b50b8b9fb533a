//! End-to-end resource flow over the KVM builder: lease, synthesize,
//! snapshot, and release, all against scratch directories. No hypervisor
//! processes are launched; the flow stops at command synthesis, which is
//! exactly the boundary a host without /usr/bin/kvm can still test.

use std::fs;
use std::path::{Path, PathBuf};

use simnet_build::{BuildError, KvmBuilder, PortAllocator, SimConfig};
use simnet_topo::{snapshot, Topology};

fn test_config(root: &Path, start: u16, end: u16) -> SimConfig {
    SimConfig {
        hypervisor: PathBuf::from("/usr/bin/kvm"),
        port_start: start,
        port_end: end,
        marker_dir: root.join("markers").join("ports"),
        cores: 2,
        ram_mb: 2048,
    }
}

fn make_depot(root: &Path) -> PathBuf {
    let depot = root.join("depot");
    let image_dir = depot.join("cumulus").join("3.7.6");
    fs::create_dir_all(&image_dir).unwrap();
    fs::write(image_dir.join("cumulus-vx.qcow2"), b"qcow2").unwrap();
    depot
}

fn two_node_topology() -> Topology {
    let mut topo = Topology::new();
    topo.add_node("r1", "default", Default::default());
    topo.add_node("r2", "default", Default::default());
    topo.add_interface("r1", "swp1");
    topo.add_interface("r2", "eth1");
    topo.add_link("r1", "swp1", "r2", "eth1", Default::default())
        .unwrap();
    topo
}

fn free_count(config: &SimConfig) -> usize {
    PortAllocator::new(
        config.marker_dir.clone(),
        config.port_start..=config.port_end,
    )
    .unwrap()
    .free_count()
}

#[test]
fn two_node_build_leases_synthesizes_and_round_trips() {
    let root = tempfile::tempdir().unwrap();
    let sim_dir = root.path().join("sim1");
    fs::create_dir(&sim_dir).unwrap();
    let depot = make_depot(root.path());
    let config = test_config(root.path(), 62600, 62649);

    let baseline = free_count(&config);
    assert!(baseline >= 14, "not enough bindable test ports");

    let mut builder =
        KvmBuilder::new(two_node_topology(), &sim_dir, &depot, config.clone()).unwrap();
    builder.prepare().unwrap();

    // Each node gets the six role ports plus one tunnel port.
    for (name, id) in [("r1", 1u32), ("r2", 2u32)] {
        let node = builder.topology().node(name).unwrap();
        assert_eq!(node.udp_ports.len(), 7, "{name} port block");
        assert_eq!(node.id, id);
    }
    assert_eq!(free_count(&config), baseline - 14);

    // A non-empty command is synthesized for each node.
    let commands = builder.synthesized_commands().unwrap();
    assert_eq!(commands.len(), 2);
    for (name, argv) in &commands {
        assert!(!argv.is_empty(), "{name} command empty");
        assert!(argv.iter().any(|a| a.starts_with("socket,udp=")));
    }

    // The snapshot reproduces both nodes' port blocks and ids exactly.
    snapshot::save(builder.topology(), &sim_dir).unwrap();
    let loaded = snapshot::load(&sim_dir).unwrap();
    for name in ["r1", "r2"] {
        let before = builder.topology().node(name).unwrap();
        let after = loaded.node(name).unwrap();
        assert_eq!(before.udp_ports, after.udp_ports);
        assert_eq!(before.id, after.id);
    }

    // Stop from a fresh builder, as a separate invocation would: the
    // used-port view comes entirely from the snapshot.
    let mut stopper = KvmBuilder::new(Topology::new(), &sim_dir, &depot, config.clone()).unwrap();
    stopper.stop().unwrap();
    assert_eq!(free_count(&config), baseline);
}

#[test]
fn exhausted_port_range_aborts_the_build() {
    let root = tempfile::tempdir().unwrap();
    let sim_dir = root.path().join("sim");
    fs::create_dir(&sim_dir).unwrap();
    let depot = make_depot(root.path());
    // Room for the first node's block but not the second's.
    let config = test_config(root.path(), 62700, 62709);

    let mut builder = KvmBuilder::new(two_node_topology(), &sim_dir, &depot, config).unwrap();
    let err = builder.prepare().unwrap_err();
    assert!(matches!(err, BuildError::ResourceExhausted { needed: 7, .. }));
}

#[test]
fn unresolvable_image_aborts_before_any_lease() {
    let root = tempfile::tempdir().unwrap();
    let sim_dir = root.path().join("sim");
    fs::create_dir(&sim_dir).unwrap();
    let depot = make_depot(root.path());
    let config = test_config(root.path(), 62720, 62739);
    let baseline = free_count(&config);

    let mut topo = Topology::new();
    topo.add_node("sw1", "cisco", Default::default());

    let mut builder = KvmBuilder::new(topo, &sim_dir, &depot, config.clone()).unwrap();
    let err = builder.prepare().unwrap_err();
    assert!(matches!(err, BuildError::UnknownVmType(_)));
    assert_eq!(free_count(&config), baseline);
}

#[test]
fn stop_without_snapshot_is_an_error() {
    let root = tempfile::tempdir().unwrap();
    let sim_dir = root.path().join("sim");
    fs::create_dir(&sim_dir).unwrap();
    let depot = make_depot(root.path());
    let config = test_config(root.path(), 62740, 62749);

    let mut builder = KvmBuilder::new(Topology::new(), &sim_dir, &depot, config).unwrap();
    assert!(matches!(
        builder.stop(),
        Err(BuildError::Snapshot(_))
    ));
}

//! Durable topology snapshots.
//!
//! `run` serializes the whole topology (including assigned port blocks
//! and pids) to `<sim_dir>/topo.snapshot`; a later `stop`, possibly in a
//! different process, deserializes it to find what to tear down. The
//! round-trip must be lossless: ports, ids, pids, and vm types all
//! survive.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::graph::Topology;

/// Snapshot file name inside a simulation directory.
pub const SNAPSHOT_FILE: &str = "topo.snapshot";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("snapshot encode/decode error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write the topology snapshot into the simulation directory.
pub fn save(topology: &Topology, sim_dir: &Path) -> Result<(), SnapshotError> {
    let path = sim_dir.join(SNAPSHOT_FILE);
    let encoded = serde_json::to_string_pretty(topology)?;
    fs::write(&path, encoded)?;
    tracing::debug!(path = %path.display(), "wrote topology snapshot");
    Ok(())
}

/// Read the topology snapshot from a simulation directory.
pub fn load(sim_dir: &Path) -> Result<Topology, SnapshotError> {
    let path = sim_dir.join(SNAPSHOT_FILE);
    let raw = fs::read_to_string(&path)?;
    let topology = serde_json::from_str(&raw)?;
    tracing::debug!(path = %path.display(), "loaded topology snapshot");
    Ok(topology)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn snapshot_round_trips_ports_ids_and_pids() {
        let mut topo = Topology::new();
        topo.add_node("r1", "cumulus", IndexMap::new());
        topo.add_node("r2", "cisco", IndexMap::new());
        topo.add_interface("r1", "swp1");
        topo.add_interface("r2", "eth1");
        let link = topo
            .add_link("r1", "swp1", "r2", "eth1", IndexMap::new())
            .unwrap();

        topo.node_mut("r1").unwrap().udp_ports = vec![61001, 61002, 61003];
        topo.node_mut("r1").unwrap().pid = Some(4242);
        topo.node_mut("r2").unwrap().udp_ports = vec![61010];
        topo.link_mut(link).unwrap().local_port = Some(61003);
        topo.link_mut(link).unwrap().remote_port = Some(61010);

        let dir = tempfile::tempdir().unwrap();
        save(&topo, dir.path()).unwrap();
        let loaded = load(dir.path()).unwrap();

        let r1 = loaded.node("r1").unwrap();
        assert_eq!(r1.udp_ports, vec![61001, 61002, 61003]);
        assert_eq!(r1.pid, Some(4242));
        assert_eq!(r1.vm_type, "cumulus");
        assert_eq!(r1.id, topo.node("r1").unwrap().id);

        let r2 = loaded.node("r2").unwrap();
        assert_eq!(r2.udp_ports, vec![61010]);
        assert_eq!(r2.pid, None);

        let ids = loaded.get_links_for_node("r1");
        assert_eq!(ids.len(), 1);
        let restored = loaded.link(ids[0]).unwrap();
        assert_eq!(restored.local_port, Some(61003));
        assert_eq!(restored.remote_port, Some(61010));
    }

    #[test]
    fn load_missing_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(load(dir.path()), Err(SnapshotError::Io(_))));
    }
}

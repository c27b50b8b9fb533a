//! The topology graph: nodes, interfaces, and links.
//!
//! A [`Topology`] owns its nodes and links exclusively. Links live in an
//! arena indexed by [`LinkId`]; each node keeps a back-reference list of
//! the link ids touching it, so per-node link lookup is O(1) instead of a
//! scan over every edge in the graph.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Vendor tag used when a node is created without an explicit one.
pub const DEFAULT_VM_TYPE: &str = "default";

#[derive(Debug, Error)]
pub enum TopoError {
    #[error("no node with the name {0}")]
    UnknownNode(String),
}

/// Stable handle into a topology's link arena.
///
/// Ids are never reused: deleting a link leaves a hole in the arena so
/// that back-references held elsewhere cannot silently rebind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkId(usize);

impl LinkId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One side of a link: a node name plus an interface name on that node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub node: String,
    pub intf: String,
}

impl Endpoint {
    pub fn new(node: impl Into<String>, intf: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            intf: intf.into(),
        }
    }
}

/// An undirected connection between two interfaces, stored as an ordered
/// src/dst pair. `local_port`/`remote_port` are the UDP tunnel ports of
/// the src and dst side respectively, assigned at build time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub src: Endpoint,
    pub dst: Endpoint,
    #[serde(default)]
    pub attrs: IndexMap<String, String>,
    #[serde(default)]
    pub local_port: Option<u16>,
    #[serde(default)]
    pub remote_port: Option<u16>,
}

impl Link {
    /// True if either endpoint names the given node.
    pub fn touches(&self, node: &str) -> bool {
        self.src.node == node || self.dst.node == node
    }
}

/// One emulated device; maps to one virtual machine process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    /// Unique non-negative id, monotonically assigned, never reused
    /// while the topology is in memory.
    pub id: u32,
    pub vm_type: String,
    /// Explicit image reference; when absent the vendor default is used.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub attrs: IndexMap<String, String>,
    /// Declared interface names, ordered, duplicate-free.
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub bridges: Vec<String>,
    #[serde(default)]
    pub bonds: Vec<String>,
    /// Back-references to the links touching this node, in declaration
    /// order. Not ownership: the topology's link arena is the sole owner.
    #[serde(default)]
    pub links: Vec<LinkId>,
    /// Allocated port block; empty until built.
    #[serde(default)]
    pub udp_ports: Vec<u16>,
    /// Process id of the launched VM; absent until started.
    #[serde(default)]
    pub pid: Option<u32>,
}

impl Node {
    fn new(name: &str, id: u32, vm_type: &str, attrs: IndexMap<String, String>) -> Self {
        Self {
            name: name.to_string(),
            id,
            vm_type: vm_type.to_string(),
            image: None,
            attrs,
            interfaces: Vec::new(),
            bridges: Vec::new(),
            bonds: Vec::new(),
            links: Vec::new(),
            udp_ports: Vec::new(),
            pid: None,
        }
    }
}

/// The in-memory graph of nodes and links representing a network to
/// emulate. Node iteration order is insertion order, which is also the
/// build order used by the backends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Topology {
    nodes: IndexMap<String, Node>,
    links: Vec<Option<Link>>,
    /// Next id to hand out; keeps ids monotonic even after the max-id
    /// node is deleted.
    #[serde(default)]
    next_id: u32,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Nodes ───────────────────────────────────────────────────────

    /// The id the next created node will receive: 1 on an empty
    /// topology, otherwise one past the maximum existing id.
    pub fn next_node_id(&self) -> u32 {
        self.nodes
            .values()
            .map(|n| n.id)
            .max()
            .map_or(1, |max| max + 1)
    }

    /// Add a node, or return the existing one with that name.
    pub fn add_node(
        &mut self,
        name: &str,
        vm_type: &str,
        attrs: IndexMap<String, String>,
    ) -> &mut Node {
        let fresh = self.next_node_id().max(self.next_id);
        match self.nodes.entry(name.to_string()) {
            indexmap::map::Entry::Occupied(entry) => {
                tracing::debug!(node = name, "node already exists");
                entry.into_mut()
            }
            indexmap::map::Entry::Vacant(entry) => {
                tracing::debug!(node = name, id = fresh, "adding node");
                self.next_id = fresh + 1;
                entry.insert(Node::new(name, fresh, vm_type, attrs))
            }
        }
    }

    /// Remove a node and every link touching it. Returns false if no
    /// node with that name exists.
    pub fn delete_node(&mut self, name: &str) -> bool {
        if !self.nodes.contains_key(name) {
            tracing::debug!(node = name, "no node with that name");
            return false;
        }
        let touching: Vec<LinkId> = self
            .links
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| match slot {
                Some(link) if link.touches(name) => Some(LinkId(i)),
                _ => None,
            })
            .collect();
        for id in touching {
            self.remove_link(id);
        }
        self.nodes.shift_remove(name).is_some()
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.nodes.get_mut(name)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_names(&self) -> Vec<String> {
        self.nodes.keys().cloned().collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ── Interfaces ──────────────────────────────────────────────────

    /// Add an interface name to a node, creating the node if absent.
    /// Adding a duplicate is a no-op.
    pub fn add_interface(&mut self, node_name: &str, intf: &str) {
        if !self.nodes.contains_key(node_name) {
            self.add_node(node_name, DEFAULT_VM_TYPE, IndexMap::new());
        }
        let Some(node) = self.nodes.get_mut(node_name) else {
            return;
        };
        if node.interfaces.iter().any(|i| i == intf) {
            tracing::debug!(node = node_name, intf, "interface already exists");
            return;
        }
        node.interfaces.push(intf.to_string());
    }

    /// Remove an interface name from a node; a no-op with a diagnostic
    /// if the node or the interface is absent.
    pub fn delete_interface(&mut self, node_name: &str, intf: &str) {
        let Some(node) = self.nodes.get_mut(node_name) else {
            tracing::debug!(node = node_name, "no node with that name");
            return;
        };
        let before = node.interfaces.len();
        node.interfaces.retain(|i| i != intf);
        if node.interfaces.len() == before {
            tracing::debug!(node = node_name, intf, "interface not found on node");
        }
    }

    /// Declared interfaces of a node, empty for an unknown node.
    pub fn get_interfaces(&self, node_name: &str) -> &[String] {
        self.nodes
            .get(node_name)
            .map(|n| n.interfaces.as_slice())
            .unwrap_or(&[])
    }

    // ── Links ───────────────────────────────────────────────────────

    /// Create a link between two named interfaces. Both endpoint nodes
    /// must already exist. The new id is appended to both endpoints'
    /// back-reference lists (twice to the same node for a self-loop, one
    /// entry per endpoint role).
    pub fn add_link(
        &mut self,
        local_node: &str,
        local_intf: &str,
        remote_node: &str,
        remote_intf: &str,
        attrs: IndexMap<String, String>,
    ) -> Result<LinkId, TopoError> {
        for name in [local_node, remote_node] {
            if !self.nodes.contains_key(name) {
                return Err(TopoError::UnknownNode(name.to_string()));
            }
        }
        let id = LinkId(self.links.len());
        self.links.push(Some(Link {
            src: Endpoint::new(local_node, local_intf),
            dst: Endpoint::new(remote_node, remote_intf),
            attrs,
            local_port: None,
            remote_port: None,
        }));
        for name in [local_node, remote_node] {
            if let Some(node) = self.nodes.get_mut(name) {
                node.links.push(id);
            }
        }
        tracing::debug!(
            local = local_node,
            local_intf,
            remote = remote_node,
            remote_intf,
            "added link"
        );
        Ok(id)
    }

    /// Delete the link matching the given endpoints (either orientation).
    /// Returns false if no such link exists.
    pub fn delete_link(
        &mut self,
        local_node: &str,
        local_intf: &str,
        remote_node: &str,
        remote_intf: &str,
    ) -> bool {
        let found = self.get_links(local_node, remote_node, Some(local_intf), Some(remote_intf));
        let Some(&id) = found.first() else {
            tracing::debug!(
                local = local_node,
                local_intf,
                remote = remote_node,
                remote_intf,
                "no matching link to delete"
            );
            return false;
        };
        self.remove_link(id);
        true
    }

    /// Links between two named nodes, matched in either orientation, in
    /// stable insertion order. A given interface constrains its own
    /// side: `local_intf` must match on whichever end names
    /// `local_node`, and likewise for `remote_intf`.
    pub fn get_links(
        &self,
        local_node: &str,
        remote_node: &str,
        local_intf: Option<&str>,
        remote_intf: Option<&str>,
    ) -> Vec<LinkId> {
        let mut found = Vec::new();
        for (i, slot) in self.links.iter().enumerate() {
            let Some(link) = slot else { continue };
            let forward = link.src.node == local_node && link.dst.node == remote_node;
            let reverse = link.src.node == remote_node && link.dst.node == local_node;
            let matched = if forward {
                local_intf.is_none_or(|intf| link.src.intf == intf)
                    && remote_intf.is_none_or(|intf| link.dst.intf == intf)
            } else if reverse {
                local_intf.is_none_or(|intf| link.dst.intf == intf)
                    && remote_intf.is_none_or(|intf| link.src.intf == intf)
            } else {
                false
            };
            if matched {
                found.push(LinkId(i));
            }
        }
        found
    }

    /// Links touching a node, via the node's back-reference list. Falls
    /// back to a full scan when the list has not been populated (for
    /// example a topology assembled from raw text without enrichment).
    pub fn get_links_for_node(&self, node_name: &str) -> Vec<LinkId> {
        match self.nodes.get(node_name) {
            Some(node) if !node.links.is_empty() => node.links.clone(),
            Some(_) => self.scan_links_for_node(node_name),
            None => Vec::new(),
        }
    }

    /// Linear-scan variant of [`get_links_for_node`]: walks the whole
    /// arena. A self-loop yields one entry per endpoint role, matching
    /// the shape of the back-reference list.
    ///
    /// [`get_links_for_node`]: Topology::get_links_for_node
    pub fn scan_links_for_node(&self, node_name: &str) -> Vec<LinkId> {
        let mut found = Vec::new();
        for (i, slot) in self.links.iter().enumerate() {
            let Some(link) = slot else { continue };
            if link.src.node == node_name {
                found.push(LinkId(i));
            }
            if link.dst.node == node_name {
                found.push(LinkId(i));
            }
        }
        found
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub fn link_mut(&mut self, id: LinkId) -> Option<&mut Link> {
        self.links.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    /// Live links with their ids, in insertion order.
    pub fn links(&self) -> impl Iterator<Item = (LinkId, &Link)> {
        self.links
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|link| (LinkId(i), link)))
    }

    fn remove_link(&mut self, id: LinkId) {
        let Some(link) = self.links.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        for name in [&link.src.node, &link.dst.node] {
            if let Some(node) = self.nodes.get_mut(name.as_str()) {
                node.links.retain(|l| *l != id);
            }
        }
    }
}

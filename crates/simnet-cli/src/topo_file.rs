//! Topology description parser.
//!
//! Reads the DOT-style graph text the simulator consumes:
//!
//! ```text
//! graph lab {
//!     r1 [label="swp1|swp2", vm_type=cumulus];
//!     r2 [label=eth1, vm_type=arista, ram=4096];
//!     r1:swp1 -- r2:eth1 [];
//! }
//! ```
//!
//! Node lines carry attributes in brackets; `label` is the
//! pipe-delimited interface list, `vm_type`/`image`/`id` map onto the
//! node's own fields, `bridges`/`bonds` are pipe-delimited lists, and
//! anything else lands in the node's attribute map. Edge lines connect
//! `node:interface` endpoints and implicitly declare both interfaces.

use anyhow::{bail, Context};
use indexmap::IndexMap;

use simnet_topo::{Topology, DEFAULT_VM_TYPE};

pub fn parse(text: &str) -> anyhow::Result<Topology> {
    let mut topo = Topology::new();

    for (idx, raw) in text.lines().enumerate() {
        let lineno = idx + 1;
        let line = raw.trim().trim_end_matches(';').trim_end();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        if (line.starts_with("graph") || line.starts_with("digraph")) && line.ends_with('{') {
            continue;
        }
        if line == "}" {
            continue;
        }

        let (head, attrs) =
            split_attrs(line).with_context(|| format!("line {lineno}: {raw:?}"))?;

        if head.contains("--") {
            parse_edge(&mut topo, head, attrs)
                .with_context(|| format!("line {lineno}: {raw:?}"))?;
        } else {
            parse_node(&mut topo, head, attrs)
                .with_context(|| format!("line {lineno}: {raw:?}"))?;
        }
    }

    Ok(topo)
}

fn parse_node(
    topo: &mut Topology,
    head: &str,
    attrs: IndexMap<String, String>,
) -> anyhow::Result<()> {
    let name = head.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        bail!("malformed node name {name:?}");
    }
    topo.add_node(name, DEFAULT_VM_TYPE, IndexMap::new());

    for (key, value) in attrs {
        match key.as_str() {
            "label" => {
                for intf in value.split('|').filter(|i| !i.is_empty()) {
                    topo.add_interface(name, intf);
                }
            }
            "vm_type" => {
                if let Some(node) = topo.node_mut(name) {
                    node.vm_type = value;
                }
            }
            "image" => {
                if let Some(node) = topo.node_mut(name) {
                    node.image = Some(value);
                }
            }
            "id" => {
                let id: u32 = value
                    .parse()
                    .with_context(|| format!("node {name}: bad id {value:?}"))?;
                if let Some(node) = topo.node_mut(name) {
                    node.id = id;
                }
            }
            "bridges" => {
                if let Some(node) = topo.node_mut(name) {
                    node.bridges = split_list(&value);
                }
            }
            "bonds" => {
                if let Some(node) = topo.node_mut(name) {
                    node.bonds = split_list(&value);
                }
            }
            _ => {
                if let Some(node) = topo.node_mut(name) {
                    node.attrs.insert(key, value);
                }
            }
        }
    }
    Ok(())
}

fn parse_edge(
    topo: &mut Topology,
    head: &str,
    attrs: IndexMap<String, String>,
) -> anyhow::Result<()> {
    let Some((left, right)) = head.split_once("--") else {
        bail!("malformed edge {head:?}");
    };
    let (local_node, local_intf) = endpoint(left)?;
    let (remote_node, remote_intf) = endpoint(right)?;

    // Edges implicitly declare their interfaces (and nodes).
    topo.add_interface(local_node, local_intf);
    topo.add_interface(remote_node, remote_intf);
    topo.add_link(local_node, local_intf, remote_node, remote_intf, attrs)?;
    Ok(())
}

fn endpoint(raw: &str) -> anyhow::Result<(&str, &str)> {
    let raw = raw.trim();
    let Some((node, intf)) = raw.split_once(':') else {
        bail!("edge endpoint {raw:?} is not node:interface");
    };
    if node.is_empty() || intf.is_empty() {
        bail!("edge endpoint {raw:?} is not node:interface");
    }
    Ok((node, intf))
}

/// Split a line into its head and the `[k=v, ...]` attribute block.
fn split_attrs(line: &str) -> anyhow::Result<(&str, IndexMap<String, String>)> {
    let Some(open) = line.find('[') else {
        return Ok((line.trim(), IndexMap::new()));
    };
    let Some(close) = line.rfind(']') else {
        bail!("unterminated attribute block");
    };
    if close < open {
        bail!("unterminated attribute block");
    }
    let head = line[..open].trim();
    let body = &line[open + 1..close];

    let mut attrs = IndexMap::new();
    for item in body.split(',') {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let Some((key, value)) = item.split_once('=') else {
            bail!("attribute {item:?} is not key=value");
        };
        attrs.insert(key.trim().to_string(), unquote(value.trim()).to_string());
    }
    Ok((head, attrs))
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split('|')
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

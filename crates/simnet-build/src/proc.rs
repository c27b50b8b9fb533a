//! Process-tree teardown.
//!
//! VMs are launched under sudo, so a recorded pid is the root of a small
//! tree (sudo, the hypervisor, its helpers). Teardown walks the live
//! process table and kills the leaves; parents exit naturally once their
//! children are gone. The walk is an explicit stack over the pid graph,
//! which the OS guarantees is acyclic, so depth is bounded without
//! recursion.

use std::collections::HashMap;
use std::process::Command;

use sysinfo::{Pid, System};

/// Kill the process tree rooted at `root_pid`, leaves first. A pid that
/// has already exited is logged and skipped; this is the normal case
/// when stopping a simulation whose VMs crashed or were shut down from
/// inside.
pub fn kill_process_tree(root_pid: u32) {
    let sys = System::new_all();
    kill_tree_in(&sys, root_pid);
}

/// Same as [`kill_process_tree`] over an already-refreshed process
/// table, so a stop loop does not re-read /proc per node.
pub fn kill_tree_in(sys: &System, root_pid: u32) {
    let root = Pid::from_u32(root_pid);
    if !sys.processes().contains_key(&root) {
        tracing::debug!(pid = root_pid, "process already exited");
        return;
    }

    let mut children: HashMap<Pid, Vec<Pid>> = HashMap::new();
    for (pid, process) in sys.processes() {
        if let Some(parent) = process.parent() {
            children.entry(parent).or_default().push(*pid);
        }
    }
    for kids in children.values_mut() {
        kids.sort_unstable();
    }

    let mut stack = vec![root];
    while let Some(pid) = stack.pop() {
        match children.get(&pid) {
            Some(kids) if !kids.is_empty() => stack.extend(kids.iter().copied()),
            _ => kill_pid(pid.as_u32()),
        }
    }
}

fn kill_pid(pid: u32) {
    tracing::debug!(pid, "killing process");
    let result = Command::new("sudo")
        .args(["kill", "-9", &pid.to_string()])
        .output();
    match result {
        Ok(output) if !output.status.success() => {
            tracing::debug!(
                pid,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "kill returned nonzero, process likely already gone"
            );
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(pid, error = %e, "failed to run kill"),
    }
}

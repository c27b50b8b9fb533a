//! Cross-process port leasing.
//!
//! Allocator state is externalized: one marker file per port number in a
//! shared directory. An empty marker means the port is free; a non-empty
//! marker records the owning simulation's tag. The markers are the
//! single source of truth, so a different process can later discover and
//! release a simulation's leases. The in-memory free list is a cache and
//! is allowed to go stale; every lease re-checks the marker under an
//! exclusive lock.
//!
//! Every lock here is advisory and try-once: a failed acquisition means
//! "someone else has it right now" and the resource is skipped, never
//! queued on.

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::net::UdpSocket;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use nix::fcntl::{Flock, FlockArg};

/// Lock file guarding first-time marker directory seeding, created next
/// to the marker directory itself.
const SEED_LOCK_FILE: &str = ".simnet-ports.lock";

#[derive(Debug)]
pub struct PortAllocator {
    marker_dir: PathBuf,
    /// Free candidates, ascending. Cache of the last scan; markers win
    /// on any disagreement.
    free: Vec<u16>,
}

impl PortAllocator {
    /// Open the allocator over a marker directory, seeding it (one empty
    /// marker per locally-bindable port in `range`) if this is the first
    /// simulation on the host.
    pub fn new(marker_dir: PathBuf, range: RangeInclusive<u16>) -> io::Result<Self> {
        if !marker_dir.is_dir() {
            seed_markers(&marker_dir, range)?;
        }
        let free = if marker_dir.is_dir() {
            scan_markers(&marker_dir)?
        } else {
            // Lost the seeding race and the winner has not finished yet.
            // Start with an empty cache; callers already have to handle
            // a short lease result.
            tracing::debug!(dir = %marker_dir.display(), "marker directory not ready, starting empty");
            Vec::new()
        };
        tracing::debug!(dir = %marker_dir.display(), free = free.len(), "port allocator ready");
        Ok(Self { marker_dir, free })
    }

    /// Lease up to `num_ports` ports for `owner`. Candidates whose
    /// marker is contended or no longer empty are dropped, not retried.
    /// The result may be shorter than requested (including empty);
    /// callers must check the length.
    pub fn get_free_ports(&mut self, num_ports: usize, owner: &str) -> Vec<u16> {
        let mut granted = Vec::with_capacity(num_ports);
        while granted.len() < num_ports && !self.free.is_empty() {
            let port = self.free.remove(0);
            match self.try_lease(port, owner) {
                Ok(true) => granted.push(port),
                Ok(false) => {
                    tracing::debug!(port, "port marker contended, dropping candidate");
                }
                Err(e) => {
                    tracing::warn!(port, error = %e, "port marker unusable, dropping candidate");
                }
            }
        }
        if granted.len() < num_ports {
            tracing::warn!(
                needed = num_ports,
                got = granted.len(),
                "free port list exhausted"
            );
        }
        granted
    }

    /// Release ports back to the pool. A port is only released if its
    /// marker records `owner`; markers owned by another simulation (or
    /// locked right now) are left alone.
    pub fn release_ports(&mut self, ports: &[u16], owner: &str) {
        for &port in ports {
            match self.try_release(port, owner) {
                Ok(true) => {
                    tracing::debug!(port, "released port");
                    if let Err(idx) = self.free.binary_search(&port) {
                        self.free.insert(idx, port);
                    }
                }
                Ok(false) => {
                    tracing::debug!(port, "port not released, marker owned elsewhere or contended");
                }
                Err(e) => {
                    tracing::debug!(port, error = %e, "port marker unavailable during release");
                }
            }
        }
    }

    /// Current size of the in-memory free list.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn marker_dir(&self) -> &Path {
        &self.marker_dir
    }

    fn marker_path(&self, port: u16) -> PathBuf {
        self.marker_dir.join(port.to_string())
    }

    fn try_lease(&self, port: u16, owner: &str) -> io::Result<bool> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(self.marker_path(port))?;
        let mut locked = match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(locked) => locked,
            Err((_file, _errno)) => return Ok(false),
        };
        let mut current = String::new();
        locked.read_to_string(&mut current)?;
        if !current.trim().is_empty() {
            // Leased by someone else since our scan.
            return Ok(false);
        }
        locked.set_len(0)?;
        locked.seek(SeekFrom::Start(0))?;
        locked.write_all(owner.as_bytes())?;
        Ok(true)
    }

    fn try_release(&self, port: u16, owner: &str) -> io::Result<bool> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(self.marker_path(port))?;
        let mut locked = match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(locked) => locked,
            Err((_file, _errno)) => return Ok(false),
        };
        let mut current = String::new();
        locked.read_to_string(&mut current)?;
        if current.trim() != owner {
            return Ok(false);
        }
        locked.set_len(0)?;
        Ok(true)
    }
}

/// Create the marker directory and one empty marker per bindable port.
/// Guarded by a try-once lock next to the directory; losing the race
/// means another process is seeding, and the caller proceeds to scan
/// whatever exists.
fn seed_markers(dir: &Path, range: RangeInclusive<u16>) -> io::Result<()> {
    let parent = dir.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(parent.join(SEED_LOCK_FILE))?;
    let _guard = match Flock::lock(lock_file, FlockArg::LockExclusiveNonblock) {
        Ok(guard) => guard,
        Err((_file, _errno)) => {
            tracing::debug!(dir = %dir.display(), "another process is seeding the marker directory");
            return Ok(());
        }
    };
    if dir.is_dir() {
        // The previous lock holder finished the job.
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    let mut created = 0usize;
    for port in range {
        if !probe_port(port) {
            tracing::debug!(port, "port not bindable, no marker created");
            continue;
        }
        fs::write(dir.join(port.to_string()), b"")?;
        created += 1;
    }
    tracing::info!(dir = %dir.display(), markers = created, "seeded port marker directory");
    Ok(())
}

/// One pass over the marker directory; empty markers are free.
fn scan_markers(dir: &Path) -> io::Result<Vec<u16>> {
    let mut free = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Ok(port) = name.to_string_lossy().parse::<u16>() else {
            continue;
        };
        if entry.metadata()?.len() == 0 {
            free.push(port);
        }
    }
    free.sort_unstable();
    Ok(free)
}

/// Best-effort local availability check: can we bind the port right now.
fn probe_port(port: u16) -> bool {
    UdpSocket::bind(("127.0.0.1", port)).is_ok()
}

//! Cross-process execution lock backed by a filesystem marker.
//!
//! # Responsibilities
//! - Ensure only one scraper instance runs at a time on this host
//! - Detect and reclaim markers left behind by dead processes
//! - Release only markers this process actually owns
//!
//! # Design Decisions
//! - The marker is three lines (pid, acquisition epoch seconds, command
//!   line); absence means unlocked
//! - The record is written to a pid-unique temp file and linked into place,
//!   so a reader never observes a partial marker and concurrent claimants
//!   resolve to a single winner on the final create-if-absent step
//! - Stale-lock reclamation (detect dead owner, delete, re-claim) is not
//!   linearizable as a whole; two processes racing through it is a known,
//!   narrow risk accepted by this design, bounded by the atomic final link
//! - Release on every exit path is the caller's job via [`LockGuard`];
//!   liveness-based staleness recovery covers the paths no destructor can

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::config::LockConfig;
use crate::lock::liveness::is_pid_alive;

/// Contents of the lock marker file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    /// Pid of the process that wrote the marker.
    pub pid: u32,

    /// Acquisition time, seconds since the Unix epoch.
    pub acquired_at: u64,

    /// Command line of the owner, for diagnostics only.
    pub command: String,
}

impl LockRecord {
    fn for_current_process() -> Self {
        let acquired_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let command = std::env::args().collect::<Vec<_>>().join(" ");
        Self {
            pid: std::process::id(),
            acquired_at,
            command,
        }
    }

    fn serialize(&self) -> String {
        format!("{}\n{}\n{}\n", self.pid, self.acquired_at, self.command)
    }

    fn parse(content: &str) -> Option<Self> {
        let mut lines = content.lines();
        let pid = lines.next()?.trim().parse().ok()?;
        // Tolerate fractional timestamps written by older versions.
        let acquired_at = lines.next()?.trim().parse::<f64>().ok()? as u64;
        let command = lines.next().unwrap_or("").to_string();
        Some(Self {
            pid,
            acquired_at,
            command,
        })
    }

    /// Age of the marker relative to now.
    pub fn age(&self) -> Duration {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Duration::from_secs(now.saturating_sub(self.acquired_at))
    }

    /// Whether the recorded owner still refers to a live process.
    pub fn owner_alive(&self) -> bool {
        is_pid_alive(self.pid)
    }
}

/// Cross-process mutual exclusion for the scraper job.
pub struct ExecutionLock {
    path: PathBuf,
    timeout: Duration,
    poll_interval: Duration,
    pid: u32,
    held: bool,
}

impl ExecutionLock {
    /// Create a lock handle for the configured marker path. Does not touch
    /// the filesystem until an acquisition is attempted.
    pub fn new(config: LockConfig) -> Self {
        Self {
            path: PathBuf::from(config.path),
            timeout: Duration::from_secs(config.timeout_secs),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            pid: std::process::id(),
            held: false,
        }
    }

    /// Attempt immediate acquisition.
    ///
    /// Returns `Ok(false)` when another live process holds the lock. A
    /// marker whose owner is dead is treated as stale: it is removed and
    /// acquisition is retried once.
    pub fn try_acquire(&mut self) -> io::Result<bool> {
        if self.held {
            tracing::warn!(pid = self.pid, "lock already acquired by this process");
            return Ok(true);
        }

        // One retry after stale-lock removal.
        for _ in 0..2 {
            if self.path.exists() {
                match self.read_record() {
                    Some(record) if record.owner_alive() => {
                        tracing::debug!(
                            owner_pid = record.pid,
                            "lock held by another live process"
                        );
                        return Ok(false);
                    }
                    record => {
                        // Dead owner or unreadable marker: stale either way.
                        tracing::info!(
                            owner_pid = ?record.as_ref().map(|r| r.pid),
                            "removing stale lock marker"
                        );
                        if let Err(e) = fs::remove_file(&self.path) {
                            if e.kind() != io::ErrorKind::NotFound {
                                return Err(e);
                            }
                        }
                        continue;
                    }
                }
            }

            match self.claim() {
                Ok(true) => {
                    self.held = true;
                    tracing::info!(pid = self.pid, path = %self.path.display(), "lock acquired");
                    return Ok(true);
                }
                // Another claimant linked its marker first.
                Ok(false) => return Ok(false),
                Err(e) => return Err(e),
            }
        }

        Ok(false)
    }

    /// Blocking acquisition: poll at the configured interval until the lock
    /// is obtained or the configured timeout elapses.
    ///
    /// Timeout is an expected outcome, reported as `Ok(false)`.
    pub fn acquire_wait(&mut self) -> io::Result<bool> {
        let start = Instant::now();
        loop {
            if self.try_acquire()? {
                return Ok(true);
            }
            if start.elapsed() >= self.timeout {
                tracing::error!(
                    timeout_secs = self.timeout.as_secs(),
                    "timed out waiting for lock"
                );
                return Ok(false);
            }
            if let Some(record) = self.read_record() {
                tracing::info!(owner_pid = record.pid, "waiting for lock");
            }
            std::thread::sleep(self.poll_interval);
        }
    }

    /// Release the lock.
    ///
    /// The marker is removed only when its recorded pid is ours; a marker
    /// reclaimed by another process after a stale-lock race is left alone.
    /// An already-absent marker is logged, not an error.
    pub fn release(&mut self) {
        if !self.held {
            tracing::warn!("release called without a held lock");
            return;
        }

        match self.read_record() {
            Some(record) if record.pid == self.pid => {
                if let Err(e) = fs::remove_file(&self.path) {
                    tracing::error!(error = %e, "failed to remove lock marker");
                } else {
                    tracing::info!(pid = self.pid, "lock released");
                }
            }
            Some(record) => {
                tracing::warn!(
                    owner_pid = record.pid,
                    own_pid = self.pid,
                    "lock marker owned by another process; leaving it in place"
                );
            }
            None => {
                tracing::debug!("lock marker already absent at release");
            }
        }

        self.held = false;
    }

    /// Acquire and return a guard that releases on every exit path of the
    /// caller's scope. Returns `Ok(None)` when the lock is held elsewhere.
    pub fn guard(&mut self) -> io::Result<Option<LockGuard<'_>>> {
        if self.try_acquire()? {
            Ok(Some(LockGuard { lock: self }))
        } else {
            Ok(None)
        }
    }

    /// Whether a valid lock currently exists (marker present, owner alive).
    pub fn is_held(&self) -> bool {
        self.read_record().is_some_and(|r| r.owner_alive())
    }

    /// Read the current marker without side effects, for diagnostics.
    pub fn inspect(&self) -> Option<LockRecord> {
        self.read_record()
    }

    /// Remove the marker regardless of ownership.
    pub fn force_release(&mut self) {
        let owner = self.read_record().map(|r| r.pid);
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::warn!(?owner, "lock marker force released"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::error!(error = %e, "failed to force release lock marker"),
        }
        self.held = false;
    }

    fn read_record(&self) -> Option<LockRecord> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let record = LockRecord::parse(&content);
                if record.is_none() {
                    tracing::warn!(path = %self.path.display(), "unparseable lock marker");
                }
                record
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(error = %e, "could not read lock marker");
                None
            }
        }
    }

    /// Write our record to a pid-unique temp file, then link it into place.
    /// The link fails with `AlreadyExists` when another process won the
    /// race, which is the single-winner property the whole scheme rests on.
    fn claim(&self) -> io::Result<bool> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let record = LockRecord::for_current_process();
        let temp = self.temp_path();
        fs::write(&temp, record.serialize())?;

        let result = match fs::hard_link(&temp, &self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e),
        };

        if let Err(e) = fs::remove_file(&temp) {
            tracing::debug!(error = %e, "could not remove temp lock file");
        }

        result
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "lock".to_string());
        self.path
            .with_file_name(format!("{}.{}.tmp", name, self.pid))
    }

    #[cfg(test)]
    pub(crate) fn marker_path(&self) -> &std::path::Path {
        &self.path
    }
}

/// Scoped ownership of an [`ExecutionLock`]; releases on drop, covering
/// normal returns, error returns, and unwinds alike.
pub struct LockGuard<'a> {
    lock: &'a mut ExecutionLock,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

//! Pid liveness probing.
//!
//! The staleness decision for a lock marker hinges on whether the recorded
//! owner process still exists. The probe must not disturb the target, so it
//! uses `kill(pid, 0)`: signal 0 performs permission and existence checks
//! without delivering anything.

use std::io;

/// Check whether a given pid refers to a live process.
///
/// EPERM means the process exists but we may not signal it; that still
/// counts as alive, so a lock held by another user is never treated as
/// stale.
pub fn is_pid_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let Ok(pid_i32) = i32::try_from(pid) else {
        return false;
    };
    #[cfg(unix)]
    {
        // SAFETY: kill with signal 0 only checks for process existence.
        let result = unsafe { libc::kill(pid_i32, 0) };
        if result == 0 {
            return true;
        }
        let errno = io::Error::last_os_error().raw_os_error().unwrap_or(0);
        errno == libc::EPERM
    }
    #[cfg(not(unix))]
    {
        // Without a cheap existence probe, assume alive: a lock is never
        // reclaimed on the strength of a guess.
        let _ = pid;
        true
    }
}

//! # Process Lookup
//!
//! Resolve what the operator typed (`-`, a PID, or a name) into a PID.
//!
//! Name lookup follows `pgrep -o -i -x`: the name must match exactly but
//! case-insensitively, and when several processes share it the **oldest**
//! instance wins (earliest start time, lowest PID on ties). Daemons that get
//! respawned on demand therefore resolve to the long-lived instance.

use tracing::debug;

use crate::error::{PatchError, PatchResult};
use crate::types::{ProcessEntry, ProcessId, ProcessTarget};

/// Case-insensitive exact comparison of a process name with the requested one
pub fn matches_name(candidate: &str, wanted: &str) -> bool
{
    candidate.to_lowercase() == wanted.to_lowercase()
}

/// Pick the oldest process named `name` from a listing
pub fn select_oldest<I>(entries: I, name: &str) -> Option<ProcessId>
where
    I: IntoIterator<Item = ProcessEntry>,
{
    entries
        .into_iter()
        .filter(|entry| matches_name(&entry.name, name))
        .min_by_key(|entry| (entry.start_time, entry.pid))
        .map(|entry| entry.pid)
}

/// Find the PID of the oldest running process called `name`
///
/// ## Errors
///
/// - `ProcessNameNotFound` when nothing matches
/// - `Unsupported` off macOS
pub fn find_pid_by_name(name: &str) -> PatchResult<ProcessId>
{
    let entries = list_processes()?;
    debug!(count = entries.len(), name, "looking up process by name");
    select_oldest(entries, name).ok_or_else(|| PatchError::ProcessNameNotFound(name.to_string()))
}

/// Resolve a [`ProcessTarget`] to a PID
pub fn resolve_target(target: &ProcessTarget) -> PatchResult<ProcessId>
{
    match target {
        ProcessTarget::CurrentProcess => Ok(ProcessId::current()),
        ProcessTarget::Pid(pid) => Ok(*pid),
        ProcessTarget::Name(name) => find_pid_by_name(name),
    }
}

/// Snapshot of the running processes with their names and start times
pub fn list_processes() -> PatchResult<Vec<ProcessEntry>>
{
    #[cfg(target_os = "macos")]
    {
        crate::platform::macos::process::list_processes()
    }

    #[cfg(not(target_os = "macos"))]
    {
        Err(PatchError::Unsupported(std::env::consts::OS))
    }
}

/// Whether the effective user is root
#[allow(unsafe_code)] // geteuid() is an FFI call
pub fn is_root() -> bool
{
    // SAFETY: geteuid() has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

/// Fail with `NotRoot` unless running as root
pub fn ensure_root() -> PatchResult<()>
{
    if is_root() {
        Ok(())
    } else {
        Err(PatchError::NotRoot)
    }
}

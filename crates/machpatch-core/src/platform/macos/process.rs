//! # macOS Process Listing
//!
//! Process names and start times from `proc_listpids()` / `proc_pidinfo()`
//! through the `libproc` crate.

use libproc::libproc::bsd_info::BSDInfo;
use libproc::libproc::proc_pid::{self, pidinfo};
use libproc::processes::{pids_by_type, ProcFilter};
use tracing::trace;

use crate::error::{PatchError, PatchResult};
use crate::types::{ProcessEntry, ProcessId};

/// Snapshot of every process we can see
///
/// Processes that exit between listing and inspection, or that refuse
/// `proc_pidinfo()`, are skipped.
pub fn list_processes() -> PatchResult<Vec<ProcessEntry>>
{
    let pids = pids_by_type(ProcFilter::All)
        .map_err(|err| PatchError::InvalidArgument(format!("proc_listpids failed: {err}")))?;

    let mut entries = Vec::with_capacity(pids.len());
    for pid in pids {
        let Ok(raw) = i32::try_from(pid) else {
            continue;
        };
        if raw <= 0 {
            continue;
        }
        match describe(raw) {
            Ok(entry) => entries.push(entry),
            Err(err) => trace!(pid, %err, "skipping process"),
        }
    }

    Ok(entries)
}

fn describe(pid: i32) -> Result<ProcessEntry, String>
{
    let info = pidinfo::<BSDInfo>(pid, 0)?;
    let name = proc_pid::name(pid)?;
    // Microsecond resolution, enough to order two launches of the same daemon
    let start_time = info
        .pbi_start_tvsec
        .saturating_mul(1_000_000)
        .saturating_add(info.pbi_start_tvusec);

    Ok(ProcessEntry {
        pid: ProcessId(pid.unsigned_abs()),
        name,
        start_time,
    })
}

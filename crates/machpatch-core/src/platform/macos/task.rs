//! # macOS Task Port
//!
//! [`MachTask`] owns a send right to another process's task port and moves
//! bytes in and out of its address space.
//!
//! ## Mach APIs Used
//!
//! - **task_for_pid()**: obtain the task port (root only)
//! - **mach_vm_read_overwrite()**: copy target memory into our buffer
//! - **mach_vm_write()**: copy our buffer into target memory
//! - **mach_vm_protect()**: change the current protection of a range
//! - **mach_vm_region_recurse()**: walk the mapped regions
//!
//! ## References
//!
//! - [mach_vm_read_overwrite](https://developer.apple.com/documentation/kernel/1402127-mach_vm_read_overwrite)
//! - [mach_vm_write](https://developer.apple.com/documentation/kernel/1402070-mach_vm_write)
//! - [mach_vm_protect](https://developer.apple.com/documentation/kernel/1402162-mach_vm_protect)

use std::cmp::min;

use libc::{c_int, vm_map_t, vm_offset_t};
use mach2::kern_return::{KERN_FAILURE, KERN_INVALID_ADDRESS, KERN_SUCCESS};
use mach2::message::mach_msg_type_number_t;
use mach2::port::mach_port_t;
use mach2::traps::mach_task_self;
use mach2::vm::{mach_vm_protect, mach_vm_read_overwrite, mach_vm_region_recurse, mach_vm_write};
use mach2::vm_region::{
    vm_region_recurse_info_t, vm_region_submap_short_info_data_64_t, VM_REGION_SUBMAP_SHORT_INFO_COUNT_64,
};
use mach2::vm_types::{mach_vm_address_t, mach_vm_size_t, natural_t};
use once_cell::sync::Lazy;
use tracing::{debug, trace, warn};

use crate::error::{PatchError, PatchResult};
use crate::memory::{Protection, TaskMemory};
use crate::platform::macos::error::{check, MachError};
use crate::platform::macos::ffi;
use crate::types::{Address, AddressRange, MemoryRegion, ProcessId};

/// Largest single `mach_vm_read_overwrite()` request; longer reads are chunked
pub const MAX_VM_READ_CHUNK: usize = 64 * 1024;

static SYSTEM_PAGE_SIZE: Lazy<u64> = Lazy::new(|| {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    u64::try_from(size).ok().filter(|size| size.is_power_of_two()).unwrap_or(4096)
});

/// Widen `range` to whole pages, the granularity `mach_vm_protect()` works in
pub fn page_aligned(range: AddressRange, page_size: u64) -> (mach_vm_address_t, mach_vm_size_t)
{
    let mask = !(page_size - 1);
    let start = range.start.value() & mask;
    let end = range.start.value().saturating_add(range.size).saturating_add(page_size - 1) & mask;
    (start, end.saturating_sub(start).max(page_size))
}

/// A task port for another process
///
/// The send right is released with `mach_port_deallocate()` when dropped.
#[derive(Debug)]
pub struct MachTask
{
    task: mach_port_t,
    pid: ProcessId,
}

impl MachTask
{
    /// Obtain the task port of `pid`
    ///
    /// ## Errors
    ///
    /// - `PermissionDenied`: `task_for_pid()` failed for a process that exists.
    ///   Not running as root, or SIP protecting a platform binary.
    /// - `ProcessNotFound`: `task_for_pid()` failed and nothing answers `kill(pid, 0)`
    /// - `MachError`: any other kernel return
    pub fn for_pid(pid: ProcessId) -> PatchResult<Self>
    {
        let mut task: mach_port_t = 0;
        let result = unsafe { ffi::task_for_pid(mach_task_self(), pid.0 as c_int, &mut task) };

        if result != KERN_SUCCESS {
            let error = MachError::from_code("task_for_pid", result);
            if result == KERN_FAILURE {
                // kill(pid, 0) sends nothing; it only reports whether the PID exists
                let process_exists = unsafe { libc::kill(pid.0 as libc::pid_t, 0) } == 0;
                if !process_exists {
                    return Err(PatchError::ProcessNotFound(pid.0));
                }
            }
            if error.is_access_denied() {
                return Err(PatchError::PermissionDenied(format!("{error} for process {pid}")));
            }
            return Err(error.into());
        }

        debug!(%pid, task, "obtained task port");
        Ok(Self { task, pid })
    }

    pub fn pid(&self) -> ProcessId
    {
        self.pid
    }

    /// Raw task port, valid for as long as `self` lives
    pub fn port(&self) -> mach_port_t
    {
        self.task
    }
}

impl Drop for MachTask
{
    fn drop(&mut self)
    {
        let result = unsafe { ffi::mach_port_deallocate(mach_task_self(), self.task) };
        if result != KERN_SUCCESS {
            warn!(pid = %self.pid, result, "failed to release task port");
        }
    }
}

impl TaskMemory for MachTask
{
    fn read_bytes(&self, range: AddressRange) -> PatchResult<Vec<u8>>
    {
        let len = usize::try_from(range.size).map_err(|_| PatchError::InvalidArgument(format!("{range} is too large")))?;
        let mut buffer = vec![0u8; len];
        let mut total = 0usize;
        let mut cursor = range.start.value();

        while total < len {
            let chunk_len = min(MAX_VM_READ_CHUNK, len - total);
            let mut actual: mach_vm_size_t = 0;

            let result = unsafe {
                mach_vm_read_overwrite(
                    self.task as vm_map_t,
                    cursor,
                    chunk_len as mach_vm_size_t,
                    buffer[total..].as_mut_ptr() as mach_vm_address_t,
                    &mut actual,
                )
            };
            check("mach_vm_read_overwrite", result)?;

            if actual == 0 {
                return Err(PatchError::BufferTooShort {
                    needed: range.size,
                    available: total,
                });
            }

            total += actual as usize;
            cursor += actual;
        }

        trace!(%range, "read task memory");
        Ok(buffer)
    }

    fn write_bytes(&mut self, address: Address, bytes: &[u8]) -> PatchResult<()>
    {
        if bytes.is_empty() {
            return Ok(());
        }

        let count = mach_msg_type_number_t::try_from(bytes.len())
            .map_err(|_| PatchError::InvalidArgument(format!("{} bytes is too large to write", bytes.len())))?;
        let result = unsafe {
            mach_vm_write(
                self.task as vm_map_t,
                address.value() as mach_vm_address_t,
                bytes.as_ptr() as vm_offset_t,
                count,
            )
        };
        check("mach_vm_write", result)?;

        debug!(%address, len = bytes.len(), "wrote task memory");
        Ok(())
    }

    fn set_protection(&mut self, range: AddressRange, protection: Protection) -> PatchResult<()>
    {
        let (start, size) = page_aligned(range, *SYSTEM_PAGE_SIZE);
        // set_maximum = 0: only the current protection changes, bounded by the region maximum
        let result = unsafe { mach_vm_protect(self.task as vm_map_t, start, size, 0, protection.raw()) };
        check("mach_vm_protect", result)?;

        debug!(%range, start, size, %protection, "changed protection");
        Ok(())
    }

    fn regions(&self) -> PatchResult<Vec<MemoryRegion>>
    {
        let mut regions = Vec::new();
        let mut address: mach_vm_address_t = 0;
        let mut depth: natural_t = 0;

        loop {
            let mut size: mach_vm_size_t = 0;
            let mut info = vm_region_submap_short_info_data_64_t::default();
            let mut info_count = VM_REGION_SUBMAP_SHORT_INFO_COUNT_64;

            let result = unsafe {
                mach_vm_region_recurse(
                    self.task as vm_map_t,
                    &mut address,
                    &mut size,
                    &mut depth,
                    &mut info as *mut _ as vm_region_recurse_info_t,
                    &mut info_count,
                )
            };

            if result == KERN_INVALID_ADDRESS {
                break;
            }
            check("mach_vm_region_recurse", result)?;

            if info.is_submap != 0 {
                depth += 1;
                continue;
            }

            let permissions = Protection::from_raw(info.protection).to_permissions();
            regions.push(MemoryRegion::new(
                Address::from(address),
                Address::from(address.saturating_add(size)),
                permissions,
            ));

            address = match address.checked_add(size) {
                Some(next) => next,
                None => break,
            };
        }

        debug!(pid = %self.pid, count = regions.len(), "enumerated regions");
        Ok(regions)
    }
}

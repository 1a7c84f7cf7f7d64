//! # macOS Mach API FFI Declarations
//!
//! `extern "C"` declarations for the task-port calls we bind ourselves.
//! The virtual memory calls (`mach_vm_read_overwrite`, `mach_vm_write`,
//! `mach_vm_protect`, `mach_vm_region_recurse`) come from the `mach2` crate.
//!
//! ## Safety Notes
//!
//! All functions in this module are `unsafe`: they hand out and release
//! kernel port rights. They are wrapped by [`super::task::MachTask`].
//!
//! ## References
//!
//! - [Apple Mach Kernel Programming](https://developer.apple.com/library/archive/documentation/Darwin/Conceptual/KernelProgramming/Mach/Mach.html)

// Allow doc comments in extern blocks - they're useful for developers even if rustdoc doesn't generate docs
#![allow(unused_doc_comments)]

use libc::c_int;
use mach2::kern_return::kern_return_t;
use mach2::port::mach_port_t;

#[link(name = "c", kind = "dylib")]
extern "C" {
    /// Get a Mach task port for the process with the given PID
    ///
    /// ## Security
    ///
    /// Requires root, and is refused for platform binaries while System
    /// Integrity Protection is enabled.
    ///
    /// ## Returns
    ///
    /// - `KERN_SUCCESS` on success
    /// - `KERN_PROTECTION_FAILURE` / `KERN_FAILURE` if access is denied
    /// - `KERN_FAILURE` if the process does not exist
    ///
    /// `task_for_pid` is not documented by Apple; see `osfmk/kern/task.c` in
    /// [XNU](https://github.com/apple-oss-distributions/xnu).
    pub fn task_for_pid(target_task: mach_port_t, pid: c_int, task: *mut mach_port_t) -> kern_return_t;

    /// Release a send right obtained from `task_for_pid()`
    ///
    /// See: [mach_port_deallocate](https://developer.apple.com/documentation/kernel/1578777-mach_port_deallocate/)
    pub fn mach_port_deallocate(target_task: mach_port_t, name: mach_port_t) -> kern_return_t;
}

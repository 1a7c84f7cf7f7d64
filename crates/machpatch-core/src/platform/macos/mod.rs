//! # macOS Implementation
//!
//! Task ports and process listing on top of Mach.
//!
//! ## Dependencies
//!
//! - **mach2 crate**: `mach_task_self`, the `mach_vm_*` calls, `kern_return_t` constants
//! - **libproc crate**: process listing with names and start times
//! - **extern "C"**: `task_for_pid` and `mach_port_deallocate` (see [`ffi`])
//!
//! ## References
//!
//! - [Apple Mach Kernel Programming](https://developer.apple.com/library/archive/documentation/Darwin/Conceptual/KernelProgramming/Mach/Mach.html)

pub mod error;
pub mod ffi;
pub mod process;
pub mod task;

pub use error::MachError;
pub use task::MachTask;

//! # machpatch-core
//!
//! Find a running process, resolve where its main executable is loaded, and
//! replace a few bytes at an offset from that base after checking that the
//! bytes currently there are the ones the caller expects.
//!
//! ## Modules
//!
//! - [`types`]: addresses, hex byte strings, process identifiers
//! - [`memory`]: the [`TaskMemory`] trait every memory backend implements
//! - [`process`]: name to PID lookup and the root check
//! - [`image`]: main image discovery and ASLR slide computation
//! - [`patch`]: verified patching
//! - [`target`]: [`TargetProcess`], tying the above together
//!
//! ## Platform Support
//!
//! - **macOS**: Mach task ports (`task_for_pid`, `mach_vm_*`)
//! - **elsewhere**: everything except opening a live process
//!
//! ## Why unsafe code is needed
//!
//! Task ports and the `mach_vm_*` calls are raw kernel interfaces. They are
//! wrapped in safe types in [`platform`]; nothing outside it calls them.

#![allow(unsafe_code)] // Required for Mach APIs and geteuid()

pub mod error;
pub mod image;
pub mod memory;
pub mod patch;
pub mod platform;
pub mod process;
pub mod target;
pub mod types;

// Re-export commonly used types
pub use error::{PatchError, PatchResult};
pub use image::MainImage;
pub use memory::{Protection, TaskMemory};
pub use patch::{Patch, PatchOutcome, PatchState};
#[cfg(target_os = "macos")]
pub use platform::macos::MachTask;
pub use target::TargetProcess;
pub use types::{Address, AddressRange, HexBytes, ProcessId, ProcessTarget};

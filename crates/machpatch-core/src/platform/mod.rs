//! # Platform-Specific Implementations
//!
//! Only macOS has task ports. On other systems [`crate::TargetProcess::open`]
//! and process lookup report `Unsupported`, while everything that works on a
//! [`crate::memory::TaskMemory`] stays available.

#[cfg(target_os = "macos")]
pub mod macos;

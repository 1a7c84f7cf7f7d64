//! # macOS Mach API Errors
//!
//! Error types for macOS Mach API operations.
//!
//! Mach APIs return `kern_return_t` values, which are integer error codes.
//! This module converts those codes into Rust error types with descriptive
//! messages.

use mach2::kern_return::{
    kern_return_t, KERN_FAILURE, KERN_INVALID_ADDRESS, KERN_INVALID_ARGUMENT, KERN_NO_SPACE, KERN_PROTECTION_FAILURE,
};
use thiserror::Error;

/// Mach kernel API error
///
/// Each variant keeps the name of the call that failed so messages read like
/// `mach_vm_write: KERN_PROTECTION_FAILURE`.
///
/// ## References
///
/// - [kern_return_t documentation](https://developer.apple.com/documentation/kernel/kern_return_t)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MachError
{
    /// `KERN_PROTECTION_FAILURE`
    ///
    /// The operation was blocked by macOS's security system. For
    /// `task_for_pid()` on a platform binary this is System Integrity
    /// Protection; for `mach_vm_protect()` the region's maximum protection
    /// does not allow the request.
    #[error("{call}: KERN_PROTECTION_FAILURE (permission denied)")]
    ProtectionFailure
    {
        call: &'static str
    },

    /// `KERN_INVALID_ADDRESS`
    ///
    /// The address is not mapped in the target task.
    #[error("{call}: KERN_INVALID_ADDRESS (address not mapped)")]
    InvalidAddress
    {
        call: &'static str
    },

    /// `KERN_NO_SPACE`
    #[error("{call}: KERN_NO_SPACE (no region at or above address)")]
    NoSpace
    {
        call: &'static str
    },

    /// `KERN_INVALID_ARGUMENT`
    ///
    /// Invalid PID, task port or range.
    #[error("{call}: KERN_INVALID_ARGUMENT (invalid PID or argument)")]
    InvalidArgument
    {
        call: &'static str
    },

    /// `KERN_FAILURE`
    ///
    /// `task_for_pid()` returns this both for missing processes and, on
    /// recent macOS, for denied access.
    #[error("{call}: KERN_FAILURE")]
    Failure
    {
        call: &'static str
    },

    /// Unknown Mach error code
    ///
    /// The integer value is preserved so you can look it up.
    #[error("{call}: unknown Mach error {code}")]
    Unknown
    {
        call: &'static str,
        code: kern_return_t,
    },
}

impl MachError
{
    /// Classify the return code of `call`
    pub fn from_code(call: &'static str, code: kern_return_t) -> Self
    {
        match code {
            KERN_PROTECTION_FAILURE => MachError::ProtectionFailure { call },
            KERN_INVALID_ADDRESS => MachError::InvalidAddress { call },
            KERN_NO_SPACE => MachError::NoSpace { call },
            KERN_INVALID_ARGUMENT => MachError::InvalidArgument { call },
            KERN_FAILURE => MachError::Failure { call },
            _ => MachError::Unknown { call, code },
        }
    }

    /// The raw `kern_return_t`
    pub fn code(&self) -> kern_return_t
    {
        match self {
            MachError::ProtectionFailure { .. } => KERN_PROTECTION_FAILURE,
            MachError::InvalidAddress { .. } => KERN_INVALID_ADDRESS,
            MachError::NoSpace { .. } => KERN_NO_SPACE,
            MachError::InvalidArgument { .. } => KERN_INVALID_ARGUMENT,
            MachError::Failure { .. } => KERN_FAILURE,
            MachError::Unknown { code, .. } => *code,
        }
    }

    /// Name of the Mach call that failed
    pub fn call(&self) -> &'static str
    {
        match self {
            MachError::ProtectionFailure { call }
            | MachError::InvalidAddress { call }
            | MachError::NoSpace { call }
            | MachError::InvalidArgument { call }
            | MachError::Failure { call }
            | MachError::Unknown { call, .. } => call,
        }
    }

    /// Whether the kernel refused access rather than the request being malformed
    pub fn is_access_denied(&self) -> bool
    {
        matches!(self, MachError::ProtectionFailure { .. } | MachError::Failure { call: "task_for_pid" })
    }
}

/// Turn a `kern_return_t` into `Ok(())` or a [`MachError`] naming `call`
///
/// ```rust,no_run
/// use machpatch_core::platform::macos::error::check;
/// use mach2::kern_return::KERN_SUCCESS;
///
/// assert!(check("mach_vm_write", KERN_SUCCESS).is_ok());
/// ```
pub fn check(call: &'static str, code: kern_return_t) -> Result<(), MachError>
{
    if code == mach2::kern_return::KERN_SUCCESS {
        Ok(())
    } else {
        Err(MachError::from_code(call, code))
    }
}

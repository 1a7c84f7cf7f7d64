//! # Error Types
//!
//! General error handling for process lookup, memory access and patching.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

use crate::types::HexBytes;

/// Main error type for machpatch operations
///
/// ## Error Categories
///
/// 1. **Process errors**: ProcessNotFound, ProcessNameNotFound, AttachFailed
/// 2. **Permission errors**: NotRoot, PermissionDenied
/// 3. **Input errors**: InvalidArgument, InvalidAddress, InvalidHexString
/// 4. **Image errors**: ImageNotFound
/// 5. **Patch errors**: SizeMismatch, MemoryNotExpected, MemoryNotPatched, BufferTooShort
/// 6. **Platform errors**: MachError (macOS-specific), Unsupported
/// 7. **I/O errors**: Io (terminal prompts, etc.)
#[derive(Error, Debug)]
pub enum PatchError
{
    /// The process with the given PID doesn't exist or has exited
    #[error("Process not found: PID {0}")]
    ProcessNotFound(u32),

    /// No running process matches the requested name
    #[error("Process Identifier of {0} unknown.")]
    ProcessNameNotFound(String),

    /// The tool was started without root privileges
    ///
    /// `task_for_pid()` on another user's process, and every write into a
    /// system daemon, needs an effective UID of 0.
    #[error("You have to run this as root.")]
    NotRoot,

    /// Insufficient permissions to open the target task
    ///
    /// On macOS, this typically means `task_for_pid()` was refused: run with
    /// `sudo`, and expect System Integrity Protection to block platform
    /// binaries regardless.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Invalid argument passed to a library function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An address could not be parsed from the given text
    #[error("Offset Address not valid: {0}")]
    InvalidAddress(String),

    /// A byte pattern could not be parsed from the given hex text
    #[error("Invalid hexadecimal input string: {0}.")]
    InvalidHexString(String),

    /// Opening the task succeeded but something else about attaching failed
    #[error("Failed to attach to process: {0}")]
    AttachFailed(String),

    /// No 64-bit Mach-O executable header was found in the task
    #[error("Main executable image not found: {0}")]
    ImageNotFound(String),

    /// Expected and patched byte patterns must be the same length
    #[error("Expected memory and patched memory should have the same size ({expected} vs. {patched} bytes).")]
    SizeMismatch
    {
        /// Length of the expected pattern
        expected: usize,
        /// Length of the patched pattern
        patched: usize,
    },

    /// The bytes at the patch address are neither the expected nor the patched pattern
    ///
    /// Almost always a different build of the target binary or a wrong offset.
    #[error("Memory data different to the expected. Original: {found} vs. Expected: {expected}.")]
    MemoryNotExpected
    {
        /// Bytes actually read from the target
        found: HexBytes,
        /// Bytes the caller expected to find
        expected: HexBytes,
    },

    /// The write reported success but reading back shows different bytes
    #[error("Memory not patched: {0}.")]
    MemoryNotPatched(HexBytes),

    /// A write buffer was shorter than the range it was meant to fill
    #[error("Buffer of {available} bytes cannot fill a {needed}-byte range")]
    BufferTooShort
    {
        /// Bytes required by the range
        needed: u64,
        /// Bytes supplied
        available: usize,
    },

    /// The operation has no implementation on this platform
    #[error("Unsupported on {0}: Mach task access is only available on macOS")]
    Unsupported(&'static str),

    /// macOS-specific Mach API error
    ///
    /// Wraps the `kern_return_t` of a failed Mach call.
    #[cfg(target_os = "macos")]
    #[error("Mach API error: {0}")]
    MachError(#[from] crate::platform::macos::error::MachError),

    /// I/O error (terminal interaction, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PatchError
{
    /// Whether this failure usually means the kernel refused access to the target
    ///
    /// Used by the command line to add the System Integrity Protection hint.
    pub fn is_access_denied(&self) -> bool
    {
        match self {
            PatchError::PermissionDenied(_) => true,
            #[cfg(target_os = "macos")]
            PatchError::MachError(err) => err.is_access_denied(),
            _ => false,
        }
    }

    /// Whether a Mach call failed, or the kernel refused the task port
    ///
    /// Every such failure gets the System Integrity Protection hint on the
    /// command line, whatever the `kern_return_t`.
    pub fn is_mach_failure(&self) -> bool
    {
        match self {
            PatchError::PermissionDenied(_) => true,
            #[cfg(target_os = "macos")]
            PatchError::MachError(_) => true,
            _ => false,
        }
    }
}

/// Convenience type alias for `Result<T, PatchError>`
///
/// ```rust
/// use machpatch_core::error::PatchResult;
/// fn foo() -> PatchResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type PatchResult<T> = std::result::Result<T, PatchError>;

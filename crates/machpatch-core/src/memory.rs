//! # Task Memory Interface
//!
//! The seam between the patching logic and the platform that actually owns a
//! task port. On macOS [`crate::platform::macos::MachTask`] implements it with
//! `mach_vm_read_overwrite()`, `mach_vm_write()`, `mach_vm_protect()` and
//! `mach_vm_region_recurse()`. Tests implement it over plain byte buffers.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::error::{PatchError, PatchResult};
use crate::types::{Address, AddressRange, MemoryRegion};

/// Page protection bits, as understood by `mach_vm_protect()`
///
/// The raw values are the `VM_PROT_*` constants from `<mach/vm_prot.h>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Protection(i32);

impl Protection
{
    pub const NONE: Self = Protection(0x0);
    pub const READ: Self = Protection(0x1);
    pub const WRITE: Self = Protection(0x2);
    pub const EXECUTE: Self = Protection(0x4);
    /// `VM_PROT_ALL`: read, write and execute
    pub const ALL: Self = Protection(0x7);

    pub const fn from_raw(raw: i32) -> Self
    {
        Protection(raw)
    }

    pub const fn raw(self) -> i32
    {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool
    {
        self.0 & other.0 == other.0
    }

    /// `r`, `w`, `x` letters for the bits that are set
    pub fn to_permissions(self) -> String
    {
        let mut perms = String::new();
        if self.contains(Protection::READ) {
            perms.push('r');
        }
        if self.contains(Protection::WRITE) {
            perms.push('w');
        }
        if self.contains(Protection::EXECUTE) {
            perms.push('x');
        }
        perms
    }
}

impl BitOr for Protection
{
    type Output = Protection;

    fn bitor(self, rhs: Self) -> Self::Output
    {
        Protection(self.0 | rhs.0)
    }
}

impl BitOrAssign for Protection
{
    fn bitor_assign(&mut self, rhs: Self)
    {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for Protection
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let perms = self.to_permissions();
        if perms.is_empty() {
            f.write_str("---")
        } else {
            f.write_str(&perms)
        }
    }
}

/// Memory of a target task
///
/// Implementors only need to move bytes; all comparison and verification
/// lives in [`crate::patch`].
pub trait TaskMemory
{
    /// Read exactly `range.size` bytes starting at `range.start`
    ///
    /// A short read is an error, never a truncated buffer.
    fn read_bytes(&self, range: AddressRange) -> PatchResult<Vec<u8>>;

    /// Write `bytes` at `address`
    fn write_bytes(&mut self, address: Address, bytes: &[u8]) -> PatchResult<()>;

    /// Set the current protection of the pages covering `range`
    fn set_protection(&mut self, range: AddressRange, protection: Protection) -> PatchResult<()>;

    /// Enumerate mapped regions in ascending address order
    fn regions(&self) -> PatchResult<Vec<MemoryRegion>>;

    /// Write the first `range.size` bytes of `bytes` into `range`
    ///
    /// Fails with `BufferTooShort` when the buffer cannot fill the range.
    fn write_range(&mut self, range: AddressRange, bytes: &[u8]) -> PatchResult<()>
    {
        let needed = usize::try_from(range.size).map_err(|_| PatchError::BufferTooShort {
            needed: range.size,
            available: bytes.len(),
        })?;
        if bytes.len() < needed {
            return Err(PatchError::BufferTooShort {
                needed: range.size,
                available: bytes.len(),
            });
        }
        self.write_bytes(range.start, &bytes[..needed])
    }
}

//! # Byte Patching
//!
//! Verified in-place modification of a few bytes in a target task.
//!
//! A [`Patch`] pairs the bytes a given build of the target is known to
//! contain at an address with the bytes that should replace them. Applying it
//! goes in three steps:
//!
//! 1. Read the range and classify it: already patched, expected, or unknown.
//!    Unknown bytes abort without touching the target.
//! 2. Ask the caller for confirmation. Declining leaves the target untouched.
//! 3. Raise the page protection to `VM_PROT_ALL`, write, and read back.
//!
//! ## Example
//!
//! ```rust,no_run
//! # fn demo() -> machpatch_core::error::PatchResult<()> {
//! use machpatch_core::patch::PatchOutcome;
//! use machpatch_core::{ProcessTarget, TargetProcess};
//!
//! let target: ProcessTarget = "SomeDaemon".parse()?;
//! let mut process = TargetProcess::open(&target)?;
//! let patch = process.patch_at_offset(0x3462, "85C00F84AF".parse()?, "85C90F81AF".parse()?)?;
//! match patch.apply(process.memory_mut(), |_| Ok(true))? {
//!     PatchOutcome::Patched => println!("patched"),
//!     PatchOutcome::AlreadyPatched => println!("already patched"),
//!     PatchOutcome::Declined => println!("left alone"),
//! }
//! # Ok(())
//! # }
//! ```

use tracing::{debug, info, warn};

use crate::error::{PatchError, PatchResult};
use crate::memory::{Protection, TaskMemory};
use crate::types::{Address, AddressRange, HexBytes};

/// State of the patch range before anything is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchState
{
    /// The range holds the expected (unpatched) bytes
    Expected,
    /// The range already holds the patched bytes
    AlreadyPatched,
}

/// Result of [`Patch::apply`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome
{
    /// Bytes were written and read back successfully
    Patched,
    /// Nothing to do: the patched bytes were already present
    AlreadyPatched,
    /// The confirmation callback declined; nothing was written
    Declined,
}

/// Expected and replacement bytes at one address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch
{
    address: Address,
    expected: HexBytes,
    patched: HexBytes,
}

impl Patch
{
    /// Build a patch from byte patterns
    ///
    /// ## Errors
    ///
    /// - `SizeMismatch` when the patterns differ in length
    /// - `InvalidArgument` when the patterns are empty
    pub fn new(address: Address, expected: impl Into<HexBytes>, patched: impl Into<HexBytes>) -> PatchResult<Self>
    {
        let expected = expected.into();
        let patched = patched.into();

        if expected.len() != patched.len() {
            return Err(PatchError::SizeMismatch {
                expected: expected.len(),
                patched: patched.len(),
            });
        }
        if expected.is_empty() {
            return Err(PatchError::InvalidArgument("patch patterns are empty".to_string()));
        }

        Ok(Self {
            address,
            expected,
            patched,
        })
    }

    /// Build a patch from hex strings such as `"85C00F84AF"` or `"0x85 c9 0f 81 af"`
    pub fn from_hex(address: Address, expected: &str, patched: &str) -> PatchResult<Self>
    {
        Self::new(address, expected.parse::<HexBytes>()?, patched.parse::<HexBytes>()?)
    }

    pub fn address(&self) -> Address
    {
        self.address
    }

    pub fn expected(&self) -> &HexBytes
    {
        &self.expected
    }

    pub fn patched(&self) -> &HexBytes
    {
        &self.patched
    }

    /// The range covered by the patch
    pub fn range(&self) -> AddressRange
    {
        AddressRange::new(self.address, self.patched.len() as u64)
    }

    /// Read the range and classify it without writing
    ///
    /// ## Errors
    ///
    /// `MemoryNotExpected` when the range holds neither pattern.
    pub fn inspect<M: TaskMemory + ?Sized>(&self, memory: &M) -> PatchResult<PatchState>
    {
        let current = memory.read_bytes(self.range())?;
        debug!(address = %self.address, current = %HexBytes::from(current.as_slice()), "read patch range");

        if current == self.patched.as_slice() {
            return Ok(PatchState::AlreadyPatched);
        }
        if current != self.expected.as_slice() {
            return Err(PatchError::MemoryNotExpected {
                found: HexBytes::new(current),
                expected: self.expected.clone(),
            });
        }
        Ok(PatchState::Expected)
    }

    /// Verify, confirm, write and re-verify
    ///
    /// `confirm` runs only when the range holds the expected bytes; returning
    /// `Ok(false)` aborts with [`PatchOutcome::Declined`].
    ///
    /// ## Errors
    ///
    /// - `MemoryNotExpected`: unknown bytes at the address (nothing written)
    /// - `MemoryNotPatched`: the read-back after writing differs from the patch
    /// - any error from the memory backend or from `confirm`
    pub fn apply<M, F>(&self, memory: &mut M, confirm: F) -> PatchResult<PatchOutcome>
    where
        M: TaskMemory + ?Sized,
        F: FnOnce(&Patch) -> PatchResult<bool>,
    {
        match self.inspect(memory)? {
            PatchState::AlreadyPatched => {
                info!(address = %self.address, "memory already patched");
                return Ok(PatchOutcome::AlreadyPatched);
            }
            PatchState::Expected => {}
        }

        if !confirm(self)? {
            info!(address = %self.address, "patch declined");
            return Ok(PatchOutcome::Declined);
        }

        let range = self.range();
        memory.set_protection(range, Protection::ALL)?;
        memory.write_range(range, &self.patched)?;

        let written = memory.read_bytes(range)?;
        if written != self.patched.as_slice() {
            warn!(address = %self.address, "read-back differs from patch");
            return Err(PatchError::MemoryNotPatched(HexBytes::new(written)));
        }

        info!(address = %self.address, from = %self.expected, to = %self.patched, "memory patched");
        Ok(PatchOutcome::Patched)
    }
}

/// One-shot form of [`Patch::apply`] over raw byte slices
pub fn patch<M, F>(memory: &mut M, expected: &[u8], patched: &[u8], address: Address, confirm: F) -> PatchResult<PatchOutcome>
where
    M: TaskMemory + ?Sized,
    F: FnOnce(&Patch) -> PatchResult<bool>,
{
    Patch::new(address, expected, patched)?.apply(memory, confirm)
}

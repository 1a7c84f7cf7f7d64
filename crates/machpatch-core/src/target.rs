//! # Target Process
//!
//! An opened process: its PID, the resolved main image and a handle on its memory.
//!
//! [`TargetProcess::open`] is the platform entry point (like opening a file):
//! it resolves the operator's [`ProcessTarget`], obtains the task port and
//! finds the image base and ASLR slide. Offsets handed to the read and patch
//! helpers are relative to the image base.

use tracing::{debug, info};

use crate::error::PatchResult;
use crate::image::{locate_main_image, MainImage};
use crate::memory::TaskMemory;
use crate::patch::Patch;
use crate::process::resolve_target;
use crate::types::{Address, AddressRange, HexBytes, ProcessId, ProcessTarget};

/// A process whose memory is open for reading and patching
pub struct TargetProcess
{
    pid: ProcessId,
    image: MainImage,
    memory: Box<dyn TaskMemory>,
}

impl std::fmt::Debug for TargetProcess
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("TargetProcess")
            .field("pid", &self.pid)
            .field("image", &self.image)
            .finish_non_exhaustive()
    }
}

impl TargetProcess
{
    /// Wrap an already opened memory handle, locating the main image in it
    pub fn new(pid: ProcessId, memory: Box<dyn TaskMemory>) -> PatchResult<Self>
    {
        let image = locate_main_image(memory.as_ref())?;
        Ok(Self { pid, image, memory })
    }

    /// Open the process named by `target`
    ///
    /// ## Errors
    ///
    /// - `ProcessNameNotFound`: no process has that name
    /// - anything [`TargetProcess::attach`] reports
    pub fn open(target: &ProcessTarget) -> PatchResult<Self>
    {
        let pid = resolve_target(target)?;
        info!(%pid, %target, "opening process");
        Self::attach(pid)
    }

    /// Obtain the task port of `pid` and locate its main image
    ///
    /// ## Platform Support
    ///
    /// - macOS: `task_for_pid()` through [`crate::platform::macos::MachTask`]
    /// - elsewhere: always `Unsupported`
    ///
    /// ## Errors
    ///
    /// - `PermissionDenied` / `MachError`: the kernel refused the task port
    /// - `ProcessNotFound`: the PID does not exist
    /// - `ImageNotFound`: no executable header in the task
    pub fn attach(pid: ProcessId) -> PatchResult<Self>
    {
        #[cfg(target_os = "macos")]
        {
            let task = crate::platform::macos::MachTask::for_pid(pid)?;
            Self::new(pid, Box::new(task))
        }

        #[cfg(not(target_os = "macos"))]
        {
            let _ = pid;
            Err(crate::error::PatchError::Unsupported(std::env::consts::OS))
        }
    }

    pub fn pid(&self) -> ProcessId
    {
        self.pid
    }

    pub fn image(&self) -> &MainImage
    {
        &self.image
    }

    pub fn base_address(&self) -> Address
    {
        self.image.base_address
    }

    pub fn aslr_slide(&self) -> u64
    {
        self.image.aslr_slide
    }

    pub fn memory(&self) -> &dyn TaskMemory
    {
        self.memory.as_ref()
    }

    pub fn memory_mut(&mut self) -> &mut dyn TaskMemory
    {
        self.memory.as_mut()
    }

    /// Read `size` bytes at `base + offset`
    pub fn read_at_offset(&self, offset: u64, size: u64) -> PatchResult<(Address, Vec<u8>)>
    {
        let address = self.image.address_of(offset)?;
        debug!(%address, size, "reading at offset");
        let bytes = self.memory.read_bytes(AddressRange::new(address, size))?;
        Ok((address, bytes))
    }

    /// Build a patch for `base + offset`
    pub fn patch_at_offset(&self, offset: u64, expected: HexBytes, patched: HexBytes) -> PatchResult<Patch>
    {
        Patch::new(self.image.address_of(offset)?, expected, patched)
    }
}

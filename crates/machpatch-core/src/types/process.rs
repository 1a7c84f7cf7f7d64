//! Process and memory region types.

use std::fmt;
use std::str::FromStr;

use super::Address;
use crate::error::PatchError;

/// Process identifier (PID)
///
/// Newtype over the `u32` the kernel hands out, so a PID is never confused
/// with an offset or a size.
///
/// ```rust
/// use machpatch_core::types::ProcessId;
///
/// let pid = ProcessId::from(12345);
/// assert_eq!(u32::from(pid), 12345);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(pub u32);

impl ProcessId
{
    /// PID of the running machpatch process itself
    pub fn current() -> Self
    {
        ProcessId(std::process::id())
    }
}

impl From<u32> for ProcessId
{
    fn from(pid: u32) -> Self
    {
        ProcessId(pid)
    }
}

impl From<ProcessId> for u32
{
    fn from(pid: ProcessId) -> Self
    {
        pid.0
    }
}

impl fmt::Display for ProcessId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// How the operator names the process to open
///
/// - `-` selects the tool's own process (handy for smoke tests)
/// - an all-digit argument is a PID
/// - anything else is a process name, matched case-insensitively
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessTarget
{
    CurrentProcess,
    Pid(ProcessId),
    Name(String),
}

impl FromStr for ProcessTarget
{
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let s = s.trim();
        if s.is_empty() {
            return Err(PatchError::InvalidArgument("no process specified".to_string()));
        }
        if s == "-" {
            return Ok(ProcessTarget::CurrentProcess);
        }
        if s.chars().all(|c| c.is_ascii_digit()) {
            return s
                .parse::<u32>()
                .map(|pid| ProcessTarget::Pid(ProcessId(pid)))
                .map_err(|e| PatchError::InvalidArgument(format!("invalid PID {s}: {e}")));
        }
        Ok(ProcessTarget::Name(s.to_string()))
    }
}

impl fmt::Display for ProcessTarget
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            ProcessTarget::CurrentProcess => write!(f, "current process"),
            ProcessTarget::Pid(pid) => write!(f, "PID {pid}"),
            ProcessTarget::Name(name) => write!(f, "{name}"),
        }
    }
}

/// A process candidate seen while looking a name up
///
/// `start_time` is microseconds since the epoch; lookups use it to pick the
/// oldest instance when several processes share a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry
{
    pub pid: ProcessId,
    pub name: String,
    pub start_time: u64,
}

/// A contiguous mapped region of a task's address space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion
{
    /// Start address (inclusive)
    pub start: Address,

    /// End address (exclusive)
    pub end: Address,

    /// Current protection rendered as `r`, `w`, `x` letters
    pub permissions: String,
}

impl MemoryRegion
{
    pub fn new(start: Address, end: Address, permissions: String) -> Self
    {
        Self {
            start,
            end,
            permissions,
        }
    }

    /// Size of the region in bytes; zero when `end <= start`
    pub fn size(&self) -> u64
    {
        self.end.value().saturating_sub(self.start.value())
    }

    pub fn is_readable(&self) -> bool
    {
        self.permissions.contains('r')
    }

    pub fn is_writable(&self) -> bool
    {
        self.permissions.contains('w')
    }

    pub fn is_executable(&self) -> bool
    {
        self.permissions.contains('x')
    }

    pub fn contains(&self, address: Address) -> bool
    {
        address >= self.start && address < self.end
    }
}

//! # Types
//!
//! Platform-agnostic types shared by the patching logic and the macOS backend:
//! addresses, byte patterns, process identifiers and memory regions.

pub mod address;
pub mod bytes;
pub mod process;

// Re-export all public types
pub use address::{Address, AddressRange};
pub use bytes::{format_hexdump, hex_string, HexBytes};
pub use process::{MemoryRegion, ProcessEntry, ProcessId, ProcessTarget};

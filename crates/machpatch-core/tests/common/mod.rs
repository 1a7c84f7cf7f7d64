//! In-memory task used by the integration tests
//!
//! [`FakeMemory`] behaves like a task port over a handful of regions: reads
//! need `r`, writes need `w`, and protection changes are recorded. Clones
//! share state, so a test can hand one clone to a `TargetProcess` and inspect
//! the other.

#![allow(dead_code)]

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use machpatch_core::error::{PatchError, PatchResult};
use machpatch_core::memory::{Protection, TaskMemory};
use machpatch_core::types::{Address, AddressRange, MemoryRegion};

pub const MH_MAGIC_64: u32 = 0xfeed_facf;
pub const MH_EXECUTE: u32 = 0x2;
pub const MH_DYLIB: u32 = 0x6;
pub const LC_SEGMENT_64: u32 = 0x19;
pub const CPU_TYPE_X86_64: u32 = 0x0100_0007;

/// Link-time `__TEXT` vmaddr of the synthetic executables
pub const TEXT_VMADDR: u64 = 0x1_0000_0000;
/// Size of the synthetic executable's `__TEXT` region
pub const IMAGE_SIZE: usize = 0x4000;

/// A 72-byte `LC_SEGMENT_64` without sections
pub fn segment_command(name: &str, vmaddr: u64, vmsize: u64) -> Vec<u8>
{
    let mut out = Vec::with_capacity(72);
    out.extend_from_slice(&LC_SEGMENT_64.to_le_bytes());
    out.extend_from_slice(&72u32.to_le_bytes());
    let mut segname = [0u8; 16];
    segname[..name.len()].copy_from_slice(name.as_bytes());
    out.extend_from_slice(&segname);
    out.extend_from_slice(&vmaddr.to_le_bytes());
    out.extend_from_slice(&vmsize.to_le_bytes());
    // fileoff, filesize
    out.extend_from_slice(&0u64.to_le_bytes());
    out.extend_from_slice(&0u64.to_le_bytes());
    // maxprot, initprot, nsects, flags
    out.extend_from_slice(&[0u8; 16]);
    out
}

/// Mach-O header plus `__PAGEZERO` and `__TEXT`, padded to [`IMAGE_SIZE`]
pub fn macho_image(filetype: u32) -> Vec<u8>
{
    let commands = [
        segment_command("__PAGEZERO", 0, TEXT_VMADDR),
        segment_command("__TEXT", TEXT_VMADDR, IMAGE_SIZE as u64),
    ]
    .concat();

    let mut out = Vec::with_capacity(IMAGE_SIZE);
    for word in [MH_MAGIC_64, CPU_TYPE_X86_64, 3, filetype, 2, commands.len() as u32, 0, 0] {
        out.extend_from_slice(&word.to_le_bytes());
    }
    out.extend_from_slice(&commands);
    out.resize(IMAGE_SIZE, 0xCC);
    out
}

#[derive(Debug, Clone)]
pub struct FakeRegion
{
    pub start: Address,
    pub bytes: Vec<u8>,
    pub protection: Protection,
}

impl FakeRegion
{
    fn end(&self) -> u64
    {
        self.start.value() + self.bytes.len() as u64
    }

    fn covers(&self, range: AddressRange) -> bool
    {
        range.start.value() >= self.start.value() && range.end().value() <= self.end()
    }

    fn overlaps(&self, range: AddressRange) -> bool
    {
        range.start.value() < self.end() && range.end().value() > self.start.value()
    }
}

#[derive(Debug, Default)]
pub struct FakeState
{
    pub regions: Vec<FakeRegion>,
    pub protection_changes: Vec<(AddressRange, Protection)>,
    pub writes: Vec<(Address, Vec<u8>)>,
    /// Accept writes but keep the old bytes, like a copy-on-write page gone wrong
    pub ignore_writes: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FakeMemory
{
    state: Rc<RefCell<FakeState>>,
}

impl FakeMemory
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn with_region(self, start: u64, bytes: Vec<u8>, protection: Protection) -> Self
    {
        self.state.borrow_mut().regions.push(FakeRegion {
            start: Address::new(start),
            bytes,
            protection,
        });
        self
    }

    pub fn state(&self) -> Ref<'_, FakeState>
    {
        self.state.borrow()
    }

    pub fn set_ignore_writes(&self, ignore: bool)
    {
        self.state.borrow_mut().ignore_writes = ignore;
    }

    /// Bytes at `address` regardless of protection
    pub fn peek(&self, address: u64, len: usize) -> Vec<u8>
    {
        let state = self.state.borrow();
        let region = state
            .regions
            .iter()
            .find(|region| region.covers(AddressRange::new(Address::new(address), len as u64)))
            .expect("peek outside fake regions");
        let offset = (address - region.start.value()) as usize;
        region.bytes[offset..offset + len].to_vec()
    }
}

impl TaskMemory for FakeMemory
{
    fn read_bytes(&self, range: AddressRange) -> PatchResult<Vec<u8>>
    {
        let state = self.state.borrow();
        let region = state
            .regions
            .iter()
            .find(|region| region.covers(range))
            .ok_or_else(|| PatchError::InvalidArgument(format!("{range} is not mapped")))?;
        if !region.protection.contains(Protection::READ) {
            return Err(PatchError::PermissionDenied(format!("{range} is not readable")));
        }
        let offset = (range.start.value() - region.start.value()) as usize;
        Ok(region.bytes[offset..offset + range.size as usize].to_vec())
    }

    fn write_bytes(&mut self, address: Address, bytes: &[u8]) -> PatchResult<()>
    {
        let mut state = self.state.borrow_mut();
        let ignore = state.ignore_writes;
        let range = AddressRange::new(address, bytes.len() as u64);
        let region = state
            .regions
            .iter_mut()
            .find(|region| region.covers(range))
            .ok_or_else(|| PatchError::InvalidArgument(format!("{range} is not mapped")))?;
        if !region.protection.contains(Protection::WRITE) {
            return Err(PatchError::PermissionDenied(format!("{range} is not writable")));
        }
        if !ignore {
            let offset = (address.value() - region.start.value()) as usize;
            region.bytes[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
        state.writes.push((address, bytes.to_vec()));
        Ok(())
    }

    fn set_protection(&mut self, range: AddressRange, protection: Protection) -> PatchResult<()>
    {
        let mut state = self.state.borrow_mut();
        for region in state.regions.iter_mut().filter(|region| region.overlaps(range)) {
            region.protection = protection;
        }
        state.protection_changes.push((range, protection));
        Ok(())
    }

    fn regions(&self) -> PatchResult<Vec<MemoryRegion>>
    {
        let state = self.state.borrow();
        let mut regions: Vec<MemoryRegion> = state
            .regions
            .iter()
            .map(|region| {
                MemoryRegion::new(region.start, Address::new(region.end()), region.protection.to_permissions())
            })
            .collect();
        regions.sort_by_key(|region| region.start);
        Ok(regions)
    }
}

/// A task whose executable slid by `slide` and holds `bytes` at `offset`
///
/// Below the executable sit an unreadable guard region and a readable
/// dylib, both of which the image scan has to skip.
pub fn fake_process(slide: u64, offset: usize, bytes: &[u8]) -> FakeMemory
{
    let mut image = macho_image(MH_EXECUTE);
    image[offset..offset + bytes.len()].copy_from_slice(bytes);

    FakeMemory::new()
        .with_region(0x1000, vec![0u8; 0x1000], Protection::NONE)
        .with_region(0x7000_0000, macho_image(MH_DYLIB), Protection::READ | Protection::EXECUTE)
        .with_region(TEXT_VMADDR + slide, image, Protection::READ | Protection::EXECUTE)
}

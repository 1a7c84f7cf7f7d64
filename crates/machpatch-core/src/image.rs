//! # Main Image Resolution
//!
//! Finds where the target's main executable is mapped and how far ASLR slid it.
//!
//! The main image is the first mapped region that starts with a 64-bit Mach-O
//! header whose file type is `MH_EXECUTE`. Its start is the **base address**;
//! the **ASLR slide** is the distance between that base and the `__TEXT`
//! segment's link-time `vmaddr` (normally `0x100000000`). Static offsets
//! taken from a disassembler are applied to the base address.

use object::macho::{MachHeader64, MH_EXECUTE};
use object::read::macho::{MachHeader, Segment};
use object::Endianness;
use tracing::{debug, trace};

use crate::error::{PatchError, PatchResult};
use crate::memory::TaskMemory;
use crate::types::{Address, AddressRange};

/// Link-time load address of a 64-bit Mach-O executable's `__TEXT` segment
pub const MACHO_BASE_ADDRESS: Address = Address::new(0x1_0000_0000);

/// Size of `struct mach_header_64`
pub const MACH_HEADER_64_SIZE: u64 = 32;

/// Where the main executable lives in the target task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MainImage
{
    /// Runtime address of the Mach-O header
    pub base_address: Address,
    /// Link-time `vmaddr` of `__TEXT`
    pub text_vmaddr: u64,
    /// `base_address - text_vmaddr`
    pub aslr_slide: u64,
}

impl MainImage
{
    /// Runtime address of a static offset from the start of the image
    pub fn address_of(&self, offset: u64) -> PatchResult<Address>
    {
        self.base_address.checked_add(offset).ok_or_else(|| {
            PatchError::InvalidArgument(format!("offset 0x{offset:X} overflows base address {}", self.base_address))
        })
    }
}

fn parse_header(data: &[u8]) -> Option<(&MachHeader64<Endianness>, Endianness)>
{
    let header = MachHeader64::<Endianness>::parse(data, 0).ok()?;
    let endian = header.endian().ok()?;
    Some((header, endian))
}

/// Whether `data` begins with a 64-bit Mach-O header of file type `MH_EXECUTE`
pub fn is_main_executable(data: &[u8]) -> bool
{
    parse_header(data).is_some_and(|(header, endian)| header.filetype(endian) == MH_EXECUTE)
}

/// Total bytes of header plus load commands, read from a header prefix
pub fn header_and_commands_len(data: &[u8]) -> Option<u64>
{
    parse_header(data).map(|(header, endian)| MACH_HEADER_64_SIZE + u64::from(header.sizeofcmds(endian)))
}

/// Link-time `vmaddr` of the `__TEXT` segment
///
/// `data` must hold the Mach-O header followed by all of its load commands.
pub fn text_vmaddr(data: &[u8]) -> PatchResult<u64>
{
    let (header, endian) =
        parse_header(data).ok_or_else(|| PatchError::ImageNotFound("not a 64-bit Mach-O header".to_string()))?;

    let mut commands = header
        .load_commands(endian, data, 0)
        .map_err(|err| PatchError::ImageNotFound(format!("malformed load commands: {err}")))?;

    while let Some(command) = commands
        .next()
        .map_err(|err| PatchError::ImageNotFound(format!("malformed load command: {err}")))?
    {
        let segment = command
            .segment_64()
            .map_err(|err| PatchError::ImageNotFound(format!("malformed segment command: {err}")))?;
        match segment {
            Some((segment, _)) if segment.name() == b"__TEXT" => return Ok(segment.vmaddr(endian)),
            _ => {}
        }
    }

    Err(PatchError::ImageNotFound("no __TEXT segment".to_string()))
}

/// Scan the task's regions for the main executable and compute its slide
///
/// Regions that cannot be read are skipped; the first readable region that
/// starts with an `MH_EXECUTE` header wins.
pub fn locate_main_image<M: TaskMemory + ?Sized>(memory: &M) -> PatchResult<MainImage>
{
    let regions = memory.regions()?;
    debug!(count = regions.len(), "scanning regions for main executable");

    for region in regions.iter().filter(|r| r.is_readable() && r.size() >= MACH_HEADER_64_SIZE) {
        let header = match memory.read_bytes(AddressRange::new(region.start, MACH_HEADER_64_SIZE)) {
            Ok(bytes) => bytes,
            Err(err) => {
                trace!(start = %region.start, error = %err, "skipping unreadable region");
                continue;
            }
        };

        if !is_main_executable(&header) {
            continue;
        }

        let full_len = header_and_commands_len(&header)
            .unwrap_or(MACH_HEADER_64_SIZE)
            .min(region.size());
        let image = memory.read_bytes(AddressRange::new(region.start, full_len))?;
        let vmaddr = text_vmaddr(&image)?;

        let aslr_slide = region.start.value().checked_sub(vmaddr).ok_or_else(|| {
            PatchError::ImageNotFound(format!(
                "image at {} is below its __TEXT vmaddr 0x{vmaddr:X}",
                region.start
            ))
        })?;

        debug!(base = %region.start, slide = aslr_slide, "found main executable");
        return Ok(MainImage {
            base_address: region.start,
            text_vmaddr: vmaddr,
            aslr_slide,
        });
    }

    Err(PatchError::ImageNotFound(
        "no MH_EXECUTE header in any readable region".to_string(),
    ))
}

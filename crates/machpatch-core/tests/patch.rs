//! Patch flow against an in-memory task

mod common;

use std::cell::Cell;
use std::io;

use common::{fake_process, FakeMemory, TEXT_VMADDR};
use machpatch_core::error::PatchError;
use machpatch_core::memory::{Protection, TaskMemory};
use machpatch_core::patch::{patch, Patch, PatchOutcome, PatchState};
use machpatch_core::types::{Address, AddressRange, HexBytes, ProcessId};
use machpatch_core::TargetProcess;

const SLIDE: u64 = 0x4_2000;
const OFFSET: u64 = 0x3462;
const EXPECTED: [u8; 5] = [0x85, 0xC0, 0x0F, 0x84, 0xAF];
const PATCHED: [u8; 5] = [0x85, 0xC9, 0x0F, 0x81, 0xAF];

fn patch_address() -> u64
{
    TEXT_VMADDR + SLIDE + OFFSET
}

fn open(memory: &FakeMemory) -> TargetProcess
{
    TargetProcess::new(ProcessId(88), Box::new(memory.clone())).unwrap()
}

fn hex(bytes: &[u8]) -> HexBytes
{
    HexBytes::from(bytes)
}

#[test]
fn test_open_reports_base_and_slide()
{
    let memory = fake_process(SLIDE, OFFSET as usize, &EXPECTED);
    let process = open(&memory);

    assert_eq!(process.pid(), ProcessId(88));
    assert_eq!(process.base_address(), Address::new(TEXT_VMADDR + SLIDE));
    assert_eq!(process.aslr_slide(), SLIDE);
    assert_eq!(process.image().text_vmaddr, TEXT_VMADDR);
}

#[test]
fn test_read_at_offset()
{
    let memory = fake_process(SLIDE, OFFSET as usize, &EXPECTED);
    let process = open(&memory);

    let (address, bytes) = process.read_at_offset(OFFSET, 5).unwrap();
    assert_eq!(address, Address::new(patch_address()));
    assert_eq!(bytes, EXPECTED);
}

#[test]
fn test_read_past_image_fails()
{
    let memory = fake_process(SLIDE, OFFSET as usize, &EXPECTED);
    let process = open(&memory);

    assert!(process.read_at_offset(0x3ffe, 4).is_err());
}

#[test]
fn test_patch_expected_memory()
{
    let memory = fake_process(SLIDE, OFFSET as usize, &EXPECTED);
    let mut process = open(&memory);
    let patch = process.patch_at_offset(OFFSET, hex(&EXPECTED), hex(&PATCHED)).unwrap();
    assert_eq!(patch.address(), Address::new(patch_address()));

    let asked = Cell::new(false);
    let outcome = patch
        .apply(process.memory_mut(), |pending| {
            assert_eq!(pending.expected().as_slice(), EXPECTED);
            asked.set(true);
            Ok(true)
        })
        .unwrap();

    assert_eq!(outcome, PatchOutcome::Patched);
    assert!(asked.get());
    assert_eq!(memory.peek(patch_address(), 5), PATCHED);

    let state = memory.state();
    assert_eq!(
        state.protection_changes,
        vec![(AddressRange::new(Address::new(patch_address()), 5), Protection::ALL)]
    );
    assert_eq!(state.writes, vec![(Address::new(patch_address()), PATCHED.to_vec())]);
}

#[test]
fn test_patch_is_idempotent()
{
    let memory = fake_process(SLIDE, OFFSET as usize, &EXPECTED);
    let mut process = open(&memory);
    let patch = process.patch_at_offset(OFFSET, hex(&EXPECTED), hex(&PATCHED)).unwrap();

    assert_eq!(patch.apply(process.memory_mut(), |_| Ok(true)).unwrap(), PatchOutcome::Patched);
    let second = patch
        .apply(process.memory_mut(), |_| panic!("must not ask when already patched"))
        .unwrap();

    assert_eq!(second, PatchOutcome::AlreadyPatched);
    assert_eq!(memory.state().writes.len(), 1);
}

#[test]
fn test_already_patched_leaves_memory_alone()
{
    let memory = fake_process(SLIDE, OFFSET as usize, &PATCHED);
    let mut process = open(&memory);
    let patch = process.patch_at_offset(OFFSET, hex(&EXPECTED), hex(&PATCHED)).unwrap();

    assert_eq!(patch.inspect(process.memory()).unwrap(), PatchState::AlreadyPatched);
    let outcome = patch.apply(process.memory_mut(), |_| panic!("must not ask")).unwrap();

    assert_eq!(outcome, PatchOutcome::AlreadyPatched);
    assert!(memory.state().writes.is_empty());
    assert!(memory.state().protection_changes.is_empty());
}

#[test]
fn test_unexpected_memory_is_rejected()
{
    let other = [0x90, 0x90, 0x90, 0x90, 0x90];
    let memory = fake_process(SLIDE, OFFSET as usize, &other);
    let mut process = open(&memory);
    let patch = process.patch_at_offset(OFFSET, hex(&EXPECTED), hex(&PATCHED)).unwrap();

    let err = patch.apply(process.memory_mut(), |_| panic!("must not ask")).unwrap_err();

    match err {
        PatchError::MemoryNotExpected { found, expected } => {
            assert_eq!(found.as_slice(), other);
            assert_eq!(expected.as_slice(), EXPECTED);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(memory.peek(patch_address(), 5), other);
    assert!(memory.state().protection_changes.is_empty());
}

#[test]
fn test_declined_patch_leaves_memory_alone()
{
    let memory = fake_process(SLIDE, OFFSET as usize, &EXPECTED);
    let mut process = open(&memory);
    let patch = process.patch_at_offset(OFFSET, hex(&EXPECTED), hex(&PATCHED)).unwrap();

    let outcome = patch.apply(process.memory_mut(), |_| Ok(false)).unwrap();

    assert_eq!(outcome, PatchOutcome::Declined);
    assert_eq!(memory.peek(patch_address(), 5), EXPECTED);
    assert!(memory.state().writes.is_empty());
    assert!(memory.state().protection_changes.is_empty());
}

#[test]
fn test_confirmation_error_propagates()
{
    let memory = fake_process(SLIDE, OFFSET as usize, &EXPECTED);
    let mut process = open(&memory);
    let patch = process.patch_at_offset(OFFSET, hex(&EXPECTED), hex(&PATCHED)).unwrap();

    let err = patch
        .apply(process.memory_mut(), |_| {
            Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed").into())
        })
        .unwrap_err();

    assert!(matches!(err, PatchError::Io(_)));
    assert!(memory.state().writes.is_empty());
}

#[test]
fn test_failed_verification()
{
    let memory = fake_process(SLIDE, OFFSET as usize, &EXPECTED);
    memory.set_ignore_writes(true);
    let mut process = open(&memory);
    let patch = process.patch_at_offset(OFFSET, hex(&EXPECTED), hex(&PATCHED)).unwrap();

    let err = patch.apply(process.memory_mut(), |_| Ok(true)).unwrap_err();

    match err {
        PatchError::MemoryNotPatched(found) => assert_eq!(found.as_slice(), EXPECTED),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_write_needs_raised_protection()
{
    let mut memory = fake_process(SLIDE, OFFSET as usize, &EXPECTED);

    let err = memory.write_bytes(Address::new(patch_address()), &PATCHED).unwrap_err();
    assert!(err.is_access_denied());
}

#[test]
fn test_size_mismatch()
{
    let memory = fake_process(SLIDE, OFFSET as usize, &EXPECTED);
    let process = open(&memory);

    let err = process
        .patch_at_offset(OFFSET, hex(&EXPECTED), hex(&PATCHED[..4]))
        .unwrap_err();
    assert!(matches!(err, PatchError::SizeMismatch { expected: 5, patched: 4 }));
}

#[test]
fn test_patch_from_hex_strings()
{
    let patch = Patch::from_hex(Address::new(0x1000), "0x85 C0 0F 84 AF", "85c90f81af").unwrap();
    assert_eq!(patch.expected().as_slice(), EXPECTED);
    assert_eq!(patch.patched().as_slice(), PATCHED);
    assert_eq!(patch.range(), AddressRange::new(Address::new(0x1000), 5));

    assert!(matches!(
        Patch::from_hex(Address::new(0x1000), "85C", "85C9"),
        Err(PatchError::InvalidHexString(_))
    ));
}

#[test]
fn test_patch_with_raw_slices()
{
    let mut memory = fake_process(SLIDE, OFFSET as usize, &EXPECTED);

    let outcome = patch(&mut memory, &EXPECTED, &PATCHED, Address::new(patch_address()), |_| Ok(true)).unwrap();

    assert_eq!(outcome, PatchOutcome::Patched);
    assert_eq!(memory.peek(patch_address(), 5), PATCHED);
}

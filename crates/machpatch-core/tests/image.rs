//! Main image discovery over in-memory tasks

mod common;

use common::{fake_process, macho_image, FakeMemory, MH_DYLIB, MH_EXECUTE, TEXT_VMADDR};
use machpatch_core::error::PatchError;
use machpatch_core::image::{locate_main_image, MACHO_BASE_ADDRESS};
use machpatch_core::memory::Protection;
use machpatch_core::types::{Address, ProcessId};
use machpatch_core::TargetProcess;

#[test]
fn test_unslid_image()
{
    let memory = fake_process(0, 0x100, &[0xAA]);
    let image = locate_main_image(&memory).unwrap();

    assert_eq!(image.base_address, MACHO_BASE_ADDRESS);
    assert_eq!(image.aslr_slide, 0);
}

#[test]
fn test_first_executable_wins()
{
    let memory = FakeMemory::new()
        .with_region(TEXT_VMADDR + 0x8000, macho_image(MH_EXECUTE), Protection::READ)
        .with_region(TEXT_VMADDR + 0x20_0000, macho_image(MH_EXECUTE), Protection::READ);

    let image = locate_main_image(&memory).unwrap();
    assert_eq!(image.base_address, Address::new(TEXT_VMADDR + 0x8000));
    assert_eq!(image.aslr_slide, 0x8000);
}

#[test]
fn test_unreadable_executable_is_skipped()
{
    let memory = FakeMemory::new()
        .with_region(TEXT_VMADDR + 0x1000, macho_image(MH_EXECUTE), Protection::NONE)
        .with_region(TEXT_VMADDR + 0x9000, macho_image(MH_EXECUTE), Protection::READ);

    assert_eq!(locate_main_image(&memory).unwrap().aslr_slide, 0x9000);
}

#[test]
fn test_no_executable()
{
    let memory = FakeMemory::new()
        .with_region(0x1000, vec![0u8; 0x1000], Protection::READ)
        .with_region(0x7000_0000, macho_image(MH_DYLIB), Protection::READ);

    assert!(matches!(locate_main_image(&memory), Err(PatchError::ImageNotFound(_))));
    assert!(matches!(
        TargetProcess::new(ProcessId(1), Box::new(memory)),
        Err(PatchError::ImageNotFound(_))
    ));
}

#[test]
fn test_image_below_text_vmaddr()
{
    let memory = FakeMemory::new().with_region(0x4000, macho_image(MH_EXECUTE), Protection::READ);

    assert!(matches!(locate_main_image(&memory), Err(PatchError::ImageNotFound(_))));
}

#[test]
fn test_empty_task()
{
    assert!(matches!(locate_main_image(&FakeMemory::new()), Err(PatchError::ImageNotFound(_))));
}

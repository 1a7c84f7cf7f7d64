//! Build script for machpatch-core
//!
//! Checks system requirements before compilation:
//! - Minimum Rust version (Edition 2021 = Rust 1.56.0+)
//! - macOS version when building for macOS
//!
//! ## Requirements
//!
//! - **Rust**: Edition 2021 (Rust 1.56.0 or newer)
//! - **macOS**: 10.9+ for Intel, 11.0+ for Apple Silicon
//! - **Other platforms**: build, but cannot open live processes

fn main()
{
    println!("cargo:rerun-if-changed=build.rs");

    match (rustc_version::version(), rustc_version::Version::parse("1.56.0")) {
        (Ok(found), Ok(minimum)) => {
            if found < minimum {
                panic!("machpatch-core requires Rust {minimum} or newer (Edition 2021), found {found}");
            }
        }
        // Some build environments hide the compiler version
        _ => println!("cargo:warning=could not verify Rust version"),
    }

    println!("cargo:rerun-if-env-changed=CARGO_CFG_TARGET_OS");
    if std::env::var("CARGO_CFG_TARGET_OS").map_or(true, |os| os != "macos") {
        println!("cargo:warning=not building for macOS: opening live processes will report Unsupported");
    }

    #[cfg(target_os = "macos")]
    check_macos_requirements();
}

#[cfg(target_os = "macos")]
fn check_macos_requirements()
{
    // Apple Silicon shipped with Big Sur
    let min_macos_version = if cfg!(target_arch = "aarch64") { (11, 0, 0) } else { (10, 9, 0) };

    match get_macos_version() {
        Some(version) if version < min_macos_version => panic!(
            "machpatch-core requires macOS {}.{}.{} or newer, found {}.{}.{}",
            min_macos_version.0, min_macos_version.1, min_macos_version.2, version.0, version.1, version.2
        ),
        Some(_) => {}
        // Possibly cross-compiling
        None => println!("cargo:warning=could not detect macOS version"),
    }
}

#[cfg(target_os = "macos")]
fn get_macos_version() -> Option<(u32, u32, u32)>
{
    use std::process::Command;

    let output = Command::new("sw_vers").arg("-productVersion").output().ok()?;
    let version_str = String::from_utf8(output.stdout).ok()?;

    // e.g. "14.2.1" or "11.0"
    let mut parts = version_str.trim().split('.');
    let major = parts.next()?.parse::<u32>().ok()?;
    let minor = parts.next()?.parse::<u32>().ok()?;
    let patch = parts.next().and_then(|s| s.parse::<u32>().ok()).unwrap_or(0);

    Some((major, minor, patch))
}

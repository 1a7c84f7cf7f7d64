use std::io::{self, Write};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use machpatch_core::error::{PatchError, PatchResult};
use machpatch_core::patch::PatchOutcome;
use machpatch_core::process::ensure_root;
use machpatch_core::types::{format_hexdump, hex_string};
use machpatch_core::{Address, HexBytes, Patch, ProcessTarget, TargetProcess, TaskMemory};
use machpatch_utils::logging::format_from_env;
use machpatch_utils::{confirm, debug, error, init_logging, init_logging_with_level, LogLevel};

/// Bytes per row in verbose hex dumps
const HEXDUMP_WIDTH: usize = 16;

/// Largest `read --size`; the whole buffer is allocated before reading
const MAX_READ_SIZE: u64 = 1 << 20;

const SIP_HINT: &str = "Memory not accessible probably due to System Integrity Protection.";

/// Inspect and patch the memory of a running macOS process.
#[derive(Parser, Debug)]
#[command(name = "machpatch")]
#[command(version)]
#[command(about = "Inspect and patch the memory of a running macOS process", long_about = None)]
struct Cli
{
    /// Debug logging and hex dumps
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Show the PID, ASLR slide and base address of a process
    Info
    {
        /// PID, process name, or `-` for this process
        process: ProcessTarget,
    },
    /// Read memory at an offset from the image base
    Read
    {
        /// PID, process name, or `-` for this process
        process: ProcessTarget,
        /// Offset from the image base (hex, e.g. 0x3462)
        #[arg(short, long)]
        offset: Address,
        /// Number of bytes to read (at most 1 MiB)
        #[arg(short = 'z', long, value_parser = clap::value_parser!(u64).range(1..=MAX_READ_SIZE))]
        size: u64,
    },
    /// Replace bytes at an offset from the image base, after checking them
    Patch
    {
        /// PID, process name, or `-` for this process
        process: ProcessTarget,
        /// Offset from the image base (hex, e.g. 0x3462)
        #[arg(short, long)]
        address: Address,
        /// Bytes expected at the address (hex, e.g. 85C00F84AF)
        #[arg(short, long)]
        expected: HexBytes,
        /// Bytes to write (hex, same length as --expected)
        #[arg(short, long)]
        patched: HexBytes,
        /// Do not ask for confirmation
        #[arg(short, long, default_value_t = false)]
        yes: bool,
    },
}

fn main() -> ExitCode
{
    let cli = Cli::parse();

    // Held until main returns so the log file gets flushed
    let logging = if cli.verbose {
        format_from_env().and_then(|format| init_logging_with_level(LogLevel::Debug, format))
    } else {
        init_logging()
    };
    let _guard = match logging {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = run_command(&cli);
    if let Err(e) = &result {
        error!(error = %e, "command failed");
        // Nothing left to report to if stderr is gone
        let _ = report_error(e, &mut io::stderr());
    }
    ExitCode::from(exit_status(&result))
}

/// 0 for success, including "already patched" and a declined prompt; 1 for any error
fn exit_status(result: &PatchResult<()>) -> u8
{
    u8::from(result.is_err())
}

/// Print `error`, plus the System Integrity Protection hint after any Mach failure
fn report_error<W: Write>(error: &PatchError, out: &mut W) -> io::Result<()>
{
    writeln!(out, "{error}")?;
    if error.is_mach_failure() {
        writeln!(out, "{SIP_HINT}")?;
    }
    Ok(())
}

fn run_command(cli: &Cli) -> PatchResult<()>
{
    ensure_root()?;

    match &cli.command {
        Commands::Info { process } => {
            open_process(process)?;
            Ok(())
        }
        Commands::Read { process, offset, size } => {
            let process = open_process(process)?;
            let (address, bytes) = process.read_at_offset(offset.value(), *size)?;
            println!("Memory at {address}: {}", hex_string(&bytes));
            if cli.verbose {
                print!("{}", format_hexdump(address, &bytes, HEXDUMP_WIDTH));
            }
            Ok(())
        }
        Commands::Patch {
            process,
            address,
            expected,
            patched,
            yes,
        } => {
            let mut process = open_process(process)?;
            let patch = process.patch_at_offset(address.value(), expected.clone(), patched.clone())?;
            println!("Patch Address: {}", patch.address());

            run_patch(process.memory_mut(), &patch, &mut io::stdout(), || {
                if *yes {
                    return Ok(true);
                }
                Ok(confirm("Continue patching?")?)
            })
        }
    }
}

/// Apply `patch` and print the status lines for its outcome to `out`
///
/// `ask` runs only once the expected bytes have been found.
fn run_patch<M, W, F>(memory: &mut M, patch: &Patch, out: &mut W, ask: F) -> PatchResult<()>
where
    M: TaskMemory + ?Sized,
    W: Write,
    F: FnOnce() -> PatchResult<bool>,
{
    let outcome = patch.apply(memory, |pending| {
        writeln!(out, "Correct process version!")?;
        writeln!(out, "Patch: {} -> {}", pending.expected(), pending.patched())?;
        out.flush()?;
        ask()
    });

    match outcome {
        Ok(PatchOutcome::Patched) => writeln!(out, "Patch successful!")?,
        Ok(PatchOutcome::AlreadyPatched) => writeln!(out, "Already patched!")?,
        Ok(PatchOutcome::Declined) => writeln!(out, "Not patching.")?,
        Err(PatchError::MemoryNotExpected { found, expected }) => {
            writeln!(out, "Memory: {found} vs. {expected}")?;
            writeln!(out, "Incorrect version of process or ASLR offset")?;
            return Err(PatchError::MemoryNotExpected { found, expected });
        }
        Err(PatchError::MemoryNotPatched(found)) => {
            writeln!(out, "Not patched")?;
            return Err(PatchError::MemoryNotPatched(found));
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

/// Open `target` and print where its image lives
fn open_process(target: &ProcessTarget) -> PatchResult<TargetProcess>
{
    let process = TargetProcess::open(target)?;
    debug!(?process, "opened target");

    println!("PID: {}", process.pid());
    println!("ASLR Offset: 0x{:X}", process.aslr_slide());
    println!("Base Address: {}", process.base_address());
    Ok(process)
}

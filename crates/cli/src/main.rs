//! ZPU S-record runner.
//!
//! This binary is the command-line front end of the harness. It performs:
//! 1. **Argument parsing:** `[-d] [-t [clks]] <file>.s19`, plus `-?` for usage.
//! 2. **Setup:** Opens the image, installs the log subscriber and builds the machine with
//!    the built-in platform layout.
//! 3. **Run:** Loads the image, executes it and turns the outcome into the exit status.
//!
//! UART output goes to stdout; usage, trap reports, register dumps and logs go to stderr.

use std::ffi::OsString;
use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use tracing_subscriber::EnvFilter;

use runzpu_core::{Config, FetchCore, Machine};

/// Exit status for a missing input file.
const EXIT_NO_FILE: i32 = -1;

/// Exit status for bad arguments, unreadable files and failed loads.
const EXIT_FAILURE: i32 = 1;

#[derive(Parser, Debug)]
#[command(
    name = "runzpu",
    about = "Load a Motorola S19 image into the ZPU harness and run it",
    disable_help_flag = true,
    disable_version_flag = true,
    args_override_self = true
)]
struct Cli {
    /// Dump registers at entry and statistics at exit; raise the log level to debug.
    #[arg(short = 'd')]
    debug: bool,

    /// Trace each step; `clks` bounds the number of traced steps (0 or absent: all).
    #[arg(
        short = 't',
        value_name = "clks",
        num_args = 0..=1,
        default_missing_value = "0"
    )]
    trace: Option<String>,

    /// Print usage and exit.
    #[arg(short = '?')]
    usage: bool,

    /// S-record image to load.
    file: Option<PathBuf>,
}

/// Parses leading decimal digits, saturating on overflow. `None` if `text` is not digit-led.
fn parse_clocks(text: &str) -> Option<u64> {
    if !text.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    Some(
        text.bytes()
            .take_while(u8::is_ascii_digit)
            .fold(0u64, |acc, d| {
                acc.saturating_mul(10).saturating_add(u64::from(d - b'0'))
            }),
    )
}

fn usage(exec: &str) -> String {
    format!("Usage: {exec} [-d] [-t [clks]] <somefile>.s19")
}

fn exec_name(args: &[OsString]) -> String {
    args.first()
        .map(Path::new)
        .and_then(Path::file_name)
        .map_or_else(|| "runzpu".into(), |n| n.to_string_lossy().into_owned())
}

/// The argv token an unknown option came from, so `-dx` is reported whole.
fn offending_token(args: &[OsString], reported: &str) -> String {
    let name = reported.trim_start_matches('-');
    for arg in args.iter().skip(1) {
        let arg = arg.to_string_lossy();
        if arg
            .strip_prefix('-')
            .is_some_and(|flags| !flags.is_empty() && flags.contains(name))
        {
            return arg.into_owned();
        }
    }
    reported.to_owned()
}

/// Writes one diagnostic line; a failing stream has nowhere else to report to.
fn report(err: &mut dyn Write, msg: impl Display) {
    let _ = writeln!(err, "{msg}");
}

fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "warn" }));
    // A subscriber may already be installed when `run` is called more than once.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Runs the harness for `args` (program name first) and returns the exit status.
fn run(args: &[OsString], err: &mut dyn Write) -> i32 {
    let exec = exec_name(args);

    let mut cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            if e.kind() == ErrorKind::UnknownArgument {
                if let Some(ContextValue::String(arg)) = e.get(ContextKind::InvalidArg) {
                    report(err, format_args!("Invalid: option '{}'", offending_token(args, arg)));
                }
            } else {
                report(err, e.kind().as_str().unwrap_or("invalid arguments"));
            }
            report(err, usage(&exec));
            return EXIT_FAILURE;
        }
    };

    if cli.usage {
        report(err, usage(&exec));
        return 0;
    }

    // `-t` followed by the file name: the name was taken as the optional count.
    let clocks = match cli.trace.take() {
        None => None,
        Some(value) => match parse_clocks(&value) {
            Some(n) => Some(n),
            None if cli.file.is_none() => {
                cli.file = Some(PathBuf::from(value));
                Some(0)
            }
            None => Some(0),
        },
    };

    let Some(path) = cli.file else {
        report(err, usage(&exec));
        return EXIT_NO_FILE;
    };

    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) => {
            report(err, format_args!("cannot open '{}': {e}", path.display()));
            return EXIT_FAILURE;
        }
    };

    init_logging(cli.debug);

    let config = Config::default();
    let core = FetchCore::new(config.memory.stack_top());
    let mut machine = match Machine::new(
        &config,
        core,
        Box::new(io::stdout()),
        Box::new(io::stderr()),
    ) {
        Ok(m) => m,
        Err(e) => {
            report(err, format_args!("setup failed: {e}"));
            return EXIT_FAILURE;
        }
    };

    if let Err(e) = machine.load(BufReader::new(file)) {
        report(err, format_args!("{}: load failed: {e}", path.display()));
        return EXIT_FAILURE;
    }

    if cli.debug {
        machine.dump_state();
    }
    let outcome = machine.run(clocks);
    if cli.debug {
        machine.print_stats();
    }
    outcome.exit_code()
}

fn main() {
    let args: Vec<OsString> = std::env::args_os().collect();
    let code = run(&args, &mut io::stderr());
    process::exit(code);
}

//! Entry point for the `scenelink` binary.
//!
//! All behaviour lives in [`scenelink_cli::run`]; this wrapper only supplies
//! the process arguments and the standard error stream.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stderr = io::stderr();
    scenelink_cli::run(std::env::args_os(), &mut stderr)
}

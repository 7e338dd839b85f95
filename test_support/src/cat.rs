//! Copies a file to standard output.

use std::{fs, io::Write};

use clap::Parser;
use clirunner::{
    exceptions::{FileError, ShowError},
    exit, stdio,
};

use crate::parse_args;

/// Print a file.
#[derive(Debug, Parser)]
#[command(name = "cat")]
pub struct Cat {
    /// File to print.
    pub file: String,
}

/// `cat FILE` copies the file's bytes to standard output.
///
/// A missing file is reported as a [`FileError`] and exits with status 2.
///
/// # Errors
///
/// Propagates write failures.
pub fn cat() -> std::io::Result<()> {
    let cli: Cat = parse_args();
    match fs::read(&cli.file) {
        Ok(bytes) => stdio::stdout().write_all(&bytes),
        Err(err) => {
            FileError::from_io(&cli.file, &err).show()?;
            exit(2)
        }
    }
}

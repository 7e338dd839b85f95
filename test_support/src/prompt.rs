//! Interactive input.

use std::io::{self, Read};

use clirunner::stdio;

use crate::say;

/// Prompts for `foo` and echoes the answer back.
///
/// # Errors
///
/// Fails when standard input is exhausted before a line is read.
pub fn prompt_foo() -> io::Result<()> {
    let value = stdio::prompt("Foo: ")?;
    say(&format!("foo = {value}"))
}

/// Prompts for a line, then reads one more single character.
///
/// # Errors
///
/// Fails when standard input is exhausted.
pub fn prompt_then_getchar() -> io::Result<()> {
    let line = stdio::prompt("Line: ")?;
    let mut byte = [0_u8; 1];
    stdio::stdin().read_exact(&mut byte)?;
    say(&format!("line = {line}, char = {}", char::from(byte[0])))
}

/// Copies standard input to standard output one line at a time.
///
/// # Errors
///
/// Propagates read and write failures.
pub fn echo_lines() -> io::Result<()> {
    for line in stdio::stdin().lines() {
        say(&format!("got: {}", line?))?;
    }
    Ok(())
}

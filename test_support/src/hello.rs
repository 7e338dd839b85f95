//! Greeting programs.

use clap::Parser;
use clirunner::stdio;

use crate::{parse_args, say};

/// Says hello.
#[derive(Debug, Parser)]
#[command(name = "hello")]
pub struct Hello {
    /// Who to greet.
    #[arg(short, long)]
    pub name: Option<String>,
}

/// `hello [--name NAME]` prints `Hello NAME!`, defaulting to `World`.
///
/// # Errors
///
/// Propagates write failures.
pub fn hello() -> std::io::Result<()> {
    let cli: Hello = parse_args();
    let name = cli.name.as_deref().unwrap_or("World");
    say(&format!("Hello {name}!"))
}

/// Prints the greeting in capitals when `SHOUT=1`.
///
/// # Errors
///
/// Propagates write failures.
pub fn hello_env() -> std::io::Result<()> {
    let shout = std::env::var("SHOUT").is_ok_and(|value| value == "1");
    say(if shout { "HELLO WORLD!" } else { "Hello World!" })
}

/// Writes `hello world` and then exits with `value`.
///
/// # Errors
///
/// Propagates write failures.
pub fn hello_then_exit<V: Into<clirunner::ExitValue>>(value: V) -> std::io::Result<()> {
    say("hello world")?;
    clirunner::exit(value)
}

/// Alternates writes between standard output and standard error.
///
/// # Errors
///
/// Propagates write failures.
pub fn interleaved() -> std::io::Result<()> {
    use std::io::Write;
    write!(stdio::stdout(), "1")?;
    write!(stdio::stderr(), "2")?;
    write!(stdio::stdout(), "3")?;
    write!(stdio::stderr(), "4")
}

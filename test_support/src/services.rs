//! A program with subcommands.

use std::io::Write;

use clap::{CommandFactory, Parser, Subcommand};
use clirunner::stdio;

use crate::{parse_args, say};

/// Manage services.
#[derive(Debug, Parser)]
#[command(name = "services")]
pub struct Services {
    /// Action to perform.
    #[command(subcommand)]
    pub command: Option<Action>,
}

/// Service actions.
#[derive(Debug, Subcommand)]
pub enum Action {
    /// Create a service.
    New {
        /// Service name.
        #[arg(long)]
        name: String,
        /// Comma separated dimensions, such as `2048, 512`.
        #[arg(long, value_parser = parse_dims)]
        dims: Option<Dims>,
    },
    /// Remove a service.
    Remove {
        /// Service name.
        #[arg(long)]
        name: String,
    },
}

/// Parsed `--dims` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dims(pub Vec<u32>);

fn parse_dims(raw: &str) -> Result<Dims, String> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<u32>()
                .map_err(|err| format!("invalid dimension {part:?}: {err}"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Dims)
}

/// Runs the selected action. Without one, prints help and returns 1.
///
/// # Errors
///
/// Propagates write failures.
pub fn services() -> std::io::Result<i32> {
    let cli: Services = parse_args();
    match cli.command {
        Some(Action::New { name, dims }) => {
            say(&format!("Creating service: {name}"))?;
            if let Some(Dims(values)) = dims {
                say(&format!("Dimensions: {values:?}"))?;
            }
            Ok(0)
        }
        Some(Action::Remove { name }) => {
            say(&format!("Removing service: {name}"))?;
            Ok(0)
        }
        None => {
            let help = Services::command().render_help().to_string();
            stdio::stdout().write_all(help.as_bytes())?;
            Ok(1)
        }
    }
}

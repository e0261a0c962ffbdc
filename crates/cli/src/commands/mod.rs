//! Command parsing and wiring
//!
//! Argument handling is deliberately thin: one subcommand per remote
//! operation, `--input`, `--output-dir`, and the two operation flags. The
//! interesting work lives in the core runners; this module builds the
//! client/store/sink graph and hands rows to them.

mod run;

use std::path::PathBuf;

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Check control numbers for currency.
    CheckNumbers { input: PathBuf, output_dir: PathBuf },
    /// Set institution holdings.
    SetHoldings { input: PathBuf, output_dir: PathBuf },
    /// Unset institution holdings.
    UnsetHoldings { input: PathBuf, output_dir: PathBuf, cascade_delete: bool },
    /// Resolve control numbers by searching on other identifiers.
    Search { input: PathBuf, output_dir: PathBuf, held_by_first: bool },
}

pub use run::execute;

const USAGE: &str = "\
Usage: bibsync <command> --input <file.csv> [--output-dir <dir>] [options]

Commands:
  check-numbers    Check each record's control number for currency
  set-holdings     Set the institution holding on each record
  unset-holdings   Unset the institution holding on each record
                   (--cascade-delete also removes dependent local records)
  search           Find each record's control number by identifier search
                   (--held-by-first filters to records held by your
                   institution)

Credentials and endpoints are read from .env; see the repository README.";

/// Parse the command line into a [`Command`].
///
/// Returns the usage text on any error; the caller prints it and exits.
pub fn parse(args: &[String]) -> Result<Command, String> {
    let mut args = args.iter().map(String::as_str);
    let name = args.next().ok_or(USAGE)?;

    let mut input: Option<PathBuf> = None;
    let mut output_dir = PathBuf::from("outputs");
    let mut cascade_delete = false;
    let mut held_by_first = false;

    while let Some(arg) = args.next() {
        match arg {
            "--input" => {
                let value = args.next().ok_or("--input requires a file path")?;
                input = Some(PathBuf::from(value));
            }
            "--output-dir" => {
                let value = args.next().ok_or("--output-dir requires a directory path")?;
                output_dir = PathBuf::from(value);
            }
            "--cascade-delete" => cascade_delete = true,
            "--held-by-first" => held_by_first = true,
            other => return Err(format!("unrecognized argument '{other}'\n\n{USAGE}")),
        }
    }

    let input = input.ok_or_else(|| format!("missing required --input\n\n{USAGE}"))?;

    match name {
        "check-numbers" => {
            reject_flags(name, cascade_delete, held_by_first)?;
            Ok(Command::CheckNumbers { input, output_dir })
        }
        "set-holdings" => {
            reject_flags(name, cascade_delete, held_by_first)?;
            Ok(Command::SetHoldings { input, output_dir })
        }
        "unset-holdings" => {
            reject_flags(name, false, held_by_first)?;
            Ok(Command::UnsetHoldings { input, output_dir, cascade_delete })
        }
        "search" => {
            reject_flags(name, cascade_delete, false)?;
            Ok(Command::Search { input, output_dir, held_by_first })
        }
        other => Err(format!("unknown command '{other}'\n\n{USAGE}")),
    }
}

fn reject_flags(name: &str, cascade_delete: bool, held_by_first: bool) -> Result<(), String> {
    if cascade_delete {
        return Err(format!("--cascade-delete does not apply to '{name}'\n\n{USAGE}"));
    }
    if held_by_first {
        return Err(format!("--held-by-first does not apply to '{name}'\n\n{USAGE}"));
    }
    Ok(())
}

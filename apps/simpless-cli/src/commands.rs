//! Line commands and terminal rendering.

use std::fmt::Write as _;
use std::str::FromStr;

use thiserror::Error;

use simpless_core::ProductId;
use simpless_sync::SyncState;

/// Usage text for `help`.
pub const HELP: &str = "\
commands:
  list                 show the current products
  status               show connectivity and last sync
  refresh              fetch again (online) or reload the cache (offline)
  delete <id> [id...]  delete products by id
  delete-all           delete every cached product
  help                 show this text
  quit                 exit";

/// Longest title shown in a product row.
const TITLE_WIDTH: usize = 60;

/// Errors from reading a command line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("unknown command '{0}', type 'help' for a list")]
    UnknownCommand(String),

    #[error("'delete' needs at least one product id")]
    MissingIds,

    #[error("'{0}' is not a product id")]
    InvalidId(String),

    #[error("'{command}' takes no arguments")]
    UnexpectedArgs { command: String },
}

/// One parsed stdin line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Status,
    Refresh,
    Delete(Vec<ProductId>),
    DeleteAll,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = CliError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err(CliError::UnknownCommand(String::new()));
        };
        let name = name.to_lowercase();
        let rest: Vec<&str> = words.collect();

        if name == "delete" || name == "rm" {
            if rest.is_empty() {
                return Err(CliError::MissingIds);
            }
            let ids = rest
                .iter()
                .map(|word| {
                    word.parse::<ProductId>()
                        .map_err(|_| CliError::InvalidId(word.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Command::Delete(ids));
        }

        let command = match name.as_str() {
            "list" | "ls" => Command::List,
            "status" => Command::Status,
            "refresh" => Command::Refresh,
            "delete-all" => Command::DeleteAll,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            _ => return Err(CliError::UnknownCommand(name)),
        };

        if !rest.is_empty() {
            return Err(CliError::UnexpectedArgs { command: name });
        }
        Ok(command)
    }
}

/// Product table, one row per product.
pub fn render_products(state: &SyncState) -> String {
    let mut out = String::new();
    let source = if state.is_offline { "cache" } else { "catalog" };

    let _ = writeln!(out, "{} product(s) from {}", state.products.len(), source);
    for product in &state.products {
        let _ = writeln!(out, "  {:>5}  {}", product.id, truncate(&product.title, TITLE_WIDTH));
    }
    out
}

/// Connectivity, last sync time and last error.
pub fn render_status(state: &SyncState) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "network:     {}",
        if state.is_offline { "offline" } else { "online" }
    );
    let _ = writeln!(out, "products:    {}", state.products.len());
    match state.last_synced_at {
        Some(at) => {
            let _ = writeln!(out, "last sync:   {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
        }
        None => {
            let _ = writeln!(out, "last sync:   never");
        }
    }
    if let Some(error) = &state.last_error {
        let _ = writeln!(out, "last error:  {error}");
    }
    out
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use simpless_core::Product;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!("list".parse(), Ok(Command::List));
        assert_eq!("  STATUS ".parse(), Ok(Command::Status));
        assert_eq!("refresh".parse(), Ok(Command::Refresh));
        assert_eq!("delete-all".parse(), Ok(Command::DeleteAll));
        assert_eq!("?".parse(), Ok(Command::Help));
        assert_eq!("exit".parse(), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_delete_ids() {
        assert_eq!("delete 3".parse(), Ok(Command::Delete(vec![3])));
        assert_eq!("rm 1 2 7".parse(), Ok(Command::Delete(vec![1, 2, 7])));
        assert_eq!("delete".parse::<Command>(), Err(CliError::MissingIds));
        assert_eq!(
            "delete 1 two".parse::<Command>(),
            Err(CliError::InvalidId("two".into()))
        );
    }

    #[test]
    fn test_parse_rejects_unknown_and_extra_args() {
        assert_eq!(
            "fetch".parse::<Command>(),
            Err(CliError::UnknownCommand("fetch".into()))
        );
        assert_eq!(
            "list everything".parse::<Command>(),
            Err(CliError::UnexpectedArgs {
                command: "list".into()
            })
        );
    }

    #[test]
    fn test_render_products_marks_source() {
        let state = SyncState {
            products: vec![
                Product::new(1, "Backpack", "", ""),
                Product::new(12, "x".repeat(80), "", ""),
            ],
            is_offline: true,
            ..SyncState::default()
        };

        let out = render_products(&state);

        assert!(out.starts_with("2 product(s) from cache"));
        assert!(out.contains("    1  Backpack"));
        assert!(out.contains("...")); // long title truncated
    }

    #[test]
    fn test_render_status() {
        let state = SyncState {
            last_synced_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()),
            last_error: Some("Network error: refused".into()),
            ..SyncState::default()
        };

        let out = render_status(&state);

        assert!(out.contains("network:     online"));
        assert!(out.contains("2024-05-01 12:30:00 UTC"));
        assert!(out.contains("last error:  Network error: refused"));
        assert!(render_status(&SyncState::default()).contains("never"));
    }
}

//! Command-line and environment configuration

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::adapters::postgres::IsolationLevel;

/// Library circulation: books, members, loans and reservations
#[derive(Debug, Parser)]
#[command(name = "library", version)]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreConfig,

    #[command(subcommand)]
    pub command: Command,
}

/// Which backend holds the library data
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// PostgreSQL through sqlx
    Postgres,
    /// Process-local store, discarded on exit
    Memory,
}

#[derive(Debug, Clone, Args)]
pub struct StoreConfig {
    /// Storage backend
    #[arg(long, env = "LIBRARY_STORE", value_enum, default_value_t = StoreKind::Postgres, global = true)]
    pub store: StoreKind,

    /// PostgreSQL connection URL
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost/library",
        global = true
    )]
    pub database_url: String,

    /// Transaction isolation level (serializable, repeatable-read)
    #[arg(long, env = "LIBRARY_ISOLATION", default_value = "serializable", global = true)]
    pub isolation: IsolationLevel,

    /// Connection pool size
    #[arg(long, env = "MAX_CONNECTIONS", default_value_t = 5, global = true)]
    pub max_connections: u32,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Execute a transaction script, one transaction per line
    Run {
        /// Script file; standard input when omitted
        script: Option<PathBuf>,

        /// Stop at the first failed line
        #[arg(long)]
        stop_on_error: bool,
    },

    /// Serve the HTTP API
    Serve {
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: String,

        #[arg(long, env = "PORT", default_value_t = 3000)]
        port: u16,
    },

    /// Apply database migrations
    Migrate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_memory_store() {
        let cli = Cli::try_parse_from([
            "library",
            "run",
            "--store",
            "memory",
            "--stop-on-error",
            "script.txt",
        ])
        .unwrap();

        assert_eq!(cli.store.store, StoreKind::Memory);
        match cli.command {
            Command::Run {
                script,
                stop_on_error,
            } => {
                assert_eq!(script, Some(PathBuf::from("script.txt")));
                assert!(stop_on_error);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_isolation_level() {
        let cli = Cli::try_parse_from(["library", "--isolation", "repeatable-read", "migrate"])
            .unwrap();
        assert_eq!(cli.store.isolation, IsolationLevel::RepeatableRead);
    }

    #[test]
    fn test_rejects_read_committed_isolation() {
        let result = Cli::try_parse_from(["library", "--isolation", "read-committed", "migrate"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unknown_isolation_level() {
        let result = Cli::try_parse_from(["library", "--isolation", "chaos", "migrate"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

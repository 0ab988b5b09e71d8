mod rows;
mod session;

use crate::ports::{Library, Result, Session};
use async_trait::async_trait;
use sqlx::PgPool;
use std::str::FromStr;

pub use session::PostgresSession;

/// Isolation level requested at the start of every transaction
///
/// Only levels that keep a rule operation's checks and writes on one snapshot
/// are accepted. READ COMMITTED (also the server default) is rejected because
/// two concurrent loans for one member could both pass the limit check.
/// REPEATABLE READ is snapshot isolation and still admits that write skew, so
/// SERIALIZABLE is the level that keeps the loan limit under concurrency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    #[default]
    Serializable,
    RepeatableRead,
}

impl IsolationLevel {
    fn set_statement(&self) -> &'static str {
        match self {
            IsolationLevel::Serializable => "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE",
            IsolationLevel::RepeatableRead => "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ",
        }
    }
}

impl FromStr for IsolationLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "serializable" => Ok(IsolationLevel::Serializable),
            "repeatable-read" | "repeatable_read" => Ok(IsolationLevel::RepeatableRead),
            "read-committed" | "read_committed" | "read-uncommitted" | "read_uncommitted"
            | "default" => Err(format!(
                "isolation level {} is too weak, use serializable or repeatable-read",
                s
            )),
            _ => Err(format!("Invalid isolation level: {}", s)),
        }
    }
}

/// PostgreSQL implementation of the library ports
///
/// Every session is one database transaction. The configured isolation level is
/// set as the first statement so that all checks and writes of a rule operation
/// see one consistent snapshot.
#[derive(Debug, Clone)]
pub struct PostgresLibrary {
    pool: PgPool,
    isolation: IsolationLevel,
}

impl PostgresLibrary {
    /// Create a new library with a PostgreSQL connection pool
    pub fn new(pool: PgPool, isolation: IsolationLevel) -> Self {
        Self { pool, isolation }
    }
}

#[async_trait]
impl Library for PostgresLibrary {
    async fn begin(&self) -> Result<Box<dyn Session>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(self.isolation.set_statement())
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PostgresSession::new(tx)))
    }
}

/// Apply the schema migrations under `migrations/`
pub async fn run_migrations(pool: &PgPool) -> std::result::Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_level_from_str() {
        assert_eq!(
            "serializable".parse::<IsolationLevel>(),
            Ok(IsolationLevel::Serializable)
        );
        assert_eq!(
            "Repeatable-Read".parse::<IsolationLevel>(),
            Ok(IsolationLevel::RepeatableRead)
        );
        assert!("snapshot".parse::<IsolationLevel>().is_err());
    }

    #[test]
    fn test_weaker_isolation_levels_are_rejected() {
        for level in ["read-committed", "READ_COMMITTED", "read-uncommitted", "default"] {
            let err = level.parse::<IsolationLevel>().unwrap_err();
            assert!(err.contains("too weak"), "{}: {}", level, err);
        }
    }

    #[test]
    fn test_every_level_issues_a_set_statement() {
        assert!(
            IsolationLevel::Serializable
                .set_statement()
                .ends_with("SERIALIZABLE")
        );
        assert!(
            IsolationLevel::RepeatableRead
                .set_statement()
                .ends_with("REPEATABLE READ")
        );
    }
}

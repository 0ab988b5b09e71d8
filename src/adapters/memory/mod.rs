mod session;

use crate::domain::{Book, BookId, Loan, Member, MemberId, Reservation};
use crate::ports::{Library, Result, Session};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

pub use session::InMemorySession;

/// Constraint violations reported by the in-memory store
///
/// Mirrors the unique and foreign-key constraints of the PostgreSQL schema.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryStoreError {
    #[error("duplicate key {key} in {table}")]
    DuplicateKey { table: &'static str, key: String },

    #[error("row {key} not found in {table}")]
    MissingRow { table: &'static str, key: String },

    #[error("{table}.{column} references missing row {key}")]
    ForeignKey {
        table: &'static str,
        column: &'static str,
        key: String,
    },
}

/// Committed contents of the in-memory library
///
/// Loans and reservations keep insertion order, which breaks ties between equal timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryState {
    pub(crate) books: BTreeMap<BookId, Book>,
    pub(crate) members: BTreeMap<MemberId, Member>,
    pub(crate) loans: Vec<Loan>,
    pub(crate) reservations: Vec<Reservation>,
}

impl LibraryState {
    pub fn books(&self) -> impl Iterator<Item = &Book> {
        self.books.values()
    }

    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    pub fn loans(&self) -> &[Loan] {
        &self.loans
    }

    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }
}

/// In-memory implementation of the library ports
///
/// Transactions are serialised by an owned async mutex. Each session works on a
/// private copy of the state which replaces the committed state on commit and is
/// dropped on rollback.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLibrary {
    state: Arc<Mutex<LibraryState>>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the committed state
    pub async fn snapshot(&self) -> LibraryState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl Library for InMemoryLibrary {
    async fn begin(&self) -> Result<Box<dyn Session>> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(InMemorySession::new(guard)))
    }
}

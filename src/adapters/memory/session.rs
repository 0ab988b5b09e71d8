use crate::domain::{
    Book, BookId, Loan, LoanId, Member, MemberId, Reservation, ReservationId,
};
use crate::ports::{BookStore, LoanStore, MemberStore, ReservationStore, Result, Session};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::OwnedMutexGuard;

use super::{LibraryState, MemoryStoreError};

/// One open in-memory transaction
pub struct InMemorySession {
    committed: OwnedMutexGuard<LibraryState>,
    working: LibraryState,
}

impl InMemorySession {
    pub(super) fn new(committed: OwnedMutexGuard<LibraryState>) -> Self {
        let working = committed.clone();
        Self { committed, working }
    }
}

fn sorted_by_loan_date(mut loans: Vec<Loan>) -> Vec<Loan> {
    // stable: insertion order is kept for equal loan dates
    loans.sort_by_key(|l| l.loaned_at);
    loans
}

fn sorted_by_reservation_time(mut reservations: Vec<Reservation>) -> Vec<Reservation> {
    reservations.sort_by_key(|r| r.reserved_at);
    reservations
}

#[async_trait]
impl BookStore for InMemorySession {
    async fn get_book(&mut self, book_id: &BookId) -> Result<Option<Book>> {
        Ok(self.working.books.get(book_id).cloned())
    }

    async fn list_books(&mut self) -> Result<Vec<Book>> {
        Ok(self.working.books.values().cloned().collect())
    }

    async fn find_books_by_title(&mut self, fragment: &str) -> Result<Vec<Book>> {
        Ok(self
            .working
            .books
            .values()
            .filter(|b| b.title_contains(fragment))
            .cloned()
            .collect())
    }

    async fn insert_book(&mut self, book: &Book) -> Result<()> {
        if self.working.books.contains_key(&book.book_id) {
            return Err(Box::new(MemoryStoreError::DuplicateKey {
                table: "books",
                key: book.book_id.to_string(),
            }));
        }
        self.working.books.insert(book.book_id.clone(), book.clone());
        Ok(())
    }

    async fn delete_book(&mut self, book_id: &BookId) -> Result<()> {
        if let Some(r) = self.working.reservations.iter().find(|r| &r.book_id == book_id) {
            return Err(Box::new(MemoryStoreError::ForeignKey {
                table: "reservations",
                column: "book_id",
                key: r.reservation_id.to_string(),
            }));
        }
        self.working.books.remove(book_id);
        Ok(())
    }
}

#[async_trait]
impl MemberStore for InMemorySession {
    async fn get_member(&mut self, member_id: &MemberId) -> Result<Option<Member>> {
        Ok(self.working.members.get(member_id).cloned())
    }

    async fn list_members(&mut self) -> Result<Vec<Member>> {
        Ok(self.working.members.values().cloned().collect())
    }

    async fn insert_member(&mut self, member: &Member) -> Result<()> {
        if self.working.members.contains_key(&member.member_id) {
            return Err(Box::new(MemoryStoreError::DuplicateKey {
                table: "members",
                key: member.member_id.to_string(),
            }));
        }
        self.working
            .members
            .insert(member.member_id.clone(), member.clone());
        Ok(())
    }

    async fn delete_member(&mut self, member_id: &MemberId) -> Result<()> {
        if let Some(r) = self
            .working
            .reservations
            .iter()
            .find(|r| &r.member_id == member_id)
        {
            return Err(Box::new(MemoryStoreError::ForeignKey {
                table: "reservations",
                column: "member_id",
                key: r.reservation_id.to_string(),
            }));
        }
        self.working.members.remove(member_id);
        Ok(())
    }
}

#[async_trait]
impl LoanStore for InMemorySession {
    async fn get_loan(&mut self, loan_id: &LoanId) -> Result<Option<Loan>> {
        Ok(self
            .working
            .loans
            .iter()
            .find(|l| &l.loan_id == loan_id)
            .cloned())
    }

    async fn active_loan_for_book(&mut self, book_id: &BookId) -> Result<Option<Loan>> {
        Ok(self
            .working
            .loans
            .iter()
            .find(|l| &l.book_id == book_id && l.is_active())
            .cloned())
    }

    async fn active_loans_for_member(&mut self, member_id: &MemberId) -> Result<Vec<Loan>> {
        Ok(sorted_by_loan_date(
            self.working
                .loans
                .iter()
                .filter(|l| &l.member_id == member_id && l.is_active())
                .cloned()
                .collect(),
        ))
    }

    async fn loans_for_book(&mut self, book_id: &BookId) -> Result<Vec<Loan>> {
        Ok(sorted_by_loan_date(
            self.working
                .loans
                .iter()
                .filter(|l| &l.book_id == book_id)
                .cloned()
                .collect(),
        ))
    }

    async fn loans_for_member(&mut self, member_id: &MemberId) -> Result<Vec<Loan>> {
        Ok(sorted_by_loan_date(
            self.working
                .loans
                .iter()
                .filter(|l| &l.member_id == member_id)
                .cloned()
                .collect(),
        ))
    }

    async fn loans_since(&mut self, since: DateTime<Utc>) -> Result<Vec<Loan>> {
        Ok(sorted_by_loan_date(
            self.working
                .loans
                .iter()
                .filter(|l| l.loaned_at >= since)
                .cloned()
                .collect(),
        ))
    }

    async fn insert_loan(&mut self, loan: &Loan) -> Result<()> {
        if self.working.loans.iter().any(|l| l.loan_id == loan.loan_id) {
            return Err(Box::new(MemoryStoreError::DuplicateKey {
                table: "loans",
                key: loan.loan_id.to_string(),
            }));
        }
        // partial unique index: one active loan per book
        if loan.is_active()
            && self
                .working
                .loans
                .iter()
                .any(|l| l.book_id == loan.book_id && l.is_active())
        {
            return Err(Box::new(MemoryStoreError::DuplicateKey {
                table: "loans_active_book",
                key: loan.book_id.to_string(),
            }));
        }
        self.working.loans.push(loan.clone());
        Ok(())
    }

    async fn update_loan(&mut self, loan: &Loan) -> Result<()> {
        let existing = self
            .working
            .loans
            .iter_mut()
            .find(|l| l.loan_id == loan.loan_id)
            .ok_or_else(|| MemoryStoreError::MissingRow {
                table: "loans",
                key: loan.loan_id.to_string(),
            })?;
        existing.loaned_at = loan.loaned_at;
        existing.returned_at = loan.returned_at;
        Ok(())
    }
}

#[async_trait]
impl ReservationStore for InMemorySession {
    async fn get_reservation(
        &mut self,
        reservation_id: &ReservationId,
    ) -> Result<Option<Reservation>> {
        Ok(self
            .working
            .reservations
            .iter()
            .find(|r| &r.reservation_id == reservation_id)
            .cloned())
    }

    async fn reservations_for_book(&mut self, book_id: &BookId) -> Result<Vec<Reservation>> {
        Ok(sorted_by_reservation_time(
            self.working
                .reservations
                .iter()
                .filter(|r| &r.book_id == book_id)
                .cloned()
                .collect(),
        ))
    }

    async fn reservations_for_member(
        &mut self,
        member_id: &MemberId,
    ) -> Result<Vec<Reservation>> {
        Ok(sorted_by_reservation_time(
            self.working
                .reservations
                .iter()
                .filter(|r| &r.member_id == member_id)
                .cloned()
                .collect(),
        ))
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<()> {
        let state = &mut self.working;
        if state
            .reservations
            .iter()
            .any(|r| r.reservation_id == reservation.reservation_id)
        {
            return Err(Box::new(MemoryStoreError::DuplicateKey {
                table: "reservations",
                key: reservation.reservation_id.to_string(),
            }));
        }
        if state
            .reservations
            .iter()
            .any(|r| r.book_id == reservation.book_id && r.member_id == reservation.member_id)
        {
            return Err(Box::new(MemoryStoreError::DuplicateKey {
                table: "reservations_book_member",
                key: format!("{}/{}", reservation.book_id, reservation.member_id),
            }));
        }
        if !state.books.contains_key(&reservation.book_id) {
            return Err(Box::new(MemoryStoreError::ForeignKey {
                table: "reservations",
                column: "book_id",
                key: reservation.book_id.to_string(),
            }));
        }
        if !state.members.contains_key(&reservation.member_id) {
            return Err(Box::new(MemoryStoreError::ForeignKey {
                table: "reservations",
                column: "member_id",
                key: reservation.member_id.to_string(),
            }));
        }
        state.reservations.push(reservation.clone());
        Ok(())
    }

    async fn delete_reservation(&mut self, reservation_id: &ReservationId) -> Result<()> {
        self.working
            .reservations
            .retain(|r| &r.reservation_id != reservation_id);
        Ok(())
    }
}

#[async_trait]
impl Session for InMemorySession {
    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemorySession {
            mut committed,
            working,
        } = *self;
        *committed = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::InMemoryLibrary;
    use crate::domain::LoanLimit;
    use crate::ports::Library;
    use chrono::NaiveDate;

    use super::*;

    fn book(id: &str) -> Book {
        Book {
            book_id: BookId::from(id),
            title: format!("Title {}", id),
            author: "Author".to_string(),
            acquired_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_commit_publishes_working_copy() {
        let library = InMemoryLibrary::new();

        let mut session = library.begin().await.unwrap();
        session.insert_book(&book("B1")).await.unwrap();
        session.commit().await.unwrap();

        let snapshot = library.snapshot().await;
        assert_eq!(snapshot.books().count(), 1);
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let library = InMemoryLibrary::new();

        let mut session = library.begin().await.unwrap();
        session.insert_book(&book("B1")).await.unwrap();
        session.rollback().await.unwrap();

        assert_eq!(library.snapshot().await, LibraryState::default());
    }

    #[tokio::test]
    async fn test_dropped_session_rolls_back() {
        let library = InMemoryLibrary::new();

        {
            let mut session = library.begin().await.unwrap();
            session.insert_book(&book("B1")).await.unwrap();
        }

        assert_eq!(library.snapshot().await.books().count(), 0);
    }

    #[tokio::test]
    async fn test_insert_duplicate_book_is_rejected() {
        let library = InMemoryLibrary::new();
        let mut session = library.begin().await.unwrap();

        session.insert_book(&book("B1")).await.unwrap();
        assert!(session.insert_book(&book("B1")).await.is_err());
    }

    #[tokio::test]
    async fn test_reservation_requires_existing_member() {
        let library = InMemoryLibrary::new();
        let mut session = library.begin().await.unwrap();
        session.insert_book(&book("B1")).await.unwrap();

        let reservation = Reservation {
            reservation_id: ReservationId::from("R1"),
            book_id: BookId::from("B1"),
            member_id: MemberId::from("M1"),
            reserved_at: Utc::now(),
        };
        assert!(session.insert_reservation(&reservation).await.is_err());

        session
            .insert_member(&Member {
                member_id: MemberId::from("M1"),
                name: "Alice".to_string(),
                phone: "555".to_string(),
                loan_limit: LoanLimit::new(1).unwrap(),
            })
            .await
            .unwrap();
        assert!(session.insert_reservation(&reservation).await.is_ok());
    }
}

use crate::domain::{
    Book, BookId, Loan, LoanId, Member, MemberId, Reservation, ReservationId,
};
use crate::ports::{BookStore, LoanStore, MemberStore, ReservationStore, Result, Session};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};

use super::rows::{map_row_to_book, map_row_to_loan, map_row_to_member, map_row_to_reservation};

/// One open PostgreSQL transaction
///
/// Dropping the session without commit rolls the transaction back.
pub struct PostgresSession {
    tx: Transaction<'static, Postgres>,
}

impl PostgresSession {
    pub(super) fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl BookStore for PostgresSession {
    async fn get_book(&mut self, book_id: &BookId) -> Result<Option<Book>> {
        let row = sqlx::query(
            r#"
            SELECT book_id, title, author, acquired_on
            FROM books
            WHERE book_id = $1
            "#,
        )
        .bind(book_id.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_book).transpose()
    }

    async fn list_books(&mut self) -> Result<Vec<Book>> {
        let rows = sqlx::query(
            r#"
            SELECT book_id, title, author, acquired_on
            FROM books
            ORDER BY book_id ASC
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(map_row_to_book).collect()
    }

    /// Case-insensitive substring match without LIKE wildcards
    async fn find_books_by_title(&mut self, fragment: &str) -> Result<Vec<Book>> {
        let rows = sqlx::query(
            r#"
            SELECT book_id, title, author, acquired_on
            FROM books
            WHERE POSITION(LOWER($1) IN LOWER(title)) > 0
            ORDER BY title ASC, book_id ASC
            "#,
        )
        .bind(fragment)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(map_row_to_book).collect()
    }

    async fn insert_book(&mut self, book: &Book) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books (book_id, title, author, acquired_on)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(book.book_id.as_str())
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.acquired_on)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_book(&mut self, book_id: &BookId) -> Result<()> {
        sqlx::query("DELETE FROM books WHERE book_id = $1")
            .bind(book_id.as_str())
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl MemberStore for PostgresSession {
    async fn get_member(&mut self, member_id: &MemberId) -> Result<Option<Member>> {
        let row = sqlx::query(
            r#"
            SELECT member_id, name, phone, loan_limit
            FROM members
            WHERE member_id = $1
            "#,
        )
        .bind(member_id.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_member).transpose()
    }

    async fn list_members(&mut self) -> Result<Vec<Member>> {
        let rows = sqlx::query(
            r#"
            SELECT member_id, name, phone, loan_limit
            FROM members
            ORDER BY member_id ASC
            "#,
        )
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(map_row_to_member).collect()
    }

    async fn insert_member(&mut self, member: &Member) -> Result<()> {
        let loan_limit = i32::try_from(member.loan_limit.value())?;

        sqlx::query(
            r#"
            INSERT INTO members (member_id, name, phone, loan_limit)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(member.member_id.as_str())
        .bind(&member.name)
        .bind(&member.phone)
        .bind(loan_limit)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_member(&mut self, member_id: &MemberId) -> Result<()> {
        sqlx::query("DELETE FROM members WHERE member_id = $1")
            .bind(member_id.as_str())
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl LoanStore for PostgresSession {
    async fn get_loan(&mut self, loan_id: &LoanId) -> Result<Option<Loan>> {
        let row = sqlx::query(
            r#"
            SELECT loan_id, book_id, member_id, loaned_at, returned_at
            FROM loans
            WHERE loan_id = $1
            "#,
        )
        .bind(loan_id.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    /// Uses the partial unique index on (book_id) WHERE returned_at IS NULL
    async fn active_loan_for_book(&mut self, book_id: &BookId) -> Result<Option<Loan>> {
        let row = sqlx::query(
            r#"
            SELECT loan_id, book_id, member_id, loaned_at, returned_at
            FROM loans
            WHERE book_id = $1 AND returned_at IS NULL
            "#,
        )
        .bind(book_id.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    async fn active_loans_for_member(&mut self, member_id: &MemberId) -> Result<Vec<Loan>> {
        let rows = sqlx::query(
            r#"
            SELECT loan_id, book_id, member_id, loaned_at, returned_at
            FROM loans
            WHERE member_id = $1 AND returned_at IS NULL
            ORDER BY loaned_at ASC, seq ASC
            "#,
        )
        .bind(member_id.as_str())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(map_row_to_loan).collect()
    }

    async fn loans_for_book(&mut self, book_id: &BookId) -> Result<Vec<Loan>> {
        let rows = sqlx::query(
            r#"
            SELECT loan_id, book_id, member_id, loaned_at, returned_at
            FROM loans
            WHERE book_id = $1
            ORDER BY loaned_at ASC, seq ASC
            "#,
        )
        .bind(book_id.as_str())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(map_row_to_loan).collect()
    }

    async fn loans_for_member(&mut self, member_id: &MemberId) -> Result<Vec<Loan>> {
        let rows = sqlx::query(
            r#"
            SELECT loan_id, book_id, member_id, loaned_at, returned_at
            FROM loans
            WHERE member_id = $1
            ORDER BY loaned_at ASC, seq ASC
            "#,
        )
        .bind(member_id.as_str())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(map_row_to_loan).collect()
    }

    async fn loans_since(&mut self, since: DateTime<Utc>) -> Result<Vec<Loan>> {
        let rows = sqlx::query(
            r#"
            SELECT loan_id, book_id, member_id, loaned_at, returned_at
            FROM loans
            WHERE loaned_at >= $1
            ORDER BY loaned_at ASC, seq ASC
            "#,
        )
        .bind(since)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(map_row_to_loan).collect()
    }

    async fn insert_loan(&mut self, loan: &Loan) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO loans (loan_id, book_id, member_id, loaned_at, returned_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(loan.loan_id.as_str())
        .bind(loan.book_id.as_str())
        .bind(loan.member_id.as_str())
        .bind(loan.loaned_at)
        .bind(loan.returned_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn update_loan(&mut self, loan: &Loan) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET loaned_at = $2, returned_at = $3
            WHERE loan_id = $1
            "#,
        )
        .bind(loan.loan_id.as_str())
        .bind(loan.loaned_at)
        .bind(loan.returned_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(format!("loan {} not found for update", loan.loan_id).into());
        }

        Ok(())
    }
}

#[async_trait]
impl ReservationStore for PostgresSession {
    async fn get_reservation(
        &mut self,
        reservation_id: &ReservationId,
    ) -> Result<Option<Reservation>> {
        let row = sqlx::query(
            r#"
            SELECT reservation_id, book_id, member_id, reserved_at
            FROM reservations
            WHERE reservation_id = $1
            "#,
        )
        .bind(reservation_id.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_reservation).transpose()
    }

    /// Queue order: reservation time, then insertion sequence
    async fn reservations_for_book(&mut self, book_id: &BookId) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(
            r#"
            SELECT reservation_id, book_id, member_id, reserved_at
            FROM reservations
            WHERE book_id = $1
            ORDER BY reserved_at ASC, seq ASC
            "#,
        )
        .bind(book_id.as_str())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(map_row_to_reservation).collect()
    }

    async fn reservations_for_member(
        &mut self,
        member_id: &MemberId,
    ) -> Result<Vec<Reservation>> {
        let rows = sqlx::query(
            r#"
            SELECT reservation_id, book_id, member_id, reserved_at
            FROM reservations
            WHERE member_id = $1
            ORDER BY reserved_at ASC, seq ASC
            "#,
        )
        .bind(member_id.as_str())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(map_row_to_reservation).collect()
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reservations (reservation_id, book_id, member_id, reserved_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(reservation.reservation_id.as_str())
        .bind(reservation.book_id.as_str())
        .bind(reservation.member_id.as_str())
        .bind(reservation.reserved_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_reservation(&mut self, reservation_id: &ReservationId) -> Result<()> {
        sqlx::query("DELETE FROM reservations WHERE reservation_id = $1")
            .bind(reservation_id.as_str())
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl Session for PostgresSession {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

use crate::domain::{
    Book, BookId, Loan, LoanId, LoanLimit, Member, MemberId, Reservation, ReservationId,
};
use crate::ports::Result;
use sqlx::{Row, postgres::PgRow};

/// Convert a `books` row into a Book
pub(super) fn map_row_to_book(row: &PgRow) -> Result<Book> {
    Ok(Book {
        book_id: BookId::new(row.try_get::<String, _>("book_id")?),
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        acquired_on: row.try_get("acquired_on")?,
    })
}

/// Convert a `members` row into a Member
///
/// `loan_limit` is stored as INTEGER and validated on the way out.
pub(super) fn map_row_to_member(row: &PgRow) -> Result<Member> {
    let loan_limit: i32 = row.try_get("loan_limit")?;

    Ok(Member {
        member_id: MemberId::new(row.try_get::<String, _>("member_id")?),
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        loan_limit: LoanLimit::try_from(loan_limit)?,
    })
}

/// Convert a `loans` row into a Loan
pub(super) fn map_row_to_loan(row: &PgRow) -> Result<Loan> {
    Ok(Loan {
        loan_id: LoanId::new(row.try_get::<String, _>("loan_id")?),
        book_id: BookId::new(row.try_get::<String, _>("book_id")?),
        member_id: MemberId::new(row.try_get::<String, _>("member_id")?),
        loaned_at: row.try_get("loaned_at")?,
        returned_at: row.try_get("returned_at")?,
    })
}

/// Convert a `reservations` row into a Reservation
pub(super) fn map_row_to_reservation(row: &PgRow) -> Result<Reservation> {
    Ok(Reservation {
        reservation_id: ReservationId::new(row.try_get::<String, _>("reservation_id")?),
        book_id: BookId::new(row.try_get::<String, _>("book_id")?),
        member_id: MemberId::new(row.try_get::<String, _>("member_id")?),
        reserved_at: row.try_get("reserved_at")?,
    })
}

use crate::domain::{BookId, LoanId, LoanLimit, LoanStateError, MemberId, MemberRef, ReservationId};
use std::fmt;
use thiserror::Error;

/// エラーメッセージに使うエンティティ種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Book,
    Member,
    Loan,
    Reservation,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Book => "book",
            EntityKind::Member => "member",
            EntityKind::Loan => "loan",
            EntityKind::Reservation => "reservation",
        })
    }
}

/// エラー種別（クラス名ではなく、違反したルールの種類）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AlreadyExists,
    NotFound,
    OnLoan,
    Reserved,
    HasActiveLoans,
    HasReservations,
    BookUnavailable,
    BookReserved,
    LoanLimitReached,
    NotOnLoan,
    AlreadyLoanedToSelf,
    DuplicateReservation,
    NotHeadOfQueue,
    Persistence,
}

/// 貸出管理アプリケーション層のエラー
///
/// ルール違反は検出した時点で返され、トランザクション境界で一度だけ捕捉される。
/// メッセージにはID・会員名を含め、そのまま利用者に表示できるようにする。
#[derive(Debug, Error)]
pub enum LibraryError {
    /// 同じIDのエンティティが既に存在する
    #[error("{entity} {id} already exists")]
    AlreadyExists { entity: EntityKind, id: String },

    /// エンティティが存在しない
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: String },

    /// 除籍しようとした書籍が貸出中
    #[error("book {book_id} is on loan to {borrower}")]
    OnLoan { book_id: BookId, borrower: MemberRef },

    /// 除籍しようとした書籍に予約がある
    #[error("book {book_id} is reserved by {requester}")]
    Reserved { book_id: BookId, requester: MemberRef },

    /// 退会しようとした会員が貸出中の書籍を持っている
    #[error("member {member_id} still has {count} active loan(s)")]
    HasActiveLoans { member_id: MemberId, count: usize },

    /// 退会しようとした会員に予約が残っている
    #[error("member {member_id} still has {count} reservation(s)")]
    HasReservations { member_id: MemberId, count: usize },

    /// 書籍が他の会員に貸出中
    #[error("book {book_id} is not available, it is on loan to {borrower}")]
    BookUnavailable { book_id: BookId, borrower: MemberRef },

    /// 書籍に予約があるため新規貸出・延長できない
    #[error("book {book_id} is reserved, next in queue is {next}")]
    BookReserved { book_id: BookId, next: MemberRef },

    /// 貸出上限に達している
    #[error("member {member_id} has reached the loan limit of {limit}")]
    LoanLimitReached { member_id: MemberId, limit: LoanLimit },

    /// 期待した貸出中の貸出が見つからない
    #[error("book {book_id} is not on loan{}", loan_suffix(.loan_id))]
    NotOnLoan {
        book_id: BookId,
        loan_id: Option<LoanId>,
    },

    /// 自分が借りている書籍を予約しようとした
    #[error("member {member_id} already has book {book_id} on loan")]
    AlreadyLoanedToSelf { member_id: MemberId, book_id: BookId },

    /// 同じ会員が同じ書籍を既に予約している
    #[error("member {member_id} already reserved book {book_id} ({existing})")]
    DuplicateReservation {
        member_id: MemberId,
        book_id: BookId,
        existing: ReservationId,
    },

    /// 予約キューの先頭ではない
    #[error("reservation {reservation_id} is not first in queue, {ahead} is ahead")]
    NotHeadOfQueue {
        reservation_id: ReservationId,
        ahead: MemberRef,
    },

    /// ストアのエラー（接続・制約違反・直列化失敗など）
    #[error("persistence error: {0}")]
    Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl LibraryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LibraryError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            LibraryError::NotFound { .. } => ErrorKind::NotFound,
            LibraryError::OnLoan { .. } => ErrorKind::OnLoan,
            LibraryError::Reserved { .. } => ErrorKind::Reserved,
            LibraryError::HasActiveLoans { .. } => ErrorKind::HasActiveLoans,
            LibraryError::HasReservations { .. } => ErrorKind::HasReservations,
            LibraryError::BookUnavailable { .. } => ErrorKind::BookUnavailable,
            LibraryError::BookReserved { .. } => ErrorKind::BookReserved,
            LibraryError::LoanLimitReached { .. } => ErrorKind::LoanLimitReached,
            LibraryError::NotOnLoan { .. } => ErrorKind::NotOnLoan,
            LibraryError::AlreadyLoanedToSelf { .. } => ErrorKind::AlreadyLoanedToSelf,
            LibraryError::DuplicateReservation { .. } => ErrorKind::DuplicateReservation,
            LibraryError::NotHeadOfQueue { .. } => ErrorKind::NotHeadOfQueue,
            LibraryError::Persistence(_) => ErrorKind::Persistence,
        }
    }

    /// ルール違反か（永続化エラー以外）
    pub fn is_rule_violation(&self) -> bool {
        !matches!(self, LibraryError::Persistence(_))
    }

    pub(crate) fn not_found(entity: EntityKind, id: impl fmt::Display) -> Self {
        LibraryError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn already_exists(entity: EntityKind, id: impl fmt::Display) -> Self {
        LibraryError::AlreadyExists {
            entity,
            id: id.to_string(),
        }
    }

    /// ドメイン層の状態遷移エラーを変換する
    pub(crate) fn from_loan_state(err: LoanStateError, book_id: &BookId, loan_id: &LoanId) -> Self {
        match err {
            LoanStateError::AlreadyReturned => LibraryError::NotOnLoan {
                book_id: book_id.clone(),
                loan_id: Some(loan_id.clone()),
            },
        }
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for LibraryError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        LibraryError::Persistence(err)
    }
}

fn loan_suffix(loan_id: &Option<LoanId>) -> String {
    loan_id
        .as_ref()
        .map(|id| format!(" under loan {}", id))
        .unwrap_or_default()
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, LibraryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_identifying_details() {
        let err = LibraryError::BookUnavailable {
            book_id: BookId::from("B1"),
            borrower: MemberRef {
                member_id: MemberId::from("M1"),
                name: Some("Alice".to_string()),
            },
        };
        assert_eq!(
            err.to_string(),
            "book B1 is not available, it is on loan to Alice (M1)"
        );
        assert_eq!(err.kind(), ErrorKind::BookUnavailable);
    }

    #[test]
    fn test_not_on_loan_message() {
        let without = LibraryError::NotOnLoan {
            book_id: BookId::from("B1"),
            loan_id: None,
        };
        assert_eq!(without.to_string(), "book B1 is not on loan");

        let with = LibraryError::NotOnLoan {
            book_id: BookId::from("B1"),
            loan_id: Some(LoanId::from("L1")),
        };
        assert_eq!(with.to_string(), "book B1 is not on loan under loan L1");
    }

    #[test]
    fn test_persistence_is_not_rule_violation() {
        let io = std::io::Error::other("connection reset");
        let err = LibraryError::from(Box::new(io) as Box<dyn std::error::Error + Send + Sync>);
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert!(!err.is_rule_violation());
        assert!(LibraryError::not_found(EntityKind::Book, "B1").is_rule_violation());
    }
}

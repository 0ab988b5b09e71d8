use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BookId, Loan, LoanId, LoanStatus, MemberId, commands::AcquireBook};

/// POST /books のリクエストボディ
///
/// 受入日を省略した場合は当日になる。
#[derive(Debug, Deserialize)]
pub struct AcquireBookRequest {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub acquired_on: Option<NaiveDate>,
}

impl AcquireBookRequest {
    pub fn into_command(self, today: NaiveDate) -> AcquireBook {
        AcquireBook {
            book_id: self.book_id,
            title: self.title,
            author: self.author,
            acquired_on: self.acquired_on.unwrap_or(today),
        }
    }
}

/// GET /books のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct ListBooksQuery {
    /// タイトルの部分一致
    pub title: Option<String>,
}

/// GET /books/:id/loans のクエリパラメータ
#[derive(Debug, Deserialize)]
pub struct LoanHistoryQuery {
    /// active または returned
    pub status: Option<String>,
}

/// 貸出開始時のレスポンス（POST /loans, POST /reservations/:id/use）
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanCreatedResponse {
    pub loan_id: LoanId,
}

/// 貸出レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanResponse {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub member_id: MemberId,
    pub loaned_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: LoanStatus,
}

impl From<Loan> for LoanResponse {
    fn from(loan: Loan) -> Self {
        Self {
            status: loan.status(),
            loan_id: loan.loan_id,
            book_id: loan.book_id,
            member_id: loan.member_id,
            loaned_at: loan.loaned_at,
            returned_at: loan.returned_at,
        }
    }
}

/// エラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

/// ステータスクエリパラメータのパースとバリデーション
pub fn parse_status_filter(status: &str) -> Result<LoanStatus, String> {
    status.parse::<LoanStatus>()
}

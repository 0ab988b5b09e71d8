use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, LoanId, LoanStateError, MemberId};

/// 貸出ステータス
///
/// 保存はしない。`returned_at` の有無から導出される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// 貸出中
    Active,
    /// 返却済み（履歴として残る）
    Returned,
}

impl LoanStatus {
    /// 文字列表現を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Returned => "returned",
        }
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(LoanStatus::Active),
            "returned" => Ok(LoanStatus::Returned),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

/// Loan集約 - 1冊の書籍の1回の貸出
///
/// 返却後も削除されず、貸出履歴として残る。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: LoanId,

    // 他の集約への参照（IDのみ）
    pub book_id: BookId,
    pub member_id: MemberId,

    /// 貸出日。延長すると延長日に進む。
    pub loaned_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl Loan {
    pub fn status(&self) -> LoanStatus {
        match self.returned_at {
            None => LoanStatus::Active,
            Some(_) => LoanStatus::Returned,
        }
    }

    pub fn is_active(&self) -> bool {
        self.returned_at.is_none()
    }
}

/// 純粋関数：書籍を貸し出す
///
/// 新しい貸出IDを採番し、貸出中のLoanを返す。
/// 貸出可否の判定はアプリケーション層の責務。
pub fn start_loan(book_id: BookId, member_id: MemberId, loaned_at: DateTime<Utc>) -> Loan {
    Loan {
        loan_id: LoanId::generate(),
        book_id,
        member_id,
        loaned_at,
        returned_at: None,
    }
}

/// 純粋関数：貸出を延長する
///
/// ビジネスルール：
/// - 延長は「今日から貸し直し」として扱い、貸出日を延長日に置き換える
/// - 返却済みは延長不可
pub fn renew_loan(loan: &Loan, renewed_at: DateTime<Utc>) -> Result<Loan, LoanStateError> {
    if !loan.is_active() {
        return Err(LoanStateError::AlreadyReturned);
    }

    Ok(Loan {
        loaned_at: renewed_at,
        ..loan.clone()
    })
}

/// 純粋関数：書籍を返却する
///
/// 返却日を記録する。以後このLoanは変更されない。
pub fn close_loan(loan: &Loan, returned_at: DateTime<Utc>) -> Result<Loan, LoanStateError> {
    if !loan.is_active() {
        return Err(LoanStateError::AlreadyReturned);
    }

    Ok(Loan {
        returned_at: Some(returned_at),
        ..loan.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_loan(loaned_at: DateTime<Utc>) -> Loan {
        start_loan(BookId::from("B1"), MemberId::from("M1"), loaned_at)
    }

    #[test]
    fn test_start_loan_is_active() {
        let loaned_at = Utc::now();
        let loan = sample_loan(loaned_at);

        assert_eq!(loan.status(), LoanStatus::Active);
        assert_eq!(loan.loaned_at, loaned_at);
        assert_eq!(loan.book_id, BookId::from("B1"));
        assert_eq!(loan.member_id, MemberId::from("M1"));
        assert!(loan.returned_at.is_none());
    }

    #[test]
    fn test_start_loan_generates_distinct_ids() {
        let now = Utc::now();
        assert_ne!(sample_loan(now).loan_id, sample_loan(now).loan_id);
    }

    #[test]
    fn test_renew_loan_moves_loan_date_to_today() {
        let loaned_at = Utc::now();
        let loan = sample_loan(loaned_at);
        let renewed_at = loaned_at + Duration::days(10);

        let renewed = renew_loan(&loan, renewed_at).unwrap();

        assert_eq!(renewed.loan_id, loan.loan_id);
        assert_eq!(renewed.loaned_at, renewed_at);
        assert!(renewed.is_active());
    }

    #[test]
    fn test_renew_loan_fails_when_returned() {
        let loaned_at = Utc::now();
        let loan = sample_loan(loaned_at);
        let returned = close_loan(&loan, loaned_at + Duration::days(3)).unwrap();

        let result = renew_loan(&returned, loaned_at + Duration::days(4));
        assert_eq!(result.unwrap_err(), LoanStateError::AlreadyReturned);
    }

    #[test]
    fn test_close_loan_records_return_date() {
        let loaned_at = Utc::now();
        let loan = sample_loan(loaned_at);
        let returned_at = loaned_at + Duration::days(7);

        let returned = close_loan(&loan, returned_at).unwrap();

        assert_eq!(returned.returned_at, Some(returned_at));
        assert_eq!(returned.status(), LoanStatus::Returned);
        assert_eq!(returned.loaned_at, loaned_at);
    }

    #[test]
    fn test_close_loan_fails_when_already_returned() {
        let loaned_at = Utc::now();
        let loan = sample_loan(loaned_at);
        let returned = close_loan(&loan, loaned_at + Duration::days(1)).unwrap();

        let result = close_loan(&returned, loaned_at + Duration::days(2));
        assert_eq!(result.unwrap_err(), LoanStateError::AlreadyReturned);
    }

    #[test]
    fn test_loan_status_round_trips_through_str() {
        assert_eq!("active".parse::<LoanStatus>(), Ok(LoanStatus::Active));
        assert_eq!(LoanStatus::Returned.as_str(), "returned");
        assert!("overdue".parse::<LoanStatus>().is_err());
    }
}

use crate::domain::{BookId, Loan, LoanId, MemberId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Result;

/// 貸出ストアポート
///
/// 返却済みの貸出も履歴として保持する。削除操作は持たない。
#[async_trait]
pub trait LoanStore: Send {
    /// IDで貸出を取得する（返却済みを含む）
    async fn get_loan(&mut self, loan_id: &LoanId) -> Result<Option<Loan>>;

    /// 書籍の貸出中の貸出を取得する
    ///
    /// 不変条件により高々1件。
    async fn active_loan_for_book(&mut self, book_id: &BookId) -> Result<Option<Loan>>;

    /// 会員の貸出中の貸出を取得する
    ///
    /// 貸出上限の確認に使用される。
    async fn active_loans_for_member(&mut self, member_id: &MemberId) -> Result<Vec<Loan>>;

    /// 書籍の貸出履歴を貸出日の昇順で取得する
    async fn loans_for_book(&mut self, book_id: &BookId) -> Result<Vec<Loan>>;

    /// 会員の貸出履歴を貸出日の昇順で取得する
    async fn loans_for_member(&mut self, member_id: &MemberId) -> Result<Vec<Loan>>;

    /// 指定日時以降に貸出（または延長）された貸出を取得する
    async fn loans_since(&mut self, since: DateTime<Utc>) -> Result<Vec<Loan>>;

    async fn insert_loan(&mut self, loan: &Loan) -> Result<()>;

    /// 貸出日・返却日を更新する
    async fn update_loan(&mut self, loan: &Loan) -> Result<()>;
}

use thiserror::Error;

/// 貸出上限のエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoanLimitError {
    /// 上限は1冊以上でなければならない
    #[error("loan limit must be a positive integer")]
    NotPositive,
}

/// 貸出の状態遷移エラー（延長・返却）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanStateError {
    /// 既に返却済み
    AlreadyReturned,
}

use async_trait::async_trait;

use super::{BookStore, LoanStore, MemberStore, ReservationStore, Result};

/// 1トランザクション分のストア操作
///
/// ルール操作の存在確認・上限確認・キュー先頭確認と書き込みは、
/// すべて同じSessionで実行される。
/// commitもrollbackも呼ばずに破棄した場合はロールバックとして扱われる。
#[async_trait]
pub trait Session: BookStore + MemberStore + LoanStore + ReservationStore + Send {
    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// トランザクションの開始点
///
/// プロセス（またはリクエスト）単位で保持され、明示的に各操作へ渡される。
#[async_trait]
pub trait Library: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Session>>;
}

use crate::domain::{Member, MemberId};
use async_trait::async_trait;

use super::Result;

/// 会員ストアポート
#[async_trait]
pub trait MemberStore: Send {
    /// IDで会員を取得する
    async fn get_member(&mut self, member_id: &MemberId) -> Result<Option<Member>>;

    /// 全会員をID順に取得する
    async fn list_members(&mut self) -> Result<Vec<Member>>;

    async fn insert_member(&mut self, member: &Member) -> Result<()>;

    async fn delete_member(&mut self, member_id: &MemberId) -> Result<()>;
}

use crate::domain::{BookId, MemberId, Reservation, ReservationId};
use async_trait::async_trait;

use super::Result;

/// 予約ストアポート
#[async_trait]
pub trait ReservationStore: Send {
    /// IDで予約を取得する
    async fn get_reservation(
        &mut self,
        reservation_id: &ReservationId,
    ) -> Result<Option<Reservation>>;

    /// 書籍の予約キューを取得する
    ///
    /// 予約日時の昇順、同時刻は登録順。先頭が次に貸出を受ける。
    async fn reservations_for_book(&mut self, book_id: &BookId) -> Result<Vec<Reservation>>;

    /// 会員の予約を予約日時の昇順で取得する
    async fn reservations_for_member(&mut self, member_id: &MemberId)
    -> Result<Vec<Reservation>>;

    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<()>;

    async fn delete_reservation(&mut self, reservation_id: &ReservationId) -> Result<()>;
}

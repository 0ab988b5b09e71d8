use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, MemberId, ReservationId};

/// 予約
///
/// 同じ書籍への予約は予約日時の昇順で並ぶ（先頭が次に貸出を受ける）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub reservation_id: ReservationId,
    pub book_id: BookId,
    pub member_id: MemberId,
    pub reserved_at: DateTime<Utc>,
}

/// 純粋関数：予約を作成する
pub fn place_reservation(
    reservation_id: ReservationId,
    member_id: MemberId,
    book_id: BookId,
    reserved_at: DateTime<Utc>,
) -> Reservation {
    Reservation {
        reservation_id,
        book_id,
        member_id,
        reserved_at,
    }
}

/// 純粋関数：予約キューの先頭
///
/// `queue` はストアから取得した順序（予約日時の昇順）を前提とする。
/// 同時刻の予約は先に登録されたものが前に並ぶ。
pub fn queue_head(queue: &[Reservation]) -> Option<&Reservation> {
    queue.iter().min_by_key(|r| r.reserved_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reservation(id: &str, member: &str, at: DateTime<Utc>) -> Reservation {
        place_reservation(
            ReservationId::from(id),
            MemberId::from(member),
            BookId::from("B1"),
            at,
        )
    }

    #[test]
    fn test_queue_head_is_earliest() {
        let now = Utc::now();
        let queue = vec![
            reservation("R2", "M2", now + Duration::minutes(5)),
            reservation("R1", "M1", now),
            reservation("R3", "M3", now + Duration::minutes(9)),
        ];

        let head = queue_head(&queue).unwrap();
        assert_eq!(head.reservation_id, ReservationId::from("R1"));
    }

    #[test]
    fn test_queue_head_keeps_insertion_order_on_ties() {
        let now = Utc::now();
        let queue = vec![reservation("R1", "M1", now), reservation("R2", "M2", now)];

        assert_eq!(
            queue_head(&queue).unwrap().reservation_id,
            ReservationId::from("R1")
        );
    }

    #[test]
    fn test_queue_head_empty() {
        assert!(queue_head(&[]).is_none());
    }
}

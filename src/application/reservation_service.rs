use chrono::{DateTime, Utc};

use crate::domain::{self, LoanId, commands::*};
use crate::ports::Session;

use super::errors::{EntityKind, LibraryError, Result};
use super::loan_service::ensure_can_lend;
use super::member_service::describe_member;

/// 予約する
///
/// ビジネスルール（この順に確認する）：
/// 1. 同じIDの予約が存在しないこと
/// 2. 会員・書籍が存在すること
/// 3. 書籍が貸出中であること（貸出可能な書籍の取り置きはしない）
/// 4. 会員自身が借りている書籍ではないこと
/// 5. 会員が同じ書籍をまだ予約していないこと
///
/// 予約日時は現在時刻。同じ書籍の予約は予約日時順に並ぶ。
#[tracing::instrument(skip_all, fields(
    reservation_id = %cmd.reservation_id,
    member_id = %cmd.member_id,
    book_id = %cmd.book_id,
))]
pub async fn place_reservation(
    session: &mut dyn Session,
    now: DateTime<Utc>,
    cmd: PlaceReservation,
) -> Result<()> {
    // 1. 予約IDの重複確認
    if session.get_reservation(&cmd.reservation_id).await?.is_some() {
        return Err(LibraryError::already_exists(
            EntityKind::Reservation,
            &cmd.reservation_id,
        ));
    }

    // 2. 会員・書籍の存在確認
    let member = session
        .get_member(&cmd.member_id)
        .await?
        .ok_or_else(|| LibraryError::not_found(EntityKind::Member, &cmd.member_id))?;
    let book = session
        .get_book(&cmd.book_id)
        .await?
        .ok_or_else(|| LibraryError::not_found(EntityKind::Book, &cmd.book_id))?;

    // 3. 貸出中確認
    let current = session
        .active_loan_for_book(&book.book_id)
        .await?
        .ok_or_else(|| LibraryError::NotOnLoan {
            book_id: book.book_id.clone(),
            loan_id: None,
        })?;

    // 4. 自分への貸出確認
    if current.member_id == member.member_id {
        return Err(LibraryError::AlreadyLoanedToSelf {
            member_id: member.member_id,
            book_id: book.book_id,
        });
    }

    // 5. 重複予約確認
    let queue = session.reservations_for_book(&book.book_id).await?;
    if let Some(existing) = queue.iter().find(|r| r.member_id == member.member_id) {
        return Err(LibraryError::DuplicateReservation {
            member_id: member.member_id,
            book_id: book.book_id,
            existing: existing.reservation_id.clone(),
        });
    }

    // 6. 保存
    let reservation =
        domain::reservation::place_reservation(cmd.reservation_id, member.member_id, book.book_id, now);
    session.insert_reservation(&reservation).await?;

    Ok(())
}

/// 予約を使って貸し出す
///
/// ビジネスルール：
/// - 予約・会員・書籍が存在すること
/// - 予約が書籍の予約キューの先頭であること
/// - 書籍が貸出中でないこと
/// - 会員の貸出中の冊数が上限未満であること
///
/// 予約の削除と貸出の作成は同じSessionで行い、一つのトランザクションとして扱う。
///
/// # 戻り値
/// 成功時は作成された貸出のID
#[tracing::instrument(skip_all, fields(reservation_id = %cmd.reservation_id))]
pub async fn use_reservation(
    session: &mut dyn Session,
    now: DateTime<Utc>,
    cmd: UseReservation,
) -> Result<LoanId> {
    // 1. 予約・会員・書籍の解決
    let reservation = session
        .get_reservation(&cmd.reservation_id)
        .await?
        .ok_or_else(|| LibraryError::not_found(EntityKind::Reservation, &cmd.reservation_id))?;
    let member = session
        .get_member(&reservation.member_id)
        .await?
        .ok_or_else(|| LibraryError::not_found(EntityKind::Member, &reservation.member_id))?;
    let book = session
        .get_book(&reservation.book_id)
        .await?
        .ok_or_else(|| LibraryError::not_found(EntityKind::Book, &reservation.book_id))?;

    // 2. キュー先頭確認
    let queue = session.reservations_for_book(&book.book_id).await?;
    let head = domain::reservation::queue_head(&queue)
        .filter(|head| head.reservation_id != reservation.reservation_id);
    if let Some(head) = head {
        let ahead = describe_member(session, &head.member_id).await?;
        return Err(LibraryError::NotHeadOfQueue {
            reservation_id: reservation.reservation_id,
            ahead,
        });
    }

    // 3-4. 貸出中・上限確認
    ensure_can_lend(session, &member, &book).await?;

    // 5. 予約を削除し、貸出を作成
    session
        .delete_reservation(&reservation.reservation_id)
        .await?;
    let loan = domain::loan::start_loan(book.book_id, member.member_id, now);
    session.insert_loan(&loan).await?;

    Ok(loan.loan_id)
}

/// 予約を取り消す
///
/// 予約が存在すること以外の条件はない。
#[tracing::instrument(skip_all, fields(reservation_id = %cmd.reservation_id))]
pub async fn cancel_reservation(session: &mut dyn Session, cmd: CancelReservation) -> Result<()> {
    let reservation = session
        .get_reservation(&cmd.reservation_id)
        .await?
        .ok_or_else(|| LibraryError::not_found(EntityKind::Reservation, &cmd.reservation_id))?;

    session
        .delete_reservation(&reservation.reservation_id)
        .await?;

    Ok(())
}

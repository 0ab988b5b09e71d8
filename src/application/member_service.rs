use crate::domain::{Member, MemberId, MemberRef, commands::*};
use crate::ports::Session;

use super::errors::{EntityKind, LibraryError, Result};

/// エラーメッセージ用に会員を名前付きで参照する
///
/// 会員が見つからない場合はIDのみで表す。
pub(crate) async fn describe_member(
    session: &mut dyn Session,
    member_id: &MemberId,
) -> Result<MemberRef> {
    Ok(session
        .get_member(member_id)
        .await?
        .map(|member| member.to_ref())
        .unwrap_or_else(|| MemberRef::id_only(member_id.clone())))
}

/// 会員を登録する
///
/// ビジネスルール：
/// - 同じIDの会員が存在しないこと
/// - 退会済み会員の貸出履歴が残るIDは再利用しない
#[tracing::instrument(skip_all, fields(member_id = %cmd.member_id))]
pub async fn register_member(session: &mut dyn Session, cmd: RegisterMember) -> Result<()> {
    let taken = session.get_member(&cmd.member_id).await?.is_some()
        || !session.loans_for_member(&cmd.member_id).await?.is_empty();
    if taken {
        return Err(LibraryError::already_exists(
            EntityKind::Member,
            &cmd.member_id,
        ));
    }

    let member = Member {
        member_id: cmd.member_id,
        name: cmd.name,
        phone: cmd.phone,
        loan_limit: cmd.loan_limit,
    };
    session.insert_member(&member).await?;

    Ok(())
}

/// 会員を退会させる
///
/// ビジネスルール：
/// - 会員が存在すること
/// - 貸出中の書籍がないこと
/// - 予約が残っていないこと
#[tracing::instrument(skip_all, fields(member_id = %cmd.member_id))]
pub async fn withdraw_member(session: &mut dyn Session, cmd: WithdrawMember) -> Result<()> {
    let member = session
        .get_member(&cmd.member_id)
        .await?
        .ok_or_else(|| LibraryError::not_found(EntityKind::Member, &cmd.member_id))?;

    let active_loans = session.active_loans_for_member(&member.member_id).await?;
    if !active_loans.is_empty() {
        return Err(LibraryError::HasActiveLoans {
            member_id: member.member_id,
            count: active_loans.len(),
        });
    }

    let reservations = session.reservations_for_member(&member.member_id).await?;
    if !reservations.is_empty() {
        return Err(LibraryError::HasReservations {
            member_id: member.member_id,
            count: reservations.len(),
        });
    }

    session.delete_member(&member.member_id).await?;

    Ok(())
}

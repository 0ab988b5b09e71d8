use chrono::{DateTime, Utc};

use crate::domain::{self, Book, Loan, LoanId, Member, commands::*};
use crate::ports::Session;

use super::errors::{EntityKind, LibraryError, Result};
use super::member_service::describe_member;

/// 会員と書籍を解決し、新規貸出が可能か確認する
///
/// `start_loan` と `use_reservation` で共通の確認：
/// - 書籍が貸出中でないこと
/// - 会員の貸出中の冊数が上限未満であること
pub(super) async fn ensure_can_lend(
    session: &mut dyn Session,
    member: &Member,
    book: &Book,
) -> Result<()> {
    if let Some(current) = session.active_loan_for_book(&book.book_id).await? {
        let borrower = describe_member(session, &current.member_id).await?;
        return Err(LibraryError::BookUnavailable {
            book_id: book.book_id.clone(),
            borrower,
        });
    }

    let active_loans = session.active_loans_for_member(&member.member_id).await?;
    if member.has_reached_limit(active_loans.len()) {
        return Err(LibraryError::LoanLimitReached {
            member_id: member.member_id.clone(),
            limit: member.loan_limit,
        });
    }

    Ok(())
}

/// 貸出を取得し、その書籍の現在の貸出であることを確認する
///
/// 延長・返却で共通の確認：
/// - 貸出・書籍・会員が存在すること
/// - 書籍の貸出中の貸出がこの貸出（同じ会員）であること
async fn load_current_loan(session: &mut dyn Session, loan_id: &LoanId) -> Result<(Loan, Book)> {
    let loan = session
        .get_loan(loan_id)
        .await?
        .ok_or_else(|| LibraryError::not_found(EntityKind::Loan, loan_id))?;

    let book = session
        .get_book(&loan.book_id)
        .await?
        .ok_or_else(|| LibraryError::not_found(EntityKind::Book, &loan.book_id))?;

    session
        .get_member(&loan.member_id)
        .await?
        .ok_or_else(|| LibraryError::not_found(EntityKind::Member, &loan.member_id))?;

    let current = session.active_loan_for_book(&book.book_id).await?;
    let matches = current
        .as_ref()
        .is_some_and(|c| c.loan_id == loan.loan_id && c.member_id == loan.member_id);
    if !matches {
        return Err(LibraryError::NotOnLoan {
            book_id: book.book_id,
            loan_id: Some(loan.loan_id),
        });
    }

    Ok((loan, book))
}

/// 書籍IDから現在の貸出IDを引く
async fn current_loan_id_of(session: &mut dyn Session, book_id: &domain::BookId) -> Result<LoanId> {
    session
        .get_book(book_id)
        .await?
        .ok_or_else(|| LibraryError::not_found(EntityKind::Book, book_id))?;

    session
        .active_loan_for_book(book_id)
        .await?
        .map(|loan| loan.loan_id)
        .ok_or_else(|| LibraryError::NotOnLoan {
            book_id: book_id.clone(),
            loan_id: None,
        })
}

/// 書籍を貸し出す
///
/// ビジネスルール（この順に確認する）：
/// 1. 会員・書籍が存在すること
/// 2. 書籍が貸出中でないこと
/// 3. 会員の貸出中の冊数が上限未満であること
/// 4. 書籍に予約がないこと（予約は常に新規貸出より優先）
///
/// 確認と書き込みは同じSessionで行い、同じ書籍への二重貸出を防ぐ。
///
/// # 戻り値
/// 成功時は作成された貸出のID
#[tracing::instrument(skip_all, fields(member_id = %cmd.member_id, book_id = %cmd.book_id))]
pub async fn start_loan(
    session: &mut dyn Session,
    now: DateTime<Utc>,
    cmd: StartLoan,
) -> Result<LoanId> {
    // 1. 会員・書籍の存在確認
    let member = session
        .get_member(&cmd.member_id)
        .await?
        .ok_or_else(|| LibraryError::not_found(EntityKind::Member, &cmd.member_id))?;
    let book = session
        .get_book(&cmd.book_id)
        .await?
        .ok_or_else(|| LibraryError::not_found(EntityKind::Book, &cmd.book_id))?;

    // 2-3. 貸出中・上限確認
    ensure_can_lend(session, &member, &book).await?;

    // 4. 予約確認
    let queue = session.reservations_for_book(&book.book_id).await?;
    if let Some(head) = domain::reservation::queue_head(&queue) {
        let next = describe_member(session, &head.member_id).await?;
        return Err(LibraryError::BookReserved {
            book_id: book.book_id,
            next,
        });
    }

    // 5. ドメイン層の純粋関数を呼び出し、保存
    let loan = domain::loan::start_loan(book.book_id, member.member_id, now);
    session.insert_loan(&loan).await?;

    Ok(loan.loan_id)
}

/// 貸出を延長する
///
/// ビジネスルール：
/// - 貸出が書籍の現在の貸出であること
/// - 書籍に予約がないこと（予約者に早く回すため延長は不可）
/// - 延長すると貸出日は今日になる
#[tracing::instrument(skip_all, fields(loan_id = %cmd.loan_id))]
pub async fn renew_loan(session: &mut dyn Session, now: DateTime<Utc>, cmd: RenewLoan) -> Result<()> {
    let (loan, book) = load_current_loan(session, &cmd.loan_id).await?;

    let queue = session.reservations_for_book(&book.book_id).await?;
    if let Some(head) = domain::reservation::queue_head(&queue) {
        let next = describe_member(session, &head.member_id).await?;
        return Err(LibraryError::BookReserved {
            book_id: book.book_id,
            next,
        });
    }

    let renewed = domain::loan::renew_loan(&loan, now)
        .map_err(|e| LibraryError::from_loan_state(e, &book.book_id, &loan.loan_id))?;
    session.update_loan(&renewed).await?;

    Ok(())
}

/// 書籍を返却する
///
/// ビジネスルール：
/// - 貸出が書籍の現在の貸出であること
/// - 返却は予約の有無にかかわらず常に受け付ける
/// - 予約の処理は行わない（`use_reservation` で明示的に行う）
#[tracing::instrument(skip_all, fields(loan_id = %cmd.loan_id))]
pub async fn return_loan(session: &mut dyn Session, now: DateTime<Utc>, cmd: ReturnLoan) -> Result<()> {
    let (loan, book) = load_current_loan(session, &cmd.loan_id).await?;

    let returned = domain::loan::close_loan(&loan, now)
        .map_err(|e| LibraryError::from_loan_state(e, &book.book_id, &loan.loan_id))?;
    session.update_loan(&returned).await?;

    Ok(())
}

/// 書籍IDで現在の貸出を延長する
#[tracing::instrument(skip_all, fields(book_id = %cmd.book_id))]
pub async fn renew_book(session: &mut dyn Session, now: DateTime<Utc>, cmd: RenewBook) -> Result<()> {
    let loan_id = current_loan_id_of(session, &cmd.book_id).await?;
    renew_loan(session, now, RenewLoan { loan_id }).await
}

/// 書籍IDで現在の貸出を返却する
#[tracing::instrument(skip_all, fields(book_id = %cmd.book_id))]
pub async fn return_book(session: &mut dyn Session, now: DateTime<Utc>, cmd: ReturnBook) -> Result<()> {
    let loan_id = current_loan_id_of(session, &cmd.book_id).await?;
    return_loan(session, now, ReturnLoan { loan_id }).await
}

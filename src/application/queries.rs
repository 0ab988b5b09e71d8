use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{Book, BookId, Loan, Member, MemberId, Reservation};
use crate::ports::Session;

use super::errors::{EntityKind, LibraryError, Result};
use super::transaction::ServiceDependencies;

/// 書籍の現在の状態（貸出と予約キュー）
#[derive(Debug, Clone, Serialize)]
pub struct BookStatus {
    pub book: Book,
    pub active_loan: Option<Loan>,
    /// 予約日時の昇順
    pub queue: Vec<Reservation>,
}

/// 会員の現在の状態
#[derive(Debug, Clone, Serialize)]
pub struct MemberStatus {
    pub member: Member,
    pub active_loans: Vec<Loan>,
    pub reservations: Vec<Reservation>,
}

/// 読み取り専用のSessionを閉じる
///
/// 何も書き込んでいないため、常にrollbackで終了する。
async fn finish_read<T>(session: Box<dyn Session>, result: Result<T>) -> Result<T> {
    if let Err(e) = session.rollback().await {
        tracing::warn!(error = %e, "failed to close read-only session");
    }
    result
}

pub async fn list_books(deps: &ServiceDependencies) -> Result<Vec<Book>> {
    let mut session = deps.library.begin().await?;
    let result = session.list_books().await.map_err(LibraryError::from);
    finish_read(session, result).await
}

/// タイトルの部分一致で書籍を検索する
pub async fn find_books_by_title(deps: &ServiceDependencies, fragment: &str) -> Result<Vec<Book>> {
    let mut session = deps.library.begin().await?;
    let result = session
        .find_books_by_title(fragment)
        .await
        .map_err(LibraryError::from);
    finish_read(session, result).await
}

pub async fn list_members(deps: &ServiceDependencies) -> Result<Vec<Member>> {
    let mut session = deps.library.begin().await?;
    let result = session.list_members().await.map_err(LibraryError::from);
    finish_read(session, result).await
}

async fn read_book_status(session: &mut dyn Session, book_id: &BookId) -> Result<BookStatus> {
    let book = session
        .get_book(book_id)
        .await?
        .ok_or_else(|| LibraryError::not_found(EntityKind::Book, book_id))?;
    let active_loan = session.active_loan_for_book(book_id).await?;
    let queue = session.reservations_for_book(book_id).await?;

    Ok(BookStatus {
        book,
        active_loan,
        queue,
    })
}

/// 書籍の貸出状況と予約キューを取得する
pub async fn book_status(deps: &ServiceDependencies, book_id: &BookId) -> Result<BookStatus> {
    let mut session = deps.library.begin().await?;
    let result = read_book_status(session.as_mut(), book_id).await;
    finish_read(session, result).await
}

async fn read_member_status(session: &mut dyn Session, member_id: &MemberId) -> Result<MemberStatus> {
    let member = session
        .get_member(member_id)
        .await?
        .ok_or_else(|| LibraryError::not_found(EntityKind::Member, member_id))?;
    let active_loans = session.active_loans_for_member(member_id).await?;
    let reservations = session.reservations_for_member(member_id).await?;

    Ok(MemberStatus {
        member,
        active_loans,
        reservations,
    })
}

/// 会員の貸出中の書籍と予約を取得する
pub async fn member_status(deps: &ServiceDependencies, member_id: &MemberId) -> Result<MemberStatus> {
    let mut session = deps.library.begin().await?;
    let result = read_member_status(session.as_mut(), member_id).await;
    finish_read(session, result).await
}

async fn read_book_history(session: &mut dyn Session, book_id: &BookId) -> Result<Vec<Loan>> {
    session
        .get_book(book_id)
        .await?
        .ok_or_else(|| LibraryError::not_found(EntityKind::Book, book_id))?;
    Ok(session.loans_for_book(book_id).await?)
}

/// 書籍の貸出履歴（返却済みを含む）
///
/// 存在しない書籍はNotFound。
pub async fn loan_history_for_book(deps: &ServiceDependencies, book_id: &BookId) -> Result<Vec<Loan>> {
    let mut session = deps.library.begin().await?;
    let result = read_book_history(session.as_mut(), book_id).await;
    finish_read(session, result).await
}

async fn read_member_history(session: &mut dyn Session, member_id: &MemberId) -> Result<Vec<Loan>> {
    session
        .get_member(member_id)
        .await?
        .ok_or_else(|| LibraryError::not_found(EntityKind::Member, member_id))?;
    Ok(session.loans_for_member(member_id).await?)
}

/// 会員の貸出履歴（返却済みを含む）
pub async fn loan_history_for_member(
    deps: &ServiceDependencies,
    member_id: &MemberId,
) -> Result<Vec<Loan>> {
    let mut session = deps.library.begin().await?;
    let result = read_member_history(session.as_mut(), member_id).await;
    finish_read(session, result).await
}

/// 指定日時以降に貸出・延長された貸出
pub async fn loans_since(deps: &ServiceDependencies, since: DateTime<Utc>) -> Result<Vec<Loan>> {
    let mut session = deps.library.begin().await?;
    let result = session.loans_since(since).await.map_err(LibraryError::from);
    finish_read(session, result).await
}

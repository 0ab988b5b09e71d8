use crate::domain::{Book, commands::*};
use crate::ports::Session;

use super::errors::{EntityKind, LibraryError, Result};
use super::member_service::describe_member;

/// 書籍を受け入れる
///
/// ビジネスルール：
/// - 同じIDの書籍が存在しないこと
/// - 除籍済みの書籍の貸出履歴が残るIDは再利用しない（履歴が新しい書籍に付かないように）
#[tracing::instrument(skip_all, fields(book_id = %cmd.book_id))]
pub async fn acquire_book(session: &mut dyn Session, cmd: AcquireBook) -> Result<()> {
    if session.get_book(&cmd.book_id).await?.is_some() {
        return Err(LibraryError::already_exists(EntityKind::Book, &cmd.book_id));
    }
    if !session.loans_for_book(&cmd.book_id).await?.is_empty() {
        return Err(LibraryError::already_exists(EntityKind::Book, &cmd.book_id));
    }

    let book = Book {
        book_id: cmd.book_id,
        title: cmd.title,
        author: cmd.author,
        acquired_on: cmd.acquired_on,
    };
    session.insert_book(&book).await?;

    Ok(())
}

/// 書籍を除籍する
///
/// ビジネスルール：
/// - 書籍が存在すること
/// - 貸出中でないこと（借りている会員をエラーに含める）
/// - 予約がないこと（先頭の予約者をエラーに含める）
#[tracing::instrument(skip_all, fields(book_id = %cmd.book_id))]
pub async fn dispose_book(session: &mut dyn Session, cmd: DisposeBook) -> Result<()> {
    // 1. 書籍の存在確認
    let book = session
        .get_book(&cmd.book_id)
        .await?
        .ok_or_else(|| LibraryError::not_found(EntityKind::Book, &cmd.book_id))?;

    // 2. 貸出中確認
    if let Some(loan) = session.active_loan_for_book(&book.book_id).await? {
        let borrower = describe_member(session, &loan.member_id).await?;
        return Err(LibraryError::OnLoan {
            book_id: book.book_id,
            borrower,
        });
    }

    // 3. 予約確認
    let queue = session.reservations_for_book(&book.book_id).await?;
    if let Some(first) = crate::domain::reservation::queue_head(&queue) {
        let requester = describe_member(session, &first.member_id).await?;
        return Err(LibraryError::Reserved {
            book_id: book.book_id,
            requester,
        });
    }

    // 4. 削除
    session.delete_book(&book.book_id).await?;

    Ok(())
}

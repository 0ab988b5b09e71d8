use crate::domain::{Book, BookId};
use async_trait::async_trait;

use super::Result;

/// 書籍ストアポート
///
/// 開いているトランザクション内で書籍を読み書きする。
#[async_trait]
pub trait BookStore: Send {
    /// IDで書籍を取得する
    async fn get_book(&mut self, book_id: &BookId) -> Result<Option<Book>>;

    /// 全書籍をID順に取得する
    async fn list_books(&mut self) -> Result<Vec<Book>>;

    /// タイトルの部分一致（大文字小文字を区別しない）で検索する
    async fn find_books_by_title(&mut self, fragment: &str) -> Result<Vec<Book>>;

    async fn insert_book(&mut self, book: &Book) -> Result<()>;

    async fn delete_book(&mut self, book_id: &BookId) -> Result<()>;
}

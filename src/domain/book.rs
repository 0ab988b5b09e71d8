use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::BookId;

/// 蔵書
///
/// 貸出・予約との関係は保存せず、各ストアへの問い合わせで導出する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    /// 受入日
    pub acquired_on: NaiveDate,
}

impl Book {
    /// タイトルに部分一致するか（大文字小文字を区別しない）
    pub fn title_contains(&self, fragment: &str) -> bool {
        self.title
            .to_lowercase()
            .contains(&fragment.to_lowercase())
    }
}

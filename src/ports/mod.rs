pub mod book_store;
pub mod clock;
pub mod loan_store;
pub mod member_store;
pub mod reservation_store;
pub mod session;

pub use book_store::BookStore;
pub use clock::Clock;
pub use loan_store::LoanStore;
pub use member_store::MemberStore;
pub use reservation_store::ReservationStore;
pub use session::{Library, Session};

/// ポート層の Result型
///
/// 永続化の失敗はアプリケーション層で `LibraryError::Persistence` に包まれる。
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

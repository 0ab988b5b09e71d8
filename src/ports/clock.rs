use chrono::{DateTime, Utc};

/// 時計ポート
///
/// 貸出日・返却日・予約日時はすべてサーバ側の現在時刻で決まる。
/// 呼び出し側が日付を渡すことはない。
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::LoanLimitError;

/// 不透明な文字列キーによるID型を定義する
///
/// 書籍・会員・予約のIDは呼び出し側が決め、貸出IDはUUIDで採番する。
/// どのエンティティも同じ表現（文字列）を使う。
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// 書籍ID
    BookId
);

string_id!(
    /// 会員ID
    MemberId
);

string_id!(
    /// 貸出ID - 貸出開始時に採番される
    LoanId
);

string_id!(
    /// 予約ID
    ReservationId
);

impl LoanId {
    /// 新しい貸出IDを採番する（UUID v4）
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// 貸出上限冊数
///
/// 不変条件：1以上。
/// 型システムでこの制約を強制し、0冊の上限を作成できないようにする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct LoanLimit(u32);

impl LoanLimit {
    /// 新規作成
    ///
    /// # エラー
    /// 0の場合は`LoanLimitError::NotPositive`を返す
    pub fn new(value: u32) -> Result<Self, LoanLimitError> {
        if value == 0 {
            return Err(LoanLimitError::NotPositive);
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// 貸出中の冊数が上限に達しているか
    ///
    /// 上限は厳密な天井：`active == limit` の時点で次の貸出は拒否される。
    pub fn is_reached_by(&self, active_loans: usize) -> bool {
        active_loans >= self.0 as usize
    }
}

impl TryFrom<u32> for LoanLimit {
    type Error = LoanLimitError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i32> for LoanLimit {
    type Error = LoanLimitError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        let value = u32::try_from(value).map_err(|_| LoanLimitError::NotPositive)?;
        Self::new(value)
    }
}

impl From<LoanLimit> for u32 {
    fn from(limit: LoanLimit) -> Self {
        limit.0
    }
}

impl fmt::Display for LoanLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loan_limit_rejects_zero() {
        assert_eq!(LoanLimit::new(0), Err(LoanLimitError::NotPositive));
    }

    #[test]
    fn test_loan_limit_rejects_negative_database_value() {
        assert_eq!(LoanLimit::try_from(-3_i32), Err(LoanLimitError::NotPositive));
    }

    #[test]
    fn test_loan_limit_is_hard_ceiling() {
        let limit = LoanLimit::new(2).unwrap();
        assert!(!limit.is_reached_by(0));
        assert!(!limit.is_reached_by(1));
        assert!(limit.is_reached_by(2));
        assert!(limit.is_reached_by(3));
    }

    #[test]
    fn test_loan_limit_deserialize_validates() {
        let ok: LoanLimit = serde_json::from_str("3").unwrap();
        assert_eq!(ok.value(), 3);

        let err = serde_json::from_str::<LoanLimit>("0");
        assert!(err.is_err());
    }

    #[test]
    fn test_loan_id_generate_is_unique() {
        let id1 = LoanId::generate();
        let id2 = LoanId::generate();
        assert_ne!(id1, id2);
        assert!(Uuid::parse_str(id1.as_str()).is_ok());
    }

    #[test]
    fn test_string_id_display_and_serde() {
        let id = BookId::from("B1");
        assert_eq!(id.to_string(), "B1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"B1\"");
    }
}

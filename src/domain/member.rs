use serde::{Deserialize, Serialize};
use std::fmt;

use super::{LoanLimit, MemberId};

/// 会員
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub member_id: MemberId,
    pub name: String,
    pub phone: String,
    pub loan_limit: LoanLimit,
}

impl Member {
    /// 貸出中の冊数が上限に達しているか
    pub fn has_reached_limit(&self, active_loans: usize) -> bool {
        self.loan_limit.is_reached_by(active_loans)
    }

    pub fn to_ref(&self) -> MemberRef {
        MemberRef {
            member_id: self.member_id.clone(),
            name: Some(self.name.clone()),
        }
    }
}

/// エラーメッセージ等で会員を示すための参照
///
/// 会員が既に見つからない場合は名前なしで表示する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRef {
    pub member_id: MemberId,
    pub name: Option<String>,
}

impl MemberRef {
    pub fn id_only(member_id: MemberId) -> Self {
        Self {
            member_id,
            name: None,
        }
    }
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", name, self.member_id),
            None => write!(f, "{}", self.member_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(limit: u32) -> Member {
        Member {
            member_id: MemberId::from("M1"),
            name: "Alice".to_string(),
            phone: "555-0100".to_string(),
            loan_limit: LoanLimit::new(limit).unwrap(),
        }
    }

    #[test]
    fn test_has_reached_limit_at_limit() {
        let m = member(1);
        assert!(!m.has_reached_limit(0));
        assert!(m.has_reached_limit(1));
    }

    #[test]
    fn test_member_ref_display() {
        assert_eq!(member(1).to_ref().to_string(), "Alice (M1)");
        assert_eq!(MemberRef::id_only(MemberId::from("M9")).to_string(), "M9");
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{BookId, LoanId, LoanLimit, MemberId, ReservationId};

/// コマンド：書籍を受け入れる
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquireBook {
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub acquired_on: NaiveDate,
}

/// コマンド：書籍を除籍する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisposeBook {
    pub book_id: BookId,
}

/// コマンド：会員を登録する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterMember {
    pub member_id: MemberId,
    pub name: String,
    pub phone: String,
    pub loan_limit: LoanLimit,
}

/// コマンド：会員を退会させる
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawMember {
    pub member_id: MemberId,
}

/// コマンド：書籍を貸し出す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartLoan {
    pub member_id: MemberId,
    pub book_id: BookId,
}

/// コマンド：貸出を延長する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewLoan {
    pub loan_id: LoanId,
}

/// コマンド：貸出を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnLoan {
    pub loan_id: LoanId,
}

/// コマンド：書籍IDで現在の貸出を延長する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewBook {
    pub book_id: BookId,
}

/// コマンド：書籍IDで現在の貸出を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBook {
    pub book_id: BookId,
}

/// コマンド：予約する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceReservation {
    pub reservation_id: ReservationId,
    pub member_id: MemberId,
    pub book_id: BookId,
}

/// コマンド：予約を使って貸し出す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseReservation {
    pub reservation_id: ReservationId,
}

/// コマンド：予約を取り消す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelReservation {
    pub reservation_id: ReservationId,
}

/// 1トランザクションで実行されるコマンドの統合型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum LibraryCommand {
    AcquireBook(AcquireBook),
    DisposeBook(DisposeBook),
    RegisterMember(RegisterMember),
    WithdrawMember(WithdrawMember),
    StartLoan(StartLoan),
    RenewLoan(RenewLoan),
    ReturnLoan(ReturnLoan),
    RenewBook(RenewBook),
    ReturnBook(ReturnBook),
    PlaceReservation(PlaceReservation),
    UseReservation(UseReservation),
    CancelReservation(CancelReservation),
}

impl LibraryCommand {
    /// ログ出力用のコマンド名
    pub fn name(&self) -> &'static str {
        match self {
            LibraryCommand::AcquireBook(_) => "acquire_book",
            LibraryCommand::DisposeBook(_) => "dispose_book",
            LibraryCommand::RegisterMember(_) => "register_member",
            LibraryCommand::WithdrawMember(_) => "withdraw_member",
            LibraryCommand::StartLoan(_) => "start_loan",
            LibraryCommand::RenewLoan(_) => "renew_loan",
            LibraryCommand::ReturnLoan(_) => "return_loan",
            LibraryCommand::RenewBook(_) => "renew_book",
            LibraryCommand::ReturnBook(_) => "return_book",
            LibraryCommand::PlaceReservation(_) => "place_reservation",
            LibraryCommand::UseReservation(_) => "use_reservation",
            LibraryCommand::CancelReservation(_) => "cancel_reservation",
        }
    }
}

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::domain::{LoanId, commands::LibraryCommand};
use crate::ports::{Clock, Library, Session};

use super::errors::Result;
use super::{book_service, loan_service, member_service, reservation_service};

/// サービスの依存関係
///
/// 静的なグローバル状態は持たず、プロセス（またはリクエスト）単位で
/// 明示的に渡されるハンドル。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub library: Arc<dyn Library>,
    pub clock: Arc<dyn Clock>,
}

/// コマンド実行の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "loan_id", rename_all = "snake_case")]
pub enum Outcome {
    Done,
    LoanStarted(LoanId),
}

/// 1つのルール操作を呼び出す
///
/// トランザクションの開始・確定は呼び出し側の責務。
pub async fn dispatch(
    session: &mut dyn Session,
    now: DateTime<Utc>,
    command: LibraryCommand,
) -> Result<Outcome> {
    match command {
        LibraryCommand::AcquireBook(cmd) => book_service::acquire_book(session, cmd).await?,
        LibraryCommand::DisposeBook(cmd) => book_service::dispose_book(session, cmd).await?,
        LibraryCommand::RegisterMember(cmd) => member_service::register_member(session, cmd).await?,
        LibraryCommand::WithdrawMember(cmd) => member_service::withdraw_member(session, cmd).await?,
        LibraryCommand::StartLoan(cmd) => {
            let loan_id = loan_service::start_loan(session, now, cmd).await?;
            return Ok(Outcome::LoanStarted(loan_id));
        }
        LibraryCommand::RenewLoan(cmd) => loan_service::renew_loan(session, now, cmd).await?,
        LibraryCommand::ReturnLoan(cmd) => loan_service::return_loan(session, now, cmd).await?,
        LibraryCommand::RenewBook(cmd) => loan_service::renew_book(session, now, cmd).await?,
        LibraryCommand::ReturnBook(cmd) => loan_service::return_book(session, now, cmd).await?,
        LibraryCommand::PlaceReservation(cmd) => {
            reservation_service::place_reservation(session, now, cmd).await?
        }
        LibraryCommand::UseReservation(cmd) => {
            let loan_id = reservation_service::use_reservation(session, now, cmd).await?;
            return Ok(Outcome::LoanStarted(loan_id));
        }
        LibraryCommand::CancelReservation(cmd) => {
            reservation_service::cancel_reservation(session, cmd).await?
        }
    }

    Ok(Outcome::Done)
}

/// コマンドを1トランザクションで実行する
///
/// 成功すればcommit、ルール違反・永続化エラーのいずれでもrollbackし、
/// エラーはそのまま呼び出し側へ返す。再試行はしない。
/// 現在時刻はトランザクション開始時に一度だけ読む。
pub async fn execute(deps: &ServiceDependencies, command: LibraryCommand) -> Result<Outcome> {
    let name = command.name();
    let mut session = deps.library.begin().await?;
    let now = deps.clock.now();
    tracing::debug!(command = name, "transaction started");

    match dispatch(session.as_mut(), now, command).await {
        Ok(outcome) => {
            session.commit().await?;
            tracing::info!(command = name, ?outcome, "transaction committed");
            Ok(outcome)
        }
        Err(err) => {
            if err.is_rule_violation() {
                tracing::warn!(command = name, error = %err, "rule violation, rolling back");
            } else {
                tracing::error!(command = name, error = %err, "persistence failure, rolling back");
            }
            if let Err(rollback_err) = session.rollback().await {
                tracing::error!(command = name, error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}

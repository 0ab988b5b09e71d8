use crate::application::{Outcome, ServiceDependencies, execute, queries};
use crate::domain::{
    Book, BookId, LoanId, Member, MemberId, ReservationId,
    commands::{
        CancelReservation, DisposeBook, LibraryCommand, PlaceReservation, RegisterMember,
        RenewLoan, ReturnLoan, StartLoan, UseReservation, WithdrawMember,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::{
    error::ApiError,
    types::{
        AcquireBookRequest, ListBooksQuery, LoanCreatedResponse, LoanHistoryQuery, LoanResponse,
        parse_status_filter,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub deps: ServiceDependencies,
}

/// 貸出を開始するコマンドを実行し、採番された貸出IDを返す
async fn execute_lending(state: &AppState, command: LibraryCommand) -> Result<LoanId, ApiError> {
    match execute(&state.deps, command).await? {
        Outcome::LoanStarted(loan_id) => Ok(loan_id),
        Outcome::Done => Err(ApiError::Internal("command did not start a loan".to_string())),
    }
}

// ============================================================================
// Books
// ============================================================================

/// GET /books - 書籍一覧（`?title=` でタイトルの部分一致検索）
pub async fn list_books(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListBooksQuery>,
) -> Result<Json<Vec<Book>>, ApiError> {
    let books = match query.title {
        Some(fragment) => queries::find_books_by_title(&state.deps, &fragment).await?,
        None => queries::list_books(&state.deps).await?,
    };
    Ok(Json(books))
}

/// POST /books - 書籍を受け入れる
pub async fn acquire_book(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AcquireBookRequest>,
) -> Result<StatusCode, ApiError> {
    let today = state.deps.clock.now().date_naive();
    execute(&state.deps, LibraryCommand::AcquireBook(req.into_command(today))).await?;
    Ok(StatusCode::CREATED)
}

/// GET /books/:id - 書籍の貸出状況と予約キュー
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<Json<queries::BookStatus>, ApiError> {
    let status = queries::book_status(&state.deps, &BookId::from(book_id)).await?;
    Ok(Json(status))
}

/// DELETE /books/:id - 書籍を除籍する
///
/// 貸出中・予約ありの書籍は除籍できない。
pub async fn dispose_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let cmd = DisposeBook {
        book_id: BookId::from(book_id),
    };
    execute(&state.deps, LibraryCommand::DisposeBook(cmd)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /books/:id/loans - 書籍の貸出履歴
///
/// クエリパラメータ:
/// - status: active または returned（オプション）
pub async fn book_loans(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<String>,
    Query(query): Query<LoanHistoryQuery>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(parse_status_filter)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let loans = queries::loan_history_for_book(&state.deps, &BookId::from(book_id)).await?;
    let loans = loans
        .into_iter()
        .filter(|loan| status.is_none_or(|s| loan.status() == s))
        .map(LoanResponse::from)
        .collect();
    Ok(Json(loans))
}

// ============================================================================
// Members
// ============================================================================

/// GET /members - 会員一覧
pub async fn list_members(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Member>>, ApiError> {
    Ok(Json(queries::list_members(&state.deps).await?))
}

/// POST /members - 会員を登録する
pub async fn register_member(
    State(state): State<Arc<AppState>>,
    Json(cmd): Json<RegisterMember>,
) -> Result<StatusCode, ApiError> {
    execute(&state.deps, LibraryCommand::RegisterMember(cmd)).await?;
    Ok(StatusCode::CREATED)
}

/// GET /members/:id - 会員の貸出中の書籍と予約
pub async fn get_member(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<String>,
) -> Result<Json<queries::MemberStatus>, ApiError> {
    let status = queries::member_status(&state.deps, &MemberId::from(member_id)).await?;
    Ok(Json(status))
}

/// DELETE /members/:id - 会員を退会させる
///
/// 貸出中の書籍・予約が残っている会員は退会できない。
pub async fn withdraw_member(
    State(state): State<Arc<AppState>>,
    Path(member_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let cmd = WithdrawMember {
        member_id: MemberId::from(member_id),
    };
    execute(&state.deps, LibraryCommand::WithdrawMember(cmd)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Loans
// ============================================================================

/// POST /loans - 新しい貸出を作成
///
/// 強制されるビジネスルール:
/// - 会員・書籍が存在すること
/// - 書籍が貸出中でないこと
/// - 会員の貸出数が上限に達していないこと
/// - 書籍に予約がないこと（予約者は POST /reservations/:id/use で借りる）
pub async fn start_loan(
    State(state): State<Arc<AppState>>,
    Json(cmd): Json<StartLoan>,
) -> Result<(StatusCode, Json<LoanCreatedResponse>), ApiError> {
    let loan_id = execute_lending(&state, LibraryCommand::StartLoan(cmd)).await?;
    Ok((StatusCode::CREATED, Json(LoanCreatedResponse { loan_id })))
}

/// POST /loans/:id/renew - 貸出を延長
///
/// 予約待ちがある書籍は延長できない。
pub async fn renew_loan(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let cmd = RenewLoan {
        loan_id: LoanId::from(loan_id),
    };
    execute(&state.deps, LibraryCommand::RenewLoan(cmd)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /loans/:id/return - 書籍を返却
pub async fn return_loan(
    State(state): State<Arc<AppState>>,
    Path(loan_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let cmd = ReturnLoan {
        loan_id: LoanId::from(loan_id),
    };
    execute(&state.deps, LibraryCommand::ReturnLoan(cmd)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Reservations
// ============================================================================

/// POST /reservations - 予約する
pub async fn place_reservation(
    State(state): State<Arc<AppState>>,
    Json(cmd): Json<PlaceReservation>,
) -> Result<StatusCode, ApiError> {
    execute(&state.deps, LibraryCommand::PlaceReservation(cmd)).await?;
    Ok(StatusCode::CREATED)
}

/// POST /reservations/:id/use - 予約を使って借りる
///
/// 予約キューの先頭のみ利用できる。予約は削除され、貸出が始まる。
pub async fn use_reservation(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<String>,
) -> Result<(StatusCode, Json<LoanCreatedResponse>), ApiError> {
    let cmd = UseReservation {
        reservation_id: ReservationId::from(reservation_id),
    };
    let loan_id = execute_lending(&state, LibraryCommand::UseReservation(cmd)).await?;
    Ok((StatusCode::CREATED, Json(LoanCreatedResponse { loan_id })))
}

/// DELETE /reservations/:id - 予約を取り消す
pub async fn cancel_reservation(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let cmd = CancelReservation {
        reservation_id: ReservationId::from(reservation_id),
    };
    execute(&state.deps, LibraryCommand::CancelReservation(cmd)).await?;
    Ok(StatusCode::NO_CONTENT)
}

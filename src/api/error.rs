use crate::application::{ErrorKind, LibraryError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub enum ApiError {
    Library(LibraryError),
    BadRequest(String),
    Internal(String),
}

impl From<LibraryError> for ApiError {
    fn from(err: LibraryError) -> Self {
        ApiError::Library(err)
    }
}

/// エラー種別をレスポンスのエラーコードに変換する
fn error_code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::AlreadyExists => "ALREADY_EXISTS",
        ErrorKind::NotFound => "NOT_FOUND",
        ErrorKind::OnLoan => "ON_LOAN",
        ErrorKind::Reserved => "RESERVED",
        ErrorKind::HasActiveLoans => "HAS_ACTIVE_LOANS",
        ErrorKind::HasReservations => "HAS_RESERVATIONS",
        ErrorKind::BookUnavailable => "BOOK_UNAVAILABLE",
        ErrorKind::BookReserved => "BOOK_RESERVED",
        ErrorKind::LoanLimitReached => "LOAN_LIMIT_REACHED",
        ErrorKind::NotOnLoan => "NOT_ON_LOAN",
        ErrorKind::AlreadyLoanedToSelf => "ALREADY_LOANED_TO_SELF",
        ErrorKind::DuplicateReservation => "DUPLICATE_RESERVATION",
        ErrorKind::NotHeadOfQueue => "NOT_HEAD_OF_QUEUE",
        ErrorKind::Persistence => "PERSISTENCE_ERROR",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error in handler: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred".to_string(),
                )
            }
            ApiError::Library(err) => {
                let kind = err.kind();
                let status = match kind {
                    // 404 Not Found - リクエストされたリソースが存在しない
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    // 409 Conflict - 一意性の衝突
                    ErrorKind::AlreadyExists | ErrorKind::DuplicateReservation => {
                        StatusCode::CONFLICT
                    }
                    // 500 Internal Server Error - システム障害
                    ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
                    // 422 Unprocessable Entity - ビジネスルール違反
                    _ => StatusCode::UNPROCESSABLE_ENTITY,
                };

                // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
                let message = if kind == ErrorKind::Persistence {
                    tracing::error!(error = %err, "persistence failure");
                    "An unexpected error occurred".to_string()
                } else {
                    err.to_string()
                };
                (status, error_code(kind), message)
            }
        };

        let body = Json(ErrorResponse::new(code, message));
        (status, body).into_response()
    }
}

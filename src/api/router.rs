use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, acquire_book, book_loans, cancel_reservation, dispose_book, get_book, get_member,
    list_books, list_members, place_reservation, register_member, renew_loan, return_loan,
    start_loan, use_reservation, withdraw_member,
};

/// Creates the API router with all circulation endpoints
///
/// Every mutating endpoint runs exactly one transaction.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Books
        .route("/books", get(list_books).post(acquire_book))
        .route("/books/:id", get(get_book).delete(dispose_book))
        .route("/books/:id/loans", get(book_loans))
        // Members
        .route("/members", get(list_members).post(register_member))
        .route("/members/:id", get(get_member).delete(withdraw_member))
        // Loans
        .route("/loans", post(start_loan))
        .route("/loans/:id/renew", post(renew_loan))
        .route("/loans/:id/return", post(return_loan))
        // Reservations
        .route("/reservations", post(place_reservation))
        .route("/reservations/:id", delete(cancel_reservation))
        .route("/reservations/:id/use", post(use_reservation))
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use library_circulation::api::{AppState, ErrorResponse, LoanCreatedResponse, LoanResponse, create_router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

mod common;

// ============================================================================
// E2Eテスト用のヘルパー関数
// ============================================================================

/// インメモリストアを使ったアプリケーションのセットアップ
fn setup_e2e_app() -> axum::Router {
    let (deps, _library) = common::memory_deps();
    create_router(Arc::new(AppState { deps }))
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// 書籍と会員を登録する
async fn seed(app: &axum::Router) {
    let response = send(
        app,
        "POST",
        "/books",
        Some(json!({"book_id": "B1", "title": "Dune", "author": "Frank Herbert", "acquired_on": "2026-01-15"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    for (id, name) in [("M1", "Alice"), ("M2", "Bob")] {
        let response = send(
            app,
            "POST",
            "/members",
            Some(json!({"member_id": id, "name": name, "phone": "555-0100", "loan_limit": 2})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}

// ============================================================================
// E2Eテスト: 正常系フロー
// ============================================================================

#[tokio::test]
async fn test_e2e_health() {
    let app = setup_e2e_app();
    let response = send(&app, "GET", "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_e2e_full_circulation_flow() {
    let app = setup_e2e_app();
    seed(&app).await;

    // Step 1: 貸出作成（POST /loans）
    let response = send(
        &app,
        "POST",
        "/loans",
        Some(json!({"member_id": "M1", "book_id": "B1"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let loan_id = read_json::<LoanCreatedResponse>(response).await.loan_id;

    // Step 2: 予約（POST /reservations）
    let response = send(
        &app,
        "POST",
        "/reservations",
        Some(json!({"reservation_id": "R1", "member_id": "M2", "book_id": "B1"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Step 3: 予約待ちがあるため延長できない
    let response = send(&app, "POST", &format!("/loans/{}/renew", loan_id), None).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let error: ErrorResponse = read_json(response).await;
    assert_eq!(error.error, "BOOK_RESERVED");
    assert_eq!(error.message, "book B1 is reserved, next in queue is Bob (M2)");

    // Step 4: 返却
    let response = send(&app, "POST", &format!("/loans/{}/return", loan_id), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Step 5: 予約を使って借りる
    let response = send(&app, "POST", "/reservations/R1/use", None).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let second_loan = read_json::<LoanCreatedResponse>(response).await.loan_id;

    // Step 6: 書籍の状態
    let response = send(&app, "GET", "/books/B1", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let status: Value = read_json(response).await;
    assert_eq!(status["active_loan"]["member_id"], "M2");
    assert_eq!(status["active_loan"]["loan_id"], second_loan.as_str());
    assert_eq!(status["queue"].as_array().unwrap().len(), 0);

    // Step 7: 貸出履歴のフィルタ
    let response = send(&app, "GET", "/books/B1/loans?status=returned", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let returned: Vec<LoanResponse> = read_json(response).await;
    assert_eq!(returned.len(), 1);
    assert_eq!(returned[0].loan_id, loan_id);

    let response = send(&app, "GET", "/books/B1/loans", None).await;
    let all: Vec<LoanResponse> = read_json(response).await;
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_e2e_catalogue_queries() {
    let app = setup_e2e_app();
    seed(&app).await;

    let response = send(
        &app,
        "POST",
        "/books",
        Some(json!({"book_id": "B2", "title": "Programming Rust", "author": "Jim Blandy"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let books: Vec<Value> = read_json(send(&app, "GET", "/books", None).await).await;
    assert_eq!(books.len(), 2);

    let found: Vec<Value> = read_json(send(&app, "GET", "/books?title=Rust", None).await).await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["book_id"], "B2");
    // 受入日省略時は時計の日付
    assert_eq!(found[0]["acquired_on"], "2026-04-01");

    let members: Vec<Value> = read_json(send(&app, "GET", "/members", None).await).await;
    assert_eq!(members.len(), 2);

    let member: Value = read_json(send(&app, "GET", "/members/M1", None).await).await;
    assert_eq!(member["member"]["name"], "Alice");
    assert_eq!(member["active_loans"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_e2e_dispose_and_withdraw() {
    let app = setup_e2e_app();
    seed(&app).await;

    let response = send(&app, "DELETE", "/books/B1", None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, "DELETE", "/members/M2", None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, "GET", "/books/B1", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// E2Eテスト: 異常系
// ============================================================================

#[tokio::test]
async fn test_e2e_duplicate_registration_is_conflict() {
    let app = setup_e2e_app();
    seed(&app).await;

    let response = send(
        &app,
        "POST",
        "/members",
        Some(json!({"member_id": "M1", "name": "Alice again", "phone": "555-0199", "loan_limit": 1})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let error: ErrorResponse = read_json(response).await;
    assert_eq!(error.error, "ALREADY_EXISTS");
    assert_eq!(error.message, "member M1 already exists");
}

#[tokio::test]
async fn test_e2e_loan_of_unknown_book_is_not_found() {
    let app = setup_e2e_app();
    seed(&app).await;

    let response = send(
        &app,
        "POST",
        "/loans",
        Some(json!({"member_id": "M1", "book_id": "B404"})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_e2e_history_of_unknown_book_is_not_found() {
    let app = setup_e2e_app();

    let response = send(&app, "GET", "/books/B404/loans", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let error: ErrorResponse = read_json(response).await;
    assert_eq!(error.error, "NOT_FOUND");
}

#[tokio::test]
async fn test_e2e_invalid_status_filter_is_bad_request() {
    let app = setup_e2e_app();
    seed(&app).await;

    let response = send(&app, "GET", "/books/B1/loans?status=overdue", None).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_e2e_zero_loan_limit_is_rejected() {
    let app = setup_e2e_app();

    let response = send(
        &app,
        "POST",
        "/members",
        Some(json!({"member_id": "M9", "name": "Zed", "phone": "555-0100", "loan_limit": 0})),
    )
    .await;

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_e2e_cancel_unknown_reservation_is_not_found() {
    let app = setup_e2e_app();

    let response = send(&app, "DELETE", "/reservations/R404", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

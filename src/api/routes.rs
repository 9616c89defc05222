//! API route definitions.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::state::AppState;
use crate::extrato::should_run_monthly_extrato;
use crate::storage;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/extrato/run", post(trigger_extrato))
        .route("/extrato/runs", get(list_runs))
        .route("/extrato/latest", get(latest_extrato))
        .route("/extrato/{year}/{month}", get(extrato_by_month))
        .route("/ledger/payments", post(add_payment))
        .route("/ledger/commissions", post(add_commission))
        .route("/ledger/expenses", post(add_expense))
}

fn meta() -> Value {
    json!({
        "timestamp": Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    })
}

fn internal_error(e: impl std::fmt::Display) -> (StatusCode, Json<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "data": null, "meta": { "error": e.to_string() } })),
    )
}

async fn health() -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION")
        },
        "meta": meta()
    }))
}

/// Trigger monthly generation for "now". Fire-and-forget: generation
/// failures never surface here, only in logs and the run log.
async fn trigger_extrato(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let now = Utc::now();

    if !should_run_monthly_extrato(now, &state.run_log, state.min_day_of_month) {
        return (
            StatusCode::OK,
            Json(json!({
                "data": { "triggered": false, "reason": "not due for generation" },
                "meta": meta()
            })),
        );
    }

    state.dispatcher.dispatch(now.month(), now.year()).await;
    (
        StatusCode::ACCEPTED,
        Json(json!({
            "data": { "triggered": true, "month": now.month(), "year": now.year() },
            "meta": meta()
        })),
    )
}

#[derive(Deserialize)]
struct RunsQuery {
    limit: Option<usize>,
}

async fn list_runs(
    State(state): State<AppState>,
    Query(q): Query<RunsQuery>,
) -> (StatusCode, Json<Value>) {
    match state.run_log.recent(q.limit.unwrap_or(20)) {
        Ok(entries) => {
            let total = entries.len();
            (
                StatusCode::OK,
                Json(json!({ "data": entries, "meta": { "total": total } })),
            )
        }
        Err(e) => internal_error(e),
    }
}

async fn latest_extrato(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match storage::latest_extrato(&state.pool) {
        Ok(Some(extrato)) => (StatusCode::OK, Json(json!({ "data": extrato, "meta": meta() }))),
        Ok(None) => (
            StatusCode::OK,
            Json(json!({ "data": null, "meta": { "message": "no extrato generated yet" } })),
        ),
        Err(e) => internal_error(e),
    }
}

async fn extrato_by_month(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> (StatusCode, Json<Value>) {
    match storage::find_extrato(&state.pool, month, year) {
        Ok(Some(extrato)) => (StatusCode::OK, Json(json!({ "data": extrato, "meta": meta() }))),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "data": null, "meta": { "message": "no extrato for that month" } })),
        ),
        Err(e) => internal_error(e),
    }
}

#[derive(Deserialize)]
struct NewPayment {
    client: String,
    amount_cents: i64,
    method: Option<String>,
    paid_at: Option<DateTime<Utc>>,
}

async fn add_payment(
    State(state): State<AppState>,
    Json(req): Json<NewPayment>,
) -> (StatusCode, Json<Value>) {
    let method = req.method.as_deref().unwrap_or("cash");
    let paid_at = req.paid_at.unwrap_or_else(Utc::now);
    match storage::record_payment(&state.pool, &req.client, req.amount_cents, method, paid_at) {
        Ok(id) => (
            StatusCode::CREATED,
            Json(json!({ "data": { "id": id }, "meta": meta() })),
        ),
        Err(e) => internal_error(e),
    }
}

#[derive(Deserialize)]
struct NewCommission {
    artist: String,
    amount_cents: i64,
    session_ref: Option<String>,
    earned_at: Option<DateTime<Utc>>,
}

async fn add_commission(
    State(state): State<AppState>,
    Json(req): Json<NewCommission>,
) -> (StatusCode, Json<Value>) {
    let earned_at = req.earned_at.unwrap_or_else(Utc::now);
    match storage::record_commission(
        &state.pool,
        &req.artist,
        req.amount_cents,
        req.session_ref.as_deref(),
        earned_at,
    ) {
        Ok(id) => (
            StatusCode::CREATED,
            Json(json!({ "data": { "id": id }, "meta": meta() })),
        ),
        Err(e) => internal_error(e),
    }
}

#[derive(Deserialize)]
struct NewExpense {
    category: String,
    amount_cents: i64,
    description: Option<String>,
    incurred_at: Option<DateTime<Utc>>,
}

async fn add_expense(
    State(state): State<AppState>,
    Json(req): Json<NewExpense>,
) -> (StatusCode, Json<Value>) {
    let incurred_at = req.incurred_at.unwrap_or_else(Utc::now);
    match storage::record_expense(
        &state.pool,
        &req.category,
        req.amount_cents,
        req.description.as_deref(),
        incurred_at,
    ) {
        Ok(id) => (
            StatusCode::CREATED,
            Json(json!({ "data": { "id": id }, "meta": meta() })),
        ),
        Err(e) => internal_error(e),
    }
}

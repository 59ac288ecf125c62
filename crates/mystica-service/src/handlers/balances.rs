//! Balance, ledger and affordability handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use mystica_core::{
    BalanceChange, CurrencyKind, EntryOptions, LedgerTransaction, Metadata, SinkKind, SourceKind,
    UserId,
};
use mystica_economy::AffordabilityCheck;

use super::parse_id;
use crate::error::ApiError;
use crate::state::AppState;

/// All balances for a user.
#[derive(Debug, Serialize)]
pub struct BalancesResponse {
    /// The user.
    pub user_id: UserId,
    /// Balance per currency, every kind present.
    pub balances: BTreeMap<CurrencyKind, i64>,
}

/// Get every currency balance.
pub async fn get_balances(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<BalancesResponse>, ApiError> {
    let user_id: UserId = parse_id(&user_id, "user id")?;
    let balances = state.ledger.get_all_balances(&user_id)?;

    Ok(Json(BalancesResponse { user_id, balances }))
}

/// One balance.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// The user.
    pub user_id: UserId,
    /// The currency.
    pub currency: CurrencyKind,
    /// Current balance.
    pub balance: i64,
}

/// Get one currency balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    Path((user_id, currency)): Path<(String, String)>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let user_id: UserId = parse_id(&user_id, "user id")?;
    let currency: CurrencyKind = parse_id(&currency, "currency")?;
    let balance = state.ledger.get_balance(&user_id, currency)?;

    Ok(Json(BalanceResponse {
        user_id,
        currency,
        balance,
    }))
}

/// Transaction list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Restrict to one currency.
    #[serde(default)]
    pub currency: Option<String>,
}

/// List transactions response.
#[derive(Debug, Serialize)]
pub struct ListTransactionsResponse {
    /// Transactions, oldest first.
    pub transactions: Vec<LedgerTransaction>,
}

/// List the transaction trail.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    let user_id: UserId = parse_id(&user_id, "user id")?;
    let currency = query
        .currency
        .as_deref()
        .map(|c| parse_id::<CurrencyKind>(c, "currency"))
        .transpose()?;

    let transactions = state.ledger.list_transactions(&user_id, currency)?;

    Ok(Json(ListTransactionsResponse { transactions }))
}

/// Credit request.
#[derive(Debug, Deserialize)]
pub struct CreditRequest {
    /// `GOLD` or `GEMS`.
    pub currency: String,
    /// Positive amount.
    pub amount: i64,
    /// Source kind, e.g. `daily_quest`.
    pub source: String,
    /// Optional reference to the originating entity.
    #[serde(default)]
    pub source_id: Option<String>,
    /// Optional opaque metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

/// Credit currency to a user.
pub async fn credit(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<CreditRequest>,
) -> Result<(StatusCode, Json<BalanceChange>), ApiError> {
    let user_id: UserId = parse_id(&user_id, "user id")?;
    let currency: CurrencyKind = parse_id(&req.currency, "currency")?;
    let source: SourceKind = parse_id(&req.source, "source kind")?;

    let change = state.ledger.credit(
        &user_id,
        currency,
        req.amount,
        source,
        EntryOptions {
            source_id: req.source_id,
            metadata: req.metadata,
        },
    )?;

    Ok((StatusCode::CREATED, Json(change)))
}

/// Debit request.
#[derive(Debug, Deserialize)]
pub struct DebitRequest {
    /// `GOLD` or `GEMS`.
    pub currency: String,
    /// Positive amount.
    pub amount: i64,
    /// Sink kind, e.g. `shop_purchase`.
    pub sink: String,
    /// Optional reference to the originating entity.
    #[serde(default)]
    pub source_id: Option<String>,
    /// Optional opaque metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

/// Debit currency from a user.
pub async fn debit(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<DebitRequest>,
) -> Result<(StatusCode, Json<BalanceChange>), ApiError> {
    let user_id: UserId = parse_id(&user_id, "user id")?;
    let currency: CurrencyKind = parse_id(&req.currency, "currency")?;
    let sink: SinkKind = parse_id(&req.sink, "sink kind")?;

    let change = state.ledger.debit(
        &user_id,
        currency,
        req.amount,
        sink,
        EntryOptions {
            source_id: req.source_id,
            metadata: req.metadata,
        },
    )?;

    Ok((StatusCode::CREATED, Json(change)))
}

/// Affordability request.
#[derive(Debug, Deserialize)]
pub struct AffordabilityRequest {
    /// `GOLD` or `GEMS`.
    pub currency: String,
    /// Amount to compare against.
    pub amount: i64,
}

/// Check whether a user can afford an amount.
pub async fn check_affordability(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<AffordabilityRequest>,
) -> Result<Json<AffordabilityCheck>, ApiError> {
    let user_id: UserId = parse_id(&user_id, "user id")?;
    let currency: CurrencyKind = parse_id(&req.currency, "currency")?;

    let check = state
        .affordability
        .get_affordability_check(&user_id, currency, req.amount)?;

    Ok(Json(check))
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! REST API surface.
//!
//! ## Endpoints
//!
//! - `GET  /api/user/{id}` - Account projection, 404 if absent
//! - `POST /api/user` - Create or update a user profile
//! - `GET  /api/user/{id}/balance` - Balances, creating the account if absent
//! - `POST /api/user/{id}/deposit` - Credit a balance
//! - `GET  /api/user/{id}/gifts` - Owned gifts (empty list if absent)
//! - `POST /api/user/{id}/purchase` - Buy a catalog gift
//! - `GET  /api/user/{id}/transactions` - Transaction history, most recent first
//! - `POST /api/user/{id}/redeem` - Redeem a promo code
//! - `GET  /`, `GET /health` - Liveness probes

use crate::account::{AccountView, ProfileUpdate};
use crate::base::{Currency, UserId};
use crate::engine::Market;
use crate::gift::{GiftOrder, OwnedGift};
use crate::transaction::Transaction;
use crate::MarketError;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// === Request/Response DTOs ===

/// Request body for `POST /api/user`.
#[derive(Debug, Deserialize)]
pub struct UserUpsertRequest {
    pub user_id: u64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_premium: Option<bool>,
    pub wallet_address: Option<String>,
}

/// Request body for `POST /api/user/{id}/deposit`.
///
/// The currency arrives as a string and is validated into the closed enum
/// here, so an unknown code maps to a 400 rather than a deserialize error.
#[derive(Debug, Deserialize)]
pub struct DepositRequest {
    pub amount: Decimal,
    pub currency: String,
    pub tx_hash: Option<String>,
}

/// Request body for `POST /api/user/{id}/purchase`.
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub gift_id: String,
    pub gift_name: String,
    pub gift_preview: Option<String>,
    pub gift_price: Decimal,
}

/// Request body for `POST /api/user/{id}/redeem`.
#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    50
}

/// Response body for account endpoints.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user_id: u64,
    pub balance_ton: Decimal,
    pub balance_stars: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_premium: bool,
    pub wallet_address: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<AccountView> for UserResponse {
    fn from(view: AccountView) -> Self {
        UserResponse {
            user_id: view.user_id.0,
            balance_ton: view.balance_ton,
            balance_stars: view.balance_stars,
            username: view.username,
            first_name: view.first_name,
            last_name: view.last_name,
            is_premium: view.is_premium,
            wallet_address: view.wallet_address,
            created_at: view.created_at,
        }
    }
}

/// Response body for `GET /api/user/{id}/balance`.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance_ton: Decimal,
    pub balance_stars: i64,
}

/// Response body for transaction endpoints.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: u64,
    pub user_id: u64,
    pub transaction_type: String,
    pub amount: Decimal,
    pub currency: String,
    pub gift_id: Option<String>,
    pub tx_hash: Option<String>,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Transaction> for TransactionResponse {
    fn from(tx: Transaction) -> Self {
        TransactionResponse {
            id: tx.id.0,
            user_id: tx.user_id.0,
            transaction_type: match tx.kind {
                crate::transaction::TransactionKind::Deposit => "deposit",
                crate::transaction::TransactionKind::Purchase => "purchase",
                crate::transaction::TransactionKind::Withdraw => "withdraw",
            }
            .to_string(),
            amount: tx.amount,
            currency: tx.currency.as_str().to_string(),
            gift_id: tx.gift_id.map(|id| id.0),
            tx_hash: tx.tx_hash,
            status: match tx.status {
                crate::transaction::TransactionStatus::Pending => "pending",
                crate::transaction::TransactionStatus::Completed => "completed",
                crate::transaction::TransactionStatus::Failed => "failed",
            }
            .to_string(),
            created_at: tx.created_at,
        }
    }
}

/// Response body for gift endpoints.
#[derive(Debug, Serialize)]
pub struct GiftResponse {
    pub user_id: u64,
    pub gift_id: String,
    pub gift_name: String,
    pub gift_preview: Option<String>,
    pub gift_price: Decimal,
    pub purchase_date: chrono::DateTime<chrono::Utc>,
}

impl From<OwnedGift> for GiftResponse {
    fn from(gift: OwnedGift) -> Self {
        GiftResponse {
            user_id: gift.user_id.0,
            gift_id: gift.gift_id.0,
            gift_name: gift.name,
            gift_preview: gift.preview,
            gift_price: gift.price,
            purchase_date: gift.purchased_at,
        }
    }
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

/// Shared application state containing the marketplace engine.
#[derive(Clone)]
pub struct AppState {
    pub market: Arc<Market>,
}

// === Error Handling ===

/// Wrapper for converting [`MarketError`] into HTTP responses.
pub struct AppError(MarketError);

impl From<MarketError> for AppError {
    fn from(err: MarketError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            MarketError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            MarketError::InvalidCurrency => (StatusCode::BAD_REQUEST, "INVALID_CURRENCY"),
            MarketError::InvalidAmount => (StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
            MarketError::InvalidInput => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            MarketError::InsufficientBalance => (StatusCode::BAD_REQUEST, "INSUFFICIENT_BALANCE"),
            MarketError::BalanceOverflow => (StatusCode::UNPROCESSABLE_ENTITY, "BALANCE_OVERFLOW"),
            MarketError::AlreadyOwned => (StatusCode::BAD_REQUEST, "ALREADY_OWNED"),
            MarketError::CodeNotFound => (StatusCode::NOT_FOUND, "CODE_NOT_FOUND"),
            MarketError::CodeAlreadyUsed => (StatusCode::CONFLICT, "CODE_ALREADY_USED"),
            MarketError::CodeGenerationExhausted => {
                (StatusCode::SERVICE_UNAVAILABLE, "CODE_GENERATION_EXHAUSTED")
            }
            MarketError::TransactionSettled => (StatusCode::CONFLICT, "TRANSACTION_SETTLED"),
            MarketError::Unauthorized => (StatusCode::FORBIDDEN, "UNAUTHORIZED"),
            MarketError::NoPendingAction => (StatusCode::CONFLICT, "NO_PENDING_ACTION"),
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// GET /api/user/{id} - Account projection, 404 if absent.
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<UserResponse>, AppError> {
    let view = state
        .market
        .get_account(UserId(id))
        .ok_or(MarketError::NotFound)?;
    Ok(Json(view.into()))
}

/// POST /api/user - Create or update a user profile.
async fn upsert_user(
    State(state): State<AppState>,
    Json(request): Json<UserUpsertRequest>,
) -> (StatusCode, Json<UserResponse>) {
    let update = ProfileUpdate {
        username: request.username,
        first_name: request.first_name,
        last_name: request.last_name,
        is_premium: request.is_premium,
        wallet_address: request.wallet_address,
    };
    let view = state.market.upsert_profile(UserId(request.user_id), &update);
    (StatusCode::CREATED, Json(view.into()))
}

/// GET /api/user/{id}/balance - Balances, creating the account if absent.
async fn get_balance(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Json<BalanceResponse> {
    let (balance_ton, balance_stars) = state.market.balance(UserId(id));
    Json(BalanceResponse {
        balance_ton,
        balance_stars,
    })
}

/// POST /api/user/{id}/deposit - Credit a balance.
async fn deposit(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<DepositRequest>,
) -> Result<Json<TransactionResponse>, AppError> {
    let currency: Currency = request.currency.parse()?;
    let transaction = state
        .market
        .deposit(UserId(id), request.amount, currency, request.tx_hash)?;
    Ok(Json(transaction.into()))
}

/// GET /api/user/{id}/gifts - Owned gifts, empty list for unknown users.
async fn get_gifts(State(state): State<AppState>, Path(id): Path<u64>) -> Json<Vec<GiftResponse>> {
    let gifts = state
        .market
        .gifts_for(UserId(id))
        .into_iter()
        .map(GiftResponse::from)
        .collect();
    Json(gifts)
}

/// POST /api/user/{id}/purchase - Buy a catalog gift.
async fn purchase(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<PurchaseRequest>,
) -> Result<Json<GiftResponse>, AppError> {
    let order = GiftOrder {
        gift_id: request.gift_id.as_str().into(),
        name: request.gift_name,
        preview: request.gift_preview,
        price: request.gift_price,
    };
    let gift = state.market.purchase(UserId(id), &order)?;
    Ok(Json(gift.into()))
}

/// GET /api/user/{id}/transactions - History, most recent first.
async fn get_transactions(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<TransactionResponse>> {
    let transactions = state
        .market
        .transactions_for(UserId(id), query.limit)
        .into_iter()
        .map(TransactionResponse::from)
        .collect();
    Json(transactions)
}

/// POST /api/user/{id}/redeem - Redeem a promo code.
async fn redeem(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<RedeemRequest>,
) -> Result<Json<TransactionResponse>, AppError> {
    let transaction = state.market.redeem_code(&request.code, UserId(id))?;
    Ok(Json(transaction.into()))
}

/// GET / - Liveness probe.
async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "message": "Gift Market API is running"
    }))
}

/// GET /health - Liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

// === Router ===

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/user", post(upsert_user))
        .route("/api/user/{id}", get(get_user))
        .route("/api/user/{id}/balance", get(get_balance))
        .route("/api/user/{id}/deposit", post(deposit))
        .route("/api/user/{id}/gifts", get(get_gifts))
        .route("/api/user/{id}/purchase", post(purchase))
        .route("/api/user/{id}/transactions", get(get_transactions))
        .route("/api/user/{id}/redeem", post(redeem))
        .with_state(state)
}

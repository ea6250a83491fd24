use super::types::*;
use crate::bank::{Bank, SignedIn};
use crate::error::LedgerError;
use crate::rpc::RpcState;
use axum::{extract::State, http::HeaderMap, Json};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// Main dispatcher: routes incoming JSON-RPC requests to the correct handler.
pub async fn handle_rpc_request(
    State(state): State<RpcState>,
    headers: HeaderMap,
    Json(req): Json<RpcRequest>,
) -> Json<RpcResponse> {
    debug!("RPC Request: method={}, id={}", req.method, req.id);
    let token = bearer_token(&headers);
    let bank = state.bank.clone();

    let result = match req.method.as_str() {
        "register" => handle_register(bank, req.params).await,
        "login" => handle_login(bank, req.params).await,
        "logout" => handle_logout(bank, token).await,
        "getUser" => handle_get_user(bank, req.params).await,
        "getMe" => handle_get_me(bank, token).await,
        "addFriend" => handle_add_friend(bank, token, req.params).await,
        "transfer" => handle_transfer(bank, token, req.params).await,
        // Admin Operations
        "adminListUsers" => handle_admin_list_users(bank, token).await,
        "adminSetBalance" => handle_admin_set_balance(bank, token, req.params).await,
        "adminCredit" => handle_admin_credit(bank, token, req.params).await,
        "getVersion" => Ok(serde_json::json!({ "version": env!("CARGO_PKG_VERSION") })),
        _ => Err(RpcError {
            code: -32601,
            message: format!("Method not found: {}", req.method),
        }),
    };

    // Build response
    match result {
        Ok(val) => Json(RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(val),
            error: None,
            id: req.id,
        }),
        Err(err) => Json(RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(err),
            id: req.id,
        }),
    }
}

pub async fn handle_health(State(state): State<RpcState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "commissionRate": state.bank.config().ledger.commission_rate,
        "activeSessions": state.bank.active_sessions(),
    }))
}

//
// === Helper Functions ===
//

/// Token from `Authorization: Bearer <token>`
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn parse_params<T: DeserializeOwned>(params: serde_json::Value) -> Result<T, RpcError> {
    serde_json::from_value(params).map_err(|e| RpcError {
        code: -32602,
        message: format!("Invalid params: {}", e),
    })
}

/// Safely serialize to JSON value
fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError {
        code: -32603,
        message: format!("Serialization error: {}", e),
    })
}

/// Bank calls take a lock and write to disk, so keep them off the reactor
async fn blocking<T, F>(bank: Arc<Bank>, f: F) -> Result<T, RpcError>
where
    F: FnOnce(&Bank) -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&bank))
        .await
        .map_err(|e| {
            tracing::error!("bank task failed: {}", e);
            RpcError {
                code: -32603,
                message: "Internal error".to_string(),
            }
        })
}

/// Business failures are answered in-band with `success: false`
fn reply<T, B: serde::Serialize>(
    outcome: Result<T, LedgerError>,
    body: impl FnOnce(T) -> B,
) -> Result<serde_json::Value, RpcError> {
    match outcome {
        Ok(value) => to_json(&body(value)),
        Err(err) => {
            debug!(kind = err.kind(), "request refused: {}", err);
            to_json(&Failure {
                success: false,
                message: err.to_string(),
                error: err.kind(),
            })
        }
    }
}

fn signed_in(message: &str) -> impl FnOnce(SignedIn) -> SignedInResult + '_ {
    move |s| SignedInResult {
        success: true,
        message: message.to_string(),
        token: s.session.token,
        user: s.user,
    }
}

//
// === Individual Handlers ===
//

/// Handle register(username, password)
async fn handle_register(bank: Arc<Bank>, params: serde_json::Value) -> Result<serde_json::Value, RpcError> {
    let p: CredentialsParams = parse_params(params)?;
    let outcome = blocking(bank, move |b| b.register(&p.username, &p.password)).await?;
    reply(outcome, signed_in("Account created!"))
}

/// Handle login(username, password)
async fn handle_login(bank: Arc<Bank>, params: serde_json::Value) -> Result<serde_json::Value, RpcError> {
    let p: CredentialsParams = parse_params(params)?;
    let outcome = blocking(bank, move |b| b.login(&p.username, &p.password)).await?;
    reply(outcome, signed_in("Logged in!"))
}

async fn handle_logout(bank: Arc<Bank>, token: Option<String>) -> Result<serde_json::Value, RpcError> {
    let outcome = bank.logout(token.as_deref());
    reply(outcome, |_| MessageResult {
        success: true,
        message: "You have logged out".to_string(),
    })
}

/// Handle getUser(username)
async fn handle_get_user(bank: Arc<Bank>, params: serde_json::Value) -> Result<serde_json::Value, RpcError> {
    let p: GetUserParams = parse_params(params)?;
    let outcome = blocking(bank, move |b| b.get_user(&p.username)).await?;
    reply(outcome, |user| UserResult {
        success: true,
        message: None,
        user,
    })
}

async fn handle_get_me(bank: Arc<Bank>, token: Option<String>) -> Result<serde_json::Value, RpcError> {
    let outcome = blocking(bank, move |b| b.me(token.as_deref())).await?;
    reply(outcome, |user| UserResult {
        success: true,
        message: None,
        user,
    })
}

/// Handle addFriend(friendCode)
async fn handle_add_friend(
    bank: Arc<Bank>,
    token: Option<String>,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    let p: AddFriendParams = parse_params(params)?;
    let outcome = blocking(bank, move |b| b.add_friend(token.as_deref(), &p.friend_code)).await?;
    reply(outcome, |user| UserResult {
        success: true,
        message: Some("Friend added".to_string()),
        user,
    })
}

/// Handle transfer(from, to, amount, note, transferType)
async fn handle_transfer(
    bank: Arc<Bank>,
    token: Option<String>,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    let p: TransferParams = parse_params(params)?;
    let amount = p.amount;
    let outcome = blocking(bank, move |b| {
        b.transfer(token.as_deref(), &p.from, &p.to, p.amount, p.note, p.transfer_type)
    })
    .await?;
    reply(outcome, |receipt| TransferResult {
        success: true,
        message: format!("Transfer of {} SLC completed!", amount),
        new_balance: receipt.new_balance,
        commission: receipt.commission,
        transaction_id: receipt.transaction_id,
    })
}

async fn handle_admin_list_users(bank: Arc<Bank>, token: Option<String>) -> Result<serde_json::Value, RpcError> {
    let outcome = blocking(bank, move |b| b.admin_list_users(token.as_deref())).await?;
    reply(outcome, |users| UserListResult { success: true, users })
}

/// Handle adminSetBalance(username, newBalance)
async fn handle_admin_set_balance(
    bank: Arc<Bank>,
    token: Option<String>,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    let p: AdminSetBalanceParams = parse_params(params)?;
    let username = p.username.clone();
    let outcome = blocking(bank, move |b| {
        b.admin_set_balance(token.as_deref(), &p.username, p.new_balance)
    })
    .await?;
    reply(outcome, |adj| SetBalanceResult {
        success: true,
        message: format!("Balance of {} changed", username),
        old_balance: adj.old_balance,
        new_balance: adj.new_balance,
        below_zero: adj.below_zero,
    })
}

/// Handle adminCredit(username, amount)
async fn handle_admin_credit(
    bank: Arc<Bank>,
    token: Option<String>,
    params: serde_json::Value,
) -> Result<serde_json::Value, RpcError> {
    let p: AdminCreditParams = parse_params(params)?;
    let message = format!("Granted {} SLC to {}", p.amount, p.username);
    let outcome = blocking(bank, move |b| b.admin_credit(token.as_deref(), &p.username, p.amount)).await?;
    reply(outcome, |new_balance| CreditResult {
        success: true,
        message,
        new_balance,
    })
}

// RPC types for JSON-RPC 2.0 protocol
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::{AccountView, TransferScope, UserSummary};

#[derive(Deserialize, Debug)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    pub id: u64,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    pub id: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

// Method-specific parameter types
#[derive(Deserialize, Debug)]
pub struct CredentialsParams {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct GetUserParams {
    pub username: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddFriendParams {
    pub friend_code: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TransferParams {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default, alias = "scope")]
    pub transfer_type: TransferScope,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AdminSetBalanceParams {
    pub username: String,
    pub new_balance: Decimal,
}

#[derive(Deserialize, Debug)]
pub struct AdminCreditParams {
    pub username: String,
    pub amount: Decimal,
}

// Result bodies. Every one carries `success`, failures go through `Failure`.

#[derive(Serialize, Debug)]
pub struct Failure {
    pub success: bool,
    pub message: String,
    pub error: &'static str,
}

#[derive(Serialize, Debug)]
pub struct MessageResult {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize, Debug)]
pub struct SignedInResult {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: AccountView,
}

#[derive(Serialize, Debug)]
pub struct UserResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub user: AccountView,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TransferResult {
    pub success: bool,
    pub message: String,
    pub new_balance: Decimal,
    pub commission: Decimal,
    pub transaction_id: Uuid,
}

#[derive(Serialize, Debug)]
pub struct UserListResult {
    pub success: bool,
    pub users: Vec<UserSummary>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SetBalanceResult {
    pub success: bool,
    pub message: String,
    pub old_balance: Decimal,
    pub new_balance: Decimal,
    pub below_zero: bool,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreditResult {
    pub success: bool,
    pub message: String,
    pub new_balance: Decimal,
}

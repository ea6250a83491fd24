pub mod handlers;
pub mod types;

use crate::bank::Bank;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct RpcState {
    pub bank: Arc<Bank>,
}

pub struct RpcServer {
    state: RpcState,
    bind_addr: String,
}

/// JSON-RPC on `POST /`, liveness on `GET /health`
pub fn router(state: RpcState) -> Router {
    Router::new()
        .route("/", post(handlers::handle_rpc_request))
        .route("/health", get(handlers::handle_health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl RpcServer {
    pub fn new(bank: Arc<Bank>, bind: &str, port: u16) -> Self {
        Self {
            state: RpcState { bank },
            bind_addr: format!("{}:{}", bind, port),
        }
    }

    pub async fn start(self) -> std::io::Result<()> {
        let app = router(self.state);

        let listener = tokio::net::TcpListener::bind(&self.bind_addr).await?;

        info!("RPC server listening on {}", self.bind_addr);
        axum::serve(listener, app).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BankConfig;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct TestServer {
        app: Router,
        _dir: tempfile::TempDir,
    }

    impl TestServer {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let mut config = BankConfig::default();
            config.storage.path = dir.path().join("database.json").to_string_lossy().into_owned();
            let bank = Arc::new(Bank::open(config).unwrap());
            Self {
                app: router(RpcState { bank }),
                _dir: dir,
            }
        }

        async fn call(&self, method: &str, params: Value, token: Option<&str>) -> Value {
            let body = json!({ "jsonrpc": "2.0", "method": method, "params": params, "id": 1 });
            let mut req = Request::builder()
                .method("POST")
                .uri("/")
                .header(header::CONTENT_TYPE, "application/json");
            if let Some(token) = token {
                req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            let req = req.body(Body::from(body.to_string())).unwrap();

            let resp = self.app.clone().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
            serde_json::from_slice(&bytes).unwrap()
        }

        async fn register(&self, username: &str) -> String {
            let resp = self
                .call("register", json!({ "username": username, "password": "pass1234" }), None)
                .await;
            assert_eq!(resp["result"]["success"], true, "{}", resp);
            resp["result"]["token"].as_str().unwrap().to_string()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_register_login_and_get_user() {
        let server = TestServer::new();
        server.register("alice").await;

        let resp = server
            .call("login", json!({ "username": "alice", "password": "pass1234" }), None)
            .await;
        let result = &resp["result"];
        assert_eq!(result["success"], true);
        assert_eq!(result["user"]["username"], "alice");
        assert!(result["user"]["friendCode"].as_str().unwrap().starts_with("SLC-"));
        assert!(result["user"].get("passwordHash").is_none());

        let resp = server.call("getUser", json!({ "username": "alice" }), None).await;
        assert_eq!(resp["result"]["user"]["balance"], "100");
        assert!(resp["result"]["user"].get("passwordHash").is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_logical_failures_are_in_band() {
        let server = TestServer::new();
        server.register("alice").await;

        let resp = server
            .call("login", json!({ "username": "alice", "password": "wrong" }), None)
            .await;
        assert!(resp.get("error").is_none());
        assert_eq!(resp["result"]["success"], false);
        assert_eq!(resp["result"]["error"], "auth_error");
        assert_eq!(resp["result"]["message"], "Wrong password");

        let resp = server
            .call("register", json!({ "username": "alice", "password": "pass1234" }), None)
            .await;
        assert_eq!(resp["result"]["error"], "duplicate_username");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_transfer_over_rpc() {
        let server = TestServer::new();
        let alice = server.register("alice").await;
        server.register("bob").await;

        let resp = server
            .call(
                "transfer",
                json!({ "from": "alice", "to": "bob", "amount": 20, "note": "hi", "transferType": "all" }),
                Some(&alice),
            )
            .await;
        let result = &resp["result"];
        assert_eq!(result["success"], true, "{}", resp);
        assert_eq!(result["newBalance"], "78.0");
        assert_eq!(result["commission"], "2.0");

        // No bearer token: refused
        let resp = server
            .call("transfer", json!({ "from": "alice", "to": "bob", "amount": 1 }), None)
            .await;
        assert_eq!(resp["result"]["error"], "unauthorized");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_oversized_amount_is_refused_and_server_keeps_working() {
        let server = TestServer::new();
        let alice = server.register("alice").await;
        server.register("bob").await;

        let resp = server
            .call(
                "transfer",
                json!({ "from": "alice", "to": "bob", "amount": "79228162514264337593543950335" }),
                Some(&alice),
            )
            .await;
        assert_eq!(resp["result"]["success"], false);
        assert_eq!(resp["result"]["error"], "invalid_amount");

        let resp = server
            .call("transfer", json!({ "from": "alice", "to": "bob", "amount": "1" }), Some(&alice))
            .await;
        assert_eq!(resp["result"]["success"], true, "{}", resp);
        assert_eq!(resp["result"]["newBalance"], "98.9");

        let resp = server.call("getUser", json!({ "username": "bob" }), None).await;
        assert_eq!(resp["result"]["user"]["balance"], "101");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_client_side_admin_claims_are_ignored() {
        let server = TestServer::new();
        let alice = server.register("alice").await;

        let resp = server
            .call(
                "adminCredit",
                json!({ "username": "alice", "amount": 1000, "isAdmin": true, "adminCode": "qqslonadm144" }),
                Some(&alice),
            )
            .await;
        assert_eq!(resp["result"]["success"], false);
        assert_eq!(resp["result"]["error"], "unauthorized");

        let resp = server.call("adminListUsers", json!({}), Some(&alice)).await;
        assert_eq!(resp["result"]["error"], "unauthorized");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_admin_flow() {
        let server = TestServer::new();
        let admin = server.register("admin").await;
        server.register("alice").await;

        let resp = server
            .call("adminSetBalance", json!({ "username": "alice", "newBalance": "250.5" }), Some(&admin))
            .await;
        let result = &resp["result"];
        assert_eq!(result["success"], true, "{}", resp);
        assert_eq!(result["oldBalance"], "100");
        assert_eq!(result["newBalance"], "250.5");
        assert_eq!(result["belowZero"], false);

        let resp = server
            .call("adminCredit", json!({ "username": "alice", "amount": 0.5 }), Some(&admin))
            .await;
        assert_eq!(resp["result"]["newBalance"], "251.0");

        let resp = server.call("adminListUsers", Value::Null, Some(&admin)).await;
        let users = resp["result"]["users"].as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|u| u["username"] != "Kommisa"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_friends_and_logout() {
        let server = TestServer::new();
        let alice = server.register("alice").await;
        server.register("bob").await;

        let bob = server.call("getUser", json!({ "username": "bob" }), None).await;
        let code = bob["result"]["user"]["friendCode"].as_str().unwrap().to_string();

        let resp = server.call("addFriend", json!({ "friendCode": code }), Some(&alice)).await;
        assert_eq!(resp["result"]["user"]["friends"], json!(["bob"]));

        let resp = server.call("logout", Value::Null, Some(&alice)).await;
        assert_eq!(resp["result"]["success"], true);

        let resp = server.call("getMe", Value::Null, Some(&alice)).await;
        assert_eq!(resp["result"]["error"], "unauthorized");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_protocol_errors() {
        let server = TestServer::new();

        let resp = server.call("mintCoins", json!({}), None).await;
        assert_eq!(resp["error"]["code"], -32601);
        assert!(resp.get("result").is_none());

        let resp = server.call("transfer", json!({ "from": "alice" }), None).await;
        assert_eq!(resp["error"]["code"], -32602);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_health() {
        let server = TestServer::new();
        server.register("alice").await;

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = server.app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let health: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(health["activeSessions"], 1);
    }
}

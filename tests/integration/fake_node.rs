//! In-process Aptos fullnode for exercising `AptosClient` over HTTP.
//!
//! Serves the handful of `/v1` routes the client uses from a scriptable
//! `NodeScript`, and records every request as `"METHOD /route"` so tests
//! can assert which pipeline stages ran.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Behaviour knobs, keyed by full (normalized) address strings.
#[derive(Debug, Clone)]
pub struct NodeScript {
    pub sequence_number: u64,
    pub fungible_balances: HashMap<String, u64>,
    pub coin_balances: HashMap<String, u64>,
    pub fa_symbols: HashMap<String, String>,
    pub coin_symbols: HashMap<String, String>,
    pub view_fails: bool,
    pub resources_fail: bool,
    pub simulation_success: bool,
    pub commit_success: bool,
    pub never_commit: bool,
    pub vm_status: String,
}

impl Default for NodeScript {
    fn default() -> Self {
        Self {
            sequence_number: 7,
            fungible_balances: HashMap::new(),
            coin_balances: HashMap::new(),
            fa_symbols: HashMap::new(),
            coin_symbols: HashMap::new(),
            view_fails: false,
            resources_fail: false,
            simulation_success: true,
            commit_success: true,
            never_commit: false,
            vm_status: "Executed successfully".into(),
        }
    }
}

pub const SIGNING_MESSAGE: &str = "0xb5e97db07fa0bd0e5598aa3643a9bc6f6693bddc1a9fec9e674a461eaa00b193deadbeef";
pub const SUBMITTED_HASH: &str = "0x5eed";

#[derive(Default)]
struct NodeState {
    script: Mutex<NodeScript>,
    requests: Mutex<Vec<String>>,
    submitted: Mutex<Option<Value>>,
}

impl NodeState {
    fn record(&self, route: &str) {
        self.requests.lock().unwrap().push(route.to_string());
    }

    fn script(&self) -> NodeScript {
        self.script.lock().unwrap().clone()
    }
}

pub struct FakeNode {
    /// Base URL including `/v1`.
    pub url: String,
    state: Arc<NodeState>,
}

impl FakeNode {
    pub async fn start(script: NodeScript) -> Self {
        let state = Arc::new(NodeState {
            script: Mutex::new(script),
            ..Default::default()
        });

        let app = Router::new()
            .route("/v1/view", post(view))
            .route("/v1/accounts/:address", get(account))
            .route("/v1/accounts/:address/resource/:resource_type", get(resource))
            .route("/v1/estimate_gas_price", get(gas_price))
            .route("/v1/transactions/simulate", post(simulate))
            .route("/v1/transactions/encode_submission", post(encode_submission))
            .route("/v1/transactions", post(submit))
            .route("/v1/transactions/by_hash/:hash", get(transaction_by_hash))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}/v1"),
            state,
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn count(&self, route: &str) -> usize {
        self.requests().iter().filter(|r| r.as_str() == route).count()
    }

    /// Body of the last `POST /transactions`, if any.
    pub fn submitted(&self) -> Option<Value> {
        self.state.submitted.lock().unwrap().clone()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

type Shared = State<Arc<NodeState>>;

fn node_error(status: StatusCode, message: &str, code: &str) -> Response {
    (status, Json(json!({ "message": message, "error_code": code }))).into_response()
}

async fn view(State(state): Shared, Json(body): Json<Value>) -> Response {
    state.record("POST /view");
    let script = state.script();
    if script.view_fails {
        return node_error(StatusCode::INTERNAL_SERVER_ERROR, "view failed", "internal_error");
    }
    let token = body["arguments"][1].as_str().unwrap_or_default();
    let balance = script.fungible_balances.get(token).copied().unwrap_or(0);
    Json(json!([balance.to_string()])).into_response()
}

async fn account(State(state): Shared, Path(address): Path<String>) -> Response {
    state.record("GET /accounts");
    let script = state.script();
    Json(json!({
        "sequence_number": script.sequence_number.to_string(),
        "authentication_key": address,
    }))
    .into_response()
}

async fn resource(
    State(state): Shared,
    Path((address, resource_type)): Path<(String, String)>,
) -> Response {
    state.record("GET /resource");
    let script = state.script();
    if script.resources_fail {
        return node_error(StatusCode::SERVICE_UNAVAILABLE, "overloaded", "internal_error");
    }

    let inner = |prefix: &str| {
        resource_type
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix('>'))
            .map(str::to_string)
    };

    let found = if let Some(token) = inner("0x1::coin::CoinStore<") {
        script
            .coin_balances
            .get(&token)
            .map(|value| json!({ "coin": { "value": value.to_string() } }))
    } else if let Some(token) = inner("0x1::coin::CoinInfo<") {
        script
            .coin_symbols
            .get(&token)
            .map(|symbol| json!({ "name": symbol, "symbol": symbol, "decimals": 6 }))
    } else if resource_type == "0x1::fungible_asset::Metadata" {
        script
            .fa_symbols
            .get(&address)
            .map(|symbol| json!({ "name": symbol, "symbol": symbol, "decimals": 6 }))
    } else {
        None
    };

    match found {
        Some(data) => Json(json!({ "type": resource_type, "data": data })).into_response(),
        None => node_error(StatusCode::NOT_FOUND, "Resource not found", "resource_not_found"),
    }
}

async fn gas_price(State(state): Shared) -> Response {
    state.record("GET /estimate_gas_price");
    Json(json!({ "gas_estimate": 100 })).into_response()
}

async fn simulate(State(state): Shared, Json(_body): Json<Value>) -> Response {
    state.record("POST /transactions/simulate");
    let script = state.script();
    let vm_status = if script.simulation_success {
        "Executed successfully".to_string()
    } else {
        script.vm_status.clone()
    };
    Json(json!([{ "success": script.simulation_success, "vm_status": vm_status }])).into_response()
}

async fn encode_submission(State(state): Shared, Json(_body): Json<Value>) -> Response {
    state.record("POST /transactions/encode_submission");
    Json(json!(SIGNING_MESSAGE)).into_response()
}

async fn submit(State(state): Shared, Json(body): Json<Value>) -> Response {
    state.record("POST /transactions");
    *state.submitted.lock().unwrap() = Some(body);
    (StatusCode::ACCEPTED, Json(json!({ "hash": SUBMITTED_HASH }))).into_response()
}

async fn transaction_by_hash(State(state): Shared, Path(hash): Path<String>) -> Response {
    state.record("GET /transactions/by_hash");
    let script = state.script();
    if script.never_commit {
        return Json(json!({ "type": "pending_transaction", "hash": hash })).into_response();
    }
    Json(json!({
        "type": "user_transaction",
        "hash": hash,
        "success": script.commit_success,
        "vm_status": script.vm_status,
    }))
    .into_response()
}

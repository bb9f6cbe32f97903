//! # REST + WebSocket API
//!
//! Builds the axum router that exposes a deployed vault over HTTP. All
//! endpoints share application state through axum's `State` extractor.
//!
//! Callers identify themselves with a `caller` field in the request body.
//! There are no signatures: this is a devnet surface, not a wallet.
//!
//! ## Endpoints
//!
//! | Method | Path                                  | Description                          |
//! |--------|---------------------------------------|--------------------------------------|
//! | GET    | `/health`                             | Liveness probe                       |
//! | GET    | `/status`                             | Vault, assets and totals summary     |
//! | GET    | `/assets/:asset/allowed`              | Allow-list entry                     |
//! | GET    | `/assets/:asset/total`                | Total staked in an asset             |
//! | GET    | `/accounts/:address`                  | Ban status and non-zero positions    |
//! | GET    | `/accounts/:address/banned`           | Ban status                           |
//! | GET    | `/accounts/:address/balances/:asset`  | Ledger balance                       |
//! | GET    | `/events`                             | Retained vault events                |
//! | GET    | `/ws`                                 | WebSocket for live vault events      |
//! | POST   | `/admin/allowed`                      | Set an allow-list entry (owner)      |
//! | POST   | `/admin/banned`                       | Set ban status for a batch (owner)   |
//! | POST   | `/admin/owner`                        | Transfer or renounce ownership       |
//! | POST   | `/deposit`                            | Deposit a standard asset             |
//! | POST   | `/deposit/native`                     | Deposit attached native value        |
//! | POST   | `/withdraw`                           | Withdraw a standard asset            |
//! | POST   | `/withdraw/native`                    | Withdraw native value                |
//! | POST   | `/tokens/:asset/approve`              | Approve the vault on a token         |
//! | GET    | `/tokens/:asset/balances/:address`    | Token balance and vault allowance    |
//! | GET    | `/native/balances/:address`           | Native balance                       |

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use custody_contracts::{Host, HostError, InMemoryBank, NativeBank, ReturnConvention, Token, VaultError};
use custody_protocol::{config, Address, Amount, AssetId, VaultEvent};

use crate::events::EventHub;
use crate::genesis::Deployment;
use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone: everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// Network identifier (e.g., "devnet").
    pub network: String,
    pub host: Arc<Host>,
    pub bank: Arc<InMemoryBank>,
    /// Reference tokens by asset id.
    pub tokens: Arc<BTreeMap<AssetId, Arc<Token>>>,
    /// Event log and live broadcast.
    pub events: Arc<EventHub>,
    pub metrics: SharedMetrics,
}

impl AppState {
    pub fn new(
        version: String,
        deployment: Deployment,
        events: Arc<EventHub>,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            version,
            network: deployment.network,
            host: deployment.host,
            bank: deployment.bank,
            tokens: Arc::new(deployment.tokens),
            events,
            metrics,
        }
    }

    /// Runs one vault call, timing it and counting rejections.
    fn call<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&Host) -> Result<T, HostError>,
    ) -> Result<T, ApiError> {
        let timer = self.metrics.call_latency_seconds.start_timer();
        let result = f(&self.host);
        timer.observe_duration();
        result.map_err(|e| {
            self.metrics.observe_rejection(op, e.code());
            ApiError::Call(e)
        })
    }

    fn token(&self, asset: &AssetId) -> Result<&Arc<Token>, ApiError> {
        self.tokens
            .get(asset)
            .ok_or_else(|| ApiError::NotFound(format!("no token deployed at {}", asset)))
    }

    fn position(&self, depositor: Address, asset: AssetId) -> PositionResponse {
        let vault = self.host.vault();
        PositionResponse {
            depositor,
            asset,
            balance: vault.balance_of(&depositor, &asset),
            total: vault.total_of(&asset),
        }
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/assets/:asset/allowed", get(asset_allowed_handler))
        .route("/assets/:asset/total", get(asset_total_handler))
        .route("/accounts/:address", get(account_handler))
        .route("/accounts/:address/banned", get(account_banned_handler))
        .route("/accounts/:address/balances/:asset", get(account_balance_handler))
        .route("/events", get(events_handler))
        .route("/ws", get(ws_handler))
        .route("/admin/allowed", post(set_allowed_handler))
        .route("/admin/banned", post(set_banned_handler))
        .route("/admin/owner", post(set_owner_handler))
        .route("/deposit", post(deposit_handler))
        .route("/deposit/native", post(deposit_native_handler))
        .route("/withdraw", post(withdraw_handler))
        .route("/withdraw/native", post(withdraw_native_handler))
        .route("/tokens/:asset/approve", post(approve_handler))
        .route("/tokens/:asset/balances/:address", get(token_balance_handler))
        .route("/native/balances/:address", get(native_balance_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The vault or host rejected the call.
    Call(HostError),
    /// A path or body field did not parse.
    BadRequest(String),
    NotFound(String),
}

/// Error body returned by every endpoint on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

fn status_for(err: &HostError) -> StatusCode {
    match err {
        HostError::Vault(e) => match e {
            VaultError::Unauthorized { .. } | VaultError::Banned(_) => StatusCode::FORBIDDEN,
            VaultError::AssetNotAllowed(_)
            | VaultError::InsufficientBalance { .. }
            | VaultError::BalanceOverflow { .. }
            | VaultError::UnfundedNativeDeposit { .. }
            | VaultError::NativeAssetMisuse => StatusCode::UNPROCESSABLE_ENTITY,
            VaultError::Reentrancy => StatusCode::CONFLICT,
            VaultError::AssetPullFailed(_) | VaultError::AssetReleaseFailed { .. } => {
                StatusCode::BAD_GATEWAY
            }
        },
        HostError::Value(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, error) = match self {
            ApiError::Call(e) => (status_for(&e), e.code().to_string(), e.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request".into(), msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found".into(), msg),
        };
        (status, Json(ErrorResponse { error, code })).into_response()
    }
}

fn parse_address(raw: &str) -> Result<Address, ApiError> {
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid address {:?}: {}", raw, e)))
}

fn parse_asset(raw: &str) -> Result<AssetId, ApiError> {
    AssetId::parse(raw).map_err(|e| ApiError::BadRequest(format!("invalid asset {:?}: {}", raw, e)))
}

// ---------------------------------------------------------------------------
// Request Types
// ---------------------------------------------------------------------------

/// Body of `POST /admin/allowed`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SetAllowedRequest {
    pub caller: Address,
    pub asset: AssetId,
    pub allowed: bool,
}

/// Body of `POST /admin/banned`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SetBannedRequest {
    pub caller: Address,
    pub addresses: Vec<Address>,
    pub banned: bool,
}

/// Body of `POST /admin/owner`. A `null` new owner renounces.
#[derive(Debug, Serialize, Deserialize)]
pub struct SetOwnerRequest {
    pub caller: Address,
    pub new_owner: Option<Address>,
}

/// Body of `POST /deposit` and `POST /withdraw`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub caller: Address,
    pub asset: AssetId,
    pub amount: Amount,
}

/// Body of `POST /deposit/native`. `value` is what the caller attaches.
#[derive(Debug, Serialize, Deserialize)]
pub struct NativeDepositRequest {
    pub caller: Address,
    pub value: Amount,
}

/// Body of `POST /withdraw/native`.
#[derive(Debug, Serialize, Deserialize)]
pub struct NativeWithdrawRequest {
    pub caller: Address,
    pub amount: Amount,
}

/// Body of `POST /tokens/:asset/approve`. The spender is always the vault.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApproveRequest {
    pub owner: Address,
    pub amount: Amount,
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    pub protocol: String,
    pub network: String,
    /// The vault's own address.
    pub vault: Address,
    /// `None` once ownership is renounced.
    pub owner: Option<Address>,
    pub native: NativeSummary,
    pub tokens: Vec<TokenSummary>,
    /// Assets with deposits outstanding.
    pub held_assets: Vec<AssetId>,
    /// Number of banned addresses.
    pub banned: usize,
    /// Number of retained events.
    pub events: usize,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NativeSummary {
    pub symbol: String,
    pub decimals: u8,
    pub allowed: bool,
    pub total: Amount,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenSummary {
    pub asset: AssetId,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub convention: ReturnConvention,
    pub allowed: bool,
    pub total: Amount,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AllowedResponse {
    pub asset: AssetId,
    pub allowed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TotalResponse {
    pub asset: AssetId,
    pub total: Amount,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BannedResponse {
    pub address: Address,
    pub banned: bool,
}

/// Response payload for `GET /accounts/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub address: Address,
    pub banned: bool,
    pub positions: Vec<TotalResponse>,
}

/// A depositor's ledger position after a call.
#[derive(Debug, Serialize, Deserialize)]
pub struct PositionResponse {
    pub depositor: Address,
    pub asset: AssetId,
    pub balance: Amount,
    pub total: Amount,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OwnerResponse {
    pub owner: Option<Address>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BanBatchResponse {
    pub addresses: Vec<Address>,
    pub banned: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenBalanceResponse {
    pub address: Address,
    pub asset: AssetId,
    pub balance: Amount,
    /// What the vault may still pull from `address`.
    pub allowance: Amount,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NativeBalanceResponse {
    pub address: Address,
    pub balance: Amount,
}

// ---------------------------------------------------------------------------
// Read Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`: vault summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let vault = state.host.vault();
    let tokens = state
        .tokens
        .values()
        .map(|token| {
            let info = token.info();
            TokenSummary {
                asset: info.id,
                name: info.name.clone(),
                symbol: info.symbol.clone(),
                decimals: info.decimals,
                convention: info.convention,
                allowed: vault.is_allowed(&info.id),
                total: vault.total_of(&info.id),
            }
        })
        .collect();

    Json(StatusResponse {
        version: state.version.clone(),
        protocol: config::PROTOCOL_FINGERPRINT.to_string(),
        network: state.network.clone(),
        vault: vault.address(),
        owner: vault.owner(),
        native: NativeSummary {
            symbol: config::NATIVE_SYMBOL.to_string(),
            decimals: config::NATIVE_DECIMALS,
            allowed: vault.is_allowed(&AssetId::NATIVE),
            total: vault.total_of(&AssetId::NATIVE),
        },
        tokens,
        held_assets: vault.held_assets(),
        banned: vault.banned_count(),
        events: state.events.len(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn asset_allowed_handler(
    Path(asset): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AllowedResponse>, ApiError> {
    let asset = parse_asset(&asset)?;
    Ok(Json(AllowedResponse {
        asset,
        allowed: state.host.vault().is_allowed(&asset),
    }))
}

async fn asset_total_handler(
    Path(asset): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TotalResponse>, ApiError> {
    let asset = parse_asset(&asset)?;
    Ok(Json(TotalResponse {
        asset,
        total: state.host.vault().total_of(&asset),
    }))
}

/// `GET /accounts/:address`: ban status and every non-zero position.
async fn account_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AccountResponse>, ApiError> {
    let address = parse_address(&address)?;
    let vault = state.host.vault();
    let positions = vault
        .positions_of(&address)
        .into_iter()
        .map(|(asset, total)| TotalResponse { asset, total })
        .collect();
    Ok(Json(AccountResponse {
        address,
        banned: vault.is_banned(&address),
        positions,
    }))
}

async fn account_banned_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<BannedResponse>, ApiError> {
    let address = parse_address(&address)?;
    Ok(Json(BannedResponse {
        address,
        banned: state.host.vault().is_banned(&address),
    }))
}

async fn account_balance_handler(
    Path((address, asset)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<PositionResponse>, ApiError> {
    let address = parse_address(&address)?;
    let asset = parse_asset(&asset)?;
    Ok(Json(state.position(address, asset)))
}

/// `GET /events`: retained events, oldest first.
async fn events_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.events.history())
}

// ---------------------------------------------------------------------------
// Admin Handlers
// ---------------------------------------------------------------------------

async fn set_allowed_handler(
    State(state): State<AppState>,
    Json(req): Json<SetAllowedRequest>,
) -> Result<Json<AllowedResponse>, ApiError> {
    state.call("set_allowed", |h| h.set_allowed(req.caller, req.asset, req.allowed))?;
    Ok(Json(AllowedResponse {
        asset: req.asset,
        allowed: req.allowed,
    }))
}

async fn set_banned_handler(
    State(state): State<AppState>,
    Json(req): Json<SetBannedRequest>,
) -> Result<Json<BanBatchResponse>, ApiError> {
    state.call("set_banned", |h| h.set_banned(req.caller, &req.addresses, req.banned))?;
    Ok(Json(BanBatchResponse {
        addresses: req.addresses,
        banned: req.banned,
    }))
}

async fn set_owner_handler(
    State(state): State<AppState>,
    Json(req): Json<SetOwnerRequest>,
) -> Result<Json<OwnerResponse>, ApiError> {
    match req.new_owner {
        Some(new_owner) => state.call("transfer_ownership", |h| {
            h.transfer_ownership(req.caller, new_owner)
        })?,
        None => state.call("renounce_ownership", |h| h.renounce_ownership(req.caller))?,
    }
    Ok(Json(OwnerResponse {
        owner: state.host.vault().owner(),
    }))
}

// ---------------------------------------------------------------------------
// Ledger Handlers
// ---------------------------------------------------------------------------

async fn deposit_handler(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<PositionResponse>, ApiError> {
    state.call("deposit", |h| h.deposit(req.caller, req.asset, req.amount))?;
    Ok(Json(state.position(req.caller, req.asset)))
}

async fn deposit_native_handler(
    State(state): State<AppState>,
    Json(req): Json<NativeDepositRequest>,
) -> Result<Json<PositionResponse>, ApiError> {
    state.call("deposit_native", |h| h.deposit_native(req.caller, req.value))?;
    Ok(Json(state.position(req.caller, AssetId::NATIVE)))
}

async fn withdraw_handler(
    State(state): State<AppState>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<PositionResponse>, ApiError> {
    state.call("withdraw", |h| h.withdraw(req.caller, req.asset, req.amount))?;
    Ok(Json(state.position(req.caller, req.asset)))
}

async fn withdraw_native_handler(
    State(state): State<AppState>,
    Json(req): Json<NativeWithdrawRequest>,
) -> Result<Json<PositionResponse>, ApiError> {
    state.call("withdraw_native", |h| h.withdraw_native(req.caller, req.amount))?;
    Ok(Json(state.position(req.caller, AssetId::NATIVE)))
}

// ---------------------------------------------------------------------------
// Token & Native Handlers
// ---------------------------------------------------------------------------

/// `POST /tokens/:asset/approve`: sets the vault's allowance on a
/// reference token to exactly `amount`.
async fn approve_handler(
    Path(asset): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<ApproveRequest>,
) -> Result<Json<TokenBalanceResponse>, ApiError> {
    let asset = parse_asset(&asset)?;
    let token = state.token(&asset)?;
    let vault = state.host.vault().address();
    token.approve(req.owner, vault, req.amount);
    tracing::debug!(owner = %req.owner, asset = %asset, amount = req.amount, "vault approved");
    Ok(Json(TokenBalanceResponse {
        address: req.owner,
        asset,
        balance: token.balance_of(req.owner),
        allowance: token.allowance(req.owner, vault),
    }))
}

async fn token_balance_handler(
    Path((asset, address)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Json<TokenBalanceResponse>, ApiError> {
    let asset = parse_asset(&asset)?;
    let address = parse_address(&address)?;
    let token = state.token(&asset)?;
    Ok(Json(TokenBalanceResponse {
        address,
        asset,
        balance: token.balance_of(address),
        allowance: token.allowance(address, state.host.vault().address()),
    }))
}

async fn native_balance_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<NativeBalanceResponse>, ApiError> {
    let address = parse_address(&address)?;
    Ok(Json(NativeBalanceResponse {
        address,
        balance: state.bank.balance_of(address),
    }))
}

// ---------------------------------------------------------------------------
// WebSocket
// ---------------------------------------------------------------------------

/// `GET /ws`: WebSocket upgrade for live event streaming.
///
/// Clients receive one JSON-encoded [`VaultEvent`] per message. Client
/// messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state.events.subscribe()))
}

/// Drives a single WebSocket connection, forwarding broadcast events
/// until the client disconnects or the channel is closed.
async fn handle_ws_connection(mut socket: WebSocket, mut rx: broadcast::Receiver<VaultEvent>) {
    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(ev) => {
                        let payload = match serde_json::to_string(&ev) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!("failed to serialize ws event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

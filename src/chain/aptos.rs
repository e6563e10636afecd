//! Aptos fullnode REST client.
//!
//! Implements `ChainClient` against the node's `/v1` REST API:
//! balances via the fungible-asset view function with a legacy coin-store
//! fallback, symbols via on-chain metadata resources, and router swaps via
//! simulate → encode → sign → submit → poll.
//!
//! API docs: https://fullnode.mainnet.aptoslabs.com/v1/spec

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::wallet::Wallet;
use super::ChainClient;
use crate::types::{AccountInfo, Address, Balance, ChainError, SwapIntent, TokenName, TxHash};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Router entry function (`module::function`) used when none is configured.
pub const DEFAULT_ROUTER_FUNCTION: &str = "router::swap_exact_input";

const FA_BALANCE_FUNCTION: &str = "0x1::primary_fungible_store::balance";
const FA_METADATA_TYPE: &str = "0x1::fungible_asset::Metadata";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Ed25519 signature of all zeros; the node refuses to simulate
/// transactions carrying a valid signature.
const ZERO_SIGNATURE: &str = "0x00000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000";

/// The Hyperion router call.
///
/// Canonical ABI: `{router}::{module}::{function}(from: address, to: address,
/// amount_in: u64, min_amount_out: u64)`, no type arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterCall {
    pub router: Address,
    /// `module::function`
    pub function: String,
}

impl RouterCall {
    pub fn new(router: Address, function: impl Into<String>) -> Self {
        Self {
            router,
            function: function.into(),
        }
    }

    pub fn entry_function(&self) -> String {
        format!("{}::{}", self.router, self.function)
    }

    fn payload(&self, intent: &SwapIntent) -> EntryFunctionPayload {
        EntryFunctionPayload {
            kind: "entry_function_payload",
            function: self.entry_function(),
            type_arguments: Vec::new(),
            arguments: vec![
                intent.from.to_string(),
                intent.to.to_string(),
                intent.amount_in.to_string(),
                intent.min_amount_out.to_string(),
            ],
        }
    }
}

/// Transaction building and confirmation knobs.
#[derive(Debug, Clone)]
pub struct TxOptions {
    pub max_gas_amount: u64,
    /// Seconds from now until the transaction expires.
    pub expiration_secs: i64,
    /// Upper bound on waiting for a submitted transaction to commit.
    pub confirm_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for TxOptions {
    fn default() -> Self {
        Self {
            max_gas_amount: 200_000,
            expiration_secs: 60,
            confirm_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
        }
    }
}

// ---------------------------------------------------------------------------
// API types (node JSON ↔ Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct NodeErrorBody {
    message: String,
    #[serde(default)]
    error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    sequence_number: String,
    authentication_key: String,
}

#[derive(Debug, Deserialize)]
struct GasEstimate {
    gas_estimate: u64,
}

/// A Move resource as returned by `/accounts/{addr}/resource/{type}`.
#[derive(Debug, Deserialize)]
struct MoveResource<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct CoinStoreData {
    coin: CoinValue,
}

#[derive(Debug, Deserialize)]
struct CoinValue {
    value: String,
}

/// Shared shape of `fungible_asset::Metadata` and `coin::CoinInfo<T>`.
#[derive(Debug, Deserialize)]
struct SymbolData {
    symbol: String,
}

#[derive(Debug, Serialize)]
struct ViewRequest {
    function: String,
    type_arguments: Vec<String>,
    arguments: Vec<Value>,
}

#[derive(Debug, Clone, Serialize)]
struct EntryFunctionPayload {
    #[serde(rename = "type")]
    kind: &'static str,
    function: String,
    type_arguments: Vec<String>,
    arguments: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
struct UnsignedTransaction {
    sender: String,
    sequence_number: String,
    max_gas_amount: String,
    gas_unit_price: String,
    expiration_timestamp_secs: String,
    payload: EntryFunctionPayload,
}

#[derive(Debug, Serialize)]
struct SignedTransaction<'a> {
    #[serde(flatten)]
    raw: &'a UnsignedTransaction,
    signature: Ed25519Signature,
}

#[derive(Debug, Serialize)]
struct Ed25519Signature {
    #[serde(rename = "type")]
    kind: &'static str,
    public_key: String,
    signature: String,
}

#[derive(Debug, Deserialize)]
struct PendingTransaction {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct SimulationResult {
    success: bool,
    #[serde(default)]
    vm_status: String,
}

#[derive(Debug, Deserialize)]
struct TransactionStatus {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    vm_status: Option<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct AptosClient {
    http: Client,
    /// Base URL including the `/v1` suffix, no trailing slash.
    node_url: String,
    wallet: Wallet,
    router: RouterCall,
    options: TxOptions,
    /// Symbols are immutable on-chain; resolved ones are kept for the
    /// process lifetime.
    symbols: RwLock<HashMap<Address, String>>,
}

impl AptosClient {
    pub fn new(wallet: Wallet, node_url: &str, router: RouterCall, options: TxOptions) -> Result<Self> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent("hyperion-volume/0.1.0")
            .build()
            .context("Failed to build HTTP client for Aptos node")?;

        info!(
            node = node_url,
            address = %wallet.address(),
            router = %router.entry_function(),
            "Aptos client initialised"
        );

        Ok(Self {
            http,
            node_url: node_url.trim_end_matches('/').to_string(),
            wallet,
            router,
            options,
            symbols: RwLock::new(HashMap::new()),
        })
    }

    // -- HTTP helpers ----------------------------------------------------

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ChainError> {
        let url = format!("{}{path}", self.node_url);
        let resp = self.http.get(&url).send().await?;
        Self::read_response(resp).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ChainError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{path}", self.node_url);
        let resp = self.http.post(&url).json(body).send().await?;
        Self::read_response(resp).await
    }

    async fn read_response<T: DeserializeOwned>(resp: Response) -> Result<T, ChainError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<NodeErrorBody>(&body) {
                Ok(err) => match err.error_code {
                    Some(code) => format!("{} ({code})", err.message),
                    None => err.message,
                },
                Err(_) => body,
            };
            return Err(ChainError::Node {
                status: status.as_u16(),
                message,
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| ChainError::Decode(e.to_string()))
    }

    fn resource_path(owner: &Address, resource_type: &str) -> String {
        format!(
            "/accounts/{owner}/resource/{}",
            urlencoding::encode(resource_type)
        )
    }

    // -- Reads -----------------------------------------------------------

    async fn fungible_balance(&self, token: &Address) -> Result<u64, ChainError> {
        let request = ViewRequest {
            function: FA_BALANCE_FUNCTION.to_string(),
            type_arguments: vec![FA_METADATA_TYPE.to_string()],
            arguments: vec![json!(self.wallet.address()), json!(token)],
        };
        let values: Vec<Value> = self.post_json("/view", &request).await?;
        values
            .first()
            .and_then(parse_u64)
            .ok_or_else(|| ChainError::Decode(format!("balance view returned {values:?}")))
    }

    /// `Ok(None)` when the wallet has no coin store for `token`.
    async fn coin_balance(&self, token: &Address) -> Result<Option<u64>, ChainError> {
        let path = Self::resource_path(
            self.wallet.address(),
            &format!("0x1::coin::CoinStore<{token}>"),
        );
        match self.get_json::<MoveResource<CoinStoreData>>(&path).await {
            Ok(resource) => resource
                .data
                .coin
                .value
                .parse()
                .map(Some)
                .map_err(|_| ChainError::Decode(format!("coin value {:?}", resource.data.coin.value))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn resource_symbol(&self, token: &Address, resource_type: &str) -> Result<String, ChainError> {
        let path = Self::resource_path(token, resource_type);
        let resource: MoveResource<SymbolData> = self.get_json(&path).await?;
        let symbol = resource.data.symbol.trim().to_string();
        if symbol.is_empty() {
            return Err(ChainError::Decode(format!("empty symbol in {resource_type}")));
        }
        Ok(symbol)
    }

    // -- Transaction pipeline --------------------------------------------

    async fn build_transaction(&self, intent: &SwapIntent) -> Result<UnsignedTransaction, ChainError> {
        let account = self.account_info().await?;
        let gas: GasEstimate = self.get_json("/estimate_gas_price").await?;
        let expiration = Utc::now().timestamp() + self.options.expiration_secs;

        Ok(UnsignedTransaction {
            sender: self.wallet.address().to_string(),
            sequence_number: account.sequence_number.to_string(),
            max_gas_amount: self.options.max_gas_amount.to_string(),
            gas_unit_price: gas.gas_estimate.to_string(),
            expiration_timestamp_secs: expiration.to_string(),
            payload: self.router.payload(intent),
        })
    }

    /// Dry-run against current state. Fails without side effects when the
    /// node predicts an abort.
    async fn simulate(&self, raw: &UnsignedTransaction) -> Result<(), ChainError> {
        let body = SignedTransaction {
            raw,
            signature: Ed25519Signature {
                kind: "ed25519_signature",
                public_key: self.wallet.public_key_hex(),
                signature: ZERO_SIGNATURE.to_string(),
            },
        };
        let results: Vec<SimulationResult> = self.post_json("/transactions/simulate", &body).await?;
        let result = results
            .into_iter()
            .next()
            .ok_or_else(|| ChainError::Decode("empty simulation response".into()))?;

        if !result.success {
            return Err(ChainError::SimulationFailed {
                vm_status: result.vm_status,
            });
        }
        debug!(vm_status = %result.vm_status, "Simulation succeeded");
        Ok(())
    }

    async fn sign<'a>(&self, raw: &'a UnsignedTransaction) -> Result<SignedTransaction<'a>, ChainError> {
        let message: String = self.post_json("/transactions/encode_submission", raw).await?;
        let bytes = hex::decode(message.trim_start_matches("0x"))
            .map_err(|e| ChainError::Signing(format!("signing message is not hex: {e}")))?;

        Ok(SignedTransaction {
            raw,
            signature: Ed25519Signature {
                kind: "ed25519_signature",
                public_key: self.wallet.public_key_hex(),
                signature: self.wallet.sign_hex(&bytes),
            },
        })
    }

    async fn wait_for_transaction(&self, hash: &TxHash) -> Result<(), ChainError> {
        let timeout = self.options.confirm_timeout;
        match tokio::time::timeout(timeout, self.poll_until_committed(hash)).await {
            Ok(result) => result,
            Err(_) => Err(ChainError::ConfirmationTimeout {
                hash: hash.clone(),
                timeout_secs: timeout.as_secs(),
            }),
        }
    }

    async fn poll_until_committed(&self, hash: &TxHash) -> Result<(), ChainError> {
        let path = format!("/transactions/by_hash/{hash}");
        loop {
            match self.get_json::<TransactionStatus>(&path).await {
                Ok(tx) if tx.kind != "pending_transaction" => {
                    return match tx.success {
                        Some(true) => Ok(()),
                        _ => Err(ChainError::ExecutionFailed {
                            hash: hash.clone(),
                            vm_status: tx.vm_status.unwrap_or_else(|| "unknown".into()),
                        }),
                    };
                }
                Ok(_) => debug!(hash = %hash, "Transaction pending"),
                Err(e) if e.is_not_found() => debug!(hash = %hash, "Transaction not yet indexed"),
                Err(e) => warn!(hash = %hash, error = %e, "Transaction status poll failed"),
            }
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }
}

/// View functions return u64 as a JSON string; accept bare numbers too.
fn parse_u64(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

#[async_trait]
impl ChainClient for AptosClient {
    fn address(&self) -> Address {
        self.wallet.address().clone()
    }

    async fn token_balance(&self, token: &Address) -> Balance {
        let fungible = match self.fungible_balance(token).await {
            Ok(amount) if amount > 0 => return Balance::Available(amount),
            Ok(zero) => Ok(zero),
            Err(e) => {
                debug!(token = %token, error = %e, "Fungible asset balance query failed");
                Err(e)
            }
        };

        match (self.coin_balance(token).await, fungible) {
            (Ok(Some(amount)), _) => Balance::Available(amount),
            (Ok(None), Ok(_)) => Balance::Available(0),
            (Ok(None), Err(_)) => Balance::Missing,
            // Zero in the primary store says nothing about the coin store.
            (Err(coin_err), Ok(_)) => {
                debug!(token = %token, error = %coin_err, "Coin store balance query failed");
                Balance::Unavailable {
                    reason: format!("coin store: {coin_err}"),
                }
            }
            (Err(coin_err), Err(fa_err)) => {
                debug!(token = %token, error = %coin_err, "Coin store balance query failed");
                Balance::Unavailable {
                    reason: format!("fungible asset: {fa_err}; coin store: {coin_err}"),
                }
            }
        }
    }

    async fn token_name(&self, token: &Address) -> TokenName {
        if let Some(symbol) = self.symbols.read().await.get(token) {
            return TokenName::Symbol(symbol.clone());
        }

        let symbol = match self.resource_symbol(token, FA_METADATA_TYPE).await {
            Ok(symbol) => Some(symbol),
            Err(fa_err) => {
                debug!(token = %token, error = %fa_err, "No fungible asset metadata");
                let coin_info = format!("0x1::coin::CoinInfo<{token}>");
                match self.resource_symbol(token, &coin_info).await {
                    Ok(symbol) => Some(symbol),
                    Err(coin_err) => {
                        debug!(token = %token, error = %coin_err, "No coin info");
                        None
                    }
                }
            }
        };

        match symbol {
            Some(symbol) => {
                self.symbols
                    .write()
                    .await
                    .insert(token.clone(), symbol.clone());
                TokenName::Symbol(symbol)
            }
            None => TokenName::Fallback(token.short()),
        }
    }

    async fn execute_swap(&self, intent: &SwapIntent) -> Result<TxHash, ChainError> {
        info!(
            amount_in = intent.amount_in,
            min_amount_out = intent.min_amount_out,
            from = %intent.from.short(),
            to = %intent.to.short(),
            "Preparing swap"
        );

        let raw = self.build_transaction(intent).await?;

        debug!("Simulating transaction");
        self.simulate(&raw).await?;

        let signed = self.sign(&raw).await?;
        let pending: PendingTransaction = self.post_json("/transactions", &signed).await?;
        let hash = TxHash(pending.hash);
        info!(hash = %hash, "Transaction submitted");

        self.wait_for_transaction(&hash).await?;
        info!(hash = %hash, "Transaction executed");

        Ok(hash)
    }

    async fn account_info(&self) -> Result<AccountInfo, ChainError> {
        let path = format!("/accounts/{}", self.wallet.address());
        let account: AccountResponse = self.get_json(&path).await?;
        let sequence_number = account.sequence_number.parse().map_err(|_| {
            ChainError::Decode(format!("sequence number {:?}", account.sequence_number))
        })?;

        Ok(AccountInfo {
            sequence_number,
            authentication_key: account.authentication_key,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

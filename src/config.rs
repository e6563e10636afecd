//! Configuration loading from environment variables with an optional TOML file.
//!
//! Every setting is read from the environment (a `.env` file is loaded by
//! `main` first). Non-secret settings may also come from `volume.toml`;
//! the environment wins when both are set. The private key is env-only.
//! Validation is eager: any violation aborts startup before network I/O.

use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::chain::aptos::DEFAULT_ROUTER_FUNCTION;
use crate::chain::wallet::{Wallet, WalletError};
use crate::strategy::pacing::{Pacing, PacingError};
use crate::strategy::slippage::{Slippage, SlippageError};
use crate::types::{Address, AddressError, TokenPair};

/// Config file read when `VOLUME_CONFIG` is not set.
pub const DEFAULT_CONFIG_FILE: &str = "volume.toml";

/// Env var naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "VOLUME_CONFIG";

const DEFAULT_MAX_GAS_AMOUNT: u64 = 200_000;

// Env var names.
const NETWORK: &str = "APTOS_NETWORK";
const NODE_URL: &str = "APTOS_NODE_URL";
const PRIVATE_KEY: &str = "PRIVATE_KEY";
const ROUTER: &str = "HYPERION_ROUTER";
const ROUTER_FUNCTION: &str = "ROUTER_FUNCTION";
const MAX_GAS_AMOUNT: &str = "MAX_GAS_AMOUNT";
const TOKEN_A: &str = "TOKEN_A_ADDRESS";
const TOKEN_B: &str = "TOKEN_B_ADDRESS";
const TOKEN_A_ALIAS: &str = "USDT_ADDRESS";
const TOKEN_B_ALIAS: &str = "USDC_ADDRESS";
const SLIPPAGE: &str = "SLIPPAGE_PERCENT";
const MIN_SLEEP: &str = "MIN_SLEEP_SECONDS";
const MAX_SLEEP: &str = "MAX_SLEEP_SECONDS";
const LOG_LEVEL: &str = "LOG_LEVEL";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("{field} is not a valid address: {source}")]
    InvalidAddress {
        field: &'static str,
        source: AddressError,
    },

    #[error("PRIVATE_KEY is invalid: {0}")]
    PrivateKey(#[from] WalletError),

    #[error("SLIPPAGE_PERCENT is invalid: {0}")]
    Slippage(#[from] SlippageError),

    #[error("Invalid sleep bounds: {0}")]
    Pacing(#[from] PacingError),

    #[error("{field} must be a non-negative integer, got {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Unknown network {0:?} (expected mainnet, testnet, devnet or local)")]
    UnknownNetwork(String),

    #[error("Unknown log level {0:?} (expected debug, info, warn or error)")]
    UnknownLogLevel(String),

    #[error("ROUTER_FUNCTION must look like module::function, got {0:?}")]
    InvalidRouterFunction(String),

    #[error("Token A and token B must differ (both {0})")]
    SameToken(Address),

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseFile {
        path: String,
        source: toml::de::Error,
    },
}

// ---------------------------------------------------------------------------
// Network / log level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet,
    Devnet,
    Local,
}

impl Network {
    /// Public fullnode REST endpoint (with `/v1`).
    pub fn default_node_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://api.mainnet.aptoslabs.com/v1",
            Network::Testnet => "https://api.testnet.aptoslabs.com/v1",
            Network::Devnet => "https://api.devnet.aptoslabs.com/v1",
            Network::Local => "http://127.0.0.1:8080/v1",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
            Network::Devnet => write!(f, "devnet"),
            Network::Local => write!(f, "local"),
        }
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "devnet" => Ok(Network::Devnet),
            "local" | "localnet" => Ok(Network::Local),
            _ => Err(ConfigError::UnknownNetwork(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ConfigError::UnknownLogLevel(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Optional TOML file
// ---------------------------------------------------------------------------

/// `volume.toml` layout. Every field is optional; values are fed through
/// the same validation as env vars.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub network: NetworkSection,
    #[serde(default)]
    pub router: RouterSection,
    #[serde(default)]
    pub trading: TradingSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkSection {
    pub name: Option<String>,
    pub node_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterSection {
    pub address: Option<String>,
    pub function: Option<String>,
    pub max_gas_amount: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TradingSection {
    pub token_a: Option<String>,
    pub token_b: Option<String>,
    /// String or number; read as a decimal, never through a float.
    pub slippage_percent: Option<toml::Value>,
    pub min_sleep_seconds: Option<u64>,
    pub max_sleep_seconds: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    pub level: Option<String>,
}

impl FileConfig {
    /// Read a TOML file. A missing file yields the empty config unless
    /// `required` is set.
    pub fn load(path: &str, required: bool) -> Result<Self, ConfigError> {
        if !required && !Path::new(path).exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_string(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    pub fn parse(contents: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::ParseFile {
            path: path.to_string(),
            source,
        })
    }

    /// Flatten into env-var-keyed values.
    fn into_values(self) -> HashMap<&'static str, String> {
        let slippage = self.trading.slippage_percent.map(|v| match v {
            toml::Value::String(s) => s,
            other => other.to_string(),
        });

        [
            (NETWORK, self.network.name),
            (NODE_URL, self.network.node_url),
            (ROUTER, self.router.address),
            (ROUTER_FUNCTION, self.router.function),
            (MAX_GAS_AMOUNT, self.router.max_gas_amount.map(|v| v.to_string())),
            (TOKEN_A, self.trading.token_a),
            (TOKEN_B, self.trading.token_b),
            (SLIPPAGE, slippage),
            (MIN_SLEEP, self.trading.min_sleep_seconds.map(|v| v.to_string())),
            (MAX_SLEEP, self.trading.max_sleep_seconds.map(|v| v.to_string())),
            (LOG_LEVEL, self.logging.level),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
    }
}

// ---------------------------------------------------------------------------
// Application config
// ---------------------------------------------------------------------------

/// Validated, immutable runtime configuration.
#[derive(Debug)]
pub struct AppConfig {
    pub network: Network,
    pub node_url: String,
    pub private_key: SecretString,
    pub router: Address,
    /// `module::function` of the router entry point.
    pub router_function: String,
    pub max_gas_amount: u64,
    pub pair: TokenPair,
    pub slippage: Slippage,
    pub pacing: Pacing,
    pub log_level: LogLevel,
}

impl AppConfig {
    /// Load from the process environment plus the optional config file.
    pub fn load() -> Result<Self, ConfigError> {
        let (path, required) = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => (path, true),
            Err(_) => (DEFAULT_CONFIG_FILE.to_string(), false),
        };
        let file = FileConfig::load(&path, required)?.into_values();

        Self::from_lookup(|key| {
            std::env::var(key)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .or_else(|| file.get(key).cloned())
        })
    }

    /// Build and validate from any key → value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));
        let address = |field: &'static str, raw: String| {
            Address::parse(&raw).map_err(|source| ConfigError::InvalidAddress { field, source })
        };
        let number = |field: &'static str, default: u64| -> Result<u64, ConfigError> {
            match get(field) {
                None => Ok(default),
                Some(v) => v.parse().map_err(|_| ConfigError::InvalidNumber { field, value: v }),
            }
        };

        let network = match get(NETWORK) {
            Some(v) => v.parse()?,
            None => Network::Mainnet,
        };
        let node_url = get(NODE_URL).unwrap_or_else(|| network.default_node_url().to_string());

        let private_key = SecretString::new(require(PRIVATE_KEY)?);
        Wallet::from_private_key(&private_key)?;

        let router = address(ROUTER, require(ROUTER)?)?;
        let router_function = get(ROUTER_FUNCTION).unwrap_or_else(|| DEFAULT_ROUTER_FUNCTION.to_string());
        if !is_module_function(&router_function) {
            return Err(ConfigError::InvalidRouterFunction(router_function));
        }
        let max_gas_amount = number(MAX_GAS_AMOUNT, DEFAULT_MAX_GAS_AMOUNT)?;
        if max_gas_amount == 0 {
            return Err(ConfigError::Zero { field: MAX_GAS_AMOUNT });
        }

        let token_a = match get(TOKEN_A) {
            Some(v) => address(TOKEN_A, v)?,
            None => address(TOKEN_A_ALIAS, get(TOKEN_A_ALIAS).ok_or(ConfigError::Missing(TOKEN_A))?)?,
        };
        let token_b = match get(TOKEN_B) {
            Some(v) => address(TOKEN_B, v)?,
            None => address(TOKEN_B_ALIAS, get(TOKEN_B_ALIAS).ok_or(ConfigError::Missing(TOKEN_B))?)?,
        };
        if token_a == token_b {
            return Err(ConfigError::SameToken(token_a));
        }

        let slippage = match get(SLIPPAGE) {
            Some(v) => v.parse::<Slippage>()?,
            None => Slippage::default(),
        };
        let pacing = Pacing::new(number(MIN_SLEEP, 10)?, number(MAX_SLEEP, 30)?)?;

        let log_level = match get(LOG_LEVEL) {
            Some(v) => v.parse()?,
            None => LogLevel::Info,
        };

        Ok(Self {
            network,
            node_url,
            private_key,
            router,
            router_function,
            max_gas_amount,
            pair: TokenPair::new(token_a, token_b),
            slippage,
            pacing,
            log_level,
        })
    }

    pub fn wallet(&self) -> Result<Wallet, WalletError> {
        Wallet::from_private_key(&self.private_key)
    }
}

fn is_module_function(s: &str) -> bool {
    let ident = |p: &str| {
        !p.is_empty()
            && p.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !p.starts_with(|c: char| c.is_ascii_digit())
    };
    match s.split("::").collect::<Vec<_>>().as_slice() {
        [module, function] => ident(module) && ident(function),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

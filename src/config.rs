//! Service configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Collaborators that have a stub
//! implementation (storage, payment gateway, identity) are selected here
//! once, at startup.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};

use crate::domain::{Role, UserId};
use crate::gateway::StubBehavior;

const DEFAULT_RAZORPAY_URL: &str = "https://api.razorpay.com";
const STUB_KEY_ID: &str = "rzp_test_stub";
const STUB_KEY_SECRET: &str = "stub_key_secret";
const DEV_TICKET_SECRET: &str = "dev_ticket_secret";

/// Where events and bookings are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process-local maps; data is lost on restart.
    Memory,
    /// PostgreSQL through `sqlx`.
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => bail!("unknown STORAGE_BACKEND: {other}"),
        }
    }
}

/// Which payment gateway adapter to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayKind {
    /// Razorpay REST API.
    Razorpay,
    /// In-process stub.
    Stub,
}

impl FromStr for GatewayKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "razorpay" => Ok(Self::Razorpay),
            "stub" => Ok(Self::Stub),
            other => bail!("unknown PAYMENT_GATEWAY: {other}"),
        }
    }
}

/// How the caller identity is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Trust `x-user-id` / `x-user-role` from the authenticating proxy.
    Headers,
    /// Every request acts as the configured stub user.
    Stub,
}

impl FromStr for AuthMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "headers" | "header" => Ok(Self::Headers),
            "stub" => Ok(Self::Stub),
            other => bail!("unknown AUTH_MODE: {other}"),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => bail!("unknown LOG_FORMAT: {other}"),
        }
    }
}

/// Top-level service configuration.
///
/// Loaded once at startup via [`AppConfig::from_env`].
#[derive(Clone)]
pub struct AppConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,
    /// Storage backend.
    pub storage_backend: StorageBackend,
    /// PostgreSQL connection string (required for [`StorageBackend::Postgres`]).
    pub database_url: Option<String>,
    /// Maximum number of database connections in the pool.
    pub database_max_connections: u32,
    /// Minimum idle connections in the pool.
    pub database_min_connections: u32,
    /// Timeout in seconds for acquiring a database connection.
    pub database_connect_timeout_secs: u64,
    /// Payment gateway adapter.
    pub payment_gateway: GatewayKind,
    /// Behaviour of the stub gateway.
    pub stub_gateway_behavior: StubBehavior,
    /// Public gateway key id.
    pub razorpay_key_id: String,
    /// Gateway key secret, also used to verify payment signatures.
    pub razorpay_key_secret: String,
    /// Gateway API base URL.
    pub razorpay_base_url: String,
    /// ISO currency code for orders.
    pub payment_currency: String,
    /// Upper bound for a single gateway call.
    pub gateway_timeout: Duration,
    /// Secret for ticket verification tokens.
    pub ticket_secret: String,
    /// Identity provider.
    pub auth_mode: AuthMode,
    /// User id for [`AuthMode::Stub`].
    pub stub_user_id: UserId,
    /// Role for [`AuthMode::Stub`].
    pub stub_user_role: Role,
    /// Whole-request timeout.
    pub request_timeout: Duration,
    /// Log output format.
    pub log_format: LogFormat,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("listen_addr", &self.listen_addr)
            .field("storage_backend", &self.storage_backend)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("database_max_connections", &self.database_max_connections)
            .field("database_min_connections", &self.database_min_connections)
            .field("payment_gateway", &self.payment_gateway)
            .field("stub_gateway_behavior", &self.stub_gateway_behavior)
            .field("razorpay_key_id", &self.razorpay_key_id)
            .field("razorpay_base_url", &self.razorpay_base_url)
            .field("payment_currency", &self.payment_currency)
            .field("gateway_timeout", &self.gateway_timeout)
            .field("auth_mode", &self.auth_mode)
            .field("request_timeout", &self.request_timeout)
            .field("log_format", &self.log_format)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed, or if a real
    /// collaborator is selected without its credentials.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let listen_addr: SocketAddr = var("LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse()
            .context("LISTEN_ADDR is not a socket address")?;

        let storage_backend = parse_or(var("STORAGE_BACKEND"), StorageBackend::Memory)?;
        let database_url = var("DATABASE_URL");
        if storage_backend == StorageBackend::Postgres && database_url.is_none() {
            bail!("STORAGE_BACKEND=postgres requires DATABASE_URL");
        }

        let payment_gateway = parse_or(var("PAYMENT_GATEWAY"), GatewayKind::Stub)?;
        let stub_gateway_behavior = match var("STUB_GATEWAY_BEHAVIOR") {
            Some(raw) => raw.parse().map_err(anyhow::Error::msg)?,
            None => StubBehavior::Succeed,
        };
        let (razorpay_key_id, razorpay_key_secret) = match payment_gateway {
            GatewayKind::Razorpay => (
                var("RAZORPAY_KEY_ID").context("PAYMENT_GATEWAY=razorpay requires RAZORPAY_KEY_ID")?,
                var("RAZORPAY_KEY_SECRET")
                    .context("PAYMENT_GATEWAY=razorpay requires RAZORPAY_KEY_SECRET")?,
            ),
            GatewayKind::Stub => (
                var("RAZORPAY_KEY_ID").unwrap_or_else(|| STUB_KEY_ID.to_string()),
                var("RAZORPAY_KEY_SECRET").unwrap_or_else(|| STUB_KEY_SECRET.to_string()),
            ),
        };
        let ticket_secret = match (var("TICKET_SECRET"), payment_gateway) {
            (Some(secret), _) => secret,
            (None, GatewayKind::Stub) => DEV_TICKET_SECRET.to_string(),
            (None, GatewayKind::Razorpay) => {
                bail!("PAYMENT_GATEWAY=razorpay requires TICKET_SECRET")
            }
        };

        let auth_mode = parse_or(var("AUTH_MODE"), AuthMode::Headers)?;
        let stub_user_id = match var("STUB_USER_ID") {
            Some(raw) => UserId::from_uuid(raw.parse().context("STUB_USER_ID is not a UUID")?),
            None => UserId::from_uuid(uuid::Uuid::nil()),
        };
        let stub_user_role = match var("STUB_USER_ROLE") {
            Some(raw) => raw.parse().map_err(|e| anyhow::anyhow!("STUB_USER_ROLE: {e}"))?,
            None => Role::User,
        };

        Ok(Self {
            listen_addr,
            storage_backend,
            database_url,
            database_max_connections: parse_num(var("DATABASE_MAX_CONNECTIONS"), 10)?,
            database_min_connections: parse_num(var("DATABASE_MIN_CONNECTIONS"), 2)?,
            database_connect_timeout_secs: parse_num(var("DATABASE_CONNECT_TIMEOUT_SECS"), 5)?,
            payment_gateway,
            stub_gateway_behavior,
            razorpay_key_id,
            razorpay_key_secret,
            razorpay_base_url: var("RAZORPAY_BASE_URL")
                .unwrap_or_else(|| DEFAULT_RAZORPAY_URL.to_string()),
            payment_currency: var("PAYMENT_CURRENCY").unwrap_or_else(|| "INR".to_string()),
            gateway_timeout: Duration::from_millis(parse_num(var("GATEWAY_TIMEOUT_MS"), 10_000)?),
            ticket_secret,
            auth_mode,
            stub_user_id,
            stub_user_role,
            request_timeout: Duration::from_secs(parse_num(var("REQUEST_TIMEOUT_SECS"), 30)?),
            log_format: parse_or(var("LOG_FORMAT"), LogFormat::Pretty)?,
        })
    }
}

fn parse_or<T>(raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr<Err = anyhow::Error>,
{
    raw.map_or(Ok(default), |value| value.parse())
}

fn parse_num<T>(raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("invalid number: {value}")),
        None => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_select_local_collaborators() {
        let Ok(config) = load(&[]) else {
            panic!("defaults should load");
        };
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.payment_gateway, GatewayKind::Stub);
        assert_eq!(config.auth_mode, AuthMode::Headers);
        assert_eq!(config.payment_currency, "INR");
        assert_eq!(config.gateway_timeout, Duration::from_secs(10));
        assert_eq!(config.listen_addr.port(), 3000);
    }

    #[test]
    fn real_collaborators_need_credentials() {
        assert!(load(&[("STORAGE_BACKEND", "postgres")]).is_err());
        assert!(load(&[("PAYMENT_GATEWAY", "razorpay")]).is_err());
        assert!(
            load(&[
                ("PAYMENT_GATEWAY", "razorpay"),
                ("RAZORPAY_KEY_ID", "rzp_live_x"),
                ("RAZORPAY_KEY_SECRET", "secret"),
            ])
            .is_err()
        );
        let Ok(config) = load(&[
            ("PAYMENT_GATEWAY", "razorpay"),
            ("RAZORPAY_KEY_ID", "rzp_live_x"),
            ("RAZORPAY_KEY_SECRET", "secret"),
            ("TICKET_SECRET", "tickets"),
        ]) else {
            panic!("complete razorpay config should load");
        };
        assert_eq!(config.razorpay_key_id, "rzp_live_x");
    }

    #[test]
    fn stub_identity_and_behavior_parse() {
        let Ok(config) = load(&[
            ("AUTH_MODE", "stub"),
            ("STUB_USER_ID", "6f1c1d2e-0000-4000-8000-000000000001"),
            ("STUB_USER_ROLE", "admin"),
            ("STUB_GATEWAY_BEHAVIOR", "fail_fetch"),
            ("LOG_FORMAT", "json"),
        ]) else {
            panic!("stub config should load");
        };
        assert_eq!(config.auth_mode, AuthMode::Stub);
        assert_eq!(config.stub_user_role, Role::Admin);
        assert_eq!(config.stub_gateway_behavior, StubBehavior::FailFetch);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(load(&[("LISTEN_ADDR", "nowhere")]).is_err());
        assert!(load(&[("GATEWAY_TIMEOUT_MS", "soon")]).is_err());
        assert!(load(&[("AUTH_MODE", "magic")]).is_err());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let Ok(config) = load(&[("TICKET_SECRET", "super-secret-value")]) else {
            panic!("config should load");
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-value"));
        assert!(!debug.contains(STUB_KEY_SECRET));
    }
}

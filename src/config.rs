use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Booking API location and endpoint paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// `{id}` is replaced by the booking id
    pub booking_path: String,
    pub verify_path: String,
    pub list_path: String,
    pub refresh_path: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "http://127.0.0.1:8000/api".to_string(),
            booking_path: "/bookings/{id}/".to_string(),
            verify_path: "/bookings/payments/verify/".to_string(),
            list_path: "/bookings/view/".to_string(),
            refresh_path: "/token/refresh/".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

/// Reconciliation poller tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    pub interval_ms: u64,
    /// Attempts served by the booking detail endpoint before switching to verification
    pub escalate_after: u32,
    /// Hard ceiling on a session, 0 disables it
    pub max_session_secs: u64,
    /// Query parameter carrying the order marker
    pub order_param: String,
}

impl Default for PollerConfig {
    fn default() -> Self {
        PollerConfig {
            interval_ms: 2000,
            escalate_after: 5,
            max_session_secs: 600,
            order_param: "order_id".to_string(),
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        // tokio intervals panic on a zero period
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn max_session(&self) -> Option<Duration> {
        (self.max_session_secs > 0).then(|| Duration::from_secs(self.max_session_secs))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub poller: PollerConfig,
    pub token_db: String,
    pub status_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api: ApiConfig::default(),
            poller: PollerConfig::default(),
            token_db: "./data/tokens.db".to_string(),
            status_port: None,
        }
    }
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).context("Failed to parse configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("Invalid config file: {}", path.display()))
    }
}

#[derive(Debug, Subcommand, Clone)]
pub enum Commands {
    /// Reconcile the payment of the booking referenced by a page URL
    Reconcile {
        /// Page URL the payment provider redirected back to
        #[arg(long)]
        page_url: String,
    },
    /// Store an access/refresh token pair
    Login {
        #[arg(long)]
        access: String,
        #[arg(long)]
        refresh: String,
    },
    /// Forget the stored token pair
    Logout,
    /// List the signed-in user's bookings
    Bookings,
}

/// CLI is *input*, not final configuration
#[derive(Debug, Parser, Clone)]
#[command(name = "booking-reconciler", version)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub api_url: Option<String>,

    #[arg(long)]
    pub token_db: Option<String>,

    #[arg(long)]
    pub interval_ms: Option<u64>,

    #[arg(long)]
    pub escalate_after: Option<u32>,

    #[arg(long)]
    pub max_session_secs: Option<u64>,

    /// Serve the session snapshot on 127.0.0.1:<port>
    #[arg(long)]
    pub status_port: Option<u16>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn into_config(self) -> Result<(Config, Commands)> {
        let mut cfg = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(url) = self.api_url {
            cfg.api.base_url = url;
        }
        if let Some(db) = self.token_db {
            cfg.token_db = db;
        }
        if let Some(ms) = self.interval_ms {
            cfg.poller.interval_ms = ms;
        }
        if let Some(n) = self.escalate_after {
            cfg.poller.escalate_after = n;
        }
        if let Some(secs) = self.max_session_secs {
            cfg.poller.max_session_secs = secs;
        }
        if let Some(port) = self.status_port {
            cfg.status_port = Some(port);
        }

        Ok((cfg, self.command))
    }
}

//! POS configuration

use std::path::PathBuf;

use clap::{Args, Parser};

use crate::{gateway::HttpGatewayConfig, payments::PaymentMethod};

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "warn")]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

/// Backend API settings.
#[derive(Debug, Args)]
pub struct BackendConfig {
    /// Base URL of the backend API
    #[arg(long, env = "POS_API_URL", default_value = "http://localhost:3000/api")]
    pub api_url: String,

    /// Bearer token for the backend API
    #[arg(long, env = "POS_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,
}

impl BackendConfig {
    /// Gateway settings for these backend settings.
    #[must_use]
    pub fn gateway(&self) -> HttpGatewayConfig {
        HttpGatewayConfig {
            base_url: self.api_url.clone(),
            token: self.api_token.clone(),
        }
    }
}

/// Point of sale configuration
#[derive(Debug, Parser)]
#[command(name = "pos", about = "Auto-parts point of sale checkout", long_about = None)]
pub struct PosConfig {
    /// Fixture set to load
    #[arg(short, long, env = "POS_FIXTURE", default_value = "workshop")]
    pub fixture: String,

    /// Directory holding the fixture sets
    #[arg(long, env = "POS_FIXTURES_DIR", default_value = "./fixtures")]
    pub fixtures_dir: PathBuf,

    /// Override the cart's payment method
    #[arg(long, value_enum)]
    pub payment: Option<PaymentMethod>,

    /// Submit the sale to the backend after printing the receipt
    #[arg(long, default_value_t = false)]
    pub submit: bool,

    /// Logging output settings.
    #[command(flatten)]
    pub logging: LoggingConfig,

    /// Backend API settings.
    #[command(flatten)]
    pub backend: BackendConfig,
}

impl PosConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }
}

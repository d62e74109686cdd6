use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
///
/// Every credential is required; the process refuses to start when one is
/// absent. The remaining values carry the same defaults the hosted service
/// runs with.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub verify_token: String,
    pub gemini_api_key: String,
    pub whatsapp_api_token: String,
    pub phone_number_id: String,
    pub graph_api_base_url: String,
    pub chat_model: String,
    pub log_level: Level,
    pub debug: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let verify_token = require_var("VERIFY_TOKEN")?;
        let gemini_api_key = require_var("GEMINI_API_KEY")?;
        let whatsapp_api_token = require_var("WHATSAPP_API_TOKEN")?;
        let phone_number_id = require_var("PHONE_NUMBER_ID")?;

        let graph_api_base_url = std::env::var("GRAPH_API_BASE_URL")
            .unwrap_or_else(|_| "https://graph.facebook.com/v19.0".to_string());

        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string());

        let debug = std::env::var("DEBUG")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        // The debug flag lowers the default log level; RUST_LOG still wins.
        let default_level = if debug { "DEBUG" } else { "INFO" };
        let log_level_str =
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            verify_token,
            gemini_api_key,
            whatsapp_api_token,
            phone_number_id,
            graph_api_base_url,
            chat_model,
            log_level,
            debug,
        })
    }

    /// The full WhatsApp Cloud API URL for sending messages.
    pub fn whatsapp_api_url(&self) -> String {
        format!(
            "{}/{}/messages",
            self.graph_api_base_url, self.phone_number_id
        )
    }
}

fn require_var(name: &str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name.to_string())),
    }
}

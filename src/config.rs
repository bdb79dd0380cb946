use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::time::Duration;

/// Runtime mode, forwarded to the gateway as the webhook-mode header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMode {
    Production,
    Development,
}

impl RuntimeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeMode::Production => "production",
            RuntimeMode::Development => "development",
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(RuntimeMode::Production),
            "development" | "dev" | "" => Ok(RuntimeMode::Development),
            other => bail!("APP_ENV must be 'production' or 'development', got '{}'", other),
        }
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub gateway_base_url: String,
    pub gateway_client_id: String,
    pub gateway_client_secret: String,
    pub gateway_timeout: Duration,
    pub webhook_secret: String,
    pub runtime_mode: RuntimeMode,
    pub log_format: LogFormat,
    pub allowed_origins: AllowedOrigins,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String> {
            match lookup(key) {
                Some(value) if !value.trim().is_empty() => Ok(value),
                _ => bail!("{} must be set", key),
            }
        };

        let gateway_timeout_secs: u64 = lookup("GATEWAY_TIMEOUT_SECS")
            .unwrap_or_else(|| "8".to_string())
            .parse()
            .context("GATEWAY_TIMEOUT_SECS must be a whole number of seconds")?;
        if gateway_timeout_secs == 0 {
            bail!("GATEWAY_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Config {
            server_port: lookup("SERVER_PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .context("SERVER_PORT must be a port number")?,
            database_url: required("DATABASE_URL")?,
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a number")?,
            gateway_base_url: required("GATEWAY_BASE_URL")?,
            gateway_client_id: required("GATEWAY_CLIENT_ID")?,
            gateway_client_secret: required("GATEWAY_CLIENT_SECRET")?,
            gateway_timeout: Duration::from_secs(gateway_timeout_secs),
            webhook_secret: required("WEBHOOK_SECRET")?,
            runtime_mode: RuntimeMode::parse(&lookup("APP_ENV").unwrap_or_default())?,
            log_format: match lookup("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            allowed_origins: parse_allowed_origins(
                &lookup("CORS_ALLOWED_ORIGINS").unwrap_or_else(|| "*".to_string()),
            )?,
        })
    }
}

fn parse_allowed_origins(raw: &str) -> Result<AllowedOrigins> {
    let value = raw.trim();
    if value == "*" {
        return Ok(AllowedOrigins::Any);
    }

    let origins = value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();

    if origins.is_empty() {
        bail!("CORS_ALLOWED_ORIGINS must be '*' or a comma-separated list of origins");
    }

    Ok(AllowedOrigins::List(origins))
}

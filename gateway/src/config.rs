//! Configuration module for environment variable parsing.
//!
//! All configuration is read from environment variables. Blank values are
//! treated as unset.

use std::env;
use tracing::warn;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// AWS region of the queue service
    pub aws_region: String,

    /// Endpoint override, e.g. LocalStack or ElasticMQ
    pub aws_endpoint_url: Option<String>,

    /// Static access key; only used together with `aws_secret_access_key`
    pub aws_access_key_id: Option<String>,

    pub aws_secret_access_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: 8080,
            aws_region: "us-east-1".to_string(),
            aws_endpoint_url: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            port: parse_number("PORT", defaults.port),

            aws_region: non_blank("AWS_REGION").unwrap_or(defaults.aws_region),

            aws_endpoint_url: non_blank("AWS_ENDPOINT_URL"),

            aws_access_key_id: non_blank("AWS_ACCESS_KEY_ID"),

            aws_secret_access_key: non_blank("AWS_SECRET_ACCESS_KEY"),
        }
    }

    /// Whether both halves of a static credential pair are present.
    pub fn has_static_credentials(&self) -> bool {
        self.aws_access_key_id.is_some() && self.aws_secret_access_key.is_some()
    }
}

/// Parse a numeric variable, falling back to `default` when unset or invalid.
fn parse_number<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    let raw = match non_blank(name) {
        Some(v) => v,
        None => return default,
    };

    match raw.parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid number, using default");
            default
        }
    }
}

/// Read a variable, mapping unset and blank values to `None`.
fn non_blank(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

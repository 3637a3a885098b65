//! Environment-based configuration for the embedding service.
//!
//! The compatibility core takes its base URL and token at construction;
//! this helper is the conventional way an embedder sources them. A `.env`
//! file is honored when present (development convenience), the process
//! environment always wins.

use redcap::{FormatError, Token};
use thiserror::Error;
use url::Url;

/// Environment variable naming the endpoint URL.
pub const ENV_API_URL: &str = "REDCAP_API_URL";
/// Environment variable naming the API token.
pub const ENV_API_TOKEN: &str = "REDCAP_API_TOKEN";

/// Connection settings for one REDCap project.
#[derive(Debug, Clone)]
pub struct RedcapConfig {
    /// The project's single endpoint URL.
    pub base_url: Url,
    /// The project's API token.
    pub token: Token,
}

/// Failure while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset or not unicode.
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),
    /// The endpoint URL did not parse.
    #[error("invalid REDCAP_API_URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The token failed its format check.
    #[error("invalid REDCAP_API_TOKEN: {0}")]
    InvalidToken(#[from] FormatError),
}

impl RedcapConfig {
    /// Reads [`ENV_API_URL`] and [`ENV_API_TOKEN`], loading `.env` first
    /// when one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Ignore a missing .env; only explicit variables are required.
        let _ = dotenvy::dotenv();
        let base_url = std::env::var(ENV_API_URL)
            .map_err(|_| ConfigError::MissingVar(ENV_API_URL))?
            .parse::<Url>()?;
        let token = Token::new(
            std::env::var(ENV_API_TOKEN).map_err(|_| ConfigError::MissingVar(ENV_API_TOKEN))?,
        )?;
        Ok(Self { base_url, token })
    }
}

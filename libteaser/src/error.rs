//! Error types for Social Teaser

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TeaserError>;

#[derive(Error, Debug)]
pub enum TeaserError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to encode publish result: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Failed to read credentials file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse credentials file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Failure of a single publish attempt.
///
/// Publish failures are values: backends return them, the dispatcher records
/// them, and nothing propagates them with `?` across a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PublishError {
    /// The URL stage produced nothing; no request was sent.
    #[error("Endpoint for {platform} is empty")]
    EmptyEndpoint { platform: String },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

impl PublishError {
    /// Short machine-readable classification, used when persisting outcomes.
    pub fn kind(&self) -> &'static str {
        match self {
            PublishError::EmptyEndpoint { .. } => "empty_endpoint",
            PublishError::Transport(_) => "transport_error",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TransportError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request timed out: {message}")]
    Timeout { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TransportError::Timeout {
                message: error.to_string(),
            }
        } else if error.is_builder() {
            TransportError::InvalidRequest {
                message: error.to_string(),
            }
        } else if let Some(status) = error.status() {
            TransportError::Status {
                status: status.as_u16(),
                body: error.to_string(),
            }
        } else {
            TransportError::Network {
                message: error.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_formatting_invalid_input() {
        let error = TeaserError::InvalidInput("Subject id is required".to_string());
        assert_eq!(error.to_string(), "Invalid input: Subject id is required");
    }

    #[test]
    fn test_error_message_formatting_config() {
        let error = TeaserError::Config(ConfigError::MissingField("database.path".to_string()));
        assert_eq!(
            error.to_string(),
            "Configuration error: Missing required field: database.path"
        );
    }

    #[test]
    fn test_error_conversion_from_db_error() {
        let db_error = DbError::IoError(std::io::Error::new(std::io::ErrorKind::NotFound, "test"));
        let error: TeaserError = db_error.into();

        match error {
            TeaserError::Database(_) => {}
            _ => panic!("Expected TeaserError::Database"),
        }
    }

    #[test]
    fn test_empty_endpoint_is_distinct_from_transport() {
        let empty = PublishError::EmptyEndpoint {
            platform: "tumblr".to_string(),
        };
        let transport: PublishError = TransportError::Status {
            status: 500,
            body: "oops".to_string(),
        }
        .into();

        assert_eq!(empty.kind(), "empty_endpoint");
        assert_eq!(transport.kind(), "transport_error");
        assert_eq!(empty.to_string(), "Endpoint for tumblr is empty");
        assert_eq!(transport.to_string(), "Transport error: HTTP 500: oops");
    }

    #[test]
    fn test_publish_error_serializes_with_kind_tag() {
        let error = PublishError::EmptyEndpoint {
            platform: "tumblr".to_string(),
        };
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["kind"], "empty_endpoint");
        assert_eq!(json["platform"], "tumblr");

        let back: PublishError = serde_json::from_value(json).unwrap();
        assert_eq!(back, error);
    }

    #[test]
    fn test_transport_error_variants() {
        let timeout = TransportError::Timeout {
            message: "100s elapsed".to_string(),
        };
        assert_eq!(timeout.to_string(), "Request timed out: 100s elapsed");

        let network = TransportError::Network {
            message: "connection refused".to_string(),
        };
        assert_eq!(network.to_string(), "Network error: connection refused");
    }
}

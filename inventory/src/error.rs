//! Error types for the Infrahub client

use franc_portal_core::inventory::OptionSourceError;
use thiserror::Error;

/// Errors that can occur when talking to Infrahub
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The HTTP client could not be built
    #[error("Client configuration failed: {0}")]
    Configuration(String),

    /// HTTP request failed (connect, TLS, timeout)
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response parsing failed
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// Unauthorized - missing or invalid API token
    #[error("Unauthorized - invalid API token")]
    Unauthorized,

    /// Infrahub returned a non-success status
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// The GraphQL response carried errors
    #[error("GraphQL error: {0}")]
    GraphQl(String),
}

impl From<InventoryError> for OptionSourceError {
    fn from(error: InventoryError) -> Self {
        match error {
            InventoryError::Configuration(_)
            | InventoryError::RequestFailed(_)
            | InventoryError::Unauthorized
            | InventoryError::ApiError { .. } => Self::Unreachable(error.to_string()),
            InventoryError::ResponseParseFailed(message) => Self::SchemaMismatch(message),
            InventoryError::GraphQl(message) => Self::Rejected(message),
        }
    }
}

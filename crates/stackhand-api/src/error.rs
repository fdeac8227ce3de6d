//! API server errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No API token configured; set http.token or STACKHAND_TOKEN")]
    MissingToken,

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

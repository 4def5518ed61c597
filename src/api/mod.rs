//! Backend REST client
//!
//! - **envelope**: the `{success, data?, error?}` response type
//! - **client**: reqwest wrapper with cookie jar and bearer auth
//! - **endpoints**: typed methods for each backend route

pub mod client;
pub mod endpoints;
pub mod envelope;

pub use client::ApiClient;
pub use endpoints::{paths, PatronApi};
pub use envelope::ApiResponse;

use thiserror::Error;

/// Backend call failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a response
    #[error("{0}")]
    Transport(String),

    /// Non-2xx status; `message` is the body text or `HTTP <status>`
    #[error("{message}")]
    Http { status: u16, message: String },

    /// A 2xx body that does not match the expected shape
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// An envelope carrying `success: false`
    #[error("{0}")]
    Backend(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Http { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            ApiError::Decode(_) | ApiError::Backend(_) | ApiError::InvalidUrl(_) => false,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            ApiError::Transport(_) => "transport",
            ApiError::Http { .. } => "http",
            ApiError::Decode(_) => "decode",
            ApiError::Backend(_) => "backend",
            ApiError::InvalidUrl(_) => "config",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

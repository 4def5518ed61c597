//! Patron - client for the Patron Framework token platform
//!
//! Token locking, vesting, OTC swaps and tweet mining against the Patron
//! backend, with backend-built Solana transactions signed and confirmed
//! locally.
//!
//! - [`tx_flow`]: decode, refresh, sign, submit and confirm
//! - [`error_parser`]: one user-facing sentence for any failure
//! - [`api`]: backend client and response envelope
//! - [`notifications`]: toast list
//! - [`dashboard`]: page operations tying the above together

pub mod api;
pub mod compat;
pub mod config;
pub mod dashboard;
pub mod error_parser;
pub mod notifications;
pub mod observability;
pub mod polling;
pub mod roles;
pub mod rpc;
pub mod test_utils;
pub mod tx_flow;
pub mod types;
pub mod wallet;

#[cfg(test)]
mod tests;

pub use api::{ApiClient, ApiError, ApiResponse, PatronApi};
pub use config::Config;
pub use dashboard::{Dashboard, DashboardError, Operation};
pub use error_parser::{classify, normalize, ErrorClass, ErrorReport};
pub use notifications::{NotificationCenter, Toast, ToastEvent, ToastKind, ToastOptions};
pub use tx_flow::{FlowError, TransactionFlow};
pub use wallet::{KeypairWallet, WalletAdapter, WalletError};

pub use solana_sdk::{pubkey::Pubkey, signature::Signature};

//! Error types for the transaction flow
//!
//! One variant per way the decode → refresh → sign → submit → confirm
//! sequence can stop. The error normalizer turns these into user-facing
//! strings; the dashboard uses [`FlowError::is_user_rejection`] to keep
//! wallet cancellations quiet.

use crate::rpc::RpcError;
use crate::wallet::WalletError;
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::TransactionError};
use thiserror::Error;

/// Comprehensive error type for all transaction flow operations
#[derive(Error, Debug, Clone)]
pub enum FlowError {
    /// The backend payload is not a base64 bincode transaction
    #[error("Failed to decode transaction: {0}")]
    Decode(String),

    /// A v0 message names a different fee payer and cannot be recompiled
    #[error("Fee payer mismatch: transaction expects {found}, wallet is {expected}")]
    FeePayerMismatch { expected: Pubkey, found: Pubkey },

    /// Blockhash fetch failed after every retry
    #[error("Network error: {0}")]
    Network(RpcError),

    /// No wallet, or the wallet could not be connected
    #[error("Wallet unavailable: {0}")]
    WalletUnavailable(String),

    /// The user declined to sign
    #[error("User rejected the request: {0}")]
    UserRejection(String),

    /// The wallet failed to produce a usable signature
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The RPC node rejected the transaction (usually preflight)
    #[error("Failed to send transaction: {0}")]
    Submission(RpcError),

    /// This signature was already handed to the cluster
    #[error("Transaction {0} was already submitted")]
    AlreadySubmitted(Signature),

    /// No `confirmed` status within the configured window
    #[error("Transaction {signature} was not confirmed within {waited_ms}ms")]
    ConfirmationTimeout { signature: Signature, waited_ms: u64 },

    /// The blockhash expired before the transaction was confirmed
    #[error("Transaction {signature} expired: block height exceeded {last_valid_block_height}")]
    BlockhashExpired {
        signature: Signature,
        last_valid_block_height: u64,
    },

    /// The transaction was confirmed with an error
    #[error("Transaction {signature} failed on-chain: {error}")]
    OnChain {
        signature: Signature,
        error: TransactionError,
    },
}

impl FlowError {
    /// Check if starting the whole flow again might succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::BlockhashExpired { .. } => true,
            Self::Submission(err) => matches!(
                err,
                RpcError::BlockhashNotFound { .. } | RpcError::RateLimitExceeded { .. }
            ),

            // The outcome is unknown; a new attempt may double-submit
            Self::ConfirmationTimeout { .. } => false,

            Self::Decode(_) => false,
            Self::FeePayerMismatch { .. } => false,
            Self::WalletUnavailable(_) => false,
            Self::UserRejection(_) => false,
            Self::Signing(_) => false,
            Self::AlreadySubmitted(_) => false,
            Self::OnChain { .. } => false,
        }
    }

    /// Get the error category for logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::FeePayerMismatch { .. } => "fee_payer",
            Self::Network(_) => "network",
            Self::WalletUnavailable(_) => "wallet",
            Self::UserRejection(_) => "user_rejection",
            Self::Signing(_) => "signing",
            Self::Submission(_) => "submission",
            Self::AlreadySubmitted(_) => "duplicate",
            Self::ConfirmationTimeout { .. } => "confirmation_timeout",
            Self::BlockhashExpired { .. } => "blockhash_expired",
            Self::OnChain { .. } => "on_chain",
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        matches!(self, Self::UserRejection(_))
    }

    /// Signature of the transaction, once it has one
    pub fn signature(&self) -> Option<&Signature> {
        match self {
            Self::AlreadySubmitted(signature)
            | Self::ConfirmationTimeout { signature, .. }
            | Self::BlockhashExpired { signature, .. }
            | Self::OnChain { signature, .. } => Some(signature),
            _ => None,
        }
    }

    /// Program logs carried by a preflight failure
    pub fn logs(&self) -> &[String] {
        match self {
            Self::Submission(err) | Self::Network(err) => err.logs(),
            _ => &[],
        }
    }

    /// Transaction error from preflight or confirmation
    pub fn transaction_error(&self) -> Option<&TransactionError> {
        match self {
            Self::OnChain { error, .. } => Some(error),
            Self::Submission(err) => err.transaction_error(),
            _ => None,
        }
    }
}

impl From<WalletError> for FlowError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Rejected(reason) => Self::UserRejection(reason),
            WalletError::Unavailable(reason) => Self::WalletUnavailable(reason),
            WalletError::NotConnected => Self::WalletUnavailable("wallet not connected".into()),
            other => Self::Signing(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::instruction::InstructionError;

    #[test]
    fn test_error_display() {
        let err = FlowError::Decode("invalid base64".to_string());
        assert_eq!(err.to_string(), "Failed to decode transaction: invalid base64");

        let err = FlowError::UserRejection("declined".to_string());
        assert_eq!(err.to_string(), "User rejected the request: declined");
    }

    #[test]
    fn test_error_retryability() {
        let endpoint = "https://rpc.test".to_string();
        assert!(FlowError::Network(RpcError::Timeout { endpoint: endpoint.clone(), timeout_ms: 1 })
            .is_retryable());
        assert!(FlowError::Submission(RpcError::BlockhashNotFound { endpoint }).is_retryable());

        assert!(!FlowError::UserRejection("no".into()).is_retryable());
        assert!(!FlowError::ConfirmationTimeout {
            signature: Signature::default(),
            waited_ms: 1,
        }
        .is_retryable());
        assert!(!FlowError::AlreadySubmitted(Signature::default()).is_retryable());
    }

    #[test]
    fn test_wallet_error_conversion() {
        assert!(FlowError::from(WalletError::Rejected("x".into())).is_user_rejection());
        assert!(matches!(
            FlowError::from(WalletError::NotConnected),
            FlowError::WalletUnavailable(_)
        ));
        assert!(matches!(
            FlowError::from(WalletError::Signing("hw".into())),
            FlowError::Signing(_)
        ));
    }

    #[test]
    fn test_on_chain_error_accessors() {
        let error = TransactionError::InstructionError(0, InstructionError::Custom(6005));
        let err = FlowError::OnChain {
            signature: Signature::default(),
            error: error.clone(),
        };
        assert_eq!(err.transaction_error(), Some(&error));
        assert_eq!(err.signature(), Some(&Signature::default()));
        assert_eq!(err.category(), "on_chain");
    }
}

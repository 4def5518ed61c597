//! Solana RPC gateway
//!
//! The transaction flow talks to the cluster only through [`RpcGateway`], so
//! tests can script blockhashes, submission failures and confirmation
//! statuses without a validator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::{
    hash::Hash, pubkey::Pubkey, signature::Signature, transaction::TransactionError,
    transaction::VersionedTransaction,
};

pub mod client;
pub mod errors;

pub use client::SolanaRpc;
pub use errors::RpcError;

/// Latest blockhash and the last block height at which it is still valid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockhashInfo {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

/// SPL token account balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBalance {
    /// Raw amount in base units
    pub amount: String,
    pub decimals: u8,
    pub ui_amount: Option<f64>,
}

/// Status of a submitted signature at the gateway's commitment level.
///
/// `None` means the cluster has not seen (or not yet confirmed) the
/// signature; `Some(Err(_))` means it landed with an error.
pub type SignatureStatus = Option<Result<(), TransactionError>>;

/// The RPC methods the client depends on
#[async_trait]
pub trait RpcGateway: Send + Sync {
    /// Endpoint URL, for logging and error context
    fn endpoint(&self) -> &str;

    /// `getLatestBlockhash`
    async fn latest_blockhash(&self) -> Result<BlockhashInfo, RpcError>;

    /// `sendTransaction` with preflight enabled
    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<Signature, RpcError>;

    /// `getSignatureStatuses` for one signature
    async fn signature_status(&self, signature: &Signature) -> Result<SignatureStatus, RpcError>;

    /// `getBlockHeight`
    async fn block_height(&self) -> Result<u64, RpcError>;

    /// `getTokenAccountBalance`
    async fn token_balance(&self, token_account: &Pubkey) -> Result<TokenBalance, RpcError>;

    /// `getAccountInfo`, reduced to existence
    async fn account_exists(&self, account: &Pubkey) -> Result<bool, RpcError>;

    /// `getVersion`
    async fn version(&self) -> Result<String, RpcError>;
}

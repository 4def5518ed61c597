use super::{BlockhashInfo, RpcError, RpcGateway, SignatureStatus, TokenBalance};
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::{
    commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature,
    transaction::VersionedTransaction,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// [`RpcGateway`] backed by the nonblocking `solana-client` RPC client.
///
/// Every call uses `confirmed` commitment.
#[derive(Clone)]
pub struct SolanaRpc {
    client: Arc<RpcClient>,
    endpoint: String,
    commitment: CommitmentConfig,
}

impl SolanaRpc {
    pub fn new(url: &str, timeout: Duration) -> Self {
        let commitment = CommitmentConfig::confirmed();
        Self {
            client: Arc::new(RpcClient::new_with_timeout_and_commitment(
                url.to_string(),
                timeout,
                commitment,
            )),
            endpoint: url.to_string(),
            commitment,
        }
    }

    fn map_err(&self, err: solana_client::client_error::ClientError) -> RpcError {
        RpcError::from_client_error(err, &self.endpoint)
    }
}

impl std::fmt::Debug for SolanaRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaRpc")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[async_trait]
impl RpcGateway for SolanaRpc {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn latest_blockhash(&self) -> Result<BlockhashInfo, RpcError> {
        let (blockhash, last_valid_block_height) = self
            .client
            .get_latest_blockhash_with_commitment(self.commitment)
            .await
            .map_err(|e| self.map_err(e))?;
        debug!(%blockhash, last_valid_block_height, "Fetched latest blockhash");
        Ok(BlockhashInfo {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<Signature, RpcError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(self.commitment.commitment),
            ..RpcSendTransactionConfig::default()
        };
        self.client
            .send_transaction_with_config(tx, config)
            .await
            .map_err(|e| self.map_err(e))
    }

    async fn signature_status(&self, signature: &Signature) -> Result<SignatureStatus, RpcError> {
        self.client
            .get_signature_status_with_commitment(signature, self.commitment)
            .await
            .map_err(|e| self.map_err(e))
    }

    async fn block_height(&self) -> Result<u64, RpcError> {
        self.client
            .get_block_height_with_commitment(self.commitment)
            .await
            .map_err(|e| self.map_err(e))
    }

    async fn token_balance(&self, token_account: &Pubkey) -> Result<TokenBalance, RpcError> {
        let amount = self
            .client
            .get_token_account_balance_with_commitment(token_account, self.commitment)
            .await
            .map_err(|e| self.map_err(e))?
            .value;
        Ok(TokenBalance {
            amount: amount.amount,
            decimals: amount.decimals,
            ui_amount: amount.ui_amount,
        })
    }

    async fn account_exists(&self, account: &Pubkey) -> Result<bool, RpcError> {
        let response = self
            .client
            .get_account_with_commitment(account, self.commitment)
            .await
            .map_err(|e| self.map_err(e))?;
        Ok(response.value.is_some())
    }

    async fn version(&self) -> Result<String, RpcError> {
        let version = self.client.get_version().await.map_err(|e| self.map_err(e))?;
        Ok(version.solana_core)
    }
}

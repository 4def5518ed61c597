use super::errors::FlowError;
use super::retry::{retry_with_backoff, RetryPolicy};
use super::transaction::{
    BuiltTransaction, ConfirmedTransaction, SignedTransaction, SubmittedTransaction, TxState,
};
use crate::config::Config;
use crate::observability::FlowContext;
use crate::rpc::{BlockhashInfo, RpcGateway};
use crate::wallet::WalletAdapter;
use parking_lot::Mutex;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn, Instrument};

/// How long a submitted signature stays in the ledger. Longer than the
/// ~150-block lifetime of any blockhash it could have been signed with.
pub const LEDGER_RETENTION: Duration = Duration::from_secs(300);

/// Confirmation polling settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmOptions {
    /// Give up after this long
    pub timeout: Duration,
    /// Delay between status polls
    pub poll_interval: Duration,
}

impl Default for ConfirmOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Turns backend-issued unsigned transactions into confirmed signatures.
///
/// Cheap to clone; clones share the RPC gateway and the submission ledger.
#[derive(Clone)]
pub struct TransactionFlow {
    rpc: Arc<dyn RpcGateway>,
    retry: RetryPolicy,
    confirm: ConfirmOptions,
    submitted: Arc<Mutex<HashMap<Signature, Instant>>>,
}

impl TransactionFlow {
    pub fn new(rpc: Arc<dyn RpcGateway>, retry: RetryPolicy, confirm: ConfirmOptions) -> Self {
        Self {
            rpc,
            retry,
            confirm,
            submitted: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn from_config(rpc: Arc<dyn RpcGateway>, config: &Config) -> Self {
        Self::new(
            rpc,
            RetryPolicy::from(&config.retry),
            ConfirmOptions {
                timeout: config.confirm_timeout(),
                poll_interval: config.poll_interval(),
            },
        )
    }

    pub fn rpc(&self) -> &Arc<dyn RpcGateway> {
        &self.rpc
    }

    /// Whether `signature` has already been sent through this flow
    pub fn was_submitted(&self, signature: &Signature) -> bool {
        self.submitted.lock().contains_key(signature)
    }

    /// Signatures currently held in the submission ledger
    pub fn submitted_count(&self) -> usize {
        self.submitted.lock().len()
    }

    /// Run the whole sequence for one backend payload
    pub async fn execute(
        &self,
        encoded: &str,
        wallet: &dyn WalletAdapter,
        ctx: &FlowContext,
    ) -> Result<Signature, FlowError> {
        let span = ctx.span();
        async move {
            let result = self.run(encoded, wallet).await;
            match &result {
                Ok(signature) => info!(
                    %signature,
                    state = %TxState::Confirmed,
                    elapsed_ms = ctx.elapsed_ms(),
                    "Transaction confirmed"
                ),
                Err(err) if err.is_user_rejection() => {
                    info!(state = %TxState::Failed, "Transaction cancelled by user")
                }
                Err(err) => warn!(
                    state = %TxState::Failed,
                    category = err.category(),
                    signature = ?err.signature(),
                    error = %err,
                    elapsed_ms = ctx.elapsed_ms(),
                    "Transaction flow failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, encoded: &str, wallet: &dyn WalletAdapter) -> Result<Signature, FlowError> {
        let built = BuiltTransaction::decode(encoded)?;
        let payer = self.connect_wallet(wallet).await?;

        let blockhash = self.latest_blockhash().await?;
        let built = built.refresh(&payer, blockhash)?;
        debug!(state = %TxState::Built, %payer, blockhash = %blockhash.blockhash, "Transaction prepared");

        let signed = built.sign(wallet).await?;
        debug!(state = %TxState::Signed, signature = %signed.signature(), "Transaction signed");

        let submitted = self.submit(signed).await?;
        let confirmed = self.confirm(submitted).await?;
        Ok(confirmed.signature)
    }

    /// Public key of the wallet, connecting first if needed
    pub async fn connect_wallet(&self, wallet: &dyn WalletAdapter) -> Result<Pubkey, FlowError> {
        if let Some(key) = wallet.public_key() {
            return Ok(key);
        }
        if !wallet.is_available().await {
            return Err(FlowError::WalletUnavailable(format!(
                "{} is not available",
                wallet.name()
            )));
        }
        Ok(wallet.connect().await?)
    }

    /// Fetch a fresh blockhash under the retry policy
    pub async fn latest_blockhash(&self) -> Result<BlockhashInfo, FlowError> {
        retry_with_backoff("get_latest_blockhash", &self.retry, || self.rpc.latest_blockhash())
            .await
            .map_err(FlowError::Network)
    }

    /// Send a signed transaction exactly once
    pub async fn submit(&self, signed: SignedTransaction) -> Result<SubmittedTransaction, FlowError> {
        let signature = *signed.signature();
        {
            let mut ledger = self.submitted.lock();
            let now = Instant::now();
            ledger.retain(|_, at| now.duration_since(*at) < LEDGER_RETENTION);
            if ledger.contains_key(&signature) {
                warn!(%signature, "Refusing to resubmit transaction");
                return Err(FlowError::AlreadySubmitted(signature));
            }
            ledger.insert(signature, now);
        }

        let returned = self
            .rpc
            .send_transaction(signed.transaction())
            .await
            .map_err(FlowError::Submission)?;
        if returned != signature {
            warn!(expected = %signature, %returned, "RPC returned a different signature");
        }

        info!(%signature, state = %TxState::Submitted, endpoint = self.rpc.endpoint(), "Transaction submitted");
        Ok(signed.into_submitted())
    }

    /// Poll until `confirmed`, an on-chain error, blockhash expiry or timeout
    pub async fn confirm(
        &self,
        submitted: SubmittedTransaction,
    ) -> Result<ConfirmedTransaction, FlowError> {
        let signature = *submitted.signature();
        let started = Instant::now();
        let deadline = started + self.confirm.timeout;

        loop {
            if let Some(outcome) = self.poll_status(&signature).await {
                return outcome.map(|()| submitted.into_confirmed(started.elapsed()));
            }

            if let Some(last_valid) = submitted.last_valid_block_height() {
                match self.rpc.block_height().await {
                    Ok(height) if height > last_valid => {
                        // It may have landed between the two calls
                        if let Some(outcome) = self.poll_status(&signature).await {
                            return outcome.map(|()| submitted.into_confirmed(started.elapsed()));
                        }
                        // Can no longer land, so it can leave the ledger
                        self.submitted.lock().remove(&signature);
                        return Err(FlowError::BlockhashExpired {
                            signature,
                            last_valid_block_height: last_valid,
                        });
                    }
                    Ok(_) => {}
                    Err(err) => debug!(error = %err, "Block height poll failed"),
                }
            }

            if Instant::now() >= deadline {
                return Err(FlowError::ConfirmationTimeout {
                    signature,
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            sleep(self.confirm.poll_interval).await;
        }
    }

    /// `Some` once the signature has a final status at `confirmed`
    async fn poll_status(&self, signature: &Signature) -> Option<Result<(), FlowError>> {
        match self.rpc.signature_status(signature).await {
            Ok(Some(Ok(()))) => Some(Ok(())),
            Ok(Some(Err(error))) => Some(Err(FlowError::OnChain {
                signature: *signature,
                error,
            })),
            Ok(None) => None,
            Err(err) => {
                debug!(%signature, error = %err, "Signature status poll failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for TransactionFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionFlow")
            .field("endpoint", &self.rpc.endpoint())
            .field("retry", &self.retry)
            .field("confirm", &self.confirm)
            .finish()
    }
}

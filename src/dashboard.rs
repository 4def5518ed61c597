//! Page-level operations
//!
//! Each method here is what one dashboard button does: ask the backend for
//! data or an unsigned transaction, run the transaction through the flow,
//! and report the outcome as a toast. Failures are normalized before they
//! are shown; wallet rejections are only logged.

use crate::api::{ApiError, ApiResponse, PatronApi};
use crate::config::{Config, ConfigError};
use crate::error_parser::{classify, normalize, ErrorClass, ErrorReport};
use crate::notifications::NotificationCenter;
use crate::observability::FlowContext;
use crate::polling::{spawn_mining_status_poller, spawn_role_refresher, PollError, Poller};
use crate::roles::RoleCache;
use crate::rpc::{RpcError, TokenBalance};
use crate::tx_flow::{FlowError, TransactionFlow};
use crate::types::*;
use crate::wallet::WalletAdapter;
use parking_lot::Mutex;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// User-triggered operations, one per dashboard button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    LockTokens,
    UnlockTokens,
    ClaimYield,
    InitializeUserClaim,
    CreateVesting,
    ClaimVested,
    InitiateSwap,
    AcceptSwap,
    CancelSwap,
    ClaimTweetReward,
    BatchClaim,
    SelectRole,
    ApplyPatron,
    SetWalletAddress,
    PostTweet,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::LockTokens => "lock_tokens",
            Operation::UnlockTokens => "unlock_tokens",
            Operation::ClaimYield => "claim_yield",
            Operation::InitializeUserClaim => "initialize_user_claim",
            Operation::CreateVesting => "create_vesting",
            Operation::ClaimVested => "claim_vested",
            Operation::InitiateSwap => "initiate_otc_swap",
            Operation::AcceptSwap => "accept_otc_swap",
            Operation::CancelSwap => "cancel_otc_swap",
            Operation::ClaimTweetReward => "claim_tweet_reward",
            Operation::BatchClaim => "batch_claim",
            Operation::SelectRole => "select_role",
            Operation::ApplyPatron => "apply_patron",
            Operation::SetWalletAddress => "set_wallet_address",
            Operation::PostTweet => "post_tweet",
        }
    }

    fn success_message(&self) -> &'static str {
        match self {
            Operation::LockTokens => "Tokens locked successfully",
            Operation::UnlockTokens => "Tokens unlocked successfully",
            Operation::ClaimYield => "Yield claimed successfully",
            Operation::InitializeUserClaim => "Account initialized",
            Operation::CreateVesting => "Vesting schedule created",
            Operation::ClaimVested => "Vested tokens claimed",
            Operation::InitiateSwap => "Swap offer created",
            Operation::AcceptSwap => "Swap accepted",
            Operation::CancelSwap => "Swap cancelled",
            Operation::ClaimTweetReward => "Tweet reward claimed",
            Operation::BatchClaim => "Rewards claimed",
            Operation::SelectRole => "Role updated",
            Operation::ApplyPatron => "Patron application submitted",
            Operation::SetWalletAddress => "Wallet address saved",
            Operation::PostTweet => "Tweet posted",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone)]
pub enum DashboardError {
    /// Another run of the same operation has not finished
    #[error("{0} is already in progress")]
    Busy(Operation),

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Config(Arc<ConfigError>),
}

impl From<ConfigError> for DashboardError {
    fn from(err: ConfigError) -> Self {
        DashboardError::Config(Arc::new(err))
    }
}

impl From<PollError> for DashboardError {
    fn from(err: PollError) -> Self {
        DashboardError::InvalidInput(err.to_string())
    }
}

impl DashboardError {
    pub fn is_retryable(&self) -> bool {
        match self {
            DashboardError::Busy(_) => true,
            DashboardError::Api(err) => err.is_retryable(),
            DashboardError::Flow(err) => err.is_retryable(),
            DashboardError::Rpc(err) => err.is_retryable(),
            DashboardError::InvalidInput(_) | DashboardError::Config(_) => false,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            DashboardError::Busy(_) => "busy",
            DashboardError::InvalidInput(_) => "invalid_input",
            DashboardError::Api(err) => err.category(),
            DashboardError::Flow(err) => err.category(),
            DashboardError::Rpc(_) => "rpc",
            DashboardError::Config(_) => "config",
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        classify(&ErrorReport::from(self)) == ErrorClass::UserRejection
    }
}

impl From<&DashboardError> for ErrorReport {
    fn from(err: &DashboardError) -> Self {
        match err {
            DashboardError::Api(api) => api.into(),
            DashboardError::Flow(flow) => flow.into(),
            DashboardError::Rpc(rpc) => rpc.into(),
            other => ErrorReport::new(other.to_string()),
        }
    }
}

/// Clears an operation's in-flight mark when dropped
struct InFlight {
    ops: Arc<Mutex<HashSet<Operation>>>,
    op: Operation,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.ops.lock().remove(&self.op);
    }
}

/// Everything a dashboard page needs, bundled
#[derive(Clone)]
pub struct Dashboard {
    api: PatronApi,
    flow: TransactionFlow,
    wallet: Arc<dyn WalletAdapter>,
    notifications: NotificationCenter,
    roles: RoleCache,
    token_mint: Pubkey,
    in_flight: Arc<Mutex<HashSet<Operation>>>,
}

impl Dashboard {
    pub fn new(
        api: PatronApi,
        flow: TransactionFlow,
        wallet: Arc<dyn WalletAdapter>,
        notifications: NotificationCenter,
        token_mint: Pubkey,
    ) -> Self {
        Self {
            api,
            flow,
            wallet,
            notifications,
            roles: RoleCache::new(),
            token_mint,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Wire up the real API client and RPC gateway from `config`
    pub fn from_config(config: &Config, wallet: Arc<dyn WalletAdapter>) -> Result<Self, DashboardError> {
        let api = PatronApi::new(crate::api::ApiClient::new(&config.api)?);
        let rpc = crate::rpc::SolanaRpc::new(&config.rpc.url, Duration::from_secs(config.rpc.timeout_secs));
        let flow = TransactionFlow::from_config(Arc::new(rpc), config);
        let notifications = NotificationCenter::new(config.default_toast_duration());
        Ok(Self::new(api, flow, wallet, notifications, config.token_mint()?))
    }

    pub fn api(&self) -> &PatronApi {
        &self.api
    }

    pub fn flow(&self) -> &TransactionFlow {
        &self.flow
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn roles(&self) -> &RoleCache {
        &self.roles
    }

    pub fn token_mint(&self) -> &Pubkey {
        &self.token_mint
    }

    pub fn is_busy(&self, op: Operation) -> bool {
        self.in_flight.lock().contains(&op)
    }

    fn begin(&self, op: Operation) -> Result<InFlight, DashboardError> {
        if !self.in_flight.lock().insert(op) {
            return Err(DashboardError::Busy(op));
        }
        Ok(InFlight {
            ops: self.in_flight.clone(),
            op,
        })
    }

    /// Toast and log the outcome of `op`
    fn report<T>(&self, op: Operation, result: &Result<T, DashboardError>, success: impl FnOnce(&T) -> String) {
        match result {
            Ok(value) => {
                self.notifications.show_success(success(value));
            }
            Err(DashboardError::Busy(_)) => {
                self.notifications
                    .show_warning(format!("Please wait, {} is still running", op));
            }
            Err(err) => {
                let report = ErrorReport::from(err);
                if classify(&report) == ErrorClass::UserRejection {
                    info!(operation = %op, "Cancelled by user");
                    return;
                }
                warn!(operation = %op, category = err.category(), error = %err, "Operation failed");
                self.notifications.show_error(normalize(&report));
            }
        }
    }

    /// Show a normalized error toast for a failed read
    fn report_read<T>(&self, what: &str, result: ApiResponse<T>) -> Result<T, DashboardError> {
        result.into_result().map_err(|err| {
            warn!(what, error = %err, "Fetch failed");
            let err = DashboardError::Api(err);
            self.notifications.show_error(normalize(&ErrorReport::from(&err)));
            err
        })
    }

    async fn prepare_and_execute<F, Fut>(&self, prepare: &F, ctx: &FlowContext) -> Result<Signature, DashboardError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ApiResponse<PreparedTransaction>>,
    {
        let prepared = prepare().await.into_result()?;
        if let Some(note) = &prepared.message {
            debug!(operation = %ctx.operation, note = %note, "Backend prepared transaction");
        }
        Ok(self
            .flow
            .execute(&prepared.transaction, self.wallet.as_ref(), ctx)
            .await?)
    }

    /// Guarded transaction operation: prepare, sign, submit, confirm, report
    async fn transact<F, Fut>(&self, op: Operation, prepare: F) -> Result<Signature, DashboardError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ApiResponse<PreparedTransaction>>,
    {
        let _guard = match self.begin(op) {
            Ok(guard) => guard,
            Err(err) => {
                self.report::<Signature>(op, &Err(err.clone()), |_| String::new());
                return Err(err);
            }
        };
        let ctx = FlowContext::new(op.as_str());

        let mut result = self.prepare_and_execute(&prepare, &ctx).await;
        if op == Operation::LockTokens {
            if let Err(err) = &result {
                if classify(&ErrorReport::from(err)) == ErrorClass::AccountNotFound {
                    result = self.initialize_then_retry(&prepare, &ctx).await;
                }
            }
        }

        self.report(op, &result, |sig| {
            format!("{}. Signature: {}", op.success_message(), sig)
        });
        result
    }

    /// Create the user's claim account, then run the original request once more
    async fn initialize_then_retry<F, Fut>(&self, prepare: &F, ctx: &FlowContext) -> Result<Signature, DashboardError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = ApiResponse<PreparedTransaction>>,
    {
        info!(correlation_id = %ctx.correlation_id, "User claim account missing, initializing");
        self.notifications.show_info("Initializing your account, please approve the transaction");

        let init_ctx = ctx.child(Operation::InitializeUserClaim.as_str());
        let init = || self.api.initialize_user_claim();
        let signature = self.prepare_and_execute(&init, &init_ctx).await?;
        info!(%signature, "User claim account initialized");

        self.prepare_and_execute(prepare, ctx).await
    }

    /// Guarded backend-only operation
    async fn act<T, Fut>(&self, op: Operation, call: Fut) -> Result<T, DashboardError>
    where
        Fut: Future<Output = ApiResponse<T>>,
    {
        let _guard = match self.begin(op) {
            Ok(guard) => guard,
            Err(err) => {
                self.report::<T>(op, &Err(err.clone()), |_| String::new());
                return Err(err);
            }
        };
        let result = call.await.into_result().map_err(DashboardError::from);
        self.report(op, &result, |_| op.success_message().to_string());
        result
    }

    fn rejected(&self, err: PollError) -> DashboardError {
        let err = DashboardError::from(err);
        self.notifications.show_error(err.to_string());
        err
    }

    fn invalid<T>(&self, message: impl Into<String>) -> Result<T, DashboardError> {
        let err = DashboardError::InvalidInput(message.into());
        self.notifications.show_error(err.to_string());
        Err(err)
    }

    // Reads

    pub async fn profile(&self) -> Result<UserProfile, DashboardError> {
        self.report_read("profile", self.api.profile().await)
    }

    pub async fn token_info(&self) -> Result<TokenInfo, DashboardError> {
        self.report_read("token info", self.api.token_info().await)
    }

    pub async fn mining_status(&self) -> Result<MiningStatus, DashboardError> {
        self.report_read("mining status", self.api.mining_status().await)
    }

    pub async fn vesting_schedule(&self) -> Result<VestingSchedule, DashboardError> {
        self.report_read("vesting schedule", self.api.vesting_schedule().await)
    }

    pub async fn active_swaps(&self) -> Result<Vec<OtcSwap>, DashboardError> {
        self.report_read("active swaps", self.api.active_swaps().await)
    }

    pub async fn my_swaps(&self) -> Result<Vec<OtcSwap>, DashboardError> {
        self.report_read("my swaps", self.api.my_swaps().await)
    }

    pub async fn pending_applications(&self) -> Result<Vec<PatronApplication>, DashboardError> {
        self.report_read("patron applications", self.api.pending_patron_applications().await)
    }

    pub async fn tweet_mining_status(&self) -> Result<TweetMiningStatus, DashboardError> {
        self.report_read("tweet mining status", self.api.tweet_mining_status().await)
    }

    pub async fn tweet_templates(&self) -> Result<Vec<TweetTemplate>, DashboardError> {
        self.report_read("tweet templates", self.api.tweet_templates().await)
    }

    pub async fn accumulated_rewards(&self) -> Result<AccumulatedRewards, DashboardError> {
        self.report_read("accumulated rewards", self.api.accumulated_rewards().await)
    }

    /// Role from the shared cache, fetched on first use
    pub async fn role(&self) -> Result<UserRole, DashboardError> {
        if let Some(role) = self.roles.current() {
            return Ok(role);
        }
        self.refresh_role().await
    }

    pub async fn refresh_role(&self) -> Result<UserRole, DashboardError> {
        self.roles.refresh(&self.api).await.map_err(|err| {
            let err = DashboardError::Api(err);
            self.notifications.show_error(normalize(&ErrorReport::from(&err)));
            err
        })
    }

    /// Balance of the wallet's associated token account; `None` if it does
    /// not exist yet
    pub async fn token_balance(&self) -> Result<Option<TokenBalance>, DashboardError> {
        let owner = self.flow.connect_wallet(self.wallet.as_ref()).await?;
        let ata = spl_associated_token_account::get_associated_token_address(&owner, &self.token_mint);
        let rpc = self.flow.rpc();
        let result = match rpc.account_exists(&ata).await {
            Ok(false) => {
                debug!(%ata, "No associated token account yet");
                return Ok(None);
            }
            Ok(true) => rpc.token_balance(&ata).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(balance) => Ok(Some(balance)),
            Err(RpcError::AccountNotFound { .. }) => Ok(None),
            Err(err) => {
                let err = DashboardError::Rpc(err);
                self.notifications.show_error(normalize(&ErrorReport::from(&err)));
                Err(err)
            }
        }
    }

    pub async fn rpc_version(&self) -> Result<String, DashboardError> {
        Ok(self.flow.rpc().version().await?)
    }

    /// Poll mining status in the background
    pub fn watch_mining_status(
        &self,
        period: Duration,
    ) -> Result<(Poller, watch::Receiver<Option<MiningStatus>>), DashboardError> {
        spawn_mining_status_poller(self.api.clone(), period).map_err(|err| self.rejected(err))
    }

    /// Keep the shared role cache fresh in the background
    pub fn watch_role(&self, period: Duration) -> Result<Poller, DashboardError> {
        spawn_role_refresher(self.roles.clone(), self.api.clone(), period).map_err(|err| self.rejected(err))
    }

    // Token locking ("mining")

    pub async fn lock_tokens(&self, amount: u64, duration_days: u32) -> Result<Signature, DashboardError> {
        if amount == 0 {
            return self.invalid("Amount must be greater than zero");
        }
        if duration_days == 0 {
            return self.invalid("Lock duration must be at least one day");
        }
        self.transact(Operation::LockTokens, || self.api.lock_tokens(amount, duration_days))
            .await
    }

    pub async fn unlock_tokens(&self) -> Result<Signature, DashboardError> {
        self.transact(Operation::UnlockTokens, || self.api.unlock_tokens()).await
    }

    pub async fn claim_yield(&self) -> Result<Signature, DashboardError> {
        self.transact(Operation::ClaimYield, || self.api.claim_yield()).await
    }

    // Vesting

    pub async fn create_vesting(&self, request: CreateVestingRequest) -> Result<Signature, DashboardError> {
        if Pubkey::from_str(&request.beneficiary).is_err() {
            return self.invalid(format!("Invalid beneficiary address: {}", request.beneficiary));
        }
        if request.total_amount == 0 {
            return self.invalid("Amount must be greater than zero");
        }
        if request.duration_days == 0 || request.cliff_days > request.duration_days {
            return self.invalid("Cliff must not exceed a non-zero vesting duration");
        }
        self.transact(Operation::CreateVesting, || self.api.create_vesting(&request))
            .await
    }

    pub async fn claim_vested(&self) -> Result<Signature, DashboardError> {
        self.transact(Operation::ClaimVested, || self.api.claim_vested()).await
    }

    // OTC swaps

    pub async fn initiate_swap(&self, request: InitiateSwapRequest) -> Result<Signature, DashboardError> {
        if request.token_amount == 0 || request.sol_amount == 0 {
            return self.invalid("Swap amounts must be greater than zero");
        }
        if let Some(buyer) = &request.buyer {
            if Pubkey::from_str(buyer).is_err() {
                return self.invalid(format!("Invalid buyer address: {}", buyer));
            }
        }
        self.transact(Operation::InitiateSwap, || self.api.initiate_otc_swap(&request))
            .await
    }

    pub async fn accept_swap(&self, swap_id: &str) -> Result<Signature, DashboardError> {
        self.transact(Operation::AcceptSwap, || self.api.accept_otc_swap(swap_id))
            .await
    }

    pub async fn cancel_swap(&self, swap_id: &str) -> Result<Signature, DashboardError> {
        self.transact(Operation::CancelSwap, || self.api.cancel_otc_swap(swap_id))
            .await
    }

    // Roles and profile

    pub async fn select_role(&self, role: RoleKind) -> Result<UserRole, DashboardError> {
        let updated = self.act(Operation::SelectRole, self.api.select_role(role)).await?;
        self.roles.set(updated.clone());
        Ok(updated)
    }

    pub async fn apply_patron(&self, message: &str) -> Result<PatronApplication, DashboardError> {
        if message.trim().is_empty() {
            return self.invalid("Application message must not be empty");
        }
        self.act(Operation::ApplyPatron, self.api.apply_patron(message)).await
    }

    /// Register the connected wallet's address with the backend
    pub async fn set_wallet_address(&self) -> Result<Pubkey, DashboardError> {
        let address = match self.flow.connect_wallet(self.wallet.as_ref()).await {
            Ok(address) => address,
            Err(err) => {
                let err = DashboardError::Flow(err);
                self.report::<Pubkey>(Operation::SetWalletAddress, &Err(err.clone()), |_| String::new());
                return Err(err);
            }
        };
        self.act(
            Operation::SetWalletAddress,
            self.api.set_wallet_address(&address.to_string()),
        )
        .await?;
        Ok(address)
    }

    // Tweet mining

    pub async fn post_tweet(&self, request: PostTweetRequest) -> Result<PostedTweet, DashboardError> {
        if request.content.trim().is_empty() {
            return self.invalid("Tweet content must not be empty");
        }
        self.act(Operation::PostTweet, self.api.post_tweet(&request)).await
    }

    pub async fn claim_tweet_reward(&self, tweet_id: &str) -> Result<Signature, DashboardError> {
        self.transact(Operation::ClaimTweetReward, || self.api.claim_tweet_reward(tweet_id))
            .await
    }

    pub async fn batch_claim(&self) -> Result<Signature, DashboardError> {
        self.transact(Operation::BatchClaim, || self.api.batch_claim()).await
    }
}

impl fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dashboard")
            .field("api", &self.api)
            .field("flow", &self.flow)
            .field("wallet", &self.wallet.name())
            .field("token_mint", &self.token_mint)
            .field("in_flight", &self.in_flight.lock().len())
            .finish()
    }
}

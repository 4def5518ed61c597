use super::{ApiClient, ApiResponse};
use crate::types::*;

/// Backend routes, relative to the API base URL
pub mod paths {
    pub const PROFILE: &str = "/test/profile";
    pub const TOKEN_INFO: &str = "/test/token-info";
    pub const ACTIVE_SWAPS: &str = "/test/active-swaps";
    pub const MY_SWAPS: &str = "/test/my-swaps";

    pub const ROLE: &str = "/user/role";
    pub const SELECT_ROLE: &str = "/user/select_role";
    pub const WALLET_ADDRESS: &str = "/user/wallet_address";

    pub const LOCK_TOKENS: &str = "/user/lock_tokens";
    pub const UNLOCK_TOKENS: &str = "/user/unlock_tokens";
    pub const CLAIM_YIELD: &str = "/user/claim_yield";
    pub const MINING_STATUS: &str = "/user/mining_status";
    pub const INITIALIZE_USER_CLAIM: &str = "/user/initialize_user_claim";

    pub const VESTING_SCHEDULE: &str = "/user/vesting_schedule";
    pub const CREATE_VESTING: &str = "/user/create_vesting";
    pub const CLAIM_VESTED: &str = "/user/claim_vested";

    pub const INITIATE_OTC_SWAP: &str = "/user/initiate_otc_swap";
    pub const ACCEPT_OTC_SWAP: &str = "/user/accept_otc_swap";
    pub const CANCEL_OTC_SWAP: &str = "/user/cancel_otc_swap";

    pub const APPLY_PATRON: &str = "/user/apply_patron";
    pub const PENDING_PATRON_APPLICATIONS: &str = "/user/pending_patron_applications";

    pub const TWEET_MINING_STATUS: &str = "/user/tweet_mining_status";
    pub const TWEET_TEMPLATES: &str = "/user/tweet_templates";
    pub const POST_TWEET: &str = "/user/post_tweet";
    pub const CLAIM_TWEET_REWARD: &str = "/user/claim_tweet_reward";
    pub const BATCH_CLAIM: &str = "/user/batch_claim";
    pub const ACCUMULATED_REWARDS: &str = "/user/accumulated_rewards";
}

/// Typed access to every backend route
#[derive(Debug, Clone)]
pub struct PatronApi {
    client: ApiClient,
}

impl PatronApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    // Profile and role

    pub async fn profile(&self) -> ApiResponse<UserProfile> {
        self.client.get(paths::PROFILE).await
    }

    pub async fn role(&self) -> ApiResponse<UserRole> {
        self.client.get(paths::ROLE).await
    }

    pub async fn select_role(&self, role: RoleKind) -> ApiResponse<UserRole> {
        self.client.post(paths::SELECT_ROLE, &SelectRoleRequest { role }).await
    }

    pub async fn set_wallet_address(&self, wallet_address: &str) -> ApiResponse<serde_json::Value> {
        let body = WalletAddressRequest {
            wallet_address: wallet_address.to_string(),
        };
        self.client.post(paths::WALLET_ADDRESS, &body).await
    }

    // Token and mining

    pub async fn token_info(&self) -> ApiResponse<TokenInfo> {
        self.client.get(paths::TOKEN_INFO).await
    }

    pub async fn mining_status(&self) -> ApiResponse<MiningStatus> {
        self.client.get(paths::MINING_STATUS).await
    }

    pub async fn lock_tokens(&self, amount: u64, duration_days: u32) -> ApiResponse<PreparedTransaction> {
        let body = LockTokensRequest { amount, duration_days };
        self.client.post(paths::LOCK_TOKENS, &body).await
    }

    pub async fn unlock_tokens(&self) -> ApiResponse<PreparedTransaction> {
        self.client.post(paths::UNLOCK_TOKENS, &EmptyRequest {}).await
    }

    pub async fn claim_yield(&self) -> ApiResponse<PreparedTransaction> {
        self.client.post(paths::CLAIM_YIELD, &EmptyRequest {}).await
    }

    /// Transaction creating the user's claim account
    pub async fn initialize_user_claim(&self) -> ApiResponse<PreparedTransaction> {
        self.client.post(paths::INITIALIZE_USER_CLAIM, &EmptyRequest {}).await
    }

    // Vesting

    pub async fn vesting_schedule(&self) -> ApiResponse<VestingSchedule> {
        self.client.get(paths::VESTING_SCHEDULE).await
    }

    pub async fn create_vesting(&self, request: &CreateVestingRequest) -> ApiResponse<PreparedTransaction> {
        self.client.post(paths::CREATE_VESTING, request).await
    }

    pub async fn claim_vested(&self) -> ApiResponse<PreparedTransaction> {
        self.client.post(paths::CLAIM_VESTED, &EmptyRequest {}).await
    }

    // OTC swaps

    pub async fn active_swaps(&self) -> ApiResponse<Vec<OtcSwap>> {
        self.client.get(paths::ACTIVE_SWAPS).await
    }

    pub async fn my_swaps(&self) -> ApiResponse<Vec<OtcSwap>> {
        self.client.get(paths::MY_SWAPS).await
    }

    pub async fn initiate_otc_swap(&self, request: &InitiateSwapRequest) -> ApiResponse<PreparedTransaction> {
        self.client.post(paths::INITIATE_OTC_SWAP, request).await
    }

    pub async fn accept_otc_swap(&self, swap_id: &str) -> ApiResponse<PreparedTransaction> {
        let body = SwapIdRequest { swap_id: swap_id.to_string() };
        self.client.post(paths::ACCEPT_OTC_SWAP, &body).await
    }

    pub async fn cancel_otc_swap(&self, swap_id: &str) -> ApiResponse<PreparedTransaction> {
        let body = SwapIdRequest { swap_id: swap_id.to_string() };
        self.client.post(paths::CANCEL_OTC_SWAP, &body).await
    }

    // Patron applications

    pub async fn apply_patron(&self, message: &str) -> ApiResponse<PatronApplication> {
        let body = ApplyPatronRequest { message: message.to_string() };
        self.client.post(paths::APPLY_PATRON, &body).await
    }

    pub async fn pending_patron_applications(&self) -> ApiResponse<Vec<PatronApplication>> {
        self.client.get(paths::PENDING_PATRON_APPLICATIONS).await
    }

    // Tweet mining

    pub async fn tweet_mining_status(&self) -> ApiResponse<TweetMiningStatus> {
        self.client.get(paths::TWEET_MINING_STATUS).await
    }

    pub async fn tweet_templates(&self) -> ApiResponse<Vec<TweetTemplate>> {
        self.client.get(paths::TWEET_TEMPLATES).await
    }

    pub async fn post_tweet(&self, request: &PostTweetRequest) -> ApiResponse<PostedTweet> {
        self.client.post(paths::POST_TWEET, request).await
    }

    pub async fn claim_tweet_reward(&self, tweet_id: &str) -> ApiResponse<PreparedTransaction> {
        let body = ClaimTweetRequest { tweet_id: tweet_id.to_string() };
        self.client.post(paths::CLAIM_TWEET_REWARD, &body).await
    }

    pub async fn batch_claim(&self) -> ApiResponse<PreparedTransaction> {
        self.client.post(paths::BATCH_CLAIM, &EmptyRequest {}).await
    }

    pub async fn accumulated_rewards(&self) -> ApiResponse<AccumulatedRewards> {
        self.client.get(paths::ACCUMULATED_REWARDS).await
    }
}

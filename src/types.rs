//! Backend data types
//!
//! Plain serde snapshots of what the backend returns, plus the request bodies
//! it accepts. Each snapshot is fetched on its own and never reconciled with
//! the others. Token amounts are in base units; timestamps are unix seconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role a user holds in the Patron program
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    #[default]
    None,
    Staker,
    Patron,
}

impl RoleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleKind::None => "none",
            RoleKind::Staker => "staker",
            RoleKind::Patron => "patron",
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(RoleKind::None),
            "staker" => Ok(RoleKind::Staker),
            "patron" => Ok(RoleKind::Patron),
            other => Err(format!("unknown role '{}' (expected none, staker or patron)", other)),
        }
    }
}

/// Cached role of the signed-in user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRole {
    #[serde(default)]
    pub role: RoleKind,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub locked_until: Option<i64>,
    #[serde(default)]
    pub stake_amount: Option<u64>,
}

impl UserRole {
    /// Whether the role lock is still in force at `now`
    pub fn is_locked(&self, now: i64) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub twitter_handle: Option<String>,
    #[serde(default)]
    pub role: RoleKind,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub mint: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    pub decimals: u8,
    #[serde(default)]
    pub total_supply: u64,
    #[serde(default)]
    pub circulating_supply: Option<u64>,
}

/// Token lock ("mining") position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MiningStatus {
    #[serde(default)]
    pub is_mining: bool,
    #[serde(default)]
    pub locked_amount: u64,
    #[serde(default)]
    pub accumulated_yield: u64,
    #[serde(default)]
    pub lock_start: Option<i64>,
    #[serde(default)]
    pub unlock_time: Option<i64>,
    #[serde(default)]
    pub apy: Option<f64>,
}

impl MiningStatus {
    pub fn can_unlock(&self, now: i64) -> bool {
        self.locked_amount > 0 && self.unlock_time.map_or(true, |t| t <= now)
    }

    pub fn seconds_until_unlock(&self, now: i64) -> u64 {
        self.unlock_time
            .map(|t| t.saturating_sub(now).max(0) as u64)
            .unwrap_or(0)
    }
}

/// Linear vesting with a cliff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VestingSchedule {
    pub beneficiary: String,
    pub total_amount: u64,
    #[serde(default)]
    pub released_amount: u64,
    pub start_time: i64,
    pub cliff_time: i64,
    pub end_time: i64,
}

impl VestingSchedule {
    /// Amount vested at `now`: zero before the cliff, linear from `start_time`
    /// to `end_time`, everything afterwards.
    pub fn vested_amount(&self, now: i64) -> u64 {
        if now < self.cliff_time {
            return 0;
        }
        if now >= self.end_time || self.end_time <= self.start_time {
            return self.total_amount;
        }
        let elapsed = now.saturating_sub(self.start_time).max(0) as u128;
        let duration = self.end_time.saturating_sub(self.start_time) as u128;
        (self.total_amount as u128 * elapsed / duration) as u64
    }

    pub fn claimable_amount(&self, now: i64) -> u64 {
        self.vested_amount(now).saturating_sub(self.released_amount)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwapStatus {
    Active,
    Completed,
    Cancelled,
    Expired,
    #[serde(other)]
    Unknown,
}

/// OTC offer of tokens for SOL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtcSwap {
    pub id: String,
    pub seller: String,
    #[serde(default)]
    pub buyer: Option<String>,
    pub token_amount: u64,
    pub sol_amount: u64,
    pub status: SwapStatus,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl OtcSwap {
    pub fn is_open(&self, now: i64) -> bool {
        self.status == SwapStatus::Active && self.expires_at.map_or(true, |t| t > now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatronApplication {
    #[serde(default)]
    pub id: Option<String>,
    pub wallet_address: String,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TweetMiningStatus {
    #[serde(default)]
    pub can_post: bool,
    #[serde(default)]
    pub cooldown_remaining_secs: u64,
    #[serde(default)]
    pub tweets_today: u32,
    #[serde(default)]
    pub daily_limit: u32,
    #[serde(default)]
    pub pending_rewards: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccumulatedRewards {
    #[serde(default)]
    pub total_rewards: u64,
    #[serde(default)]
    pub claimable_rewards: u64,
    #[serde(default)]
    pub pending_claims: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TweetTemplate {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub reward: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostedTweet {
    pub tweet_id: String,
    #[serde(default)]
    pub reward: Option<u64>,
    #[serde(default)]
    pub cooldown_secs: Option<u64>,
}

/// Unsigned transaction built by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedTransaction {
    /// Base64 bincode `VersionedTransaction`
    pub transaction: String,
    #[serde(default)]
    pub message: Option<String>,
}

// Request bodies

#[derive(Debug, Clone, Serialize)]
pub struct LockTokensRequest {
    pub amount: u64,
    pub duration_days: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitiateSwapRequest {
    pub token_amount: u64,
    pub sol_amount: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwapIdRequest {
    pub swap_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplyPatronRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectRoleRequest {
    pub role: RoleKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletAddressRequest {
    pub wallet_address: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostTweetRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimTweetRequest {
    pub tweet_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateVestingRequest {
    pub beneficiary: String,
    pub total_amount: u64,
    pub cliff_days: u32,
    pub duration_days: u32,
}

/// Body for endpoints that take no parameters
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EmptyRequest {}

/// Convert a decimal UI amount ("1.5") into base units
pub fn ui_to_base_units(amount: &str, decimals: u8) -> Result<u64, String> {
    let amount = amount.trim();
    let (whole, frac) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err("amount is empty".into());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("invalid amount '{}'", amount));
    }
    if frac.len() > decimals as usize {
        return Err(format!("amount '{}' has more than {} decimals", amount, decimals));
    }

    let scale = 10u64
        .checked_pow(decimals as u32)
        .ok_or_else(|| format!("unsupported decimals {}", decimals))?;
    let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| format!("amount '{}' is too large", amount))? };
    let frac_units: u64 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = decimals as usize);
        padded.parse().map_err(|_| format!("invalid amount '{}'", amount))?
    };

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(|| format!("amount '{}' is too large", amount))
}

/// Format base units as a decimal string without trailing zeros
pub fn format_base_units(amount: u64, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    // Past 38 decimals the scale exceeds u128, and any u64 is below it
    let (whole, frac) = match 10u128.checked_pow(decimals as u32) {
        Some(scale) => (amount as u128 / scale, amount as u128 % scale),
        None => (0, amount as u128),
    };
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

/// Render a unix timestamp for display
pub fn format_timestamp(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_kind_serde() {
        let role: UserRole = serde_json::from_value(json!({"role": "patron", "status": "active"})).unwrap();
        assert_eq!(role.role, RoleKind::Patron);
        assert_eq!(role.status.as_deref(), Some("active"));
        assert_eq!(serde_json::to_value(RoleKind::Staker).unwrap(), json!("staker"));
        assert_eq!("Staker".parse::<RoleKind>().unwrap(), RoleKind::Staker);
        assert!("admin".parse::<RoleKind>().is_err());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let role: UserRole = serde_json::from_value(json!({})).unwrap();
        assert_eq!(role, UserRole::default());
        let status: MiningStatus = serde_json::from_value(json!({"is_mining": true})).unwrap();
        assert!(status.is_mining);
        assert_eq!(status.locked_amount, 0);
    }

    #[test]
    fn test_vesting_schedule_math() {
        let schedule = VestingSchedule {
            beneficiary: "b".into(),
            total_amount: 1_000,
            released_amount: 100,
            start_time: 0,
            cliff_time: 100,
            end_time: 1_000,
        };
        assert_eq!(schedule.vested_amount(50), 0);
        assert_eq!(schedule.vested_amount(100), 100);
        assert_eq!(schedule.vested_amount(500), 500);
        assert_eq!(schedule.vested_amount(5_000), 1_000);
        assert_eq!(schedule.claimable_amount(100), 0);
        assert_eq!(schedule.claimable_amount(500), 400);
    }

    #[test]
    fn test_vesting_schedule_extreme_timestamps() {
        let schedule = VestingSchedule {
            beneficiary: "b".into(),
            total_amount: 1_000,
            released_amount: 0,
            start_time: i64::MIN,
            cliff_time: i64::MIN,
            end_time: i64::MAX,
        };
        assert_eq!(schedule.vested_amount(0), 1_000);
        assert_eq!(schedule.vested_amount(i64::MIN), 0);
    }

    #[test]
    fn test_mining_unlock() {
        let status = MiningStatus {
            is_mining: true,
            locked_amount: 10,
            unlock_time: Some(100),
            ..MiningStatus::default()
        };
        assert!(!status.can_unlock(50));
        assert_eq!(status.seconds_until_unlock(50), 50);
        assert!(status.can_unlock(100));
        assert_eq!(status.seconds_until_unlock(200), 0);
    }

    #[test]
    fn test_swap_status_unknown_variant() {
        let swap: OtcSwap = serde_json::from_value(json!({
            "id": "s1",
            "seller": "abc",
            "token_amount": 5,
            "sol_amount": 1,
            "status": "frozen"
        }))
        .unwrap();
        assert_eq!(swap.status, SwapStatus::Unknown);
        assert!(!swap.is_open(0));
    }

    #[test]
    fn test_ui_amount_conversion() {
        assert_eq!(ui_to_base_units("1.5", 9), Ok(1_500_000_000));
        assert_eq!(ui_to_base_units("42", 6), Ok(42_000_000));
        assert_eq!(ui_to_base_units(".25", 2), Ok(25));
        assert!(ui_to_base_units("1.1234567", 6).is_err());
        assert!(ui_to_base_units("-1", 6).is_err());
        assert!(ui_to_base_units("", 6).is_err());
        assert!(ui_to_base_units("99999999999999999999", 0).is_err());

        assert_eq!(format_base_units(1_500_000_000, 9), "1.5");
        assert_eq!(format_base_units(42_000_000, 6), "42");
        assert_eq!(format_base_units(7, 0), "7");
        assert_eq!(format_base_units(5, 40), format!("0.{}5", "0".repeat(39)));
        assert_eq!(format_base_units(0, 40), "0");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
    }
}

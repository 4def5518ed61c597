//! Dashboard scenarios
//!
//! A mockito server stands in for the backend; `MockRpc` and `MockWallet`
//! stand in for the cluster and the browser wallet.

use crate::api::{paths, ApiClient, PatronApi};
use crate::config::ApiConfig;
use crate::dashboard::{Dashboard, DashboardError, Operation};
use crate::notifications::{NotificationCenter, ToastKind};
use crate::rpc::{RpcError, TokenBalance};
use crate::test_utils::{encoded_unsigned_transaction, MockRpc, MockWallet};
use crate::tx_flow::{ConfirmOptions, RetryPolicy, TransactionFlow};
use crate::types::{CreateVestingRequest, RoleKind};
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use solana_sdk::{instruction::InstructionError, pubkey::Pubkey, transaction::TransactionError};
use std::sync::Arc;
use std::time::Duration;

const SESSION: &str = "session-abc";

struct Harness {
    server: ServerGuard,
    dashboard: Dashboard,
    rpc: Arc<MockRpc>,
    wallet: Arc<MockWallet>,
}

async fn harness_with(wallet: MockWallet) -> Harness {
    harness_session(wallet, Some(SESSION)).await
}

async fn harness_session(wallet: MockWallet, session: Option<&str>) -> Harness {
    let server = Server::new_async().await;
    let api = ApiClient::new(&ApiConfig {
        base_url: server.url(),
        session_token: session.map(str::to_string),
        ..ApiConfig::default()
    })
    .unwrap();

    let rpc = MockRpc::shared();
    let flow = TransactionFlow::new(
        rpc.clone(),
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            jitter_factor: 0.0,
        },
        ConfirmOptions {
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(10),
        },
    );
    let wallet = Arc::new(wallet);
    let dashboard = Dashboard::new(
        PatronApi::new(api),
        flow,
        wallet.clone(),
        NotificationCenter::new(Duration::from_secs(30)),
        Pubkey::new_unique(),
    );

    Harness {
        server,
        dashboard,
        rpc,
        wallet,
    }
}

async fn harness() -> Harness {
    harness_with(MockWallet::connected()).await
}

fn prepared_body(wallet: &MockWallet) -> String {
    json!({ "transaction": encoded_unsigned_transaction(&wallet.pubkey()) }).to_string()
}

#[tokio::test]
async fn test_lock_tokens_success_toast_carries_signature() {
    let mut h = harness().await;
    let mock = h
        .server
        .mock("POST", paths::LOCK_TOKENS)
        .match_header("authorization", format!("Bearer {}", SESSION).as_str())
        .match_body(Matcher::Json(json!({ "amount": 1_000, "duration_days": 30 })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(prepared_body(&h.wallet))
        .create_async()
        .await;

    let signature = h.dashboard.lock_tokens(1_000, 30).await.unwrap();

    mock.assert_async().await;
    assert_eq!(h.rpc.sent_count(), 1);
    let toasts = h.dashboard.notifications().toasts();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].kind, ToastKind::Success);
    assert_eq!(
        toasts[0].message,
        format!("Tokens locked successfully. Signature: {}", signature)
    );
    assert!(!h.dashboard.is_busy(Operation::LockTokens));
}

#[tokio::test]
async fn test_wallet_rejection_is_silent() {
    let mut h = harness_with(MockWallet::rejecting("User rejected the request.")).await;
    h.server
        .mock("POST", paths::UNLOCK_TOKENS)
        .with_status(200)
        .with_body(prepared_body(&h.wallet))
        .create_async()
        .await;

    let err = h.dashboard.unlock_tokens().await.unwrap_err();

    assert!(err.is_user_rejection());
    assert!(h.dashboard.notifications().is_empty());
    assert_eq!(h.rpc.sent_count(), 0);
    assert_eq!(h.wallet.sign_requests(), 1);
}

#[tokio::test]
async fn test_backend_error_body_becomes_error_toast() {
    let mut h = harness().await;
    h.server
        .mock("POST", paths::CLAIM_YIELD)
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let err = h.dashboard.claim_yield().await.unwrap_err();

    assert!(matches!(err, DashboardError::Api(_)));
    let toasts = h.dashboard.notifications().toasts();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].kind, ToastKind::Error);
    assert_eq!(toasts[0].message, "boom");
    assert_eq!(h.wallet.sign_requests(), 0);
}

#[tokio::test]
async fn test_gateway_outage_is_normalized() {
    let mut h = harness().await;
    h.server
        .mock("GET", paths::MINING_STATUS)
        .with_status(503)
        .create_async()
        .await;

    let err = h.dashboard.mining_status().await.unwrap_err();

    assert_eq!(err.to_string(), "HTTP 503");
    let toasts = h.dashboard.notifications().toasts();
    assert_eq!(
        toasts[0].message,
        "Server is temporarily unavailable. Please try again later"
    );
}

#[tokio::test]
async fn test_on_chain_failure_uses_program_message() {
    let mut h = harness().await;
    h.server
        .mock("POST", paths::UNLOCK_TOKENS)
        .with_status(200)
        .with_body(prepared_body(&h.wallet))
        .create_async()
        .await;
    h.rpc.set_final_status(Some(Err(TransactionError::InstructionError(
        0,
        InstructionError::Custom(6003),
    ))));

    let err = h.dashboard.unlock_tokens().await.unwrap_err();

    assert_eq!(err.category(), "on_chain");
    let toasts = h.dashboard.notifications().toasts();
    assert_eq!(toasts[0].kind, ToastKind::Error);
    assert_eq!(toasts[0].message, "Tokens are still locked");
}

#[tokio::test]
async fn test_second_click_while_running_is_refused() {
    let mut h = harness().await;
    h.server
        .mock("POST", paths::LOCK_TOKENS)
        .with_status(200)
        .with_body(prepared_body(&h.wallet))
        .expect(1)
        .create_async()
        .await;

    let (first, second) = tokio::join!(
        h.dashboard.lock_tokens(500, 7),
        h.dashboard.lock_tokens(500, 7)
    );

    assert!(first.is_ok());
    assert!(matches!(second, Err(DashboardError::Busy(Operation::LockTokens))));
    assert_eq!(h.rpc.sent_count(), 1);

    let kinds: Vec<ToastKind> = h
        .dashboard
        .notifications()
        .toasts()
        .iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(kinds, vec![ToastKind::Warning, ToastKind::Success]);
    assert!(!h.dashboard.is_busy(Operation::LockTokens));
}

#[tokio::test]
async fn test_missing_claim_account_is_initialized_then_lock_retried() {
    let mut h = harness().await;
    let lock = h
        .server
        .mock("POST", paths::LOCK_TOKENS)
        .with_status(200)
        .with_body(prepared_body(&h.wallet))
        .expect(2)
        .create_async()
        .await;
    let init = h
        .server
        .mock("POST", paths::INITIALIZE_USER_CLAIM)
        .with_status(200)
        .with_body(prepared_body(&h.wallet))
        .expect(1)
        .create_async()
        .await;
    h.rpc.fail_next_send(RpcError::SimulationFailed {
        message: "Attempt to load a program that does not exist".into(),
        logs: vec![],
        tx_error: Some(TransactionError::AccountNotFound),
    });

    let signature = h.dashboard.lock_tokens(1_000, 30).await.unwrap();

    lock.assert_async().await;
    init.assert_async().await;
    // Initialization and the retried lock
    assert_eq!(h.rpc.sent_count(), 2);
    assert_eq!(h.rpc.sent()[1].signatures[0], signature);

    let toasts = h.dashboard.notifications().toasts();
    let kinds: Vec<ToastKind> = toasts.iter().map(|t| t.kind).collect();
    assert_eq!(kinds, vec![ToastKind::Info, ToastKind::Success]);
}

#[tokio::test]
async fn test_invalid_input_never_reaches_backend() {
    let h = harness().await;

    let err = h.dashboard.lock_tokens(0, 30).await.unwrap_err();
    assert!(matches!(err, DashboardError::InvalidInput(_)));

    let err = h
        .dashboard
        .create_vesting(CreateVestingRequest {
            beneficiary: "not-a-key".into(),
            total_amount: 10,
            cliff_days: 0,
            duration_days: 30,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DashboardError::InvalidInput(_)));

    let err = h
        .dashboard
        .create_vesting(CreateVestingRequest {
            beneficiary: Pubkey::new_unique().to_string(),
            total_amount: 10,
            cliff_days: 60,
            duration_days: 30,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DashboardError::InvalidInput(_)));

    let toasts = h.dashboard.notifications().toasts();
    assert_eq!(toasts.len(), 3);
    assert_eq!(toasts[0].message, "Amount must be greater than zero");
    assert!(toasts.iter().all(|t| t.kind == ToastKind::Error));
    assert_eq!(h.wallet.sign_requests(), 0);
}

#[tokio::test]
async fn test_select_role_updates_cache() {
    let mut h = harness().await;
    h.server
        .mock("POST", paths::SELECT_ROLE)
        .match_body(Matcher::Json(json!({ "role": "staker" })))
        .with_status(200)
        .with_body(r#"{"role":"staker","status":"active"}"#)
        .create_async()
        .await;
    let updates = h.dashboard.roles().subscribe();

    let role = h.dashboard.select_role(RoleKind::Staker).await.unwrap();

    assert_eq!(role.role, RoleKind::Staker);
    assert_eq!(h.dashboard.roles().role_kind(), RoleKind::Staker);
    assert!(updates.has_changed().unwrap());
    assert_eq!(
        h.dashboard.notifications().toasts()[0].message,
        "Role updated"
    );
}

#[tokio::test]
async fn test_role_is_fetched_once() {
    let mut h = harness().await;
    let mock = h
        .server
        .mock("GET", paths::ROLE)
        .with_status(200)
        .with_body(r#"{"role":"patron"}"#)
        .expect(1)
        .create_async()
        .await;

    assert_eq!(h.dashboard.role().await.unwrap().role, RoleKind::Patron);
    assert_eq!(h.dashboard.role().await.unwrap().role, RoleKind::Patron);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_set_wallet_address_connects_first() {
    let mut h = harness_with(MockWallet::new()).await;
    let expected = h.wallet.pubkey();
    let mock = h
        .server
        .mock("POST", paths::WALLET_ADDRESS)
        .match_body(Matcher::Json(json!({ "wallet_address": expected.to_string() })))
        .with_status(200)
        .with_body(r#"{"ok":true}"#)
        .create_async()
        .await;

    let address = h.dashboard.set_wallet_address().await.unwrap();

    mock.assert_async().await;
    assert_eq!(address, expected);
}

#[tokio::test]
async fn test_token_balance_of_missing_account_is_none() {
    let h = harness().await;
    assert_eq!(h.dashboard.token_balance().await.unwrap(), None);

    let ata = spl_associated_token_account::get_associated_token_address(
        &h.wallet.pubkey(),
        h.dashboard.token_mint(),
    );
    let balance = TokenBalance {
        amount: "2500000".into(),
        decimals: 6,
        ui_amount: Some(2.5),
    };
    h.rpc.set_token_balance(ata, balance.clone());

    assert_eq!(h.dashboard.token_balance().await.unwrap(), Some(balance));
}

#[tokio::test]
async fn test_zero_poll_period_is_rejected() {
    let h = harness().await;

    let err = h.dashboard.watch_mining_status(Duration::ZERO).unwrap_err();
    assert!(matches!(err, DashboardError::InvalidInput(_)));
    assert!(matches!(
        h.dashboard.watch_role(Duration::ZERO),
        Err(DashboardError::InvalidInput(_))
    ));

    let toasts = h.dashboard.notifications().toasts();
    assert_eq!(toasts.len(), 2);
    assert_eq!(toasts[0].message, "mining_status poll period must be greater than zero");
    assert_eq!(toasts[0].kind, ToastKind::Error);
}

#[tokio::test]
async fn test_mining_poller_publishes_status() {
    let mut h = harness().await;
    h.server
        .mock("GET", paths::MINING_STATUS)
        .match_header("authorization", format!("Bearer {}", SESSION).as_str())
        .with_status(200)
        .with_body(r#"{"is_mining":true,"locked_amount":10}"#)
        .create_async()
        .await;

    let (_poller, mut rx) = h.dashboard.watch_mining_status(Duration::from_millis(50)).unwrap();
    tokio::time::timeout(Duration::from_secs(2), rx.changed())
        .await
        .unwrap()
        .unwrap();

    let status = rx.borrow().clone().unwrap();
    assert!(status.is_mining);
    assert_eq!(status.locked_amount, 10);
}

#[tokio::test]
async fn test_mining_poller_waits_for_session() {
    let mut h = harness_session(MockWallet::connected(), None).await;
    let mock = h
        .server
        .mock("GET", paths::MINING_STATUS)
        .with_status(401)
        .expect(0)
        .create_async()
        .await;

    let (poller, rx) = h.dashboard.watch_mining_status(Duration::from_millis(20)).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    mock.assert_async().await;
    assert!(!poller.is_finished());
    assert!(rx.borrow().is_none());
}

#[tokio::test]
async fn test_role_watcher_refreshes_shared_cache() {
    let mut h = harness().await;
    h.server
        .mock("GET", paths::ROLE)
        .with_status(200)
        .with_body(r#"{"role":"staker","status":"active"}"#)
        .create_async()
        .await;
    let mut updates = h.dashboard.roles().subscribe();

    let _poller = h.dashboard.watch_role(Duration::from_millis(50)).unwrap();
    tokio::time::timeout(Duration::from_secs(2), updates.changed())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(h.dashboard.roles().role_kind(), RoleKind::Staker);
}

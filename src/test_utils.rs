//! Test utilities
//!
//! Scriptable wallet and RPC doubles for driving the transaction flow and the
//! dashboard without a cluster or a browser wallet.
//!
//! Only compiled for tests or with the `test_utils` feature.

#![cfg(any(test, feature = "test_utils"))]

use crate::rpc::{BlockhashInfo, RpcError, RpcGateway, SignatureStatus, TokenBalance};
use crate::tx_flow::encode_transaction;
use crate::wallet::{partial_sign, WalletAdapter, WalletError};
use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::{
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    message::{Message, VersionedMessage},
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::VersionedTransaction,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

pub const MOCK_ENDPOINT: &str = "mock://rpc";

/// Unsigned legacy transaction with `payer` as fee payer, as the backend
/// would build it
pub fn unsigned_transaction(payer: &Pubkey) -> VersionedTransaction {
    let ix = Instruction::new_with_bytes(
        Pubkey::new_unique(),
        &[1, 2, 3],
        vec![AccountMeta::new(*payer, true), AccountMeta::new(Pubkey::new_unique(), false)],
    );
    let message = Message::new_with_blockhash(&[ix], Some(payer), &Hash::default());
    VersionedTransaction {
        signatures: vec![Signature::default(); message.header.num_required_signatures as usize],
        message: VersionedMessage::Legacy(message),
    }
}

/// Base64 payload of [`unsigned_transaction`]
pub fn encoded_unsigned_transaction(payer: &Pubkey) -> String {
    encode_transaction(&unsigned_transaction(payer)).expect("mock transaction serializes")
}

/// What the mock wallet does when asked to sign
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignBehavior {
    Sign,
    Reject(String),
    Fail(String),
    /// Return the transaction untouched
    Ignore,
}

/// Scriptable wallet backed by a real keypair
pub struct MockWallet {
    keypair: Arc<Keypair>,
    available: bool,
    connected: AtomicBool,
    behavior: Mutex<SignBehavior>,
    sign_requests: AtomicUsize,
}

impl MockWallet {
    /// Available and not yet connected
    pub fn new() -> Self {
        Self {
            keypair: Arc::new(Keypair::new()),
            available: true,
            connected: AtomicBool::new(false),
            behavior: Mutex::new(SignBehavior::Sign),
            sign_requests: AtomicUsize::new(0),
        }
    }

    pub fn connected() -> Self {
        let wallet = Self::new();
        wallet.connected.store(true, Ordering::SeqCst);
        wallet
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn rejecting(reason: &str) -> Self {
        let wallet = Self::connected();
        wallet.set_behavior(SignBehavior::Reject(reason.to_string()));
        wallet
    }

    pub fn set_behavior(&self, behavior: SignBehavior) {
        *self.behavior.lock() = behavior;
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn sign_requests(&self) -> usize {
        self.sign_requests.load(Ordering::SeqCst)
    }
}

impl Default for MockWallet {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletAdapter for MockWallet {
    fn name(&self) -> String {
        "mock".to_string()
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    fn public_key(&self) -> Option<Pubkey> {
        self.connected
            .load(Ordering::SeqCst)
            .then(|| self.keypair.pubkey())
    }

    async fn connect(&self) -> Result<Pubkey, WalletError> {
        if !self.available {
            return Err(WalletError::Unavailable("mock wallet disabled".into()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(self.keypair.pubkey())
    }

    async fn sign_transaction(
        &self,
        mut tx: VersionedTransaction,
    ) -> Result<VersionedTransaction, WalletError> {
        self.sign_requests.fetch_add(1, Ordering::SeqCst);
        if !self.connected.load(Ordering::SeqCst) {
            return Err(WalletError::NotConnected);
        }
        let behavior = self.behavior.lock().clone();
        match behavior {
            SignBehavior::Sign => {
                partial_sign(&mut tx, &self.keypair)?;
                Ok(tx)
            }
            SignBehavior::Reject(reason) => Err(WalletError::Rejected(reason)),
            SignBehavior::Fail(reason) => Err(WalletError::Signing(reason)),
            SignBehavior::Ignore => Ok(tx),
        }
    }
}

/// Scriptable RPC gateway.
///
/// Every blockhash fetch hands out a new hash. Status polls pop from a
/// queue; once it is empty every poll returns `final_status` (confirmed by
/// default).
pub struct MockRpc {
    blockhash: Mutex<Hash>,
    last_valid_block_height: u64,
    blockhash_failures: AtomicU32,
    blockhash_calls: AtomicU32,
    send_errors: Mutex<VecDeque<RpcError>>,
    sent: Mutex<Vec<VersionedTransaction>>,
    statuses: Mutex<VecDeque<SignatureStatus>>,
    final_status: Mutex<SignatureStatus>,
    block_height: AtomicU64,
    balances: Mutex<HashMap<Pubkey, TokenBalance>>,
    accounts: Mutex<HashSet<Pubkey>>,
}

impl MockRpc {
    pub fn new() -> Self {
        Self {
            blockhash: Mutex::new(Hash::new_unique()),
            last_valid_block_height: 1_000,
            blockhash_failures: AtomicU32::new(0),
            blockhash_calls: AtomicU32::new(0),
            send_errors: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            statuses: Mutex::new(VecDeque::new()),
            final_status: Mutex::new(Some(Ok(()))),
            block_height: AtomicU64::new(900),
            balances: Mutex::new(HashMap::new()),
            accounts: Mutex::new(HashSet::new()),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Fail the next `count` blockhash fetches with a transport error
    pub fn fail_blockhash(&self, count: u32) {
        self.blockhash_failures.store(count, Ordering::SeqCst);
    }

    /// Fail the next send with `err`; queued errors are used in order
    pub fn fail_next_send(&self, err: RpcError) {
        self.send_errors.lock().push_back(err);
    }

    pub fn push_status(&self, status: SignatureStatus) {
        self.statuses.lock().push_back(status);
    }

    pub fn set_final_status(&self, status: SignatureStatus) {
        *self.final_status.lock() = status;
    }

    pub fn set_block_height(&self, height: u64) {
        self.block_height.store(height, Ordering::SeqCst);
    }

    pub fn set_token_balance(&self, account: Pubkey, balance: TokenBalance) {
        self.accounts.lock().insert(account);
        self.balances.lock().insert(account, balance);
    }

    /// Most recently issued blockhash
    pub fn blockhash(&self) -> Hash {
        *self.blockhash.lock()
    }

    pub fn blockhash_calls(&self) -> u32 {
        self.blockhash_calls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<VersionedTransaction> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

impl Default for MockRpc {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RpcGateway for MockRpc {
    fn endpoint(&self) -> &str {
        MOCK_ENDPOINT
    }

    async fn latest_blockhash(&self) -> Result<BlockhashInfo, RpcError> {
        self.blockhash_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .blockhash_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(RpcError::Transport {
                endpoint: MOCK_ENDPOINT.to_string(),
                message: "connection refused".to_string(),
            });
        }
        let blockhash = Hash::new_unique();
        *self.blockhash.lock() = blockhash;
        Ok(BlockhashInfo {
            blockhash,
            last_valid_block_height: self.last_valid_block_height,
        })
    }

    async fn send_transaction(&self, tx: &VersionedTransaction) -> Result<Signature, RpcError> {
        if let Some(err) = self.send_errors.lock().pop_front() {
            return Err(err);
        }
        self.sent.lock().push(tx.clone());
        Ok(tx.signatures.first().copied().unwrap_or_default())
    }

    async fn signature_status(&self, _signature: &Signature) -> Result<SignatureStatus, RpcError> {
        if let Some(status) = self.statuses.lock().pop_front() {
            return Ok(status);
        }
        Ok(self.final_status.lock().clone())
    }

    async fn block_height(&self) -> Result<u64, RpcError> {
        Ok(self.block_height.load(Ordering::SeqCst))
    }

    async fn token_balance(&self, account: &Pubkey) -> Result<TokenBalance, RpcError> {
        self.balances
            .lock()
            .get(account)
            .cloned()
            .ok_or_else(|| RpcError::AccountNotFound {
                account: account.to_string(),
                endpoint: MOCK_ENDPOINT.to_string(),
            })
    }

    async fn account_exists(&self, account: &Pubkey) -> Result<bool, RpcError> {
        Ok(self.accounts.lock().contains(account))
    }

    async fn version(&self) -> Result<String, RpcError> {
        Ok("2.3.0-mock".to_string())
    }
}

//! Wallet capability
//!
//! Signing is reached only through the [`WalletAdapter`] trait, injected into
//! the transaction flow. The CLI uses [`KeypairWallet`]; tests use the mock in
//! `test_utils`. Nothing assumes a process-global wallet.

use crate::compat;
use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::VersionedTransaction,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Wallet-side failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// The wallet is not installed / reachable
    #[error("Wallet unavailable: {0}")]
    Unavailable(String),

    /// `connect()` has not been called yet
    #[error("Wallet not connected")]
    NotConnected,

    /// The user declined the request
    #[error("User rejected the request: {0}")]
    Rejected(String),

    /// The wallet key is not among the transaction's required signers
    #[error("Wallet {0} is not a required signer of this transaction")]
    NotASigner(Pubkey),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Failed to load keypair: {0}")]
    Keypair(String),
}

impl WalletError {
    pub fn is_user_rejection(&self) -> bool {
        matches!(self, WalletError::Rejected(_))
    }
}

/// Wallet capability: availability, identity, connection and signing
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// Display name of the wallet
    fn name(&self) -> String;

    /// Check if the wallet is available
    async fn is_available(&self) -> bool;

    /// Public key of the connected account, `None` before `connect()`
    fn public_key(&self) -> Option<Pubkey>;

    /// Connect and return the account key
    async fn connect(&self) -> Result<Pubkey, WalletError>;

    /// Sign `tx` with the connected account and return it.
    ///
    /// May suspend indefinitely while the user decides.
    async fn sign_transaction(
        &self,
        tx: VersionedTransaction,
    ) -> Result<VersionedTransaction, WalletError>;
}

/// Place `keypair`'s signature over the message into its signer slot.
///
/// Other signatures already present (e.g. a backend co-signer) are kept.
pub fn partial_sign(tx: &mut VersionedTransaction, keypair: &Keypair) -> Result<Signature, WalletError> {
    let pubkey = keypair.pubkey();
    let position = compat::signer_position(&tx.message, &pubkey)
        .ok_or(WalletError::NotASigner(pubkey))?;

    let required = compat::get_message_header(&tx.message).num_required_signatures as usize;
    if tx.signatures.len() != required {
        tx.signatures.resize(required, Signature::default());
    }

    let signature = keypair
        .try_sign_message(&tx.message.serialize())
        .map_err(|e| WalletError::Signing(e.to_string()))?;
    tx.signatures[position] = signature;
    Ok(signature)
}

/// Load a keypair from a JSON byte array file or a raw 64 byte file
pub fn load_keypair(path: &Path) -> Result<Keypair, WalletError> {
    let keypair_bytes = std::fs::read(path)
        .map_err(|e| WalletError::Keypair(format!("{}: {}", path.display(), e)))?;

    let bytes = if keypair_bytes.len() == 64 {
        keypair_bytes
    } else {
        serde_json::from_slice::<Vec<u8>>(&keypair_bytes)
            .map_err(|e| WalletError::Keypair(format!("Failed to parse keypair JSON: {}", e)))?
    };

    if bytes.len() != 64 {
        return Err(WalletError::Keypair(format!(
            "Invalid keypair length: expected 64 bytes, got {}",
            bytes.len()
        )));
    }
    if bytes.iter().all(|&b| b == 0) {
        return Err(WalletError::Keypair("Invalid keypair: all-zero key rejected".into()));
    }
    Keypair::try_from(bytes.as_slice()).map_err(|e| WalletError::Keypair(e.to_string()))
}

/// Local keypair wallet for the command line.
///
/// Approves every signing request; there is no interactive prompt.
#[derive(Clone)]
pub struct KeypairWallet {
    keypair: Arc<Keypair>,
    connected: Arc<AtomicBool>,
    label: String,
}

impl KeypairWallet {
    /// Create a wallet from a keypair file
    pub fn from_file(path: &Path) -> Result<Self, WalletError> {
        let keypair = load_keypair(path)?;
        Ok(Self::from_keypair(keypair, &path.display().to_string()))
    }

    /// Create a wallet from a keypair
    pub fn from_keypair(keypair: Keypair, label: &str) -> Self {
        Self {
            keypair: Arc::new(keypair),
            connected: Arc::new(AtomicBool::new(false)),
            label: label.to_string(),
        }
    }

    /// Key regardless of connection state
    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }
}

#[async_trait]
impl WalletAdapter for KeypairWallet {
    fn name(&self) -> String {
        format!("Keypair Wallet: {}", self.label)
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn public_key(&self) -> Option<Pubkey> {
        self.connected
            .load(Ordering::Acquire)
            .then(|| self.keypair.pubkey())
    }

    async fn connect(&self) -> Result<Pubkey, WalletError> {
        self.connected.store(true, Ordering::Release);
        Ok(self.keypair.pubkey())
    }

    async fn sign_transaction(
        &self,
        mut tx: VersionedTransaction,
    ) -> Result<VersionedTransaction, WalletError> {
        if !self.connected.load(Ordering::Acquire) {
            return Err(WalletError::NotConnected);
        }
        partial_sign(&mut tx, &self.keypair)?;
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        hash::Hash,
        instruction::{AccountMeta, Instruction},
        message::{Message, VersionedMessage},
    };
    use std::io::Write;

    fn unsigned_tx(signers: &[Pubkey]) -> VersionedTransaction {
        let program = Pubkey::new_unique();
        let accounts = signers.iter().map(|k| AccountMeta::new(*k, true)).collect();
        let ix = Instruction::new_with_bytes(program, &[1, 2, 3], accounts);
        let message = Message::new_with_blockhash(&[ix], Some(&signers[0]), &Hash::new_unique());
        VersionedTransaction {
            signatures: vec![Signature::default(); signers.len()],
            message: VersionedMessage::Legacy(message),
        }
    }

    #[test]
    fn test_partial_sign_fills_own_slot_only() {
        let payer = Keypair::new();
        let cosigner = Keypair::new();
        let mut tx = unsigned_tx(&[payer.pubkey(), cosigner.pubkey()]);

        partial_sign(&mut tx, &cosigner).unwrap();

        let position = compat::signer_position(&tx.message, &cosigner.pubkey()).unwrap();
        assert_ne!(tx.signatures[position], Signature::default());
        assert_eq!(tx.signatures[1 - position], Signature::default());
        assert!(tx.signatures[position].verify(cosigner.pubkey().as_ref(), &tx.message.serialize()));
    }

    #[test]
    fn test_partial_sign_rejects_foreign_key() {
        let payer = Keypair::new();
        let stranger = Keypair::new();
        let mut tx = unsigned_tx(&[payer.pubkey()]);

        let err = partial_sign(&mut tx, &stranger).unwrap_err();
        assert_eq!(err, WalletError::NotASigner(stranger.pubkey()));
    }

    #[tokio::test]
    async fn test_keypair_wallet_requires_connect() {
        let wallet = KeypairWallet::from_keypair(Keypair::new(), "test");
        assert!(wallet.public_key().is_none());

        let tx = unsigned_tx(&[wallet.pubkey()]);
        assert_eq!(
            wallet.sign_transaction(tx.clone()).await.unwrap_err(),
            WalletError::NotConnected
        );

        let key = wallet.connect().await.unwrap();
        assert_eq!(wallet.public_key(), Some(key));
        let signed = wallet.sign_transaction(tx).await.unwrap();
        assert_ne!(signed.signatures[0], Signature::default());
    }

    #[test]
    fn test_load_keypair_json_and_rejects_zero_key() {
        let keypair = Keypair::new();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap()).unwrap();
        assert_eq!(load_keypair(file.path()).unwrap().pubkey(), keypair.pubkey());

        let mut zero = tempfile::NamedTempFile::new().unwrap();
        write!(zero, "{}", serde_json::to_string(&vec![0u8; 64]).unwrap()).unwrap();
        assert!(matches!(load_keypair(zero.path()), Err(WalletError::Keypair(_))));
    }
}

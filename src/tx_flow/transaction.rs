//! Transaction lifecycle as a typestate machine
//!
//! `BuiltTransaction → SignedTransaction → SubmittedTransaction →
//! ConfirmedTransaction`. Each transition consumes the previous state, and
//! `SignedTransaction` is deliberately not `Clone`, so one signed instance can
//! reach the cluster at most once. The flow's submission ledger covers the
//! remaining case of the same bytes being signed twice.

use super::errors::FlowError;
use crate::compat;
use crate::rpc::BlockhashInfo;
use crate::wallet::WalletAdapter;
use base64::{engine::general_purpose::STANDARD, Engine};
use solana_sdk::{
    message::{Message, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use std::fmt;
use std::time::Duration;

/// Lifecycle stage, for logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Built,
    Signed,
    Submitted,
    Confirmed,
    Failed,
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TxState::Built => "built",
            TxState::Signed => "signed",
            TxState::Submitted => "submitted",
            TxState::Confirmed => "confirmed",
            TxState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Decode a base64 bincode `VersionedTransaction`
pub fn decode_transaction(encoded: &str) -> Result<VersionedTransaction, FlowError> {
    let trimmed = encoded.trim();
    if trimmed.is_empty() {
        return Err(FlowError::Decode("empty transaction payload".into()));
    }

    let bytes = STANDARD
        .decode(trimmed)
        .map_err(|e| FlowError::Decode(format!("invalid base64: {}", e)))?;
    let tx: VersionedTransaction = bincode::deserialize(&bytes)
        .map_err(|e| FlowError::Decode(format!("invalid transaction bytes: {}", e)))?;

    let header = compat::get_message_header(&tx.message);
    let keys = compat::get_static_account_keys(&tx.message);
    if header.num_required_signatures == 0 {
        return Err(FlowError::Decode("transaction requires no signatures".into()));
    }
    if keys.len() < header.num_required_signatures as usize {
        return Err(FlowError::Decode(format!(
            "header requires {} signers but message has {} keys",
            header.num_required_signatures,
            keys.len()
        )));
    }
    Ok(tx)
}

/// Encode a transaction the way the backend does (bincode, base64)
pub fn encode_transaction(tx: &VersionedTransaction) -> Result<String, FlowError> {
    let bytes = bincode::serialize(tx)
        .map_err(|e| FlowError::Decode(format!("serialization failed: {}", e)))?;
    Ok(STANDARD.encode(bytes))
}

/// Decoded, unsigned transaction
#[derive(Debug, Clone)]
pub struct BuiltTransaction {
    tx: VersionedTransaction,
    last_valid_block_height: Option<u64>,
}

impl BuiltTransaction {
    /// Decode a backend payload
    pub fn decode(encoded: &str) -> Result<Self, FlowError> {
        Ok(Self::from_transaction(decode_transaction(encoded)?))
    }

    pub fn from_transaction(tx: VersionedTransaction) -> Self {
        Self {
            tx,
            last_valid_block_height: None,
        }
    }

    pub fn transaction(&self) -> &VersionedTransaction {
        &self.tx
    }

    /// Set a fresh blockhash and make `fee_payer` the fee payer.
    ///
    /// A legacy message with a different payer is recompiled; a v0 message
    /// with a different payer is rejected. Signature slots are reset.
    pub fn refresh(mut self, fee_payer: &Pubkey, blockhash: BlockhashInfo) -> Result<Self, FlowError> {
        let current = compat::get_fee_payer(&self.tx.message).copied();

        if current.as_ref() == Some(fee_payer) {
            self.tx.message.set_recent_blockhash(blockhash.blockhash);
        } else {
            match &self.tx.message {
                VersionedMessage::Legacy(legacy) => {
                    let instructions = compat::decompile_legacy_instructions(legacy).ok_or_else(
                        || FlowError::Decode("instruction references unknown account".into()),
                    )?;
                    self.tx.message = VersionedMessage::Legacy(Message::new_with_blockhash(
                        &instructions,
                        Some(fee_payer),
                        &blockhash.blockhash,
                    ));
                }
                VersionedMessage::V0(_) => {
                    return Err(FlowError::FeePayerMismatch {
                        expected: *fee_payer,
                        found: current.unwrap_or_default(),
                    });
                }
            }
        }

        let required = compat::get_message_header(&self.tx.message).num_required_signatures as usize;
        self.tx.signatures = vec![Signature::default(); required];
        self.last_valid_block_height = Some(blockhash.last_valid_block_height);
        Ok(self)
    }

    /// Ask the wallet to sign; suspends until the user decides
    pub async fn sign(self, wallet: &dyn WalletAdapter) -> Result<SignedTransaction, FlowError> {
        let payer = compat::get_fee_payer(&self.tx.message)
            .copied()
            .ok_or_else(|| FlowError::Decode("message has no account keys".into()))?;

        let signed = wallet.sign_transaction(self.tx).await?;

        let signature = signed
            .signatures
            .first()
            .copied()
            .filter(|sig| *sig != Signature::default())
            .ok_or_else(|| FlowError::Signing("wallet returned an unsigned transaction".into()))?;
        if compat::get_fee_payer(&signed.message) != Some(&payer) {
            return Err(FlowError::Signing("wallet altered the transaction message".into()));
        }

        Ok(SignedTransaction {
            tx: signed,
            signature,
            last_valid_block_height: self.last_valid_block_height,
        })
    }
}

/// Transaction carrying the fee payer's signature.
///
/// Not `Clone`: submitting consumes it.
#[derive(Debug)]
pub struct SignedTransaction {
    tx: VersionedTransaction,
    signature: Signature,
    last_valid_block_height: Option<u64>,
}

impl SignedTransaction {
    /// Fee payer signature, which is also the transaction id
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn transaction(&self) -> &VersionedTransaction {
        &self.tx
    }

    pub fn last_valid_block_height(&self) -> Option<u64> {
        self.last_valid_block_height
    }

    /// Record that the cluster accepted the transaction
    pub(crate) fn into_submitted(self) -> SubmittedTransaction {
        SubmittedTransaction {
            signature: self.signature,
            last_valid_block_height: self.last_valid_block_height,
        }
    }
}

/// Transaction accepted by the RPC node, awaiting confirmation
#[derive(Debug)]
pub struct SubmittedTransaction {
    signature: Signature,
    last_valid_block_height: Option<u64>,
}

impl SubmittedTransaction {
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn last_valid_block_height(&self) -> Option<u64> {
        self.last_valid_block_height
    }

    pub(crate) fn into_confirmed(self, waited: Duration) -> ConfirmedTransaction {
        ConfirmedTransaction {
            signature: self.signature,
            waited,
        }
    }
}

/// Transaction confirmed without error at `confirmed` commitment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedTransaction {
    pub signature: Signature,
    /// Time spent polling for confirmation
    pub waited: Duration,
}

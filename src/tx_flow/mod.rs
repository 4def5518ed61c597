//! Transaction submission and confirmation flow
//!
//! The backend builds transactions; this client finishes them:
//!
//! 1. decode the base64 payload
//! 2. fetch a fresh blockhash (uniform retry policy)
//! 3. set blockhash and fee payer
//! 4. ask the wallet to sign
//! 5. submit with preflight
//! 6. poll for `confirmed`
//!
//! - **errors**: one variant per failure point
//! - **retry**: the single retry policy and its helper
//! - **transaction**: typestate lifecycle and payload codec
//! - **flow**: orchestration, submission ledger, confirmation polling

pub mod errors;
pub mod retry;
pub mod transaction;
mod flow;

pub use errors::FlowError;
pub use flow::{ConfirmOptions, TransactionFlow, LEDGER_RETENTION};
pub use retry::{retry_with_backoff, RetryPolicy, Transient};
pub use transaction::{
    decode_transaction, encode_transaction, BuiltTransaction, ConfirmedTransaction,
    SignedTransaction, SubmittedTransaction, TxState,
};

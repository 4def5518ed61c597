//! Compatibility layer for Solana message versions
//!
//! Backend-issued transactions arrive either as legacy messages or as v0
//! messages with address lookup tables. The transaction flow only needs a
//! handful of facts about a message (header, static keys, fee payer, where a
//! given signer sits) and this module answers them uniformly for both.
//!
//! It also knows how to turn a compiled legacy message back into
//! instructions, which is how the fee payer of a legacy message is replaced.

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    message::{Message, MessageHeader, VersionedMessage},
    pubkey::Pubkey,
};

/// Get the message header from a `VersionedMessage`.
#[inline]
#[must_use]
pub fn get_message_header(message: &VersionedMessage) -> &MessageHeader {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.header,
        VersionedMessage::V0(v0_msg) => &v0_msg.header,
    }
}

/// Get the static account keys (lookup-table keys are not included for v0).
#[inline]
#[must_use]
pub fn get_static_account_keys(message: &VersionedMessage) -> &[Pubkey] {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.account_keys,
        VersionedMessage::V0(v0_msg) => &v0_msg.account_keys,
    }
}

/// Required signers are always the first `num_required_signatures` keys.
#[inline]
#[must_use]
pub fn get_required_signers(message: &VersionedMessage) -> &[Pubkey] {
    let header = get_message_header(message);
    let account_keys = get_static_account_keys(message);
    let num_signers = header.num_required_signatures as usize;

    &account_keys[..num_signers.min(account_keys.len())]
}

/// The fee payer is the first static key, if the message has any keys.
#[inline]
#[must_use]
pub fn get_fee_payer(message: &VersionedMessage) -> Option<&Pubkey> {
    get_static_account_keys(message).first()
}

/// Position of `signer` among the required signers.
#[must_use]
pub fn signer_position(message: &VersionedMessage, signer: &Pubkey) -> Option<usize> {
    get_required_signers(message)
        .iter()
        .position(|key| key == signer)
}

/// Writability of a static account, derived from the header layout:
/// `[writable signers | readonly signers | writable unsigned | readonly unsigned]`.
fn is_writable_index(header: &MessageHeader, num_keys: usize, index: usize) -> bool {
    let num_signed = header.num_required_signatures as usize;
    if index < num_signed {
        index < num_signed.saturating_sub(header.num_readonly_signed_accounts as usize)
    } else {
        index < num_keys.saturating_sub(header.num_readonly_unsigned_accounts as usize)
    }
}

/// Rebuild the instruction list of a compiled legacy message.
///
/// Returns `None` if an instruction references an account index outside the
/// key list, which only happens for a corrupted message.
pub fn decompile_legacy_instructions(message: &Message) -> Option<Vec<Instruction>> {
    let keys = &message.account_keys;
    let num_signed = message.header.num_required_signatures as usize;

    message
        .instructions
        .iter()
        .map(|compiled| {
            let program_id = *keys.get(compiled.program_id_index as usize)?;
            let accounts = compiled
                .accounts
                .iter()
                .map(|&raw| {
                    let index = raw as usize;
                    let pubkey = *keys.get(index)?;
                    let is_signer = index < num_signed;
                    let is_writable = is_writable_index(&message.header, keys.len(), index);
                    Some(AccountMeta {
                        pubkey,
                        is_signer,
                        is_writable,
                    })
                })
                .collect::<Option<Vec<_>>>()?;
            Some(Instruction {
                program_id,
                accounts,
                data: compiled.data.clone(),
            })
        })
        .collect()
}

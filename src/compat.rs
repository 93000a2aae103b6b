//! Compatibility layer for Solana SDK message types
//!
//! Solana has two message formats — Legacy and V0 — with different APIs
//! for accessing the same information. This module provides a single
//! consistent view over both, plus the header arithmetic that
//! reconstructs per-account signer/writable flags from the three header
//! counts.
//!
//! The account key list of a message is laid out in four regions:
//!
//! ```text
//! [signed-writable][signed-readonly][unsigned-writable][unsigned-readonly]
//! ```
//!
//! so an index is a signer iff it falls before `num_required_signatures`,
//! and writable iff it falls in the first or third region.

use solana_sdk::{
    message::{MessageHeader, VersionedMessage},
    pubkey::Pubkey,
};

/// Get the message header, uniformly for Legacy and V0 messages.
#[inline]
#[must_use]
pub fn message_header(message: &VersionedMessage) -> &MessageHeader {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.header,
        VersionedMessage::V0(v0_msg) => &v0_msg.header,
    }
}

/// Get the static account keys embedded in the message.
///
/// For V0 messages this excludes addresses loaded from lookup tables,
/// which are only known after on-chain resolution.
#[inline]
#[must_use]
pub fn static_account_keys(message: &VersionedMessage) -> &[Pubkey] {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.account_keys,
        VersionedMessage::V0(v0_msg) => &v0_msg.account_keys,
    }
}

/// Get the accounts that must sign this transaction.
///
/// Required signers are always the first `num_required_signatures`
/// entries of the static key list.
#[inline]
#[must_use]
pub fn required_signers(message: &VersionedMessage) -> &[Pubkey] {
    let header = message_header(message);
    let account_keys = static_account_keys(message);
    let num_signers = header.num_required_signatures as usize;

    &account_keys[..num_signers.min(account_keys.len())]
}

/// Whether the account at `index` must sign the transaction.
#[inline]
#[must_use]
pub fn is_signer_index(header: &MessageHeader, index: usize) -> bool {
    index < header.num_required_signatures as usize
}

/// Whether the account at `index` is writable, given the total static
/// key count.
#[inline]
#[must_use]
pub fn is_writable_index(header: &MessageHeader, total_keys: usize, index: usize) -> bool {
    let signed = header.num_required_signatures as usize;
    let readonly_signed = header.num_readonly_signed_accounts as usize;
    let readonly_unsigned = header.num_readonly_unsigned_accounts as usize;

    index < signed.saturating_sub(readonly_signed)
        || (index >= signed && index < total_keys.saturating_sub(readonly_unsigned))
}

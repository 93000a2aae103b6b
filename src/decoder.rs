//! Transaction decoder
//!
//! The backend hands the client an opaque byte blob that may encode a
//! legacy or a versioned transaction. Rather than the try/catch ordering
//! the old front end used (which differed between call sites), the
//! decoder probes the wire prefix for the versioned discriminant and
//! attempts that format first. Decoding fails only if both
//! deserialization attempts fail, and the error carries both underlying
//! messages.

use solana_sdk::{
    pubkey::Pubkey,
    transaction::{Transaction, VersionedTransaction},
};

use crate::compat;
use crate::errors::PipelineError;

/// A transaction decoded from raw bytes, tagged by the wire format that
/// produced it.
#[derive(Debug, Clone)]
pub enum DecodedTransaction {
    Legacy(Transaction),
    Versioned(VersionedTransaction),
}

impl DecodedTransaction {
    pub fn is_versioned(&self) -> bool {
        matches!(self, Self::Versioned(_))
    }

    pub fn format_name(&self) -> &'static str {
        match self {
            Self::Legacy(_) => "legacy",
            Self::Versioned(_) => "versioned",
        }
    }

    /// Fee payer, i.e. the first static account key.
    pub fn fee_payer(&self) -> Option<Pubkey> {
        match self {
            Self::Legacy(tx) => tx.message.account_keys.first().copied(),
            Self::Versioned(tx) => compat::static_account_keys(&tx.message).first().copied(),
        }
    }
}

/// Decode a raw transaction blob as either wire format.
///
/// Pure function over the bytes; fails only if both attempts fail.
pub fn decode(bytes: &[u8]) -> Result<DecodedTransaction, PipelineError> {
    if wire_prefix_is_versioned(bytes) {
        match try_versioned(bytes) {
            Ok(tx) => Ok(DecodedTransaction::Versioned(tx)),
            Err(versioned_err) => match try_legacy(bytes) {
                Ok(tx) => Ok(DecodedTransaction::Legacy(tx)),
                Err(legacy_err) => Err(PipelineError::Decode {
                    versioned: versioned_err,
                    legacy: legacy_err,
                }),
            },
        }
    } else {
        match try_legacy(bytes) {
            Ok(tx) => Ok(DecodedTransaction::Legacy(tx)),
            Err(legacy_err) => match try_versioned(bytes) {
                Ok(tx) => Ok(DecodedTransaction::Versioned(tx)),
                Err(versioned_err) => Err(PipelineError::Decode {
                    versioned: versioned_err,
                    legacy: legacy_err,
                }),
            },
        }
    }
}

fn try_legacy(bytes: &[u8]) -> Result<Transaction, String> {
    bincode::deserialize::<Transaction>(bytes).map_err(|e| e.to_string())
}

fn try_versioned(bytes: &[u8]) -> Result<VersionedTransaction, String> {
    bincode::deserialize::<VersionedTransaction>(bytes).map_err(|e| e.to_string())
}

/// Probe whether the blob's message prefix carries the versioned-format
/// discriminant.
///
/// A serialized transaction is a compact-u16 signature count, that many
/// 64-byte signatures, then the message. The first message byte of a
/// versioned message has its high bit set; a legacy message starts with
/// `num_required_signatures`, which is always < 128.
fn wire_prefix_is_versioned(bytes: &[u8]) -> bool {
    let Some((count, offset)) = decode_compact_u16(bytes) else {
        return false;
    };
    let Some(message_start) = count.checked_mul(64).and_then(|n| n.checked_add(offset)) else {
        return false;
    };
    bytes
        .get(message_start)
        .map(|b| b & 0x80 != 0)
        .unwrap_or(false)
}

/// Decode a compact-u16 length prefix, returning (value, bytes consumed).
fn decode_compact_u16(bytes: &[u8]) -> Option<(usize, usize)> {
    let mut value: usize = 0;
    for i in 0..3 {
        let byte = *bytes.get(i)?;
        value |= ((byte & 0x7f) as usize) << (7 * i);
        if byte & 0x80 == 0 {
            if value > u16::MAX as usize {
                return None;
            }
            return Some((value, i + 1));
        }
    }
    None
}

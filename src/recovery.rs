//! Signature recovery for the already-processed race
//!
//! When a duplicate submission races a prior successful one, the node
//! rejects the second send with "already been processed" even though the
//! transaction landed. The caller still wants something to display, so
//! recovery tries, in order:
//!
//! 1. a base58 signature embedded in the error message,
//! 2. a signature-length line in the attached logs,
//! 3. the signer's most recent on-chain transaction, accepted when it
//!    invoked the expected program,
//! 4. a synthesized `processed_<millis>_<random>` placeholder.
//!
//! The placeholder exists purely so the UI has a non-empty reference; it
//! is not an on-chain signature, which is why the pipeline reports it as
//! `LikelySuccess` rather than `Confirmed`.
//!
//! Recovery never fails and never returns an empty string. Network
//! errors inside tier 3 are logged and skipped, not propagated.

use once_cell::sync::Lazy;
use regex::Regex;
use solana_sdk::pubkey::Pubkey;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::broadcast::BroadcastCapability;

/// How many recent transactions to inspect in tier 3.
const RECENT_SIGNATURE_LIMIT: usize = 3;

/// Log lines longer than this are plausibly signatures.
const MIN_SIGNATURE_LOG_LEN: usize = 80;

static BASE58_SIGNATURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[1-9A-HJ-NP-Za-km-z]{32,44}").expect("valid signature pattern"));

/// Which recovery tier produced the reference, for metrics and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryTier {
    ErrorMessage,
    Logs,
    RecentHistory,
    Synthesized,
}

impl RecoveryTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ErrorMessage => "error_message",
            Self::Logs => "logs",
            Self::RecentHistory => "recent_history",
            Self::Synthesized => "synthesized",
        }
    }
}

/// Recover or synthesize a transaction reference after an
/// already-processed rejection.
pub async fn recover_reference(
    error_message: &str,
    logs: &[String],
    network: &dyn BroadcastCapability,
    signer: Pubkey,
    expected_program: Option<Pubkey>,
) -> (String, RecoveryTier) {
    if let Some(found) = BASE58_SIGNATURE.find(error_message) {
        debug!(signature = found.as_str(), "Recovered signature from error message");
        return (found.as_str().to_string(), RecoveryTier::ErrorMessage);
    }

    if let Some(line) = logs.iter().find(|line| line.len() > MIN_SIGNATURE_LOG_LEN) {
        debug!("Recovered signature candidate from logs");
        return (line.clone(), RecoveryTier::Logs);
    }

    if let Some(program) = expected_program {
        match recent_matching_signature(network, signer, program).await {
            Ok(Some(signature)) => {
                debug!(signature = %signature, "Recovered signature from recent history");
                return (signature, RecoveryTier::RecentHistory);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Recent-history signature lookup failed"),
        }
    }

    (synthesize_reference(), RecoveryTier::Synthesized)
}

/// Tier 3: newest transaction for the signer, accepted only when it
/// invoked the expected program.
async fn recent_matching_signature(
    network: &dyn BroadcastCapability,
    signer: Pubkey,
    expected_program: Pubkey,
) -> Result<Option<String>, crate::errors::PipelineError> {
    let signatures = network
        .signatures_for_address(&signer, RECENT_SIGNATURE_LIMIT)
        .await?;
    let Some(newest) = signatures.first() else {
        return Ok(None);
    };

    let programs = network.successful_transaction_programs(newest).await?;
    match programs {
        Some(programs) if programs.contains(&expected_program) => Ok(Some(newest.to_string())),
        _ => Ok(None),
    }
}

/// Tier 4: non-empty placeholder, never a valid on-chain signature.
fn synthesize_reference() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let suffix: String = (0..13)
        .map(|_| {
            let digits = b"0123456789abcdefghijklmnopqrstuvwxyz";
            digits[fastrand::usize(..digits.len())] as char
        })
        .collect();
    format!("processed_{millis}_{suffix}")
}

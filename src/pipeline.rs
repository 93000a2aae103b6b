//! Submission orchestrator
//!
//! Drives a backend transaction envelope through decode, optional
//! downgrade, signing, broadcast, and confirmation. One call, one
//! outcome:
//!
//! - [`SubmitOutcome::Confirmed`] carries a real on-chain signature;
//! - [`SubmitOutcome::LikelySuccess`] carries whatever reference the
//!   already-processed recovery produced, which may be synthesized and
//!   must never be treated as a signature.
//!
//! A concurrent duplicate of the same action over the same bytes is
//! rejected up front with [`PipelineError::DuplicateInFlight`] instead of
//! being queued behind the first attempt.

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::warn;

use crate::broadcast::{BroadcastCapability, BroadcastOutcome};
use crate::decoder::{self, DecodedTransaction};
use crate::downgrade;
use crate::envelope::TxEnvelope;
use crate::errors::PipelineError;
use crate::metrics::{metrics, Timer};
use crate::recovery;
use crate::structured_logging::SubmissionContext;
use crate::wallet::SigningCapability;

/// The user action a submission belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Buy,
    Sell,
    AddLiquidity,
    CreatePool,
    CreateToken,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::AddLiquidity => "add_liquidity",
            Self::CreatePool => "create_pool",
            Self::CreateToken => "create_token",
        }
    }
}

/// Terminal result of a submission.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Landed and reached `confirmed` commitment.
    Confirmed(solana_sdk::signature::Signature),
    /// An earlier duplicate submission won the race; the transaction very
    /// likely landed but this attempt holds no confirmed signature of its
    /// own. The reference may be a recovered signature or a
    /// `processed_...` placeholder.
    LikelySuccess { reference: String },
}

impl SubmitOutcome {
    /// Display reference for the user.
    pub fn reference(&self) -> String {
        match self {
            Self::Confirmed(signature) => signature.to_string(),
            Self::LikelySuccess { reference } => reference.clone(),
        }
    }

    /// Explorer link, only for outcomes backed by a real signature.
    pub fn explorer_url(&self, cluster: &str) -> Option<String> {
        match self {
            Self::Confirmed(signature) => Some(format!(
                "https://solscan.io/tx/{signature}?cluster={cluster}"
            )),
            Self::LikelySuccess { .. } => None,
        }
    }
}

type InFlightKey = (ActionKind, [u8; 32]);

/// RAII entry in the in-flight set; removal happens on drop so every exit
/// path releases the slot.
struct InFlightGuard {
    set: Arc<DashMap<InFlightKey, ()>>,
    key: InFlightKey,
}

impl InFlightGuard {
    fn acquire(
        set: Arc<DashMap<InFlightKey, ()>>,
        key: InFlightKey,
    ) -> Result<Self, PipelineError> {
        use dashmap::mapref::entry::Entry;
        let result = match set.entry(key) {
            Entry::Occupied(_) => Err(PipelineError::DuplicateInFlight),
            Entry::Vacant(vacant) => {
                vacant.insert(());
                metrics().submissions_in_flight.inc();
                Ok(())
            }
        };
        result.map(|()| Self { set, key })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.remove(&self.key);
        metrics().submissions_in_flight.dec();
    }
}

/// The submission pipeline.
pub struct SubmitPipeline {
    network: Arc<dyn BroadcastCapability>,
    /// Program the action is expected to invoke; used by tier-3 signature
    /// recovery. `None` disables that tier.
    expected_program: Option<Pubkey>,
    /// Cluster name for explorer links.
    explorer_cluster: String,
    in_flight: Arc<DashMap<InFlightKey, ()>>,
}

impl SubmitPipeline {
    pub fn new(
        network: Arc<dyn BroadcastCapability>,
        expected_program: Option<Pubkey>,
        explorer_cluster: impl Into<String>,
    ) -> Self {
        Self {
            network,
            expected_program,
            explorer_cluster: explorer_cluster.into(),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn explorer_cluster(&self) -> &str {
        &self.explorer_cluster
    }

    /// Submit a backend envelope: validate it, then run the byte pipeline.
    pub async fn submit(
        &self,
        action: ActionKind,
        envelope: &TxEnvelope,
        signer: &dyn SigningCapability,
    ) -> Result<SubmitOutcome, PipelineError> {
        let bytes = envelope.transaction_bytes()?;
        self.submit_bytes(action, &bytes, signer).await
    }

    /// Submit raw transaction bytes through decode, downgrade when the
    /// wallet needs it, sign, broadcast, and confirm.
    pub async fn submit_bytes(
        &self,
        action: ActionKind,
        bytes: &[u8],
        signer: &dyn SigningCapability,
    ) -> Result<SubmitOutcome, PipelineError> {
        let ctx = SubmissionContext::new(action.as_str());
        let timer = Timer::new();
        metrics().submissions_total.inc();

        let result = self.run(action, bytes, signer, &ctx).await;
        timer.observe_duration(&metrics().submit_latency);

        match &result {
            Ok(SubmitOutcome::Confirmed(signature)) => {
                metrics().submissions_confirmed.inc();
                ctx.logger.log_confirmed(
                    action.as_str(),
                    &signature.to_string(),
                    (timer.elapsed_secs() * 1000.0) as u64,
                );
            }
            Ok(SubmitOutcome::LikelySuccess { .. }) => {
                metrics().submissions_likely_success.inc();
            }
            Err(PipelineError::DuplicateInFlight) => {
                metrics().submissions_duplicate.inc();
            }
            Err(err) => {
                metrics().submissions_failed.inc();
                ctx.logger.log_failure(
                    action.as_str(),
                    err.category(),
                    &err.to_string(),
                    (timer.elapsed_secs() * 1000.0) as u64,
                );
            }
        }
        result
    }

    async fn run(
        &self,
        action: ActionKind,
        bytes: &[u8],
        signer: &dyn SigningCapability,
        ctx: &SubmissionContext,
    ) -> Result<SubmitOutcome, PipelineError> {
        let _guard =
            InFlightGuard::acquire(Arc::clone(&self.in_flight), (action, content_key(bytes)))?;

        let decoded = decoder::decode(bytes).inspect_err(|_| {
            metrics().decode_failures.inc();
        })?;
        ctx.logger
            .log_decoded(action.as_str(), decoded.format_name(), bytes.len());

        let decoded = self.adapt_format(action, decoded, signer, ctx)?;

        // Wallets with a native one-step path get first shot; its failures
        // are non-fatal and fall back to sign-then-broadcast.
        if signer.supports_native_sign_and_send() {
            match signer.sign_and_send(&decoded).await {
                Ok(signature) => {
                    ctx.logger
                        .log_submitted(action.as_str(), &signature.to_string());
                    self.network.await_confirmation(&signature).await?;
                    return Ok(SubmitOutcome::Confirmed(signature));
                }
                Err(err) => {
                    ctx.logger.warn(&format!(
                        "native sign-and-send failed, falling back to two-step path: {err}"
                    ));
                }
            }
        }

        let sign_timer = Timer::new();
        let signed = signer.sign(decoded).await?;
        sign_timer.observe_duration(&metrics().sign_latency);
        ctx.logger.log_signed(
            action.as_str(),
            &signer.address().to_string(),
            (sign_timer.elapsed_secs() * 1000.0) as u64,
        );

        let broadcast_timer = Timer::new();
        let outcome = self.network.broadcast(&signed).await?;
        broadcast_timer.observe_duration(&metrics().broadcast_latency);

        match outcome {
            BroadcastOutcome::Submitted(signature) => {
                ctx.logger
                    .log_submitted(action.as_str(), &signature.to_string());
                self.network.await_confirmation(&signature).await?;
                Ok(SubmitOutcome::Confirmed(signature))
            }
            BroadcastOutcome::AlreadyProcessed { message, logs } => {
                let (reference, tier) = recovery::recover_reference(
                    &message,
                    &logs,
                    self.network.as_ref(),
                    signer.address(),
                    self.expected_program,
                )
                .await;
                metrics().record_recovery(tier.as_str());
                ctx.logger
                    .log_already_processed(action.as_str(), tier.as_str(), &reference);
                Ok(SubmitOutcome::LikelySuccess { reference })
            }
        }
    }

    /// Downgrade a versioned transaction when the wallet cannot sign it.
    fn adapt_format(
        &self,
        action: ActionKind,
        decoded: DecodedTransaction,
        signer: &dyn SigningCapability,
        ctx: &SubmissionContext,
    ) -> Result<DecodedTransaction, PipelineError> {
        match decoded {
            DecodedTransaction::Versioned(versioned) if !signer.supports_versioned() => {
                let legacy = match downgrade::downgrade(&versioned) {
                    Ok(legacy) => legacy,
                    Err(err) => {
                        warn!(action = action.as_str(), error = %err, "Downgrade failed");
                        return Err(err);
                    }
                };
                metrics().downgrades_total.inc();
                ctx.logger.log_downgraded(action.as_str());
                Ok(DecodedTransaction::Legacy(legacy))
            }
            other => Ok(other),
        }
    }
}

/// Content key for the in-flight set: same action + same bytes means the
/// same user intent.
fn content_key(bytes: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(bytes);
    digest.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names() {
        assert_eq!(ActionKind::Buy.as_str(), "buy");
        assert_eq!(ActionKind::Sell.as_str(), "sell");
        assert_eq!(ActionKind::AddLiquidity.as_str(), "add_liquidity");
        assert_eq!(ActionKind::CreatePool.as_str(), "create_pool");
        assert_eq!(ActionKind::CreateToken.as_str(), "create_token");
    }

    #[test]
    fn test_content_key_is_stable_and_input_sensitive() {
        assert_eq!(content_key(b"abc"), content_key(b"abc"));
        assert_ne!(content_key(b"abc"), content_key(b"abd"));
    }

    #[test]
    fn test_in_flight_guard_blocks_then_releases() {
        let set: Arc<DashMap<InFlightKey, ()>> = Arc::new(DashMap::new());
        let key = (ActionKind::Buy, content_key(b"payload"));

        let guard = InFlightGuard::acquire(Arc::clone(&set), key).unwrap();
        assert!(matches!(
            InFlightGuard::acquire(Arc::clone(&set), key),
            Err(PipelineError::DuplicateInFlight)
        ));
        // Different action over the same bytes is a different intent.
        let other = (ActionKind::Sell, content_key(b"payload"));
        let _other_guard = InFlightGuard::acquire(Arc::clone(&set), other).unwrap();

        drop(guard);
        assert!(InFlightGuard::acquire(Arc::clone(&set), key).is_ok());
    }

    #[test]
    fn test_outcome_reference_and_explorer_url() {
        let signature = solana_sdk::signature::Signature::from([3u8; 64]);
        let confirmed = SubmitOutcome::Confirmed(signature);
        assert_eq!(confirmed.reference(), signature.to_string());
        let url = confirmed.explorer_url("devnet").unwrap();
        assert!(url.starts_with("https://solscan.io/tx/"));
        assert!(url.ends_with("?cluster=devnet"));

        let likely = SubmitOutcome::LikelySuccess {
            reference: "processed_123_abc".to_string(),
        };
        assert_eq!(likely.reference(), "processed_123_abc");
        assert!(likely.explorer_url("devnet").is_none());
    }
}

//! Network broadcast capability
//!
//! The pipeline talks to the cluster through the [`BroadcastCapability`]
//! trait so call sites and tests can swap the transport. The real
//! implementation wraps the nonblocking RPC client with the submission
//! options the front end used: skip preflight, bounded transport retries,
//! `confirmed` commitment.
//!
//! "Transaction has already been processed" is not an error here: it is a
//! duplicate-submission race that means an earlier attempt landed. The
//! send path classifies it into [`BroadcastOutcome::AlreadyProcessed`] —
//! structurally via the RPC transaction error when available, by message
//! substring otherwise — so the caller can run signature recovery instead
//! of failing.

use async_trait::async_trait;
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_client::GetConfirmedSignaturesForAddress2Config,
    rpc_config::{RpcSendTransactionConfig, RpcTransactionConfig},
    rpc_request::{RpcError, RpcResponseErrorData},
};
use solana_sdk::{
    commitment_config::CommitmentConfig, pubkey::Pubkey, signature::Signature,
    transaction::TransactionError,
};
use solana_transaction_status::UiTransactionEncoding;
use std::time::{Duration, Instant};

use crate::compat;
use crate::decoder::DecodedTransaction;
use crate::errors::PipelineError;

/// Result of handing a signed transaction to the network.
#[derive(Debug, Clone)]
pub enum BroadcastOutcome {
    /// The node accepted the transaction and assigned its signature.
    Submitted(Signature),
    /// The node reported the transaction as already processed; an earlier
    /// duplicate submission won the race.
    AlreadyProcessed {
        /// Full error message, kept for signature recovery.
        message: String,
        /// Preflight/simulation logs when the node attached any.
        logs: Vec<String>,
    },
}

/// Network operations the pipeline depends on.
#[async_trait]
pub trait BroadcastCapability: Send + Sync {
    /// Broadcast a signed transaction.
    async fn broadcast(&self, tx: &DecodedTransaction) -> Result<BroadcastOutcome, PipelineError>;

    /// Wait until the signature reaches `confirmed` commitment.
    ///
    /// A transaction that landed with an on-chain error is a failure
    /// carrying that error, not a confirmation.
    async fn await_confirmation(&self, signature: &Signature) -> Result<(), PipelineError>;

    /// Most recent transaction signatures for an address, newest first.
    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<Signature>, PipelineError>;

    /// Program ids invoked by a transaction, or `None` if the transaction
    /// is missing or failed on chain.
    async fn successful_transaction_programs(
        &self,
        signature: &Signature,
    ) -> Result<Option<Vec<Pubkey>>, PipelineError>;
}

/// [`BroadcastCapability`] over a Solana JSON-RPC node.
pub struct RpcBroadcaster {
    rpc: RpcClient,
    skip_preflight: bool,
    max_retries: usize,
    confirm_timeout: Duration,
}

impl RpcBroadcaster {
    pub fn new(
        url: String,
        skip_preflight: bool,
        max_retries: usize,
        confirm_timeout: Duration,
    ) -> Self {
        let rpc = RpcClient::new_with_commitment(url, CommitmentConfig::confirmed());
        Self {
            rpc,
            skip_preflight,
            max_retries,
            confirm_timeout,
        }
    }
}

#[async_trait]
impl BroadcastCapability for RpcBroadcaster {
    async fn broadcast(&self, tx: &DecodedTransaction) -> Result<BroadcastOutcome, PipelineError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: self.skip_preflight,
            max_retries: Some(self.max_retries),
            ..RpcSendTransactionConfig::default()
        };

        let result = match tx {
            DecodedTransaction::Legacy(tx) => {
                self.rpc.send_transaction_with_config(tx, config).await
            }
            DecodedTransaction::Versioned(tx) => {
                self.rpc.send_transaction_with_config(tx, config).await
            }
        };

        match result {
            Ok(signature) => Ok(BroadcastOutcome::Submitted(signature)),
            Err(err) => classify_send_failure(err),
        }
    }

    async fn await_confirmation(&self, signature: &Signature) -> Result<(), PipelineError> {
        let started = Instant::now();
        loop {
            let statuses = self
                .rpc
                .get_signature_statuses(&[*signature])
                .await
                .map_err(|e| PipelineError::Network(e.to_string()))?;

            if let Some(status) = statuses.value.into_iter().next().flatten() {
                if let Some(err) = status.err {
                    return Err(PipelineError::TransactionFailed(err.to_string()));
                }
                if status.satisfies_commitment(CommitmentConfig::confirmed()) {
                    return Ok(());
                }
            }

            if started.elapsed() > self.confirm_timeout {
                return Err(PipelineError::Network(format!(
                    "confirmation for {signature} timed out after {:?}",
                    self.confirm_timeout
                )));
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    async fn signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> Result<Vec<Signature>, PipelineError> {
        let config = GetConfirmedSignaturesForAddress2Config {
            limit: Some(limit),
            ..GetConfirmedSignaturesForAddress2Config::default()
        };
        let statuses = self
            .rpc
            .get_signatures_for_address_with_config(address, config)
            .await
            .map_err(|e| PipelineError::Network(e.to_string()))?;

        Ok(statuses
            .into_iter()
            .filter_map(|status| status.signature.parse().ok())
            .collect())
    }

    async fn successful_transaction_programs(
        &self,
        signature: &Signature,
    ) -> Result<Option<Vec<Pubkey>>, PipelineError> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };
        let fetched = self
            .rpc
            .get_transaction_with_config(signature, config)
            .await
            .map_err(|e| PipelineError::Network(e.to_string()))?;

        let failed = fetched
            .transaction
            .meta
            .as_ref()
            .map(|meta| meta.err.is_some())
            .unwrap_or(true);
        if failed {
            return Ok(None);
        }

        let Some(tx) = fetched.transaction.transaction.decode() else {
            return Ok(None);
        };
        let keys = compat::static_account_keys(&tx.message);
        let programs = tx
            .message
            .instructions()
            .iter()
            .filter_map(|ix| keys.get(ix.program_id_index as usize).copied())
            .collect();
        Ok(Some(programs))
    }
}

/// Classify a failed send into an already-processed outcome or a typed
/// pipeline error.
fn classify_send_failure(err: ClientError) -> Result<BroadcastOutcome, PipelineError> {
    let logs = preflight_logs(&err);
    let message = err.to_string();

    let already_processed = matches!(
        err.get_transaction_error(),
        Some(TransactionError::AlreadyProcessed)
    ) || message.contains("already been processed");

    if already_processed {
        return Ok(BroadcastOutcome::AlreadyProcessed { message, logs });
    }
    Err(PipelineError::classify_rpc_error(&message))
}

fn preflight_logs(err: &ClientError) -> Vec<String> {
    if let ClientErrorKind::RpcError(RpcError::RpcResponseError {
        data: RpcResponseErrorData::SendTransactionPreflightFailure(simulation),
        ..
    }) = &err.kind
    {
        simulation.logs.clone().unwrap_or_default()
    } else {
        Vec::new()
    }
}

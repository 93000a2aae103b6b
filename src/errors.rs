//! Error taxonomy for the submission pipeline
//!
//! Every stage raises a typed error; nothing is swallowed. The one
//! error-shaped success ("transaction has already been processed") is not
//! represented here at all — it is classified into a `BroadcastOutcome`
//! by the network layer and handled by signature recovery.

use thiserror::Error;

/// Error type covering the full decode → downgrade → sign → broadcast →
/// confirm lifecycle.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Both deserialization attempts failed.
    ///
    /// Both underlying messages are carried verbatim so callers can
    /// display them to aid diagnosis.
    #[error("cannot deserialize transaction (versioned: {versioned}; legacy: {legacy})")]
    Decode { versioned: String, legacy: String },

    /// The versioned transaction uses address table lookups, which have
    /// no legacy equivalent. The user should switch to a wallet that
    /// supports versioned transactions.
    #[error("cannot convert transaction with address table lookups to legacy format")]
    UnsupportedFeature,

    /// Malformed account or program index during downgrade. Any
    /// per-instruction failure aborts the whole conversion.
    #[error("transaction conversion failed: {0}")]
    Conversion(String),

    /// The backend envelope reported a non-success code, or carried no
    /// transaction data.
    #[error("backend error {code}: {message}")]
    Backend { code: i64, message: String },

    /// The user declined the signature request in their wallet.
    #[error("transaction was rejected by user")]
    UserRejected,

    /// The transaction's blockhash expired before landing. The caller
    /// should request a fresh transaction from the backend and restart.
    #[error("transaction expired: {0}")]
    BlockhashExpired(String),

    #[error("insufficient funds for transaction: {0}")]
    InsufficientFunds(String),

    #[error("network error: {0}")]
    Network(String),

    /// The (possibly downgraded) transaction format is not accepted by
    /// the connected wallet.
    #[error("transaction format not supported by the connected wallet: {0}")]
    WalletIncompatible(String),

    /// A submission with the same action and input bytes is already in
    /// flight; the duplicate attempt is rejected, not queued.
    #[error("a submission for this request is already in flight")]
    DuplicateInFlight,

    #[error("signing failed: {0}")]
    Signing(String),

    /// The transaction landed on chain but executed with an error.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// Internal invariant violation; should be rare.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Whether retrying the same user action might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::UserRejected => true,
            Self::BlockhashExpired(_) => true,
            Self::Network(_) => true,
            Self::DuplicateInFlight => true,

            Self::Decode { .. } => false,
            Self::UnsupportedFeature => false,
            Self::Conversion(_) => false,
            Self::Backend { .. } => false,
            Self::InsufficientFunds(_) => false,
            Self::WalletIncompatible(_) => false,
            Self::Signing(_) => false,
            Self::TransactionFailed(_) => false,
            Self::Internal(_) => false,
        }
    }

    /// Error category for metrics and structured logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Decode { .. } => "decode",
            Self::UnsupportedFeature => "unsupported_feature",
            Self::Conversion(_) => "conversion",
            Self::Backend { .. } => "backend",
            Self::UserRejected => "user_rejected",
            Self::BlockhashExpired(_) => "blockhash_expired",
            Self::InsufficientFunds(_) => "insufficient_funds",
            Self::Network(_) => "network",
            Self::WalletIncompatible(_) => "wallet_incompatible",
            Self::DuplicateInFlight => "duplicate_in_flight",
            Self::Signing(_) => "signing",
            Self::TransactionFailed(_) => "onchain",
            Self::Internal(_) => "internal",
        }
    }

    /// Classify an opaque wallet error message into a typed error.
    ///
    /// Wallet adapters report failures as strings; these patterns match
    /// the messages the common adapters produce. A bare "Unexpected
    /// error" is what wallets return when handed a converted transaction
    /// they cannot represent.
    pub fn classify_wallet_error(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("user rejected") || lower.contains("rejected the request") {
            Self::UserRejected
        } else if lower.contains("blockhash") {
            Self::BlockhashExpired(message.to_string())
        } else if lower.contains("insufficient") {
            Self::InsufficientFunds(message.to_string())
        } else if lower.contains("network") || lower.contains("connection") || lower.contains("timeout") {
            Self::Network(message.to_string())
        } else if message == "Unexpected error" {
            Self::WalletIncompatible(message.to_string())
        } else {
            Self::Signing(message.to_string())
        }
    }

    /// Classify an RPC send failure message into a typed error.
    pub fn classify_rpc_error(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("blockhash not found") || lower.contains("block height exceeded") {
            Self::BlockhashExpired(message.to_string())
        } else if lower.contains("insufficient funds") || lower.contains("insufficient lamports") {
            Self::InsufficientFunds(message.to_string())
        } else {
            Self::Network(message.to_string())
        }
    }
}

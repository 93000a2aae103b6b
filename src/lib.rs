//! Client-side transaction pipeline for a Solana DEX backend
//!
//! The backend builds unsigned transactions and returns them in a JSON
//! envelope; this library decodes the blob into either Solana wire
//! format, downgrades versioned transactions for wallets that cannot
//! sign them, signs, broadcasts, confirms, and recovers a usable
//! reference when a duplicate submission races an earlier success.

pub mod backend;
pub mod broadcast;
pub mod compat;
pub mod config;
pub mod decoder;
pub mod downgrade;
pub mod envelope;
pub mod errors;
pub mod metrics;
pub mod pipeline;
pub mod recovery;
pub mod structured_logging;
pub mod wallet;

// Re-export commonly used types
pub use solana_sdk::{message::VersionedMessage, pubkey::Pubkey, signature::Signature};

pub use decoder::DecodedTransaction;
pub use errors::PipelineError;
pub use pipeline::{ActionKind, SubmitOutcome, SubmitPipeline};

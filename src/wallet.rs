//! Signing capability abstraction and the local keypair signer
//!
//! The pipeline never reaches into an ambient wallet object. Callers pass
//! an explicit [`SigningCapability`] whose capability flags say what the
//! wallet can do: whether it accepts the versioned wire format, and
//! whether it offers a native one-step sign-and-send path.

use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    signer::Signer,
};
use std::sync::Arc;

use crate::compat;
use crate::decoder::DecodedTransaction;
use crate::errors::PipelineError;

/// Abstract interface over a user's wallet.
///
/// Capability support is declared through explicit flags rather than
/// runtime feature detection, so the pipeline's format decisions are
/// deterministic per signer.
#[async_trait]
pub trait SigningCapability: Send + Sync {
    /// The signer's public address (the expected fee payer).
    fn address(&self) -> Pubkey;

    /// Whether this wallet can sign the versioned wire format.
    fn supports_versioned(&self) -> bool;

    /// Whether this wallet offers a native one-step sign-and-send path.
    fn supports_native_sign_and_send(&self) -> bool {
        false
    }

    /// Request a signature over the transaction.
    ///
    /// Suspends until the wallet resolves; a declined request surfaces as
    /// [`PipelineError::UserRejected`].
    async fn sign(&self, tx: DecodedTransaction) -> Result<DecodedTransaction, PipelineError>;

    /// Native one-step path; only called when
    /// [`supports_native_sign_and_send`](Self::supports_native_sign_and_send)
    /// is true. Failures here are non-fatal — the pipeline falls back to
    /// the two-step path.
    async fn sign_and_send(&self, tx: &DecodedTransaction) -> Result<Signature, PipelineError> {
        let _ = tx;
        Err(PipelineError::Signing(
            "this signer has no native sign-and-send path".to_string(),
        ))
    }
}

/// Local keypair signer used by the CLI and tests.
pub struct KeypairSigner {
    keypair: Arc<Keypair>,
    supports_versioned: bool,
}

impl KeypairSigner {
    /// Load a signer from a keypair file.
    ///
    /// Accepts the raw 64-byte format, a JSON byte array, or a base58
    /// string as exported by browser wallets; all-zero keys are rejected.
    pub fn from_file(path: &str, supports_versioned: bool) -> Result<Self, PipelineError> {
        let keypair_bytes = std::fs::read(path)
            .map_err(|e| PipelineError::Signing(format!("failed to read keypair file {path}: {e}")))?;

        let bytes = if keypair_bytes.len() == 64 {
            keypair_bytes
        } else if let Ok(json) = serde_json::from_slice::<Vec<u8>>(&keypair_bytes) {
            json
        } else {
            let text = std::str::from_utf8(&keypair_bytes)
                .map_err(|_| PipelineError::Signing("unrecognized keypair file format".to_string()))?;
            bs58::decode(text.trim())
                .into_vec()
                .map_err(|e| PipelineError::Signing(format!("invalid base58 keypair: {e}")))?
        };

        if bytes.len() != 64 {
            return Err(PipelineError::Signing(format!(
                "invalid keypair length: expected 64 bytes, got {}",
                bytes.len()
            )));
        }
        if bytes.iter().all(|&b| b == 0) {
            return Err(PipelineError::Signing("all-zero key rejected".to_string()));
        }
        let keypair = Keypair::try_from(bytes.as_slice())
            .map_err(|e| PipelineError::Signing(format!("invalid keypair bytes: {e}")))?;

        Ok(Self {
            keypair: Arc::new(keypair),
            supports_versioned,
        })
    }

    pub fn from_keypair(keypair: Keypair, supports_versioned: bool) -> Self {
        Self {
            keypair: Arc::new(keypair),
            supports_versioned,
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }
}

#[async_trait]
impl SigningCapability for KeypairSigner {
    fn address(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    fn supports_versioned(&self) -> bool {
        self.supports_versioned
    }

    async fn sign(&self, tx: DecodedTransaction) -> Result<DecodedTransaction, PipelineError> {
        match tx {
            DecodedTransaction::Legacy(mut legacy) => {
                let blockhash = legacy.message.recent_blockhash;
                // Partial sign: the backend may already carry other
                // required signatures (e.g. a generated mint keypair).
                legacy
                    .try_partial_sign(&[self.keypair.as_ref()], blockhash)
                    .map_err(|e| PipelineError::Signing(e.to_string()))?;
                Ok(DecodedTransaction::Legacy(legacy))
            }
            DecodedTransaction::Versioned(mut versioned) => {
                if !self.supports_versioned {
                    return Err(PipelineError::WalletIncompatible(
                        "signer does not accept the versioned wire format".to_string(),
                    ));
                }
                let signers = compat::required_signers(&versioned.message);
                let position = signers
                    .iter()
                    .position(|key| *key == self.keypair.pubkey())
                    .ok_or_else(|| {
                        PipelineError::Signing(format!(
                            "keypair {} is not a required signer",
                            self.keypair.pubkey()
                        ))
                    })?;
                let num_required =
                    compat::message_header(&versioned.message).num_required_signatures as usize;
                let signature = self.keypair.sign_message(&versioned.message.serialize());

                if versioned.signatures.len() < num_required {
                    versioned
                        .signatures
                        .resize(num_required, Signature::default());
                }
                versioned.signatures[position] = signature;
                Ok(DecodedTransaction::Versioned(versioned))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        hash::Hash,
        message::{v0::Message as MessageV0, Message, VersionedMessage},
        transaction::{Transaction, VersionedTransaction},
    };
    #[allow(deprecated)]
    use solana_sdk::system_instruction;

    #[test]
    fn test_keypair_from_json_file() {
        let keypair = Keypair::new();
        let json = serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap();
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), json).unwrap();

        let signer = KeypairSigner::from_file(file.path().to_str().unwrap(), true).unwrap();
        assert_eq!(signer.pubkey(), keypair.pubkey());
        assert!(signer.supports_versioned());
    }

    #[test]
    fn test_keypair_from_base58_file() {
        let keypair = Keypair::new();
        let encoded = bs58::encode(keypair.to_bytes()).into_string();
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), encoded).unwrap();

        let signer = KeypairSigner::from_file(file.path().to_str().unwrap(), true).unwrap();
        assert_eq!(signer.pubkey(), keypair.pubkey());
    }

    #[test]
    fn test_all_zero_key_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), [0u8; 64]).unwrap();

        let result = KeypairSigner::from_file(file.path().to_str().unwrap(), true);
        assert!(matches!(result, Err(PipelineError::Signing(_))));
    }

    #[test]
    fn test_wrong_length_json_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "[1, 2, 3]").unwrap();

        let result = KeypairSigner::from_file(file.path().to_str().unwrap(), true);
        assert!(matches!(result, Err(PipelineError::Signing(_))));
    }

    #[tokio::test]
    async fn test_sign_legacy() {
        let payer = Keypair::new();
        let recipient = Pubkey::new_unique();
        let instruction = system_instruction::transfer(&payer.pubkey(), &recipient, 1000);
        let message =
            Message::new_with_blockhash(&[instruction], Some(&payer.pubkey()), &Hash::new_unique());
        let tx = Transaction::new_unsigned(message);

        let signer = KeypairSigner::from_keypair(payer, true);
        let signed = signer.sign(DecodedTransaction::Legacy(tx)).await.unwrap();
        match signed {
            DecodedTransaction::Legacy(tx) => {
                assert_ne!(tx.signatures[0], Signature::default());
                assert!(tx.verify().is_ok());
            }
            _ => panic!("format changed during signing"),
        }
    }

    #[tokio::test]
    async fn test_sign_versioned() {
        let payer = Keypair::new();
        let recipient = Pubkey::new_unique();
        let instruction = system_instruction::transfer(&payer.pubkey(), &recipient, 1000);
        let message =
            MessageV0::try_compile(&payer.pubkey(), &[instruction], &[], Hash::new_unique())
                .unwrap();
        let tx = VersionedTransaction {
            signatures: vec![],
            message: VersionedMessage::V0(message),
        };

        let signer = KeypairSigner::from_keypair(payer, true);
        let signed = signer.sign(DecodedTransaction::Versioned(tx)).await.unwrap();
        match signed {
            DecodedTransaction::Versioned(tx) => {
                assert_eq!(tx.signatures.len(), 1);
                assert_ne!(tx.signatures[0], Signature::default());
            }
            _ => panic!("format changed during signing"),
        }
    }

    #[tokio::test]
    async fn test_versioned_refused_without_support() {
        let payer = Keypair::new();
        let recipient = Pubkey::new_unique();
        let instruction = system_instruction::transfer(&payer.pubkey(), &recipient, 1000);
        let message =
            MessageV0::try_compile(&payer.pubkey(), &[instruction], &[], Hash::new_unique())
                .unwrap();
        let tx = VersionedTransaction {
            signatures: vec![],
            message: VersionedMessage::V0(message),
        };

        let signer = KeypairSigner::from_keypair(payer, false);
        let result = signer.sign(DecodedTransaction::Versioned(tx)).await;
        assert!(matches!(result, Err(PipelineError::WalletIncompatible(_))));
    }
}

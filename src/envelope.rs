//! Backend create-transaction envelope
//!
//! Every trade call site (buy, add-liquidity, create-pool) receives the
//! same JSON envelope from the backend: `{ code, msg, data: { txHash } }`
//! where `txHash` is the unsigned transaction, usually base64. Different
//! backend serialization paths have historically produced the field under
//! different names (`txHash`/`tx_hash`, nested or top-level) and in
//! different byte representations, so both the field lookup and the blob
//! coercion are tolerant.

use base64::Engine;
use serde::Deserialize;

use crate::errors::PipelineError;

/// Envelope codes the backend uses for success.
const SUCCESS_CODES: [i64; 2] = [0, 10000];

/// Response envelope for all create-transaction endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct TxEnvelope {
    #[serde(default)]
    pub code: i64,
    #[serde(default, alias = "message")]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<EnvelopeData>,
    // Some endpoints put the blob at the top level.
    #[serde(default, rename = "txHash", alias = "tx_hash")]
    pub top_level_tx: Option<TxBlob>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvelopeData {
    #[serde(default, rename = "txHash", alias = "tx_hash")]
    pub tx_hash: Option<TxBlob>,
}

/// The transaction blob in any of the representations backend
/// serialization paths produce.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TxBlob {
    /// `{"type": "Buffer", "data": [..]}` node-style object.
    NodeBuffer {
        #[serde(rename = "type")]
        kind: String,
        data: Vec<u8>,
    },
    /// Base64 string, the common case.
    Base64(String),
    /// Plain JSON byte array.
    Bytes(Vec<u8>),
    /// Length-indexed object map: `{"0": 1, "1": 2, ..., "length": n}`.
    Indexed(serde_json::Map<String, serde_json::Value>),
}

impl TxBlob {
    /// Coerce to raw transaction bytes regardless of representation.
    pub fn into_bytes(self) -> Result<Vec<u8>, PipelineError> {
        match self {
            TxBlob::Base64(text) => base64::engine::general_purpose::STANDARD
                .decode(text.trim())
                .map_err(|e| PipelineError::Decode {
                    versioned: format!("base64 decode failed: {e}"),
                    legacy: format!("base64 decode failed: {e}"),
                }),
            TxBlob::Bytes(bytes) => Ok(bytes),
            TxBlob::NodeBuffer { kind, data } => {
                if kind != "Buffer" {
                    return Err(PipelineError::Internal(format!(
                        "unrecognized blob object type {kind:?}"
                    )));
                }
                Ok(data)
            }
            TxBlob::Indexed(map) => indexed_object_bytes(&map),
        }
    }
}

fn indexed_object_bytes(
    map: &serde_json::Map<String, serde_json::Value>,
) -> Result<Vec<u8>, PipelineError> {
    let length = map
        .get("length")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| PipelineError::Internal("indexed blob object has no length".to_string()))?;

    let mut bytes = Vec::with_capacity(length as usize);
    for i in 0..length {
        let byte = map
            .get(&i.to_string())
            .and_then(|v| v.as_u64())
            .filter(|&v| v <= u8::MAX as u64)
            .ok_or_else(|| {
                PipelineError::Internal(format!("indexed blob object missing byte {i}"))
            })?;
        bytes.push(byte as u8);
    }
    Ok(bytes)
}

impl TxEnvelope {
    /// Parse an envelope from raw JSON text.
    pub fn from_json(text: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(text)
            .map_err(|e| PipelineError::Backend { code: -1, message: format!("malformed envelope: {e}") })
    }

    /// Validate the envelope code and extract the raw transaction bytes.
    ///
    /// Non-success codes short-circuit before any decoding begins. Code
    /// 515 is the backend's service-side build failure; its message keeps
    /// the balance/approval hint the UI shows for it.
    pub fn transaction_bytes(&self) -> Result<Vec<u8>, PipelineError> {
        if !SUCCESS_CODES.contains(&self.code) {
            let detail = self.msg.clone().unwrap_or_else(|| "unknown error".to_string());
            let message = if self.code == 515 {
                format!("{detail} (check that the wallet holds enough tokens and has approved the trade)")
            } else {
                detail
            };
            return Err(PipelineError::Backend { code: self.code, message });
        }

        let blob = self
            .data
            .as_ref()
            .and_then(|d| d.tx_hash.clone())
            .or_else(|| self.top_level_tx.clone())
            .ok_or_else(|| PipelineError::Backend {
                code: self.code,
                message: "no transaction data received from server".to_string(),
            })?;

        blob.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_envelope() {
        let env = TxEnvelope::from_json(r#"{"code": 0, "data": {"txHash": "AQID"}}"#).unwrap();
        assert_eq!(env.transaction_bytes().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_snake_case_alias_and_code_10000() {
        let env =
            TxEnvelope::from_json(r#"{"code": 10000, "data": {"tx_hash": "AQID"}}"#).unwrap();
        assert_eq!(env.transaction_bytes().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_top_level_blob() {
        let env = TxEnvelope::from_json(r#"{"code": 0, "txHash": "AQID"}"#).unwrap();
        assert_eq!(env.transaction_bytes().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_byte_array_blob() {
        let env =
            TxEnvelope::from_json(r#"{"code": 0, "data": {"txHash": [1, 2, 3]}}"#).unwrap();
        assert_eq!(env.transaction_bytes().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_node_buffer_blob() {
        let env = TxEnvelope::from_json(
            r#"{"code": 0, "data": {"txHash": {"type": "Buffer", "data": [4, 5]}}}"#,
        )
        .unwrap();
        assert_eq!(env.transaction_bytes().unwrap(), vec![4, 5]);
    }

    #[test]
    fn test_indexed_object_blob() {
        let env = TxEnvelope::from_json(
            r#"{"code": 0, "data": {"txHash": {"0": 7, "1": 8, "2": 9, "length": 3}}}"#,
        )
        .unwrap();
        assert_eq!(env.transaction_bytes().unwrap(), vec![7, 8, 9]);
    }

    #[test]
    fn test_error_code_short_circuits() {
        let env =
            TxEnvelope::from_json(r#"{"code": 500, "msg": "boom", "data": {"txHash": "AQID"}}"#)
                .unwrap();
        match env.transaction_bytes() {
            Err(PipelineError::Backend { code, message }) => {
                assert_eq!(code, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[test]
    fn test_code_515_keeps_hint() {
        let env = TxEnvelope::from_json(r#"{"code": 515, "msg": "build failed"}"#).unwrap();
        match env.transaction_bytes() {
            Err(PipelineError::Backend { code, message }) => {
                assert_eq!(code, 515);
                assert!(message.contains("approved"));
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_blob() {
        let env = TxEnvelope::from_json(r#"{"code": 0, "data": {}}"#).unwrap();
        match env.transaction_bytes() {
            Err(PipelineError::Backend { message, .. }) => {
                assert!(message.contains("no transaction data"));
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_base64() {
        let env = TxEnvelope::from_json(r#"{"code": 0, "data": {"txHash": "!!!"}}"#).unwrap();
        assert!(matches!(
            env.transaction_bytes(),
            Err(PipelineError::Decode { .. })
        ));
    }
}

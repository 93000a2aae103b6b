//! HTTP client for the backend trade endpoints
//!
//! Thin wrapper over the three endpoints that hand back an unsigned
//! transaction envelope: market order creation, liquidity addition, and
//! pool creation. The pipeline only consumes the envelope; everything
//! else about the backend API is out of scope here.

use serde::Serialize;
use std::time::Duration;

use crate::envelope::TxEnvelope;
use crate::errors::PipelineError;

/// Solana chain id used by the backend.
pub const SOLANA_CHAIN_ID: u64 = 100_000;

/// Swap direction for market orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapSide {
    Buy,
    Sell,
}

impl SwapSide {
    fn as_code(self) -> u8 {
        match self {
            SwapSide::Buy => 1,
            SwapSide::Sell => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketOrderRequest {
    pub chain_id: u64,
    pub token_ca: String,
    pub swap_type: u8,
    pub amount_in: String,
    pub user_wallet_address: String,
}

impl MarketOrderRequest {
    pub fn new(token_ca: String, side: SwapSide, amount_in: String, wallet: String) -> Self {
        Self {
            chain_id: SOLANA_CHAIN_ID,
            token_ca,
            swap_type: side.as_code(),
            amount_in,
            user_wallet_address: wallet,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AddLiquidityRequest {
    pub chain_id: u64,
    pub pool_id: String,
    pub tick_lower: i64,
    pub tick_upper: i64,
    pub base_token: u8,
    pub base_amount: String,
    pub other_amount_max: String,
    pub user_wallet_address: String,
    pub token_a_address: String,
    pub token_b_address: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePoolRequest {
    pub chain_id: u64,
    pub token_mint_0: String,
    pub token_mint_1: String,
    pub initial_price: String,
    pub fee_tier: u32,
    pub open_time: u64,
    pub user_wallet_address: String,
}

/// Backend API client.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Network(format!("http client init failed: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub async fn create_market_order(
        &self,
        request: &MarketOrderRequest,
    ) -> Result<TxEnvelope, PipelineError> {
        self.post("/v1/trade/create_market_order", request).await
    }

    pub async fn add_liquidity(
        &self,
        request: &AddLiquidityRequest,
    ) -> Result<TxEnvelope, PipelineError> {
        self.post("/trade/add_liquidity_v1", request).await
    }

    pub async fn create_pool(
        &self,
        request: &CreatePoolRequest,
    ) -> Result<TxEnvelope, PipelineError> {
        self.post("/trade/create_pool", request).await
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<TxEnvelope, PipelineError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Requesting transaction from backend");

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| PipelineError::Network(format!("backend request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PipelineError::Network(format!("backend response read failed: {e}")))?;

        if !status.is_success() {
            // The backend still ships an envelope body on HTTP errors when
            // it can; prefer its code/message over the bare status.
            if let Ok(envelope) = TxEnvelope::from_json(&text) {
                if let Some(msg) = &envelope.msg {
                    return Err(PipelineError::Backend {
                        code: envelope.code,
                        message: msg.clone(),
                    });
                }
            }
            return Err(PipelineError::Backend {
                code: status.as_u16() as i64,
                message: format!("HTTP {status}"),
            });
        }

        TxEnvelope::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_market_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/trade/create_market_order")
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_body(r#"{"code": 0, "data": {"txHash": "AQID"}}"#)
            .create_async()
            .await;

        let client = BackendClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let request = MarketOrderRequest::new(
            "TokenMint111".to_string(),
            SwapSide::Buy,
            "0.01".to_string(),
            "Wallet111".to_string(),
        );
        let envelope = client.create_market_order(&request).await.unwrap();
        assert_eq!(envelope.transaction_bytes().unwrap(), vec![1, 2, 3]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_prefers_envelope_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/trade/create_pool")
            .with_status(500)
            .with_body(r#"{"code": 515, "msg": "pool build failed"}"#)
            .create_async()
            .await;

        let client = BackendClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let request = CreatePoolRequest {
            chain_id: SOLANA_CHAIN_ID,
            token_mint_0: "MintA".to_string(),
            token_mint_1: "MintB".to_string(),
            initial_price: "1.0".to_string(),
            fee_tier: 500,
            open_time: 0,
            user_wallet_address: "Wallet111".to_string(),
        };
        match client.create_pool(&request).await {
            Err(PipelineError::Backend { code, message }) => {
                assert_eq!(code, 515);
                assert_eq!(message, "pool build failed");
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[test]
    fn test_swap_side_codes() {
        assert_eq!(SwapSide::Buy.as_code(), 1);
        assert_eq!(SwapSide::Sell.as_code(), 2);
    }
}

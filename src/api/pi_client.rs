// src/api/pi_client.rs
//
// Minimal client for the Pi platform API (https://api.minepi.com/v2).
// Server-side authentication: `Authorization: Key <api key>`. The ledger
// lookup hits Horizon via the URL the platform hands back on the payment.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::payment_flow::{
    approval_outcome, completion_outcome, ApprovalOutcome, CompletionOutcome, PaymentGateway,
};

pub const PI_API_BASE: &str = "https://api.minepi.com/v2";

#[derive(Debug, Error)]
pub enum PiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("pi api error status={status} body={body}")]
    Api { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl PiError {
    /// Platform status to forward to the caller, if the platform answered.
    pub fn platform_status(&self) -> Option<u16> {
        match self {
            PiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Payment DTO as returned by the platform on approve/complete/lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentDto {
    pub identifier: String,
    #[serde(default)]
    pub user_uid: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// The slice of a Horizon transaction record recovery cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerRecord {
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

impl LedgerRecord {
    /// Horizon reports the transaction hash as `hash` or `id`.
    pub fn tx_hash(&self) -> Option<&str> {
        self.hash.as_deref().or(self.id.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PiUser {
    pub uid: String,
    pub username: String,
}

#[derive(Clone)]
pub struct PiClient {
    http: reqwest::Client,
    api_key: String,
    base: String,
}

impl PiClient {
    pub fn new(http: reqwest::Client, api_key: String, base: String) -> Self {
        PiClient {
            http,
            api_key,
            base,
        }
    }

    /// Resolve a user's Pi access token to their identity (`GET /me`).
    pub async fn me(&self, access_token: &str) -> Result<PiUser, PiError> {
        let resp = self
            .http
            .get(format!("{}/me", self.base))
            .header("Authorization", format!("Bearer {access_token}"))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(PiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| PiError::InvalidResponse(format!("{e}; body={body}")))
    }

    async fn post_payment_op(
        &self,
        payment_id: &str,
        op: &str,
        body: Option<serde_json::Value>,
    ) -> Result<(u16, String), PiError> {
        let mut req = self
            .http
            .post(format!("{}/payments/{payment_id}/{op}", self.base))
            .header("Authorization", format!("Key {}", self.api_key))
            .header("Content-Type", "application/json");
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok((status, body))
    }
}

#[async_trait]
impl PaymentGateway for PiClient {
    async fn approve(&self, payment_id: &str) -> Result<ApprovalOutcome, PiError> {
        let (status, body) = self.post_payment_op(payment_id, "approve", None).await?;
        approval_outcome(status, &body)
    }

    async fn complete(&self, payment_id: &str, txid: &str) -> Result<CompletionOutcome, PiError> {
        let (status, body) = self
            .post_payment_op(payment_id, "complete", Some(serde_json::json!({ "txid": txid })))
            .await?;
        completion_outcome(status, &body)
    }

    async fn payment(&self, payment_id: &str) -> Result<PaymentDto, PiError> {
        let resp = self
            .http
            .get(format!("{}/payments/{payment_id}", self.base))
            .header("Authorization", format!("Key {}", self.api_key))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(PiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| PiError::InvalidResponse(format!("{e}; body={body}")))
    }

    async fn ledger_record(&self, url: &str) -> Result<LedgerRecord, PiError> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(PiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| PiError::InvalidResponse(format!("{e}; body={body}")))
    }
}

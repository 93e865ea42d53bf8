// src/payment_flow.rs
//
// Payment lifecycle: an explicit state machine over the platform's two-phase
// approve/complete protocol, plus the settlement path that flips the ledger's
// credited flag and grants the entitlement in one transaction.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::api::pi_client::{LedgerRecord, PaymentDto, PiError};
use crate::billing;
use crate::db;
use crate::models::Purchase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentState {
    Initiated,
    AwaitingApproval,
    Approved,
    AwaitingCompletion,
    Completed,
    Cancelled,
    Failed,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Initiated => "initiated",
            PaymentState::AwaitingApproval => "awaiting_approval",
            PaymentState::Approved => "approved",
            PaymentState::AwaitingCompletion => "awaiting_completion",
            PaymentState::Completed => "completed",
            PaymentState::Cancelled => "cancelled",
            PaymentState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initiated" => Some(PaymentState::Initiated),
            "awaiting_approval" => Some(PaymentState::AwaitingApproval),
            "approved" => Some(PaymentState::Approved),
            "awaiting_completion" => Some(PaymentState::AwaitingCompletion),
            "completed" => Some(PaymentState::Completed),
            "cancelled" => Some(PaymentState::Cancelled),
            "failed" => Some(PaymentState::Failed),
            _ => None,
        }
    }

    /// Approval is strictly ordered before completion; Completed and Cancelled
    /// are terminal. Same-state transitions are legal so retries are no-ops.
    pub fn can_transition(self, next: PaymentState) -> bool {
        use PaymentState::*;
        if self == next {
            return true;
        }
        match self {
            Initiated => matches!(next, AwaitingApproval | Approved | Cancelled | Failed),
            AwaitingApproval => matches!(next, Approved | Cancelled | Failed),
            Approved => matches!(next, AwaitingCompletion | Completed | Cancelled | Failed),
            AwaitingCompletion => matches!(next, Completed | Cancelled | Failed),
            Completed => false,
            Cancelled => false,
            // A failed approval may be retried by the client.
            Failed => matches!(next, AwaitingApproval | Approved),
        }
    }
}

/// The platform reports retried approvals/completions as errors with a known
/// body; those must read as success, not failure. Substring matching is what
/// the platform gives us; keep it fenced in these two predicates.
pub fn is_already_approved(body: &str) -> bool {
    body.contains("already_approved")
}

pub fn is_already_completed(body: &str) -> bool {
    body.contains("already_completed")
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApprovalOutcome {
    Approved(serde_json::Value),
    AlreadyApproved,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    Completed(serde_json::Value),
    AlreadyCompleted,
}

pub fn approval_outcome(status: u16, body: &str) -> Result<ApprovalOutcome, PiError> {
    if (200..300).contains(&status) {
        return serde_json::from_str(body)
            .map(ApprovalOutcome::Approved)
            .map_err(|e| PiError::InvalidResponse(format!("{e}; body={body}")));
    }
    if is_already_approved(body) {
        return Ok(ApprovalOutcome::AlreadyApproved);
    }
    Err(PiError::Api {
        status,
        body: body.to_string(),
    })
}

pub fn completion_outcome(status: u16, body: &str) -> Result<CompletionOutcome, PiError> {
    if (200..300).contains(&status) {
        return serde_json::from_str(body)
            .map(CompletionOutcome::Completed)
            .map_err(|e| PiError::InvalidResponse(format!("{e}; body={body}")));
    }
    if is_already_completed(body) {
        return Ok(CompletionOutcome::AlreadyCompleted);
    }
    Err(PiError::Api {
        status,
        body: body.to_string(),
    })
}

/// Seam to the external payment platform, mockable in tests.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn approve(&self, payment_id: &str) -> Result<ApprovalOutcome, PiError>;
    async fn complete(&self, payment_id: &str, txid: &str) -> Result<CompletionOutcome, PiError>;
    async fn payment(&self, payment_id: &str) -> Result<PaymentDto, PiError>;
    async fn ledger_record(&self, url: &str) -> Result<LedgerRecord, PiError>;
}

/// Incomplete-payment recovery must never settle a payment whose on-chain
/// memo does not name it.
pub fn memo_matches(record: &LedgerRecord, payment_id: &str) -> bool {
    record.memo.as_deref() == Some(payment_id)
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Platform(#[from] PiError),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

#[derive(Debug)]
pub struct Settlement {
    pub already_completed: bool,
    /// True only when this call flipped the credited flag and granted the
    /// entitlement; replays and metadata-less payments leave it false.
    pub credited: bool,
    pub platform_payload: Option<serde_json::Value>,
}

/// Record a successful approval in the ledger. The platform's approval payload
/// carries the payment DTO (buyer uid, amount, memo, purchase metadata); on
/// the already-approved retry path only the id is known.
pub async fn record_approval(
    pool: &PgPool,
    payment_id: &str,
    outcome: &ApprovalOutcome,
) -> Result<(), sqlx::Error> {
    match outcome {
        ApprovalOutcome::Approved(payload) => {
            match serde_json::from_value::<PaymentDto>(payload.clone()) {
                Ok(dto) => db::upsert_payment_details(pool, &dto, PaymentState::Approved).await,
                Err(e) => {
                    log::warn!("approve payload for {payment_id} not a payment DTO: {e}");
                    db::ensure_payment(pool, payment_id, PaymentState::Approved).await
                }
            }
        }
        ApprovalOutcome::AlreadyApproved => {
            db::ensure_payment(pool, payment_id, PaymentState::Approved).await
        }
    }
}

/// Drive a payment to settled: confirm completion with the platform, then in
/// one transaction mark the ledger row completed and — at most once per
/// payment — grant the purchased entitlement. Platform failure propagates
/// before any state is touched, so a failed completion never credits.
pub async fn settle<G: PaymentGateway + ?Sized>(
    pool: &PgPool,
    gateway: &G,
    payment_id: &str,
    txid: &str,
) -> Result<Settlement, FlowError> {
    let outcome = gateway.complete(payment_id, txid).await?;
    let (already_completed, platform_payload) = match outcome {
        CompletionOutcome::Completed(v) => (false, Some(v)),
        CompletionOutcome::AlreadyCompleted => (true, None),
    };

    // The ledger row may be missing its DTO (approval raced, or recovery of a
    // payment this instance never saw). Backfill from the platform.
    let mut record = db::get_payment(pool, payment_id).await?;
    let needs_details = record
        .as_ref()
        .map(|r| r.metadata.is_none() || r.user_uid.is_none())
        .unwrap_or(true);
    if needs_details {
        match gateway.payment(payment_id).await {
            Ok(dto) => {
                db::upsert_payment_details(pool, &dto, PaymentState::Completed).await?;
                record = db::get_payment(pool, payment_id).await?;
            }
            Err(e) => log::warn!("pi payment lookup failed for {payment_id}: {e}"),
        }
    }

    let mut tx = pool.begin().await?;
    db::mark_payment_completed(&mut tx, payment_id, txid).await?;

    let purchase = record.as_ref().and_then(|r| {
        let uid = r.user_uid.clone()?;
        let purchase = Purchase::from_metadata(r.metadata.as_ref()?)?;
        Some((uid, purchase))
    });

    let mut credited = false;
    match purchase {
        Some((uid, purchase)) => {
            // Guarded flip: the UPDATE matches only while credited is false,
            // so a replayed completion grants nothing.
            if db::try_mark_credited(&mut tx, payment_id).await? {
                billing::apply_purchase(&mut tx, &uid, &purchase).await?;
                credited = true;
            }
        }
        None => {
            log::warn!("payment {payment_id} completed without usable purchase metadata, nothing credited");
        }
    }
    tx.commit().await?;

    Ok(Settlement {
        already_completed,
        credited,
        platform_payload,
    })
}

// src/api/payments.rs
//
// The server half of the Pi payment handshake: approve, complete, and
// incomplete-payment recovery. These are called from the client's SDK
// callbacks and must stay safe under retries and replays.

use actix_web::http::StatusCode;
use actix_web::{post, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::api::pi_client::{PiClient, PiError};
use crate::payment_flow::{self, ApprovalOutcome, FlowError, PaymentGateway, PaymentState};
use crate::{db, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApproveRequest {
    #[serde(rename = "paymentId")]
    pub payment_id: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CompleteRequest {
    #[serde(rename = "paymentId")]
    pub payment_id: String,
    pub txid: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IncompleteRequest {
    pub payment: IncompletePayment,
}

/// Opaque payment object the client SDK hands back for a payment that never
/// reached completion.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IncompletePayment {
    pub identifier: String,
    #[serde(default)]
    pub transaction: Option<IncompleteTransaction>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct IncompleteTransaction {
    #[serde(default)]
    pub txid: Option<String>,
    /// URL of the transaction's public ledger record.
    #[serde(default, rename = "_link")]
    pub link: Option<String>,
}

fn gateway(state: &AppState) -> PiClient {
    PiClient::new(
        state.http.clone(),
        state.pi_api_key.clone(),
        state.pi_api_base.clone(),
    )
}

fn missing_key(state: &AppState) -> Option<HttpResponse> {
    if state.pi_api_key.trim().is_empty() {
        log::error!("PI_API_KEY is not configured");
        return Some(HttpResponse::InternalServerError().json(json!({
            "error": "server configuration incomplete (API key)"
        })));
    }
    None
}

fn platform_error_response(e: &PiError) -> HttpResponse {
    match (e.platform_status(), e) {
        (Some(status), PiError::Api { body, .. }) => {
            let code = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            HttpResponse::build(code).json(json!({ "error": body }))
        }
        _ => HttpResponse::InternalServerError().json(json!({ "error": e.to_string() })),
    }
}

#[utoipa::path(
    post,
    path = "/api/pi/approve",
    tag = "payments",
    request_body = ApproveRequest,
    responses(
        (status = 200, description = "Approved (or already approved)"),
        (status = 500, description = "Server misconfiguration")
    )
)]
#[post("/api/pi/approve")]
pub async fn approve(
    state: web::Data<AppState>,
    payload: web::Json<ApproveRequest>,
) -> HttpResponse {
    if let Some(resp) = missing_key(&state) {
        return resp;
    }
    let payment_id = payload.payment_id.clone();
    log::info!("approving payment {payment_id}");

    match gateway(&state).approve(&payment_id).await {
        Ok(outcome) => {
            if let Err(e) = payment_flow::record_approval(&state.pool, &payment_id, &outcome).await
            {
                // The platform has approved; losing the ledger write must not
                // fail the handshake. Completion backfills the row.
                log::error!("ledger write failed for {payment_id}: {e}");
            }
            match outcome {
                ApprovalOutcome::Approved(data) => HttpResponse::Ok().json(data),
                ApprovalOutcome::AlreadyApproved => {
                    log::info!("payment {payment_id} was already approved");
                    HttpResponse::Ok().json(json!({ "success": true }))
                }
            }
        }
        Err(e) => {
            log::error!("approve failed for {payment_id}: {e}");
            let _ = db::ensure_payment(&state.pool, &payment_id, PaymentState::Failed).await;
            platform_error_response(&e)
        }
    }
}

async fn settle_and_respond(
    state: &AppState,
    payment_id: &str,
    txid: &str,
    recovered: bool,
) -> HttpResponse {
    match payment_flow::settle(&state.pool, &gateway(state), payment_id, txid).await {
        Ok(settlement) => {
            log::info!(
                "payment {payment_id} settled (already_completed={}, credited={})",
                settlement.already_completed,
                settlement.credited
            );
            if settlement.already_completed {
                return HttpResponse::Ok()
                    .json(json!({ "success": true, "message": "Already completed" }));
            }
            let data = settlement.platform_payload.unwrap_or_else(|| json!({}));
            if recovered {
                HttpResponse::Ok()
                    .json(json!({ "message": "Payment completed and recovered", "data": data }))
            } else {
                HttpResponse::Ok().json(data)
            }
        }
        Err(FlowError::Platform(e)) => {
            log::error!("complete failed for {payment_id}: {e}");
            platform_error_response(&e)
        }
        Err(FlowError::Db(e)) => {
            log::error!("settlement db error for {payment_id}: {e}");
            HttpResponse::InternalServerError().json(json!({ "error": "internal error settling payment" }))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/pi/complete",
    tag = "payments",
    request_body = CompleteRequest,
    responses(
        (status = 200, description = "Completed (or already completed); entitlement credited at most once"),
        (status = 500, description = "Server misconfiguration")
    )
)]
#[post("/api/pi/complete")]
pub async fn complete(
    state: web::Data<AppState>,
    payload: web::Json<CompleteRequest>,
) -> HttpResponse {
    if let Some(resp) = missing_key(&state) {
        return resp;
    }
    log::info!("completing payment {} txid {}", payload.payment_id, payload.txid);
    settle_and_respond(&state, &payload.payment_id, &payload.txid, false).await
}

#[utoipa::path(
    post,
    path = "/api/pi/incomplete",
    tag = "payments",
    request_body = IncompleteRequest,
    responses(
        (status = 200, description = "Recovered, or left incomplete with a reason"),
        (status = 400, description = "Ledger memo mismatch or invalid payment data")
    )
)]
#[post("/api/pi/incomplete")]
pub async fn incomplete(
    state: web::Data<AppState>,
    payload: web::Json<IncompleteRequest>,
) -> HttpResponse {
    if let Some(resp) = missing_key(&state) {
        return resp;
    }

    let payment = &payload.payment;
    if payment.identifier.trim().is_empty() {
        return HttpResponse::BadRequest().json(json!({ "error": "invalid payment data" }));
    }
    let payment_id = payment.identifier.clone();
    log::info!("recovering incomplete payment {payment_id}");

    let txid = payment.transaction.as_ref().and_then(|t| t.txid.clone());
    let link = payment.transaction.as_ref().and_then(|t| t.link.clone());

    if let Some(txid) = txid {
        return settle_and_respond(&state, &payment_id, &txid, true).await;
    }

    if let Some(link) = link {
        match gateway(&state).ledger_record(&link).await {
            Ok(record) => {
                // A ledger record settles a payment only when its memo names
                // that payment; anything else stays incomplete.
                if !payment_flow::memo_matches(&record, &payment_id) {
                    log::error!(
                        "ledger memo mismatch for {payment_id}: got {:?}",
                        record.memo
                    );
                    return HttpResponse::BadRequest()
                        .json(json!({ "message": "Payment ID mismatch on blockchain" }));
                }
                if let Some(txid) = record.tx_hash() {
                    log::info!("ledger record verified for {payment_id}, derived txid {txid}");
                    let txid = txid.to_string();
                    return settle_and_respond(&state, &payment_id, &txid, true).await;
                }
            }
            Err(e) => log::error!("ledger lookup failed for {payment_id}: {e}"),
        }
    }

    log::info!("incomplete payment {payment_id} left unresolved (no valid txid)");
    HttpResponse::Ok().json(json!({ "message": "Incomplete payment ignored (no valid txid)" }))
}

// src/api/wallet.rs

use actix_web::{get, post, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::billing::{self, SpendError};
use crate::catalog::{EARLY_ACCESS_PASSES, INK_PACKS};
use crate::{db, AppState};

#[utoipa::path(
    get,
    path = "/api/wallet",
    tag = "wallet",
    responses(
        (status = 200, description = "Balance, wallet address and subscription"),
        (status = 404, description = "Unknown user")
    )
)]
#[get("/wallet")]
pub async fn get_wallet(state: web::Data<AppState>, uid: web::ReqData<String>) -> impl Responder {
    match db::get_profile(&state.pool, &uid).await {
        Ok(Some(profile)) => HttpResponse::Ok().json(json!({
            "uid": profile.pi_uid,
            "username": profile.username,
            "inks": profile.inks,
            "walletAddress": profile.wallet_address,
            "subscription": profile.subscription,
        })),
        Ok(None) => HttpResponse::NotFound().json(json!({ "error": "unknown user" })),
        Err(e) => {
            log::error!("wallet fetch error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Fixed purchase catalog; Pi costs are derived client-side from `/api/price`.
#[utoipa::path(
    get,
    path = "/api/wallet/catalog",
    tag = "wallet",
    responses((status = 200, description = "Ink packs and Early Access passes"))
)]
#[get("/wallet/catalog")]
pub async fn get_catalog() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "packs": INK_PACKS,
        "passes": EARLY_ACCESS_PASSES,
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SpendRequest {
    pub amount: i32,
    /// What the Inks are being spent on, e.g. a chapter unlock.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Deduct Inks from the balance. Refused outright when the balance does not
/// cover the amount — the client sends the user to the top-up flow on 402.
#[utoipa::path(
    post,
    path = "/api/wallet/spend",
    tag = "wallet",
    request_body = SpendRequest,
    responses(
        (status = 200, description = "New balance"),
        (status = 400, description = "Non-positive amount"),
        (status = 402, description = "Balance does not cover the amount")
    )
)]
#[post("/wallet/spend")]
pub async fn spend(
    state: web::Data<AppState>,
    uid: web::ReqData<String>,
    payload: web::Json<SpendRequest>,
) -> impl Responder {
    if payload.amount <= 0 {
        return HttpResponse::BadRequest().json(json!({ "error": "amount must be positive" }));
    }

    match billing::spend_inks(&state.pool, &uid, payload.amount).await {
        Ok(balance) => {
            log::info!(
                "{} spent {} inks ({})",
                uid.as_str(),
                payload.amount,
                payload.reason.as_deref().unwrap_or("unspecified")
            );
            HttpResponse::Ok().json(json!({ "inks": balance }))
        }
        Err(SpendError::Insufficient { balance, required }) => {
            HttpResponse::PaymentRequired().json(json!({
                "error": "insufficient_inks",
                "balance": balance,
                "required": required,
            }))
        }
        Err(SpendError::UnknownUser) => {
            HttpResponse::NotFound().json(json!({ "error": "unknown user" }))
        }
        Err(SpendError::Db(e)) => {
            log::error!("spend error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WalletAddressRequest {
    pub address: String,
}

#[utoipa::path(
    post,
    path = "/api/wallet/address",
    tag = "wallet",
    request_body = WalletAddressRequest,
    responses((status = 200, description = "Address stored"))
)]
#[post("/wallet/address")]
pub async fn set_wallet_address(
    state: web::Data<AppState>,
    uid: web::ReqData<String>,
    payload: web::Json<WalletAddressRequest>,
) -> impl Responder {
    match db::update_wallet_address(&state.pool, &uid, &payload.address).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "ok": true })),
        Err(e) => {
            log::error!("wallet address update error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Drops the pass immediately. Purchased time is forfeited; renewals are
/// one-off payments so there is nothing to cancel upstream.
#[utoipa::path(
    post,
    path = "/api/subscriptions/cancel",
    tag = "wallet",
    responses((status = 200, description = "Subscription removed"))
)]
#[post("/subscriptions/cancel")]
pub async fn cancel_subscription(
    state: web::Data<AppState>,
    uid: web::ReqData<String>,
) -> impl Responder {
    match billing::cancel_subscription(&state.pool, &uid).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "ok": true })),
        Err(e) => {
            log::error!("subscription cancel error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

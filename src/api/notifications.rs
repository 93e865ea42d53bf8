// src/api/notifications.rs

use actix_web::{delete, get, post, web, HttpResponse, Responder};
use serde_json::json;

use crate::{db, AppState};

#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "notifications",
    responses((status = 200, description = "Notifications, newest first, capped at 50"))
)]
#[get("/notifications")]
pub async fn list(state: web::Data<AppState>, uid: web::ReqData<String>) -> impl Responder {
    match db::get_notifications(&state.pool, &uid).await {
        Ok(list) => HttpResponse::Ok().json(list),
        Err(e) => {
            log::error!("notifications fetch error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    tag = "notifications",
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Marked read"),
        (status = 404, description = "Unknown notification")
    )
)]
#[post("/notifications/{id}/read")]
pub async fn mark_read(
    state: web::Data<AppState>,
    uid: web::ReqData<String>,
    path: web::Path<String>,
) -> impl Responder {
    let id = path.into_inner();
    match db::mark_notification_read(&state.pool, &uid, &id).await {
        Ok(true) => HttpResponse::Ok().json(json!({ "ok": true })),
        Ok(false) => HttpResponse::NotFound().json(json!({ "error": "unknown notification" })),
        Err(e) => {
            log::error!("notification read error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/api/notifications",
    tag = "notifications",
    responses((status = 200, description = "All notifications removed"))
)]
#[delete("/notifications")]
pub async fn clear(state: web::Data<AppState>, uid: web::ReqData<String>) -> impl Responder {
    match db::clear_notifications(&state.pool, &uid).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "ok": true })),
        Err(e) => {
            log::error!("notifications clear error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

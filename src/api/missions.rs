// src/api/missions.rs
//
// HTTP surface over the mission engine. Handlers load the day's state, apply
// the pure reducer, and persist the result; completion notifications are
// best-effort and never roll back progress.

use actix_web::{get, post, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use utoipa::ToSchema;

use crate::billing;
use crate::missions::engine::{self, ActionPayload, ActionType, DailyMissions, TrackOutcome};
use crate::models::{Notification, NotificationKind};
use crate::{db, AppState};

async fn load_or_generate(pool: &PgPool, uid: &str) -> Result<DailyMissions, sqlx::Error> {
    let today = engine::today_key();

    if let Some(blob) = db::get_mission_blob(pool, uid).await? {
        if let Some(daily) = engine::from_stored(&blob, &today) {
            return Ok(daily);
        }
    }

    // First request of the (UTC) day: roll a fresh set.
    let daily = {
        let mut rng = rand::thread_rng();
        engine::generate_daily(&today, &mut rng)
    };
    save(pool, uid, &daily).await?;
    log::info!("generated daily missions for {uid} ({today})");
    Ok(daily)
}

async fn save(pool: &PgPool, uid: &str, daily: &DailyMissions) -> Result<(), sqlx::Error> {
    let blob = serde_json::to_value(daily).unwrap_or_else(|_| json!(null));
    db::save_mission_blob(pool, uid, &blob).await
}

#[utoipa::path(
    get,
    path = "/api/missions",
    tag = "missions",
    responses((status = 200, description = "Today's 4 missions, generated on first request"))
)]
#[get("/missions")]
pub async fn get_missions(state: web::Data<AppState>, uid: web::ReqData<String>) -> impl Responder {
    match load_or_generate(&state.pool, &uid).await {
        Ok(daily) => HttpResponse::Ok().json(daily),
        Err(e) => {
            log::error!("missions load error: {e}");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TrackRequest {
    #[serde(rename = "actionType")]
    pub action_type: ActionType,
    #[serde(default)]
    pub payload: ActionPayload,
}

#[utoipa::path(
    post,
    path = "/api/missions/track",
    tag = "missions",
    request_body = TrackRequest,
    responses((status = 200, description = "Updated mission set; lists ids completed by this action"))
)]
#[post("/missions/track")]
pub async fn track(
    state: web::Data<AppState>,
    uid: web::ReqData<String>,
    payload: web::Json<TrackRequest>,
) -> impl Responder {
    let mut daily = match load_or_generate(&state.pool, &uid).await {
        Ok(d) => d,
        Err(e) => {
            log::error!("missions load error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let now_ms = chrono::Utc::now().timestamp_millis();
    let outcome = engine::track_action(&mut daily, payload.action_type, &payload.payload, now_ms);

    match outcome {
        TrackOutcome::Debounced => {
            return HttpResponse::Ok().json(json!({ "debounced": true, "missions": daily }));
        }
        TrackOutcome::NoChange => {
            // Still persist: the debounce timestamp moved.
            if let Err(e) = save(&state.pool, &uid, &daily).await {
                log::error!("missions save error: {e}");
            }
            return HttpResponse::Ok().json(json!({ "missions": daily }));
        }
        TrackOutcome::Updated { completed } => {
            if let Err(e) = save(&state.pool, &uid, &daily).await {
                log::error!("missions save error: {e}");
                return HttpResponse::InternalServerError().finish();
            }

            for mission in &completed {
                let notification = Notification::new(
                    NotificationKind::Mission,
                    "Mission complete!",
                    &format!("You completed \"{}\". Go claim your reward!", mission.title),
                )
                .with_icon("🎯")
                .with_link("/wallet#missions");
                if let Err(e) = db::push_notification(&state.pool, &uid, notification).await {
                    log::warn!("mission notification failed for {}: {e}", uid.as_str());
                }
            }

            let completed_ids: Vec<&str> = completed.iter().map(|m| m.id.as_str()).collect();
            HttpResponse::Ok().json(json!({ "missions": daily, "completed": completed_ids }))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/missions/{id}/claim",
    tag = "missions",
    params(("id" = String, Path, description = "Mission id")),
    responses((status = 200, description = "Claim result with reward and new balance"))
)]
#[post("/missions/{id}/claim")]
pub async fn claim(
    state: web::Data<AppState>,
    uid: web::ReqData<String>,
    path: web::Path<String>,
) -> impl Responder {
    let mission_id = path.into_inner();

    let mut daily = match load_or_generate(&state.pool, &uid).await {
        Ok(d) => d,
        Err(e) => {
            log::error!("missions load error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let result = engine::claim(&mut daily, &mission_id);
    if !result.success {
        return HttpResponse::Ok().json(json!({ "success": false, "reward": 0 }));
    }

    // Claim flag first, then the credit; a crash in between costs the reward
    // rather than allowing a double claim.
    if let Err(e) = save(&state.pool, &uid, &daily).await {
        log::error!("missions save error: {e}");
        return HttpResponse::InternalServerError().finish();
    }
    if let Err(e) = billing::credit_inks_pool(&state.pool, &uid, result.reward).await {
        log::error!("claim credit error for {}: {e}", uid.as_str());
        return HttpResponse::InternalServerError().finish();
    }

    let inks = match db::get_profile(&state.pool, &uid).await {
        Ok(Some(p)) => p.inks,
        _ => 0,
    };
    HttpResponse::Ok().json(json!({ "success": true, "reward": result.reward, "inks": inks }))
}

#[utoipa::path(
    post,
    path = "/api/missions/{id}/swap",
    tag = "missions",
    params(("id" = String, Path, description = "Mission id")),
    responses((status = 200, description = "Mission set after the reroll attempt"))
)]
#[post("/missions/{id}/swap")]
pub async fn swap(
    state: web::Data<AppState>,
    uid: web::ReqData<String>,
    path: web::Path<String>,
) -> impl Responder {
    let mission_id = path.into_inner();

    let mut daily = match load_or_generate(&state.pool, &uid).await {
        Ok(d) => d,
        Err(e) => {
            log::error!("missions load error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let swapped = {
        let mut rng = rand::thread_rng();
        engine::replace(&mut daily, &mission_id, &mut rng)
    };

    if !swapped {
        return HttpResponse::Ok().json(json!({ "swapped": false, "missions": daily }));
    }

    if let Err(e) = save(&state.pool, &uid, &daily).await {
        log::error!("missions save error: {e}");
        return HttpResponse::InternalServerError().finish();
    }
    HttpResponse::Ok().json(json!({ "swapped": true, "missions": daily }))
}

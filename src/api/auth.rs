// src/api/auth.rs

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{post, web, Error, HttpMessage, HttpResponse, Responder};
use chrono::{Duration, Utc};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::task::{Context, Poll};
use utoipa::ToSchema;

use crate::api::pi_client::PiClient;
use crate::{db, AppState};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Pi-issued user uid.
    sub: String,
    exp: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PiLoginRequest {
    /// Access token obtained client-side from Pi.authenticate().
    #[serde(rename = "accessToken")]
    pub access_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub uid: String,
    pub username: String,
    pub inks: i32,
}

/// Exchange a Pi access token for a service JWT. The token is verified
/// against the platform (`/me`), never trusted as-is, and the profile row is
/// created on first login.
#[utoipa::path(
    post,
    path = "/auth/pi",
    tag = "auth",
    request_body = PiLoginRequest,
    responses(
        (status = 200, description = "Service JWT issued", body = AuthResponse),
        (status = 401, description = "Pi access token rejected")
    )
)]
#[post("/auth/pi")]
pub async fn pi_login(
    state: web::Data<AppState>,
    payload: web::Json<PiLoginRequest>,
) -> impl Responder {
    let client = PiClient::new(
        state.http.clone(),
        state.pi_api_key.clone(),
        state.pi_api_base.clone(),
    );

    let pi_user = match client.me(&payload.access_token).await {
        Ok(u) => u,
        Err(e) => {
            log::warn!("pi /me verification failed: {e}");
            return HttpResponse::Unauthorized().json(serde_json::json!({
                "error": "invalid Pi access token"
            }));
        }
    };

    let profile = match db::upsert_profile(&state.pool, &pi_user.uid, &pi_user.username).await {
        Ok(p) => p,
        Err(e) => {
            log::error!("profile upsert error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let token = match generate_jwt(&state.jwt_secret, &pi_user.uid) {
        Ok(t) => t,
        Err(e) => {
            log::error!("jwt encode error: {e}");
            return HttpResponse::InternalServerError().finish();
        }
    };

    HttpResponse::Ok().json(AuthResponse {
        token,
        uid: profile.pi_uid,
        username: profile.username,
        inks: profile.inks,
    })
}

fn generate_jwt(secret: &str, uid: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = (Utc::now() + Duration::days(30)).timestamp() as usize;

    let claims = Claims {
        sub: uid.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

/// Middleware that:
/// - takes `Authorization: Bearer <jwt>`
/// - validates the JWT
/// - puts the `String` Pi uid into `req.extensions_mut()`
pub struct JwtMiddleware;

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtMiddlewareInner<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtMiddlewareInner { service }))
    }
}

pub struct JwtMiddlewareInner<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareInner<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let secret = match req.app_data::<web::Data<AppState>>() {
            Some(state) => state.jwt_secret.clone(),
            None => {
                return Box::pin(async move {
                    Err(actix_web::error::ErrorInternalServerError(
                        "app state not configured",
                    ))
                })
            }
        };

        let auth_header = req
            .headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("");

        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            match decode::<Claims>(
                token,
                &DecodingKey::from_secret(secret.as_ref()),
                &Validation::default(),
            ) {
                Ok(token_data) => {
                    req.extensions_mut().insert(token_data.claims.sub);
                    let fut = self.service.call(req);
                    return Box::pin(async move { fut.await });
                }
                Err(_) => {
                    return Box::pin(async move {
                        Err(actix_web::error::ErrorUnauthorized("Invalid token"))
                    })
                }
            }
        }

        Box::pin(async move {
            Err(actix_web::error::ErrorUnauthorized(
                "Missing or invalid Authorization header",
            ))
        })
    }
}

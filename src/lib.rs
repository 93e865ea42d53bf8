pub mod api;
pub mod billing;
pub mod catalog;
pub mod db;
pub mod docs;
pub mod missions;
pub mod models;
pub mod payment_flow;

use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub http: reqwest::Client,
    pub pi_api_key: String,
    pub pi_api_base: String,
    pub jwt_secret: String,
}

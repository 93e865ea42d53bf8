// src/main.rs
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use dotenvy::dotenv;
use sqlx::PgPool;
use std::env;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use inktoons::{api, docs, AppState};

async fn index() -> impl Responder {
    HttpResponse::Ok().body("Service ready!")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Primary key name plus the legacy public-variable name kept for
    // compatibility with older deployments.
    let pi_api_key = env::var("PI_API_KEY")
        .or_else(|_| env::var("NEXT_PUBLIC_PI_API_KEY"))
        .unwrap_or_default()
        .trim()
        .to_string();
    if pi_api_key.is_empty() {
        log::error!("PI_API_KEY not set; payment endpoints will answer 500");
    }

    let pi_api_base = env::var("PI_API_BASE")
        .unwrap_or_else(|_| api::pi_client::PI_API_BASE.to_string());
    let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET required");

    let http = reqwest::Client::new();

    let state = web::Data::new(AppState {
        pool,
        http,
        pi_api_key,
        pi_api_base,
        jwt_secret,
    });

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8065".to_string());
    log::info!("starting inktoons server on {bind_addr}");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/", web::get().to(index))
            .service(
                SwaggerUi::new("/docs/{_:.*}").url("/api-docs/openapi.json", docs::ApiDoc::openapi()),
            )
            // Public: auth exchange, price feed, SDK payment callbacks
            .service(api::auth::pi_login)
            .service(api::price::price)
            .service(api::payments::approve)
            .service(api::payments::complete)
            .service(api::payments::incomplete)
            // Protected
            .service(
                web::scope("/api")
                    .wrap(api::auth::JwtMiddleware)
                    .service(api::wallet::get_wallet)
                    .service(api::wallet::get_catalog)
                    .service(api::wallet::spend)
                    .service(api::wallet::set_wallet_address)
                    .service(api::wallet::cancel_subscription)
                    .service(api::missions::get_missions)
                    .service(api::missions::track)
                    .service(api::missions::claim)
                    .service(api::missions::swap)
                    .service(api::notifications::list)
                    .service(api::notifications::mark_read)
                    .service(api::notifications::clear),
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}

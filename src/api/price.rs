// src/api/price.rs
//
// Pi/USD quote for the wallet: CoinGecko first, CoinPaprika second, each with
// a 3 second budget, then a hardcoded estimate so the purchase UI never hangs
// on a slow upstream.

use actix_web::{get, web, HttpResponse};
use serde::Serialize;
use std::time::Duration;

use crate::AppState;

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(3);
const FALLBACK_PRICE: f64 = 55.00;

const COINGECKO_URL: &str =
    "https://api.coingecko.com/api/v3/simple/price?ids=pi-network-iou&vs_currencies=usd";
const COINPAPRIKA_URL: &str = "https://api.coinpaprika.com/v1/tickers/pi-pi-network";

#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub price: f64,
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<&'static str>,
}

async fn fetch_json(http: &reqwest::Client, url: &str) -> Option<serde_json::Value> {
    let resp = http
        .get(url)
        .timeout(PROVIDER_TIMEOUT)
        .header("User-Agent", "Mozilla/5.0")
        .header("Accept", "application/json")
        .send()
        .await
        .ok()?;
    if !resp.status().is_success() {
        return None;
    }
    resp.json().await.ok()
}

async fn coingecko_price(http: &reqwest::Client) -> Option<f64> {
    let data = fetch_json(http, COINGECKO_URL).await?;
    data.get("pi-network-iou")
        .or_else(|| data.get("pi-network"))
        .and_then(|v| v.get("usd"))
        .and_then(|v| v.as_f64())
}

async fn coinpaprika_price(http: &reqwest::Client) -> Option<f64> {
    let data = fetch_json(http, COINPAPRIKA_URL).await?;
    data.get("quotes")
        .and_then(|v| v.get("USD"))
        .and_then(|v| v.get("price"))
        .and_then(|v| v.as_f64())
}

#[utoipa::path(
    get,
    path = "/api/price",
    tag = "wallet",
    responses((status = 200, description = "Pi/USD quote with its source"))
)]
#[get("/api/price")]
pub async fn price(state: web::Data<AppState>) -> HttpResponse {
    if let Some(price) = coingecko_price(&state.http).await {
        return HttpResponse::Ok().json(PriceResponse {
            price,
            source: "coingecko",
            warning: None,
        });
    }

    if let Some(price) = coinpaprika_price(&state.http).await {
        return HttpResponse::Ok().json(PriceResponse {
            price,
            source: "coinpaprika",
            warning: None,
        });
    }

    log::warn!("both price providers failed, serving fallback estimate");
    HttpResponse::Ok().json(PriceResponse {
        price: FALLBACK_PRICE,
        source: "fallback",
        warning: Some("Could not fetch live price, using estimate"),
    })
}

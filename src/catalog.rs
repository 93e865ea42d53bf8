// src/catalog.rs
//
// Fixed purchase catalog: Ink packs and Early Access passes. Prices are USD
// targets; the Pi cost is derived from the live quote at purchase time.

use crate::models::SubscriptionType;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct InkPack {
    pub id: i32,
    pub label: &'static str,
    pub amount: i32,
    pub bonus: i32,
    pub price_usd: f64,
}

impl InkPack {
    pub fn credits(&self) -> i32 {
        self.amount + self.bonus
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EarlyAccessPass {
    pub id: &'static str,
    pub label: &'static str,
    pub sub_type: SubscriptionType,
    pub price_usd: f64,
}

pub const INK_PACKS: [InkPack; 3] = [
    InkPack {
        id: 1,
        label: "Handful of Ink",
        amount: 50,
        bonus: 0,
        price_usd: 1.00,
    },
    InkPack {
        id: 2,
        label: "Jar of Ink",
        amount: 150,
        bonus: 10,
        price_usd: 3.00,
    },
    InkPack {
        id: 3,
        label: "Barrel of Ink",
        amount: 500,
        bonus: 100,
        price_usd: 10.00,
    },
];

pub const EARLY_ACCESS_PASSES: [EarlyAccessPass; 3] = [
    EarlyAccessPass {
        id: "pass_1m",
        label: "Monthly Pass",
        sub_type: SubscriptionType::OneMonth,
        price_usd: 10.00,
    },
    EarlyAccessPass {
        id: "pass_6m",
        label: "Semi-Annual Pass",
        sub_type: SubscriptionType::SixMonths,
        price_usd: 45.00,
    },
    EarlyAccessPass {
        id: "pass_1y",
        label: "Annual Pass",
        sub_type: SubscriptionType::OneYear,
        price_usd: 80.00,
    },
];

pub fn pack_by_id(id: i32) -> Option<&'static InkPack> {
    INK_PACKS.iter().find(|p| p.id == id)
}

pub fn pass_by_id(id: &str) -> Option<&'static EarlyAccessPass> {
    EARLY_ACCESS_PASSES.iter().find(|p| p.id == id)
}

/// Pi cost for a USD target at the given Pi/USD quote, rounded to 2 decimals.
pub fn pi_cost(usd_target: f64, pi_usd: f64) -> Option<f64> {
    if pi_usd <= 0.0 {
        return None;
    }
    Some((usd_target / pi_usd * 100.0).round() / 100.0)
}

/// Payment memos are capped at 100 characters by the platform; truncate on a
/// char boundary before storing or forwarding.
pub fn truncate_memo(memo: &str) -> String {
    memo.chars().take(100).collect()
}

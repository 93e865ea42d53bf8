// src/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::payment_flow::PaymentState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionType {
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "6m")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
}

impl SubscriptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionType::Week => "7d",
            SubscriptionType::OneMonth => "1m",
            SubscriptionType::SixMonths => "6m",
            SubscriptionType::OneYear => "1y",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "7d" => Some(SubscriptionType::Week),
            "1m" => Some(SubscriptionType::OneMonth),
            "6m" => Some(SubscriptionType::SixMonths),
            "1y" => Some(SubscriptionType::OneYear),
            _ => None,
        }
    }

    /// Entitlement duration. Month-based passes count 30-day months, matching
    /// how expiry was always computed for these products.
    pub fn duration(&self) -> chrono::Duration {
        match self {
            SubscriptionType::Week => chrono::Duration::days(7),
            SubscriptionType::OneMonth => chrono::Duration::days(30),
            SubscriptionType::SixMonths => chrono::Duration::days(180),
            SubscriptionType::OneYear => chrono::Duration::days(360),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Subscription {
    #[serde(rename = "type")]
    pub sub_type: SubscriptionType,
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Profile {
    pub pi_uid: String,
    pub username: String,
    pub wallet_address: Option<String>,
    pub inks: i32,
    pub subscription: Option<Subscription>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Chapter,
    Mission,
    Follow,
    System,
}

/// Per-user notification. The list is append-only apart from the `read` flag
/// and is capped to the 50 most recent entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Epoch milliseconds.
    pub date: i64,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: &str, message: &str) -> Self {
        Notification {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            title: title.to_string(),
            message: message.to_string(),
            date: Utc::now().timestamp_millis(),
            read: false,
            link: None,
            icon: None,
        }
    }

    pub fn with_link(mut self, link: &str) -> Self {
        self.link = Some(link.to_string());
        self
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }
}

/// Row of the durable payment ledger.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub payment_id: String,
    pub user_uid: Option<String>,
    pub amount: Option<String>,
    pub memo: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub txid: Option<String>,
    pub status: PaymentState,
    pub credited: bool,
}

/// What a completed payment entitles the buyer to, resolved from the payment
/// metadata the client attached at purchase time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Purchase {
    InkPack { pack_id: i32 },
    Pass { pass_id: String },
}

impl Purchase {
    /// Metadata carries either `{packId, credits}` or
    /// `{passId, type: "subscription"}`. The claimed `credits` count is
    /// ignored; the server catalog is the authority on what a pack grants.
    pub fn from_metadata(metadata: &serde_json::Value) -> Option<Self> {
        if let Some(pack_id) = metadata.get("packId").and_then(|v| v.as_i64()) {
            return Some(Purchase::InkPack {
                pack_id: pack_id as i32,
            });
        }
        if let Some(pass_id) = metadata.get("passId").and_then(|v| v.as_str()) {
            return Some(Purchase::Pass {
                pass_id: pass_id.to_string(),
            });
        }
        None
    }
}

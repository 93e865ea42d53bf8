// src/billing.rs
//
// Entitlement mutations: the Ink balance and the Early Access subscription.
// Balance deductions are gated by an atomic sufficiency check; purchases are
// applied inside the settlement transaction.

use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use thiserror::Error;

use crate::catalog;
use crate::models::{Purchase, SubscriptionType};

#[derive(Debug, Error)]
pub enum SpendError {
    #[error("insufficient inks: balance {balance}, required {required}")]
    Insufficient { balance: i32, required: i32 },
    #[error("unknown user")]
    UnknownUser,
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

pub async fn credit_inks(
    tx: &mut Transaction<'_, Postgres>,
    pi_uid: &str,
    amount: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO profiles (pi_uid, inks)
           VALUES ($1, 50 + $2)
           ON CONFLICT (pi_uid)
           DO UPDATE SET inks = profiles.inks + $2, updated_at = NOW()"#,
    )
    .bind(pi_uid)
    .bind(amount)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn credit_inks_pool(
    pool: &PgPool,
    pi_uid: &str,
    amount: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE profiles SET inks = profiles.inks + $1, updated_at = NOW() WHERE pi_uid = $2")
        .bind(amount)
        .bind(pi_uid)
        .execute(pool)
        .await?;
    Ok(())
}

/// Deduct `amount` Inks, refusing (balance untouched) when it would go
/// negative. The guard lives in the UPDATE itself, so concurrent spends
/// cannot jointly overdraw. Returns the new balance.
pub async fn spend_inks(pool: &PgPool, pi_uid: &str, amount: i32) -> Result<i32, SpendError> {
    let row = sqlx::query(
        r#"UPDATE profiles SET inks = inks - $1, updated_at = NOW()
           WHERE pi_uid = $2 AND inks >= $1
           RETURNING inks"#,
    )
    .bind(amount)
    .bind(pi_uid)
    .fetch_optional(pool)
    .await?;

    if let Some(row) = row {
        return Ok(row.get("inks"));
    }

    let balance_row = sqlx::query("SELECT inks FROM profiles WHERE pi_uid = $1")
        .bind(pi_uid)
        .fetch_optional(pool)
        .await?;

    match balance_row {
        Some(r) => Err(SpendError::Insufficient {
            balance: r.get("inks"),
            required: amount,
        }),
        None => Err(SpendError::UnknownUser),
    }
}

/// Renewals stack: the new period starts from whichever is later, now or the
/// current expiry — never from scratch.
pub fn stacked_expiry(
    now: DateTime<Utc>,
    current: Option<DateTime<Utc>>,
    duration: Duration,
) -> DateTime<Utc> {
    let base = current.map(|c| c.max(now)).unwrap_or(now);
    base + duration
}

pub async fn extend_subscription(
    tx: &mut Transaction<'_, Postgres>,
    pi_uid: &str,
    sub_type: SubscriptionType,
) -> Result<DateTime<Utc>, sqlx::Error> {
    let row = sqlx::query("SELECT subscription_expires_at FROM profiles WHERE pi_uid = $1")
        .bind(pi_uid)
        .fetch_optional(&mut **tx)
        .await?;

    let current: Option<DateTime<Utc>> = row.and_then(|r| r.get("subscription_expires_at"));
    let expires_at = stacked_expiry(Utc::now(), current, sub_type.duration());

    sqlx::query(
        r#"INSERT INTO profiles (pi_uid, subscription_type, subscription_expires_at)
           VALUES ($1, $2, $3)
           ON CONFLICT (pi_uid)
           DO UPDATE SET subscription_type = $2, subscription_expires_at = $3, updated_at = NOW()"#,
    )
    .bind(pi_uid)
    .bind(sub_type.as_str())
    .bind(expires_at)
    .execute(&mut **tx)
    .await?;

    Ok(expires_at)
}

pub async fn cancel_subscription(pool: &PgPool, pi_uid: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"UPDATE profiles
           SET subscription_type = NULL, subscription_expires_at = NULL, updated_at = NOW()
           WHERE pi_uid = $1"#,
    )
    .bind(pi_uid)
    .execute(pool)
    .await?;
    Ok(())
}

/// Grant whatever a completed payment bought. Pack credit counts come from the
/// server catalog, never from client-supplied metadata.
pub async fn apply_purchase(
    tx: &mut Transaction<'_, Postgres>,
    pi_uid: &str,
    purchase: &Purchase,
) -> Result<(), sqlx::Error> {
    match purchase {
        Purchase::InkPack { pack_id } => match catalog::pack_by_id(*pack_id) {
            Some(pack) => {
                log::info!("crediting {} inks to {} (pack {})", pack.credits(), pi_uid, pack_id);
                credit_inks(tx, pi_uid, pack.credits()).await?;
            }
            None => log::warn!("completed payment references unknown pack {pack_id}"),
        },
        Purchase::Pass { pass_id } => match catalog::pass_by_id(pass_id) {
            Some(pass) => {
                let expires_at = extend_subscription(tx, pi_uid, pass.sub_type).await?;
                log::info!("subscription {} for {} now expires {}", pass_id, pi_uid, expires_at);
            }
            None => log::warn!("completed payment references unknown pass {pass_id}"),
        },
    }
    Ok(())
}

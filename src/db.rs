// src/db.rs

use sqlx::{PgPool, Postgres, Row, Transaction};

use crate::api::pi_client::PaymentDto;
use crate::catalog::truncate_memo;
use crate::models::{Notification, PaymentRecord, Profile, Subscription, SubscriptionType};
use crate::payment_flow::PaymentState;

fn profile_from_row(row: &sqlx::postgres::PgRow) -> Profile {
    let sub_type: Option<String> = row.get("subscription_type");
    let expires_at: Option<chrono::DateTime<chrono::Utc>> = row.get("subscription_expires_at");
    let subscription = match (sub_type.as_deref().and_then(SubscriptionType::parse), expires_at) {
        (Some(sub_type), Some(expires_at)) => Some(Subscription {
            sub_type,
            expires_at,
        }),
        _ => None,
    };

    Profile {
        pi_uid: row.get("pi_uid"),
        username: row.get("username"),
        wallet_address: row.get("wallet_address"),
        inks: row.get("inks"),
        subscription,
    }
}

pub async fn get_profile(pool: &PgPool, pi_uid: &str) -> Result<Option<Profile>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT pi_uid, username, wallet_address, inks, subscription_type, subscription_expires_at
           FROM profiles
           WHERE pi_uid = $1"#,
    )
    .bind(pi_uid)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| profile_from_row(&r)))
}

/// Creates the row on first login; new readers start with 50 Inks.
pub async fn upsert_profile(
    pool: &PgPool,
    pi_uid: &str,
    username: &str,
) -> Result<Profile, sqlx::Error> {
    let row = sqlx::query(
        r#"INSERT INTO profiles (pi_uid, username)
           VALUES ($1, $2)
           ON CONFLICT (pi_uid)
           DO UPDATE SET username = EXCLUDED.username, updated_at = NOW()
           RETURNING pi_uid, username, wallet_address, inks, subscription_type, subscription_expires_at"#,
    )
    .bind(pi_uid)
    .bind(username)
    .fetch_one(pool)
    .await?;

    Ok(profile_from_row(&row))
}

pub async fn update_wallet_address(
    pool: &PgPool,
    pi_uid: &str,
    address: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE profiles SET wallet_address = $1, updated_at = NOW() WHERE pi_uid = $2")
        .bind(address)
        .bind(pi_uid)
        .execute(pool)
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Notifications (jsonb blob on the profile, newest first, capped at 50)

const NOTIFICATION_CAP: usize = 50;

pub async fn get_notifications(
    pool: &PgPool,
    pi_uid: &str,
) -> Result<Vec<Notification>, sqlx::Error> {
    let row = sqlx::query("SELECT notifications FROM profiles WHERE pi_uid = $1")
        .bind(pi_uid)
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Ok(Vec::new());
    };
    let value: serde_json::Value = row.get("notifications");
    Ok(serde_json::from_value(value).unwrap_or_default())
}

async fn save_notifications(
    pool: &PgPool,
    pi_uid: &str,
    list: &[Notification],
) -> Result<(), sqlx::Error> {
    let value = serde_json::to_value(list).unwrap_or_else(|_| serde_json::json!([]));
    sqlx::query("UPDATE profiles SET notifications = $1, updated_at = NOW() WHERE pi_uid = $2")
        .bind(value)
        .bind(pi_uid)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn push_notification(
    pool: &PgPool,
    pi_uid: &str,
    notification: Notification,
) -> Result<(), sqlx::Error> {
    let mut list = get_notifications(pool, pi_uid).await?;
    list.insert(0, notification);
    list.truncate(NOTIFICATION_CAP);
    save_notifications(pool, pi_uid, &list).await
}

pub async fn mark_notification_read(
    pool: &PgPool,
    pi_uid: &str,
    notification_id: &str,
) -> Result<bool, sqlx::Error> {
    let mut list = get_notifications(pool, pi_uid).await?;
    let mut found = false;
    for n in list.iter_mut() {
        if n.id == notification_id {
            n.read = true;
            found = true;
        }
    }
    if found {
        save_notifications(pool, pi_uid, &list).await?;
    }
    Ok(found)
}

pub async fn clear_notifications(pool: &PgPool, pi_uid: &str) -> Result<(), sqlx::Error> {
    save_notifications(pool, pi_uid, &[]).await
}

// ---------------------------------------------------------------------------
// Missions (jsonb `{date, list, lastActionMs}` blob on the profile)

pub async fn get_mission_blob(
    pool: &PgPool,
    pi_uid: &str,
) -> Result<Option<serde_json::Value>, sqlx::Error> {
    let row = sqlx::query("SELECT missions FROM profiles WHERE pi_uid = $1")
        .bind(pi_uid)
        .fetch_optional(pool)
        .await?;
    Ok(row.and_then(|r| r.get::<Option<serde_json::Value>, _>("missions")))
}

pub async fn save_mission_blob(
    pool: &PgPool,
    pi_uid: &str,
    blob: &serde_json::Value,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE profiles SET missions = $1, updated_at = NOW() WHERE pi_uid = $2")
        .bind(blob)
        .bind(pi_uid)
        .execute(pool)
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Payment ledger

fn payment_from_row(row: &sqlx::postgres::PgRow) -> Result<PaymentRecord, sqlx::Error> {
    let status: String = row.get("status");
    let status = PaymentState::parse(&status)
        .ok_or_else(|| sqlx::Error::Decode(format!("unknown payment status: {status}").into()))?;

    Ok(PaymentRecord {
        payment_id: row.get("payment_id"),
        user_uid: row.get("user_uid"),
        amount: row.get("amount"),
        memo: row.get("memo"),
        metadata: row.get("metadata"),
        txid: row.get("txid"),
        status,
        credited: row.get("credited"),
    })
}

pub async fn get_payment(
    pool: &PgPool,
    payment_id: &str,
) -> Result<Option<PaymentRecord>, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT payment_id, user_uid, amount, memo, metadata, txid, status, credited
           FROM payments
           WHERE payment_id = $1"#,
    )
    .bind(payment_id)
    .fetch_optional(pool)
    .await?;

    row.map(|r| payment_from_row(&r)).transpose()
}

/// Statuses a row may hold and still legally move to `next`.
fn predecessors(next: PaymentState) -> Vec<String> {
    use PaymentState::*;
    [Initiated, AwaitingApproval, Approved, AwaitingCompletion, Completed, Cancelled, Failed]
        .iter()
        .filter(|s| s.can_transition(next))
        .map(|s| s.as_str().to_string())
        .collect()
}

/// Insert-or-advance a ledger row carrying only the payment id. Terminal rows
/// are left alone.
pub async fn ensure_payment(
    pool: &PgPool,
    payment_id: &str,
    state: PaymentState,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO payments (payment_id, status)
           VALUES ($1, $2)
           ON CONFLICT (payment_id)
           DO UPDATE SET status = EXCLUDED.status, updated_at = NOW()
           WHERE payments.status = ANY($3)"#,
    )
    .bind(payment_id)
    .bind(state.as_str())
    .bind(predecessors(state))
    .execute(pool)
    .await?;
    Ok(())
}

/// Insert-or-update a ledger row from the platform's payment DTO. Existing
/// details are kept when the DTO omits them; the status only moves forward.
pub async fn upsert_payment_details(
    pool: &PgPool,
    dto: &PaymentDto,
    state: PaymentState,
) -> Result<(), sqlx::Error> {
    let amount = dto.amount.map(|a| a.to_string());
    let memo = dto.memo.as_deref().map(truncate_memo);

    sqlx::query(
        r#"INSERT INTO payments (payment_id, user_uid, amount, memo, metadata, status)
           VALUES ($1, $2, $3, $4, $5, $6)
           ON CONFLICT (payment_id)
           DO UPDATE SET
               user_uid = COALESCE(payments.user_uid, EXCLUDED.user_uid),
               amount = COALESCE(payments.amount, EXCLUDED.amount),
               memo = COALESCE(payments.memo, EXCLUDED.memo),
               metadata = COALESCE(payments.metadata, EXCLUDED.metadata),
               status = CASE WHEN payments.status = ANY($7) THEN EXCLUDED.status
                             ELSE payments.status END,
               updated_at = NOW()"#,
    )
    .bind(&dto.identifier)
    .bind(&dto.user_uid)
    .bind(amount)
    .bind(memo)
    .bind(&dto.metadata)
    .bind(state.as_str())
    .bind(predecessors(state))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_payment_completed(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: &str,
    txid: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO payments (payment_id, txid, status)
           VALUES ($1, $2, 'completed')
           ON CONFLICT (payment_id)
           DO UPDATE SET
               txid = COALESCE(payments.txid, EXCLUDED.txid),
               status = CASE WHEN payments.status = ANY($3) THEN 'completed'
                             ELSE payments.status END,
               updated_at = NOW()"#,
    )
    .bind(payment_id)
    .bind(txid)
    .bind(predecessors(PaymentState::Completed))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// The at-most-once credit guard: matches only while `credited` is false, so
/// the first caller wins and every replay returns false.
pub async fn try_mark_credited(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payments SET credited = TRUE, updated_at = NOW()
         WHERE payment_id = $1 AND credited = FALSE",
    )
    .bind(payment_id)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() == 1)
}

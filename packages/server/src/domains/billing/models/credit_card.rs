use anyhow::{Context, Result};
use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor, PgPool};

use crate::common::{CreditCardId, UserId};
use crate::kernel::GatewayCard;

/// Cards expiring within this many months are flagged.
pub const IS_EXPIRING_THRESHOLD_MONTHS: u32 = 2;

/// Card on file for a subscribed user. Only display details are stored.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CreditCard {
    pub id: CreditCardId,
    #[serde(skip)]
    pub user_id: UserId,
    pub brand: String,
    pub last4: String,
    pub exp_date: NaiveDate,
    pub is_expiring: bool,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

/// Card fields extracted from a gateway response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDetails {
    pub brand: String,
    pub last4: String,
    pub exp_date: NaiveDate,
    pub is_expiring: bool,
}

impl CardDetails {
    /// Expiry becomes the first day of the expiry month.
    pub fn from_gateway(card: &GatewayCard, today: NaiveDate) -> Result<Self> {
        let exp_date = NaiveDate::from_ymd_opt(card.exp_year, card.exp_month, 1)
            .with_context(|| format!("invalid card expiry {}/{}", card.exp_month, card.exp_year))?;

        Ok(Self {
            brand: card.brand.clone(),
            last4: card.last4.clone(),
            exp_date,
            is_expiring: is_expiring_soon(today, exp_date),
        })
    }
}

fn expiry_threshold(compare: NaiveDate) -> NaiveDate {
    compare
        .checked_add_months(Months::new(IS_EXPIRING_THRESHOLD_MONTHS))
        .unwrap_or(NaiveDate::MAX)
}

/// True when `exp_date` falls on or before `compare` plus the threshold.
pub fn is_expiring_soon(compare: NaiveDate, exp_date: NaiveDate) -> bool {
    exp_date <= expiry_threshold(compare)
}

impl CreditCard {
    pub async fn find_by_user(user_id: UserId, pool: &PgPool) -> Result<Option<Self>> {
        let card = sqlx::query_as::<_, CreditCard>("SELECT * FROM credit_cards WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        Ok(card)
    }

    /// Insert the user's card or replace the one on file
    pub async fn upsert<'e>(
        user_id: UserId,
        details: &CardDetails,
        executor: impl PgExecutor<'e>,
    ) -> Result<Self> {
        let card = sqlx::query_as::<_, CreditCard>(
            r#"
            INSERT INTO credit_cards (id, user_id, brand, last4, exp_date, is_expiring)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE
            SET brand = EXCLUDED.brand,
                last4 = EXCLUDED.last4,
                exp_date = EXCLUDED.exp_date,
                is_expiring = EXCLUDED.is_expiring,
                updated_on = NOW()
            RETURNING *
            "#,
        )
        .bind(CreditCardId::new())
        .bind(user_id)
        .bind(&details.brand)
        .bind(&details.last4)
        .bind(details.exp_date)
        .bind(details.is_expiring)
        .fetch_one(executor)
        .await?;
        Ok(card)
    }

    pub async fn delete_for_user<'e>(user_id: UserId, executor: impl PgExecutor<'e>) -> Result<()> {
        sqlx::query("DELETE FROM credit_cards WHERE user_id = $1")
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Flag every card that expires within the threshold of `compare`.
    /// Returns the number of cards newly flagged.
    pub async fn mark_old_credit_cards(compare: NaiveDate, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE credit_cards
            SET is_expiring = TRUE, updated_on = NOW()
            WHERE exp_date <= $1 AND is_expiring = FALSE
            "#,
        )
        .bind(expiry_threshold(compare))
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

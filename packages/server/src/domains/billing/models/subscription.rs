use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgExecutor, PgPool};

use crate::common::{SubscriptionId, UserId};

/// Local record of a user's active gateway subscription
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    #[serde(skip)]
    pub user_id: UserId,
    pub plan: String,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

impl Subscription {
    pub async fn find_by_user<'e>(
        user_id: UserId,
        executor: impl PgExecutor<'e>,
    ) -> Result<Option<Self>> {
        let subscription =
            sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(executor)
                .await?;
        Ok(subscription)
    }

    pub async fn create<'e>(
        user_id: UserId,
        plan: &str,
        executor: impl PgExecutor<'e>,
    ) -> Result<Self> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions (id, user_id, plan)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(SubscriptionId::new())
        .bind(user_id)
        .bind(plan)
        .fetch_one(executor)
        .await?;
        Ok(subscription)
    }

    pub async fn update_plan(user_id: UserId, plan: &str, pool: &PgPool) -> Result<Self> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            UPDATE subscriptions
            SET plan = $2, updated_on = NOW()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(plan)
        .fetch_one(pool)
        .await?;
        Ok(subscription)
    }

    pub async fn delete_for_user<'e>(user_id: UserId, executor: impl PgExecutor<'e>) -> Result<()> {
        sqlx::query("DELETE FROM subscriptions WHERE user_id = $1")
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// (count, plan) pairs ordered by plan
    pub async fn group_and_count_plans(pool: &PgPool) -> Result<Vec<(i64, String)>> {
        let rows = sqlx::query_as::<_, (i64, String)>(
            r#"
            SELECT COUNT(*), plan
            FROM subscriptions
            GROUP BY plan
            ORDER BY plan
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}

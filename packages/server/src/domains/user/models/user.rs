use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgExecutor, PgPool};

use crate::common::{PageParams, Role, UserId};

/// User model - SQL persistence layer
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: UserId,
    pub role: Role,
    pub username: String,
    pub email: String,
    /// argon2 PHC string
    pub password: String,
    pub is_active: bool,
    pub name: Option<String>,
    pub payment_id: Option<String>,
    pub cancelled_subscription_on: Option<DateTime<Utc>>,

    pub sign_in_count: i32,
    pub current_sign_in_on: Option<DateTime<Utc>>,
    pub current_sign_in_ip: Option<String>,
    pub last_sign_in_on: Option<DateTime<Utc>>,
    pub last_sign_in_ip: Option<String>,

    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
}

/// Result of a guarded delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
    /// Refused: the user is the only remaining admin
    LastAdmin,
}

/// Columns the admin listing may sort by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserSort {
    #[default]
    CreatedOn,
    Username,
    Email,
    Role,
    SignInCount,
    LastSignInOn,
    PaymentId,
}

impl UserSort {
    /// Unknown names fall back to `created_on`.
    pub fn parse(value: Option<&str>) -> Self {
        match value.unwrap_or_default() {
            "username" => UserSort::Username,
            "email" => UserSort::Email,
            "role" => UserSort::Role,
            "sign_in_count" => UserSort::SignInCount,
            "last_sign_in_on" => UserSort::LastSignInOn,
            "payment_id" => UserSort::PaymentId,
            _ => UserSort::CreatedOn,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            UserSort::CreatedOn => "created_on",
            UserSort::Username => "username",
            UserSort::Email => "email",
            UserSort::Role => "role",
            UserSort::SignInCount => "sign_in_count",
            UserSort::LastSignInOn => "last_sign_in_on",
            UserSort::PaymentId => "payment_id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Only an explicit `asc` sorts ascending.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("asc") => SortDirection::Asc,
            _ => SortDirection::Desc,
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// `%q%` ILIKE pattern with wildcards in the user's text escaped.
pub fn search_pattern(q: Option<&str>) -> Option<String> {
    let q = q.map(str::trim).filter(|q| !q.is_empty())?;
    let escaped = q
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{}%", escaped))
}

impl User {
    pub async fn find_by_id(id: UserId, pool: &PgPool) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(email: &str, pool: &PgPool) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_username(username: &str, pool: &PgPool) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    /// Look a user up by email or username
    pub async fn find_by_identity(identity: &str, pool: &PgPool) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = $1 OR username = $1 LIMIT 1",
        )
        .bind(identity)
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    pub async fn find_by_payment_id(payment_id: &str, pool: &PgPool) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE payment_id = $1")
            .bind(payment_id)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    pub async fn create(input: CreateUser, pool: &PgPool) -> Result<Self> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, role, username, email, password, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(UserId::new())
        .bind(input.role)
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.password_hash)
        .bind(input.is_active)
        .fetch_one(pool)
        .await?;
        Ok(user)
    }

    /// Activate the account owning `email`
    pub async fn activate(email: &str, pool: &PgPool) -> Result<Option<Self>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_active = TRUE, updated_on = NOW()
            WHERE email = $1
            RETURNING *
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;
        Ok(user)
    }

    /// Rotate current sign-in details into last and record this sign-in
    pub async fn update_activity(id: UserId, ip: Option<&str>, pool: &PgPool) -> Result<Self> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET sign_in_count = sign_in_count + 1,
                last_sign_in_on = current_sign_in_on,
                last_sign_in_ip = current_sign_in_ip,
                current_sign_in_on = NOW(),
                current_sign_in_ip = $2,
                updated_on = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(ip)
        .fetch_one(pool)
        .await?;
        Ok(user)
    }

    /// Rename and re-role a user. Returns `None`, changing nothing, when the
    /// update would demote the last admin.
    pub async fn update_username_and_role(
        id: UserId,
        username: &str,
        role: Role,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        let mut tx = pool.begin().await?;

        let admins = Self::lock_admins(&mut *tx).await?;
        if !role.is_admin() && admins.contains(&id) && admins.len() <= 1 {
            return Ok(None);
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $2, role = $3, updated_on = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(role)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(user))
    }

    /// Hold the user's row lock until the transaction ends
    pub async fn lock_for_update<'e>(id: UserId, executor: impl PgExecutor<'e>) -> Result<()> {
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Store the gateway customer created for a new subscription
    pub async fn set_payment_details<'e>(
        id: UserId,
        payment_id: &str,
        name: &str,
        executor: impl PgExecutor<'e>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET payment_id = $2, name = $3, cancelled_subscription_on = NULL, updated_on = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(payment_id)
        .bind(name)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn set_name<'e>(id: UserId, name: &str, executor: impl PgExecutor<'e>) -> Result<()> {
        sqlx::query("UPDATE users SET name = $2, updated_on = NOW() WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Drop the gateway customer and remember when the subscription ended
    pub async fn mark_subscription_cancelled<'e>(
        id: UserId,
        executor: impl PgExecutor<'e>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET payment_id = NULL, cancelled_subscription_on = NOW(), updated_on = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Delete a user unless they are the last admin.
    pub async fn delete_unless_last_admin(id: UserId, pool: &PgPool) -> Result<DeleteOutcome> {
        let mut tx = pool.begin().await?;

        let admins = Self::lock_admins(&mut *tx).await?;
        if admins.contains(&id) && admins.len() <= 1 {
            return Ok(DeleteOutcome::LastAdmin);
        }

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(if result.rows_affected() > 0 {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::NotFound
        })
    }

    /// Ids of every admin, row-locked until the transaction ends.
    ///
    /// Demotions and deletions both go through this lock, so a waiter
    /// re-reads the admin set after the holder commits.
    async fn lock_admins(conn: &mut PgConnection) -> Result<Vec<UserId>> {
        let ids = sqlx::query_scalar::<_, UserId>(
            "SELECT id FROM users WHERE role = 'admin' ORDER BY id FOR UPDATE",
        )
        .fetch_all(conn)
        .await?;
        Ok(ids)
    }

    pub async fn count_admins(pool: &PgPool) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// Filtered, sorted page of users plus the total match count
    pub async fn search(
        q: Option<&str>,
        sort: UserSort,
        direction: SortDirection,
        params: &PageParams,
        pool: &PgPool,
    ) -> Result<(Vec<Self>, i64)> {
        let pattern = search_pattern(q);

        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM users
            WHERE ($1::text IS NULL OR email ILIKE $1 OR username ILIKE $1)
            "#,
        )
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

        // Column and direction come from closed enums, never from request text.
        let sql = format!(
            r#"
            SELECT * FROM users
            WHERE ($1::text IS NULL OR email ILIKE $1 OR username ILIKE $1)
            ORDER BY {column} {direction} NULLS LAST, id {direction}
            LIMIT $2 OFFSET $3
            "#,
            column = sort.column(),
            direction = direction.sql(),
        );

        let users = sqlx::query_as::<_, User>(&sql)
            .bind(&pattern)
            .bind(params.limit())
            .bind(params.offset())
            .fetch_all(pool)
            .await?;

        Ok((users, total))
    }

    /// Ids of every user matching the search
    pub async fn search_ids(q: Option<&str>, pool: &PgPool) -> Result<Vec<UserId>> {
        let ids = sqlx::query_scalar::<_, UserId>(
            r#"
            SELECT id FROM users
            WHERE ($1::text IS NULL OR email ILIKE $1 OR username ILIKE $1)
            ORDER BY created_on
            "#,
        )
        .bind(search_pattern(q))
        .fetch_all(pool)
        .await?;
        Ok(ids)
    }

    /// (count, role) pairs ordered by role
    pub async fn group_and_count_roles(pool: &PgPool) -> Result<Vec<(i64, String)>> {
        let rows = sqlx::query_as::<_, (i64, String)>(
            r#"
            SELECT COUNT(*), role::text
            FROM users
            GROUP BY role
            ORDER BY role::text
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_whitelist_falls_back_to_created_on() {
        assert_eq!(UserSort::parse(Some("email")), UserSort::Email);
        assert_eq!(UserSort::parse(Some("password")), UserSort::CreatedOn);
        assert_eq!(UserSort::parse(None), UserSort::CreatedOn);
    }

    #[test]
    fn only_asc_sorts_ascending() {
        assert_eq!(SortDirection::parse(Some("asc")), SortDirection::Asc);
        assert_eq!(SortDirection::parse(Some("ASC")), SortDirection::Desc);
        assert_eq!(SortDirection::parse(Some("desc")), SortDirection::Desc);
        assert_eq!(SortDirection::parse(None), SortDirection::Desc);
    }

    #[test]
    fn search_pattern_escapes_wildcards() {
        assert_eq!(search_pattern(Some("dev")), Some("%dev%".to_string()));
        assert_eq!(search_pattern(Some("50%_off")), Some("%50\\%\\_off%".to_string()));
        assert_eq!(search_pattern(Some("  ")), None);
        assert_eq!(search_pattern(None), None);
    }
}

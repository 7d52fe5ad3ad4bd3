//! Account store: users and their login sessions.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite};

use crate::{
    db::models::{NewUser, User},
    error::AppError,
};

pub async fn create_user<'e, E>(executor: E, new: &NewUser) -> Result<User, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email, password_hash, full_name, phone, is_admin, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(&new.username)
    .bind(&new.email)
    .bind(&new.password_hash)
    .bind(&new.full_name)
    .bind(&new.phone)
    .bind(new.is_admin)
    .bind(Utc::now())
    .fetch_one(executor)
    .await;

    match result {
        Ok(user) => {
            log::info!("Created user {} ({})", user.id, user.email);
            Ok(user)
        }
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(AppError::Conflict(
            "An account with this email already exists".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

pub async fn find_user_by_email<'e, E>(executor: E, email: &str) -> Result<Option<User>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(executor)
        .await?;
    Ok(user)
}

pub async fn count_users<'e, E>(executor: E) -> Result<i64, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(executor)
        .await?;
    Ok(count)
}

pub async fn create_session<'e, E>(
    executor: E,
    token: &str,
    user_id: i64,
    expires_at: DateTime<Utc>,
) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(token)
    .bind(user_id)
    .bind(Utc::now())
    .bind(expires_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// The user behind a session that has not expired at `now`.
pub async fn find_session_user<'e, E>(
    executor: E,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<User>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let user = sqlx::query_as::<_, User>(
        "SELECT users.* FROM sessions JOIN users ON users.id = sessions.user_id \
         WHERE sessions.token = $1 AND sessions.expires_at > $2",
    )
    .bind(token)
    .bind(now)
    .fetch_optional(executor)
    .await?;
    Ok(user)
}

pub async fn delete_session<'e, E>(executor: E, token: &str) -> Result<bool, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn purge_expired_sessions<'e, E>(executor: E, now: DateTime<Utc>) -> Result<u64, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
        .bind(now)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

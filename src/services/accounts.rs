//! Signup, login and bearer-session verification.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    db::{
        accounts,
        models::{NewUser, User},
    },
    error::AppError,
    utils::non_blank,
};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct Session {
    pub token: String,
    pub expires_at: chrono::DateTime<Utc>,
    pub user: User,
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    if password.is_empty() {
        return Err(AppError::Validation("Password cannot be empty".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

pub fn verify_password(stored_hash: &str, candidate: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| AppError::Internal(format!("Invalid stored password hash: {}", e)))?;

    match Argon2::default().verify_password(candidate.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AppError::Internal(format!(
            "Password verification failed: {}",
            e
        ))),
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let tld_ok = domain
        .rsplit_once('.')
        .map(|(host, tld)| !host.is_empty() && tld.len() >= 2)
        .unwrap_or(false);
    !local.is_empty() && !email.contains(char::is_whitespace) && tld_ok
}

fn require(value: Option<&str>, field: &str) -> Result<String, AppError> {
    non_blank(value).ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

pub async fn signup(pool: &SqlitePool, request: SignupRequest) -> Result<User, AppError> {
    let username = require(request.username.as_deref(), "username")?;
    let email = require(request.email.as_deref(), "email")?.to_lowercase();
    let password = request
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Validation("password is required".to_string()))?;

    if !is_valid_email(&email) {
        return Err(AppError::Validation("Invalid email format".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }

    let new = NewUser {
        username,
        email,
        password_hash: hash_password(&password)?,
        full_name: non_blank(request.full_name.as_deref()),
        phone: non_blank(request.phone.as_deref()),
        is_admin: false,
    };
    accounts::create_user(pool, &new).await
}

pub async fn login(
    pool: &SqlitePool,
    request: LoginRequest,
    ttl: Duration,
) -> Result<Session, AppError> {
    let email = require(request.email.as_deref(), "email")?.to_lowercase();
    let password = request.password.unwrap_or_default();
    let rejected = || AppError::Unauthorized("Invalid email or password".to_string());

    let user = accounts::find_user_by_email(pool, &email)
        .await?
        .ok_or_else(rejected)?;
    if password.is_empty() || !verify_password(&user.password_hash, &password)? {
        log::warn!("Failed login for {}", email);
        return Err(rejected());
    }

    let now = Utc::now();
    let purged = accounts::purge_expired_sessions(pool, now).await?;
    if purged > 0 {
        log::debug!("Purged {} expired sessions", purged);
    }

    let token = Uuid::new_v4().simple().to_string();
    let expires_at = now + ttl;
    accounts::create_session(pool, &token, user.id, expires_at).await?;
    log::info!("User {} logged in", user.id);

    Ok(Session {
        token,
        expires_at,
        user,
    })
}

/// Resolves a bearer token to its user; unknown and expired tokens are rejected alike.
pub async fn authenticate(pool: &SqlitePool, token: &str) -> Result<User, AppError> {
    accounts::find_session_user(pool, token, Utc::now())
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired session".to_string()))
}

pub async fn logout(pool: &SqlitePool, token: &str) -> Result<(), AppError> {
    accounts::delete_session(pool, token).await?;
    Ok(())
}

/// Row for an administrator account with a freshly hashed password.
pub fn new_admin(email: &str, password: &str) -> Result<NewUser, AppError> {
    Ok(NewUser {
        username: "admin".to_string(),
        email: email.trim().to_lowercase(),
        password_hash: hash_password(password)?,
        full_name: Some("Admin User".to_string()),
        phone: None,
        is_admin: true,
    })
}

/// Creates an administrator unless the email is already registered.
pub async fn ensure_admin(pool: &SqlitePool, email: &str, password: &str) -> Result<User, AppError> {
    let email = email.trim().to_lowercase();
    if let Some(existing) = accounts::find_user_by_email(pool, &email).await? {
        return Ok(existing);
    }
    accounts::create_user(pool, &new_admin(&email, password)?).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use rstest::rstest;

    fn signup_request(email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            username: Some("amina".to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            full_name: Some("Amina Yusuf".to_string()),
            phone: None,
        }
    }

    #[test]
    fn hashes_verify_only_the_original_password() {
        let hash = hash_password("s3cret!").unwrap();
        assert_ne!(hash, "s3cret!");
        assert!(verify_password(&hash, "s3cret!").unwrap());
        assert!(!verify_password(&hash, "wrong").unwrap());
    }

    #[rstest]
    #[case("amina@example.com", true)]
    #[case("a.b+c@mail.co", true)]
    #[case("amina@example", false)]
    #[case("@example.com", false)]
    #[case("amina example@x.com", false)]
    #[case("amina", false)]
    fn email_shape(#[case] email: &str, #[case] valid: bool) {
        assert_eq!(is_valid_email(email), valid);
    }

    #[tokio::test]
    async fn signup_validates_input() {
        let pool = test_pool().await;

        let err = signup(&pool, signup_request("not-an-email", "secret1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m == "Invalid email format"));

        let err = signup(&pool, signup_request("amina@example.com", "12345"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let mut missing = signup_request("amina@example.com", "secret1");
        missing.username = None;
        let err = signup(&pool, missing).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m == "username is required"));
    }

    #[tokio::test]
    async fn login_issues_a_session_that_authenticates() {
        let pool = test_pool().await;
        let user = signup(&pool, signup_request("Amina@Example.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(user.email, "amina@example.com");
        assert!(!user.is_admin);

        let login_request = LoginRequest {
            email: Some("amina@example.com".to_string()),
            password: Some("secret1".to_string()),
        };
        let session = login(&pool, login_request, Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(session.user.id, user.id);

        let resolved = authenticate(&pool, &session.token).await.unwrap();
        assert_eq!(resolved.id, user.id);

        logout(&pool, &session.token).await.unwrap();
        assert!(matches!(
            authenticate(&pool, &session.token).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials_uniformly() {
        let pool = test_pool().await;
        signup(&pool, signup_request("amina@example.com", "secret1"))
            .await
            .unwrap();

        for (email, password) in [
            ("amina@example.com", "wrong-pass"),
            ("nobody@example.com", "secret1"),
            ("amina@example.com", ""),
        ] {
            let request = LoginRequest {
                email: Some(email.to_string()),
                password: Some(password.to_string()),
            };
            let err = login(&pool, request, Duration::hours(1))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Unauthorized(m) if m == "Invalid email or password"));
        }
    }

    #[tokio::test]
    async fn expired_sessions_do_not_authenticate() {
        let pool = test_pool().await;
        signup(&pool, signup_request("amina@example.com", "secret1"))
            .await
            .unwrap();
        let request = LoginRequest {
            email: Some("amina@example.com".to_string()),
            password: Some("secret1".to_string()),
        };
        let session = login(&pool, request, Duration::seconds(-1))
            .await
            .unwrap();

        assert!(matches!(
            authenticate(&pool, &session.token).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let pool = test_pool().await;
        let first = ensure_admin(&pool, "admin@medireach.com", "admin123")
            .await
            .unwrap();
        let second = ensure_admin(&pool, "admin@medireach.com", "admin123")
            .await
            .unwrap();
        assert!(first.is_admin);
        assert_eq!(first.id, second.id);
    }
}

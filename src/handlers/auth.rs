use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::{
    error::AppError,
    handlers::identity::Caller,
    services::accounts::{self, LoginRequest, SignupRequest},
    state::AppState,
};

pub async fn signup(
    state: web::Data<AppState>,
    body: web::Json<SignupRequest>,
) -> Result<HttpResponse, AppError> {
    let user = accounts::signup(&state.pool, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully",
        "user": user,
    })))
}

pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let session =
        accounts::login(&state.pool, body.into_inner(), state.config.session_ttl()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Login successful",
        "access_token": session.token,
        "expires_at": session.expires_at,
        "user": session.user,
    })))
}

pub async fn logout(caller: Caller, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    accounts::logout(&state.pool, &caller.token).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Logged out successfully" })))
}

pub async fn me(caller: Caller) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(json!({ "user": caller.user })))
}

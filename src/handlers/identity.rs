//! Request extractors that resolve who is calling before a handler runs.

use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use futures::future::{FutureExt, LocalBoxFuture};

use crate::{db::models::User, error::AppError, services::accounts, state::AppState};

/// A signed-in user, resolved from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: User,
    pub token: String,
}

/// A signed-in user holding the admin flag.
#[derive(Debug, Clone)]
pub struct Admin(pub Caller);

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

impl FromRequest for Caller {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req);

        async move {
            let state =
                state.ok_or_else(|| AppError::Internal("application state missing".to_string()))?;
            let token = token
                .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;
            let user = accounts::authenticate(&state.pool, &token).await?;
            Ok(Caller { user, token })
        }
        .boxed_local()
    }
}

impl FromRequest for Admin {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let caller = Caller::from_request(req, payload);

        async move {
            let caller = caller.await?;
            if !caller.user.is_admin {
                log::warn!("User {} denied admin access", caller.user.id);
                return Err(AppError::Forbidden("Admin privileges required".to_string()));
            }
            Ok(Admin(caller))
        }
        .boxed_local()
    }
}

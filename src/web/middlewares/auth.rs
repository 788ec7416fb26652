use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tower_cookies::{Cookie, Cookies, cookie::SameSite};
use uuid::Uuid;

use crate::{
    Config,
    auth::{self, CryptError, CryptResult, UserClaims},
    model::{CrudRepository, ResourceTyped, entity::UserEntity},
    web::{AppState, RequestContext, context::AuthenticatedUser, error::WebError},
};

pub static AUTH_TOKEN: &str = "SID";

/// Signs a session token for `user_id` and wraps it into the `SID` cookie.
pub fn session_cookie(user_id: Uuid, config: &Config) -> CryptResult<Cookie<'static>> {
    let claims = UserClaims::for_user(user_id, config.app().token_lifetime_hours());
    let token = auth::generate_token(claims, config.app().jwt())?;

    let mut cookie = Cookie::new(AUTH_TOKEN, token);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_http_only(true);
    cookie.set_path("/");
    Ok(cookie)
}

pub async fn extract_context_fn(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Result<Response, WebError> {
    let token = match cookies.get(AUTH_TOKEN) {
        Some(token) => token,
        None => {
            req.extensions_mut().insert(RequestContext::new(None));
            return Ok(next.run(req).await);
        }
    };

    let claims = auth::process_token(token.value(), state.config().app().jwt())
        .map_err(|e| WebError::auth_cookie_invalid(AUTH_TOKEN, e.into()))?;

    let id = claims.claims.user_id().ok_or_else(|| {
        WebError::auth_cookie_invalid(AUTH_TOKEN, CryptError::InvalidSubject(claims.claims.sub.clone()))
    })?;

    let found = UserEntity::find_by_id(state.pool(), &AuthenticatedUser::admin(), id)
        .await
        .map_err(|e| WebError::resource_fetch_error(UserEntity::get_resource_type(), e))?;

    let ctx = match found {
        Some(user) => {
            tracing::trace!(user_id = %id, role = %user.role(), "request authenticated");
            RequestContext::new(Some(AuthenticatedUser::new(id, user.role())))
        }
        // the account was deleted after the token was issued
        None => RequestContext::new(None),
    };

    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}

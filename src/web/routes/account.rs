use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use crate::{
    auth::{hash_password, verify_password},
    model::{
        CrudRepository, PaginatableRepository, ResourceTyped,
        entity::{UserEntity, UserEntityCreateUpdate},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::account::{AccountUpdateBody, RoleAssignBody, SigninBody, SignupBody},
        error::ErrorResponse,
        middlewares::{self, AUTH_TOKEN, session_cookie},
        routes::{PaginationQuery, ensure_owner, required},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    let protected = Router::new()
        .route("/page", get(user_list_handler))
        .route("/verify", get(user_verify_handler))
        .route("/me", get(user_me_handler))
        .route("/{id}", put(user_update_handler).delete(user_delete_handler))
        .route("/{id}/role", put(user_role_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ));

    Router::new()
        .route("/signup", post(user_signup_handler))
        .route("/signin", post(user_signin_handler))
        .route("/signout", post(user_signout_handler))
        .merge(protected)
        .with_state(state)
}

fn user_error(e: crate::model::DatabaseError) -> WebError {
    WebError::from_db(UserEntity::get_resource_type(), e)
}

#[utoipa::path(
    post,
    path = "/api/v1/account/signup",
    request_body = SignupBody,
    description = "Registers a trainee account and signs it in",
    responses(
        (status = 200, description = "User created successfully", body = UserEntity),
        (status = 400, description = "Username, password or email invalid", body = ErrorResponse),
        (status = 409, description = "User already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account"
)]
async fn user_signup_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<SignupBody>,
) -> WebResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|reason| WebError::resource_bad_request(UserEntity::get_resource_type(), reason))?;

    let admin = AuthenticatedUser::admin();
    let found = UserEntity::find_by_username(state.pool(), &admin, payload.username.trim())
        .await
        .map_err(user_error)?;

    if found.is_some() {
        return Err(WebError::registration_conflict());
    }

    let hash = hash_password(&payload.password).map_err(WebError::server_crypt_error)?;
    let payload = UserEntityCreateUpdate {
        username: payload.username.trim().to_string(),
        email: payload.email,
        password_hash: hash,
    };

    let created = UserEntity::create(state.pool(), &admin, payload)
        .await
        .map_err(user_error)?;

    let cookie = session_cookie(created.id(), state.config()).map_err(WebError::server_crypt_error)?;
    cookies.add(cookie);

    tracing::info!(user_id = %created.id(), "account registered");
    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/signin",
    description = "Authorizes user in the system",
    request_body = SigninBody,
    responses(
        (status = 200, description = "User signed in", body = UserEntity),
        (status = 401, description = "Credentials invalid", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
)]
async fn user_signin_handler(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(payload): Json<SigninBody>,
) -> WebResult<impl IntoResponse> {
    let admin = AuthenticatedUser::admin();
    let found = UserEntity::find_by_username(state.pool(), &admin, payload.username.trim())
        .await
        .map_err(user_error)?
        .ok_or_else(WebError::auth_invalid_credentials)?;

    let is_verified =
        verify_password(found.hash(), &payload.password).map_err(WebError::server_crypt_error)?;

    if !is_verified {
        return Err(WebError::auth_invalid_credentials());
    }

    let cookie = session_cookie(found.id(), state.config()).map_err(WebError::server_crypt_error)?;
    cookies.add(cookie);

    Ok((StatusCode::OK, Json(found)))
}

#[utoipa::path(
    post,
    path = "/api/v1/account/signout",
    description = "Drops the session cookie",
    responses(
        (status = 200, description = "Signed out"),
    ),
    tag = "account",
)]
async fn user_signout_handler(cookies: Cookies) -> StatusCode {
    let mut cookie = Cookie::from(AUTH_TOKEN);
    cookie.set_path("/");
    cookies.remove(cookie);
    StatusCode::OK
}

#[utoipa::path(
    get,
    path = "/api/v1/account/verify",
    description = "Checks whether the session cookie belongs to an existing user",
    responses(
        (status = 200, description = "Session is valid"),
        (status = 401, description = "No valid session"),
    ),
    tag = "account",
)]
async fn user_verify_handler(ctx: RequestContext) -> StatusCode {
    match ctx.maybe_user() {
        Some(_) => StatusCode::OK,
        None => StatusCode::UNAUTHORIZED,
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/account/me",
    responses(
        (status = 200, description = "Signed-in user", body = UserEntity),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 404, description = "User no longer exists", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn user_me_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let found = UserEntity::find_by_id(state.pool(), user, user.user_id())
        .await
        .map_err(user_error)?;

    Ok((StatusCode::OK, Json(required(found)?)))
}

#[utoipa::path(
    get,
    path = "/api/v1/account/page",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Returns requested page", body = crate::model::Page<UserEntity>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn user_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.admin_user()?;

    let users = UserEntity::page(state.pool(), user, page.limit(), page.offset())
        .await
        .map_err(user_error)?;

    Ok((StatusCode::OK, Json(users)))
}

#[utoipa::path(
    put,
    path = "/api/v1/account/{id}",
    request_body = AccountUpdateBody,
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User updated successfully", body = UserEntity),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 403, description = "You doesn't have enough permissions to do this", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Username is taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn user_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AccountUpdateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let found = UserEntity::find_by_id(state.pool(), user, id)
        .await
        .map_err(user_error)?;
    let found = required(found)?;
    ensure_owner(&state, user, &found).await?;

    let username = payload.username.trim().to_string();
    if username.is_empty() {
        return Err(WebError::resource_bad_request(
            UserEntity::get_resource_type(),
            "username must not be empty",
        ));
    }

    let conflict_found = UserEntity::find_by_username(state.pool(), user, &username)
        .await
        .map_err(user_error)?;

    if conflict_found.is_some_and(|other| other.id() != found.id()) {
        return Err(WebError::registration_conflict());
    }

    let payload = UserEntityCreateUpdate {
        username,
        email: payload.email,
        password_hash: String::new(),
    };

    let updated = found
        .update(state.pool(), user, payload)
        .await
        .map_err(user_error)?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    put,
    path = "/api/v1/account/{id}/role",
    request_body = RoleAssignBody,
    params(("id" = Uuid, Path, description = "User id")),
    description = "Changes role and department of a user, admins only",
    responses(
        (status = 200, description = "Role assigned", body = UserEntity),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not an admin to do this", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn user_role_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoleAssignBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.admin_user()?;

    let found = UserEntity::find_by_id(state.pool(), user, id)
        .await
        .map_err(user_error)?;
    let updated = required(found)?
        .assign(state.pool(), user, payload.role, payload.department_id)
        .await
        .map_err(user_error)?;

    tracing::info!(user_id = %id, role = %payload.role, "role assigned");
    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/account/{id}",
    description = "Deletes specified user",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted successfully"),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 403, description = "You're not allowed to do this", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "account",
    security(
        ("cookie" = [])
    )
)]
async fn user_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let found = UserEntity::find_by_id(state.pool(), user, id)
        .await
        .map_err(user_error)?;
    let found = required(found)?;
    ensure_owner(&state, user, &found).await?;

    found.delete(state.pool(), user).await.map_err(user_error)?;

    Ok(StatusCode::OK)
}

use axum::{Json, Router, extract::State, http::StatusCode, middleware, response::IntoResponse, routing::get};

use crate::{
    model::{
        DatabaseError, ResourceTyped,
        entity::{
            SmtpSettings, SmtpSettingsUpdate, StorageSettings, StorageSettingsUpdate, ZoomSettings,
            ZoomSettingsUpdate,
        },
    },
    web::{AppState, RequestContext, WebError, WebResult, error::ErrorResponse, middlewares},
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/smtp", get(smtp_get_handler).put(smtp_update_handler))
        .route("/storage", get(storage_get_handler).put(storage_update_handler))
        .route("/zoom", get(zoom_get_handler).put(zoom_update_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn settings_error(e: DatabaseError) -> WebError {
    WebError::from_db(SmtpSettings::get_resource_type(), e)
}

#[utoipa::path(
    get,
    path = "/api/v1/settings/smtp",
    responses(
        (status = 200, description = "Mail server settings, password omitted", body = SmtpSettings),
        (status = 403, description = "Admins only", body = ErrorResponse),
    ),
    tag = "settings",
    security(
        ("cookie" = [])
    )
)]
async fn smtp_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    ctx.admin_user()?;
    let settings = SmtpSettings::get(state.pool()).await.map_err(settings_error)?;
    Ok((StatusCode::OK, Json(settings)))
}

#[utoipa::path(
    put,
    path = "/api/v1/settings/smtp",
    request_body = SmtpSettingsUpdate,
    description = "Replaces the mail server settings; an omitted password keeps the stored one",
    responses(
        (status = 200, description = "Settings saved", body = SmtpSettings),
        (status = 400, description = "Invalid settings", body = ErrorResponse),
        (status = 403, description = "Admins only", body = ErrorResponse),
    ),
    tag = "settings",
    security(
        ("cookie" = [])
    )
)]
async fn smtp_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<SmtpSettingsUpdate>,
) -> WebResult<impl IntoResponse> {
    ctx.admin_user()?;
    let settings = SmtpSettings::save(state.pool(), payload)
        .await
        .map_err(settings_error)?;

    tracing::info!("smtp settings updated");
    Ok((StatusCode::OK, Json(settings)))
}

#[utoipa::path(
    get,
    path = "/api/v1/settings/storage",
    responses(
        (status = 200, description = "File storage settings, secret omitted", body = StorageSettings),
        (status = 403, description = "Admins only", body = ErrorResponse),
    ),
    tag = "settings",
    security(
        ("cookie" = [])
    )
)]
async fn storage_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    ctx.admin_user()?;
    let settings = StorageSettings::get(state.pool()).await.map_err(settings_error)?;
    Ok((StatusCode::OK, Json(settings)))
}

#[utoipa::path(
    put,
    path = "/api/v1/settings/storage",
    request_body = StorageSettingsUpdate,
    responses(
        (status = 200, description = "Settings saved", body = StorageSettings),
        (status = 400, description = "Invalid settings", body = ErrorResponse),
        (status = 403, description = "Admins only", body = ErrorResponse),
    ),
    tag = "settings",
    security(
        ("cookie" = [])
    )
)]
async fn storage_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<StorageSettingsUpdate>,
) -> WebResult<impl IntoResponse> {
    ctx.admin_user()?;
    let settings = StorageSettings::save(state.pool(), payload)
        .await
        .map_err(settings_error)?;

    tracing::info!(kind = %settings.kind, "storage settings updated");
    Ok((StatusCode::OK, Json(settings)))
}

#[utoipa::path(
    get,
    path = "/api/v1/settings/zoom",
    responses(
        (status = 200, description = "Meeting provider settings, client secret omitted", body = ZoomSettings),
        (status = 403, description = "Admins only", body = ErrorResponse),
    ),
    tag = "settings",
    security(
        ("cookie" = [])
    )
)]
async fn zoom_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    ctx.admin_user()?;
    let settings = ZoomSettings::get(state.pool()).await.map_err(settings_error)?;
    Ok((StatusCode::OK, Json(settings)))
}

#[utoipa::path(
    put,
    path = "/api/v1/settings/zoom",
    request_body = ZoomSettingsUpdate,
    responses(
        (status = 200, description = "Settings saved", body = ZoomSettings),
        (status = 403, description = "Admins only", body = ErrorResponse),
    ),
    tag = "settings",
    security(
        ("cookie" = [])
    )
)]
async fn zoom_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<ZoomSettingsUpdate>,
) -> WebResult<impl IntoResponse> {
    ctx.admin_user()?;
    let settings = ZoomSettings::save(state.pool(), payload)
        .await
        .map_err(settings_error)?;

    tracing::info!("zoom settings updated");
    Ok((StatusCode::OK, Json(settings)))
}

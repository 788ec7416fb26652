use axum::{Json, Router, extract::State, http::StatusCode, middleware, response::IntoResponse, routing::get};

use crate::{
    model::{
        ResourceTyped,
        entity::{CourseEnrollment, QuestionSetSubmission},
    },
    web::{
        AppState, RequestContext, WebError, WebResult, dto::progress::DashboardResponse,
        error::ErrorResponse, middlewares,
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/dashboard", get(dashboard_handler))
        .route("/enrollments", get(enrollments_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/api/v1/progress/dashboard",
    description = "Course and exam counters of the current user",
    responses(
        (status = 200, description = "Dashboard counters", body = DashboardResponse),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "progress",
    security(
        ("cookie" = [])
    )
)]
async fn dashboard_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let (counts, passed_exams) = tokio::try_join!(
        CourseEnrollment::dashboard(state.pool(), user.user_id()),
        QuestionSetSubmission::count_passed_for_user(state.pool(), user.user_id()),
    )
    .map_err(|e| WebError::resource_fetch_error(CourseEnrollment::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(DashboardResponse::new(counts, passed_exams))))
}

#[utoipa::path(
    get,
    path = "/api/v1/progress/enrollments",
    description = "Enrollments of the current user, newest first",
    responses(
        (status = 200, description = "Enrollments", body = Vec<CourseEnrollment>),
        (status = 401, description = "You're not authorized to do this", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "progress",
    security(
        ("cookie" = [])
    )
)]
async fn enrollments_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;

    let enrollments = CourseEnrollment::all_for_user(state.pool(), user.user_id())
        .await
        .map_err(|e| WebError::resource_fetch_error(CourseEnrollment::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(enrollments)))
}

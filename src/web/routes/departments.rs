use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, DatabaseError, PaginatableRepository, ResourceTyped,
        entity::{Department, DepartmentCreate},
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        error::ErrorResponse,
        middlewares,
        routes::{PaginationQuery, required},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(department_list_handler).post(department_create_handler))
        .route("/{id}", put(department_update_handler).delete(department_delete_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn department_error(e: DatabaseError) -> WebError {
    WebError::from_db(Department::get_resource_type(), e)
}

fn validate(data: &DepartmentCreate) -> WebResult<()> {
    if data.name.trim().is_empty() {
        return Err(WebError::resource_bad_request(
            Department::get_resource_type(),
            "name must not be empty",
        ));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/v1/departments/",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Page of departments", body = crate::model::Page<Department>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "organisation",
    security(
        ("cookie" = [])
    )
)]
async fn department_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let departments = Department::page(state.pool(), user, page.limit(), page.offset())
        .await
        .map_err(department_error)?;

    Ok((StatusCode::OK, Json(departments)))
}

#[utoipa::path(
    post,
    path = "/api/v1/departments/",
    request_body = DepartmentCreate,
    responses(
        (status = 200, description = "Department created", body = Department),
        (status = 400, description = "Name is empty", body = ErrorResponse),
        (status = 403, description = "You're not an admin to do this", body = ErrorResponse),
        (status = 409, description = "Department already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "organisation",
    security(
        ("cookie" = [])
    )
)]
async fn department_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<DepartmentCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.admin_user()?;
    validate(&payload)?;

    let created = Department::create(state.pool(), user, payload)
        .await
        .map_err(department_error)?;

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/departments/{id}",
    request_body = DepartmentCreate,
    params(("id" = Uuid, Path, description = "Department id")),
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 403, description = "You're not an admin to do this", body = ErrorResponse),
        (status = 404, description = "Department not found", body = ErrorResponse),
        (status = 409, description = "Name is taken", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "organisation",
    security(
        ("cookie" = [])
    )
)]
async fn department_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DepartmentCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.admin_user()?;
    validate(&payload)?;

    let found = Department::find_by_id(state.pool(), user, id)
        .await
        .map_err(department_error)?;
    let updated = required(found)?
        .update(state.pool(), user, payload)
        .await
        .map_err(department_error)?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/departments/{id}",
    params(("id" = Uuid, Path, description = "Department id")),
    responses(
        (status = 200, description = "Department deleted"),
        (status = 403, description = "You're not an admin to do this", body = ErrorResponse),
        (status = 404, description = "Department not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "organisation",
    security(
        ("cookie" = [])
    )
)]
async fn department_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.admin_user()?;

    let found = Department::find_by_id(state.pool(), user, id)
        .await
        .map_err(department_error)?;
    required(found)?
        .delete(state.pool(), user)
        .await
        .map_err(department_error)?;

    Ok(StatusCode::OK)
}

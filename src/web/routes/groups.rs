use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, DatabaseError, PaginatableRepository, ResourceTyped,
        entity::{Group, GroupCreate, GroupMember, UserEntity},
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        error::ErrorResponse,
        middlewares,
        routes::{PaginationQuery, ensure_owner, required},
    },
};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct MemberBody {
    pub user_id: Uuid,
}

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(group_list_handler).post(group_create_handler))
        .route("/{id}", delete(group_delete_handler))
        .route("/{id}/members", get(group_members_handler).post(group_member_add_handler))
        .route("/{id}/members/{user_id}", delete(group_member_remove_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn group_error(e: DatabaseError) -> WebError {
    WebError::from_db(Group::get_resource_type(), e)
}

async fn owned_group(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> WebResult<Group> {
    let found = Group::find_by_id(state.pool(), user, id)
        .await
        .map_err(group_error)?;
    let group = required(found)?;
    ensure_owner(state, user, &group).await?;
    Ok(group)
}

#[utoipa::path(
    get,
    path = "/api/v1/groups/",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Page of groups", body = crate::model::Page<Group>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "organisation",
    security(
        ("cookie" = [])
    )
)]
async fn group_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let groups = Group::page(state.pool(), user, page.limit(), page.offset())
        .await
        .map_err(group_error)?;

    Ok((StatusCode::OK, Json(groups)))
}

#[utoipa::path(
    post,
    path = "/api/v1/groups/",
    request_body = GroupCreate,
    responses(
        (status = 200, description = "Group created", body = Group),
        (status = 403, description = "Trainees may not create groups", body = ErrorResponse),
        (status = 409, description = "Group already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "organisation",
    security(
        ("cookie" = [])
    )
)]
async fn group_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<GroupCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.author()?;
    if payload.name.trim().is_empty() {
        return Err(WebError::resource_bad_request(
            Group::get_resource_type(),
            "name must not be empty",
        ));
    }

    let created = Group::create(state.pool(), user, payload)
        .await
        .map_err(group_error)?;

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/groups/{id}",
    params(("id" = Uuid, Path, description = "Group id")),
    responses(
        (status = 200, description = "Group deleted"),
        (status = 403, description = "You're not the owner", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "organisation",
    security(
        ("cookie" = [])
    )
)]
async fn group_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    owned_group(&state, user, id)
        .await?
        .delete(state.pool(), user)
        .await
        .map_err(group_error)?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/api/v1/groups/{id}/members",
    params(("id" = Uuid, Path, description = "Group id")),
    responses(
        (status = 200, description = "Members of the group", body = Vec<GroupMember>),
        (status = 403, description = "You're not the owner", body = ErrorResponse),
        (status = 404, description = "Group not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "organisation",
    security(
        ("cookie" = [])
    )
)]
async fn group_members_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let members = owned_group(&state, user, id)
        .await?
        .members(state.pool(), user)
        .await
        .map_err(group_error)?;

    Ok((StatusCode::OK, Json(members)))
}

#[utoipa::path(
    post,
    path = "/api/v1/groups/{id}/members",
    request_body = MemberBody,
    params(("id" = Uuid, Path, description = "Group id")),
    responses(
        (status = 200, description = "Member added"),
        (status = 403, description = "You're not the owner", body = ErrorResponse),
        (status = 404, description = "Group or user not found", body = ErrorResponse),
        (status = 409, description = "User is already a member", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "organisation",
    security(
        ("cookie" = [])
    )
)]
async fn group_member_add_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MemberBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let group = owned_group(&state, user, id).await?;

    let member = UserEntity::find_by_id(state.pool(), user, payload.user_id)
        .await
        .map_err(|e| WebError::from_db(UserEntity::get_resource_type(), e))?;
    let member = required(member)?;

    group
        .add_member(state.pool(), user, member.id())
        .await
        .map_err(group_error)?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    delete,
    path = "/api/v1/groups/{id}/members/{user_id}",
    params(
        ("id" = Uuid, Path, description = "Group id"),
        ("user_id" = Uuid, Path, description = "Member to remove"),
    ),
    responses(
        (status = 200, description = "Member removed"),
        (status = 403, description = "You're not the owner", body = ErrorResponse),
        (status = 404, description = "Group not found or user is not a member", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "organisation",
    security(
        ("cookie" = [])
    )
)]
async fn group_member_remove_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let removed = owned_group(&state, user, id)
        .await?
        .remove_member(state.pool(), user, user_id)
        .await
        .map_err(group_error)?;

    if !removed {
        return Err(WebError::resource_not_found(Group::get_resource_type()));
    }
    Ok(StatusCode::OK)
}

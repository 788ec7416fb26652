use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, put},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, DatabaseError, PaginatableRepository, ResourceTyped,
        entity::{Skill, SkillCreate, UserEntity, UserSkill},
    },
    web::{
        AppState, RequestContext, WebError, WebResult,
        error::ErrorResponse,
        middlewares,
        routes::{PaginationQuery, required},
    },
};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UserSkillBody {
    pub skill_id: Uuid,
    pub score: f64,
}

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(skill_list_handler).post(skill_create_handler))
        .route("/mine", get(skill_mine_handler))
        .route("/users/{user_id}", put(user_skill_upsert_handler))
        .route("/{id}", delete(skill_delete_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn skill_error(e: DatabaseError) -> WebError {
    WebError::from_db(Skill::get_resource_type(), e)
}

#[utoipa::path(
    get,
    path = "/api/v1/skills/",
    params(PaginationQuery),
    responses(
        (status = 200, description = "Page of skills", body = crate::model::Page<Skill>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "skills",
    security(
        ("cookie" = [])
    )
)]
async fn skill_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let skills = Skill::page(state.pool(), user, page.limit(), page.offset())
        .await
        .map_err(skill_error)?;

    Ok((StatusCode::OK, Json(skills)))
}

#[utoipa::path(
    post,
    path = "/api/v1/skills/",
    request_body = SkillCreate,
    responses(
        (status = 200, description = "Skill created", body = Skill),
        (status = 403, description = "You're not an admin to do this", body = ErrorResponse),
        (status = 409, description = "Skill already exists", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "skills",
    security(
        ("cookie" = [])
    )
)]
async fn skill_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<SkillCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.admin_user()?;
    if payload.name.trim().is_empty() {
        return Err(WebError::resource_bad_request(
            Skill::get_resource_type(),
            "name must not be empty",
        ));
    }

    let created = Skill::create(state.pool(), user, payload)
        .await
        .map_err(skill_error)?;

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/skills/{id}",
    params(("id" = Uuid, Path, description = "Skill id")),
    responses(
        (status = 200, description = "Skill deleted"),
        (status = 403, description = "You're not an admin to do this", body = ErrorResponse),
        (status = 404, description = "Skill not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "skills",
    security(
        ("cookie" = [])
    )
)]
async fn skill_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.admin_user()?;
    let found = Skill::find_by_id(state.pool(), user, id)
        .await
        .map_err(skill_error)?;
    required(found)?
        .delete(state.pool(), user)
        .await
        .map_err(skill_error)?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/api/v1/skills/mine",
    responses(
        (status = 200, description = "Skills of the signed-in user", body = Vec<UserSkill>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "skills",
    security(
        ("cookie" = [])
    )
)]
async fn skill_mine_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let skills = UserSkill::all_for_user(state.pool(), user.user_id())
        .await
        .map_err(skill_error)?;

    Ok((StatusCode::OK, Json(skills)))
}

#[utoipa::path(
    put,
    path = "/api/v1/skills/users/{user_id}",
    request_body = UserSkillBody,
    params(("user_id" = Uuid, Path, description = "User to grant the skill to")),
    description = "Records a skill score for a user; a lower score never replaces a higher one",
    responses(
        (status = 200, description = "Skills of the user after the change", body = Vec<UserSkill>),
        (status = 400, description = "Score outside 0..=100", body = ErrorResponse),
        (status = 403, description = "You're not an admin to do this", body = ErrorResponse),
        (status = 404, description = "User or skill not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "skills",
    security(
        ("cookie" = [])
    )
)]
async fn user_skill_upsert_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UserSkillBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.admin_user()?;
    if !(0.0..=100.0).contains(&payload.score) {
        return Err(WebError::resource_bad_request(
            Skill::get_resource_type(),
            "score must be within 0..=100",
        ));
    }

    let (target, skill) = tokio::try_join!(
        UserEntity::find_by_id(state.pool(), user, user_id),
        Skill::find_by_id(state.pool(), user, payload.skill_id),
    )
    .map_err(skill_error)?;
    let target = required(target)?;
    let skill = required(skill)?;

    UserSkill::upsert(state.pool(), target.id(), skill.id(), payload.score)
        .await
        .map_err(skill_error)?;
    let skills = UserSkill::all_for_user(state.pool(), target.id())
        .await
        .map_err(skill_error)?;

    Ok((StatusCode::OK, Json(skills)))
}

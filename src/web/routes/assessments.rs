use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, DatabaseError, PaginatableRepository, ResourceTyped,
        entity::{
            Assessment, AssessmentCreate, AssessmentStatus, EligibilityCriteria, QuestionSet,
            QuestionSetOwner, SkillsCriteria, SkillsCriteriaCreate,
        },
    },
    services::eligibility::Criterion,
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::{
            assessments::{AssessmentCreateBody, AssessmentDetailResponse, EligibilityResponse},
            question_sets::AttemptResponse,
        },
        error::ErrorResponse,
        middlewares,
        routes::{PaginationQuery, ensure_owner, question_sets, required},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(assessment_list_handler).post(assessment_create_handler))
        .route(
            "/{id}",
            get(assessment_get_handler)
                .put(assessment_update_handler)
                .delete(assessment_delete_handler),
        )
        .route("/{id}/publish", post(assessment_publish_handler))
        .route(
            "/{id}/criteria",
            get(criteria_list_handler).post(criteria_create_handler),
        )
        .route("/{id}/criteria/{criteria_id}", delete(criteria_delete_handler))
        .route(
            "/{id}/skills-criteria",
            get(skills_criteria_list_handler).post(skills_criteria_create_handler),
        )
        .route("/{id}/eligibility", get(eligibility_check_handler))
        .route("/{id}/start", post(assessment_start_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn assessment_error(e: DatabaseError) -> WebError {
    WebError::from_db(Assessment::get_resource_type(), e)
}

fn criteria_error(e: DatabaseError) -> WebError {
    WebError::from_db(EligibilityCriteria::get_resource_type(), e)
}

async fn find_assessment(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> WebResult<Assessment> {
    let found = Assessment::find_by_id(state.pool(), user, id)
        .await
        .map_err(assessment_error)?;
    required(found)
}

async fn owned_assessment(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> WebResult<Assessment> {
    let assessment = find_assessment(state, user, id).await?;
    ensure_owner(state, user, &assessment).await?;
    Ok(assessment)
}

/// Published assessments are visible to everybody, drafts to their author.
async fn visible_assessment(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> WebResult<Assessment> {
    let assessment = find_assessment(state, user, id).await?;
    if assessment.status() != AssessmentStatus::Published {
        ensure_owner(state, user, &assessment).await?;
    }
    Ok(assessment)
}

async fn question_set_of(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> WebResult<Option<QuestionSet>> {
    QuestionSet::find_by_owner(state.pool(), user, QuestionSetOwner::Assessment(id))
        .await
        .map_err(|e| WebError::from_db(QuestionSet::get_resource_type(), e))
}

#[utoipa::path(
    get,
    path = "/api/v1/assessments/",
    params(PaginationQuery),
    description = "Published assessments plus the caller's drafts",
    responses(
        (status = 200, description = "Page of assessments", body = crate::model::Page<Assessment>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "assessments",
    security(
        ("cookie" = [])
    )
)]
async fn assessment_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let assessments = Assessment::page(state.pool(), user, page.limit(), page.offset())
        .await
        .map_err(assessment_error)?;

    Ok((StatusCode::OK, Json(assessments)))
}

#[utoipa::path(
    post,
    path = "/api/v1/assessments/",
    request_body = AssessmentCreateBody,
    description = "Creates a draft assessment together with its question set",
    responses(
        (status = 200, description = "Assessment created", body = AssessmentDetailResponse),
        (status = 400, description = "Invalid dates or scoring parameters", body = ErrorResponse),
        (status = 403, description = "Trainees may not author assessments", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "assessments",
    security(
        ("cookie" = [])
    )
)]
async fn assessment_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<AssessmentCreateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.author()?;

    let (assessment, question_set) =
        Assessment::create_with_question_set(state.pool(), user, payload.assessment, &payload.question_set)
            .await
            .map_err(assessment_error)?;

    tracing::info!(assessment_id = %assessment.id(), "assessment created");
    Ok((
        StatusCode::OK,
        Json(AssessmentDetailResponse::new(assessment, Some(question_set.id()))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/assessments/{id}",
    params(("id" = Uuid, Path, description = "Assessment id")),
    responses(
        (status = 200, description = "Assessment found", body = AssessmentDetailResponse),
        (status = 403, description = "Draft of another author", body = ErrorResponse),
        (status = 404, description = "Assessment not found", body = ErrorResponse),
    ),
    tag = "assessments",
    security(
        ("cookie" = [])
    )
)]
async fn assessment_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let assessment = visible_assessment(&state, user, id).await?;
    let question_set_id = question_set_of(&state, user, id).await?.map(|set| set.id());

    Ok((
        StatusCode::OK,
        Json(AssessmentDetailResponse::new(assessment, question_set_id)),
    ))
}

#[utoipa::path(
    put,
    path = "/api/v1/assessments/{id}",
    request_body = AssessmentCreate,
    params(("id" = Uuid, Path, description = "Assessment id")),
    responses(
        (status = 200, description = "Assessment updated", body = Assessment),
        (status = 400, description = "Invalid dates", body = ErrorResponse),
        (status = 403, description = "You're not the author", body = ErrorResponse),
        (status = 404, description = "Assessment not found", body = ErrorResponse),
    ),
    tag = "assessments",
    security(
        ("cookie" = [])
    )
)]
async fn assessment_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssessmentCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let updated = owned_assessment(&state, user, id)
        .await?
        .update(state.pool(), user, payload)
        .await
        .map_err(assessment_error)?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/assessments/{id}",
    params(("id" = Uuid, Path, description = "Assessment id")),
    responses(
        (status = 200, description = "Assessment deleted"),
        (status = 403, description = "You're not the author", body = ErrorResponse),
        (status = 404, description = "Assessment not found", body = ErrorResponse),
    ),
    tag = "assessments",
    security(
        ("cookie" = [])
    )
)]
async fn assessment_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    owned_assessment(&state, user, id)
        .await?
        .delete(state.pool(), user)
        .await
        .map_err(assessment_error)?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/assessments/{id}/publish",
    params(("id" = Uuid, Path, description = "Assessment id")),
    responses(
        (status = 200, description = "Assessment published", body = Assessment),
        (status = 403, description = "You're not the author", body = ErrorResponse),
        (status = 404, description = "Assessment not found", body = ErrorResponse),
    ),
    tag = "assessments",
    security(
        ("cookie" = [])
    )
)]
async fn assessment_publish_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let published = owned_assessment(&state, user, id)
        .await?
        .set_status(state.pool(), AssessmentStatus::Published)
        .await
        .map_err(assessment_error)?;

    tracing::info!(assessment_id = %id, "assessment published");
    Ok((StatusCode::OK, Json(published)))
}

#[utoipa::path(
    get,
    path = "/api/v1/assessments/{id}/criteria",
    params(("id" = Uuid, Path, description = "Assessment id")),
    responses(
        (status = 200, description = "Eligibility criteria", body = Vec<EligibilityCriteria>),
        (status = 403, description = "You're not the author", body = ErrorResponse),
        (status = 404, description = "Assessment not found", body = ErrorResponse),
    ),
    tag = "assessments",
    security(
        ("cookie" = [])
    )
)]
async fn criteria_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    owned_assessment(&state, user, id).await?;

    let criteria = EligibilityCriteria::all_by_assessment(state.pool(), id)
        .await
        .map_err(criteria_error)?;

    Ok((StatusCode::OK, Json(criteria)))
}

#[utoipa::path(
    post,
    path = "/api/v1/assessments/{id}/criteria",
    request_body = Criterion,
    params(("id" = Uuid, Path, description = "Assessment id")),
    responses(
        (status = 200, description = "Criterion added", body = EligibilityCriteria),
        (status = 400, description = "Threshold out of range", body = ErrorResponse),
        (status = 403, description = "You're not the author", body = ErrorResponse),
        (status = 404, description = "Assessment not found", body = ErrorResponse),
    ),
    tag = "assessments",
    security(
        ("cookie" = [])
    )
)]
async fn criteria_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<Criterion>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    owned_assessment(&state, user, id).await?;

    let created = EligibilityCriteria::create(state.pool(), id, payload)
        .await
        .map_err(criteria_error)?;

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/assessments/{id}/criteria/{criteria_id}",
    params(
        ("id" = Uuid, Path, description = "Assessment id"),
        ("criteria_id" = Uuid, Path, description = "Criterion id"),
    ),
    responses(
        (status = 200, description = "Criterion removed"),
        (status = 403, description = "You're not the author", body = ErrorResponse),
        (status = 404, description = "Assessment or criterion not found", body = ErrorResponse),
    ),
    tag = "assessments",
    security(
        ("cookie" = [])
    )
)]
async fn criteria_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path((id, criteria_id)): Path<(Uuid, Uuid)>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    owned_assessment(&state, user, id).await?;

    let removed = EligibilityCriteria::delete(state.pool(), id, criteria_id)
        .await
        .map_err(criteria_error)?;
    if !removed {
        return Err(WebError::resource_not_found(EligibilityCriteria::get_resource_type()));
    }

    Ok(StatusCode::OK)
}

#[utoipa::path(
    get,
    path = "/api/v1/assessments/{id}/skills-criteria",
    params(("id" = Uuid, Path, description = "Assessment id")),
    responses(
        (status = 200, description = "Skill rules applied after submissions", body = Vec<SkillsCriteria>),
        (status = 403, description = "You're not the author", body = ErrorResponse),
        (status = 404, description = "Assessment not found", body = ErrorResponse),
    ),
    tag = "assessments",
    security(
        ("cookie" = [])
    )
)]
async fn skills_criteria_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    owned_assessment(&state, user, id).await?;

    let rules = SkillsCriteria::all_by_assessment(state.pool(), id)
        .await
        .map_err(criteria_error)?;

    Ok((StatusCode::OK, Json(rules)))
}

#[utoipa::path(
    post,
    path = "/api/v1/assessments/{id}/skills-criteria",
    request_body = SkillsCriteriaCreate,
    params(("id" = Uuid, Path, description = "Assessment id")),
    responses(
        (status = 200, description = "Skill rule added", body = SkillsCriteria),
        (status = 400, description = "Percentage out of range", body = ErrorResponse),
        (status = 403, description = "You're not the author", body = ErrorResponse),
        (status = 404, description = "Assessment not found", body = ErrorResponse),
    ),
    tag = "assessments",
    security(
        ("cookie" = [])
    )
)]
async fn skills_criteria_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SkillsCriteriaCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    owned_assessment(&state, user, id).await?;

    let created = SkillsCriteria::create(state.pool(), id, payload)
        .await
        .map_err(criteria_error)?;

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/assessments/{id}/eligibility",
    params(("id" = Uuid, Path, description = "Assessment id")),
    responses(
        (status = 200, description = "Whether the caller may take the assessment", body = EligibilityResponse),
        (status = 403, description = "Draft of another author", body = ErrorResponse),
        (status = 404, description = "Assessment not found", body = ErrorResponse),
    ),
    tag = "assessments",
    security(
        ("cookie" = [])
    )
)]
async fn eligibility_check_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    visible_assessment(&state, user, id).await?;

    let eligible = question_sets::is_eligible(&state, user, id).await?;
    Ok((StatusCode::OK, Json(EligibilityResponse { eligible })))
}

#[utoipa::path(
    post,
    path = "/api/v1/assessments/{id}/start",
    params(("id" = Uuid, Path, description = "Assessment id")),
    description = "Starts an attempt on the assessment's question set",
    responses(
        (status = 200, description = "Attempt started", body = AttemptResponse),
        (status = 403, description = "Not published, not running or not eligible", body = ErrorResponse),
        (status = 404, description = "Assessment not found", body = ErrorResponse),
        (status = 409, description = "No attempts left", body = ErrorResponse),
    ),
    tag = "assessments",
    security(
        ("cookie" = [])
    )
)]
async fn assessment_start_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    visible_assessment(&state, user, id).await?;

    let set = required(question_set_of(&state, user, id).await?)?;
    let attempt = question_sets::start_attempt(&state, user, &set).await?;

    Ok((StatusCode::OK, Json(attempt)))
}

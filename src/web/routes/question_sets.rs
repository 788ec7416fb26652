use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, DatabaseError, ResourceTyped,
        entity::{
            Assessment, AssessmentStatus, CourseEnrollment, EligibilityCriteria, Lesson, Question, QuestionCreate,
            QuestionSet, QuestionSetParams, QuestionSetSubmission, SkillsCriteria, UserSkill,
        },
    },
    services::{
        eligibility::{self, LearnerProfile},
        grading,
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::question_sets::{AttemptResponse, SubmissionResult, SubmitBody},
        error::ErrorResponse,
        middlewares,
        routes::{ensure_course_access, ensure_owner, required},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route(
            "/{id}",
            get(question_set_get_handler).put(question_set_update_handler),
        )
        .route(
            "/{id}/questions",
            get(question_list_handler).post(question_create_handler),
        )
        .route("/questions/{id}", delete(question_delete_handler))
        .route("/{id}/start", post(attempt_start_handler))
        .route("/{id}/submit", post(attempt_submit_handler))
        .route("/{id}/results", get(attempt_results_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn question_set_error(e: DatabaseError) -> WebError {
    WebError::from_db(QuestionSet::get_resource_type(), e)
}

fn question_error(e: DatabaseError) -> WebError {
    WebError::from_db(Question::get_resource_type(), e)
}

fn submission_error(e: DatabaseError) -> WebError {
    WebError::from_db(QuestionSetSubmission::get_resource_type(), e)
}

/// What a question set belongs to, resolved for the caller.
enum AttemptTarget {
    Lesson(Lesson),
    Assessment(Assessment),
}

async fn find_question_set(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> WebResult<QuestionSet> {
    let found = QuestionSet::find_by_id(state.pool(), user, id)
        .await
        .map_err(question_set_error)?;
    required(found)
}

async fn owned_question_set(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> WebResult<QuestionSet> {
    let set = find_question_set(state, user, id).await?;
    ensure_owner(state, user, &set).await?;
    Ok(set)
}

/// Lesson sets need course access, assessment sets a published assessment.
async fn resolve_target(
    state: &AppState,
    user: &AuthenticatedUser,
    set: &QuestionSet,
) -> WebResult<AttemptTarget> {
    if let Some(lesson_id) = set.lesson_id() {
        let lesson = Lesson::find_by_id(state.pool(), user, lesson_id)
            .await
            .map_err(|e| WebError::from_db(Lesson::get_resource_type(), e))?;
        let lesson = required(lesson)?;
        ensure_course_access(state, user, lesson.course_id()).await?;
        return Ok(AttemptTarget::Lesson(lesson));
    }

    let assessment_id = set
        .assessment_id()
        .ok_or_else(|| WebError::resource_not_found(Assessment::get_resource_type()))?;
    let assessment = Assessment::find_by_id(state.pool(), user, assessment_id)
        .await
        .map_err(|e| WebError::from_db(Assessment::get_resource_type(), e))?;
    let assessment = required(assessment)?;
    if assessment.status() != AssessmentStatus::Published {
        return Err(WebError::resource_forbidden(Assessment::get_resource_type()));
    }
    Ok(AttemptTarget::Assessment(assessment))
}

#[utoipa::path(
    get,
    path = "/api/v1/question-sets/{id}",
    params(("id" = Uuid, Path, description = "Question set id")),
    responses(
        (status = 200, description = "Question set found", body = QuestionSet),
        (status = 403, description = "You don't own the question set", body = ErrorResponse),
        (status = 404, description = "Question set not found", body = ErrorResponse),
    ),
    tag = "question-sets",
    security(
        ("cookie" = [])
    )
)]
async fn question_set_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let set = owned_question_set(&state, user, id).await?;
    Ok((StatusCode::OK, Json(set)))
}

#[utoipa::path(
    put,
    path = "/api/v1/question-sets/{id}",
    request_body = QuestionSetParams,
    params(("id" = Uuid, Path, description = "Question set id")),
    description = "Changes scoring and scheduling; omitted fields keep their value",
    responses(
        (status = 200, description = "Question set updated", body = QuestionSet),
        (status = 400, description = "Invalid parameters", body = ErrorResponse),
        (status = 403, description = "You don't own the question set", body = ErrorResponse),
        (status = 404, description = "Question set not found", body = ErrorResponse),
    ),
    tag = "question-sets",
    security(
        ("cookie" = [])
    )
)]
async fn question_set_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuestionSetParams>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let updated = owned_question_set(&state, user, id)
        .await?
        .update(state.pool(), user, payload)
        .await
        .map_err(question_set_error)?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    get,
    path = "/api/v1/question-sets/{id}/questions",
    params(("id" = Uuid, Path, description = "Question set id")),
    description = "Questions with their correct options, for the owner",
    responses(
        (status = 200, description = "Questions of the set", body = Vec<Question>),
        (status = 403, description = "You don't own the question set", body = ErrorResponse),
        (status = 404, description = "Question set not found", body = ErrorResponse),
    ),
    tag = "question-sets",
    security(
        ("cookie" = [])
    )
)]
async fn question_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    owned_question_set(&state, user, id).await?;

    let questions = Question::all_by_question_set(state.pool(), user, id)
        .await
        .map_err(question_error)?;

    Ok((StatusCode::OK, Json(questions)))
}

#[utoipa::path(
    post,
    path = "/api/v1/question-sets/{id}/questions",
    request_body = QuestionCreate,
    params(("id" = Uuid, Path, description = "Question set id")),
    responses(
        (status = 200, description = "Question created", body = Question),
        (status = 400, description = "Invalid options", body = ErrorResponse),
        (status = 403, description = "You don't own the question set", body = ErrorResponse),
        (status = 404, description = "Question set not found", body = ErrorResponse),
    ),
    tag = "question-sets",
    security(
        ("cookie" = [])
    )
)]
async fn question_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuestionCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    owned_question_set(&state, user, id).await?;

    let question = Question::create(state.pool(), user, id, payload)
        .await
        .map_err(question_error)?;

    Ok((StatusCode::OK, Json(question)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/question-sets/questions/{id}",
    params(("id" = Uuid, Path, description = "Question id")),
    responses(
        (status = 200, description = "Question deleted"),
        (status = 403, description = "You don't own the question", body = ErrorResponse),
        (status = 404, description = "Question not found", body = ErrorResponse),
    ),
    tag = "question-sets",
    security(
        ("cookie" = [])
    )
)]
async fn question_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let question = Question::find_by_id(state.pool(), user, id)
        .await
        .map_err(question_error)?;
    let question = required(question)?;
    ensure_owner(&state, user, &question).await?;

    question.delete(state.pool(), user).await.map_err(question_error)?;
    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/question-sets/{id}/start",
    params(("id" = Uuid, Path, description = "Question set id")),
    description = "Starts an attempt and returns the questions without their answers",
    responses(
        (status = 200, description = "Attempt started", body = AttemptResponse),
        (status = 403, description = "Outside the window, not enrolled or not eligible", body = ErrorResponse),
        (status = 404, description = "Question set not found", body = ErrorResponse),
        (status = 409, description = "No attempts left", body = ErrorResponse),
    ),
    tag = "question-sets",
    security(
        ("cookie" = [])
    )
)]
async fn attempt_start_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let set = find_question_set(&state, user, id).await?;
    let attempt = start_attempt(&state, user, &set).await?;
    Ok((StatusCode::OK, Json(attempt)))
}

/// Opens a new attempt after checking the window, eligibility and retakes.
pub(crate) async fn start_attempt(
    state: &AppState,
    user: &AuthenticatedUser,
    set: &QuestionSet,
) -> WebResult<AttemptResponse> {
    let now = Utc::now();

    if let AttemptTarget::Assessment(assessment) = resolve_target(state, user, set).await? {
        if !assessment.is_running_at(now) {
            return Err(WebError::resource_forbidden(Assessment::get_resource_type()));
        }
        if !is_eligible(state, user, assessment.id()).await? {
            tracing::debug!(assessment_id = %assessment.id(), user_id = %user.user_id(), "not eligible");
            return Err(WebError::resource_forbidden(Assessment::get_resource_type()));
        }
    }

    if !set.is_open_at(now) {
        return Err(WebError::resource_forbidden(QuestionSet::get_resource_type()));
    }

    let attempts = QuestionSetSubmission::count_attempts(state.pool(), set.id(), user.user_id())
        .await
        .map_err(submission_error)?;
    if !grading::may_attempt(attempts, set.allowed_retakes()) {
        return Err(WebError::resource_conflict(
            QuestionSetSubmission::get_resource_type(),
            "attempts",
        ));
    }

    let (submission, questions) = tokio::try_join!(
        QuestionSetSubmission::start(state.pool(), set.id(), user.user_id()),
        Question::all_by_question_set(state.pool(), user, set.id()),
    )
    .map_err(submission_error)?;

    tracing::info!(question_set_id = %set.id(), user_id = %user.user_id(), attempt = attempts + 1, "attempt started");
    Ok(AttemptResponse::new(submission, &questions))
}

/// Evaluates the assessment's eligibility criteria for the caller.
pub(crate) async fn is_eligible(
    state: &AppState,
    user: &AuthenticatedUser,
    assessment_id: Uuid,
) -> WebResult<bool> {
    let (criteria, learner) = tokio::try_join!(
        EligibilityCriteria::all_by_assessment(state.pool(), assessment_id),
        LearnerProfile::load(state.pool(), user),
    )
    .map_err(|e| WebError::from_db(EligibilityCriteria::get_resource_type(), e))?;

    let criteria: Vec<_> = criteria.into_iter().map(|c| c.criterion).collect();
    Ok(eligibility::is_eligible(&criteria, &learner))
}

#[utoipa::path(
    post,
    path = "/api/v1/question-sets/{id}/submit",
    request_body = SubmitBody,
    params(("id" = Uuid, Path, description = "Question set id")),
    description = "Grades a running attempt",
    responses(
        (status = 200, description = "Attempt graded", body = SubmissionResult),
        (status = 400, description = "Time limit exceeded", body = ErrorResponse),
        (status = 403, description = "Attempt belongs to somebody else", body = ErrorResponse),
        (status = 404, description = "Attempt not found", body = ErrorResponse),
        (status = 409, description = "Attempt was already submitted", body = ErrorResponse),
    ),
    tag = "question-sets",
    security(
        ("cookie" = [])
    )
)]
async fn attempt_submit_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let set = find_question_set(&state, user, id).await?;
    let target = resolve_target(&state, user, &set).await?;

    let submission = QuestionSetSubmission::find_by_id(state.pool(), payload.submission_id)
        .await
        .map_err(submission_error)?;
    let submission = required(submission)?;
    if submission.question_set_id() != id || submission.user_id() != user.user_id() {
        return Err(WebError::resource_forbidden(QuestionSetSubmission::get_resource_type()));
    }
    if submission.is_submitted() {
        return Err(WebError::resource_conflict(
            QuestionSetSubmission::get_resource_type(),
            "submission",
        ));
    }
    if grading::is_overdue(submission.started_at(), set.duration_minutes(), Utc::now()) {
        return Err(WebError::resource_bad_request(
            QuestionSetSubmission::get_resource_type(),
            "time limit exceeded",
        ));
    }

    let questions = Question::all_by_question_set(state.pool(), user, id)
        .await
        .map_err(question_error)?;
    let gradable: Vec<_> = questions.iter().map(Question::to_gradable).collect();
    let outcome = grading::grade(&set.scoring_rules(), &gradable, &payload.answers);

    let submission = submission
        .finish(state.pool(), &outcome)
        .await
        .map_err(submission_error)?;

    match target {
        AttemptTarget::Lesson(lesson) => {
            CourseEnrollment::record_completion(
                state.pool(),
                user.user_id(),
                lesson.course_id(),
                lesson.id(),
                Some(outcome.passed),
            )
            .await
            .map_err(|e| WebError::from_db(CourseEnrollment::get_resource_type(), e))?;
        }
        AttemptTarget::Assessment(assessment) => {
            let rules = SkillsCriteria::all_by_assessment(state.pool(), assessment.id())
                .await
                .map_err(|e| WebError::from_db(SkillsCriteria::get_resource_type(), e))?;
            for rule in rules.iter().filter(|r| r.applies_to(outcome.percentage)) {
                UserSkill::upsert(state.pool(), user.user_id(), rule.skill_id(), outcome.percentage)
                    .await
                    .map_err(|e| WebError::from_db(SkillsCriteria::get_resource_type(), e))?;
            }
        }
    }

    let answers = submission.answers(state.pool()).await.map_err(submission_error)?;

    tracing::info!(
        submission_id = %submission.id(),
        percentage = outcome.percentage,
        passed = outcome.passed,
        "attempt graded"
    );
    Ok((StatusCode::OK, Json(SubmissionResult::new(submission, answers))))
}

#[utoipa::path(
    get,
    path = "/api/v1/question-sets/{id}/results",
    params(("id" = Uuid, Path, description = "Question set id")),
    responses(
        (status = 200, description = "The caller's attempts", body = Vec<QuestionSetSubmission>),
        (status = 403, description = "No access to the question set", body = ErrorResponse),
        (status = 404, description = "Question set not found", body = ErrorResponse),
    ),
    tag = "question-sets",
    security(
        ("cookie" = [])
    )
)]
async fn attempt_results_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let set = find_question_set(&state, user, id).await?;
    resolve_target(&state, user, &set).await?;

    let results = QuestionSetSubmission::all_for_user(state.pool(), id, user.user_id())
        .await
        .map_err(submission_error)?;

    Ok((StatusCode::OK, Json(results)))
}

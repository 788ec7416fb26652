use std::collections::{HashMap, HashSet};

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
        CrudRepository, DatabaseError, ResourceTyped,
        entity::{
            AssignmentReview, AssignmentSubmission, AssignmentSubmit, CourseEnrollment, Feedback,
            FeedbackCreate, FeedbackSubmission, Lesson, LessonType, MeetingReport, QuestionSet,
            QuestionSetOwner, Section, UserEntity, WatchHistory, ZoomSettings,
        },
    },
    services::{
        lesson_status::{self, LessonStatus, Locale, StatusFlags},
        mailer,
        meeting::MeetingClient,
    },
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::lessons::{
            FeedbackSubmitBody, JoinResponse, LessonCreateBody, LessonDetailResponse, StatusQuery,
        },
        error::ErrorResponse,
        middlewares,
        routes::{ensure_course_access, ensure_owner, required},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", post(lesson_create_handler))
        .route(
            "/{id}",
            get(lesson_get_handler)
                .put(lesson_update_handler)
                .delete(lesson_delete_handler),
        )
        .route("/{id}/done", post(lesson_done_handler))
        .route("/{id}/status", get(lesson_status_handler))
        .route("/{id}/meeting", post(meeting_create_handler))
        .route("/{id}/join", post(meeting_join_handler))
        .route("/{id}/attendance", get(meeting_attendance_handler))
        .route(
            "/{id}/assignment",
            get(assignment_mine_handler).post(assignment_submit_handler),
        )
        .route("/{id}/submissions", get(assignment_list_handler))
        .route("/assignments/{id}/review", post(assignment_review_handler))
        .route(
            "/{id}/feedback",
            get(feedback_list_handler).post(feedback_create_handler),
        )
        .route("/{id}/feedback/submit", post(feedback_submit_handler))
        .route("/feedback/{id}", delete(feedback_delete_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn lesson_error(e: DatabaseError) -> WebError {
    WebError::from_db(Lesson::get_resource_type(), e)
}

fn assignment_error(e: DatabaseError) -> WebError {
    WebError::from_db(AssignmentSubmission::get_resource_type(), e)
}

fn feedback_error(e: DatabaseError) -> WebError {
    WebError::from_db(Feedback::get_resource_type(), e)
}

async fn find_lesson(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> WebResult<Lesson> {
    let found = Lesson::find_by_id(state.pool(), user, id)
        .await
        .map_err(lesson_error)?;
    required(found)
}

async fn owned_lesson(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> WebResult<Lesson> {
    let lesson = find_lesson(state, user, id).await?;
    ensure_owner(state, user, &lesson).await?;
    Ok(lesson)
}

/// Lesson the caller may study: enrolled learners, the author and admins.
async fn accessible_lesson(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> WebResult<Lesson> {
    let lesson = find_lesson(state, user, id).await?;
    ensure_course_access(state, user, lesson.course_id()).await?;
    Ok(lesson)
}

fn expect_type(lesson: &Lesson, expected: LessonType) -> WebResult<()> {
    if lesson.lesson_type() != expected {
        return Err(WebError::resource_bad_request(
            Lesson::get_resource_type(),
            format!("lesson is a {} lesson, expected {expected}", lesson.lesson_type()),
        ));
    }
    Ok(())
}

async fn record_completion(
    state: &AppState,
    user_id: Uuid,
    lesson: &Lesson,
    passed: Option<bool>,
) -> WebResult<Option<CourseEnrollment>> {
    CourseEnrollment::record_completion(state.pool(), user_id, lesson.course_id(), lesson.id(), passed)
        .await
        .map_err(|e| WebError::from_db(CourseEnrollment::get_resource_type(), e))
}

async fn owned_section(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> WebResult<Section> {
    let found = Section::find_by_id(state.pool(), user, id)
        .await
        .map_err(|e| WebError::from_db(Section::get_resource_type(), e))?;
    let section = required(found)?;
    ensure_owner(state, user, &section).await?;
    Ok(section)
}

#[utoipa::path(
    post,
    path = "/api/v1/lessons/",
    request_body = LessonCreateBody,
    description = "Creates a lesson in a section; exam lessons also get their question set",
    responses(
        (status = 200, description = "Lesson created", body = LessonDetailResponse),
        (status = 400, description = "Invalid lesson or scoring parameters", body = ErrorResponse),
        (status = 403, description = "You're not the course author", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = [])
    )
)]
async fn lesson_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<LessonCreateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    owned_section(&state, user, payload.lesson.section_id).await?;
    if payload.lesson.title.trim().is_empty() {
        return Err(WebError::resource_bad_request(
            Lesson::get_resource_type(),
            "title must not be empty",
        ));
    }

    let response = match payload.lesson.lesson_type {
        LessonType::Exam => {
            let params = payload.question_set.unwrap_or_default();
            let (lesson, question_set) = Lesson::create_exam(state.pool(), user, payload.lesson, &params)
                .await
                .map_err(lesson_error)?;
            LessonDetailResponse::new(lesson, Some(question_set.id()))
        }
        _ => {
            let lesson = Lesson::create(state.pool(), user, payload.lesson)
                .await
                .map_err(lesson_error)?;
            LessonDetailResponse::new(lesson, None)
        }
    };
    CourseEnrollment::refresh_course(state.pool(), response.course_id())
        .await
        .map_err(lesson_error)?;

    Ok((StatusCode::OK, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/v1/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "Lesson found", body = LessonDetailResponse),
        (status = 403, description = "You're not enrolled", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = [])
    )
)]
async fn lesson_get_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = accessible_lesson(&state, user, id).await?;

    let question_set_id = match lesson.lesson_type() {
        LessonType::Exam => QuestionSet::find_by_owner(state.pool(), user, QuestionSetOwner::Lesson(id))
            .await
            .map_err(|e| WebError::from_db(QuestionSet::get_resource_type(), e))?
            .map(|set| set.id()),
        _ => None,
    };

    Ok((StatusCode::OK, Json(LessonDetailResponse::new(lesson, question_set_id))))
}

#[utoipa::path(
    put,
    path = "/api/v1/lessons/{id}",
    request_body = LessonCreateBody,
    params(("id" = Uuid, Path, description = "Lesson id")),
    description = "Updates a lesson; the lesson type cannot change and the section must stay in the same course",
    responses(
        (status = 200, description = "Lesson updated", body = Lesson),
        (status = 400, description = "Section belongs to another course", body = ErrorResponse),
        (status = 403, description = "You're not the course author", body = ErrorResponse),
        (status = 404, description = "Lesson or section not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = [])
    )
)]
async fn lesson_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LessonCreateBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = owned_lesson(&state, user, id).await?;
    let section = owned_section(&state, user, payload.lesson.section_id).await?;

    if section.course_id() != lesson.course_id() {
        return Err(WebError::resource_bad_request(
            Lesson::get_resource_type(),
            "section belongs to another course",
        ));
    }

    let updated = lesson
        .update(state.pool(), user, payload.lesson)
        .await
        .map_err(lesson_error)?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/lessons/{id}",
    params(("id" = Uuid, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "Lesson deleted"),
        (status = 403, description = "You're not the course author", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = [])
    )
)]
async fn lesson_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = owned_lesson(&state, user, id).await?;
    let course_id = lesson.course_id();
    lesson.delete(state.pool(), user).await.map_err(lesson_error)?;
    CourseEnrollment::refresh_course(state.pool(), course_id)
        .await
        .map_err(lesson_error)?;

    Ok(StatusCode::OK)
}

#[utoipa::path(
    post,
    path = "/api/v1/lessons/{id}/done",
    params(("id" = Uuid, Path, description = "Lesson id")),
    description = "Marks a video, document or live class lesson completed",
    responses(
        (status = 200, description = "Completion recorded, returns the refreshed enrollment", body = CourseEnrollment),
        (status = 400, description = "Lesson type is completed another way", body = ErrorResponse),
        (status = 403, description = "You're not enrolled", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = [])
    )
)]
async fn lesson_done_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = accessible_lesson(&state, user, id).await?;

    if !lesson.lesson_type().is_self_paced() {
        return Err(WebError::resource_bad_request(
            Lesson::get_resource_type(),
            format!("{} lessons cannot be marked done", lesson.lesson_type()),
        ));
    }

    let enrollment = record_completion(&state, user.user_id(), &lesson, None).await?;
    Ok((StatusCode::OK, Json(enrollment)))
}

#[utoipa::path(
    get,
    path = "/api/v1/lessons/{id}/status",
    params(("id" = Uuid, Path, description = "Lesson id"), StatusQuery),
    description = "Localized status labels and badges of the lesson for the caller",
    responses(
        (status = 200, description = "Lesson status", body = LessonStatus),
        (status = 403, description = "You're not enrolled", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = [])
    )
)]
async fn lesson_status_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<StatusQuery>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = accessible_lesson(&state, user, id).await?;
    let lesson_type = lesson.lesson_type();

    let history = WatchHistory::find(state.pool(), user.user_id(), id)
        .await
        .map_err(lesson_error)?;
    let assignment = match lesson_type {
        LessonType::Assignment => AssignmentSubmission::find_for_user(state.pool(), id, user.user_id())
            .await
            .map_err(assignment_error)?,
        _ => None,
    };

    let flags = StatusFlags {
        passed: match lesson_type {
            LessonType::Exam => history.as_ref().map(|h| h.is_passed()),
            LessonType::Assignment => assignment.as_ref().and_then(|a| a.is_passed()),
            _ => None,
        },
        reviewed: assignment.as_ref().map(|a| a.is_reviewed()),
        completed: history.as_ref().map(|h| h.is_completed()),
    };

    let locale = query
        .locale
        .as_deref()
        .unwrap_or(state.config().app().default_locale());
    let status = lesson_status::derive(lesson_type, Locale::from_tag(locale), flags);

    Ok((StatusCode::OK, Json(status)))
}

// Live classes

#[utoipa::path(
    post,
    path = "/api/v1/lessons/{id}/meeting",
    params(("id" = Uuid, Path, description = "Lesson id")),
    description = "Schedules the live class at the meeting provider",
    responses(
        (status = 200, description = "Meeting created", body = Lesson),
        (status = 400, description = "Not a live class", body = ErrorResponse),
        (status = 403, description = "You're not the course author", body = ErrorResponse),
        (status = 409, description = "Meeting provider is not configured", body = ErrorResponse),
        (status = 502, description = "Meeting provider failed", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = [])
    )
)]
async fn meeting_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = owned_lesson(&state, user, id).await?;
    expect_type(&lesson, LessonType::LiveClass)?;

    let settings = ZoomSettings::get(state.pool())
        .await
        .map_err(|e| WebError::from_db(ZoomSettings::get_resource_type(), e))?;
    let client = MeetingClient::new(settings).map_err(WebError::server_meeting_error)?;

    let duration_minutes = i64::from(lesson.duration_seconds()) / 60;
    let meeting = client
        .create_meeting(lesson.title(), lesson.start_date(), duration_minutes)
        .await
        .map_err(WebError::server_meeting_error)?;

    let lesson = lesson
        .set_meeting(state.pool(), user, meeting.meeting_id, meeting.join_url)
        .await
        .map_err(lesson_error)?;

    Ok((StatusCode::OK, Json(lesson)))
}

#[utoipa::path(
    post,
    path = "/api/v1/lessons/{id}/join",
    params(("id" = Uuid, Path, description = "Lesson id")),
    description = "Records attendance, marks the live class done and returns the join url",
    responses(
        (status = 200, description = "Join url", body = JoinResponse),
        (status = 400, description = "Not a live class", body = ErrorResponse),
        (status = 403, description = "You're not enrolled", body = ErrorResponse),
        (status = 409, description = "No meeting scheduled yet", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = [])
    )
)]
async fn meeting_join_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = accessible_lesson(&state, user, id).await?;
    expect_type(&lesson, LessonType::LiveClass)?;

    let join_url = lesson
        .join_url()
        .map(String::from)
        .ok_or_else(|| WebError::resource_conflict(Lesson::get_resource_type(), "meeting"))?;

    MeetingReport::record(state.pool(), id, user.user_id())
        .await
        .map_err(|e| WebError::from_db(MeetingReport::get_resource_type(), e))?;
    record_completion(&state, user.user_id(), &lesson, None).await?;

    Ok((StatusCode::OK, Json(JoinResponse { join_url })))
}

#[utoipa::path(
    get,
    path = "/api/v1/lessons/{id}/attendance",
    params(("id" = Uuid, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "Join records of the live class", body = Vec<MeetingReport>),
        (status = 403, description = "You're not the course author", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = [])
    )
)]
async fn meeting_attendance_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = owned_lesson(&state, user, id).await?;

    let reports = MeetingReport::all_by_lesson(state.pool(), lesson.id())
        .await
        .map_err(|e| WebError::from_db(MeetingReport::get_resource_type(), e))?;

    Ok((StatusCode::OK, Json(reports)))
}

// Assignments

#[utoipa::path(
    post,
    path = "/api/v1/lessons/{id}/assignment",
    request_body = AssignmentSubmit,
    params(("id" = Uuid, Path, description = "Lesson id")),
    description = "Submits or replaces the caller's answer until it is reviewed",
    responses(
        (status = 200, description = "Answer stored", body = AssignmentSubmission),
        (status = 400, description = "Empty answer or not an assignment", body = ErrorResponse),
        (status = 403, description = "You're not enrolled", body = ErrorResponse),
        (status = 409, description = "Submission was already reviewed", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = [])
    )
)]
async fn assignment_submit_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignmentSubmit>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = accessible_lesson(&state, user, id).await?;
    expect_type(&lesson, LessonType::Assignment)?;

    let submission = AssignmentSubmission::submit(state.pool(), id, user.user_id(), payload)
        .await
        .map_err(assignment_error)?;

    Ok((StatusCode::OK, Json(submission)))
}

#[utoipa::path(
    get,
    path = "/api/v1/lessons/{id}/assignment",
    params(("id" = Uuid, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "The caller's submission", body = AssignmentSubmission),
        (status = 403, description = "You're not enrolled", body = ErrorResponse),
        (status = 404, description = "Nothing submitted yet", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = [])
    )
)]
async fn assignment_mine_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    accessible_lesson(&state, user, id).await?;

    let submission = AssignmentSubmission::find_for_user(state.pool(), id, user.user_id())
        .await
        .map_err(assignment_error)?;

    Ok((StatusCode::OK, Json(required(submission)?)))
}

#[utoipa::path(
    get,
    path = "/api/v1/lessons/{id}/submissions",
    params(("id" = Uuid, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "All submissions of the assignment", body = Vec<AssignmentSubmission>),
        (status = 403, description = "You're not the course author", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = [])
    )
)]
async fn assignment_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = owned_lesson(&state, user, id).await?;

    let submissions = AssignmentSubmission::all_by_lesson(state.pool(), lesson.id())
        .await
        .map_err(assignment_error)?;

    Ok((StatusCode::OK, Json(submissions)))
}

#[utoipa::path(
    post,
    path = "/api/v1/lessons/assignments/{id}/review",
    request_body = AssignmentReview,
    params(("id" = Uuid, Path, description = "Assignment submission id")),
    description = "Reviews a submission, completes the lesson for the learner and notifies them by mail",
    responses(
        (status = 200, description = "Review stored", body = AssignmentSubmission),
        (status = 400, description = "Negative mark", body = ErrorResponse),
        (status = 403, description = "You're not the course author", body = ErrorResponse),
        (status = 404, description = "Submission not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = [])
    )
)]
async fn assignment_review_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignmentReview>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let submission = AssignmentSubmission::find_by_id(state.pool(), id)
        .await
        .map_err(assignment_error)?;
    let submission = required(submission)?;
    let lesson = owned_lesson(&state, user, submission.lesson_id()).await?;

    let passed = payload.is_passed;
    let reviewed = submission
        .record_review(state.pool(), user.user_id(), payload)
        .await
        .map_err(assignment_error)?;
    record_completion(&state, reviewed.user_id(), &lesson, Some(passed)).await?;

    let learner = UserEntity::find_by_id(state.pool(), user, reviewed.user_id())
        .await
        .map_err(|e| WebError::from_db(UserEntity::get_resource_type(), e))?;
    if let Some(email) = learner.as_ref().and_then(|l| l.email()) {
        let mail = mailer::assignment_reviewed(
            email.to_string(),
            lesson.title(),
            passed,
            reviewed.review().unwrap_or_default(),
        );
        mailer::notify(state.pool().clone(), mail);
    }

    tracing::info!(submission_id = %id, passed, "assignment reviewed");
    Ok((StatusCode::OK, Json(reviewed)))
}

// Feedback

#[utoipa::path(
    get,
    path = "/api/v1/lessons/{id}/feedback",
    params(("id" = Uuid, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "Feedback questions of the lesson", body = Vec<Feedback>),
        (status = 403, description = "You're not enrolled", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = [])
    )
)]
async fn feedback_list_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    accessible_lesson(&state, user, id).await?;

    let questions = Feedback::all_by_lesson(state.pool(), id)
        .await
        .map_err(feedback_error)?;

    Ok((StatusCode::OK, Json(questions)))
}

#[utoipa::path(
    post,
    path = "/api/v1/lessons/{id}/feedback",
    request_body = FeedbackCreate,
    params(("id" = Uuid, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "Feedback question created", body = Feedback),
        (status = 400, description = "Empty question or not a feedback lesson", body = ErrorResponse),
        (status = 403, description = "You're not the course author", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = [])
    )
)]
async fn feedback_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FeedbackCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = owned_lesson(&state, user, id).await?;
    expect_type(&lesson, LessonType::Feedback)?;

    let created = Feedback::create(state.pool(), id, payload)
        .await
        .map_err(feedback_error)?;

    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    post,
    path = "/api/v1/lessons/{id}/feedback/submit",
    request_body = FeedbackSubmitBody,
    params(("id" = Uuid, Path, description = "Lesson id")),
    description = "Answers every feedback question of the lesson and completes it",
    responses(
        (status = 200, description = "Answers stored", body = Vec<FeedbackSubmission>),
        (status = 400, description = "Missing, unknown or invalid answers", body = ErrorResponse),
        (status = 403, description = "You're not enrolled", body = ErrorResponse),
        (status = 404, description = "Lesson not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = [])
    )
)]
async fn feedback_submit_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FeedbackSubmitBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let lesson = accessible_lesson(&state, user, id).await?;
    expect_type(&lesson, LessonType::Feedback)?;

    let questions: HashMap<Uuid, Feedback> = Feedback::all_by_lesson(state.pool(), id)
        .await
        .map_err(feedback_error)?
        .into_iter()
        .map(|f| (f.id(), f))
        .collect();

    let mut answered = HashSet::new();
    for answer in &payload.answers {
        if !answered.insert(answer.feedback_id) {
            return Err(WebError::resource_bad_request(
                Feedback::get_resource_type(),
                format!("feedback {} is answered more than once", answer.feedback_id),
            ));
        }
        let question = questions.get(&answer.feedback_id).ok_or_else(|| {
            WebError::resource_bad_request(
                Feedback::get_resource_type(),
                format!("feedback {} does not belong to this lesson", answer.feedback_id),
            )
        })?;
        question.check_answer(answer).map_err(feedback_error)?;
    }
    if answered.len() < questions.len() {
        return Err(WebError::resource_bad_request(
            Feedback::get_resource_type(),
            "every feedback question must be answered",
        ));
    }

    let stored = FeedbackSubmission::submit_all(state.pool(), user.user_id(), &payload.answers)
        .await
        .map_err(feedback_error)?;
    record_completion(&state, user.user_id(), &lesson, None).await?;

    Ok((StatusCode::OK, Json(stored)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/lessons/feedback/{id}",
    params(("id" = Uuid, Path, description = "Feedback question id")),
    responses(
        (status = 200, description = "Feedback question deleted"),
        (status = 403, description = "You're not the course author", body = ErrorResponse),
        (status = 404, description = "Feedback question not found", body = ErrorResponse),
    ),
    tag = "lessons",
    security(
        ("cookie" = [])
    )
)]
async fn feedback_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let feedback = Feedback::find_by_id(state.pool(), id)
        .await
        .map_err(feedback_error)?;
    let feedback = required(feedback)?;
    owned_lesson(&state, user, feedback.lesson_id()).await?;

    feedback.delete(state.pool()).await.map_err(feedback_error)?;
    Ok(StatusCode::OK)
}

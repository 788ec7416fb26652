use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    model::{
        CrudRepository, DatabaseError, PaginatableRepository, ResourceTyped,
        entity::{
            Course, CourseCreate, CourseEnrollment, CourseStatus, EnrollmentWithUserRow,
            LessonWithProgressRow, Section, SectionCreate, UserEntity,
        },
    },
    services::{mailer, progress},
    web::{
        AppState, AuthenticatedUser, RequestContext, WebError, WebResult,
        dto::courses::{CourseDetailResponse, LessonOutline, SectionBody},
        error::ErrorResponse,
        middlewares,
        routes::{PaginationQuery, ensure_owner, required},
    },
};

pub fn routes<S>(state: AppState) -> Router<S> {
    Router::new()
        .route("/", get(course_list_handler).post(course_create_handler))
        .route(
            "/{id}",
            get(course_detail_handler)
                .put(course_update_handler)
                .delete(course_delete_handler),
        )
        .route("/{id}/publish", post(course_publish_handler))
        .route("/{id}/archive", post(course_archive_handler))
        .route("/{id}/sections", post(section_create_handler))
        .route(
            "/sections/{id}",
            put(section_update_handler).delete(section_delete_handler),
        )
        .route("/{id}/enroll", post(course_enroll_handler))
        .route("/{id}/enrollments", get(course_enrollments_handler))
        .route("/{id}/certificates/{user_id}", post(certificate_issue_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            middlewares::extract_context_fn,
        ))
        .with_state(state)
}

fn course_error(e: DatabaseError) -> WebError {
    WebError::from_db(Course::get_resource_type(), e)
}

fn section_error(e: DatabaseError) -> WebError {
    WebError::from_db(Section::get_resource_type(), e)
}

fn enrollment_error(e: DatabaseError) -> WebError {
    WebError::from_db(CourseEnrollment::get_resource_type(), e)
}

async fn find_course(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> WebResult<Course> {
    let found = Course::find_by_id(state.pool(), user, id)
        .await
        .map_err(course_error)?;
    required(found)
}

async fn owned_course(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> WebResult<Course> {
    let course = find_course(state, user, id).await?;
    ensure_owner(state, user, &course).await?;
    Ok(course)
}

fn validate(data: &CourseCreate) -> WebResult<()> {
    if data.title.trim().is_empty() {
        return Err(WebError::resource_bad_request(
            Course::get_resource_type(),
            "title must not be empty",
        ));
    }
    Ok(())
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/",
    params(PaginationQuery),
    description = "Courses visible to the caller: published ones, own drafts, everything for admins",
    responses(
        (status = 200, description = "Page of courses", body = crate::model::Page<Course>),
        (status = 401, description = "You're not authorized", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = [])
    )
)]
async fn course_list_handler(
    ctx: RequestContext,
    Query(page): Query<PaginationQuery>,
    State(state): State<AppState>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let courses = Course::page(state.pool(), user, page.limit(), page.offset())
        .await
        .map_err(course_error)?;

    Ok((StatusCode::OK, Json(courses)))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/",
    request_body = CourseCreate,
    responses(
        (status = 200, description = "Course created as draft", body = Course),
        (status = 400, description = "Title is empty", body = ErrorResponse),
        (status = 403, description = "Trainees may not author courses", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = [])
    )
)]
async fn course_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(payload): Json<CourseCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.author()?;
    validate(&payload)?;

    let created = Course::create(state.pool(), user, payload)
        .await
        .map_err(course_error)?;

    tracing::info!(course_id = %created.id(), "course created");
    Ok((StatusCode::OK, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    description = "Course with its sections and lessons; lessons carry the caller's completion",
    responses(
        (status = 200, description = "Course found", body = CourseDetailResponse),
        (status = 403, description = "Course is not open to you", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = [])
    )
)]
async fn course_detail_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = find_course(&state, user, id).await?;

    if !course.is_managed_by(user) {
        let (enrolled, open) = tokio::try_join!(
            CourseEnrollment::is_enrolled(state.pool(), id, user.user_id()),
            course.is_open_for(state.pool(), user),
        )
        .map_err(course_error)?;
        if !enrolled && !open {
            return Err(WebError::resource_forbidden(Course::get_resource_type()));
        }
    }

    let (sections, rows) = tokio::try_join!(
        Section::all_by_course(state.pool(), user, id),
        LessonWithProgressRow::all_by_course(state.pool(), user, id),
    )
    .map_err(course_error)?;

    let lessons = rows
        .into_iter()
        .filter_map(|row| {
            let section_id = row.section_id;
            match LessonOutline::try_from(row) {
                Ok(outline) => Some((section_id, outline)),
                Err(reason) => {
                    tracing::warn!(course_id = %id, "skipping lesson: {reason}");
                    None
                }
            }
        })
        .collect();

    Ok((StatusCode::OK, Json(CourseDetailResponse::new(course, sections, lessons))))
}

#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}",
    request_body = CourseCreate,
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course updated", body = Course),
        (status = 403, description = "You're not the author", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = [])
    )
)]
async fn course_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CourseCreate>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    validate(&payload)?;

    let updated = owned_course(&state, user, id)
        .await?
        .update(state.pool(), user, payload)
        .await
        .map_err(course_error)?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course deleted"),
        (status = 403, description = "You're not the author", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = [])
    )
)]
async fn course_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    owned_course(&state, user, id)
        .await?
        .delete(state.pool(), user)
        .await
        .map_err(course_error)?;

    Ok(StatusCode::OK)
}

async fn change_status(
    ctx: RequestContext,
    state: AppState,
    id: Uuid,
    status: CourseStatus,
) -> WebResult<Course> {
    let user = ctx.user()?;
    let course = owned_course(&state, user, id)
        .await?
        .set_status(state.pool(), user, status)
        .await
        .map_err(course_error)?;

    tracing::info!(course_id = %id, %status, "course status changed");
    Ok(course)
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/publish",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course published", body = Course),
        (status = 403, description = "You're not the author", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = [])
    )
)]
async fn course_publish_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let course = change_status(ctx, state, id, CourseStatus::Published).await?;
    Ok((StatusCode::OK, Json(course)))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/archive",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Course archived", body = Course),
        (status = 403, description = "You're not the author", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = [])
    )
)]
async fn course_archive_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let course = change_status(ctx, state, id, CourseStatus::Archived).await?;
    Ok((StatusCode::OK, Json(course)))
}

// Sections

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/sections",
    request_body = SectionBody,
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Section created", body = Section),
        (status = 400, description = "Title is empty", body = ErrorResponse),
        (status = 403, description = "You're not the author", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = [])
    )
)]
async fn section_create_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SectionBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = owned_course(&state, user, id).await?;
    if payload.title.trim().is_empty() {
        return Err(WebError::resource_bad_request(
            Section::get_resource_type(),
            "title must not be empty",
        ));
    }

    let data = SectionCreate {
        course_id: course.id(),
        title: payload.title.trim().to_string(),
        order_index: payload.order_index,
    };
    let created = Section::create(state.pool(), user, data)
        .await
        .map_err(section_error)?;

    Ok((StatusCode::OK, Json(created)))
}

async fn owned_section(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> WebResult<Section> {
    let found = Section::find_by_id(state.pool(), user, id)
        .await
        .map_err(section_error)?;
    let section = required(found)?;
    ensure_owner(state, user, &section).await?;
    Ok(section)
}

#[utoipa::path(
    put,
    path = "/api/v1/courses/sections/{id}",
    request_body = SectionBody,
    params(("id" = Uuid, Path, description = "Section id")),
    responses(
        (status = 200, description = "Section updated", body = Section),
        (status = 403, description = "You're not the author", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = [])
    )
)]
async fn section_update_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SectionBody>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let section = owned_section(&state, user, id).await?;

    let data = SectionCreate {
        course_id: section.course_id(),
        title: payload.title.trim().to_string(),
        order_index: payload.order_index,
    };
    let updated = section
        .update(state.pool(), user, data)
        .await
        .map_err(section_error)?;

    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/courses/sections/{id}",
    params(("id" = Uuid, Path, description = "Section id")),
    responses(
        (status = 200, description = "Section and its lessons deleted"),
        (status = 403, description = "You're not the author", body = ErrorResponse),
        (status = 404, description = "Section not found", body = ErrorResponse),
    ),
    tag = "courses",
    security(
        ("cookie" = [])
    )
)]
async fn section_delete_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let section = owned_section(&state, user, id).await?;
    let course_id = section.course_id();
    section.delete(state.pool(), user).await.map_err(section_error)?;
    CourseEnrollment::refresh_course(state.pool(), course_id)
        .await
        .map_err(enrollment_error)?;

    Ok(StatusCode::OK)
}

// Enrollment

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/enroll",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Enrolled", body = CourseEnrollment),
        (status = 400, description = "Authors cannot enroll in their own course", body = ErrorResponse),
        (status = 403, description = "Course is not published or not open to you", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
        (status = 409, description = "Already enrolled", body = ErrorResponse),
    ),
    tag = "progress",
    security(
        ("cookie" = [])
    )
)]
async fn course_enroll_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = find_course(&state, user, id).await?;

    if course.author_id() == user.user_id() {
        return Err(WebError::resource_bad_request(
            CourseEnrollment::get_resource_type(),
            "authors cannot enroll in their own course",
        ));
    }
    let open = course
        .is_open_for(state.pool(), user)
        .await
        .map_err(course_error)?;
    if !open {
        return Err(WebError::resource_forbidden(Course::get_resource_type()));
    }

    let enrollment = CourseEnrollment::enroll(state.pool(), id, user.user_id())
        .await
        .map_err(enrollment_error)?;

    tracing::info!(course_id = %id, user_id = %user.user_id(), "enrolled");
    Ok((StatusCode::OK, Json(enrollment)))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}/enrollments",
    params(("id" = Uuid, Path, description = "Course id")),
    responses(
        (status = 200, description = "Learners of the course", body = Vec<EnrollmentWithUserRow>),
        (status = 403, description = "You're not the author", body = ErrorResponse),
        (status = 404, description = "Course not found", body = ErrorResponse),
    ),
    tag = "progress",
    security(
        ("cookie" = [])
    )
)]
async fn course_enrollments_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = owned_course(&state, user, id).await?;
    let enrollments = CourseEnrollment::all_by_course(state.pool(), course.id())
        .await
        .map_err(enrollment_error)?;

    Ok((StatusCode::OK, Json(enrollments)))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses/{id}/certificates/{user_id}",
    params(
        ("id" = Uuid, Path, description = "Course id"),
        ("user_id" = Uuid, Path, description = "Learner to certify"),
    ),
    description = "Issues the course certificate; issuing twice returns the first certificate",
    responses(
        (status = 200, description = "Certificate issued", body = CourseEnrollment),
        (status = 400, description = "Course not completed or certificates disabled", body = ErrorResponse),
        (status = 403, description = "You're not the author", body = ErrorResponse),
        (status = 404, description = "Course or enrollment not found", body = ErrorResponse),
    ),
    tag = "progress",
    security(
        ("cookie" = [])
    )
)]
async fn certificate_issue_handler(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> WebResult<impl IntoResponse> {
    let user = ctx.user()?;
    let course = owned_course(&state, user, id).await?;

    let enrollment = CourseEnrollment::refresh_progress(state.pool(), id, user_id)
        .await
        .map_err(enrollment_error)?;
    let enrollment = required(enrollment)?;

    if enrollment.certificate_number().is_some() {
        return Ok((StatusCode::OK, Json(enrollment)));
    }
    if !progress::certificate_allowed(course.certificate_enabled(), enrollment.percentage()) {
        return Err(WebError::resource_bad_request(
            CourseEnrollment::get_resource_type(),
            "course is not completed or certificates are disabled",
        ));
    }

    let number = progress::certificate_number(enrollment.id(), Utc::now());
    let enrollment = enrollment
        .issue_certificate(state.pool(), number)
        .await
        .map_err(enrollment_error)?;

    let learner = UserEntity::find_by_id(state.pool(), user, user_id)
        .await
        .map_err(|e| WebError::from_db(UserEntity::get_resource_type(), e))?;
    if let (Some(email), Some(number)) = (
        learner.as_ref().and_then(|l| l.email()),
        enrollment.certificate_number(),
    ) {
        let mail = mailer::certificate_issued(email.to_string(), course.title(), number);
        mailer::notify(state.pool().clone(), mail);
    }

    tracing::info!(course_id = %id, %user_id, "certificate issued");
    Ok((StatusCode::OK, Json(enrollment)))
}

use axum::Router;
use serde::Deserialize;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, services::ServeDir};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::model::entity::{Course, CourseEnrollment};
use crate::model::{CrudRepository, HasOwner, ResourceTyped, check_access};
use crate::web::{AppState, AuthenticatedUser, WebError, WebResult, doc::ApiDoc};

pub mod account;
pub mod assessments;
pub mod courses;
pub mod departments;
pub mod groups;
pub mod lessons;
pub mod progress;
pub mod question_sets;
pub mod settings;
pub mod skills;

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema, utoipa::IntoParams)]
pub struct PaginationQuery {
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

fn default_limit() -> i64 {
    20
}

impl PaginationQuery {
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, 100)
    }

    pub fn offset(&self) -> i64 {
        self.offset.max(0)
    }
}

pub fn build_app<S: Send + Sync + Clone + 'static>(state: AppState) -> Router<S> {
    let config = state.config();
    let mut router = Router::new()
        .nest("/api/v1/account/", account::routes(state.clone()))
        .nest("/api/v1/departments/", departments::routes(state.clone()))
        .nest("/api/v1/groups/", groups::routes(state.clone()))
        .nest("/api/v1/skills/", skills::routes(state.clone()))
        .nest("/api/v1/courses/", courses::routes(state.clone()))
        .nest("/api/v1/lessons/", lessons::routes(state.clone()))
        .nest("/api/v1/question-sets/", question_sets::routes(state.clone()))
        .nest("/api/v1/assessments/", assessments::routes(state.clone()))
        .nest("/api/v1/progress/", progress::routes(state.clone()))
        .nest("/api/v1/settings/", settings::routes(state.clone()))
        .nest_service("/api/v1/static/", ServeDir::new(config.app().uploads_dir()))
        .layer(CookieManagerLayer::default())
        .layer(CorsLayer::very_permissive())
        .with_state(state);

    if config.app().docs() {
        let openapi = ApiDoc::openapi();

        router = router.merge(SwaggerUi::new("/api/v1/docs").url("/api-doc/openapi.json", openapi));
    }

    router
}

/// Unwraps a lookup result or answers 404 for the resource type.
pub(crate) fn required<T: ResourceTyped>(found: Option<T>) -> WebResult<T> {
    found.ok_or_else(|| WebError::resource_not_found(T::get_resource_type()))
}

/// Admins pass, everybody else must own `resource`.
pub(crate) async fn ensure_owner<T>(
    state: &AppState,
    user: &AuthenticatedUser,
    resource: &T,
) -> WebResult<()>
where
    T: HasOwner<OwnerId = Uuid> + ResourceTyped + Sync,
{
    check_access(state.pool(), user, resource, user.user_id())
        .await
        .map_err(|e| WebError::from_db(T::get_resource_type(), e))
}

/// Course content is open to its author, admins and enrolled learners.
pub(crate) async fn ensure_course_access(
    state: &AppState,
    user: &AuthenticatedUser,
    course_id: Uuid,
) -> WebResult<Course> {
    let course = Course::find_by_id(state.pool(), user, course_id)
        .await
        .map_err(|e| WebError::from_db(Course::get_resource_type(), e))?;
    let course = required(course)?;

    if course.is_managed_by(user) {
        return Ok(course);
    }

    let enrolled = CourseEnrollment::is_enrolled(state.pool(), course_id, user.user_id())
        .await
        .map_err(|e| WebError::from_db(CourseEnrollment::get_resource_type(), e))?;
    if enrolled {
        Ok(course)
    } else {
        Err(WebError::resource_forbidden(Course::get_resource_type()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        let query: PaginationQuery = serde_json::from_str(r#"{"limit": 1000, "offset": -5}"#).unwrap();
        assert_eq!(query.limit(), 100);
        assert_eq!(query.offset(), 0);

        let query: PaginationQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.limit(), 20);
    }
}

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::web::middlewares::AUTH_TOKEN;
use crate::web::routes::{
    account, assessments, courses, departments, groups, lessons, progress, question_sets, settings,
    skills,
};

pub struct CookieAuthModifier;

impl Modify for CookieAuthModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(schema) = openapi.components.as_mut() {
            schema.add_security_scheme(
                "cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    AUTH_TOKEN,
                    "JWT token for current user",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        account::user_signup_handler,
        account::user_signin_handler,
        account::user_signout_handler,
        account::user_verify_handler,
        account::user_me_handler,
        account::user_list_handler,
        account::user_update_handler,
        account::user_role_handler,
        account::user_delete_handler,
        departments::department_list_handler,
        departments::department_create_handler,
        departments::department_update_handler,
        departments::department_delete_handler,
        groups::group_list_handler,
        groups::group_create_handler,
        groups::group_delete_handler,
        groups::group_members_handler,
        groups::group_member_add_handler,
        groups::group_member_remove_handler,
        skills::skill_list_handler,
        skills::skill_create_handler,
        skills::skill_delete_handler,
        skills::skill_mine_handler,
        skills::user_skill_upsert_handler,
        courses::course_list_handler,
        courses::course_create_handler,
        courses::course_detail_handler,
        courses::course_update_handler,
        courses::course_delete_handler,
        courses::course_publish_handler,
        courses::course_archive_handler,
        courses::section_create_handler,
        courses::section_update_handler,
        courses::section_delete_handler,
        courses::course_enroll_handler,
        courses::course_enrollments_handler,
        courses::certificate_issue_handler,
        lessons::lesson_create_handler,
        lessons::lesson_get_handler,
        lessons::lesson_update_handler,
        lessons::lesson_delete_handler,
        lessons::lesson_done_handler,
        lessons::lesson_status_handler,
        lessons::meeting_create_handler,
        lessons::meeting_join_handler,
        lessons::meeting_attendance_handler,
        lessons::assignment_submit_handler,
        lessons::assignment_mine_handler,
        lessons::assignment_list_handler,
        lessons::assignment_review_handler,
        lessons::feedback_list_handler,
        lessons::feedback_create_handler,
        lessons::feedback_submit_handler,
        lessons::feedback_delete_handler,
        question_sets::question_set_get_handler,
        question_sets::question_set_update_handler,
        question_sets::question_list_handler,
        question_sets::question_create_handler,
        question_sets::question_delete_handler,
        question_sets::attempt_start_handler,
        question_sets::attempt_submit_handler,
        question_sets::attempt_results_handler,
        assessments::assessment_list_handler,
        assessments::assessment_create_handler,
        assessments::assessment_get_handler,
        assessments::assessment_update_handler,
        assessments::assessment_delete_handler,
        assessments::assessment_publish_handler,
        assessments::criteria_list_handler,
        assessments::criteria_create_handler,
        assessments::criteria_delete_handler,
        assessments::skills_criteria_list_handler,
        assessments::skills_criteria_create_handler,
        assessments::eligibility_check_handler,
        assessments::assessment_start_handler,
        progress::dashboard_handler,
        progress::enrollments_handler,
        settings::smtp_get_handler,
        settings::smtp_update_handler,
        settings::storage_get_handler,
        settings::storage_update_handler,
        settings::zoom_get_handler,
        settings::zoom_update_handler,
    ),
    tags(
        (name = "account", description = "Sign up, sign in and user administration"),
        (name = "departments", description = "Organisation departments"),
        (name = "groups", description = "Trainee groups"),
        (name = "skills", description = "Skill catalogue and user skills"),
        (name = "courses", description = "Courses, sections, enrollments and certificates"),
        (name = "lessons", description = "Lessons, live classes, assignments and feedback"),
        (name = "question-sets", description = "Questions and graded attempts"),
        (name = "assessments", description = "Standalone assessments and eligibility"),
        (name = "progress", description = "Learner dashboard"),
        (name = "settings", description = "Integration settings"),
    ),
    modifiers(&CookieAuthModifier),
)]
pub struct ApiDoc;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn document_lists_routes_and_cookie_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/account/signup"));
        assert!(doc.paths.paths.contains_key("/api/v1/question-sets/{id}/submit"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("cookie"));
    }
}

mod common;
use reqwest::StatusCode;
use serde_json::json;

use crate::common::{
    Action, Flow, course_post_action, id_of, setup_server, setup_test_db, signin_action,
    signin_admin_action, signup_action, trainer_and_learner,
};

fn group_action(name: &'static str, method: &'static str, suffix: &'static str) -> Action {
    Action::new(name, method, "dynamic")
        .with_dyn_path(move |ctx| format!("/api/v1/groups/{}{suffix}", id_of(ctx, "group")))
}

fn department_action(name: &'static str, method: &'static str) -> Action {
    Action::new(name, method, "dynamic")
        .with_dyn_path(|ctx| format!("/api/v1/departments/{}", id_of(ctx, "department")))
}

#[tokio::test]
async fn route_department_admin_only_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .step(signup_action("clerk", "secret").with_save_cookies(false))
        .step(signin_admin_action())
        .step(
            Action::new("department_create", "POST", "/api/v1/departments/")
                .with_body(json!({ "name": "Logistics" }))
                .assert_body(|body| assert!(body.contains("\"is_active\":true")))
                .with_save_as("department"),
        )
        .step(
            Action::new("department_duplicate", "POST", "/api/v1/departments/")
                .with_body(json!({ "name": "Logistics" }))
                .with_expect(StatusCode::CONFLICT),
        )
        .step(
            Action::new("department_blank", "POST", "/api/v1/departments/")
                .with_body(json!({ "name": "  " }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(signin_action("clerk", "secret"))
        .step(
            Action::new("department_create_trainee", "POST", "/api/v1/departments/")
                .with_body(json!({ "name": "Sales" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            department_action("department_update_trainee", "PUT")
                .with_body(json!({ "name": "Renamed" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(department_action("department_delete_trainee", "DELETE").with_expect(StatusCode::FORBIDDEN))
        // anyone signed in may read the list
        .step(
            Action::new("department_list", "GET", "/api/v1/departments/")
                .assert_body(|body| assert!(body.contains("Logistics"))),
        )
        .step(signin_admin_action())
        .step(
            department_action("department_update", "PUT")
                .with_body(json!({ "name": "Warehouse", "is_active": false }))
                .assert_body(|body| {
                    assert!(body.contains("Warehouse"));
                    assert!(body.contains("\"is_active\":false"));
                }),
        )
        .step(department_action("department_delete", "DELETE"))
        .step(department_action("department_delete_again", "DELETE").with_expect(StatusCode::NOT_FOUND))
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_group_membership_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .then(trainer_and_learner)
        .step(signup_action("visitor", "secret").with_save_cookies(false))
        .step(signin_action("learner", "secret"))
        .step(
            Action::new("group_create_trainee", "POST", "/api/v1/groups/")
                .with_body(json!({ "name": "Night shift" }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(signin_action("trainer", "secret"))
        .step(
            Action::new("group_create", "POST", "/api/v1/groups/")
                .with_body(json!({ "name": "Night shift" }))
                .with_save_as("group"),
        )
        .step(
            Action::new("group_duplicate", "POST", "/api/v1/groups/")
                .with_body(json!({ "name": "Night shift" }))
                .with_expect(StatusCode::CONFLICT),
        )
        // restricted to the group
        .step(
            Action::new("course_create", "POST", "/api/v1/courses/")
                .with_dyn_body(|ctx| json!({ "title": "Night safety", "group_id": id_of(ctx, "group") }))
                .with_save_as("course"),
        )
        .step(course_post_action("course_publish", "publish"))
        .step(signin_action("learner", "secret"))
        .step(
            Action::new("course_list_outsider", "GET", "/api/v1/courses/")
                .assert_body(|body| assert!(!body.contains("Night safety"))),
        )
        .step(course_post_action("enroll_outsider", "enroll").with_expect(StatusCode::FORBIDDEN))
        .step(signin_action("trainer", "secret"))
        .step(
            group_action("member_add", "POST", "/members")
                .with_dyn_body(|ctx| json!({ "user_id": id_of(ctx, "learner") })),
        )
        .step(
            group_action("member_add_twice", "POST", "/members")
                .with_dyn_body(|ctx| json!({ "user_id": id_of(ctx, "learner") }))
                .with_expect(StatusCode::CONFLICT),
        )
        .step(
            group_action("members", "GET", "/members")
                .assert_body(|body| assert!(body.contains("learner"))),
        )
        // members are listed to the owner only
        .step(signin_action("visitor", "secret"))
        .step(group_action("members_by_visitor", "GET", "/members").with_expect(StatusCode::FORBIDDEN))
        .step(signin_action("learner", "secret"))
        .step(
            Action::new("course_list_member", "GET", "/api/v1/courses/")
                .assert_body(|body| assert!(body.contains("Night safety"))),
        )
        .step(course_post_action("enroll_member", "enroll"))
        .step(signin_action("trainer", "secret"))
        .step(
            Action::new("member_remove", "DELETE", "dynamic").with_dyn_path(|ctx| {
                format!("/api/v1/groups/{}/members/{}", id_of(ctx, "group"), id_of(ctx, "learner"))
            }),
        )
        .step(
            Action::new("member_remove_again", "DELETE", "dynamic")
                .with_dyn_path(|ctx| {
                    format!("/api/v1/groups/{}/members/{}", id_of(ctx, "group"), id_of(ctx, "learner"))
                })
                .with_expect(StatusCode::NOT_FOUND),
        )
        .step(
            group_action("members_after_remove", "GET", "/members")
                .assert_body(|body| assert!(!body.contains("learner"))),
        )
        .run(&mut server, pool)
        .await;
}

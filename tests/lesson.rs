mod common;
use reqwest::StatusCode;
use serde_json::json;

use crate::common::{
    Action, Flow, course_create_action, course_post_action, id_of, lesson_action,
    lesson_create_action, section_create_action, setup_server, setup_test_db, signin_action,
    trainer_and_learner,
};

/// Published course with an assignment, a feedback and a live class lesson;
/// `learner` is enrolled and signed in afterwards.
fn published_course(flow: Flow) -> Flow {
    flow.then(trainer_and_learner)
        .step(signin_action("trainer", "secret"))
        .step(course_create_action(json!({ "title": "Customer care" })))
        .step(section_create_action("Practice"))
        .step(lesson_create_action("Write a complaint reply", "assignment", "assignment"))
        .step(lesson_create_action("Course survey", "feedback", "feedback"))
        .step(lesson_create_action("Weekly call", "live", "live_class"))
        .step(course_post_action("course_publish", "publish"))
        .step(signin_action("learner", "secret"))
        .step(course_post_action("enroll", "enroll"))
}

#[tokio::test]
async fn route_assignment_review_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    published_course(Flow::new())
        // assignments are not marked done by hand
        .step(
            lesson_action("done_assignment", "POST", "assignment", "/done")
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            lesson_action("submit_empty", "POST", "assignment", "/assignment")
                .with_body(json!({ "answer": "   " }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            lesson_action("submit", "POST", "assignment", "/assignment")
                .with_body(json!({ "answer": "Dear customer, ..." })),
        )
        // resubmission replaces the answer before review
        .step(
            lesson_action("resubmit", "POST", "assignment", "/assignment")
                .with_body(json!({ "answer": "Dear customer, thank you" }))
                .with_save_as("submission"),
        )
        .step(
            lesson_action("status_pending", "GET", "assignment", "/status")
                .assert_body(|body| assert!(body.contains("PendingReview"))),
        )
        .step(
            Action::new("review_as_learner", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/assignments/{}/review", id_of(ctx, "submission")))
                .with_body(json!({ "mark": 10.0, "is_passed": true }))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(signin_action("trainer", "secret"))
        .step(
            lesson_action("submissions", "GET", "assignment", "/submissions")
                .assert_body(|body| assert!(body.contains("thank you"))),
        )
        .step(
            Action::new("review", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/lessons/assignments/{}/review", id_of(ctx, "submission")))
                .with_body(json!({ "mark": 8.5, "review": "Polite and clear", "is_passed": true }))
                .assert_body(|body| assert!(body.contains("Polite and clear"))),
        )
        .step(signin_action("learner", "secret"))
        .step(
            lesson_action("submit_after_review", "POST", "assignment", "/assignment")
                .with_body(json!({ "answer": "one more try" }))
                .with_expect(StatusCode::CONFLICT),
        )
        .step(
            lesson_action("status_reviewed", "GET", "assignment", "/status")
                .assert_body(|body| {
                    assert!(body.contains("Reviewed"));
                    assert!(body.contains("Passed"));
                }),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_feedback_submit_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    published_course(Flow::new())
        .step(signin_action("trainer", "secret"))
        .step(
            lesson_action("feedback_rating", "POST", "feedback", "/feedback")
                .with_body(json!({ "question": "How useful was it?", "feedback_type": "rating" }))
                .with_save_as("rating"),
        )
        .step(
            lesson_action("feedback_text", "POST", "feedback", "/feedback")
                .with_body(json!({ "question": "What should change?", "feedback_type": "subjective" }))
                .with_save_as("text"),
        )
        // feedback questions only live on feedback lessons
        .step(
            lesson_action("feedback_wrong_lesson", "POST", "assignment", "/feedback")
                .with_body(json!({ "question": "Misplaced", "feedback_type": "rating" }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(signin_action("learner", "secret"))
        .step(
            lesson_action("feedback_list", "GET", "feedback", "/feedback")
                .assert_body(|body| assert!(body.contains("How useful was it?"))),
        )
        .step(
            lesson_action("feedback_bad_rating", "POST", "feedback", "/feedback/submit")
                .with_dyn_body(|ctx| {
                    json!({
                        "answers": [
                            { "feedback_id": id_of(ctx, "rating"), "rating": 7 },
                            { "feedback_id": id_of(ctx, "text"), "answer": "More examples" },
                        ],
                    })
                })
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            lesson_action("feedback_incomplete", "POST", "feedback", "/feedback/submit")
                .with_dyn_body(|ctx| json!({ "answers": [{ "feedback_id": id_of(ctx, "rating"), "rating": 4 }] }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        // answering one question twice does not cover the other one
        .step(
            lesson_action("feedback_duplicate", "POST", "feedback", "/feedback/submit")
                .with_dyn_body(|ctx| {
                    json!({
                        "answers": [
                            { "feedback_id": id_of(ctx, "rating"), "rating": 4 },
                            { "feedback_id": id_of(ctx, "rating"), "rating": 5 },
                        ]
                    })
                })
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            lesson_action("feedback_submit", "POST", "feedback", "/feedback/submit")
                .with_dyn_body(|ctx| {
                    json!({
                        "answers": [
                            { "feedback_id": id_of(ctx, "rating"), "rating": 4 },
                            { "feedback_id": id_of(ctx, "text"), "answer": "More examples" },
                        ],
                    })
                })
                .assert_body(|body| assert!(body.contains("More examples"))),
        )
        .step(
            lesson_action("feedback_status", "GET", "feedback", "/status")
                .assert_body(|body| assert!(body.contains("Completed"))),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_live_class_without_provider_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    published_course(Flow::new())
        // nothing scheduled yet
        .step(
            lesson_action("join_unscheduled", "POST", "live", "/join")
                .with_expect(StatusCode::CONFLICT),
        )
        .step(
            lesson_action("meeting_as_learner", "POST", "live", "/meeting")
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(signin_action("trainer", "secret"))
        // zoom credentials were never stored
        .step(
            lesson_action("meeting_unconfigured", "POST", "live", "/meeting")
                .with_expect(StatusCode::CONFLICT),
        )
        .step(
            lesson_action("meeting_on_assignment", "POST", "assignment", "/meeting")
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            lesson_action("attendance", "GET", "live", "/attendance")
                .assert_body(|body| assert_eq!(body, "[]")),
        )
        .run(&mut server, pool)
        .await;
}

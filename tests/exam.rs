mod common;
use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::common::{
    Action, Flow, FlowContext, course_create_action, course_post_action, id_of, lesson_action,
    section_create_action, setup_server, setup_test_db, signin_action, trainer_and_learner,
};

fn question_set_id(ctx: &FlowContext) -> String {
    ctx.get("lesson")["question_set_id"]
        .as_str()
        .expect("exam lesson without question set")
        .to_string()
}

fn option_ids(question: &Value, correct: bool) -> Vec<Value> {
    question["options"]
        .as_array()
        .expect("question without options")
        .iter()
        .filter(|o| o["is_correct"] == correct)
        .map(|o| o["id"].clone())
        .collect()
}

fn submission_id(ctx: &FlowContext, attempt: &str) -> Value {
    ctx.get(attempt)["submission"]["id"].clone()
}

/// POST/GET on `/question-sets/{set}/<suffix>` of the saved exam lesson.
fn question_set_action(name: &'static str, method: &'static str, suffix: &'static str) -> Action {
    Action::new(name, method, "dynamic")
        .with_dyn_path(move |ctx| format!("/api/v1/question-sets/{}/{suffix}", question_set_id(ctx)))
}

/// Submits the saved `attempt` answering `q1` with its correct or wrong options.
fn submit_q1_action(name: &'static str, attempt: &'static str, correct: bool) -> Action {
    question_set_action(name, "POST", "submit").with_dyn_body(move |ctx| {
        json!({
            "submission_id": submission_id(ctx, attempt),
            "answers": [
                {
                    "question_id": id_of(ctx, "q1"),
                    "selected_option_ids": option_ids(ctx.get("q1"), correct),
                },
            ],
        })
    })
}

#[tokio::test]
async fn route_exam_attempts_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .then(trainer_and_learner)
        .step(signin_action("trainer", "secret"))
        .step(course_create_action(json!({ "title": "Arithmetic" })))
        .step(section_create_action("Final"))
        // scoring parameters are validated with the lesson
        .step(
            Action::new("exam_invalid", "POST", "/api/v1/lessons/")
                .with_dyn_body(|ctx| {
                    json!({
                        "section_id": id_of(ctx, "section"),
                        "title": "Broken exam",
                        "lesson_type": "exam",
                        "question_set": { "pass_percentage": 150.0 },
                    })
                })
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("exam_create", "POST", "/api/v1/lessons/")
                .with_dyn_body(|ctx| {
                    json!({
                        "section_id": id_of(ctx, "section"),
                        "title": "Final exam",
                        "lesson_type": "exam",
                        "question_set": {
                            "marks_per_question": 1.0,
                            "negative_marking": 0.5,
                            "pass_percentage": 50.0,
                            "allowed_retakes": 1,
                            "duration_minutes": 30,
                        },
                    })
                })
                .with_save_as("lesson"),
        )
        // a single choice question needs exactly one correct option
        .step(
            question_set_action("question_invalid", "POST", "questions")
                .with_body(json!({
                    "text": "2 + 2?",
                    "question_type": "single_choice",
                    "options": [
                        { "option_text": "4", "is_correct": true },
                        { "option_text": "four", "is_correct": true },
                    ],
                }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            question_set_action("question_single", "POST", "questions")
                .with_body(json!({
                    "text": "2 + 2?",
                    "question_type": "single_choice",
                    "order_index": 0,
                    "options": [
                        { "option_text": "4", "is_correct": true },
                        { "option_text": "5" },
                    ],
                }))
                .with_save_as("q1"),
        )
        .step(
            question_set_action("question_multiple", "POST", "questions")
                .with_body(json!({
                    "text": "Even numbers?",
                    "question_type": "multiple_choice",
                    "order_index": 1,
                    "options": [
                        { "option_text": "2", "is_correct": true },
                        { "option_text": "4", "is_correct": true },
                        { "option_text": "5" },
                    ],
                }))
                .with_save_as("q2"),
        )
        .step(course_post_action("course_publish", "publish"))
        .step(signin_action("learner", "secret"))
        .step(question_set_action("start_unenrolled", "POST", "start").with_expect(StatusCode::FORBIDDEN))
        .step(course_post_action("enroll", "enroll"))
        // the answer key stays with the author
        .step(
            question_set_action("questions_as_learner", "GET", "questions")
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            question_set_action("start_first", "POST", "start")
                .assert_body(|body| {
                    assert!(body.contains("Even numbers?"));
                    assert!(!body.contains("is_correct"));
                })
                .with_save_as("attempt1"),
        )
        // wrong single choice, nothing for the second question
        .step(
            submit_q1_action("submit_first", "attempt1", false)
                .assert_body(|body| {
                    assert!(body.contains("\"passed\":false"));
                    assert!(body.contains("\"obtained_marks\":0.0"));
                    assert!(body.contains("\"negative_marks\":0.5"));
                }),
        )
        .step(
            question_set_action("submit_first_again", "POST", "submit")
                .with_dyn_body(|ctx| json!({ "submission_id": submission_id(ctx, "attempt1") }))
                .with_expect(StatusCode::CONFLICT),
        )
        .step(
            lesson_action("status_failed", "GET", "lesson", "/status")
                .assert_body(|body| assert!(body.contains("Failed"))),
        )
        .step(question_set_action("start_retake", "POST", "start").with_save_as("attempt2"))
        .step(
            question_set_action("submit_retake", "POST", "submit")
                .with_dyn_body(|ctx| {
                    json!({
                        "submission_id": submission_id(ctx, "attempt2"),
                        "answers": [
                            {
                                "question_id": id_of(ctx, "q1"),
                                "selected_option_ids": option_ids(ctx.get("q1"), true),
                            },
                            {
                                "question_id": id_of(ctx, "q2"),
                                "selected_option_ids": option_ids(ctx.get("q2"), true),
                            },
                        ],
                    })
                })
                .assert_body(|body| {
                    assert!(body.contains("\"passed\":true"));
                    assert!(body.contains("\"percentage\":100.0"));
                }),
        )
        // one retake allowed, two attempts used
        .step(question_set_action("start_exhausted", "POST", "start").with_expect(StatusCode::CONFLICT))
        .step(
            lesson_action("status_passed", "GET", "lesson", "/status")
                .assert_body(|body| assert!(body.contains("Passed"))),
        )
        .step(
            question_set_action("results", "GET", "results")
                .assert_body(|body| {
                    let results: Value = serde_json::from_str(body).expect("Invalid JSON format");
                    assert_eq!(results.as_array().map(Vec::len), Some(2));
                }),
        )
        .step(
            Action::new("dashboard", "GET", "/api/v1/progress/dashboard")
                .assert_body(|body| assert!(body.contains("\"passed_exams\":1"))),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_exam_best_attempt_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    Flow::new()
        .then(trainer_and_learner)
        .step(signin_action("trainer", "secret"))
        .step(course_create_action(json!({ "title": "Geography" })))
        .step(section_create_action("Capitals"))
        .step(
            Action::new("exam_create", "POST", "/api/v1/lessons/")
                .with_dyn_body(|ctx| {
                    json!({
                        "section_id": id_of(ctx, "section"),
                        "title": "Capitals quiz",
                        "lesson_type": "exam",
                        "question_set": { "pass_percentage": 100.0, "allowed_retakes": 1 },
                    })
                })
                .with_save_as("lesson"),
        )
        .step(
            question_set_action("question_single", "POST", "questions")
                .with_body(json!({
                    "text": "Capital of Peru?",
                    "question_type": "single_choice",
                    "options": [
                        { "option_text": "Lima", "is_correct": true },
                        { "option_text": "Cusco" },
                    ],
                }))
                .with_save_as("q1"),
        )
        .step(course_post_action("course_publish", "publish"))
        .step(signin_action("learner", "secret"))
        .step(course_post_action("enroll", "enroll"))
        .step(question_set_action("start_first", "POST", "start").with_save_as("attempt1"))
        .step(
            submit_q1_action("submit_pass", "attempt1", true)
                .assert_body(|body| assert!(body.contains("\"passed\":true"))),
        )
        .step(question_set_action("start_retake", "POST", "start").with_save_as("attempt2"))
        .step(
            submit_q1_action("submit_fail", "attempt2", false)
                .assert_body(|body| assert!(body.contains("\"passed\":false"))),
        )
        // a failed retake keeps the earlier pass
        .step(
            lesson_action("status_after_retake", "GET", "lesson", "/status")
                .assert_body(|body| assert!(body.contains("Passed"))),
        )
        .step(
            Action::new("dashboard", "GET", "/api/v1/progress/dashboard")
                .assert_body(|body| assert!(body.contains("\"passed_exams\":1"))),
        )
        .run(&mut server, pool)
        .await;
}

mod common;
use chrono::{Duration, Utc};
use reqwest::StatusCode;
use serde_json::{Value, json};

use crate::common::{
    Action, Flow, FlowContext, course_create_action, course_post_action, id_of, lesson_action,
    lesson_create_action, section_create_action, setup_server, setup_test_db, signin_action,
    trainer_and_learner,
};

fn question_set_id(ctx: &FlowContext) -> String {
    ctx.get("assessment")["question_set_id"]
        .as_str()
        .expect("assessment without question set")
        .to_string()
}

fn correct_option(ctx: &FlowContext) -> Value {
    ctx.get("question")["options"]
        .as_array()
        .and_then(|options| options.iter().find(|o| o["is_correct"] == true))
        .map(|o| o["id"].clone())
        .expect("question without correct option")
}

fn assessment_path(ctx: &FlowContext, suffix: &str) -> String {
    format!("/api/v1/assessments/{}{}", id_of(ctx, "assessment"), suffix)
}

#[tokio::test]
async fn route_assessment_eligibility_and_skills_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    let now = Utc::now();
    let window = json!({
        "title": "Quarterly knowledge check",
        "start_date": now - Duration::hours(1),
        "end_date": now + Duration::hours(1),
        "question_set": { "pass_percentage": 60.0 },
    });

    Flow::new()
        .then(trainer_and_learner)
        .step(
            Action::new("skill_create", "POST", "/api/v1/skills/")
                .with_body(json!({ "name": "Product knowledge" }))
                .with_save_as("skill"),
        )
        .step(signin_action("trainer", "secret"))
        .step(
            Action::new("assessment_invalid", "POST", "/api/v1/assessments/")
                .with_body(json!({
                    "title": "Backwards",
                    "start_date": now,
                    "end_date": now - Duration::hours(1),
                }))
                .with_expect(StatusCode::BAD_REQUEST),
        )
        .step(
            Action::new("assessment_create", "POST", "/api/v1/assessments/")
                .with_body(window)
                .assert_body(|body| assert!(body.contains("draft")))
                .with_save_as("assessment"),
        )
        .step(
            Action::new("question_create", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/question-sets/{}/questions", question_set_id(ctx)))
                .with_body(json!({
                    "text": "Which plan includes support?",
                    "question_type": "single_choice",
                    "options": [
                        { "option_text": "Premium", "is_correct": true },
                        { "option_text": "Basic" },
                    ],
                }))
                .with_save_as("question"),
        )
        .step(signin_action("learner", "secret"))
        .step(
            Action::new("draft_hidden", "GET", "dynamic")
                .with_dyn_path(|ctx| assessment_path(ctx, ""))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(signin_action("trainer", "secret"))
        .step(
            Action::new("publish", "POST", "dynamic")
                .with_dyn_path(|ctx| assessment_path(ctx, "/publish"))
                .assert_body(|body| assert!(body.contains("published"))),
        )
        .step(
            Action::new("criteria_trainers", "POST", "dynamic")
                .with_dyn_path(|ctx| assessment_path(ctx, "/criteria"))
                .with_body(json!({ "criteria_type": "role", "role": "trainer" }))
                .with_save_as("criterion"),
        )
        .step(
            Action::new("skills_criteria", "POST", "dynamic")
                .with_dyn_path(|ctx| assessment_path(ctx, "/skills-criteria"))
                .with_dyn_body(|ctx| {
                    json!({
                        "skill_id": id_of(ctx, "skill"),
                        "rule": "greater_than",
                        "percentage": 50.0,
                    })
                }),
        )
        .step(signin_action("learner", "secret"))
        .step(
            Action::new("criteria_as_learner", "GET", "dynamic")
                .with_dyn_path(|ctx| assessment_path(ctx, "/criteria"))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .step(
            Action::new("not_eligible", "GET", "dynamic")
                .with_dyn_path(|ctx| assessment_path(ctx, "/eligibility"))
                .assert_body(|body| assert!(body.contains("\"eligible\":false"))),
        )
        .step(
            Action::new("start_not_eligible", "POST", "dynamic")
                .with_dyn_path(|ctx| assessment_path(ctx, "/start"))
                .with_expect(StatusCode::FORBIDDEN),
        )
        // a second role criterion widens the audience
        .step(signin_action("trainer", "secret"))
        .step(
            Action::new("criteria_trainees", "POST", "dynamic")
                .with_dyn_path(|ctx| assessment_path(ctx, "/criteria"))
                .with_body(json!({ "criteria_type": "role", "role": "trainee" })),
        )
        .step(
            Action::new("criteria_list", "GET", "dynamic")
                .with_dyn_path(|ctx| assessment_path(ctx, "/criteria"))
                .assert_body(|body| {
                    let criteria: Value = serde_json::from_str(body).expect("Invalid JSON format");
                    assert_eq!(criteria.as_array().map(Vec::len), Some(2));
                }),
        )
        .step(signin_action("learner", "secret"))
        .step(
            Action::new("eligible", "GET", "dynamic")
                .with_dyn_path(|ctx| assessment_path(ctx, "/eligibility"))
                .assert_body(|body| assert!(body.contains("\"eligible\":true"))),
        )
        .step(
            Action::new("start", "POST", "dynamic")
                .with_dyn_path(|ctx| assessment_path(ctx, "/start"))
                .with_save_as("attempt"),
        )
        .step(
            Action::new("submit", "POST", "dynamic")
                .with_dyn_path(|ctx| format!("/api/v1/question-sets/{}/submit", question_set_id(ctx)))
                .with_dyn_body(|ctx| {
                    json!({
                        "submission_id": ctx.get("attempt")["submission"]["id"].clone(),
                        "answers": [{
                            "question_id": id_of(ctx, "question"),
                            "selected_option_ids": [correct_option(ctx)],
                        }],
                    })
                })
                .assert_body(|body| assert!(body.contains("\"passed\":true"))),
        )
        .step(
            Action::new("skills_mine", "GET", "/api/v1/skills/mine").assert_body(|body| {
                assert!(body.contains("Product knowledge"));
                assert!(body.contains("\"score\":100.0"));
            }),
        )
        // no retakes configured
        .step(
            Action::new("start_again", "POST", "dynamic")
                .with_dyn_path(|ctx| assessment_path(ctx, "/start"))
                .with_expect(StatusCode::CONFLICT),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_assessment_window_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    let later = Utc::now() + Duration::days(7);

    Flow::new()
        .then(trainer_and_learner)
        .step(signin_action("trainer", "secret"))
        .step(
            Action::new("assessment_create", "POST", "/api/v1/assessments/")
                .with_body(json!({
                    "title": "Next week",
                    "start_date": later,
                    "end_date": later + Duration::hours(2),
                }))
                .with_save_as("assessment"),
        )
        .step(
            Action::new("publish", "POST", "dynamic")
                .with_dyn_path(|ctx| assessment_path(ctx, "/publish")),
        )
        .step(signin_action("learner", "secret"))
        .step(
            Action::new("list", "GET", "/api/v1/assessments/")
                .assert_body(|body| assert!(body.contains("Next week"))),
        )
        .step(
            Action::new("start_too_early", "POST", "dynamic")
                .with_dyn_path(|ctx| assessment_path(ctx, "/start"))
                .with_expect(StatusCode::FORBIDDEN),
        )
        .run(&mut server, pool)
        .await;
}

#[tokio::test]
async fn route_training_criterion_follows_completion_test() {
    let pool = setup_test_db().await;
    let mut server = setup_server(&pool).await;

    let now = Utc::now();
    let window = json!({
        "title": "Induction follow-up",
        "start_date": now - Duration::hours(1),
        "end_date": now + Duration::hours(1),
    });

    Flow::new()
        .then(trainer_and_learner)
        .step(signin_action("trainer", "secret"))
        .step(course_create_action(json!({ "title": "Induction" })))
        .step(section_create_action("Welcome"))
        .step(lesson_create_action("House rules", "lesson", "document"))
        .step(course_post_action("course_publish", "publish"))
        .step(
            Action::new("assessment_create", "POST", "/api/v1/assessments/")
                .with_body(window)
                .with_save_as("assessment"),
        )
        .step(Action::new("publish", "POST", "dynamic").with_dyn_path(|ctx| assessment_path(ctx, "/publish")))
        .step(
            Action::new("criteria_training", "POST", "dynamic")
                .with_dyn_path(|ctx| assessment_path(ctx, "/criteria"))
                .with_dyn_body(|ctx| json!({ "criteria_type": "training", "course_id": id_of(ctx, "course") })),
        )
        .step(signin_action("learner", "secret"))
        .step(course_post_action("enroll", "enroll"))
        .step(
            Action::new("eligible_before", "GET", "dynamic")
                .with_dyn_path(|ctx| assessment_path(ctx, "/eligibility"))
                .assert_body(|body| assert!(body.contains("\"eligible\":false"))),
        )
        .step(lesson_action("lesson_done", "POST", "lesson", "/done"))
        .step(
            Action::new("eligible_after", "GET", "dynamic")
                .with_dyn_path(|ctx| assessment_path(ctx, "/eligibility"))
                .assert_body(|body| assert!(body.contains("\"eligible\":true"))),
        )
        .run(&mut server, pool)
        .await;
}

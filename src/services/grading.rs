//! Quiz scoring with negative marking.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringRules {
    pub marks_per_question: f64,
    pub negative_marking: f64,
    pub pass_percentage: f64,
}

/// The correct answer of one question.
#[derive(Debug, Clone)]
pub struct GradableQuestion {
    pub question_id: Uuid,
    pub correct_option_ids: HashSet<Uuid>,
}

/// Options a learner picked for one question.
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AnswerSelection {
    pub question_id: Uuid,
    #[serde(default)]
    pub selected_option_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradedAnswer {
    pub question_id: Uuid,
    pub selected_option_ids: Vec<Uuid>,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradeOutcome {
    pub total_marks: f64,
    pub obtained_marks: f64,
    pub negative_marks: f64,
    pub percentage: f64,
    pub passed: bool,
    pub answers: Vec<GradedAnswer>,
}

/// Grades `selections` against `questions`.
///
/// An exact match of the selected and correct option sets earns
/// `marks_per_question`, a non-empty wrong selection costs `negative_marking`
/// and an unanswered question earns nothing. Selections for questions outside
/// the set are ignored. Obtained marks never drop below zero.
pub fn grade(
    rules: &ScoringRules,
    questions: &[GradableQuestion],
    selections: &[AnswerSelection],
) -> GradeOutcome {
    let by_question: HashMap<Uuid, &AnswerSelection> =
        selections.iter().map(|s| (s.question_id, s)).collect();

    let mut earned = 0.0;
    let mut negative_marks = 0.0;
    let mut answers = Vec::with_capacity(questions.len());

    for question in questions {
        let selected: HashSet<Uuid> = by_question
            .get(&question.question_id)
            .map(|s| s.selected_option_ids.iter().copied().collect())
            .unwrap_or_default();

        let is_correct = !selected.is_empty() && selected == question.correct_option_ids;
        if is_correct {
            earned += rules.marks_per_question;
        } else if !selected.is_empty() {
            negative_marks += rules.negative_marking;
        }

        let mut selected_option_ids: Vec<Uuid> = selected.into_iter().collect();
        selected_option_ids.sort();
        answers.push(GradedAnswer {
            question_id: question.question_id,
            selected_option_ids,
            is_correct,
        });
    }

    let total_marks = questions.len() as f64 * rules.marks_per_question;
    let obtained_marks = (earned - negative_marks).max(0.0);
    let percentage = if total_marks > 0.0 {
        obtained_marks / total_marks * 100.0
    } else {
        0.0
    };

    GradeOutcome {
        total_marks,
        obtained_marks,
        negative_marks,
        percentage,
        passed: percentage >= rules.pass_percentage,
        answers,
    }
}

/// Whether an attempt started at `started_at` is past its time limit.
pub fn is_overdue(started_at: DateTime<Utc>, duration_minutes: i32, now: DateTime<Utc>) -> bool {
    now > started_at + Duration::minutes(i64::from(duration_minutes))
}

/// Whether one more attempt fits into `allowed_retakes`.
pub fn may_attempt(attempts_so_far: i64, allowed_retakes: i32) -> bool {
    attempts_so_far < i64::from(allowed_retakes) + 1
}

#[cfg(test)]
mod test {
    use super::*;

    const RULES: ScoringRules = ScoringRules {
        marks_per_question: 2.0,
        negative_marking: 0.5,
        pass_percentage: 50.0,
    };

    fn question(correct: &[Uuid]) -> GradableQuestion {
        GradableQuestion {
            question_id: Uuid::new_v4(),
            correct_option_ids: correct.iter().copied().collect(),
        }
    }

    fn select(question: &GradableQuestion, options: &[Uuid]) -> AnswerSelection {
        AnswerSelection {
            question_id: question.question_id,
            selected_option_ids: options.to_vec(),
        }
    }

    #[test]
    fn mixed_answers_with_negative_marking() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let q1 = question(&[a]);
        let q2 = question(&[b, c]);
        let q3 = question(&[a]);
        let q4 = question(&[b]);

        let outcome = grade(
            &RULES,
            &[q1.clone(), q2.clone(), q3.clone(), q4.clone()],
            &[
                select(&q1, &[a]),
                select(&q2, &[c, b]),
                select(&q3, &[b]),
                // q4 left unanswered
            ],
        );

        assert_eq!(outcome.total_marks, 8.0);
        assert_eq!(outcome.negative_marks, 0.5);
        assert_eq!(outcome.obtained_marks, 3.5);
        assert_eq!(outcome.percentage, 43.75);
        assert!(!outcome.passed);
        assert_eq!(outcome.answers.iter().filter(|a| a.is_correct).count(), 2);
        assert!(outcome.answers[3].selected_option_ids.is_empty());
    }

    #[test]
    fn partial_multiple_choice_is_wrong() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let q = question(&[a, b]);
        let outcome = grade(&RULES, &[q.clone()], &[select(&q, &[a])]);
        assert!(!outcome.answers[0].is_correct);
        assert_eq!(outcome.negative_marks, 0.5);
    }

    #[test]
    fn obtained_marks_never_go_negative() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let q1 = question(&[a]);
        let q2 = question(&[a]);
        let outcome = grade(&RULES, &[q1.clone(), q2.clone()], &[select(&q1, &[b]), select(&q2, &[b])]);
        assert_eq!(outcome.obtained_marks, 0.0);
        assert_eq!(outcome.negative_marks, 1.0);
        assert_eq!(outcome.percentage, 0.0);
    }

    #[test]
    fn empty_question_set_scores_zero() {
        let outcome = grade(&RULES, &[], &[]);
        assert_eq!(outcome.total_marks, 0.0);
        assert_eq!(outcome.percentage, 0.0);
        assert!(!outcome.passed);
    }

    #[test]
    fn pass_threshold_is_inclusive() {
        let a = Uuid::new_v4();
        let q1 = question(&[a]);
        let q2 = question(&[a]);
        let outcome = grade(&RULES, &[q1.clone(), q2], &[select(&q1, &[a])]);
        assert_eq!(outcome.percentage, 50.0);
        assert!(outcome.passed);
    }

    #[test]
    fn unknown_questions_are_ignored() {
        let a = Uuid::new_v4();
        let q = question(&[a]);
        let stray = AnswerSelection {
            question_id: Uuid::new_v4(),
            selected_option_ids: vec![a],
        };
        let outcome = grade(&RULES, &[q.clone()], &[stray, select(&q, &[a])]);
        assert_eq!(outcome.answers.len(), 1);
        assert_eq!(outcome.obtained_marks, 2.0);
    }

    #[test]
    fn retake_limit_counts_first_attempt() {
        assert!(may_attempt(0, 0));
        assert!(!may_attempt(1, 0));
        assert!(may_attempt(2, 2));
        assert!(!may_attempt(3, 2));
    }

    #[test]
    fn overdue_after_duration() {
        let start = Utc::now();
        assert!(!is_overdue(start, 10, start + Duration::minutes(10)));
        assert!(is_overdue(start, 10, start + Duration::minutes(10) + Duration::seconds(1)));
    }
}

//! Learner facing status of a lesson: localized labels and badges.
//!
//! The inputs are nullable. `None` means there is no record yet and never
//! renders a negative badge.

use serde::{Deserialize, Serialize};

use crate::model::entity::LessonType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl Locale {
    /// Accepts tags like `es`, `es-AR` or `ES_es`. Anything else is English.
    pub fn from_tag(tag: &str) -> Self {
        let primary = tag
            .split(['-', '_', ','])
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match primary.as_str() {
            "es" => Self::Es,
            _ => Self::En,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum Badge {
    Passed,
    Failed,
    Reviewed,
    PendingReview,
    Completed,
    InProgress,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StatusFlags {
    pub passed: Option<bool>,
    pub reviewed: Option<bool>,
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LessonStatus {
    pub lesson_type: LessonType,
    pub title: String,
    pub message: String,
    pub badges: Vec<Badge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    NotStarted,
    Started,
    Done,
    Passed,
    Failed,
    AwaitingReview,
    ReviewedPassed,
    ReviewedFailed,
    Reviewed,
}

fn outcome(lesson_type: LessonType, flags: StatusFlags) -> Outcome {
    match lesson_type {
        LessonType::Exam => match flags.passed {
            Some(true) => Outcome::Passed,
            Some(false) => Outcome::Failed,
            None => Outcome::NotStarted,
        },
        LessonType::Assignment => match (flags.reviewed, flags.passed) {
            (Some(true), Some(true)) => Outcome::ReviewedPassed,
            (Some(true), Some(false)) => Outcome::ReviewedFailed,
            (Some(true), None) => Outcome::Reviewed,
            (Some(false), _) => Outcome::AwaitingReview,
            (None, _) => Outcome::NotStarted,
        },
        _ => match flags.completed {
            Some(true) => Outcome::Done,
            Some(false) => Outcome::Started,
            None => Outcome::NotStarted,
        },
    }
}

pub fn badges(lesson_type: LessonType, flags: StatusFlags) -> Vec<Badge> {
    let pass_badge = |passed: Option<bool>| match passed {
        Some(true) => Some(Badge::Passed),
        Some(false) => Some(Badge::Failed),
        None => None,
    };

    match lesson_type {
        LessonType::Exam => pass_badge(flags.passed).into_iter().collect(),
        LessonType::Assignment => match flags.reviewed {
            Some(true) => std::iter::once(Badge::Reviewed)
                .chain(pass_badge(flags.passed))
                .collect(),
            Some(false) => vec![Badge::PendingReview],
            None => Vec::new(),
        },
        _ => match flags.completed {
            Some(true) => vec![Badge::Completed],
            Some(false) => vec![Badge::InProgress],
            None => Vec::new(),
        },
    }
}

/// `(title, message)` for the lesson in the requested locale.
pub fn labels(lesson_type: LessonType, locale: Locale, flags: StatusFlags) -> (&'static str, &'static str) {
    let outcome = outcome(lesson_type, flags);
    match locale {
        Locale::En => labels_en(lesson_type, outcome),
        Locale::Es => labels_es(lesson_type, outcome),
    }
}

pub fn derive(lesson_type: LessonType, locale: Locale, flags: StatusFlags) -> LessonStatus {
    let (title, message) = labels(lesson_type, locale, flags);
    LessonStatus {
        lesson_type,
        title: title.to_string(),
        message: message.to_string(),
        badges: badges(lesson_type, flags),
    }
}

fn labels_en(lesson_type: LessonType, outcome: Outcome) -> (&'static str, &'static str) {
    use Outcome::*;
    match lesson_type {
        LessonType::Video => (
            "Video lesson",
            match outcome {
                Done => "You have watched this video.",
                Started => "Finish the video to complete this lesson.",
                _ => "Watch the video to complete this lesson.",
            },
        ),
        LessonType::Document => (
            "Document",
            match outcome {
                Done => "You have read this document.",
                Started => "Finish reading to complete this lesson.",
                _ => "Read the document to complete this lesson.",
            },
        ),
        LessonType::LiveClass => (
            "Live class",
            match outcome {
                Done => "You attended this live class.",
                _ => "Join the live class at its scheduled time.",
            },
        ),
        LessonType::Exam => (
            "Exam",
            match outcome {
                Passed => "Congratulations, you passed this exam.",
                Failed => "You did not reach the pass mark for this exam.",
                _ => "Answer the questions to complete this exam.",
            },
        ),
        LessonType::Assignment => (
            "Assignment",
            match outcome {
                ReviewedPassed => "Your assignment was reviewed and passed.",
                ReviewedFailed => "Your assignment was reviewed and did not pass.",
                Reviewed => "Your assignment was reviewed.",
                AwaitingReview => "Your assignment is waiting for review.",
                _ => "Submit your answer to complete this assignment.",
            },
        ),
        LessonType::Feedback => (
            "Feedback",
            match outcome {
                Done => "Thank you for your feedback.",
                _ => "Tell us what you think about this course.",
            },
        ),
    }
}

fn labels_es(lesson_type: LessonType, outcome: Outcome) -> (&'static str, &'static str) {
    use Outcome::*;
    match lesson_type {
        LessonType::Video => (
            "Lección en video",
            match outcome {
                Done => "Has visto este video.",
                Started => "Termina el video para completar esta lección.",
                _ => "Mira el video para completar esta lección.",
            },
        ),
        LessonType::Document => (
            "Documento",
            match outcome {
                Done => "Has leído este documento.",
                Started => "Termina la lectura para completar esta lección.",
                _ => "Lee el documento para completar esta lección.",
            },
        ),
        LessonType::LiveClass => (
            "Clase en vivo",
            match outcome {
                Done => "Asististe a esta clase en vivo.",
                _ => "Únete a la clase en vivo en el horario programado.",
            },
        ),
        LessonType::Exam => (
            "Examen",
            match outcome {
                Passed => "Felicitaciones, aprobaste este examen.",
                Failed => "No alcanzaste la nota mínima de este examen.",
                _ => "Responde las preguntas para completar este examen.",
            },
        ),
        LessonType::Assignment => (
            "Tarea",
            match outcome {
                ReviewedPassed => "Tu tarea fue revisada y aprobada.",
                ReviewedFailed => "Tu tarea fue revisada y no fue aprobada.",
                Reviewed => "Tu tarea fue revisada.",
                AwaitingReview => "Tu tarea está pendiente de revisión.",
                _ => "Envía tu respuesta para completar esta tarea.",
            },
        ),
        LessonType::Feedback => (
            "Opinión",
            match outcome {
                Done => "Gracias por tu opinión.",
                _ => "Cuéntanos qué te pareció este curso.",
            },
        ),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn flags(passed: Option<bool>, reviewed: Option<bool>, completed: Option<bool>) -> StatusFlags {
        StatusFlags {
            passed,
            reviewed,
            completed,
        }
    }

    #[test]
    fn exam_badges_follow_passed_only() {
        assert_eq!(badges(LessonType::Exam, flags(Some(true), None, Some(true))), vec![Badge::Passed]);
        assert_eq!(badges(LessonType::Exam, flags(Some(false), None, Some(true))), vec![Badge::Failed]);
        assert!(badges(LessonType::Exam, flags(None, None, Some(true))).is_empty());
    }

    #[test]
    fn assignment_shows_pass_only_after_review() {
        assert_eq!(
            badges(LessonType::Assignment, flags(Some(true), Some(true), None)),
            vec![Badge::Reviewed, Badge::Passed]
        );
        assert_eq!(
            badges(LessonType::Assignment, flags(Some(false), Some(false), None)),
            vec![Badge::PendingReview]
        );
        assert_eq!(
            badges(LessonType::Assignment, flags(None, Some(true), None)),
            vec![Badge::Reviewed]
        );
        assert!(badges(LessonType::Assignment, StatusFlags::default()).is_empty());
    }

    #[test]
    fn content_lessons_follow_completed() {
        for lesson_type in [
            LessonType::Video,
            LessonType::Document,
            LessonType::LiveClass,
            LessonType::Feedback,
        ] {
            assert_eq!(badges(lesson_type, flags(None, None, Some(true))), vec![Badge::Completed]);
            assert_eq!(badges(lesson_type, flags(None, None, Some(false))), vec![Badge::InProgress]);
            assert!(badges(lesson_type, StatusFlags::default()).is_empty());
        }
    }

    #[test]
    fn nulls_never_render_negative_badges() {
        let all_types = [
            LessonType::Video,
            LessonType::Document,
            LessonType::Exam,
            LessonType::Assignment,
            LessonType::LiveClass,
            LessonType::Feedback,
        ];
        for lesson_type in all_types {
            let rendered = badges(lesson_type, StatusFlags::default());
            assert!(!rendered.contains(&Badge::Failed));
            assert!(!rendered.contains(&Badge::PendingReview));
        }
    }

    #[test]
    fn labels_are_localized() {
        let f = flags(Some(true), None, Some(true));
        assert_eq!(labels(LessonType::Exam, Locale::En, f).0, "Exam");
        assert_eq!(labels(LessonType::Exam, Locale::Es, f).0, "Examen");
        assert_eq!(
            labels(LessonType::Exam, Locale::Es, f).1,
            "Felicitaciones, aprobaste este examen."
        );
    }

    #[test]
    fn message_depends_on_outcome() {
        let pending = labels(LessonType::Assignment, Locale::En, flags(None, Some(false), None)).1;
        let passed = labels(LessonType::Assignment, Locale::En, flags(Some(true), Some(true), None)).1;
        assert_ne!(pending, passed);
        assert_eq!(pending, "Your assignment is waiting for review.");
    }

    #[test]
    fn locale_tags() {
        assert_eq!(Locale::from_tag("es"), Locale::Es);
        assert_eq!(Locale::from_tag("es-AR,en;q=0.8"), Locale::Es);
        assert_eq!(Locale::from_tag("ES_es"), Locale::Es);
        assert_eq!(Locale::from_tag("fr"), Locale::En);
        assert_eq!(Locale::from_tag(""), Locale::En);
    }

    #[test]
    fn derive_combines_labels_and_badges() {
        let status = derive(LessonType::Video, Locale::En, flags(None, None, Some(true)));
        assert_eq!(status.title, "Video lesson");
        assert_eq!(status.badges, vec![Badge::Completed]);
    }
}

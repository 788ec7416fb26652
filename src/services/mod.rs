//! Business rules that do not belong to a single table.

pub mod eligibility;
pub mod grading;
pub mod lesson_status;
pub mod mailer;
pub mod meeting;
pub mod progress;

pub use mailer::MailError;
pub use meeting::MeetingError;

mod user;
pub use user::{UserEntity, UserEntityCreateUpdate};

mod department;
pub use department::{Department, DepartmentCreate};

mod group;
pub use group::{Group, GroupCreate, GroupMember};

mod skill;
pub use skill::{Skill, SkillCreate, UserSkill};

mod course;
pub use course::{Course, CourseCreate, CourseStatus};

mod section;
pub use section::{Section, SectionCreate};

mod lesson;
pub use lesson::{Lesson, LessonCreate, LessonType, LessonWithProgressRow};

mod question_set;
pub use question_set::{QuestionSet, QuestionSetOwner, QuestionSetParams};

mod question;
pub use question::{Question, QuestionCreate, QuestionOption, QuestionOptionCreate, QuestionType};

mod submission;
pub use submission::{QuestionSetSubmission, SubmissionAnswer};

mod watch_history;
pub use watch_history::WatchHistory;

mod enrollment;
pub use enrollment::{CourseEnrollment, DashboardCounts, EnrollmentWithUserRow};

mod assignment;
pub use assignment::{AssignmentReview, AssignmentSubmission, AssignmentSubmit};

mod feedback;
pub use feedback::{Feedback, FeedbackAnswer, FeedbackCreate, FeedbackSubmission, FeedbackType};

mod meeting_report;
pub use meeting_report::MeetingReport;

mod assessment;
pub use assessment::{Assessment, AssessmentCreate, AssessmentStatus};

mod eligibility;
pub use eligibility::{EligibilityCriteria, SkillsCriteria, SkillsCriteriaCreate};

mod settings;
pub use settings::{
    SmtpSettings, SmtpSettingsUpdate, StorageKind, StorageSettings, StorageSettingsUpdate,
    ZoomSettings, ZoomSettingsUpdate,
};

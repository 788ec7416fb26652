pub mod account;
pub mod assessments;
pub mod courses;
pub mod lessons;
pub mod progress;
pub mod question_sets;

//! Enrollment progress and certificates.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Whole-number share of completed lessons, 0 for courses without lessons.
pub fn enrollment_percentage(completed: i64, total: i64) -> i32 {
    if total <= 0 {
        return 0;
    }
    let completed = completed.clamp(0, total);
    (completed * 100 / total) as i32
}

pub fn certificate_allowed(certificate_enabled: bool, percentage: i32) -> bool {
    certificate_enabled && percentage >= 100
}

/// `CERT-<yyyymmdd>-<8 hex chars of the enrollment id>`.
pub fn certificate_number(enrollment_id: Uuid, issued_at: DateTime<Utc>) -> String {
    let simple = enrollment_id.simple().to_string();
    format!(
        "CERT-{}-{}",
        issued_at.format("%Y%m%d"),
        simple[..8].to_uppercase()
    )
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn percentage_rounds_down() {
        assert_eq!(enrollment_percentage(1, 3), 33);
        assert_eq!(enrollment_percentage(2, 3), 66);
        assert_eq!(enrollment_percentage(3, 3), 100);
    }

    #[test]
    fn empty_course_is_zero_percent() {
        assert_eq!(enrollment_percentage(0, 0), 0);
    }

    #[test]
    fn percentage_never_exceeds_hundred() {
        assert_eq!(enrollment_percentage(5, 4), 100);
    }

    #[test]
    fn certificate_needs_full_completion() {
        assert!(certificate_allowed(true, 100));
        assert!(!certificate_allowed(true, 99));
        assert!(!certificate_allowed(false, 100));
    }

    #[test]
    fn certificate_number_format() {
        let id = Uuid::parse_str("a1b2c3d4-0000-4000-8000-000000000000").unwrap();
        let at = Utc.with_ymd_and_hms(2025, 2, 10, 12, 0, 0).unwrap();
        assert_eq!(certificate_number(id, at), "CERT-20250210-A1B2C3D4");
    }
}

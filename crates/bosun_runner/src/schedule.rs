//! Schedule window matching and backup naming.
//!
//! Automatic backups are due when the current UTC time, truncated to the top
//! of the hour, matches a setting's {hour, day-of-week} window. Everything
//! here is a deterministic function of an injected `now`; there is no hidden
//! clock.

use bosun_db::{BackupSetting, DAY_OF_WEEK_ANY};
use chrono::{DateTime, DurationRound, Datelike, TimeDelta, Timelike, Utc};

/// One scheduling window: the current hour, truncated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleWindow {
    /// Top of the current UTC hour.
    pub hour_start: DateTime<Utc>,
    /// UTC hour-of-day (0..=23).
    pub hour: i64,
    /// UTC day-of-week, 0 = Sunday.
    pub day_of_week: i64,
}

impl ScheduleWindow {
    /// Truncate a wall-clock instant to its scheduling window.
    pub fn truncate(now: DateTime<Utc>) -> Self {
        let hour_start = now
            .duration_trunc(TimeDelta::hours(1))
            .unwrap_or(now);
        Self {
            hour_start,
            hour: i64::from(hour_start.hour()),
            day_of_week: i64::from(hour_start.weekday().num_days_from_sunday()),
        }
    }
}

/// Whether a setting's schedule window matches the given instant.
pub fn matches(setting: &BackupSetting, now: DateTime<Utc>) -> bool {
    let window = ScheduleWindow::truncate(now);
    setting.enabled
        && setting.hour == window.hour
        && (setting.day_of_week == DAY_OF_WEEK_ANY || setting.day_of_week == window.day_of_week)
}

/// Deterministic name for an automatic backup:
/// `{project}-{environment}-{yyyymmddThhmmss}-autobackup`, on the truncated
/// hour. Re-deriving the name within the same hour yields the same string,
/// which is what makes triggering idempotent.
pub fn backup_name(project_title: &str, environment_title: &str, window: &ScheduleWindow) -> String {
    format!(
        "{}-{}-{}-autobackup",
        slugify(project_title),
        slugify(environment_title),
        window.hour_start.format("%Y%m%dT%H%M%S")
    )
}

/// Lowercased alphanumeric runs joined by single dashes.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use bosun_db::RETENTION_UNSET;
    use chrono::TimeZone;

    fn setting(hour: i64, day_of_week: i64) -> BackupSetting {
        BackupSetting {
            database_id: 1,
            enabled: true,
            hour,
            day_of_week,
            retention_period_secs: RETENTION_UNSET,
            hook_url: None,
        }
    }

    #[test]
    fn test_truncate_to_hour() {
        // 2024-01-01 is a Monday
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 3, 42, 17).unwrap();
        let window = ScheduleWindow::truncate(now);
        assert_eq!(window.hour_start, Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap());
        assert_eq!(window.hour, 3);
        assert_eq!(window.day_of_week, 1);
    }

    #[test]
    fn test_matches_window() {
        let monday = Utc.with_ymd_and_hms(2024, 1, 1, 3, 30, 0).unwrap();

        assert!(matches(&setting(3, 1), monday));
        assert!(matches(&setting(3, DAY_OF_WEEK_ANY), monday));
        assert!(!matches(&setting(3, 2), monday));
        assert!(!matches(&setting(4, 1), monday));

        let mut disabled = setting(3, 1);
        disabled.enabled = false;
        assert!(!matches(&disabled, monday));
    }

    #[test]
    fn test_backup_name_is_deterministic_within_hour() {
        let window =
            ScheduleWindow::truncate(Utc.with_ymd_and_hms(2024, 1, 1, 3, 12, 55).unwrap());
        let name = backup_name("Proj", "Env", &window);
        assert_eq!(name, "proj-env-20240101T030000-autobackup");

        let later =
            ScheduleWindow::truncate(Utc.with_ymd_and_hms(2024, 1, 1, 3, 59, 59).unwrap());
        assert_eq!(backup_name("Proj", "Env", &later), name);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Project"), "my-project");
        assert_eq!(slugify("  Spaced  Out  "), "spaced-out");
        assert_eq!(slugify("prod/eu-west_1"), "prod-eu-west-1");
        assert_eq!(slugify("Already-Fine"), "already-fine");
        assert_eq!(slugify(""), "");
    }
}

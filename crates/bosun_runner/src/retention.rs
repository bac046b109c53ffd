//! Retention evaluation.
//!
//! Pure functions of "item timestamp + retention window + now". Both the
//! backup purge and the binlog purge go through here; neither carries its
//! own clock.

use bosun_db::{BackupSetting, RETENTION_UNSET};
use chrono::{DateTime, Utc};

/// Whether an item last touched at `item_ts` (epoch seconds) has outlived a
/// retention window. The unset sentinel never expires anything, and an item
/// exactly at the boundary is kept (strictly `now > item_ts + retention`).
pub fn is_expired(item_ts: i64, retention_secs: i64, now: DateTime<Utc>) -> bool {
    if retention_secs < 0 {
        return false;
    }
    now.timestamp() > item_ts + retention_secs
}

/// The effective binlog retention for an instance: the minimum finite
/// retention across its backup settings. `None` means no finite-retention
/// setting exists and the instance's binlog files are never purged.
pub fn min_finite_retention(settings: &[BackupSetting]) -> Option<i64> {
    settings
        .iter()
        .filter(|setting| setting.retention_period_secs != RETENTION_UNSET)
        .map(|setting| setting.retention_period_secs)
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn setting(retention_period_secs: i64) -> BackupSetting {
        BackupSetting {
            database_id: 1,
            enabled: true,
            hour: 0,
            day_of_week: -1,
            retention_period_secs,
            hook_url: None,
        }
    }

    #[test]
    fn test_expired_iff_age_exceeds_retention() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let base = now.timestamp();

        // age > retention: purge
        assert!(is_expired(base - 7200, 3600, now));
        // age == retention: keep
        assert!(!is_expired(base - 3600, 3600, now));
        // age < retention: keep
        assert!(!is_expired(base - 10, 3600, now));
        // zero retention expires anything in the past
        assert!(is_expired(base - 1, 0, now));
        assert!(!is_expired(base, 0, now));
    }

    #[test]
    fn test_unset_retention_never_expires() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert!(!is_expired(0, RETENTION_UNSET, now));
        assert!(!is_expired(i64::MIN / 4, RETENTION_UNSET, now));
    }

    #[test]
    fn test_min_finite_retention() {
        assert_eq!(
            min_finite_retention(&[setting(3600), setting(7200)]),
            Some(3600)
        );
        assert_eq!(
            min_finite_retention(&[setting(RETENTION_UNSET), setting(7200)]),
            Some(7200)
        );
        // all unset, or no settings at all: never purge
        assert_eq!(min_finite_retention(&[setting(RETENTION_UNSET)]), None);
        assert_eq!(min_finite_retention(&[]), None);
    }
}

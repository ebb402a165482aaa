//! Sync planner (§4.3): pure decision function over a calendar's water-mark
//! window. No I/O; all date arithmetic is UTC, Monday-start weeks.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use chronarc_domain::constants;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncReason {
    Fresh,
    StaleRefresh,
    MissingWeeks,
    FirstSync,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncDecision {
    pub needs_sync: bool,
    pub reason: SyncReason,
    pub is_stale_refresh: bool,
    /// Sorted, Monday-aligned week-starts not covered by the current
    /// water-mark window. Empty unless `reason` is `MissingWeeks` or
    /// `FirstSync`.
    pub missing_weeks: Vec<NaiveDate>,
}

/// Monday 00:00 of the week containing `date`.
#[must_use]
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday();
    date - Duration::days(i64::from(offset))
}

/// The default initial sync window: prior N weeks through next M weeks,
/// relative to `now`, both ends week-aligned.
#[must_use]
pub fn default_initial_window(now: DateTime<Utc>) -> (NaiveDate, NaiveDate) {
    let today_week_start = week_start(now.date_naive());
    let start = today_week_start - Duration::weeks(constants::DEFAULT_INITIAL_WINDOW_WEEKS_BEFORE);
    let end = today_week_start
        + Duration::weeks(constants::DEFAULT_INITIAL_WINDOW_WEEKS_AFTER)
        + Duration::days(6);
    (start, end)
}

/// Enumerate the Monday week-starts in `[start, end]` not covered by
/// `[min, max]` (if present), sorted ascending. Every contiguous run steps
/// by exactly seven days.
#[must_use]
pub fn missing_weeks(
    start: NaiveDate,
    end: NaiveDate,
    water_mark: Option<(NaiveDate, NaiveDate)>,
) -> Vec<NaiveDate> {
    let mut weeks = Vec::new();
    let mut cursor = week_start(start);
    let last = week_start(end);
    while cursor <= last {
        let covered = water_mark.is_some_and(|(min, max)| cursor >= min && cursor <= max);
        if !covered {
            weeks.push(cursor);
        }
        cursor += Duration::days(7);
    }
    weeks
}

/// Decide what a calendar's sync should do given its current water-mark
/// window, last sync time, and a requested date range.
#[must_use]
pub fn plan_sync(
    water_mark: Option<(NaiveDate, NaiveDate)>,
    last_synced_at: Option<DateTime<Utc>>,
    target_start: NaiveDate,
    target_end: NaiveDate,
    now: DateTime<Utc>,
) -> SyncDecision {
    let Some((min, max)) = water_mark else {
        let (default_start, default_end) = default_initial_window(now);
        let weeks = missing_weeks(default_start, default_end, None);
        return SyncDecision {
            needs_sync: true,
            reason: SyncReason::FirstSync,
            is_stale_refresh: false,
            missing_weeks: weeks,
        };
    };

    let fully_covered = target_start >= min && target_end <= max;
    if fully_covered {
        let is_stale = match last_synced_at {
            Some(t) => now - t >= constants::staleness(),
            None => true,
        };
        if is_stale {
            return SyncDecision {
                needs_sync: true,
                reason: SyncReason::StaleRefresh,
                is_stale_refresh: true,
                missing_weeks: Vec::new(),
            };
        }
        return SyncDecision {
            needs_sync: false,
            reason: SyncReason::Fresh,
            is_stale_refresh: false,
            missing_weeks: Vec::new(),
        };
    }

    let weeks = missing_weeks(target_start, target_end, Some((min, max)));
    SyncDecision {
        needs_sync: true,
        reason: SyncReason::MissingWeeks,
        is_stale_refresh: false,
        missing_weeks: weeks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn week_start_aligns_to_monday() {
        // 2025-03-12 is a Wednesday.
        assert_eq!(week_start(d(2025, 3, 12)), d(2025, 3, 10));
        // 2025-03-10 is already a Monday.
        assert_eq!(week_start(d(2025, 3, 10)), d(2025, 3, 10));
    }

    #[test]
    fn fresh_when_covered_and_not_stale() {
        let now = Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap();
        let decision = plan_sync(
            Some((d(2025, 3, 3), d(2025, 3, 30))),
            Some(now - Duration::hours(1)),
            d(2025, 3, 10),
            d(2025, 3, 16),
            now,
        );
        assert!(!decision.needs_sync);
        assert_eq!(decision.reason, SyncReason::Fresh);
    }

    #[test]
    fn stale_refresh_when_covered_but_old() {
        let now = Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap();
        let decision = plan_sync(
            Some((d(2025, 3, 3), d(2025, 3, 30))),
            Some(now - Duration::hours(26)),
            d(2025, 3, 10),
            d(2025, 3, 16),
            now,
        );
        assert!(decision.needs_sync);
        assert!(decision.is_stale_refresh);
        assert_eq!(decision.reason, SyncReason::StaleRefresh);
    }

    #[test]
    fn missing_weeks_enumerated_and_sorted() {
        let now = Utc::now();
        let decision = plan_sync(
            Some((d(2025, 3, 10), d(2025, 3, 30))),
            Some(now),
            d(2025, 2, 17),
            d(2025, 3, 30),
            now,
        );
        assert_eq!(decision.missing_weeks, vec![d(2025, 2, 17), d(2025, 2, 24)]);
        for pair in decision.missing_weeks.windows(2) {
            assert_eq!((pair[1] - pair[0]).num_days(), 7);
        }
    }

    #[test]
    fn first_sync_has_no_water_mark() {
        let now = Utc.with_ymd_and_hms(2025, 3, 20, 0, 0, 0).unwrap();
        let decision = plan_sync(None, None, d(2025, 3, 3), d(2025, 3, 30), now);
        assert_eq!(decision.reason, SyncReason::FirstSync);
        assert!(decision.needs_sync);
        assert!(!decision.missing_weeks.is_empty());
    }
}

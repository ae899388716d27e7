//! Effective timestamp resolution for pending changes.
//!
//! Priority, highest first:
//!
//! 1. An explicit date always wins (`at_date`).
//! 2. A trial end strictly in the future (`at_trial_end`).
//! 3. A period end strictly in the future (`at_period_end`).
//! 4. Now (`at_date`).
//!
//! Resolution never fails. Missing, zero, past or unparseable inputs fall
//! through to the next rule.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// How a change's effective time was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingStrategy {
    AtDate,
    AtTrialEnd,
    AtPeriodEnd,
}

/// Resolved point in time and the rule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveTiming {
    pub timestamp: Timestamp,
    pub strategy: TimingStrategy,
}

impl EffectiveTiming {
    pub fn unix_secs(&self) -> i64 {
        self.timestamp.as_unix_secs()
    }
}

/// Resolves the effective timestamp against the current clock.
pub fn resolve_effective_timestamp(
    explicit_date: Option<&str>,
    trial_end: Option<i64>,
    period_end: Option<i64>,
) -> EffectiveTiming {
    resolve_effective_timestamp_at(Timestamp::now(), explicit_date, trial_end, period_end)
}

/// Resolves the effective timestamp against a caller-supplied `now`.
pub fn resolve_effective_timestamp_at(
    now: Timestamp,
    explicit_date: Option<&str>,
    trial_end: Option<i64>,
    period_end: Option<i64>,
) -> EffectiveTiming {
    if let Some(raw) = explicit_date {
        match parse_explicit_date(raw) {
            Some(timestamp) => {
                return EffectiveTiming {
                    timestamp,
                    strategy: TimingStrategy::AtDate,
                }
            }
            None => tracing::warn!(explicit_date = raw, "Ignoring unparseable effective date"),
        }
    }

    if let Some(timestamp) = future_boundary(now, trial_end) {
        return EffectiveTiming {
            timestamp,
            strategy: TimingStrategy::AtTrialEnd,
        };
    }

    if let Some(timestamp) = future_boundary(now, period_end) {
        return EffectiveTiming {
            timestamp,
            strategy: TimingStrategy::AtPeriodEnd,
        };
    }

    EffectiveTiming {
        timestamp: now,
        strategy: TimingStrategy::AtDate,
    }
}

/// Parses an explicit effective date.
///
/// Accepts RFC 3339, a bare `YYYY-MM-DD` (midnight UTC) or Unix seconds.
pub fn parse_explicit_date(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(Timestamp::from_datetime(dt.with_timezone(&Utc)));
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Timestamp::from_datetime(naive.and_utc()));
    }

    raw.parse::<i64>().ok().and_then(Timestamp::from_unix_secs)
}

fn future_boundary(now: Timestamp, boundary: Option<i64>) -> Option<Timestamp> {
    boundary
        .filter(|secs| *secs > 0)
        .and_then(Timestamp::from_unix_secs)
        .filter(|ts| ts.is_after(&now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NOW: i64 = 1_700_000_000;

    fn now() -> Timestamp {
        Timestamp::from_unix_secs(NOW).unwrap()
    }

    #[test]
    fn explicit_date_always_wins() {
        let timing = resolve_effective_timestamp_at(
            now(),
            Some("2024-03-01T12:00:00Z"),
            Some(NOW + 3_600),
            Some(NOW + 7_200),
        );
        assert_eq!(timing.strategy, TimingStrategy::AtDate);
        assert_eq!(timing.unix_secs(), 1_709_294_400);
    }

    #[test]
    fn future_trial_end_beats_period_end() {
        let timing =
            resolve_effective_timestamp_at(now(), None, Some(NOW + 3_600), Some(NOW + 7_200));
        assert_eq!(timing.strategy, TimingStrategy::AtTrialEnd);
        assert_eq!(timing.unix_secs(), NOW + 3_600);
    }

    #[test]
    fn past_trial_end_falls_through_to_period_end() {
        let timing =
            resolve_effective_timestamp_at(now(), None, Some(NOW - 10), Some(NOW + 7_200));
        assert_eq!(timing.strategy, TimingStrategy::AtPeriodEnd);
        assert_eq!(timing.unix_secs(), NOW + 7_200);
    }

    #[test]
    fn trial_end_equal_to_now_is_not_in_the_future() {
        let timing = resolve_effective_timestamp_at(now(), None, Some(NOW), None);
        assert_eq!(timing.strategy, TimingStrategy::AtDate);
        assert_eq!(timing.timestamp, now());
    }

    #[test]
    fn everything_past_resolves_to_now() {
        let timing = resolve_effective_timestamp_at(now(), None, Some(NOW - 10), Some(NOW - 5));
        assert_eq!(timing.strategy, TimingStrategy::AtDate);
        assert_eq!(timing.timestamp, now());
    }

    #[test]
    fn zero_and_missing_inputs_resolve_to_now() {
        let timing = resolve_effective_timestamp_at(now(), None, Some(0), Some(0));
        assert_eq!(timing.strategy, TimingStrategy::AtDate);
        assert_eq!(timing.timestamp, now());

        let timing = resolve_effective_timestamp_at(now(), None, None, None);
        assert_eq!(timing.timestamp, now());
    }

    #[test]
    fn unparseable_explicit_date_falls_through() {
        let timing =
            resolve_effective_timestamp_at(now(), Some("next tuesday"), Some(NOW + 60), None);
        assert_eq!(timing.strategy, TimingStrategy::AtTrialEnd);
    }

    #[test]
    fn wall_clock_variant_returns_now_for_past_inputs() {
        let before = Timestamp::now();
        let timing = resolve_effective_timestamp(None, Some(1), Some(2));
        let after = Timestamp::now();

        assert_eq!(timing.strategy, TimingStrategy::AtDate);
        assert!(timing.timestamp >= before && timing.timestamp <= after);
    }

    #[test]
    fn parses_supported_date_formats() {
        assert_eq!(
            parse_explicit_date("2024-01-15").unwrap().as_unix_secs(),
            1_705_276_800
        );
        assert_eq!(
            parse_explicit_date("2024-01-15T00:00:00+00:00")
                .unwrap()
                .as_unix_secs(),
            1_705_276_800
        );
        assert_eq!(
            parse_explicit_date(" 1705276800 ").unwrap().as_unix_secs(),
            1_705_276_800
        );
        assert!(parse_explicit_date("").is_none());
        assert!(parse_explicit_date("15/01/2024").is_none());
    }

    proptest! {
        #[test]
        fn explicit_date_wins_regardless_of_boundaries(
            explicit in 0i64..4_000_000_000,
            trial in proptest::option::of(any::<i64>()),
            period in proptest::option::of(any::<i64>()),
        ) {
            let raw = explicit.to_string();
            let timing = resolve_effective_timestamp_at(now(), Some(&raw), trial, period);
            prop_assert_eq!(timing.strategy, TimingStrategy::AtDate);
            prop_assert_eq!(timing.unix_secs(), explicit);
        }

        #[test]
        fn future_trial_end_is_returned_verbatim(
            trial_offset in 1i64..100_000_000,
            period_offset in proptest::option::of(-100_000_000i64..100_000_000),
        ) {
            let trial = NOW + trial_offset;
            let timing = resolve_effective_timestamp_at(
                now(),
                None,
                Some(trial),
                period_offset.map(|offset| NOW + offset),
            );
            prop_assert_eq!(timing.strategy, TimingStrategy::AtTrialEnd);
            prop_assert_eq!(timing.unix_secs(), trial);
        }

        #[test]
        fn past_trial_defers_to_future_period(
            trial_offset in 0i64..100_000_000,
            period_offset in 1i64..100_000_000,
        ) {
            let timing = resolve_effective_timestamp_at(
                now(),
                None,
                Some(NOW - trial_offset),
                Some(NOW + period_offset),
            );
            prop_assert_eq!(timing.strategy, TimingStrategy::AtPeriodEnd);
            prop_assert_eq!(timing.unix_secs(), NOW + period_offset);
        }

        #[test]
        fn past_boundaries_resolve_to_now(
            trial_offset in 0i64..100_000_000,
            period_offset in 0i64..100_000_000,
        ) {
            let timing = resolve_effective_timestamp_at(
                now(),
                None,
                Some(NOW - trial_offset),
                Some(NOW - period_offset),
            );
            prop_assert_eq!(timing.strategy, TimingStrategy::AtDate);
            prop_assert_eq!(timing.timestamp, now());
        }
    }
}

//! Property-based testing for szbck
//!
//! Uses proptest to check the retention classifier and the count selector
//! against randomly generated snapshot histories.

use ::szbck::retention::{classify, same_calendar_day, same_iso_week};
use ::szbck::selector::decisions;
use ::szbck::DeleteCount;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use proptest::prelude::*;

/// Sorted snapshot instants spread over roughly four months
fn history_strategy() -> impl Strategy<Value = Vec<DateTime<Utc>>> {
    prop::collection::vec(0i64..(120 * 24 * 60), 0..80).prop_map(|mut minutes| {
        minutes.sort_unstable();
        minutes.dedup();
        let base = Utc.with_ymd_and_hms(2023, 11, 1, 0, 0, 0).unwrap();
        minutes
            .into_iter()
            .map(|m| base + TimeDelta::minutes(m))
            .collect()
    })
}

/// `(hourly_cutoff, daily_cutoff)` somewhere inside the generated range
fn cutoffs_strategy() -> impl Strategy<Value = (DateTime<Utc>, DateTime<Utc>)> {
    (0i64..(130 * 24), 0i64..(60 * 24)).prop_map(|(hourly, gap)| {
        let base = Utc.with_ymd_and_hms(2023, 11, 1, 0, 0, 0).unwrap();
        let hourly_cutoff = base + TimeDelta::hours(hourly);
        (hourly_cutoff, hourly_cutoff - TimeDelta::hours(gap))
    })
}

fn count_strategy() -> impl Strategy<Value = DeleteCount> {
    prop_oneof![
        Just(DeleteCount::All),
        (1usize..50).prop_map(DeleteCount::Oldest),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_newest_is_never_removed(
        times in history_strategy(),
        (hourly, daily) in cutoffs_strategy(),
    ) {
        let remove = classify(&times, &hourly, &daily);
        prop_assert_eq!(remove.len(), times.len());
        if let Some(last) = remove.last() {
            prop_assert!(!last);
        }
    }

    #[test]
    fn prop_classification_is_deterministic(
        times in history_strategy(),
        (hourly, daily) in cutoffs_strategy(),
    ) {
        prop_assert_eq!(
            classify(&times, &hourly, &daily),
            classify(&times, &hourly, &daily)
        );
    }

    #[test]
    fn prop_recent_snapshots_are_kept(
        times in history_strategy(),
        (hourly, daily) in cutoffs_strategy(),
    ) {
        let remove = classify(&times, &hourly, &daily);
        for (t, r) in times.iter().zip(&remove) {
            if *t > hourly {
                prop_assert!(!r, "{} is newer than {}", t, hourly);
            }
        }
    }

    #[test]
    fn prop_survivors_are_unique_per_window(
        times in history_strategy(),
        (hourly, daily) in cutoffs_strategy(),
    ) {
        let remove = classify(&times, &hourly, &daily);
        let kept: Vec<&DateTime<Utc>> = times
            .iter()
            .zip(&remove)
            .filter(|(_, r)| !**r)
            .map(|(t, _)| t)
            .collect();

        let in_daily: Vec<_> = kept.iter().filter(|t| ***t <= hourly && ***t > daily).collect();
        for pair in in_daily.windows(2) {
            prop_assert!(!same_calendar_day(*pair[0], *pair[1]));
        }

        let in_weekly: Vec<_> = kept.iter().filter(|t| ***t <= daily).collect();
        for pair in in_weekly.windows(2) {
            prop_assert!(!same_iso_week(*pair[0], *pair[1]));
        }
    }

    #[test]
    fn prop_every_removal_has_a_newer_survivor_in_its_bucket(
        times in history_strategy(),
        (hourly, daily) in cutoffs_strategy(),
    ) {
        let remove = classify(&times, &hourly, &daily);
        for i in (0..times.len()).filter(|&i| remove[i]) {
            let t = &times[i];
            prop_assert!(*t <= hourly);
            let covered = (i + 1..times.len()).filter(|&j| !remove[j]).any(|j| {
                if *t > daily {
                    same_calendar_day(&times[j], t)
                } else {
                    same_iso_week(&times[j], t)
                }
            });
            prop_assert!(covered, "{} removed without a survivor", t);
        }
    }

    #[test]
    fn prop_selection_spares_the_newest(
        snapshots in 2usize..40,
        count in count_strategy(),
    ) {
        // the newest snapshot is never a candidate
        let candidates = snapshots - 1;
        let n = count.resolve(candidates);
        let flags = decisions(candidates, n);

        prop_assert_eq!(flags.len(), candidates);
        prop_assert!(n < snapshots);
        prop_assert_eq!(flags.iter().filter(|f| **f).count(), n);
        prop_assert!(flags.iter().skip(n).all(|f| !f));
        if let DeleteCount::Oldest(k) = count {
            prop_assert_eq!(n, k.min(candidates));
        }
    }
}

//! Consecutive-day streaks for a single mood.
//!
//! Both calculations work on calendar dates: two entries are consecutive
//! when one date is the other's successor, regardless of time zones or
//! wall-clock hours between them.

use chrono::NaiveDate;

use crate::models::vibe::Vibe;

fn distinct_dates(vibes: &[Vibe]) -> Vec<NaiveDate> {
    let mut dates: Vec<NaiveDate> = vibes.iter().map(|v| v.date).collect();
    dates.sort_unstable();
    dates.dedup();
    dates
}

/// Run of consecutive days ending at the most recent entry.
pub fn current_streak(vibes: &[Vibe]) -> u32 {
    let dates = distinct_dates(vibes);
    let mut iter = dates.iter().rev();
    let Some(mut previous) = iter.next().copied() else {
        return 0;
    };

    let mut streak = 1;
    for date in iter {
        if previous.pred_opt() == Some(*date) {
            streak += 1;
            previous = *date;
        } else {
            break;
        }
    }
    streak
}

/// Longest run of consecutive days anywhere in the history.
pub fn longest_streak(vibes: &[Vibe]) -> u32 {
    let dates = distinct_dates(vibes);
    let mut longest = 0;
    let mut streak = 0;
    let mut prev_date: Option<NaiveDate> = None;

    for date in dates {
        match prev_date {
            Some(prev) if prev.succ_opt() == Some(date) => streak += 1,
            _ => {
                longest = longest.max(streak);
                streak = 1;
            }
        }
        prev_date = Some(date);
    }
    longest.max(streak)
}

//! Period statistics computed from an in-memory, date-ordered slice of
//! vibes. Nothing here touches storage; empty or sparse input produces
//! placeholder messages instead of errors.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::vibe::Vibe;
use crate::services::period::{DateRange, Period};

pub const DEFAULT_TOP_ACTIVITIES: usize = 5;

/// Either a computed value or a human-readable reason it is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Insight<T> {
    Data(T),
    Placeholder(String),
}

impl<T> Insight<T> {
    fn placeholder(msg: &str) -> Self {
        Insight::Placeholder(msg.to_string())
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Insight::Data(value) => Some(value),
            Insight::Placeholder(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodCount {
    pub mood: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityCorrelation {
    pub activity: String,
    pub total_occurrences: usize,
    pub mood_distribution: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VibeStatistics {
    pub period: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_entries: usize,
    pub mood_distribution: Vec<MoodCount>,
    pub average_energy_level: f64,
    pub mood_patterns: Insight<BTreeMap<String, usize>>,
    pub mood_energy_correlation: Insight<BTreeMap<String, f64>>,
    pub activity_mood_correlation: Insight<Vec<ActivityCorrelation>>,
}

/// `vibes` must already be confined to `range` and sorted by date ascending.
pub fn compute_statistics(
    period: Period,
    range: DateRange,
    vibes: &[Vibe],
    top_activities: usize,
) -> VibeStatistics {
    let (mood_patterns, mood_energy_correlation, activity_mood_correlation) = if vibes.is_empty() {
        (
            Insight::placeholder("Not enough data for mood patterns."),
            Insight::placeholder("Not enough data for mood-energy correlation."),
            Insight::placeholder("Not enough data for activity-mood correlation."),
        )
    } else {
        (
            mood_patterns(vibes),
            mood_energy_correlation(vibes),
            activity_mood_correlation(vibes, top_activities),
        )
    };

    VibeStatistics {
        period: period.as_str().to_string(),
        start_date: range.start,
        end_date: range.end,
        total_entries: vibes.len(),
        mood_distribution: mood_distribution(vibes),
        average_energy_level: average_energy(vibes),
        mood_patterns,
        mood_energy_correlation,
        activity_mood_correlation,
    }
}

/// Entries per mood, most frequent first; ties ordered by mood name.
pub fn mood_distribution(vibes: &[Vibe]) -> Vec<MoodCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for vibe in vibes {
        *counts.entry(vibe.mood.as_str()).or_default() += 1;
    }

    let mut distribution: Vec<MoodCount> = counts
        .into_iter()
        .map(|(mood, count)| MoodCount {
            mood: mood.to_string(),
            count,
        })
        .collect();
    distribution.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.mood.cmp(&b.mood)));
    distribution
}

pub fn average_energy(vibes: &[Vibe]) -> f64 {
    if vibes.is_empty() {
        return 0.0;
    }
    let total: i64 = vibes.iter().map(|v| v.energy_level as i64).sum();
    total as f64 / vibes.len() as f64
}

/// Counts `"from -> to"` transitions between adjacent entries.
pub fn mood_patterns(vibes: &[Vibe]) -> Insight<BTreeMap<String, usize>> {
    if vibes.len() < 2 {
        return Insight::placeholder("Not enough data for mood patterns (need at least 2 entries).");
    }

    let mut patterns = BTreeMap::new();
    for pair in vibes.windows(2) {
        *patterns
            .entry(format!("{} -> {}", pair[0].mood, pair[1].mood))
            .or_default() += 1;
    }
    Insight::Data(patterns)
}

/// Mean energy level for each mood.
pub fn mood_energy_correlation(vibes: &[Vibe]) -> Insight<BTreeMap<String, f64>> {
    if vibes.is_empty() {
        return Insight::placeholder("Not enough data for mood-energy correlation.");
    }

    let mut sums: BTreeMap<&str, (i64, usize)> = BTreeMap::new();
    for vibe in vibes {
        let entry = sums.entry(vibe.mood.as_str()).or_default();
        entry.0 += vibe.energy_level as i64;
        entry.1 += 1;
    }

    Insight::Data(
        sums.into_iter()
            .map(|(mood, (sum, n))| (mood.to_string(), sum as f64 / n as f64))
            .collect(),
    )
}

/// Mood histogram for the `top_n` most frequent activities.
///
/// Activities are compared trimmed and lowercased. Equal counts keep the
/// order in which the activity was first seen.
pub fn activity_mood_correlation(
    vibes: &[Vibe],
    top_n: usize,
) -> Insight<Vec<ActivityCorrelation>> {
    if vibes.is_empty() {
        return Insight::placeholder("Not enough data for activity-mood correlation.");
    }

    let mut order: Vec<String> = Vec::new();
    let mut tallies: HashMap<String, ActivityCorrelation> = HashMap::new();

    for vibe in vibes {
        for raw in &vibe.activities {
            let activity = raw.trim().to_lowercase();
            if activity.is_empty() {
                continue;
            }
            let tally = tallies.entry(activity.clone()).or_insert_with(|| {
                order.push(activity.clone());
                ActivityCorrelation {
                    activity,
                    total_occurrences: 0,
                    mood_distribution: BTreeMap::new(),
                }
            });
            tally.total_occurrences += 1;
            *tally.mood_distribution.entry(vibe.mood.clone()).or_default() += 1;
        }
    }

    if order.is_empty() {
        return Insight::placeholder("No activities logged in the period.");
    }

    let mut ranked: Vec<ActivityCorrelation> = order
        .into_iter()
        .filter_map(|name| tallies.remove(&name))
        .collect();
    // stable: ties stay in first-seen order
    ranked.sort_by(|a, b| b.total_occurrences.cmp(&a.total_occurrences));
    ranked.truncate(top_n);
    Insight::Data(ranked)
}

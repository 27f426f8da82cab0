use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::models::vibe::Vibe;

/// How far back the heuristic looks, in days.
pub const LOOKBACK_DAYS: i64 = 90;

pub const MIN_ENERGY: i32 = 7;

pub const POSITIVE_MOODS: [&str; 5] = ["happy", "great", "energetic", "excited", "motivated"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub activity: Option<String>,
    pub suggestion: String,
    pub reason: String,
}

fn is_good_day(vibe: &Vibe) -> bool {
    vibe.energy_level >= MIN_ENERGY && POSITIVE_MOODS.contains(&vibe.mood.as_str())
}

/// Activities from positive, high-energy days. Repeats are kept so that
/// frequent activities are proportionally more likely to be picked.
pub fn candidate_activities(vibes: &[Vibe]) -> Vec<&str> {
    vibes
        .iter()
        .filter(|v| is_good_day(v))
        .flat_map(|v| v.activities.iter())
        .map(|a| a.as_str())
        .filter(|a| !a.trim().is_empty())
        .collect()
}

pub fn recommend<R: Rng + ?Sized>(vibes: &[Vibe], rng: &mut R) -> Recommendation {
    match candidate_activities(vibes).choose(rng) {
        Some(activity) => Recommendation {
            activity: Some(activity.to_string()),
            suggestion: format!("Based on past good days, you might enjoy: {activity}"),
            reason: "This activity was associated with high energy and positive mood in the past."
                .into(),
        },
        None => Recommendation {
            activity: None,
            suggestion: concat!(
                "No specific activity suggestions based on recent high-energy, positive vibes. ",
                "Maybe try something new today!"
            )
            .into(),
            reason: "Could not find relevant past activities.".into(),
        },
    }
}

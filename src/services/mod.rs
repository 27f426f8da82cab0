pub mod analytics;
pub mod cache;
pub mod export;
pub mod period;
pub mod recommendation;
pub mod streak;
pub mod vibe_service;

pub use vibe_service::{Streaks, VibeService};

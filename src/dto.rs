//! # Vibe tracker — Request/Response DTOs
//!
//! Conventions:
//! - `*Request`  → deserialized from client JSON body
//! - `*Query`    → deserialized from query params
//! - `*Response` → serialized to client JSON
//! - Field-level validation is expressed via `validator` derive macros;
//!   rules that need normalization first live in `VibeRequest::into_new_vibe`

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::vibe::{
    deserialize_calendar_date, NewVibe, Page, Sort, SortField, SortOrder, Vibe, VibeFilter,
};
use crate::services::export::ACTIVITY_SEPARATOR;
use crate::services::period::Period;

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

// ============================================================================
// Common
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Vibes
// ============================================================================

/// POST /api/v1/vibes and PUT /api/v1/vibes/{id} (full replace)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VibeRequest {
    #[serde(deserialize_with = "deserialize_calendar_date")]
    pub date: NaiveDate,

    #[validate(length(min = 1, max = 64, message = "Mood must be 1-64 characters"))]
    pub mood: String,

    #[validate(range(min = 1, max = 10, message = "Energy level must be between 1 and 10"))]
    pub energy_level: i32,

    #[validate(length(max = 5000, message = "Notes must be under 5000 characters"))]
    pub notes: Option<String>,

    #[serde(default)]
    #[validate(length(max = 50, message = "At most 50 activities per entry"))]
    pub activities: Vec<String>,
}

impl VibeRequest {
    /// Validate, then trim + lowercase the mood and drop blank activities.
    /// Activities may not contain the CSV export's list separator.
    pub fn into_new_vibe(self) -> AppResult<NewVibe> {
        self.validate()?;
        let mood = self.mood.trim().to_lowercase();
        if mood.is_empty() {
            return Err(AppError::Validation("Mood cannot be empty".into()));
        }

        let activities: Vec<String> = self
            .activities
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if let Some(bad) = activities.iter().find(|a| a.contains(ACTIVITY_SEPARATOR)) {
            return Err(AppError::Validation(format!(
                "Activity '{bad}' must not contain '{ACTIVITY_SEPARATOR}'"
            )));
        }

        Ok(NewVibe {
            date: self.date,
            mood,
            energy_level: self.energy_level,
            notes: self.notes.filter(|n| !n.trim().is_empty()),
            activities,
        })
    }
}

/// GET /api/v1/vibes
#[derive(Debug, Default, Deserialize)]
pub struct ListVibesQuery {
    /// YYYY-MM-DD
    pub date: Option<String>,
    pub mood: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ListVibesQuery {
    pub fn filter(&self) -> Result<VibeFilter, String> {
        parse_filter(self.date.as_deref(), self.mood.as_deref())
    }

    /// Out-of-range limits reset to the default rather than clamping.
    pub fn page(&self) -> Page {
        let limit = match self.limit {
            Some(l) if l > 0 && l <= MAX_LIMIT => l,
            _ => DEFAULT_LIMIT,
        };
        let offset = self.offset.filter(|o| *o >= 0).unwrap_or(0);
        Page { limit, offset }
    }

    pub fn sort(&self) -> Sort {
        Sort::new(
            self.sort_by.as_deref().map(SortField::parse).unwrap_or_default(),
            SortOrder::parse_or(self.sort_order.as_deref(), SortOrder::Desc),
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaginatedVibesResponse {
    pub data: Vec<Vibe>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub page: i64,
    pub total_pages: i64,
}

impl PaginatedVibesResponse {
    pub fn new(data: Vec<Vibe>, total: i64, page: Page) -> Self {
        let total_pages = if total > 0 {
            (total + page.limit - 1) / page.limit
        } else {
            0
        };
        Self {
            data,
            total,
            limit: page.limit,
            offset: page.offset,
            page: page.offset / page.limit + 1,
            total_pages,
        }
    }
}

/// POST /api/v1/vibes/bulk response
#[derive(Debug, Serialize, Deserialize)]
pub struct BulkImportResponse {
    pub message: String,
    pub imported_count: u64,
}

// ============================================================================
// Analytics
// ============================================================================

/// GET /api/v1/vibes/stats
#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// "week", "month" or "year". Default: "month"
    pub period: Option<String>,
}

impl StatsQuery {
    /// A missing or blank period takes the resolver's fallback; any other
    /// unrecognized token is an error.
    pub fn period(&self) -> Result<Period, String> {
        match self.period.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => Period::from_token(token)
                .ok_or_else(|| "Invalid period. Allowed values: week, month, year.".to_string()),
            other => Ok(Period::parse(other.unwrap_or_default())),
        }
    }
}

/// GET /api/v1/vibes/streak
#[derive(Debug, Deserialize)]
pub struct StreakQuery {
    pub mood: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StreakResponse {
    pub mood: String,
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// GET /api/v1/vibes/export
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// "csv" or "json", required
    pub format: Option<String>,
    pub date: Option<String>,
    pub mood: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ExportQuery {
    pub fn filter(&self) -> Result<VibeFilter, String> {
        parse_filter(self.date.as_deref(), self.mood.as_deref())
    }

    /// Exports default to oldest first.
    pub fn sort(&self) -> Sort {
        Sort::new(
            self.sort_by.as_deref().map(SortField::parse).unwrap_or_default(),
            SortOrder::parse_or(self.sort_order.as_deref(), SortOrder::Asc),
        )
    }
}

// ============================================================================
// System
// ============================================================================

/// GET /health
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub server_status: String,
    pub database_status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

fn parse_filter(date: Option<&str>, mood: Option<&str>) -> Result<VibeFilter, String> {
    let date = match date.filter(|d| !d.trim().is_empty()) {
        Some(raw) => Some(NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
            "Invalid date format for 'date' query parameter. Use YYYY-MM-DD.".to_string()
        })?),
        None => None,
    };
    let mood = mood
        .map(|m| m.trim().to_lowercase())
        .filter(|m| !m.is_empty());
    Ok(VibeFilter { date, mood })
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Vibe {
    pub id: i64,
    pub date: NaiveDate,
    pub mood: String,
    pub energy_level: i32,
    pub notes: Option<String>,
    pub activities: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A validated, normalized entry ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVibe {
    pub date: NaiveDate,
    pub mood: String,
    pub energy_level: i32,
    pub notes: Option<String>,
    pub activities: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VibeFilter {
    pub date: Option<NaiveDate>,
    pub mood: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    Date,
    Mood,
    EnergyLevel,
    CreatedAt,
    UpdatedAt,
    Id,
}

impl SortField {
    /// Unknown fields fall back to `date`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "mood" => Self::Mood,
            "energy_level" => Self::EnergyLevel,
            "created_at" => Self::CreatedAt,
            "updated_at" => Self::UpdatedAt,
            "id" => Self::Id,
            _ => Self::Date,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Mood => "mood",
            Self::EnergyLevel => "energy_level",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Id => "id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse_or(raw: Option<&str>, default: SortOrder) -> Self {
        match raw.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("asc") => Self::Asc,
            Some("desc") => Self::Desc,
            _ => default,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub order: SortOrder,
}

impl Sort {
    pub fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp; time-of-day is dropped.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

pub fn deserialize_calendar_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_calendar_date(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!(
            "invalid date '{raw}', expected YYYY-MM-DD or an RFC 3339 timestamp"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_dates_and_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(parse_calendar_date("2024-03-09"), Some(expected));
        assert_eq!(parse_calendar_date("2024-03-09T22:15:00Z"), Some(expected));
        assert_eq!(parse_calendar_date("2024-03-09T08:00:00+02:00"), Some(expected));
        assert_eq!(parse_calendar_date("09/03/2024"), None);
    }

    #[test]
    fn unknown_sort_field_falls_back_to_date() {
        assert_eq!(SortField::parse("energy_level"), SortField::EnergyLevel);
        assert_eq!(SortField::parse("date; DROP TABLE vibes"), SortField::Date);
    }

    #[test]
    fn sort_order_uses_default_for_garbage() {
        assert_eq!(SortOrder::parse_or(Some("ASC"), SortOrder::Desc), SortOrder::Asc);
        assert_eq!(SortOrder::parse_or(Some("sideways"), SortOrder::Desc), SortOrder::Desc);
        assert_eq!(SortOrder::parse_or(None, SortOrder::Asc), SortOrder::Asc);
    }
}

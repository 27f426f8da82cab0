use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Week,
    Month,
    Year,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::Week, Period::Month, Period::Year];

    /// Strict parse, `None` for anything but week/month/year.
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_lowercase().as_str() {
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "year" => Some(Self::Year),
            _ => None,
        }
    }

    /// Total parse: unrecognized tokens resolve to `Month`.
    pub fn parse(token: &str) -> Self {
        Self::from_token(token).unwrap_or(Self::Month)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

/// Inclusive calendar-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn resolve(today: NaiveDate, period: Period) -> Self {
        match period {
            Period::Week => {
                let start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
                Self {
                    start,
                    end: start + Duration::days(6),
                }
            }
            Period::Month => {
                let start = today.with_day(1).unwrap_or(today);
                Self {
                    start,
                    end: last_day_of_month(start),
                }
            }
            Period::Year => Self {
                start: NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
                end: NaiveDate::from_ymd_opt(today.year(), 12, 31).unwrap_or(today),
            },
        }
    }

    /// `[today - days, today]`
    pub fn trailing_days(today: NaiveDate, days: i64) -> Self {
        Self {
            start: today - Duration::days(days),
            end: today,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

fn last_day_of_month(first: NaiveDate) -> NaiveDate {
    let (year, month) = if first.month() == 12 {
        (first.year() + 1, 1)
    } else {
        (first.year(), first.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|next| next.pred_opt())
        .unwrap_or(first)
}

use std::str::FromStr;

use anyhow::Context;
use chrono::{NaiveDate, NaiveTime, SecondsFormat};

use crate::error::{AppError, AppResult};
use crate::models::vibe::{parse_calendar_date, Vibe};

const CSV_HEADER: [&str; 6] = ["ID", "Date", "Mood", "EnergyLevel", "Notes", "Activities"];
/// Joins activities inside the single CSV `Activities` column.
pub const ACTIVITY_SEPARATOR: &str = ";";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "" => Err(AppError::BadRequest(
                "Missing 'format' query parameter (csv or json)".into(),
            )),
            other => Err(AppError::BadRequest(format!(
                "Unsupported export format '{other}'. Must be 'csv' or 'json'"
            ))),
        }
    }
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Json => "application/json",
        }
    }

    pub fn filename(self) -> &'static str {
        match self {
            Self::Csv => "vibes_export.csv",
            Self::Json => "vibes_export.json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub format: ExportFormat,
    pub body: Vec<u8>,
}

impl ExportedFile {
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename=\"{}\"", self.format.filename())
    }
}

pub fn export(vibes: &[Vibe], format: ExportFormat) -> AppResult<ExportedFile> {
    let body = match format {
        ExportFormat::Csv => to_csv(vibes)?,
        ExportFormat::Json => serde_json::to_vec(vibes).context("serializing vibes to JSON")?,
    };
    Ok(ExportedFile { format, body })
}

/// Midnight UTC of the entry's date, e.g. `2024-01-01T00:00:00Z`.
pub fn csv_timestamp(date: NaiveDate) -> String {
    date.and_time(NaiveTime::MIN)
        .and_utc()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn to_csv(vibes: &[Vibe]) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for vibe in vibes {
        let activities = vibe.activities.join(ACTIVITY_SEPARATOR);
        writer.write_record([
            vibe.id.to_string(),
            csv_timestamp(vibe.date),
            vibe.mood.clone(),
            vibe.energy_level.to_string(),
            vibe.notes.clone().unwrap_or_default(),
            activities,
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV export: {}", e.error()))
}

/// One row of a CSV export read back.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRow {
    pub id: i64,
    pub date: NaiveDate,
    pub mood: String,
    pub energy_level: i32,
    pub notes: Option<String>,
    pub activities: Vec<String>,
}

pub fn parse_csv(data: &[u8]) -> anyhow::Result<Vec<CsvRow>> {
    let mut reader = csv::Reader::from_reader(data);
    let mut rows = Vec::new();

    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("reading CSV row {}", line + 1))?;
        let field = |i: usize| record.get(i).unwrap_or_default();

        let date = parse_calendar_date(field(1))
            .with_context(|| format!("invalid date on row {}", line + 1))?;
        let notes = field(4);
        let activities = field(5);

        rows.push(CsvRow {
            id: field(0).parse().with_context(|| format!("invalid id on row {}", line + 1))?,
            date,
            mood: field(2).to_string(),
            energy_level: field(3)
                .parse()
                .with_context(|| format!("invalid energy level on row {}", line + 1))?,
            notes: (!notes.is_empty()).then(|| notes.to_string()),
            activities: if activities.is_empty() {
                Vec::new()
            } else {
                activities.split(ACTIVITY_SEPARATOR).map(String::from).collect()
            },
        });
    }
    Ok(rows)
}

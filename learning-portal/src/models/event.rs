use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// ISO-8601 timestamps as the API sends them.
    pub start_time: String,
    pub end_time: String,
}

impl Event {
    /// Whether `day` falls within the event's start..=end dates.
    pub fn spans(&self, day: NaiveDate) -> bool {
        match (date_of(&self.start_time), date_of(&self.end_time)) {
            (Some(start), Some(end)) => start <= day && day <= end,
            _ => false,
        }
    }
}

/// Body of `POST admin/events/add/`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub start_time: String,
    pub end_time: String,
}

fn date_of(timestamp: &str) -> Option<NaiveDate> {
    let date = timestamp.split('T').next()?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Parse an API timestamp or a `datetime-local` form value.
pub fn parse_timestamp(timestamp: &str) -> Option<NaiveDateTime> {
    let timestamp = timestamp.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(parsed.naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(timestamp, format).ok())
}

/// Display form of a timestamp; unparseable values are shown as sent.
pub fn format_timestamp(timestamp: &str) -> String {
    parse_timestamp(timestamp)
        .map(|t| t.format("%b %-d, %Y %H:%M").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

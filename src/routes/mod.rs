pub mod participants;
pub mod trips;

use axum::Router;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub(crate) const GENERIC_FAILURE: &str = "something went wrong, try again";

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(trips::router())
        .merge(participants::router())
        .with_state(state)
}

/// Parses a path id before anything touches the store; the normalized
/// hyphenated form is what gets persisted and queried.
pub(crate) fn parse_id(raw: &str) -> Result<String, AppError> {
    Uuid::parse_str(raw)
        .map(|id| id.to_string())
        .map_err(|err| AppError::BadRequest(format!("invalid uuid passed: {err}")))
}

/// Accepts RFC 3339 timestamps as well as bare `YYYY-MM-DD` dates, which
/// are read as midnight UTC.
pub(crate) fn deserialize_loose_datetime<'de, D>(
    deserializer: D,
) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_loose_datetime(&raw).map_err(serde::de::Error::custom)
}

fn parse_loose_datetime(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(format!(
        "invalid timestamp {raw:?}, expected RFC 3339 or YYYY-MM-DD"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parse_id_normalizes_valid_uuids() {
        let id = parse_id("67E55044-10B1-426F-9247-BB680E5FE0C8").expect("valid uuid");
        assert_eq!(id, "67e55044-10b1-426f-9247-bb680e5fe0c8");
    }

    #[test]
    fn parse_id_rejects_garbage() {
        let err = parse_id("not-a-uuid").unwrap_err();
        assert!(err.to_string().starts_with("invalid uuid passed"));
    }

    #[test]
    fn loose_datetime_accepts_rfc3339() {
        let ts = parse_loose_datetime("2025-06-01T14:30:00Z").expect("rfc3339");
        assert_eq!(ts.hour(), 14);
    }

    #[test]
    fn loose_datetime_accepts_bare_dates_as_midnight_utc() {
        let ts = parse_loose_datetime("2025-06-01").expect("bare date");
        assert_eq!(ts.to_rfc3339(), "2025-06-01T00:00:00+00:00");
    }

    #[test]
    fn loose_datetime_rejects_other_formats() {
        assert!(parse_loose_datetime("01/06/2025").is_err());
        assert!(parse_loose_datetime("").is_err());
    }
}

//! Reservation records as the backend stores them, and their parsed form.
//!
//! A [`RawReservation`] is one stored series exactly as it crosses the wire:
//! timestamps are strings, the recurrence type is a free-form string. A
//! [`ReservationDefinition`] is the typed, validated-interval form the rest of
//! the engine works with.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::dst::{resolve_local, DstPolicy};
use crate::error::{EngineError, Result};

/// Opaque record identifier. The backend emits either integers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

pub type ReservationId = RecordId;
pub type RoomId = RecordId;

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Int(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Text(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId::Text(s)
    }
}

/// How a series repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum RecurrenceType {
    None,
    Daily,
    /// Also the decoding fallback for unknown or missing values.
    #[default]
    Weekly,
    Biweekly,
    Monthly,
}

impl RecurrenceType {
    /// Decode a stored recurrence type. Anything unrecognized is weekly.
    pub fn decode(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "none" => RecurrenceType::None,
            "daily" => RecurrenceType::Daily,
            "weekly" => RecurrenceType::Weekly,
            "biweekly" => RecurrenceType::Biweekly,
            "monthly" => RecurrenceType::Monthly,
            _ => RecurrenceType::Weekly,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecurrenceType::None => "none",
            RecurrenceType::Daily => "daily",
            RecurrenceType::Weekly => "weekly",
            RecurrenceType::Biweekly => "biweekly",
            RecurrenceType::Monthly => "monthly",
        }
    }

    /// Upper bound on generated occurrences, roughly one year of the cadence.
    pub fn max_occurrences(self) -> u32 {
        match self {
            RecurrenceType::Daily => 365,
            RecurrenceType::Monthly => 12,
            RecurrenceType::None | RecurrenceType::Weekly | RecurrenceType::Biweekly => 52,
        }
    }
}

impl From<String> for RecurrenceType {
    fn from(raw: String) -> Self {
        RecurrenceType::decode(&raw)
    }
}

impl fmt::Display for RecurrenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approval state of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "Option<String>")]
pub enum ReservationStatus {
    #[default]
    Pending,
    ProfessorApproved,
    Approved,
    Rejected,
    Cancelled,
}

impl ReservationStatus {
    /// Decode a stored status. Unknown values are pending, so they never
    /// hold a room.
    pub fn decode(raw: &str) -> Self {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "professorapproved" => ReservationStatus::ProfessorApproved,
            "approved" => ReservationStatus::Approved,
            "rejected" => ReservationStatus::Rejected,
            "cancelled" | "canceled" => ReservationStatus::Cancelled,
            _ => ReservationStatus::Pending,
        }
    }

    /// Only approved reservations block other bookings. Pending ones are
    /// shown on calendars but do not hold the room.
    pub fn is_blocking(self) -> bool {
        self == ReservationStatus::Approved
    }
}

impl From<Option<String>> for ReservationStatus {
    fn from(raw: Option<String>) -> Self {
        raw.as_deref().map(Self::decode).unwrap_or_default()
    }
}

/// A reservation series as stored by the backend.
///
/// Only `id` and `room_id` are required to decode. Missing or `null`
/// timestamps are reported by [`ReservationDefinition::parse`], so a batch
/// can skip the row instead of failing as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReservation {
    pub id: ReservationId,
    #[serde(alias = "roomId")]
    pub room_id: RoomId,
    #[serde(default, alias = "startTime", alias = "start")]
    pub start_time: Option<String>,
    #[serde(default, alias = "endTime", alias = "end")]
    pub end_time: Option<String>,
    #[serde(default, alias = "isRecurring", deserialize_with = "null_as_default")]
    pub is_recurring: bool,
    #[serde(default, alias = "recurrenceType")]
    pub recurrence_type: Option<String>,
    #[serde(default, alias = "recurrenceEndDate")]
    pub recurrence_end_date: Option<String>,
    #[serde(default)]
    pub status: ReservationStatus,
}

/// A parsed reservation series. The first occurrence is `[start, end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationDefinition {
    pub id: ReservationId,
    pub room_id: RoomId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_recurring: bool,
    /// `None` when the record carried no recurrence type at all.
    pub recurrence_type: Option<RecurrenceType>,
    /// Last calendar day (room timezone) on which an occurrence may start.
    pub recurrence_end_date: Option<NaiveDate>,
    pub status: ReservationStatus,
}

impl ReservationDefinition {
    /// A single, non-recurring, pending reservation.
    pub fn new(
        id: impl Into<ReservationId>,
        room_id: impl Into<RoomId>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            room_id: room_id.into(),
            start,
            end,
            is_recurring: false,
            recurrence_type: None,
            recurrence_end_date: None,
            status: ReservationStatus::Pending,
        }
    }

    /// Turn this reservation into a series repeating until `end_date`.
    pub fn recurring(mut self, kind: RecurrenceType, end_date: NaiveDate) -> Self {
        self.is_recurring = true;
        self.recurrence_type = Some(kind);
        self.recurrence_end_date = Some(end_date);
        self
    }

    pub fn with_status(mut self, status: ReservationStatus) -> Self {
        self.status = status;
        self
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }

    /// Parse a stored record. Naive timestamps are wall-clock time in `tz`.
    ///
    /// An unparseable recurrence end date is dropped (the series then renders
    /// as a single reservation); only the interval itself is fatal.
    ///
    /// # Errors
    /// Returns `EngineError::MalformedInterval` if the start or end cannot be
    /// parsed, or if the end is not after the start.
    pub fn parse(raw: &RawReservation, tz: &Tz) -> Result<Self> {
        let malformed = |reason: String| EngineError::MalformedInterval {
            id: raw.id.to_string(),
            reason,
        };

        let field = |value: &Option<String>, name: &str| match value.as_deref() {
            None => Err(malformed(format!("missing {}", name))),
            Some(s) => parse_timestamp(s, tz)
                .ok_or_else(|| malformed(format!("unparseable {} '{}'", name, s))),
        };
        let start = field(&raw.start_time, "start")?;
        let end = field(&raw.end_time, "end")?;
        if end <= start {
            return Err(malformed(format!("end {} is not after start {}", end, start)));
        }

        let recurrence_end_date = match raw.recurrence_end_date.as_deref() {
            None => None,
            Some(s) if s.trim().is_empty() => None,
            Some(s) => {
                let parsed = parse_date(s, tz);
                if parsed.is_none() {
                    tracing::warn!(
                        reservation = %raw.id,
                        value = s,
                        "ignoring unparseable recurrence end date"
                    );
                }
                parsed
            }
        };

        let recurrence_type = raw
            .recurrence_type
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(RecurrenceType::decode);

        Ok(Self {
            id: raw.id.clone(),
            room_id: raw.room_id.clone(),
            start,
            end,
            is_recurring: raw.is_recurring,
            recurrence_type,
            recurrence_end_date,
            status: raw.status,
        })
    }
}

/// Parse every record, dropping the malformed ones.
///
/// Returns the parsed definitions in input order and the number skipped.
pub fn parse_all(raws: &[RawReservation], tz: &Tz) -> (Vec<ReservationDefinition>, usize) {
    let mut parsed = Vec::with_capacity(raws.len());
    let mut skipped = 0;

    for raw in raws {
        match ReservationDefinition::parse(raw, tz) {
            Ok(def) => parsed.push(def),
            Err(e) => {
                tracing::warn!("skipping reservation: {}", e);
                skipped += 1;
            }
        }
    }

    (parsed, skipped)
}

/// Decode a JSON document holding one record or an array of them.
///
/// Array elements that do not decode as a [`RawReservation`] (no id, a
/// timestamp that is not a string, ...) are dropped and counted, like rows
/// [`parse_all`] rejects.
///
/// # Errors
/// Returns `EngineError::InvalidRecords` if the document is not JSON, or is
/// neither an object nor an array.
pub fn decode_records(json: &str) -> Result<(Vec<RawReservation>, usize)> {
    let document: Value =
        serde_json::from_str(json).map_err(|e| EngineError::InvalidRecords(e.to_string()))?;

    if document.is_object() {
        let raw = serde_json::from_value(document)
            .map_err(|e| EngineError::InvalidRecords(e.to_string()))?;
        return Ok((vec![raw], 0));
    }
    let rows = match document {
        Value::Array(rows) => rows,
        other => {
            return Err(EngineError::InvalidRecords(format!(
                "expected an object or an array, got {}",
                other
            )))
        }
    };

    let mut records = Vec::with_capacity(rows.len());
    let mut rejected = 0;
    for (index, row) in rows.into_iter().enumerate() {
        match serde_json::from_value::<RawReservation>(row) {
            Ok(raw) => records.push(raw),
            Err(e) => {
                tracing::warn!(index, "skipping undecodable reservation: {}", e);
                rejected += 1;
            }
        }
    }
    Ok((records, rejected))
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO 8601 timestamp into an absolute instant.
///
/// Accepts RFC 3339 (e.g., "2024-03-04T08:00:00-03:00"), Postgres-style
/// offsets (e.g., "2024-03-04 08:00:00+00"), and naive local time
/// (e.g., "2024-03-04T08:00"), which is interpreted in `tz`.
pub fn parse_timestamp(s: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .and_then(|local| resolve_local(tz, local, DstPolicy::ShiftForward))
}

/// Parse a calendar date.
///
/// A leading `YYYY-MM-DD` is taken literally, so "2024-03-25T00:00:00.000Z"
/// is March 25 in every timezone. Other timestamps are reduced to their date
/// in `tz`.
pub fn parse_date(s: &str, tz: &Tz) -> Option<NaiveDate> {
    let s = s.trim();
    s.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .or_else(|| parse_timestamp(s, tz).map(|dt| dt.with_timezone(tz).date_naive()))
}

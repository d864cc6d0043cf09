//! Calendar and list views over a room's reservations.
//!
//! Expands stored series into the occurrences visible in a date window, and
//! provides the room/status pre-filter that conflict checks expect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::expander::{expand, Occurrence};
use crate::model::{ReservationDefinition, ReservationId, ReservationStatus, RoomId};

/// An occurrence placed on a calendar, with the series fields views need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    #[serde(flatten)]
    pub occurrence: Occurrence,
    pub room_id: RoomId,
    pub status: ReservationStatus,
}

/// The approved reservations holding `room_id`, optionally leaving out the
/// series being edited.
pub fn blocking_for_room(
    defs: &[ReservationDefinition],
    room_id: &RoomId,
    exclude: Option<&ReservationId>,
) -> Vec<ReservationDefinition> {
    defs.iter()
        .filter(|d| d.status.is_blocking() && &d.room_id == room_id)
        .filter(|d| exclude != Some(&d.id))
        .cloned()
        .collect()
}

/// Expand every definition and keep the occurrences overlapping
/// `[window_start, window_end)`, sorted by start time.
///
/// Ties are broken by end time, then occurrence key, so the output is stable
/// regardless of input order.
pub fn occurrences_in_window(
    defs: &[ReservationDefinition],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    config: &EngineConfig,
) -> Vec<CalendarEntry> {
    if window_start >= window_end {
        return Vec::new();
    }

    let mut entries: Vec<CalendarEntry> = defs
        .iter()
        .flat_map(|def| {
            expand(def, config).map(move |occurrence| CalendarEntry {
                occurrence,
                room_id: def.room_id.clone(),
                status: def.status,
            })
        })
        .filter(|e| e.occurrence.start < window_end && e.occurrence.end > window_start)
        .collect();

    entries.sort_by(|a, b| {
        (a.occurrence.start, a.occurrence.end)
            .cmp(&(b.occurrence.start, b.occurrence.end))
            .then_with(|| a.occurrence.occurrence_key.cmp(&b.occurrence.occurrence_key))
    });
    entries
}

//! Detect overlapping occurrences between a candidate reservation and the
//! approved reservations already holding a room.
//!
//! Two occurrences overlap when `a.start < b.end && a.end > b.start`. Adjacent
//! occurrences (one ends exactly when the other starts) are NOT conflicts.
//!
//! [`find_conflicts`] does not filter by room or status: callers hand in the
//! approved reservations of the candidate's room (see
//! [`blocking_for_room`]). [`check_conflicts`] applies that filter itself
//! according to a [`ConflictScope`].

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::calendar::blocking_for_room;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::expander::{expand, expand_all, Occurrence};
use crate::model::{parse_all, RawReservation, ReservationDefinition, ReservationId};

/// How many conflict messages the reservation form shows at once.
pub const DEFAULT_DISPLAY_LIMIT: usize = 5;

/// A candidate occurrence overlapping an existing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub candidate: Occurrence,
    pub existing: Occurrence,
    pub existing_source_id: ReservationId,
    pub overlap_minutes: i64,
}

impl Conflict {
    /// User-facing description naming the date and both time ranges,
    /// rendered in `tz`.
    pub fn describe(&self, tz: &Tz) -> String {
        let range = |o: &Occurrence| {
            format!(
                "{}-{}",
                o.start.with_timezone(tz).format("%H:%M"),
                o.end.with_timezone(tz).format("%H:%M")
            )
        };
        format!(
            "Conflict on {}: requested {} overlaps reservation {} ({})",
            self.candidate.date.format("%Y-%m-%d"),
            range(&self.candidate),
            self.existing_source_id,
            range(&self.existing)
        )
    }
}

/// Result of scanning wire records for conflicts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub conflicts: Vec<Conflict>,
    /// Existing records dropped because their interval could not be parsed.
    pub skipped: usize,
}

impl ConflictReport {
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    /// Describe at most `limit` conflicts, in report order.
    pub fn messages(&self, limit: usize, tz: &Tz) -> Vec<String> {
        self.conflicts
            .iter()
            .take(limit)
            .map(|c| c.describe(tz))
            .collect()
    }
}

/// Half-open interval overlap test.
pub fn overlaps(a: &Occurrence, b: &Occurrence) -> bool {
    a.start < b.end && a.end > b.start
}

/// Find every overlapping (candidate occurrence, existing occurrence) pair.
///
/// Conflicts are ordered by candidate occurrence, then by the order of the
/// existing occurrences (definition order, then date).
pub fn find_conflicts(
    candidate: &ReservationDefinition,
    existing: &[ReservationDefinition],
    config: &EngineConfig,
) -> Vec<Conflict> {
    let pool: Vec<Occurrence> = existing
        .iter()
        .flat_map(|def| expand(def, config))
        .collect();

    let mut conflicts = Vec::new();
    for c in expand(candidate, config) {
        for e in &pool {
            if overlaps(&c, e) {
                let overlap_start = c.start.max(e.start);
                let overlap_end = c.end.min(e.end);
                conflicts.push(Conflict {
                    candidate: c.clone(),
                    existing: e.clone(),
                    existing_source_id: e.source_id.clone(),
                    overlap_minutes: (overlap_end - overlap_start).num_minutes(),
                });
            }
        }
    }

    tracing::debug!(
        candidate = %candidate.id,
        existing = existing.len(),
        conflicts = conflicts.len(),
        "conflict scan finished"
    );
    conflicts
}

/// Whether any candidate occurrence overlaps any existing one.
///
/// Stops at the first overlap; meant for live form validation.
pub fn has_conflict(
    candidate: &ReservationDefinition,
    existing: &[ReservationDefinition],
    config: &EngineConfig,
) -> bool {
    let candidates = expand_all(candidate, config);
    existing
        .iter()
        .flat_map(|def| expand(def, config))
        .any(|e| candidates.iter().any(|c| overlaps(c, &e)))
}

/// Which existing reservations a wire-record conflict check looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConflictScope {
    /// Approved reservations in the candidate's room, leaving out the
    /// candidate's own series.
    #[default]
    Room,
    /// Like `Room`, but leaving out the given series instead.
    RoomExcluding(ReservationId),
    /// Every given reservation, whatever its room or status.
    All,
}

/// Scan wire records for conflicts with a candidate record.
///
/// Existing records whose interval cannot be parsed are skipped and counted
/// in [`ConflictReport::skipped`]; one bad row must not block checking the
/// whole room.
///
/// # Errors
/// Returns `EngineError::MalformedInterval` if the candidate itself cannot be
/// parsed.
pub fn check_conflicts(
    candidate: &RawReservation,
    existing: &[RawReservation],
    scope: &ConflictScope,
    config: &EngineConfig,
) -> Result<ConflictReport> {
    let candidate = ReservationDefinition::parse(candidate, &config.timezone)?;
    let (existing, skipped) = parse_all(existing, &config.timezone);
    if skipped > 0 {
        tracing::warn!(
            candidate = %candidate.id,
            skipped,
            "skipped malformed reservations during conflict check"
        );
    }

    let pool = match scope {
        ConflictScope::All => existing,
        ConflictScope::Room => blocking_for_room(&existing, &candidate.room_id, Some(&candidate.id)),
        ConflictScope::RoomExcluding(id) => {
            blocking_for_room(&existing, &candidate.room_id, Some(id))
        }
    };

    Ok(ConflictReport {
        conflicts: find_conflicts(&candidate, &pool, config),
        skipped,
    })
}

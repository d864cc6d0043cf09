//! DST transition policies for recurring reservations.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Policy for occurrences whose wall-clock start falls in a DST gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstPolicy {
    /// Drop occurrences that fall in the gap (e.g., 02:30 during spring forward).
    Skip,
    /// Move to the same wall-clock time one hour later, past the gap.
    #[default]
    ShiftForward,
}

impl std::str::FromStr for DstPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "skip" => Ok(DstPolicy::Skip),
            "shift_forward" => Ok(DstPolicy::ShiftForward),
            other => Err(format!(
                "unknown DST policy '{}' (expected skip or shift-forward)",
                other
            )),
        }
    }
}

/// Resolve a wall-clock datetime in `tz` to an absolute instant.
///
/// Ambiguous times (fall-back fold) take the earlier instant. Nonexistent
/// times (spring-forward gap) follow `policy`; `None` means the occurrence
/// is dropped.
pub fn resolve_local(tz: &Tz, local: NaiveDateTime, policy: DstPolicy) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => match policy {
            DstPolicy::Skip => None,
            DstPolicy::ShiftForward => {
                // Gaps in the tz database are at most one hour for civil zones.
                tz.from_local_datetime(&(local + Duration::hours(1)))
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
            }
        },
    }
}

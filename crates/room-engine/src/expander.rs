//! Occurrence expansion -- turns a reservation series into concrete dated intervals.
//!
//! Expansion is computed in the configured room timezone: each occurrence keeps
//! the wall-clock start time of the first one and the same duration, placed on
//! successive calendar dates. The n-th date is derived from the first date
//! directly (never by accumulating steps), so month arithmetic does not drift.

use std::iter::FusedIterator;

use chrono::{DateTime, Days, Duration, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::dst::resolve_local;
use crate::model::{RecurrenceType, ReservationDefinition, ReservationId};

/// One concrete, dated instance of a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub source_id: ReservationId,
    /// `"{source_id}_{YYYY-MM-DD}"`, unique among the source's occurrences.
    pub occurrence_key: String,
    /// Calendar date of `start` in the room timezone.
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_recurrence_instance: bool,
}

impl Occurrence {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

pub fn occurrence_key(source_id: &ReservationId, date: NaiveDate) -> String {
    format!("{}_{}", source_id, date.format("%Y-%m-%d"))
}

impl RecurrenceType {
    /// Date of the `n`-th occurrence counting from `anchor` (n = 0 is the anchor).
    ///
    /// Monthly steps clamp to the last day of shorter months, so a series
    /// anchored on the 31st lands on Feb 29, Mar 31, Apr 30, ...
    pub fn nth_date(self, anchor: NaiveDate, n: u32) -> Option<NaiveDate> {
        let days = match self {
            RecurrenceType::Daily => 1,
            RecurrenceType::Biweekly => 14,
            RecurrenceType::Monthly => return anchor.checked_add_months(Months::new(n)),
            // Unset and unknown recurrence types step weekly.
            RecurrenceType::None | RecurrenceType::Weekly => 7,
        };
        anchor.checked_add_days(Days::new(u64::from(n) * days))
    }
}

#[derive(Debug, Clone)]
struct Series {
    kind: RecurrenceType,
    anchor: NaiveDate,
    time_of_day: NaiveTime,
    until: NaiveDate,
    max: u32,
}

/// Lazy, finite sequence of a definition's occurrences, ascending by date.
///
/// Cloning an unstarted `Occurrences` gives an independent iterator over the
/// same sequence.
#[derive(Debug, Clone)]
pub struct Occurrences<'a> {
    def: &'a ReservationDefinition,
    config: EngineConfig,
    series: Option<Series>,
    index: u32,
    emitted: u32,
    done: bool,
}

/// Expand a reservation into its occurrences.
///
/// - Non-recurring definitions, and recurring ones without an end date, yield
///   exactly the source interval with `is_recurrence_instance = false`.
/// - Recurring definitions yield one occurrence per step while the date is on
///   or before `recurrence_end_date`, capped at
///   [`RecurrenceType::max_occurrences`].
/// - A series that produces nothing (end date before the start date, or every
///   date dropped by [`DstPolicy::Skip`](crate::dst::DstPolicy::Skip)) falls
///   back to the source interval and logs a warning.
pub fn expand<'a>(def: &'a ReservationDefinition, config: &EngineConfig) -> Occurrences<'a> {
    let series = match (def.is_recurring, def.recurrence_end_date) {
        (true, Some(until)) => {
            let kind = def.recurrence_type.unwrap_or_default();
            let local_start = def.start.with_timezone(&config.timezone);
            Some(Series {
                kind,
                anchor: local_start.date_naive(),
                time_of_day: local_start.time(),
                until,
                max: kind.max_occurrences(),
            })
        }
        _ => None,
    };

    Occurrences {
        def,
        config: *config,
        series,
        index: 0,
        emitted: 0,
        done: false,
    }
}

/// Expand a reservation and collect the occurrences.
pub fn expand_all(def: &ReservationDefinition, config: &EngineConfig) -> Vec<Occurrence> {
    let occurrences: Vec<Occurrence> = expand(def, config).collect();
    tracing::debug!(
        reservation = %def.id,
        count = occurrences.len(),
        "expanded reservation"
    );
    occurrences
}

impl Occurrences<'_> {
    fn source_interval(&self) -> Occurrence {
        let date = self
            .def
            .start
            .with_timezone(&self.config.timezone)
            .date_naive();
        Occurrence {
            source_id: self.def.id.clone(),
            occurrence_key: occurrence_key(&self.def.id, date),
            date,
            start: self.def.start,
            end: self.def.end,
            is_recurrence_instance: false,
        }
    }
}

impl Iterator for Occurrences<'_> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        if self.done {
            return None;
        }

        let Some(series) = &self.series else {
            self.done = true;
            return Some(self.source_interval());
        };

        let duration = self.def.duration();
        while self.index < series.max {
            let n = self.index;
            self.index += 1;

            let Some(date) = series.kind.nth_date(series.anchor, n) else {
                break;
            };
            if date > series.until {
                break;
            }

            // The first occurrence is the stored interval itself, even when its
            // wall-clock time falls in a fold.
            let start = if n == 0 {
                Some(self.def.start)
            } else {
                let local = date.and_time(series.time_of_day);
                resolve_local(&self.config.timezone, local, self.config.dst_policy)
            };
            match start {
                Some(start) => {
                    self.emitted += 1;
                    return Some(Occurrence {
                        source_id: self.def.id.clone(),
                        occurrence_key: occurrence_key(&self.def.id, date),
                        date,
                        start,
                        end: start + duration,
                        is_recurrence_instance: true,
                    });
                }
                None => {
                    tracing::debug!(
                        reservation = %self.def.id,
                        %date,
                        "skipping occurrence in DST gap"
                    );
                }
            }
        }

        self.done = true;
        if self.emitted == 0 {
            tracing::warn!(
                reservation = %self.def.id,
                until = %series.until,
                "recurring reservation produced no occurrences, using the original interval"
            );
            return Some(self.source_interval());
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        match &self.series {
            None => (1, Some(1)),
            Some(series) => {
                // A series that has emitted nothing yet always yields at least
                // the fallback interval.
                let remaining = (series.max - self.index) as usize;
                (usize::from(self.emitted == 0), Some(remaining.max(1)))
            }
        }
    }
}

impl FusedIterator for Occurrences<'_> {}

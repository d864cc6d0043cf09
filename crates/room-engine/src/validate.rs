//! Field and policy checks gating the creation of a reservation.
//!
//! Validation is stricter than expansion on purpose: a recurring reservation
//! without an end date is rejected here, while [`expand`](crate::expander::expand)
//! still renders an already-stored one as a single interval.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EngineConfig;
use crate::model::{RecurrenceType, ReservationDefinition, RoomId};

/// Longest a single (non-recurring) reservation may last.
pub const MAX_SINGLE_DURATION_HOURS: i64 = 24;

/// Booking rules attached to a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomPolicy {
    #[serde(alias = "roomId", alias = "id")]
    pub room_id: RoomId,
    #[serde(default)]
    pub name: String,
    /// The room only accepts single reservations, never recurring ones.
    #[serde(default, alias = "fixedReservationOnly")]
    pub fixed_reservation_only: bool,
}

impl RoomPolicy {
    pub fn new(room_id: impl Into<RoomId>, name: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            name: name.into(),
            fixed_reservation_only: false,
        }
    }

    pub fn fixed_only(mut self) -> Self {
        self.fixed_reservation_only = true;
        self
    }

    fn label(&self) -> String {
        if self.name.is_empty() {
            self.room_id.to_string()
        } else {
            self.name.clone()
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Room {room} only accepts fixed reservations; recurring reservations are not allowed")]
    PolicyViolation { room: String },

    #[error("Start time must be in the future")]
    StartNotInFuture,

    #[error("End time must be after start time")]
    EndBeforeStart,

    #[error("A reservation cannot last more than {max_hours} hours")]
    DurationTooLong { max_hours: i64 },

    #[error("Recurring reservations need a recurrence end date")]
    MissingRecurrenceEndDate,

    #[error("Recurring reservations need a recurrence type")]
    MissingRecurrenceType,

    #[error("Recurrence end date {end_date} is before the start date {start_date}")]
    RecurrenceEndBeforeStart {
        end_date: NaiveDate,
        start_date: NaiveDate,
    },
}

impl ValidationError {
    /// Errors about the recurrence fields rather than the interval or room.
    pub fn is_recurrence_config(&self) -> bool {
        matches!(
            self,
            ValidationError::MissingRecurrenceEndDate
                | ValidationError::MissingRecurrenceType
                | ValidationError::RecurrenceEndBeforeStart { .. }
        )
    }
}

/// Validate a new reservation against the room policy, as of now.
pub fn validate(
    def: &ReservationDefinition,
    policy: &RoomPolicy,
    config: &EngineConfig,
) -> Result<(), ValidationError> {
    validate_at(def, policy, Utc::now(), config)
}

/// Validate a new reservation against the room policy, as of `now`.
///
/// Checks run in a fixed order and the first failure is returned. A recurring
/// request for a fixed-only room is rejected before any field check.
pub fn validate_at(
    def: &ReservationDefinition,
    policy: &RoomPolicy,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Result<(), ValidationError> {
    if def.is_recurring && policy.fixed_reservation_only {
        return Err(ValidationError::PolicyViolation {
            room: policy.label(),
        });
    }

    if def.start <= now {
        return Err(ValidationError::StartNotInFuture);
    }
    if def.end <= def.start {
        return Err(ValidationError::EndBeforeStart);
    }

    if !def.is_recurring {
        if def.duration() > Duration::hours(MAX_SINGLE_DURATION_HOURS) {
            return Err(ValidationError::DurationTooLong {
                max_hours: MAX_SINGLE_DURATION_HOURS,
            });
        }
        return Ok(());
    }

    let end_date = def
        .recurrence_end_date
        .ok_or(ValidationError::MissingRecurrenceEndDate)?;
    match def.recurrence_type {
        None | Some(RecurrenceType::None) => return Err(ValidationError::MissingRecurrenceType),
        Some(_) => {}
    }

    let start_date = def.start.with_timezone(&config.timezone).date_naive();
    if end_date < start_date {
        return Err(ValidationError::RecurrenceEndBeforeStart {
            end_date,
            start_date,
        });
    }

    Ok(())
}

//! # room-engine
//!
//! Recurrence expansion and conflict detection for room reservations.
//!
//! A stored reservation is one record per series: a first interval, a
//! recurrence type (daily, weekly, biweekly, monthly) and a last day. This
//! crate turns such records into concrete occurrences, checks a candidate
//! reservation against the approved ones holding the same room, and validates
//! new requests. Every function is pure: no I/O, no shared state.
//!
//! ## Quick start
//!
//! ```rust
//! use chrono::{NaiveDate, TimeZone, Utc};
//! use room_engine::{expand_all, find_conflicts, EngineConfig, RecurrenceType, ReservationDefinition};
//!
//! let config = EngineConfig::default();
//! let lab = ReservationDefinition::new(1_i64, "lab-101",
//!     Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap())
//!     .recurring(RecurrenceType::Weekly, NaiveDate::from_ymd_opt(2024, 3, 25).unwrap());
//! assert_eq!(expand_all(&lab, &config).len(), 4);
//!
//! let request = ReservationDefinition::new(2_i64, "lab-101",
//!     Utc.with_ymd_and_hms(2024, 3, 11, 9, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2024, 3, 11, 11, 0, 0).unwrap());
//! assert_eq!(find_conflicts(&request, &[lab], &config).len(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`model`] -- wire records, parsed definitions, ids, statuses
//! - [`expander`] -- series → lazy sequence of dated occurrences
//! - [`conflict`] -- overlap detection between a candidate and existing series
//! - [`validate`] -- field and room-policy checks for new reservations
//! - [`calendar`] -- window queries and the room/status pre-filter
//! - [`config`] -- timezone and DST policy
//! - [`dst`] -- DST gap/fold resolution
//! - [`error`] -- Error types

pub mod calendar;
pub mod config;
pub mod conflict;
pub mod dst;
pub mod error;
pub mod expander;
pub mod model;
pub mod validate;

pub use calendar::{blocking_for_room, occurrences_in_window, CalendarEntry};
pub use config::EngineConfig;
pub use conflict::{
    check_conflicts, find_conflicts, has_conflict, Conflict, ConflictReport, ConflictScope,
    DEFAULT_DISPLAY_LIMIT,
};
pub use dst::DstPolicy;
pub use error::EngineError;
pub use expander::{expand, expand_all, Occurrence, Occurrences};
pub use model::{
    RawReservation, RecordId, RecurrenceType, ReservationDefinition, ReservationId,
    ReservationStatus, RoomId,
};
pub use validate::{validate, validate_at, RoomPolicy, ValidationError};

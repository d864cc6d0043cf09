//! WASM bindings for room-engine.
//!
//! Exposes occurrence expansion, conflict detection, validation, and calendar
//! window queries to the browser via `wasm-bindgen`, so every view (student,
//! coordinator, admin, calendars) calls one engine instead of carrying its own
//! date math. All complex types are passed as JSON strings.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p room-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir web/src/wasm/ \
//!   target/wasm32-unknown-unknown/release/room_engine_wasm.wasm
//! ```

use chrono::{DateTime, Utc};
use room_engine::model::{decode_records, parse_all};
use room_engine::{
    check_conflicts, ConflictScope, EngineConfig, RawReservation, RecordId,
    ReservationDefinition, RoomPolicy, DEFAULT_DISPLAY_LIMIT,
};
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// Serde-friendly DTOs for crossing the WASM boundary as JSON
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ConflictCheckDto {
    conflicts: Vec<room_engine::Conflict>,
    /// Existing records dropped because they could not be decoded or parsed.
    skipped: usize,
    /// User-facing messages, at most `DEFAULT_DISPLAY_LIMIT`.
    messages: Vec<String>,
}

#[derive(Serialize)]
struct ValidationDto {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<room_engine::ValidationError>,
}

/// Optional settings accepted by `findConflicts`.
#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ConflictOptions {
    /// Skip the approved-in-same-room pre-filter.
    no_filter: bool,
    /// Series to leave out of the existing set (the one being edited).
    exclude_id: Option<RecordId>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn js_err(context: &str, e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, e))
}

/// Parse the engine config JSON. An empty string means the defaults.
fn parse_config(json: &str) -> Result<EngineConfig, JsValue> {
    if json.trim().is_empty() {
        return Ok(EngineConfig::default());
    }
    EngineConfig::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn decode_reservation(json: &str) -> Result<RawReservation, JsValue> {
    serde_json::from_str(json).map_err(|e| js_err("Invalid reservation JSON", e))
}

fn parse_reservation(json: &str, config: &EngineConfig) -> Result<ReservationDefinition, JsValue> {
    ReservationDefinition::parse(&decode_reservation(json)?, &config.timezone)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Decode a batch of records, counting rows that do not decode.
fn decode_reservations(json: &str) -> Result<(Vec<RawReservation>, usize), JsValue> {
    decode_records(json).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn parse_reservations(
    json: &str,
    config: &EngineConfig,
) -> Result<(Vec<ReservationDefinition>, usize), JsValue> {
    let (raws, rejected) = decode_reservations(json)?;
    let (defs, skipped) = parse_all(&raws, &config.timezone);
    Ok((defs, rejected + skipped))
}

fn parse_instant(s: &str) -> Result<DateTime<Utc>, JsValue> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| js_err(&format!("Invalid datetime '{}'", s), e))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| js_err("Serialization error", e))
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Expand one stored reservation into its occurrences.
///
/// `reservation_json` is a reservation record as the backend returns it.
/// `config_json` is `{"timezone": "...", "dst_policy": "..."}` or `""` for
/// the defaults. Returns a JSON array of occurrences.
#[wasm_bindgen(js_name = "expandReservation")]
pub fn expand_reservation(reservation_json: &str, config_json: &str) -> Result<String, JsValue> {
    let config = parse_config(config_json)?;
    let def = parse_reservation(reservation_json, &config)?;
    to_json(&room_engine::expand_all(&def, &config))
}

/// Check a candidate reservation against a room's stored reservations.
///
/// Unless `options_json` sets `noFilter`, only approved reservations in the
/// candidate's room take part, and the candidate's own id is left out.
/// Malformed stored records are skipped and counted.
#[wasm_bindgen(js_name = "findConflicts")]
pub fn find_conflicts(
    candidate_json: &str,
    existing_json: &str,
    config_json: &str,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    let config = parse_config(config_json)?;
    let options: ConflictOptions = match options_json.as_deref() {
        Some(json) if !json.trim().is_empty() => {
            serde_json::from_str(json).map_err(|e| js_err("Invalid options JSON", e))?
        }
        _ => ConflictOptions::default(),
    };

    let candidate = decode_reservation(candidate_json)?;
    let (existing, rejected) = decode_reservations(existing_json)?;
    let scope = match options {
        ConflictOptions { no_filter: true, .. } => ConflictScope::All,
        ConflictOptions {
            exclude_id: Some(id),
            ..
        } => ConflictScope::RoomExcluding(id),
        _ => ConflictScope::Room,
    };

    let report = check_conflicts(&candidate, &existing, &scope, &config)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    to_json(&ConflictCheckDto {
        messages: report.messages(DEFAULT_DISPLAY_LIMIT, &config.timezone),
        skipped: report.skipped + rejected,
        conflicts: report.conflicts,
    })
}

/// Validate a new reservation against its room's policy.
///
/// `now` is an optional RFC 3339 instant; the current time is used when it
/// is absent. Returns `{"valid": true}` or `{"valid": false, "message", "error"}`.
#[wasm_bindgen(js_name = "validateReservation")]
pub fn validate_reservation(
    reservation_json: &str,
    room_json: &str,
    config_json: &str,
    now: Option<String>,
) -> Result<String, JsValue> {
    let config = parse_config(config_json)?;
    let def = parse_reservation(reservation_json, &config)?;
    let policy: RoomPolicy =
        serde_json::from_str(room_json).map_err(|e| js_err("Invalid room JSON", e))?;
    let now = match now.as_deref() {
        Some(s) => parse_instant(s)?,
        None => Utc::now(),
    };

    let dto = match room_engine::validate_at(&def, &policy, now, &config) {
        Ok(()) => ValidationDto {
            valid: true,
            message: None,
            error: None,
        },
        Err(e) => ValidationDto {
            valid: false,
            message: Some(e.to_string()),
            error: Some(e),
        },
    };
    to_json(&dto)
}

/// Occurrences of the given reservations overlapping `[window_start, window_end)`.
///
/// Window bounds are RFC 3339 instants. Returns a JSON array of calendar
/// entries sorted by start.
#[wasm_bindgen(js_name = "occurrencesInWindow")]
pub fn occurrences_in_window(
    reservations_json: &str,
    window_start: &str,
    window_end: &str,
    config_json: &str,
) -> Result<String, JsValue> {
    let config = parse_config(config_json)?;
    let (defs, _) = parse_reservations(reservations_json, &config)?;
    let ws = parse_instant(window_start)?;
    let we = parse_instant(window_end)?;
    to_json(&room_engine::occurrences_in_window(&defs, ws, we, &config))
}

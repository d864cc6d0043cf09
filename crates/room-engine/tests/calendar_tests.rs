//! Tests for calendar window queries and the blocking pre-filter.

use chrono::{NaiveDate, TimeZone, Utc};
use room_engine::{
    blocking_for_room, occurrences_in_window, EngineConfig, RecordId, RecurrenceType,
    ReservationDefinition, ReservationStatus,
};

fn reservation(id: i64, room: &str, day: u32, start_hour: u32, end_hour: u32) -> ReservationDefinition {
    ReservationDefinition::new(
        id,
        room,
        Utc.with_ymd_and_hms(2024, 3, day, start_hour, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, day, end_hour, 0, 0).unwrap(),
    )
}

#[test]
fn blocking_keeps_only_approved_in_room() {
    let defs = vec![
        reservation(1, "lab", 4, 8, 10).with_status(ReservationStatus::Approved),
        reservation(2, "lab", 4, 8, 10).with_status(ReservationStatus::Pending),
        reservation(3, "lab", 4, 8, 10).with_status(ReservationStatus::ProfessorApproved),
        reservation(4, "hall", 4, 8, 10).with_status(ReservationStatus::Approved),
        reservation(5, "lab", 5, 8, 10).with_status(ReservationStatus::Approved),
        reservation(6, "lab", 5, 8, 10).with_status(ReservationStatus::Cancelled),
    ];

    let blocking = blocking_for_room(&defs, &RecordId::from("lab"), None);
    let ids: Vec<RecordId> = blocking.into_iter().map(|d| d.id).collect();

    assert_eq!(ids, vec![RecordId::Int(1), RecordId::Int(5)]);
}

#[test]
fn blocking_excludes_series_being_edited() {
    let defs = vec![
        reservation(1, "lab", 4, 8, 10).with_status(ReservationStatus::Approved),
        reservation(5, "lab", 5, 8, 10).with_status(ReservationStatus::Approved),
    ];

    let blocking = blocking_for_room(&defs, &RecordId::from("lab"), Some(&RecordId::Int(1)));

    assert_eq!(blocking.len(), 1);
    assert_eq!(blocking[0].id, RecordId::Int(5));
}

#[test]
fn window_keeps_overlapping_occurrences_sorted() {
    let weekly = reservation(1, "lab", 4, 14, 16).recurring(
        RecurrenceType::Weekly,
        NaiveDate::from_ymd_opt(2024, 4, 29).unwrap(),
    );
    let single = reservation(2, "hall", 12, 9, 10).with_status(ReservationStatus::Approved);

    // The week of Mar 11 through the end of Mar 18 (exclusive of Mar 19).
    let entries = occurrences_in_window(
        &[weekly, single],
        Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 19, 0, 0, 0).unwrap(),
        &EngineConfig::default(),
    );

    let keys: Vec<&str> = entries
        .iter()
        .map(|e| e.occurrence.occurrence_key.as_str())
        .collect();
    assert_eq!(keys, vec!["1_2024-03-11", "2_2024-03-12", "1_2024-03-18"]);
    assert_eq!(entries[1].room_id, RecordId::from("hall"));
    assert_eq!(entries[1].status, ReservationStatus::Approved);
    assert_eq!(entries[0].status, ReservationStatus::Pending);
}

#[test]
fn window_edges_are_half_open() {
    let def = reservation(1, "lab", 4, 8, 10);
    let config = EngineConfig::default();

    let ends_at_window_start = occurrences_in_window(
        &[def.clone()],
        Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap(),
        &config,
    );
    let partially_inside = occurrences_in_window(
        &[def],
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap(),
        &config,
    );

    assert!(ends_at_window_start.is_empty());
    assert_eq!(partially_inside.len(), 1);
}

#[test]
fn empty_or_inverted_window_yields_nothing() {
    let def = reservation(1, "lab", 4, 8, 10);
    let t = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();

    assert!(occurrences_in_window(&[def.clone()], t, t, &EngineConfig::default()).is_empty());
    assert!(occurrences_in_window(
        &[def],
        t,
        t - chrono::Duration::hours(1),
        &EngineConfig::default()
    )
    .is_empty());
}

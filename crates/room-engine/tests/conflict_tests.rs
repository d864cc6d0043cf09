//! Tests for conflict detection.

use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use room_engine::{
    check_conflicts, find_conflicts, has_conflict, ConflictScope, EngineConfig, EngineError,
    RawReservation, RecordId, RecurrenceType, ReservationDefinition, ReservationStatus, DEFAULT_DISPLAY_LIMIT,
};

/// Helper to create a reservation from hour/minute ranges on a given day (UTC).
fn reservation(
    id: i64,
    ymd: (i32, u32, u32),
    start: (u32, u32),
    end: (u32, u32),
) -> ReservationDefinition {
    let (y, m, d) = ymd;
    ReservationDefinition::new(
        id,
        "room-a",
        Utc.with_ymd_and_hms(y, m, d, start.0, start.1, 0).unwrap(),
        Utc.with_ymd_and_hms(y, m, d, end.0, end.1, 0).unwrap(),
    )
    .with_status(ReservationStatus::Approved)
}

fn raw(id: i64, start: &str, end: &str) -> RawReservation {
    RawReservation {
        id: RecordId::Int(id),
        room_id: RecordId::from("room-a"),
        start_time: Some(start.to_string()),
        end_time: Some(end.to_string()),
        is_recurring: false,
        recurrence_type: None,
        recurrence_end_date: None,
        status: ReservationStatus::Approved,
    }
}

fn weekly_lab() -> ReservationDefinition {
    reservation(1, (2024, 3, 4), (8, 0), (10, 0)).recurring(
        RecurrenceType::Weekly,
        NaiveDate::from_ymd_opt(2024, 3, 25).unwrap(),
    )
}

#[test]
fn overlapping_single_reservation_detected() {
    // Scenario B: 09:00-11:00 against 08:00-10:00
    let candidate = reservation(2, (2024, 3, 11), (9, 0), (11, 0));
    let existing = vec![reservation(1, (2024, 3, 11), (8, 0), (10, 0))];

    let conflicts = find_conflicts(&candidate, &existing, &EngineConfig::default());

    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].existing_source_id, RecordId::Int(1));
    assert_eq!(conflicts[0].overlap_minutes, 60);
}

#[test]
fn touching_boundary_is_not_a_conflict() {
    // Scenario C: 10:00-11:00 against 08:00-10:00
    let candidate = reservation(2, (2024, 3, 11), (10, 0), (11, 0));
    let existing = vec![reservation(1, (2024, 3, 11), (8, 0), (10, 0))];

    let conflicts = find_conflicts(&candidate, &existing, &EngineConfig::default());

    assert!(conflicts.is_empty(), "adjacent reservations should not conflict");
}

#[test]
fn single_candidate_against_recurring_series() {
    let candidate = reservation(2, (2024, 3, 18), (9, 30), (10, 30));

    let conflicts = find_conflicts(&candidate, &[weekly_lab()], &EngineConfig::default());

    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].existing.occurrence_key, "1_2024-03-18");
    assert_eq!(conflicts[0].overlap_minutes, 30);
}

#[test]
fn recurring_candidate_reports_every_conflicting_date() {
    let candidate = reservation(2, (2024, 3, 4), (9, 0), (9, 45)).recurring(
        RecurrenceType::Weekly,
        NaiveDate::from_ymd_opt(2024, 4, 29).unwrap(),
    );

    let conflicts = find_conflicts(&candidate, &[weekly_lab()], &EngineConfig::default());

    let dates: Vec<String> = conflicts
        .iter()
        .map(|c| c.candidate.date.to_string())
        .collect();
    assert_eq!(
        dates,
        vec!["2024-03-04", "2024-03-11", "2024-03-18", "2024-03-25"]
    );
}

#[test]
fn daily_candidate_against_biweekly_series() {
    let existing = reservation(1, (2024, 3, 4), (8, 0), (10, 0)).recurring(
        RecurrenceType::Biweekly,
        NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
    );
    let candidate = reservation(2, (2024, 3, 1), (9, 0), (12, 0)).recurring(
        RecurrenceType::Daily,
        NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
    );

    let conflicts = find_conflicts(&candidate, &[existing], &EngineConfig::default());

    let keys: Vec<&str> = conflicts
        .iter()
        .map(|c| c.existing.occurrence_key.as_str())
        .collect();
    assert_eq!(keys, vec!["1_2024-03-04", "1_2024-03-18"]);
}

#[test]
fn engine_does_not_filter_by_status() {
    let candidate = reservation(2, (2024, 3, 11), (9, 0), (11, 0));
    let pending = reservation(1, (2024, 3, 11), (8, 0), (10, 0)).with_status(ReservationStatus::Pending);

    let conflicts = find_conflicts(&candidate, &[pending], &EngineConfig::default());

    assert_eq!(conflicts.len(), 1, "status filtering is the caller's job");
}

#[test]
fn has_conflict_agrees_with_find_conflicts() {
    let config = EngineConfig::default();
    let hit = reservation(2, (2024, 3, 25), (7, 0), (8, 30));
    let miss = reservation(3, (2024, 3, 25), (10, 0), (12, 0));

    assert!(has_conflict(&hit, &[weekly_lab()], &config));
    assert!(!has_conflict(&miss, &[weekly_lab()], &config));
    assert!(!has_conflict(&hit, &[], &config));
}

#[test]
fn empty_existing_set_no_conflicts() {
    let candidate = reservation(2, (2024, 3, 11), (9, 0), (11, 0));
    assert!(find_conflicts(&candidate, &[], &EngineConfig::default()).is_empty());
}

// ---------------------------------------------------------------------------
// Wire records
// ---------------------------------------------------------------------------

#[test]
fn malformed_existing_records_are_skipped_and_counted() {
    let candidate = raw(10, "2024-03-11T09:00:00Z", "2024-03-11T11:00:00Z");
    let existing = vec![
        raw(1, "2024-03-11T08:00:00Z", "2024-03-11T10:00:00Z"),
        raw(2, "not a date", "2024-03-11T10:00:00Z"),
        raw(3, "2024-03-11T12:00:00Z", "2024-03-11T11:00:00Z"),
    ];

    let report = check_conflicts(&candidate, &existing, &ConflictScope::Room, &EngineConfig::default())
        .unwrap();

    assert_eq!(report.skipped, 2);
    assert_eq!(report.len(), 1);
    assert_eq!(report.conflicts[0].existing_source_id, RecordId::Int(1));
}

#[test]
fn malformed_candidate_is_an_error() {
    let candidate = raw(10, "2024-03-11T09:00:00Z", "garbage");

    let err =
        check_conflicts(&candidate, &[], &ConflictScope::Room, &EngineConfig::default()).unwrap_err();

    assert!(matches!(err, EngineError::MalformedInterval { ref id, .. } if id == "10"));
}

#[test]
fn naive_wire_times_use_room_timezone() {
    // 09:00 Sao Paulo is 12:00 UTC; the existing record is stored in UTC.
    let config = EngineConfig::with_timezone_name("America/Sao_Paulo").unwrap();
    let candidate = raw(10, "2024-03-11T09:00", "2024-03-11T10:00");
    let existing = vec![raw(1, "2024-03-11T11:30:00Z", "2024-03-11T12:30:00Z")];

    let report = check_conflicts(&candidate, &existing, &ConflictScope::Room, &config).unwrap();

    assert_eq!(report.len(), 1);
    assert_eq!(report.conflicts[0].overlap_minutes, 30);
}

#[test]
fn null_start_row_does_not_block_the_room() {
    let candidate = raw(10, "2024-03-11T09:00:00Z", "2024-03-11T11:00:00Z");
    let existing = vec![
        raw(1, "2024-03-11T08:00:00Z", "2024-03-11T10:00:00Z"),
        RawReservation {
            start_time: None,
            ..raw(2, "", "2024-03-11T10:00:00Z")
        },
    ];

    let report = check_conflicts(&candidate, &existing, &ConflictScope::Room, &EngineConfig::default())
        .unwrap();

    assert_eq!(report.skipped, 1);
    assert_eq!(report.len(), 1);
    assert_eq!(report.conflicts[0].existing_source_id, RecordId::Int(1));
}

#[test]
fn room_scope_keeps_approved_reservations_in_the_same_room() {
    let candidate = raw(10, "2024-03-11T09:00:00Z", "2024-03-11T11:00:00Z");
    let existing = vec![
        raw(1, "2024-03-11T08:00:00Z", "2024-03-11T10:00:00Z"),
        RawReservation {
            status: ReservationStatus::Pending,
            ..raw(2, "2024-03-11T09:30:00Z", "2024-03-11T10:30:00Z")
        },
        RawReservation {
            room_id: RecordId::from("room-b"),
            ..raw(3, "2024-03-11T09:00:00Z", "2024-03-11T12:00:00Z")
        },
        raw(10, "2024-03-11T09:00:00Z", "2024-03-11T11:00:00Z"),
    ];
    let config = EngineConfig::default();
    let ids = |scope: ConflictScope| -> Vec<RecordId> {
        check_conflicts(&candidate, &existing, &scope, &config)
            .unwrap()
            .conflicts
            .into_iter()
            .map(|c| c.existing_source_id)
            .collect()
    };

    assert_eq!(ids(ConflictScope::Room), vec![RecordId::Int(1)]);
    assert_eq!(
        ids(ConflictScope::RoomExcluding(RecordId::Int(1))),
        vec![RecordId::Int(10)]
    );
    assert_eq!(
        ids(ConflictScope::All),
        vec![RecordId::Int(1), RecordId::Int(2), RecordId::Int(3), RecordId::Int(10)]
    );
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[test]
fn describe_names_date_and_both_ranges() {
    let candidate = reservation(2, (2024, 3, 11), (9, 0), (11, 0));
    let existing = vec![reservation(1, (2024, 3, 11), (8, 0), (10, 0))];

    let conflicts = find_conflicts(&candidate, &existing, &EngineConfig::default());

    assert_eq!(
        conflicts[0].describe(&Tz::UTC),
        "Conflict on 2024-03-11: requested 09:00-11:00 overlaps reservation 1 (08:00-10:00)"
    );
    assert_eq!(
        conflicts[0].describe(&Tz::America__Sao_Paulo),
        "Conflict on 2024-03-11: requested 06:00-08:00 overlaps reservation 1 (05:00-07:00)"
    );
}

#[test]
fn messages_truncate_to_display_limit() {
    let existing = reservation(1, (2024, 1, 1), (8, 0), (10, 0)).recurring(
        RecurrenceType::Daily,
        NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
    );
    let candidate = reservation(2, (2024, 1, 1), (9, 0), (9, 30)).recurring(
        RecurrenceType::Daily,
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
    );
    let raw_candidate = RawReservation {
        is_recurring: true,
        recurrence_type: Some("daily".to_string()),
        recurrence_end_date: Some("2024-01-10".to_string()),
        ..raw(2, "2024-01-01T09:00:00Z", "2024-01-01T09:30:00Z")
    };
    let raw_existing = RawReservation {
        is_recurring: true,
        recurrence_type: Some("daily".to_string()),
        recurrence_end_date: Some("2024-01-31".to_string()),
        ..raw(1, "2024-01-01T08:00:00Z", "2024-01-01T10:00:00Z")
    };

    let config = EngineConfig::default();
    let direct = find_conflicts(&candidate, &[existing], &config);
    let report =
        check_conflicts(&raw_candidate, &[raw_existing], &ConflictScope::Room, &config).unwrap();

    assert_eq!(direct.len(), 10);
    assert_eq!(report.conflicts, direct);
    let messages = report.messages(DEFAULT_DISPLAY_LIMIT, &Tz::UTC);
    assert_eq!(messages.len(), 5);
    assert!(messages[4].starts_with("Conflict on 2024-01-05"));
}

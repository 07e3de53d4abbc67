//! Property-based tests for the API payload model.
//!
//! Uses proptest to verify:
//! 1. Random bytes never cause a panic in any `decode_*` (returns `Err` gracefully).
//! 2. Status wire strings parse back to the same status, and only
//!    `LOCKED_FOR_*` strings count as locked.
//! 3. An activity feed survives encode then decode.
//! 4. Feed entries without the optional fields still decode.
//! 5. Grid bounding boxes cover exactly the requested extent.

use proptest::prelude::*;
use tasking_proto::activity::{ActivityEntry, ActivitySnapshot};
use tasking_proto::codec;
use tasking_proto::grid::square_grid;
use tasking_proto::task::{LOCKED_PREFIX, TaskId, TaskStatus, parse_action_date};

// --- Strategies ---

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(TaskStatus::ALL.to_vec())
}

/// Naive timestamps in the backend's format.
fn arb_action_date() -> impl Strategy<Value = String> {
    (2018i32..2030, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..1_000_000).prop_map(
        |(y, mo, d, h, mi, micros)| format!("{y:04}-{mo:02}-{d:02}T{h:02}:{mi:02}:00.{micros:06}"),
    )
}

fn arb_entry() -> impl Strategy<Value = ActivityEntry> {
    (
        any::<u32>(),
        arb_status(),
        proptest::option::of("[a-zA-Z0-9_ ]{1,32}"),
        proptest::option::of(arb_action_date()),
    )
        .prop_map(|(id, status, by, date)| ActivityEntry {
            task_id: TaskId::new(id),
            task_status: status,
            action_by: by,
            action_date: date,
        })
}

fn arb_snapshot() -> impl Strategy<Value = ActivitySnapshot> {
    prop::collection::vec(arb_entry(), 0..32).prop_map(ActivitySnapshot::new)
}

// --- Properties ---

proptest! {
    /// Random bytes must never panic, only return Err or a value.
    #[test]
    fn random_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = codec::decode_tasks(&bytes);
        let _ = codec::decode_activity(&bytes);
        let _ = codec::decode_project(&bytes);
        let _ = codec::decode_user(&bytes);
    }

    /// JSON-looking garbage must never panic either.
    #[test]
    fn random_json_never_panics(text in r#"\{("[a-zA-Z]{1,12}": ?(-?[0-9]{1,6}|"[A-Z_]{0,24}"|\[\]|null),? ?){0,6}\}"#) {
        let _ = codec::decode_tasks(text.as_bytes());
        let _ = codec::decode_activity(text.as_bytes());
        let _ = codec::decode_project(text.as_bytes());
        let _ = codec::decode_user(text.as_bytes());
    }

    #[test]
    fn status_strings_parse_back(status in arb_status()) {
        let wire = status.as_str();
        prop_assert_eq!(wire.parse::<TaskStatus>().ok(), Some(status));

        let json = codec::encode(&status).expect("status encodes");
        prop_assert_eq!(json, format!("\"{wire}\"").into_bytes());

        prop_assert_eq!(status.is_locked(), wire.starts_with(LOCKED_PREFIX));
        prop_assert_eq!(status.is_locked(), status.lock_kind().is_some());
        prop_assert!(!(status.is_mappable() && status.is_validatable()));
    }

    #[test]
    fn unknown_status_strings_are_rejected(raw in "[A-Z_]{1,24}") {
        let known = TaskStatus::ALL.iter().any(|s| s.as_str() == raw);
        prop_assert_eq!(raw.parse::<TaskStatus>().is_ok(), known);
    }

    #[test]
    fn activity_feed_survives_encoding(snapshot in arb_snapshot()) {
        let bytes = codec::encode(&snapshot).expect("snapshot encodes");
        let decoded = codec::decode_activity(&bytes).expect("snapshot decodes");
        prop_assert_eq!(decoded, snapshot);
    }

    #[test]
    fn minimal_entries_decode(id in any::<u32>(), status in arb_status()) {
        let json = format!(r#"{{"activity": [{{"taskId": {id}, "taskStatus": "{}"}}]}}"#, status.as_str());
        let snapshot = codec::decode_activity(json.as_bytes()).expect("minimal entry decodes");
        let entry = snapshot.get(TaskId::new(id)).expect("entry present");
        prop_assert_eq!(entry.task_status, status);
        prop_assert!(entry.action_by.is_none());
        prop_assert!(entry.action_time().is_none());
    }

    #[test]
    fn backend_timestamps_parse(date in arb_action_date()) {
        prop_assert!(parse_action_date(&date).is_some(), "{} did not parse", date);
    }

    #[test]
    fn grid_bbox_covers_extent(
        west in -170i32..160,
        south in -80i32..70,
        columns in 1u32..8,
        rows in 1u32..8,
    ) {
        let grid = square_grid([f64::from(west), f64::from(south)], 1.0, columns, rows);
        prop_assert_eq!(grid.len(), (columns * rows) as usize);

        let bbox = grid.bbox().expect("non-empty grid has a bbox");
        prop_assert!((bbox.west - f64::from(west)).abs() < 1e-9);
        prop_assert!((bbox.south - f64::from(south)).abs() < 1e-9);
        prop_assert!((bbox.east - (f64::from(west) + f64::from(columns))).abs() < 1e-9);
        prop_assert!((bbox.north - (f64::from(south) + f64::from(rows))).abs() < 1e-9);

        let bytes = codec::encode(&grid).expect("grid encodes");
        prop_assert_eq!(codec::decode_tasks(&bytes).expect("grid decodes").len(), grid.len());
    }
}

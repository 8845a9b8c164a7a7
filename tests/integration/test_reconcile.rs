//! End-to-end mutation flows: client edits reconciled into row updates
//! through the service facade.

use std::collections::HashMap;
use std::sync::Arc;

use calview::auth::CallerIdentity;
use calview::calendar::{
    AllDayRole, CalendarService, CalendarView, CalendarViewConfig, DurationUnit, MutationDelta,
    MutationRequest,
};
use calview::error::{CalviewError, ReconcileError};
use calview::store::{Field, FieldType, MemoryRecordStore, RecordStore, Value};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
}

struct World {
    store: Arc<MemoryRecordStore>,
    service: CalendarService,
    bookings: i64,
    row: i64,
}

/// A bookings table with every role-capable field, one seeded row, and
/// a calendar view in absolute-end mode.
fn world(min_role_write: i32) -> World {
    let store = Arc::new(MemoryRecordStore::new());
    let table = store.create_table("bookings", min_role_write);
    store
        .set_fields(
            table.id,
            vec![
                Field::new("title", FieldType::String),
                Field::new("starts", FieldType::Date),
                Field::new("ends", FieldType::Date),
                Field::new("hours", FieldType::Int),
                Field::new("length", FieldType::Float),
                Field::new("whole_day", FieldType::Bool),
            ],
        )
        .unwrap();
    let row = store
        .insert_row(
            table.id,
            HashMap::from([
                ("title".to_string(), Value::String("planning".to_string())),
                ("starts".to_string(), Value::Date(t0())),
                ("ends".to_string(), Value::Date(t0() + Duration::hours(2))),
                ("hours".to_string(), Value::Int(2)),
                ("length".to_string(), Value::Float(2.0)),
                ("whole_day".to_string(), Value::Bool(false)),
            ]),
        )
        .unwrap();
    let service = CalendarService::new(Arc::clone(&store) as Arc<dyn RecordStore>);
    service
        .register_view(CalendarView {
            name: "booking_calendar".to_string(),
            table_id: table.id,
            config: CalendarViewConfig::new("title", "starts")
                .with_end_field("ends")
                .with_allday(AllDayRole::Field("whole_day".to_string())),
        })
        .unwrap();
    World {
        store,
        service,
        bookings: table.id,
        row,
    }
}

fn request(w: &World) -> MutationRequest {
    MutationRequest {
        record_id: w.row,
        table_id: w.bookings,
        delta: MutationDelta::default(),
        all_day: None,
        start: None,
        end: None,
    }
}

async fn stored(w: &World, field: &str) -> Value {
    w.store
        .get_row(w.bookings, w.row)
        .await
        .unwrap()
        .unwrap()
        .get(field)
        .cloned()
        .unwrap_or(Value::Null)
}

#[tokio::test]
async fn test_drag_updates_start_and_end() {
    let w = world(10);
    let mut req = request(&w);
    req.start = Some((t0() + Duration::days(7)).to_rfc3339());
    req.end = Some((t0() + Duration::days(7) + Duration::hours(2)).to_rfc3339());
    let event = w
        .service
        .reconcile("booking_calendar", &req, &CallerIdentity::anonymous())
        .await
        .unwrap();
    assert_eq!(event.start, t0() + Duration::days(7));
    assert_eq!(stored(&w, "starts").await.as_date(), Some(t0() + Duration::days(7)));
    assert_eq!(
        stored(&w, "ends").await.as_date(),
        Some(t0() + Duration::days(7) + Duration::hours(2))
    );
}

#[tokio::test]
async fn test_rendered_event_echoes_back_unchanged() {
    let w = world(10);
    let events = w
        .service
        .render("booking_calendar", &HashMap::new())
        .await
        .unwrap();
    let event = events[0].clone();

    let before = w.store.get_row(w.bookings, w.row).await.unwrap().unwrap();
    let returned = w
        .service
        .reconcile(
            "booking_calendar",
            &event.as_mutation(),
            &CallerIdentity::anonymous(),
        )
        .await
        .unwrap();
    assert_eq!(returned, event);
    assert_eq!(
        w.store.get_row(w.bookings, w.row).await.unwrap().unwrap(),
        before
    );
}

#[tokio::test]
async fn test_all_day_drag_without_end_shifts_by_delta() {
    let w = world(10);
    let caller = CallerIdentity::authenticated("alice", 1);
    let mut toggle = request(&w);
    toggle.all_day = Some(true);
    w.service
        .reconcile("booking_calendar", &toggle, &caller)
        .await
        .unwrap();

    let old_end = stored(&w, "ends").await.as_date().unwrap();
    let mut drag = request(&w);
    drag.all_day = Some(true);
    drag.delta = MutationDelta::days(2);
    drag.start = Some((t0() + Duration::days(2)).to_rfc3339());
    let event = w
        .service
        .reconcile("booking_calendar", &drag, &caller)
        .await
        .unwrap();

    assert_eq!(
        stored(&w, "ends").await.as_date(),
        Some(old_end + Duration::days(2))
    );
    // the response renders all-day, so both edges sit at midnight
    assert!(event.all_day);
    assert_eq!(
        event.start,
        Utc.with_ymd_and_hms(2024, 3, 6, 0, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn test_second_view_over_same_table_uses_its_own_config() {
    let w = world(10);
    w.service
        .register_view(CalendarView {
            name: "hourly_calendar".to_string(),
            table_id: w.bookings,
            config: CalendarViewConfig::new("title", "starts")
                .with_duration_field("hours", DurationUnit::Hours),
        })
        .unwrap();

    let mut req = request(&w);
    req.start = Some(t0().to_rfc3339());
    req.end = Some((t0() + Duration::milliseconds(3_661_000)).to_rfc3339());
    let event = w
        .service
        .reconcile("hourly_calendar", &req, &CallerIdentity::anonymous())
        .await
        .unwrap();

    // the entry view owns the table, so its duration config applies:
    // the resize lands on the integer hours field, truncated
    assert_eq!(stored(&w, "hours").await, Value::Int(1));
    // the booking calendar's absolute end field stays untouched
    assert_eq!(
        stored(&w, "ends").await.as_date(),
        Some(t0() + Duration::hours(2))
    );
    // the response derives its end from the truncated stored duration
    assert_eq!(event.source_view, "hourly_calendar");
    assert_eq!(event.end, Some(t0() + Duration::hours(1)));
}

#[tokio::test]
async fn test_duration_mode_round_trip() {
    let store = Arc::new(MemoryRecordStore::new());
    let table = store.create_table("tasks", 10);
    store
        .set_fields(
            table.id,
            vec![
                Field::new("title", FieldType::String),
                Field::new("starts", FieldType::Date),
                Field::new("hours", FieldType::Int),
                Field::new("length", FieldType::Float),
            ],
        )
        .unwrap();
    let row = store
        .insert_row(
            table.id,
            HashMap::from([
                ("title".to_string(), Value::String("spike".to_string())),
                ("starts".to_string(), Value::Date(t0())),
                ("hours".to_string(), Value::Int(8)),
                ("length".to_string(), Value::Float(8.0)),
            ]),
        )
        .unwrap();
    let service = CalendarService::new(Arc::clone(&store) as Arc<dyn RecordStore>);
    service
        .register_view(CalendarView {
            name: "task_calendar".to_string(),
            table_id: table.id,
            config: CalendarViewConfig::new("title", "starts")
                .with_duration_field("hours", DurationUnit::Hours),
        })
        .unwrap();

    let req = MutationRequest {
        record_id: row,
        table_id: table.id,
        delta: MutationDelta::default(),
        all_day: None,
        start: Some(t0().to_rfc3339()),
        end: Some((t0() + Duration::milliseconds(3_661_000)).to_rfc3339()),
    };
    let event = service
        .reconcile("task_calendar", &req, &CallerIdentity::anonymous())
        .await
        .unwrap();
    let written = store
        .get_row(table.id, row)
        .await
        .unwrap()
        .unwrap()
        .get("hours")
        .cloned();
    assert_eq!(written, Some(Value::Int(1)));
    // the response derives its end from the truncated stored duration
    assert_eq!(event.end, Some(t0() + Duration::hours(1)));
}

#[tokio::test]
async fn test_write_role_gate() {
    let w = world(6);
    let before = w.store.get_row(w.bookings, w.row).await.unwrap().unwrap();

    let mut req = request(&w);
    req.start = Some((t0() + Duration::days(1)).to_rfc3339());
    let err = w
        .service
        .reconcile(
            "booking_calendar",
            &req,
            &CallerIdentity::authenticated("mallory", 7),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CalviewError::Reconcile(ReconcileError::NotAuthorized {
            role: 7,
            min_role_write: 6,
        })
    ));
    assert_eq!(
        w.store.get_row(w.bookings, w.row).await.unwrap().unwrap(),
        before
    );

    w.service
        .reconcile(
            "booking_calendar",
            &req,
            &CallerIdentity::authenticated("alice", 6),
        )
        .await
        .unwrap();
    assert_eq!(
        stored(&w, "starts").await.as_date(),
        Some(t0() + Duration::days(1))
    );
}

#[tokio::test]
async fn test_misconfigured_duration_view_rejects_before_writing() {
    let w = world(10);
    w.service
        .register_view(CalendarView {
            name: "broken_calendar".to_string(),
            table_id: w.bookings,
            config: CalendarViewConfig::new("title", "starts")
                .with_duration_field("no_such_field", DurationUnit::Hours),
        })
        .unwrap();
    let before = w.store.get_row(w.bookings, w.row).await.unwrap().unwrap();

    let mut req = request(&w);
    req.start = Some((t0() + Duration::days(1)).to_rfc3339());
    req.end = Some((t0() + Duration::days(1) + Duration::hours(1)).to_rfc3339());
    let err = w
        .service
        .reconcile("broken_calendar", &req, &CallerIdentity::anonymous())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CalviewError::Reconcile(ReconcileError::DurationFieldMissing { .. })
    ));
    assert_eq!(
        w.store.get_row(w.bookings, w.row).await.unwrap().unwrap(),
        before
    );
}

#[tokio::test]
async fn test_merged_sibling_event_round_trips() {
    let w = world(10);
    let shifts = w.store.create_table("shifts", 10);
    w.store
        .set_fields(
            shifts.id,
            vec![
                Field::new("title", FieldType::String),
                Field::new("starts", FieldType::Date),
            ],
        )
        .unwrap();
    let shift_row = w
        .store
        .insert_row(
            shifts.id,
            HashMap::from([
                ("title".to_string(), Value::String("early".to_string())),
                (
                    "starts".to_string(),
                    Value::String("2024-03-04T06:00:00Z".to_string()),
                ),
            ]),
        )
        .unwrap();
    w.service
        .register_view(CalendarView {
            name: "shift_calendar".to_string(),
            table_id: shifts.id,
            config: CalendarViewConfig::new("title", "starts"),
        })
        .unwrap();

    let ambient = HashMap::from([(
        "shift_calendar".to_string(),
        Value::String("true".to_string()),
    )]);
    let events = w
        .service
        .render("booking_calendar", &ambient)
        .await
        .unwrap();
    let shift_event = events
        .iter()
        .find(|e| e.source_view == "shift_calendar")
        .unwrap();

    // drag the merged event on the booking calendar; the write lands
    // on the shifts table under the shift calendar's config
    let mut req = shift_event.as_mutation();
    req.start = Some("2024-03-04T07:00:00Z".to_string());
    let updated = w
        .service
        .reconcile("booking_calendar", &req, &CallerIdentity::anonymous())
        .await
        .unwrap();
    assert_eq!(updated.source_view, "shift_calendar");
    let row = w
        .store
        .get_row(shifts.id, shift_row)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        row.get("starts").unwrap().as_date(),
        Some(Utc.with_ymd_and_hms(2024, 3, 4, 7, 0, 0).unwrap())
    );
}

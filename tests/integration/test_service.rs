//! Render, merge, refresh, and destination discovery through the
//! service facade.

use std::collections::HashMap;
use std::sync::Arc;

use calview::auth::CallerIdentity;
use calview::calendar::{
    AllDayRole, CalendarService, CalendarView, CalendarViewConfig, DisplayMode,
};
use calview::fixture::Fixture;
use calview::store::{Field, FieldType, MemoryRecordStore, RecordStore, Value};
use chrono::{TimeZone, Utc};

fn date_fields() -> Vec<Field> {
    vec![
        Field::new("title", FieldType::String),
        Field::new("starts", FieldType::Date),
        Field::new("ends", FieldType::Date),
        Field::new(
            "room",
            FieldType::Key {
                table: "rooms".to_string(),
            },
        ),
        Field::new("whole_day", FieldType::Bool),
    ]
}

fn seed_booking(
    store: &MemoryRecordStore,
    table_id: i64,
    title: &str,
    start: &str,
    room: Option<i64>,
) -> i64 {
    let mut values = HashMap::from([
        ("title".to_string(), Value::String(title.to_string())),
        ("starts".to_string(), Value::String(start.to_string())),
    ]);
    if let Some(room) = room {
        values.insert("room".to_string(), Value::Int(room));
    }
    store.insert_row(table_id, values).unwrap()
}

/// Store with a rooms table (color source) and a bookings table.
fn booking_world() -> (Arc<MemoryRecordStore>, i64, i64) {
    let store = Arc::new(MemoryRecordStore::new());
    let rooms = store.create_table("rooms", 4);
    store
        .set_fields(
            rooms.id,
            vec![
                Field::new("name", FieldType::String),
                Field::new("shade", FieldType::Color),
            ],
        )
        .unwrap();
    store
        .insert_row(
            rooms.id,
            HashMap::from([
                ("name".to_string(), Value::String("atrium".to_string())),
                ("shade".to_string(), Value::String("#204060".to_string())),
            ]),
        )
        .unwrap();
    let bookings = store.create_table("bookings", 8);
    store.set_fields(bookings.id, date_fields()).unwrap();
    (store, rooms.id, bookings.id)
}

#[tokio::test]
async fn test_render_resolves_joined_colors_and_forwards_state() {
    let (store, _rooms, bookings) = booking_world();
    seed_booking(&store, bookings, "planning", "2024-03-04T09:00:00Z", Some(1));
    seed_booking(&store, bookings, "retro", "2024-03-05T15:00:00Z", None);

    let service = CalendarService::new(Arc::clone(&store) as Arc<dyn RecordStore>);
    service
        .register_view(CalendarView {
            name: "booking_calendar".to_string(),
            table_id: bookings,
            config: CalendarViewConfig::new("title", "starts")
                .with_end_field("ends")
                .with_event_color("room.shade"),
        })
        .unwrap();

    // the room key filters rows, the kind key names no field and only
    // rides along into the forwarded state
    let ambient = HashMap::from([
        ("room".to_string(), Value::String("1".to_string())),
        ("kind".to_string(), Value::String("internal".to_string())),
    ]);
    let events = service.render("booking_calendar", &ambient).await.unwrap();
    assert_eq!(events.len(), 1);

    let planning = &events[0];
    assert_eq!(planning.title, "planning");
    assert_eq!(planning.color, Some("#204060".to_string()));
    assert_eq!(
        planning.start,
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
    );
    assert_eq!(planning.end, None);
    assert_eq!(
        planning.forwarded_state.get("kind"),
        Some(&Value::String("internal".to_string()))
    );
    assert!(planning.forwarded_state.contains_key("room"));

    let all = service
        .render("booking_calendar", &HashMap::new())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    let retro = all.iter().find(|e| e.title == "retro").unwrap();
    assert_eq!(retro.color, None);
}

#[tokio::test]
async fn test_three_calendars_two_enabled() {
    let store = Arc::new(MemoryRecordStore::new());
    let mut table_ids = Vec::new();
    for name in ["bookings", "shifts", "leave"] {
        let table = store.create_table(name, 10);
        store
            .set_fields(
                table.id,
                vec![
                    Field::new("title", FieldType::String),
                    Field::new("starts", FieldType::Date),
                ],
            )
            .unwrap();
        seed_booking(&store, table.id, name, "2024-03-04T08:00:00Z", None);
        table_ids.push(table.id);
    }

    let service = CalendarService::new(Arc::clone(&store) as Arc<dyn RecordStore>);
    for (name, table_id) in ["booking_calendar", "shift_calendar", "leave_calendar"]
        .into_iter()
        .zip(table_ids.iter())
    {
        service
            .register_view(CalendarView {
                name: name.to_string(),
                table_id: *table_id,
                config: CalendarViewConfig::new("title", "starts"),
            })
            .unwrap();
    }

    // shift calendar switched on, leave calendar left off
    let ambient = HashMap::from([(
        "shift_calendar".to_string(),
        Value::String("true".to_string()),
    )]);
    let events = service.render("booking_calendar", &ambient).await.unwrap();

    let tagged: Vec<(&str, &str)> = events
        .iter()
        .map(|e| (e.source_table.as_str(), e.source_view.as_str()))
        .collect();
    assert_eq!(
        tagged,
        vec![
            ("bookings", "booking_calendar"),
            ("shifts", "shift_calendar"),
        ]
    );
}

#[tokio::test]
async fn test_refresh_event_routes_to_sibling_config() {
    let (store, _rooms, bookings) = booking_world();
    let shifts = store.create_table("shifts", 10);
    store
        .set_fields(
            shifts.id,
            vec![
                Field::new("title", FieldType::String),
                Field::new("starts", FieldType::Date),
            ],
        )
        .unwrap();
    let shift_row = seed_booking(&store, shifts.id, "early", "2024-03-04T06:00:00Z", None);

    let service = CalendarService::new(Arc::clone(&store) as Arc<dyn RecordStore>);
    service
        .register_view(CalendarView {
            name: "booking_calendar".to_string(),
            table_id: bookings,
            config: CalendarViewConfig::new("title", "starts").with_end_field("ends"),
        })
        .unwrap();
    service
        .register_view(CalendarView {
            name: "shift_calendar".to_string(),
            table_id: shifts.id,
            config: CalendarViewConfig::new("title", "starts")
                .with_allday(AllDayRole::Always),
        })
        .unwrap();

    // refreshing a shift row through the booking calendar uses the
    // shift calendar's config
    let event = service
        .refresh_event(
            "booking_calendar",
            shifts.id,
            shift_row,
            &CallerIdentity::anonymous(),
        )
        .await
        .unwrap();
    assert_eq!(event.source_view, "shift_calendar");
    assert!(event.all_day);
    assert_eq!(
        event.start,
        Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap()
    );
}

#[tokio::test]
async fn test_destinations_follow_display_modes() {
    let (store, _rooms, bookings) = booking_world();
    let service = CalendarService::new(Arc::clone(&store) as Arc<dyn RecordStore>);
    service
        .register_view(CalendarView {
            name: "booking_calendar".to_string(),
            table_id: bookings,
            config: CalendarViewConfig::new("title", "starts")
                .with_expand_view("show_booking", DisplayMode::Popup)
                .with_create_view("new_booking", DisplayMode::Link),
        })
        .unwrap();

    let ambient = HashMap::from([
        ("starts".to_string(), Value::String("2024-03-04".to_string())),
        ("room".to_string(), Value::String("1".to_string())),
    ]);
    let destinations = service
        .connected_destinations("booking_calendar", &ambient)
        .await
        .unwrap();
    assert_eq!(destinations.embedded_views, vec!["show_booking"]);
    assert_eq!(destinations.linked_views, vec!["new_booking"]);
    assert_eq!(destinations.tables, vec!["bookings"]);
    assert!(destinations.forwarded_state.contains_key("room"));
    assert!(!destinations.forwarded_state.contains_key("starts"));
}

#[tokio::test]
async fn test_fixture_seeded_service_renders() {
    let raw = r#"{
        "tables": [
            {
                "name": "bookings",
                "min_role_write": 8,
                "fields": [
                    {"name": "title", "label": "Title", "field_type": "string"},
                    {"name": "starts", "label": "Starts", "field_type": "date"},
                    {"name": "ends", "label": "Ends", "field_type": "date"}
                ],
                "rows": [
                    {"title": "kickoff", "starts": "2024-03-04T09:00:00Z", "ends": "2024-03-04T10:30:00Z"}
                ]
            }
        ],
        "views": [
            {
                "name": "booking_calendar",
                "table": "bookings",
                "config": {"title_field": "title", "start_field": "starts", "end_field": "ends"}
            }
        ]
    }"#;
    let fixture: Fixture = serde_json::from_str(raw).unwrap();
    let store = Arc::new(MemoryRecordStore::new());
    let service = CalendarService::new(Arc::clone(&store) as Arc<dyn RecordStore>);
    for view in fixture.seed(&store).unwrap() {
        service.register_view(view).unwrap();
    }

    let events = service
        .render("booking_calendar", &HashMap::new())
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "kickoff");
    assert_eq!(
        events[0].end,
        Some(Utc.with_ymd_and_hms(2024, 3, 4, 10, 30, 0).unwrap())
    );
}

use chrono::NaiveDate;
use template_schedule::{
    ConfigError, DayCounting, ExpandedSchedule, ExpansionConfig, PersistenceError, TemplateError,
    TemplateGraph, expand, load_expansion_config, load_template_from_json, save_schedule_to_csv,
    save_schedule_to_json, save_template_to_json,
};
use tempfile::NamedTempFile;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn build_sample_template() -> TemplateGraph {
    let mut graph = TemplateGraph::new("Export Template");
    graph.description = Some("Testing persistence helpers".into());
    let plan = graph.add_milestone("Plan", "same day", "1 week", None).unwrap().id;
    graph.add_task(plan, "Brief", "next day", None).unwrap();
    let build = graph.add_milestone("Build", "1 week", "2 weeks", None).unwrap().id;
    let task = graph.add_task(build, "Prototype", "3 days", None).unwrap();
    task.estimated_hours = Some(12.5);
    graph
}

#[test]
fn json_round_trip_preserves_template() {
    let template = build_sample_template();
    let file = NamedTempFile::new().unwrap();

    save_template_to_json(&template, file.path()).unwrap();
    let loaded = load_template_from_json(file.path()).unwrap();

    assert_eq!(loaded, template);
    assert_eq!(loaded.description.as_deref(), Some("Testing persistence helpers"));
}

#[test]
fn loaded_template_keeps_allocating_fresh_ids() {
    let template = build_sample_template();
    let file = NamedTempFile::new().unwrap();
    save_template_to_json(&template, file.path()).unwrap();

    let mut loaded = load_template_from_json(file.path()).unwrap();
    let id = loaded.add_milestone("Ship", "1 month", "same day", None).unwrap().id;
    assert_eq!(id, 5);
}

#[test]
fn loaded_template_expands_like_the_original() {
    let template = build_sample_template();
    let file = NamedTempFile::new().unwrap();
    save_template_to_json(&template, file.path()).unwrap();
    let loaded = load_template_from_json(file.path()).unwrap();

    let anchor = d(2025, 9, 1);
    assert_eq!(expand(&loaded, anchor), expand(&template, anchor));
}

#[test]
fn json_load_rejects_duplicate_ids() {
    let snapshot = serde_json::json!({
        "name": "Broken",
        "milestones": [
            {"id": 1, "name": "A", "position": 0, "start_offset": "same day", "due_offset": "1 day"},
            {"id": 1, "name": "B", "position": 1, "start_offset": "same day", "due_offset": "1 day"}
        ]
    });

    let file = NamedTempFile::new().unwrap();
    serde_json::to_writer_pretty(file.as_file(), &snapshot).unwrap();

    match load_template_from_json(file.path()) {
        Ok(_) => panic!("expected duplicate ids to be rejected"),
        Err(PersistenceError::InvalidTemplate(err)) => {
            assert_eq!(err, TemplateError::DuplicateId(1))
        }
        Err(other) => panic!("expected InvalidTemplate error, got {other:?}"),
    }
}

#[test]
fn json_load_rejects_gapped_positions() {
    let snapshot = serde_json::json!({
        "name": "Gapped",
        "milestones": [
            {"id": 1, "name": "A", "position": 0, "start_offset": "same day", "due_offset": "1 day",
             "tasks": [{"id": 2, "title": "T", "position": 3, "due_offset": "1 day"}]}
        ]
    });

    let file = NamedTempFile::new().unwrap();
    serde_json::to_writer_pretty(file.as_file(), &snapshot).unwrap();

    let result = load_template_from_json(file.path());
    assert!(matches!(
        result,
        Err(PersistenceError::InvalidTemplate(TemplateError::PositionMismatch {
            found: 3,
            expected: 0,
            ..
        }))
    ));
}

#[test]
fn json_load_keeps_invalid_offsets_as_text() {
    let snapshot = serde_json::json!({
        "name": "Draft",
        "milestones": [
            {"id": 1, "name": "A", "position": 0, "start_offset": "soonish", "due_offset": "1 day"}
        ]
    });

    let file = NamedTempFile::new().unwrap();
    serde_json::to_writer_pretty(file.as_file(), &snapshot).unwrap();

    let loaded = load_template_from_json(file.path()).unwrap();
    assert_eq!(loaded.milestones()[0].start_offset.as_str(), "soonish");
    assert!(expand(&loaded, d(2025, 9, 1)).is_err());
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = load_template_from_json(dir.path().join("missing.json"));
    assert!(matches!(result, Err(PersistenceError::Io(_))));
}

#[test]
fn schedule_json_round_trip() {
    let schedule = expand(&build_sample_template(), d(2025, 9, 1)).unwrap();
    let file = NamedTempFile::new().unwrap();

    save_schedule_to_json(&schedule, file.path()).unwrap();
    let text = std::fs::read_to_string(file.path()).unwrap();
    let loaded: ExpandedSchedule = serde_json::from_str(&text).unwrap();
    assert_eq!(loaded, schedule);
    assert!(text.contains("\"2025-09-08\""));
}

#[test]
fn csv_export_lists_milestones_then_tasks() {
    let schedule = expand(&build_sample_template(), d(2025, 9, 1)).unwrap();
    let file = NamedTempFile::new().unwrap();

    save_schedule_to_csv(&schedule, file.path()).unwrap();
    let text = std::fs::read_to_string(file.path()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "kind,id,milestone_id,name,start_date,due_date",
            "milestone,1,1,Plan,2025-09-01,2025-09-08",
            "task,2,1,Brief,,2025-09-02",
            "milestone,3,3,Build,2025-09-08,2025-09-22",
            "task,4,3,Prototype,,2025-09-11",
        ]
    );
}

#[test]
fn expansion_config_loads_with_defaults() {
    let file = NamedTempFile::new().unwrap();
    std::fs::write(file.path(), "{}").unwrap();
    let config = load_expansion_config(file.path()).unwrap();
    assert_eq!(config, ExpansionConfig::default());

    std::fs::write(
        file.path(),
        r#"{"max_offset_days": 365, "day_counting": {"mode": "working_days", "calendar": {"working_days": ["Mon", "Tue", "Wed", "Thu", "Fri"], "holidays": ["2025-09-01"]}}}"#,
    )
    .unwrap();
    let config = load_expansion_config(file.path()).unwrap();
    assert_eq!(config.max_offset_days, 365);
    match config.day_counting {
        DayCounting::WorkingDays { calendar } => {
            assert!(!calendar.is_available(d(2025, 9, 1)));
            assert!(calendar.is_available(d(2025, 9, 2)));
        }
        DayCounting::Calendar => panic!("expected working-day counting"),
    }
}

#[test]
fn expansion_config_rejects_out_of_range_limits() {
    let file = NamedTempFile::new().unwrap();
    for limit in [i64::MAX, -1] {
        std::fs::write(file.path(), format!(r#"{{"max_offset_days": {limit}}}"#)).unwrap();
        match load_expansion_config(file.path()) {
            Err(PersistenceError::InvalidConfig(ConfigError::OffsetLimitOutOfRange {
                found, ..
            })) => assert_eq!(found, limit),
            other => panic!("expected InvalidConfig for {limit}, got {other:?}"),
        }
    }

    std::fs::write(file.path(), r#"{"max_offset_days": 36500}"#).unwrap();
    assert_eq!(load_expansion_config(file.path()).unwrap().max_offset_days, 36_500);
}

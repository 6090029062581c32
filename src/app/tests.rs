use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::{App, AppError, NewActivityInput, UpdateActivityPatch};
use crate::redistribution::RedistributionDetail;

fn unique_workspace() -> PathBuf {
    let root = std::env::temp_dir().join(format!("surco-app-test-{}", Uuid::now_v7()));
    std::fs::create_dir_all(&root).expect("temp workspace should be creatable");
    root
}

fn open_app(root: &Path) -> App {
    let db_path = root.join(".surco/activities.sqlite");
    App::open(db_path.to_str().expect("utf8 path"), root.to_path_buf())
        .expect("app should open")
}

fn new_input(name: &str, date: &str, hectares: Option<f64>) -> NewActivityInput {
    NewActivityInput {
        name: name.to_string(),
        activity_type: None,
        scheduled_date: date.to_string(),
        priority: None,
        planned_hectares: hectares,
        duration_minutes: None,
    }
}

fn count_json_files(root: &Path) -> usize {
    if !root.exists() {
        return 0;
    }

    let mut count = 0usize;
    let mut dirs = vec![root.to_path_buf()];
    while let Some(dir) = dirs.pop() {
        let entries = std::fs::read_dir(dir).expect("directory should be readable");
        for entry in entries {
            let path = entry.expect("entry should be readable").path();
            if path.is_dir() {
                dirs.push(path);
            } else if path.extension().is_some_and(|ext| ext == "json") {
                count += 1;
            }
        }
    }
    count
}

#[test]
fn create_activity_fills_defaults_and_parses_name_facts() {
    let root = unique_workspace();
    let app = open_app(&root);

    let created = app
        .create_activity(new_input(
            "Aplicación Preventiva - Bloque 14 Día 2",
            "2026-02-03T06:00:00Z",
            Some(60.0),
        ))
        .expect("create should succeed");

    assert_eq!(created.status, "scheduled");
    assert_eq!(created.activity_type, "spraying");
    assert_eq!(created.priority, "medium");
    assert_eq!(created.duration_minutes, 480);
    assert_eq!(created.block, Some(14));
    assert_eq!(created.day_index, Some(2));
    assert!(!created.is_buffer);

    let listed = app.list_activities().expect("list should succeed");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);

    let shown = app
        .show_activity(&created.id)
        .expect("show should succeed")
        .expect("activity should exist");
    assert_eq!(shown.name, created.name);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn create_activity_accepts_spanish_aliases_and_plain_dates() {
    let root = unique_workspace();
    let app = open_app(&root);

    let created = app
        .create_activity(NewActivityInput {
            name: "Riego - Bloque 3 Día 1".to_string(),
            activity_type: Some("riego".to_string()),
            scheduled_date: "2026-05-04".to_string(),
            priority: Some("alta".to_string()),
            planned_hectares: Some(30.0),
            duration_minutes: None,
        })
        .expect("create should succeed");

    assert_eq!(created.activity_type, "irrigation");
    assert_eq!(created.priority, "high");
    assert_eq!(created.scheduled_date, "2026-05-04T00:00:00Z");
    // 30 ha at 8 min/ha.
    assert_eq!(created.duration_minutes, 240);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn create_activity_rejects_bad_input() {
    let root = unique_workspace();
    let app = open_app(&root);

    let empty = app.create_activity(new_input("   ", "2026-02-03T06:00:00Z", None));
    assert!(matches!(empty, Err(AppError::InvalidArgument(_))));

    let bad_date = app.create_activity(new_input("Bloque 1 Día 1", "someday", None));
    assert!(matches!(bad_date, Err(AppError::ParseDate(_))));

    let bad_type = app.create_activity(NewActivityInput {
        activity_type: Some("plowing".to_string()),
        ..new_input("Bloque 1 Día 1", "2026-02-03T06:00:00Z", None)
    });
    assert!(matches!(bad_type, Err(AppError::ParseType(_))));

    let bad_hectares = app.create_activity(new_input("Bloque 1 Día 1", "2026-02-03", Some(-5.0)));
    assert!(matches!(bad_hectares, Err(AppError::InvalidArgument(_))));

    assert!(app
        .list_activities()
        .expect("list should succeed")
        .is_empty());

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn update_activity_normalizes_fields_and_keeps_duration_in_step() {
    let root = unique_workspace();
    let app = open_app(&root);

    let created = app
        .create_activity(new_input(
            "Bloque 5 - Día 1",
            "2026-02-03T06:00:00Z",
            Some(60.0),
        ))
        .expect("create should succeed");

    let updated = app
        .update_activity(
            &created.id,
            UpdateActivityPatch {
                priority: Some("critica".to_string()),
                planned_hectares: Some(45.0),
                notes: Some("suelo húmedo".to_string()),
                ..UpdateActivityPatch::default()
            },
        )
        .expect("update should succeed");

    assert_eq!(updated.priority, "critical");
    assert_eq!(updated.planned_hectares, Some(45.0));
    assert_eq!(updated.duration_minutes, 360);
    assert_eq!(updated.notes.as_deref(), Some("suelo húmedo"));

    let no_change = app.update_activity(&created.id, UpdateActivityPatch::default());
    assert!(matches!(no_change, Err(AppError::InvalidArgument(_))));

    let missing = app.update_activity(
        "missing-id",
        UpdateActivityPatch {
            notes: Some("x".to_string()),
            ..UpdateActivityPatch::default()
        },
    );
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn delete_activity_round_trips_and_reports_missing() {
    let root = unique_workspace();
    let app = open_app(&root);

    let created = app
        .create_activity(new_input("Bloque 2 - Día 1", "2026-02-03T06:00:00Z", None))
        .expect("create should succeed");

    app.delete_activity(&created.id)
        .expect("delete should succeed");
    assert!(app
        .show_activity(&created.id)
        .expect("show should succeed")
        .is_none());

    let again = app.delete_activity(&created.id);
    assert!(matches!(again, Err(AppError::NotFound(_))));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn completion_within_tolerance_touches_nothing_else() {
    let root = unique_workspace();
    let app = open_app(&root);

    let target = app
        .create_activity(new_input(
            "Bloque 8 - Día 1",
            "2026-02-03T06:00:00Z",
            Some(60.0),
        ))
        .expect("create should succeed");
    let buffer = app
        .create_activity(new_input(
            "Bloque 8 - Día Remanente",
            "2026-02-10T06:00:00Z",
            Some(15.0),
        ))
        .expect("create should succeed");

    let outcome = app
        .complete_with_hectares(&target.id, 60.05, None)
        .expect("completion should succeed");

    assert_eq!(outcome.activity.status, "completed");
    assert_eq!(outcome.activity.completed_hectares, Some(60.05));
    assert_eq!(outcome.redistributed_count, 0);
    assert!(outcome.details.is_empty());

    let untouched = app
        .show_activity(&buffer.id)
        .expect("show should succeed")
        .expect("buffer should remain");
    assert_eq!(untouched.planned_hectares, Some(15.0));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn completion_excess_is_absorbed_by_the_buffer_day() {
    let root = unique_workspace();
    let app = open_app(&root);

    let target = app
        .create_activity(new_input(
            "Bloque 9 - Día 1",
            "2026-02-03T06:00:00Z",
            Some(60.0),
        ))
        .expect("create should succeed");
    let buffer = app
        .create_activity(new_input(
            "Bloque 9 - Día Remanente",
            "2026-02-11T06:00:00Z",
            Some(40.0),
        ))
        .expect("create should succeed");

    let outcome = app
        .complete_with_hectares(&target.id, 80.0, Some("rindió más"))
        .expect("completion should succeed");

    assert_eq!(outcome.hectares_difference, 20.0);
    assert_eq!(outcome.redistributed_count, 1);
    assert!(matches!(
        outcome.details.as_slice(),
        [RedistributionDetail::Updated { .. }]
    ));
    assert_eq!(outcome.cycle_info.number, 1);
    assert_eq!(outcome.block_info.block_number, 9);

    let resized = app
        .show_activity(&buffer.id)
        .expect("show should succeed")
        .expect("buffer should remain");
    assert_eq!(resized.planned_hectares, Some(20.0));
    assert_eq!(resized.duration_minutes, 160);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn completing_twice_is_rejected() {
    let root = unique_workspace();
    let app = open_app(&root);

    let target = app
        .create_activity(new_input(
            "Bloque 4 - Día 1",
            "2026-02-03T06:00:00Z",
            Some(60.0),
        ))
        .expect("create should succeed");

    app.complete_with_hectares(&target.id, 60.0, None)
        .expect("first completion should succeed");
    let second = app.complete_with_hectares(&target.id, 60.0, None);
    assert!(matches!(second, Err(AppError::AlreadyCompleted(_))));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn completion_rejects_invalid_input_before_any_write() {
    let root = unique_workspace();
    let app = open_app(&root);

    let missing = app.complete_with_hectares("missing-id", 50.0, None);
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let blank = app.complete_with_hectares("  ", 50.0, None);
    assert!(matches!(blank, Err(AppError::InvalidArgument(_))));

    let target = app
        .create_activity(new_input(
            "Bloque 4 - Día 1",
            "2026-02-03T06:00:00Z",
            Some(60.0),
        ))
        .expect("create should succeed");
    let negative = app.complete_with_hectares(&target.id, -3.0, None);
    assert!(matches!(negative, Err(AppError::InvalidArgument(_))));

    let still_scheduled = app
        .show_activity(&target.id)
        .expect("show should succeed")
        .expect("activity should remain");
    assert_eq!(still_scheduled.status, "scheduled");

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn completion_without_block_token_keeps_the_primary_write() {
    let root = unique_workspace();
    let app = open_app(&root);

    let target = app
        .create_activity(new_input(
            "Mantenimiento general",
            "2026-02-03T06:00:00Z",
            Some(60.0),
        ))
        .expect("create should succeed");

    let outcome = app.complete_with_hectares(&target.id, 80.0, None);
    assert!(matches!(outcome, Err(AppError::UnresolvedBlock { .. })));

    let record = app
        .show_activity(&target.id)
        .expect("show should succeed")
        .expect("activity should remain");
    assert_eq!(record.status, "completed");
    assert_eq!(record.completed_hectares, Some(80.0));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn deferral_reflows_the_cycle_and_writes_audit_events() {
    let root = unique_workspace();
    let app = open_app(&root);

    // Mon 2nd, Tue 3rd, Wed 4th of February 2026.
    let first = app
        .create_activity(new_input(
            "Bloque 6 - Día 1",
            "2026-02-02T06:00:00Z",
            Some(60.0),
        ))
        .expect("create should succeed");
    app.create_activity(new_input(
        "Bloque 6 - Día 2",
        "2026-02-03T06:00:00Z",
        Some(60.0),
    ))
    .expect("create should succeed");
    app.create_activity(new_input(
        "Bloque 6 - Día 3",
        "2026-02-04T06:00:00Z",
        Some(60.0),
    ))
    .expect("create should succeed");

    let outcome = app
        .defer_activity(
            &first.id,
            "2026-02-02T06:00:00Z",
            "2026-02-05T06:00:00Z",
            "lluvia fuerte",
        )
        .expect("deferral should succeed");

    assert_eq!(outcome.days_shifted, 3);
    assert_eq!(outcome.total_activities_in_cycle, 3);
    assert_eq!(outcome.reorganized_count, 3);
    assert!(outcome.warnings.is_empty());

    let deferred = app
        .show_activity(&first.id)
        .expect("show should succeed")
        .expect("activity should remain");
    assert_eq!(deferred.status, "deferred");
    assert_eq!(deferred.scheduled_date, "2026-02-05T06:00:00Z");

    // One deferral event plus one reflow event per other moved activity.
    assert_eq!(count_json_files(&root.join(".surco/audit")), 3);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn deferral_to_rest_day_is_rejected_without_mutation() {
    let root = unique_workspace();
    let app = open_app(&root);

    let activity = app
        .create_activity(new_input(
            "Bloque 6 - Día 1",
            "2026-02-02T06:00:00Z",
            Some(60.0),
        ))
        .expect("create should succeed");

    // 2026-02-08 is a Sunday.
    let rejected = app.defer_activity(
        &activity.id,
        "2026-02-02T06:00:00Z",
        "2026-02-08T06:00:00Z",
        "lluvia",
    );
    assert!(matches!(rejected, Err(AppError::InvalidArgument(_))));

    let unchanged = app
        .show_activity(&activity.id)
        .expect("show should succeed")
        .expect("activity should remain");
    assert_eq!(unchanged.scheduled_date, "2026-02-02T06:00:00Z");
    assert_eq!(unchanged.status, "scheduled");
    assert_eq!(count_json_files(&root.join(".surco/audit")), 0);

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn block_stats_aggregate_planned_and_completed_area() {
    let root = unique_workspace();
    let app = open_app(&root);

    let first = app
        .create_activity(new_input(
            "Bloque 12 - Día 1",
            "2026-02-03T06:00:00Z",
            Some(60.0),
        ))
        .expect("create should succeed");
    app.create_activity(new_input(
        "Bloque 12 - Día 2",
        "2026-02-04T06:00:00Z",
        Some(50.0),
    ))
    .expect("create should succeed");

    app.complete_with_hectares(&first.id, 60.0, None)
        .expect("completion should succeed");

    let stats = app.block_stats(12).expect("stats should compute");
    assert_eq!(stats.block_number, 12);
    assert_eq!(stats.total_activities, 2);
    assert_eq!(stats.completed_activities, 1);
    assert_eq!(stats.total_planned_hectares, 110.0);
    assert_eq!(stats.total_completed_hectares, 60.0);
    assert_eq!(stats.pending_hectares, 50.0);

    let _ = std::fs::remove_dir_all(root);
}

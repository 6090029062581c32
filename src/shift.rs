use std::error::Error;
use std::fmt;

use rusqlite::Connection;
use time::OffsetDateTime;

use crate::dates::{format_timestamp, parse_timestamp, ParseTimestampError};
use crate::db::{self, ActivityPatch, ActivityQuery, ActivityRecord};
use crate::domain::naming::{NameFacts, UNNUMBERED_DAY};
use crate::domain::status::ActivityStatus;
use crate::redistribution::RedistributionDetail;
use crate::workdays::WorkdayRule;

/// Move every pending activity at or after `insertion` onto its own
/// subsequent working date, preserving relative order. Failures never
/// propagate: they are recorded as a warning detail and the caller
/// proceeds without a shift — a zero return does not mean no shift was
/// needed.
pub fn shift_calendar_forward(
    conn: &Connection,
    rule: WorkdayRule,
    insertion: OffsetDateTime,
    details: &mut Vec<RedistributionDetail>,
) -> usize {
    match try_shift(conn, rule, insertion, details) {
        Ok(count) => count,
        Err(err) => {
            details.push(RedistributionDetail::Warning {
                activity_id: None,
                activity_name: None,
                message: format!("calendar shift failed: {err}"),
            });
            0
        }
    }
}

fn try_shift(
    conn: &Connection,
    rule: WorkdayRule,
    insertion: OffsetDateTime,
    details: &mut Vec<RedistributionDetail>,
) -> Result<usize, ShiftError> {
    let pending = db::query_activities(
        conn,
        &ActivityQuery {
            scheduled_gte: Some(format_timestamp(insertion)),
            status_in: vec![
                ActivityStatus::Scheduled.as_str().to_string(),
                ActivityStatus::Deferred.as_str().to_string(),
            ],
            ..ActivityQuery::default()
        },
    )?;

    if pending.is_empty() {
        return Ok(0);
    }

    let mut sorted: Vec<(OffsetDateTime, NameFacts, ActivityRecord)> = Vec::new();
    for record in pending {
        let scheduled =
            parse_timestamp(&record.scheduled_date).map_err(|source| ShiftError::BadStoredDate {
                activity_id: record.id.clone(),
                source,
            })?;
        let facts = NameFacts::parse(&record.name);
        sorted.push((scheduled, facts, record));
    }

    // Date first, then block, then day; sentinels push unlabeled
    // activities to the back of their date group.
    sorted.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| {
                a.1.block
                    .unwrap_or(UNNUMBERED_DAY)
                    .cmp(&b.1.block.unwrap_or(UNNUMBERED_DAY))
            })
            .then_with(|| a.1.day_index.cmp(&b.1.day_index))
    });

    let mut shifted = 0;
    let mut cursor = insertion;

    for (scheduled, _, record) in sorted {
        if scheduled < insertion {
            continue;
        }

        let new_date = rule.next_workday(cursor);
        let updated = db::update_activity(
            conn,
            &record.id,
            &ActivityPatch {
                scheduled_date: Some(format_timestamp(new_date)),
                ..ActivityPatch::default()
            },
        )?;
        if updated.is_none() {
            return Err(ShiftError::Vanished {
                activity_id: record.id,
            });
        }

        details.push(RedistributionDetail::Shifted {
            activity_id: record.id.clone(),
            activity_name: record.name.clone(),
            old_date: record.scheduled_date.clone(),
            new_date: format_timestamp(new_date),
            message: format!(
                "activity moved from {} to {}",
                record.scheduled_date,
                format_timestamp(new_date)
            ),
        });

        shifted += 1;
        cursor = new_date;
    }

    Ok(shifted)
}

#[derive(Debug)]
pub enum ShiftError {
    Db(rusqlite::Error),
    BadStoredDate {
        activity_id: String,
        source: ParseTimestampError,
    },
    Vanished {
        activity_id: String,
    },
}

impl fmt::Display for ShiftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShiftError::Db(err) => write!(f, "database error: {}", err),
            ShiftError::BadStoredDate {
                activity_id,
                source,
            } => write!(f, "activity '{}' has {}", activity_id, source),
            ShiftError::Vanished { activity_id } => {
                write!(f, "activity '{}' vanished mid-shift", activity_id)
            }
        }
    }
}

impl Error for ShiftError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ShiftError::Db(err) => Some(err),
            ShiftError::BadStoredDate { source, .. } => Some(source),
            ShiftError::Vanished { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for ShiftError {
    fn from(value: rusqlite::Error) -> Self {
        ShiftError::Db(value)
    }
}

#[cfg(test)]
mod tests {
    use super::shift_calendar_forward;
    use crate::db::{self, ActivityQuery, NewActivityRow};
    use crate::dates::parse_timestamp;
    use crate::redistribution::RedistributionDetail;
    use crate::workdays::WorkdayRule;
    use std::time::{SystemTime, UNIX_EPOCH};
    use time::Weekday;

    fn unique_db_path() -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before UNIX_EPOCH")
            .as_nanos();
        std::env::temp_dir()
            .join(format!("surco-shift-{}.sqlite", nanos))
            .display()
            .to_string()
    }

    fn seed(conn: &rusqlite::Connection, id: &str, name: &str, date: &str, status: &str) {
        db::insert_activity(
            conn,
            &NewActivityRow {
                id,
                name,
                activity_type: "spraying",
                scheduled_date: date,
                duration_minutes: 480,
                priority: "medium",
                status,
                planned_hectares: Some(60.0),
                created_at: "2026-02-01T06:00:00Z",
            },
        )
        .expect("seed should insert");
    }

    #[test]
    fn assigns_distinct_sequential_working_dates() {
        let path = unique_db_path();
        let conn = db::open_connection(&path).expect("connection should open");
        let rule = WorkdayRule::new(Weekday::Sunday);

        // Two activities share 2026-02-06 (Friday); one trails on the 10th.
        seed(
            &conn,
            "s-1",
            "Bloque 2 - Día 1",
            "2026-02-06T06:00:00Z",
            "scheduled",
        );
        seed(
            &conn,
            "s-2",
            "Bloque 2 - Día 2",
            "2026-02-06T06:00:00Z",
            "scheduled",
        );
        seed(
            &conn,
            "s-3",
            "Bloque 2 - Día 3",
            "2026-02-10T06:00:00Z",
            "deferred",
        );

        let insertion = parse_timestamp("2026-02-06T06:00:00Z").unwrap();
        let mut details = Vec::new();
        let shifted = shift_calendar_forward(&conn, rule, insertion, &mut details);
        assert_eq!(shifted, 3);

        let moved = db::query_activities(&conn, &ActivityQuery::default()).unwrap();
        let dates: Vec<&str> = moved
            .iter()
            .map(|record| record.scheduled_date.as_str())
            .collect();
        // Day 1 -> Sat 7th, Day 2 -> Mon 9th (Sunday skipped), Day 3 -> Tue 10th.
        assert_eq!(
            dates,
            vec![
                "2026-02-07T06:00:00Z",
                "2026-02-09T06:00:00Z",
                "2026-02-10T06:00:00Z"
            ]
        );

        for (index, record) in moved.iter().enumerate() {
            assert_eq!(record.id, format!("s-{}", index + 1));
            let weekday = parse_timestamp(&record.scheduled_date).unwrap().weekday();
            assert_ne!(weekday, Weekday::Sunday);
        }

        assert_eq!(details.len(), 3);
        assert!(details
            .iter()
            .all(|detail| matches!(detail, RedistributionDetail::Shifted { .. })));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn leaves_completed_and_earlier_activities_alone() {
        let path = unique_db_path();
        let conn = db::open_connection(&path).expect("connection should open");
        let rule = WorkdayRule::new(Weekday::Sunday);

        seed(
            &conn,
            "done",
            "Bloque 2 - Día 1",
            "2026-02-09T06:00:00Z",
            "completed",
        );
        seed(
            &conn,
            "early",
            "Bloque 2 - Día 2",
            "2026-02-03T06:00:00Z",
            "scheduled",
        );

        let insertion = parse_timestamp("2026-02-08T06:00:00Z").unwrap();
        let mut details = Vec::new();
        let shifted = shift_calendar_forward(&conn, rule, insertion, &mut details);
        assert_eq!(shifted, 0);
        assert!(details.is_empty());

        let done = db::get_activity(&conn, "done").unwrap().unwrap();
        assert_eq!(done.scheduled_date, "2026-02-09T06:00:00Z");
        let early = db::get_activity(&conn, "early").unwrap().unwrap();
        assert_eq!(early.scheduled_date, "2026-02-03T06:00:00Z");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn same_date_activities_keep_block_and_day_order() {
        let path = unique_db_path();
        let conn = db::open_connection(&path).expect("connection should open");
        let rule = WorkdayRule::new(Weekday::Sunday);

        seed(
            &conn,
            "z-late-block",
            "Bloque 7 - Día 1",
            "2026-02-10T06:00:00Z",
            "scheduled",
        );
        seed(
            &conn,
            "a-early-block",
            "Bloque 2 - Día 4",
            "2026-02-10T06:00:00Z",
            "scheduled",
        );
        seed(
            &conn,
            "unlabeled",
            "Mantenimiento general",
            "2026-02-10T06:00:00Z",
            "scheduled",
        );

        let insertion = parse_timestamp("2026-02-10T00:00:00Z").unwrap();
        let mut details = Vec::new();
        shift_calendar_forward(&conn, rule, insertion, &mut details);

        let shifted_names: Vec<String> = details
            .iter()
            .filter_map(|detail| match detail {
                RedistributionDetail::Shifted { activity_name, .. } => {
                    Some(activity_name.clone())
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            shifted_names,
            vec![
                "Bloque 2 - Día 4".to_string(),
                "Bloque 7 - Día 1".to_string(),
                "Mantenimiento general".to_string(),
            ]
        );

        let _ = std::fs::remove_file(&path);
    }
}

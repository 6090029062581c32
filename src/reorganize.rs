use std::error::Error;
use std::fmt;

use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::audit::{AuditEvent, AuditEventKind, AuditWriteError, AuditWriter};
use crate::config::FarmConfig;
use crate::cycles::Cycle;
use crate::dates::{format_timestamp, ParseTimestampError};
use crate::db::{self, ActivityPatch, ActivityQuery};
use crate::domain::status::ActivityStatus;

#[derive(Debug, Clone, Serialize)]
pub struct DeferOutcome {
    pub activity_id: String,
    pub old_date: String,
    pub new_date: String,
    pub reason: String,
    pub days_shifted: i64,
    pub reorganized_count: usize,
    pub cycle_months: [u8; 2],
    pub total_activities_in_cycle: usize,
    pub warnings: Vec<String>,
}

struct QueuedUpdate {
    activity_id: String,
    activity_name: String,
    old_date: String,
    new_date: String,
    is_deferred: bool,
}

/// Reflows a whole cycle when one activity is explicitly deferred: every
/// scheduled activity in the cycle is reassigned onto a contiguous
/// working-day sequence anchored at the shifted start.
pub struct CycleReorganizer<'a> {
    conn: &'a Connection,
    config: &'a FarmConfig,
    writer: &'a AuditWriter,
}

impl<'a> CycleReorganizer<'a> {
    pub fn new(conn: &'a Connection, config: &'a FarmConfig, writer: &'a AuditWriter) -> Self {
        Self {
            conn,
            config,
            writer,
        }
    }

    pub fn defer_activity(
        &self,
        activity_id: &str,
        old_date_raw: &str,
        new_date_raw: &str,
        reason: &str,
    ) -> Result<DeferOutcome, ReorganizeError> {
        if activity_id.trim().is_empty() {
            return Err(ReorganizeError::MissingField("activity_id"));
        }
        if old_date_raw.trim().is_empty() {
            return Err(ReorganizeError::MissingField("old_date"));
        }
        if new_date_raw.trim().is_empty() {
            return Err(ReorganizeError::MissingField("new_date"));
        }
        if reason.trim().is_empty() {
            return Err(ReorganizeError::MissingField("reason"));
        }

        let old_date = parse_strict(old_date_raw, "old_date")?;
        let new_date = parse_strict(new_date_raw, "new_date")?;

        let rule = self.config.reorganize_rule();
        if !rule.is_working_day(new_date) {
            return Err(ReorganizeError::NotWorkingDay(new_date_raw.to_string()));
        }

        let target = db::get_activity(self.conn, activity_id)?
            .ok_or_else(|| ReorganizeError::NotFound(activity_id.to_string()))?;

        let offset = rule.working_days_between(old_date, new_date);

        let cycle = Cycle::for_month(old_date.month())
            .ok_or(ReorganizeError::UnknownCycle(u8::from(old_date.month())))?;
        let (cycle_start, cycle_end) = cycle.month_range_exclusive(old_date.year());

        let cycle_activities = db::query_activities(
            self.conn,
            &ActivityQuery {
                scheduled_gte: Some(format_timestamp(cycle_start)),
                scheduled_lt: Some(format_timestamp(cycle_end)),
                status_in: vec![ActivityStatus::Scheduled.as_str().to_string()],
                ..ActivityQuery::default()
            },
        )?;

        if cycle_activities.is_empty() {
            return Err(ReorganizeError::NoCycleActivities);
        }
        if !cycle_activities
            .iter()
            .any(|record| record.id == activity_id)
        {
            return Err(ReorganizeError::NotFoundInCycle(activity_id.to_string()));
        }

        let earliest = parse_stored(&cycle_activities[0].scheduled_date, &cycle_activities[0].id)?;
        let mut cursor = rule.step(earliest, offset);

        let mut updates: Vec<QueuedUpdate> = Vec::new();
        for record in &cycle_activities {
            cursor = rule.snap_to_working_day(cursor);
            let original = parse_stored(&record.scheduled_date, &record.id)?;
            let reassigned = cursor.replace_time(original.time());

            if reassigned != original {
                updates.push(QueuedUpdate {
                    activity_id: record.id.clone(),
                    activity_name: record.name.clone(),
                    old_date: record.scheduled_date.clone(),
                    new_date: format_timestamp(reassigned),
                    is_deferred: record.id == activity_id,
                });
            }

            cursor = rule.next_workday(cursor);
        }

        // The explicit deferral is recorded before any calendar write; if
        // the audit trail cannot be written, nothing moves.
        self.writer.write(&AuditEvent::new(
            activity_id,
            AuditEventKind::ActivityDeferred,
            json!({
                "old_date": old_date_raw,
                "new_date": new_date_raw,
                "reason": reason,
            }),
        ))?;

        let mut warnings = Vec::new();
        let mut reorganized = 0;

        for update in &updates {
            let status = if update.is_deferred {
                ActivityStatus::Deferred
            } else {
                ActivityStatus::Scheduled
            };
            let applied = db::update_activity(
                self.conn,
                &update.activity_id,
                &ActivityPatch {
                    scheduled_date: Some(update.new_date.clone()),
                    status: Some(status.as_str().to_string()),
                    ..ActivityPatch::default()
                },
            );

            match applied {
                Ok(Some(_)) => {
                    reorganized += 1;
                    if !update.is_deferred {
                        let reflow_event = AuditEvent::new(
                            update.activity_id.clone(),
                            AuditEventKind::ActivityReflowed,
                            json!({
                                "old_date": update.old_date,
                                "new_date": update.new_date,
                                "reason": format!(
                                    "automatic reorganization after deferral of {}",
                                    target.name
                                ),
                            }),
                        );
                        if let Err(err) = self.writer.write(&reflow_event) {
                            warnings.push(format!(
                                "audit event for '{}' not written: {err}",
                                update.activity_name
                            ));
                        }
                    }
                }
                Ok(None) => warnings.push(format!(
                    "activity '{}' vanished before its new date applied",
                    update.activity_id
                )),
                Err(err) => warnings.push(format!(
                    "activity '{}' could not be moved: {err}",
                    update.activity_id
                )),
            }
        }

        let (first_month, second_month) = cycle.months();
        Ok(DeferOutcome {
            activity_id: activity_id.to_string(),
            old_date: old_date_raw.to_string(),
            new_date: new_date_raw.to_string(),
            reason: reason.to_string(),
            days_shifted: offset,
            reorganized_count: reorganized,
            cycle_months: [u8::from(first_month), u8::from(second_month)],
            total_activities_in_cycle: cycle_activities.len(),
            warnings,
        })
    }
}

/// Deferral inputs must be full RFC3339 timestamps; the lenient
/// YYYY-MM-DD form is not enough to preserve time-of-day.
fn parse_strict(raw: &str, field: &'static str) -> Result<OffsetDateTime, ReorganizeError> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339).map_err(|_| ReorganizeError::InvalidDate {
        field,
        value: raw.to_string(),
    })
}

fn parse_stored(raw: &str, activity_id: &str) -> Result<OffsetDateTime, ReorganizeError> {
    crate::dates::parse_timestamp(raw).map_err(|source| ReorganizeError::BadStoredDate {
        activity_id: activity_id.to_string(),
        source,
    })
}

#[derive(Debug)]
pub enum ReorganizeError {
    MissingField(&'static str),
    InvalidDate {
        field: &'static str,
        value: String,
    },
    NotWorkingDay(String),
    NotFound(String),
    UnknownCycle(u8),
    NoCycleActivities,
    NotFoundInCycle(String),
    BadStoredDate {
        activity_id: String,
        source: ParseTimestampError,
    },
    Db(rusqlite::Error),
    Audit(AuditWriteError),
}

impl fmt::Display for ReorganizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReorganizeError::MissingField(field) => write!(f, "missing required field: {field}"),
            ReorganizeError::InvalidDate { field, value } => write!(
                f,
                "invalid {field} '{value}': use RFC3339 (2026-02-05T06:00:00Z)"
            ),
            ReorganizeError::NotWorkingDay(value) => {
                write!(f, "new date '{value}' must fall on a working day")
            }
            ReorganizeError::NotFound(id) => write!(f, "activity '{id}' not found"),
            ReorganizeError::UnknownCycle(month) => {
                write!(f, "month {month} does not belong to a recognized cycle")
            }
            ReorganizeError::NoCycleActivities => {
                write!(f, "no scheduled activities found in the cycle")
            }
            ReorganizeError::NotFoundInCycle(id) => {
                write!(f, "activity '{id}' is not among the cycle's scheduled activities")
            }
            ReorganizeError::BadStoredDate {
                activity_id,
                source,
            } => write!(f, "activity '{activity_id}' has {source}"),
            ReorganizeError::Db(err) => write!(f, "database error: {err}"),
            ReorganizeError::Audit(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ReorganizeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReorganizeError::BadStoredDate { source, .. } => Some(source),
            ReorganizeError::Db(err) => Some(err),
            ReorganizeError::Audit(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for ReorganizeError {
    fn from(value: rusqlite::Error) -> Self {
        ReorganizeError::Db(value)
    }
}

impl From<AuditWriteError> for ReorganizeError {
    fn from(value: AuditWriteError) -> Self {
        ReorganizeError::Audit(value)
    }
}

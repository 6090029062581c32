use std::error::Error;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use serde::Serialize;
use time::OffsetDateTime;

use crate::activity_id::generate_activity_id;
use crate::config::FarmConfig;
use crate::cycles::{Cycle, CycleInfo};
use crate::dates::{format_timestamp, parse_timestamp};
use crate::db::{self, ActivityPatch, ActivityQuery, ActivityRecord, NewActivityRow};
use crate::domain::naming::NameFacts;
use crate::domain::status::ActivityStatus;
use crate::locks::{BlockLock, LockError};
use crate::shift::shift_calendar_forward;

const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// One entry per mutation made while rebalancing a block. Returned to the
/// caller for display; never persisted by the engine itself.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RedistributionDetail {
    Updated {
        activity_id: String,
        activity_name: String,
        old_hectares: f64,
        new_hectares: f64,
        message: String,
    },
    NewActivity {
        activity_id: String,
        activity_name: String,
        new_hectares: f64,
        message: String,
    },
    Deleted {
        activity_id: String,
        activity_name: String,
        old_hectares: f64,
        message: String,
    },
    Shifted {
        activity_id: String,
        activity_name: String,
        old_date: String,
        new_date: String,
        message: String,
    },
    Warning {
        #[serde(skip_serializing_if = "Option::is_none")]
        activity_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        activity_name: Option<String>,
        message: String,
    },
}

impl RedistributionDetail {
    pub fn message(&self) -> &str {
        match self {
            RedistributionDetail::Updated { message, .. }
            | RedistributionDetail::NewActivity { message, .. }
            | RedistributionDetail::Deleted { message, .. }
            | RedistributionDetail::Shifted { message, .. }
            | RedistributionDetail::Warning { message, .. } => message,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct BlockInfo {
    pub block_number: u32,
    pub total_planned_hectares: f64,
    pub completed_hectares: f64,
    pub pending_hectares: f64,
}

/// Resolution policy for one completion delta, computed once and then
/// dispatched so each branch stays independently testable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RedistributionPlan {
    /// Nothing to rebalance (also covers a surplus on the buffer day
    /// itself, which has nowhere better to go).
    NoChange,
    /// The completed activity is the block's buffer day and fell short.
    SelfBufferDeficit { deficit: f64 },
    /// The buffer absorbs the whole delta in place.
    AbsorbInBuffer { new_hectares: f64 },
    /// The buffer would exceed its cap; cap it and spill the rest.
    CapBufferAndOverflow { excess: f64 },
    /// The delta consumes the buffer exactly.
    DeleteBuffer,
    /// The delta exceeds the buffer; delete it and carry the remainder.
    DeleteBufferWithDeficit { deficit: f64 },
    /// No buffer exists and extra area was worked.
    NoBufferExcess { excess: f64 },
    /// No buffer exists and area fell short.
    NoBufferDeficit { deficit: f64 },
}

pub fn decide_plan(
    delta: f64,
    target_is_buffer: bool,
    buffer_planned: Option<f64>,
    config: &FarmConfig,
) -> RedistributionPlan {
    match buffer_planned {
        Some(current) => {
            let remaining = current - delta;
            if remaining > 0.0 && remaining <= config.buffer_cap_hectares {
                RedistributionPlan::AbsorbInBuffer {
                    new_hectares: remaining,
                }
            } else if remaining > config.buffer_cap_hectares {
                RedistributionPlan::CapBufferAndOverflow {
                    excess: remaining - config.buffer_cap_hectares,
                }
            } else if remaining == 0.0 {
                RedistributionPlan::DeleteBuffer
            } else {
                RedistributionPlan::DeleteBufferWithDeficit {
                    deficit: -remaining,
                }
            }
        }
        None if target_is_buffer => {
            if delta < 0.0 {
                RedistributionPlan::SelfBufferDeficit { deficit: -delta }
            } else {
                RedistributionPlan::NoChange
            }
        }
        None => {
            if delta > 0.0 {
                RedistributionPlan::NoBufferExcess { excess: delta }
            } else {
                RedistributionPlan::NoBufferDeficit { deficit: -delta }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub activity: ActivityRecord,
    pub planned_hectares: f64,
    pub completed_hectares: f64,
    pub hectares_difference: f64,
    pub redistributed_count: usize,
    pub details: Vec<RedistributionDetail>,
    pub block_info: BlockInfo,
    pub cycle_info: CycleInfo,
}

pub struct RedistributionEngine<'a> {
    conn: &'a Connection,
    config: &'a FarmConfig,
    data_root: &'a Path,
}

impl<'a> RedistributionEngine<'a> {
    pub fn new(conn: &'a Connection, config: &'a FarmConfig, data_root: &'a Path) -> Self {
        Self {
            conn,
            config,
            data_root,
        }
    }

    /// Complete one activity with its actual worked area, then rebalance
    /// the block so planned totals stay consistent. Everything past the
    /// primary completion write is best-effort: store failures inside the
    /// rebalancing phase degrade to warning details, never to an error.
    pub fn complete_with_hectares(
        &self,
        activity_id: &str,
        completed_hectares: f64,
        notes: Option<&str>,
    ) -> Result<CompletionOutcome, RedistributionError> {
        if activity_id.trim().is_empty() {
            return Err(RedistributionError::MissingActivityId);
        }
        if !completed_hectares.is_finite() || completed_hectares <= 0.0 {
            return Err(RedistributionError::InvalidHectares(completed_hectares));
        }

        let target = db::get_activity(self.conn, activity_id)?
            .ok_or_else(|| RedistributionError::NotFound(activity_id.to_string()))?;
        if target.status == ActivityStatus::Completed.as_str() {
            return Err(RedistributionError::AlreadyCompleted(target.id));
        }

        let planned = target
            .planned_hectares
            .unwrap_or(self.config.default_planned_hectares);
        let delta = completed_hectares - planned;

        let updated = db::update_activity(
            self.conn,
            &target.id,
            &ActivityPatch {
                status: Some(ActivityStatus::Completed.as_str().to_string()),
                completed_hectares: Some(completed_hectares),
                notes: notes.map(str::to_string),
                ..ActivityPatch::default()
            },
        )?
        .ok_or_else(|| RedistributionError::NotFound(target.id.clone()))?;

        let facts = NameFacts::parse(&target.name);
        let scheduled = parse_timestamp(&target.scheduled_date).ok();
        let cycle = scheduled.and_then(Cycle::for_date);
        let (block, cycle, scheduled) = match (facts.block, cycle, scheduled) {
            (Some(block), Some(cycle), Some(scheduled)) => (block, cycle, scheduled),
            _ => {
                return Err(RedistributionError::UnresolvedBlock {
                    name: target.name,
                    scheduled_date: target.scheduled_date,
                });
            }
        };

        let mut details = Vec::new();

        if delta.abs() > self.config.tolerance_hectares {
            let _guard = BlockLock::acquire(self.data_root, block, cycle, LOCK_TIMEOUT)?;
            if let Err(err) =
                self.rebalance(&target, facts, scheduled, cycle, block, delta, &mut details)
            {
                details.push(RedistributionDetail::Warning {
                    activity_id: None,
                    activity_name: None,
                    message: format!("redistribution failed: {err}"),
                });
            }
        }
        let redistributed = details.iter().filter(|d| counts_as_touched(d)).count();

        let block_info = self.block_info(block, planned, completed_hectares);

        Ok(CompletionOutcome {
            activity: updated,
            planned_hectares: planned,
            completed_hectares,
            hectares_difference: delta,
            redistributed_count: redistributed,
            details,
            block_info,
            cycle_info: CycleInfo::from(cycle),
        })
    }

    fn rebalance(
        &self,
        target: &ActivityRecord,
        facts: NameFacts,
        scheduled: OffsetDateTime,
        cycle: Cycle,
        block: u32,
        delta: f64,
        details: &mut Vec<RedistributionDetail>,
    ) -> Result<(), RedistributionError> {
        let (cycle_start, cycle_end) = cycle.date_range(scheduled.year());
        let pending = db::query_activities(
            self.conn,
            &ActivityQuery {
                name_like: Some(format!("Bloque {block}")),
                scheduled_gte: Some(format_timestamp(cycle_start)),
                scheduled_lte: Some(format_timestamp(cycle_end)),
                status_in: vec![
                    ActivityStatus::Scheduled.as_str().to_string(),
                    ActivityStatus::Deferred.as_str().to_string(),
                ],
                id_not: Some(target.id.clone()),
                ..ActivityQuery::default()
            },
        )?;

        // Latest-dated buffer candidate wins; at most one is ever used.
        let buffer = pending
            .iter()
            .filter(|record| NameFacts::parse(&record.name).is_buffer)
            .max_by(|a, b| a.scheduled_date.cmp(&b.scheduled_date))
            .cloned();

        let buffer_planned = buffer
            .as_ref()
            .map(|record| {
                record
                    .planned_hectares
                    .unwrap_or(self.config.default_buffer_hectares)
            });
        let plan = decide_plan(delta, facts.is_buffer, buffer_planned, self.config);
        let rule = self.config.shift_rule();

        match plan {
            RedistributionPlan::NoChange => {}
            RedistributionPlan::SelfBufferDeficit { deficit } => {
                let insertion = rule.next_workday(scheduled);
                shift_calendar_forward(self.conn, rule, insertion, details);
                let name = format!(
                    "Aplicación Preventiva Biológicos - Bloque {} Día {} (Déficit Restante)",
                    block,
                    facts.day_index + 1
                );
                let created = self.create_byproduct(target, &name, deficit, insertion)?;
                details.push(RedistributionDetail::NewActivity {
                    activity_id: created.id,
                    activity_name: name,
                    new_hectares: deficit,
                    message: format!(
                        "new activity created for the {deficit} ha the buffer day fell short"
                    ),
                });
            }
            RedistributionPlan::AbsorbInBuffer { new_hectares } => {
                let buffer = buffer.expect("plan implies a buffer activity");
                let current = buffer_planned.expect("plan implies a buffer allocation");
                self.resize(&buffer.id, new_hectares)?;
                details.push(RedistributionDetail::Updated {
                    activity_id: buffer.id.clone(),
                    activity_name: buffer.name.clone(),
                    old_hectares: current,
                    new_hectares,
                    message: if delta > 0.0 {
                        format!(
                            "excess of {delta} ha absorbed by the buffer day \
                             ({current} ha -> {new_hectares} ha)"
                        )
                    } else {
                        format!(
                            "deficit of {} ha covered by the buffer day \
                             ({current} ha -> {new_hectares} ha)",
                            -delta
                        )
                    },
                });
            }
            RedistributionPlan::CapBufferAndOverflow { excess } => {
                let buffer = buffer.expect("plan implies a buffer activity");
                let current = buffer_planned.expect("plan implies a buffer allocation");
                let cap = self.config.buffer_cap_hectares;
                self.resize(&buffer.id, cap)?;
                details.push(RedistributionDetail::Warning {
                    activity_id: Some(buffer.id.clone()),
                    activity_name: Some(buffer.name.clone()),
                    message: format!(
                        "buffer day capped at its {cap} ha maximum (was {current} ha)"
                    ),
                });

                let buffer_date = parse_timestamp(&buffer.scheduled_date)
                    .map_err(RedistributionError::from)?;
                let insertion = rule.next_workday(buffer_date);
                shift_calendar_forward(self.conn, rule, insertion, details);

                let name = format!("{} - Exceso Adicional (+{excess}ha)", target.name);
                let created = self.create_byproduct(target, &name, excess, insertion)?;
                details.push(RedistributionDetail::NewActivity {
                    activity_id: created.id,
                    activity_name: name,
                    new_hectares: excess,
                    message: format!(
                        "new activity created for {excess} ha on the freed date {}",
                        format_timestamp(insertion)
                    ),
                });
            }
            RedistributionPlan::DeleteBuffer => {
                let buffer = buffer.expect("plan implies a buffer activity");
                let current = buffer_planned.expect("plan implies a buffer allocation");
                db::delete_activity(self.conn, &buffer.id)?;
                details.push(RedistributionDetail::Deleted {
                    activity_id: buffer.id.clone(),
                    activity_name: buffer.name.clone(),
                    old_hectares: current,
                    message: format!(
                        "buffer day deleted ({current} ha exactly consumed by the excess)"
                    ),
                });
            }
            RedistributionPlan::DeleteBufferWithDeficit { deficit } => {
                let buffer = buffer.expect("plan implies a buffer activity");
                let current = buffer_planned.expect("plan implies a buffer allocation");
                db::delete_activity(self.conn, &buffer.id)?;
                details.push(RedistributionDetail::Deleted {
                    activity_id: buffer.id.clone(),
                    activity_name: buffer.name.clone(),
                    old_hectares: current,
                    message: format!(
                        "buffer day deleted ({current} ha consumed, {deficit} ha left to place)"
                    ),
                });

                let buffer_date = parse_timestamp(&buffer.scheduled_date)
                    .map_err(RedistributionError::from)?;
                let insertion = rule.next_workday(buffer_date);
                shift_calendar_forward(self.conn, rule, insertion, details);

                let name = format!("{} - Déficit Restante (+{deficit}ha)", target.name);
                let created = self.create_byproduct(target, &name, deficit, insertion)?;
                details.push(RedistributionDetail::NewActivity {
                    activity_id: created.id,
                    activity_name: name,
                    new_hectares: deficit,
                    message: format!(
                        "new activity created for the remaining {deficit} ha on {}",
                        format_timestamp(insertion)
                    ),
                });
            }
            RedistributionPlan::NoBufferExcess { excess } => {
                let insertion = rule.next_workday(scheduled);
                shift_calendar_forward(self.conn, rule, insertion, details);

                let name = format!("{} - Excedente (+{excess}ha)", target.name);
                let created = self.create_byproduct(target, &name, excess, insertion)?;
                details.push(RedistributionDetail::NewActivity {
                    activity_id: created.id,
                    activity_name: name,
                    new_hectares: excess,
                    message: format!(
                        "no buffer day in the block; new activity created for {excess} ha on {}",
                        format_timestamp(insertion)
                    ),
                });
            }
            RedistributionPlan::NoBufferDeficit { deficit } => {
                let mut remaining = deficit;
                for pending_activity in &pending {
                    if remaining <= 0.0 {
                        break;
                    }
                    let current = pending_activity
                        .planned_hectares
                        .unwrap_or(self.config.default_planned_hectares);
                    let addition = remaining.min(self.config.max_deficit_per_activity);
                    let new_planned = current + addition;
                    self.resize(&pending_activity.id, new_planned)?;
                    details.push(RedistributionDetail::Updated {
                        activity_id: pending_activity.id.clone(),
                        activity_name: pending_activity.name.clone(),
                        old_hectares: current,
                        new_hectares: new_planned,
                        message: format!("{addition} ha folded into this activity"),
                    });
                    remaining -= addition;
                }

                if remaining > 0.0 {
                    let insertion = rule.next_workday(scheduled);
                    shift_calendar_forward(self.conn, rule, insertion, details);

                    let name = format!("{} - Déficit Redistribuido (+{remaining}ha)", target.name);
                    let created = self.create_byproduct(target, &name, remaining, insertion)?;
                    details.push(RedistributionDetail::NewActivity {
                        activity_id: created.id,
                        activity_name: name,
                        new_hectares: remaining,
                        message: format!(
                            "new activity created for the remaining {remaining} ha deficit on {}",
                            format_timestamp(insertion)
                        ),
                    });
                }
            }
        }

        Ok(())
    }

    fn resize(&self, activity_id: &str, hectares: f64) -> Result<(), RedistributionError> {
        db::update_activity(
            self.conn,
            activity_id,
            &ActivityPatch {
                planned_hectares: Some(hectares),
                duration_minutes: Some(self.config.duration_for_hectares(hectares)),
                ..ActivityPatch::default()
            },
        )?;
        Ok(())
    }

    fn create_byproduct(
        &self,
        target: &ActivityRecord,
        name: &str,
        hectares: f64,
        scheduled: OffsetDateTime,
    ) -> Result<ActivityRecord, RedistributionError> {
        let id = generate_activity_id(self.data_root, |candidate| {
            matches!(db::get_activity(self.conn, candidate), Ok(Some(_)))
        });
        let created_at = db::now_utc_rfc3339();
        db::insert_activity(
            self.conn,
            &NewActivityRow {
                id: &id,
                name,
                activity_type: &target.activity_type,
                scheduled_date: &format_timestamp(scheduled),
                duration_minutes: self.config.duration_for_hectares(hectares),
                priority: &target.priority,
                status: ActivityStatus::Scheduled.as_str(),
                planned_hectares: Some(hectares),
                created_at: &created_at,
            },
        )?;
        db::get_activity(self.conn, &id)?.ok_or(RedistributionError::NotFound(id))
    }

    /// Block totals are reporting only; a failure degrades to the
    /// target's own numbers instead of aborting the completion.
    fn block_info(&self, block: u32, planned: f64, completed: f64) -> BlockInfo {
        match db::block_totals(self.conn, block) {
            Ok(totals) => BlockInfo {
                block_number: block,
                total_planned_hectares: totals.total_planned_hectares,
                completed_hectares: totals.total_completed_hectares,
                pending_hectares: totals.total_planned_hectares - totals.total_completed_hectares,
            },
            Err(_) => BlockInfo {
                block_number: block,
                total_planned_hectares: planned,
                completed_hectares: completed,
                pending_hectares: 0.0,
            },
        }
    }
}

/// Warnings are informational; every other detail records one touched
/// activity.
fn counts_as_touched(detail: &RedistributionDetail) -> bool {
    !matches!(detail, RedistributionDetail::Warning { .. })
}

#[derive(Debug)]
pub enum RedistributionError {
    MissingActivityId,
    InvalidHectares(f64),
    NotFound(String),
    AlreadyCompleted(String),
    UnresolvedBlock {
        name: String,
        scheduled_date: String,
    },
    Db(rusqlite::Error),
    Lock(LockError),
    BadDate(crate::dates::ParseTimestampError),
}

impl fmt::Display for RedistributionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedistributionError::MissingActivityId => {
                write!(f, "an activity id is required")
            }
            RedistributionError::InvalidHectares(value) => {
                write!(f, "completed hectares must be a number above 0, got {value}")
            }
            RedistributionError::NotFound(id) => write!(f, "activity '{id}' not found"),
            RedistributionError::AlreadyCompleted(id) => {
                write!(f, "activity '{id}' is already completed")
            }
            RedistributionError::UnresolvedBlock {
                name,
                scheduled_date,
            } => write!(
                f,
                "could not determine block or cycle for activity '{name}' ({scheduled_date})"
            ),
            RedistributionError::Db(err) => write!(f, "database error: {err}"),
            RedistributionError::Lock(err) => write!(f, "{err}"),
            RedistributionError::BadDate(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RedistributionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RedistributionError::Db(err) => Some(err),
            RedistributionError::Lock(err) => Some(err),
            RedistributionError::BadDate(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for RedistributionError {
    fn from(value: rusqlite::Error) -> Self {
        RedistributionError::Db(value)
    }
}

impl From<LockError> for RedistributionError {
    fn from(value: LockError) -> Self {
        RedistributionError::Lock(value)
    }
}

impl From<crate::dates::ParseTimestampError> for RedistributionError {
    fn from(value: crate::dates::ParseTimestampError) -> Self {
        RedistributionError::BadDate(value)
    }
}

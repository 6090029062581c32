use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use rusqlite::Connection;
use serde::Serialize;

use crate::activity_id::generate_activity_id;
use crate::audit::{AuditWriteError, AuditWriter};
use crate::config::{ConfigError, FarmConfig};
use crate::cycles::CycleInfo;
use crate::dates::{format_timestamp, parse_timestamp, ParseTimestampError};
use crate::db::{self, ActivityPatch, ActivityQuery, ActivityRecord, NewActivityRow};
use crate::domain::activity_type::{ActivityType, ParseActivityTypeError};
use crate::domain::naming::{NameFacts, UNNUMBERED_DAY};
use crate::domain::priority::{ParsePriorityError, Priority};
use crate::domain::status::{ActivityStatus, ParseStatusError};
use crate::locks::LockError;
use crate::redistribution::{
    BlockInfo, RedistributionDetail, RedistributionEngine, RedistributionError,
};
use crate::reorganize::{CycleReorganizer, DeferOutcome, ReorganizeError};

pub struct App {
    conn: Connection,
    writer: AuditWriter,
    config: FarmConfig,
    data_root: PathBuf,
}

/// An activity as the CLI sees it: the stored record plus the facts the
/// naming parser extracts once on load.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActivityView {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub scheduled_date: String,
    pub duration_minutes: i64,
    pub priority: String,
    pub status: String,
    pub planned_hectares: Option<f64>,
    pub completed_hectares: Option<f64>,
    pub notes: Option<String>,
    pub block: Option<u32>,
    pub day_index: Option<u32>,
    pub is_buffer: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ActivityRecord> for ActivityView {
    fn from(value: ActivityRecord) -> Self {
        let facts = NameFacts::parse(&value.name);
        Self {
            id: value.id,
            name: value.name,
            activity_type: value.activity_type,
            scheduled_date: value.scheduled_date,
            duration_minutes: value.duration_minutes,
            priority: value.priority,
            status: value.status,
            planned_hectares: value.planned_hectares,
            completed_hectares: value.completed_hectares,
            notes: value.notes,
            block: facts.block,
            day_index: (facts.day_index != UNNUMBERED_DAY).then_some(facts.day_index),
            is_buffer: facts.is_buffer,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewActivityInput {
    pub name: String,
    pub activity_type: Option<String>,
    pub scheduled_date: String,
    pub priority: Option<String>,
    pub planned_hectares: Option<f64>,
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateActivityPatch {
    pub name: Option<String>,
    pub activity_type: Option<String>,
    pub scheduled_date: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub planned_hectares: Option<f64>,
    pub duration_minutes: Option<i64>,
    pub notes: Option<String>,
}

impl UpdateActivityPatch {
    fn has_changes(&self) -> bool {
        self.name.is_some()
            || self.activity_type.is_some()
            || self.scheduled_date.is_some()
            || self.priority.is_some()
            || self.status.is_some()
            || self.planned_hectares.is_some()
            || self.duration_minutes.is_some()
            || self.notes.is_some()
    }
}

/// Outcome of `complete`, serialized for `--json` output.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionView {
    pub activity: ActivityView,
    pub planned_hectares: f64,
    pub completed_hectares: f64,
    pub hectares_difference: f64,
    pub redistributed_count: usize,
    pub details: Vec<RedistributionDetail>,
    pub block_info: BlockInfo,
    pub cycle_info: CycleInfo,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct BlockStats {
    pub block_number: u32,
    pub total_activities: i64,
    pub completed_activities: i64,
    pub total_planned_hectares: f64,
    pub total_completed_hectares: f64,
    pub pending_hectares: f64,
}

impl App {
    pub fn open(db_path: &str, data_root: PathBuf) -> Result<Self, AppError> {
        ensure_parent_dir(db_path)?;
        let conn = db::open_connection(db_path)?;
        let config = FarmConfig::load(&data_root)?;
        let writer = AuditWriter::new(data_root.clone());
        Ok(Self {
            conn,
            writer,
            config,
            data_root,
        })
    }

    pub fn create_activity(&self, input: NewActivityInput) -> Result<ActivityView, AppError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidArgument(
                "activity name cannot be empty".to_string(),
            ));
        }

        let activity_type = match input.activity_type.as_deref() {
            Some(raw) => ActivityType::from_str(raw)?,
            None => ActivityType::default(),
        };
        let priority = match input.priority.as_deref() {
            Some(raw) => Priority::from_str(raw)?,
            None => Priority::default(),
        };
        if let Some(hectares) = input.planned_hectares {
            if !hectares.is_finite() || hectares <= 0.0 {
                return Err(AppError::InvalidArgument(format!(
                    "planned hectares must be a number above 0, got {hectares}"
                )));
            }
        }

        let scheduled = parse_timestamp(&input.scheduled_date)?;
        let duration = input.duration_minutes.unwrap_or_else(|| {
            self.config.duration_for_hectares(
                input
                    .planned_hectares
                    .unwrap_or(self.config.default_planned_hectares),
            )
        });

        let id = generate_activity_id(&self.data_root, |candidate| {
            matches!(db::get_activity(&self.conn, candidate), Ok(Some(_)))
        });
        let created_at = db::now_utc_rfc3339();
        db::insert_activity(
            &self.conn,
            &NewActivityRow {
                id: &id,
                name,
                activity_type: activity_type.as_str(),
                scheduled_date: &format_timestamp(scheduled),
                duration_minutes: duration,
                priority: priority.as_str(),
                status: ActivityStatus::Scheduled.as_str(),
                planned_hectares: input.planned_hectares,
                created_at: &created_at,
            },
        )?;

        let record =
            db::get_activity(&self.conn, &id)?.ok_or_else(|| AppError::NotFound(id.clone()))?;
        Ok(ActivityView::from(record))
    }

    pub fn list_activities(&self) -> Result<Vec<ActivityView>, AppError> {
        Ok(db::query_activities(&self.conn, &ActivityQuery::default())?
            .into_iter()
            .map(ActivityView::from)
            .collect())
    }

    pub fn show_activity(&self, id: &str) -> Result<Option<ActivityView>, AppError> {
        Ok(db::get_activity(&self.conn, id)?.map(ActivityView::from))
    }

    pub fn update_activity(
        &self,
        id: &str,
        patch: UpdateActivityPatch,
    ) -> Result<ActivityView, AppError> {
        if !patch.has_changes() {
            return Err(AppError::InvalidArgument(
                "update requires at least one field change".to_string(),
            ));
        }

        db::get_activity(&self.conn, id)?.ok_or_else(|| AppError::NotFound(id.to_string()))?;

        let mut row_patch = ActivityPatch::default();
        if let Some(name) = patch.name.as_deref() {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(AppError::InvalidArgument(
                    "activity name cannot be empty".to_string(),
                ));
            }
            row_patch.name = Some(trimmed.to_string());
        }
        if let Some(raw) = patch.activity_type.as_deref() {
            row_patch.activity_type = Some(ActivityType::from_str(raw)?.as_str().to_string());
        }
        if let Some(raw) = patch.scheduled_date.as_deref() {
            row_patch.scheduled_date = Some(format_timestamp(parse_timestamp(raw)?));
        }
        if let Some(raw) = patch.priority.as_deref() {
            row_patch.priority = Some(Priority::from_str(raw)?.as_str().to_string());
        }
        if let Some(raw) = patch.status.as_deref() {
            row_patch.status = Some(ActivityStatus::from_str(raw)?.as_str().to_string());
        }
        if let Some(hectares) = patch.planned_hectares {
            if !hectares.is_finite() || hectares <= 0.0 {
                return Err(AppError::InvalidArgument(format!(
                    "planned hectares must be a number above 0, got {hectares}"
                )));
            }
            row_patch.planned_hectares = Some(hectares);
            // Duration tracks area unless the caller pins it explicitly.
            if patch.duration_minutes.is_none() {
                row_patch.duration_minutes = Some(self.config.duration_for_hectares(hectares));
            }
        }
        if let Some(duration) = patch.duration_minutes {
            row_patch.duration_minutes = Some(duration);
        }
        if let Some(notes) = patch.notes.as_deref() {
            row_patch.notes = Some(notes.to_string());
        }

        let updated = db::update_activity(&self.conn, id, &row_patch)?
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;
        Ok(ActivityView::from(updated))
    }

    pub fn delete_activity(&self, id: &str) -> Result<(), AppError> {
        if db::delete_activity(&self.conn, id)? {
            Ok(())
        } else {
            Err(AppError::NotFound(id.to_string()))
        }
    }

    /// Mark one activity completed with its actual worked area and
    /// rebalance the block's remaining calendar.
    pub fn complete_with_hectares(
        &self,
        id: &str,
        completed_hectares: f64,
        notes: Option<&str>,
    ) -> Result<CompletionView, AppError> {
        let engine = RedistributionEngine::new(&self.conn, &self.config, &self.data_root);
        let outcome = engine.complete_with_hectares(id, completed_hectares, notes)?;
        Ok(CompletionView {
            activity: ActivityView::from(outcome.activity),
            planned_hectares: outcome.planned_hectares,
            completed_hectares: outcome.completed_hectares,
            hectares_difference: outcome.hectares_difference,
            redistributed_count: outcome.redistributed_count,
            details: outcome.details,
            block_info: outcome.block_info,
            cycle_info: outcome.cycle_info,
        })
    }

    /// Defer one activity to an explicit new date and reflow the whole
    /// cycle around it.
    pub fn defer_activity(
        &self,
        id: &str,
        old_date: &str,
        new_date: &str,
        reason: &str,
    ) -> Result<DeferOutcome, AppError> {
        let reorganizer = CycleReorganizer::new(&self.conn, &self.config, &self.writer);
        Ok(reorganizer.defer_activity(id, old_date, new_date, reason)?)
    }

    pub fn block_stats(&self, block: u32) -> Result<BlockStats, AppError> {
        let totals = db::block_totals(&self.conn, block)?;
        Ok(BlockStats {
            block_number: block,
            total_activities: totals.total_activities,
            completed_activities: totals.completed_activities,
            total_planned_hectares: totals.total_planned_hectares,
            total_completed_hectares: totals.total_completed_hectares,
            pending_hectares: totals.total_planned_hectares - totals.total_completed_hectares,
        })
    }
}

fn ensure_parent_dir(path: &str) -> Result<(), AppError> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Db(rusqlite::Error),
    Config(ConfigError),
    Audit(AuditWriteError),
    Lock(LockError),
    ParseStatus(ParseStatusError),
    ParseType(ParseActivityTypeError),
    ParsePriority(ParsePriorityError),
    ParseDate(ParseTimestampError),
    InvalidArgument(String),
    NotFound(String),
    AlreadyCompleted(String),
    UnresolvedBlock {
        name: String,
        scheduled_date: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "I/O error: {}", err),
            AppError::Db(err) => write!(f, "database error: {}", err),
            AppError::Config(err) => write!(f, "{}", err),
            AppError::Audit(err) => write!(f, "{}", err),
            AppError::Lock(err) => write!(f, "{}", err),
            AppError::ParseStatus(err) => write!(f, "{}", err),
            AppError::ParseType(err) => write!(f, "{}", err),
            AppError::ParsePriority(err) => write!(f, "{}", err),
            AppError::ParseDate(err) => write!(f, "{}", err),
            AppError::InvalidArgument(message) => write!(f, "{}", message),
            AppError::NotFound(id) => write!(f, "activity '{}' not found", id),
            AppError::AlreadyCompleted(id) => {
                write!(f, "activity '{}' is already completed", id)
            }
            AppError::UnresolvedBlock {
                name,
                scheduled_date,
            } => write!(
                f,
                "could not determine block or cycle for activity '{}' ({})",
                name, scheduled_date
            ),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Db(err) => Some(err),
            AppError::Config(err) => Some(err),
            AppError::Audit(err) => Some(err),
            AppError::Lock(err) => Some(err),
            AppError::ParseStatus(err) => Some(err),
            AppError::ParseType(err) => Some(err),
            AppError::ParsePriority(err) => Some(err),
            AppError::ParseDate(err) => Some(err),
            AppError::InvalidArgument(_)
            | AppError::NotFound(_)
            | AppError::AlreadyCompleted(_)
            | AppError::UnresolvedBlock { .. } => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        AppError::Db(value)
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        AppError::Config(value)
    }
}

impl From<AuditWriteError> for AppError {
    fn from(value: AuditWriteError) -> Self {
        AppError::Audit(value)
    }
}

impl From<ParseStatusError> for AppError {
    fn from(value: ParseStatusError) -> Self {
        AppError::ParseStatus(value)
    }
}

impl From<ParseActivityTypeError> for AppError {
    fn from(value: ParseActivityTypeError) -> Self {
        AppError::ParseType(value)
    }
}

impl From<ParsePriorityError> for AppError {
    fn from(value: ParsePriorityError) -> Self {
        AppError::ParsePriority(value)
    }
}

impl From<ParseTimestampError> for AppError {
    fn from(value: ParseTimestampError) -> Self {
        AppError::ParseDate(value)
    }
}

impl From<RedistributionError> for AppError {
    fn from(value: RedistributionError) -> Self {
        match value {
            RedistributionError::MissingActivityId => {
                AppError::InvalidArgument("an activity id is required".to_string())
            }
            RedistributionError::InvalidHectares(hectares) => AppError::InvalidArgument(format!(
                "completed hectares must be a number above 0, got {hectares}"
            )),
            RedistributionError::NotFound(id) => AppError::NotFound(id),
            RedistributionError::AlreadyCompleted(id) => AppError::AlreadyCompleted(id),
            RedistributionError::UnresolvedBlock {
                name,
                scheduled_date,
            } => AppError::UnresolvedBlock {
                name,
                scheduled_date,
            },
            RedistributionError::Db(err) => AppError::Db(err),
            RedistributionError::Lock(err) => AppError::Lock(err),
            RedistributionError::BadDate(err) => AppError::ParseDate(err),
        }
    }
}

impl From<ReorganizeError> for AppError {
    fn from(value: ReorganizeError) -> Self {
        match value {
            ReorganizeError::NotFound(id) | ReorganizeError::NotFoundInCycle(id) => {
                AppError::NotFound(id)
            }
            ReorganizeError::Db(err) => AppError::Db(err),
            ReorganizeError::Audit(err) => AppError::Audit(err),
            other => AppError::InvalidArgument(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests;

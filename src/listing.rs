use std::str::FromStr;

use crate::app::ActivityView;
use crate::domain::status::ActivityStatus;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityListFilter {
    pub include_all: bool,
    pub status: Option<String>,
    pub activity_type: Option<String>,
    pub block: Option<u32>,
    pub query: Option<String>,
}

pub fn apply_filters(activities: Vec<ActivityView>, filter: &ActivityListFilter) -> Vec<ActivityView> {
    let normalized = NormalizedFilter::from(filter);
    if normalized.has_no_user_filters() && normalized.include_all {
        return activities;
    }

    activities
        .into_iter()
        .filter(|activity| matches_filter(activity, &normalized))
        .collect()
}

#[derive(Debug, Clone, Default)]
struct NormalizedFilter {
    include_all: bool,
    status: Option<String>,
    activity_type: Option<String>,
    block: Option<u32>,
    query: Option<String>,
}

impl NormalizedFilter {
    fn has_no_user_filters(&self) -> bool {
        self.status.is_none()
            && self.activity_type.is_none()
            && self.block.is_none()
            && self.query.is_none()
    }
}

impl From<&ActivityListFilter> for NormalizedFilter {
    fn from(value: &ActivityListFilter) -> Self {
        Self {
            include_all: value.include_all,
            status: value.status.as_deref().and_then(normalize_status),
            activity_type: normalize_scalar(value.activity_type.as_deref()),
            block: value.block,
            query: normalize_scalar(value.query.as_deref()),
        }
    }
}

fn matches_filter(activity: &ActivityView, filter: &NormalizedFilter) -> bool {
    if should_hide_finished(activity, filter) {
        return false;
    }

    if let Some(expected_status) = filter.status.as_deref() {
        if activity.status.to_ascii_lowercase() != expected_status {
            return false;
        }
    }

    if let Some(expected_type) = filter.activity_type.as_deref() {
        if activity.activity_type.to_ascii_lowercase() != expected_type {
            return false;
        }
    }

    if let Some(expected_block) = filter.block {
        if activity.block != Some(expected_block) {
            return false;
        }
    }

    if let Some(query) = filter.query.as_deref() {
        return matches_query(activity, query);
    }

    true
}

/// Without `--all`, the default listing shows only the live calendar:
/// completed and cancelled activities are hidden unless the status filter
/// names one of them explicitly.
fn should_hide_finished(activity: &ActivityView, filter: &NormalizedFilter) -> bool {
    if filter.include_all || filter.status.is_some() {
        return false;
    }
    ActivityStatus::from_str(&activity.status)
        .map(ActivityStatus::is_terminal)
        .unwrap_or(false)
}

fn matches_query(activity: &ActivityView, query: &str) -> bool {
    let query = query.to_ascii_lowercase();
    let notes = activity.notes.as_deref().unwrap_or("").to_ascii_lowercase();

    activity.id.to_ascii_lowercase().contains(&query)
        || activity.name.to_ascii_lowercase().contains(&query)
        || notes.contains(&query)
}

/// Status filters accept the same aliases the store does, so `--status
/// aplazada` and `--status deferred` match the same rows.
fn normalize_status(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(
        ActivityStatus::from_str(trimmed)
            .map(|status| status.as_str().to_string())
            .unwrap_or_else(|_| trimmed.to_ascii_lowercase()),
    )
}

fn normalize_scalar(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_ascii_lowercase())
    }
}

use std::io::{self, IsTerminal};

use crate::app::{ActivityView, BlockStats, CompletionView};
use crate::listing::ActivityListFilter;
use crate::redistribution::RedistributionDetail;
use crate::reorganize::DeferOutcome;

pub fn print_activity_list(activities: &[ActivityView], filter: &ActivityListFilter) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Activities"));
    if let Some(summary) = filter_summary(filter) {
        println!("{}", palette.dim(&format!("filters: {summary}")));
    }

    if activities.is_empty() {
        println!("{}", palette.dim("no activities matched"));
        return;
    }

    for activity in activities {
        println!("{}", format_activity_row(activity, &palette));
    }
    println!("{}", palette.dim(&format!("{} activity(ies)", activities.len())));
}

fn format_activity_row(activity: &ActivityView, palette: &Palette) -> String {
    let mut line = format!(
        "{} {} {} {}",
        palette.dim(day_of(&activity.scheduled_date)),
        palette.id(&activity.id),
        palette.status(&activity.status),
        activity.name
    );

    if let Some(hectares) = activity.planned_hectares {
        line.push(' ');
        line.push_str(&palette.hectares(&format!("{hectares} ha")));
    }
    if activity.is_buffer {
        line.push(' ');
        line.push_str(&palette.buffer_label());
    }

    line
}

pub fn print_activity_show(activity: &ActivityView) {
    let palette = Palette::auto();
    println!(
        "{} {} {}",
        palette.id(&activity.id),
        palette.status(&activity.status),
        activity.name
    );
    println!("  type:      {}", activity.activity_type);
    println!("  scheduled: {}", activity.scheduled_date);
    println!("  duration:  {} min", activity.duration_minutes);
    println!("  priority:  {}", activity.priority);
    match activity.planned_hectares {
        Some(hectares) => println!("  planned:   {hectares} ha"),
        None => println!("  planned:   (default)"),
    }
    if let Some(hectares) = activity.completed_hectares {
        println!("  completed: {hectares} ha");
    }
    if let Some(block) = activity.block {
        let day = activity
            .day_index
            .map(|day| format!(" día {day}"))
            .unwrap_or_default();
        println!("  block:     {block}{day}");
    }
    if activity.is_buffer {
        println!("  {}", palette.buffer_label());
    }
    if let Some(notes) = activity.notes.as_deref() {
        println!("  notes:     {notes}");
    }
}

pub fn print_completion(outcome: &CompletionView) {
    let palette = Palette::auto();
    let delta = outcome.hectares_difference;
    println!(
        "completed {} {} {}",
        palette.id(&outcome.activity.id),
        palette.status(&outcome.activity.status),
        outcome.activity.name
    );
    println!(
        "  planned {} ha, worked {} ha ({}{} ha)",
        outcome.planned_hectares,
        outcome.completed_hectares,
        if delta >= 0.0 { "+" } else { "" },
        delta
    );
    println!(
        "  cycle {} ({}), {} activity(ies) redistributed",
        outcome.cycle_info.name, outcome.cycle_info.number, outcome.redistributed_count
    );

    for detail in &outcome.details {
        println!("  {}", format_detail(detail, &palette));
    }

    let info = &outcome.block_info;
    println!(
        "  bloque {}: {} ha planned, {} ha completed, {} ha pending",
        info.block_number,
        info.total_planned_hectares,
        info.completed_hectares,
        info.pending_hectares
    );
}

fn format_detail(detail: &RedistributionDetail, palette: &Palette) -> String {
    match detail {
        RedistributionDetail::Updated { message, .. } => {
            format!("{} {}", palette.tag("updated", "33"), message)
        }
        RedistributionDetail::NewActivity { message, .. } => {
            format!("{} {}", palette.tag("new", "32"), message)
        }
        RedistributionDetail::Deleted { message, .. } => {
            format!("{} {}", palette.tag("deleted", "31"), message)
        }
        RedistributionDetail::Shifted { message, .. } => {
            format!("{} {}", palette.tag("shifted", "36"), message)
        }
        RedistributionDetail::Warning { message, .. } => {
            format!("{} {}", palette.tag("warning", "1;31"), message)
        }
    }
}

pub fn print_defer(outcome: &DeferOutcome) {
    let palette = Palette::auto();
    println!(
        "deferred {} from {} to {}",
        palette.id(&outcome.activity_id),
        outcome.old_date,
        outcome.new_date
    );
    println!(
        "  {} working day(s) shifted, {} of {} cycle activity(ies) reorganized (months {}-{})",
        outcome.days_shifted,
        outcome.reorganized_count,
        outcome.total_activities_in_cycle,
        outcome.cycle_months[0],
        outcome.cycle_months[1]
    );
    println!("  reason: {}", outcome.reason);
    for warning in &outcome.warnings {
        println!("  {} {}", palette.tag("warning", "1;31"), warning);
    }
}

pub fn print_block_stats(stats: &BlockStats) {
    let palette = Palette::auto();
    println!("{}", palette.heading(&format!("Bloque {}", stats.block_number)));
    println!(
        "  activities: {} total, {} completed",
        stats.total_activities, stats.completed_activities
    );
    println!(
        "  hectares:   {} planned, {} completed, {} pending",
        stats.total_planned_hectares, stats.total_completed_hectares, stats.pending_hectares
    );
}

fn day_of(scheduled_date: &str) -> &str {
    scheduled_date.get(..10).unwrap_or(scheduled_date)
}

fn filter_summary(filter: &ActivityListFilter) -> Option<String> {
    let mut parts = Vec::new();
    if filter.include_all {
        parts.push("all=true".to_string());
    }
    if let Some(status) = filter.status.as_deref().and_then(non_empty) {
        parts.push(format!("status={status}"));
    }
    if let Some(kind) = filter.activity_type.as_deref().and_then(non_empty) {
        parts.push(format!("type={kind}"));
    }
    if let Some(block) = filter.block {
        parts.push(format!("block={block}"));
    }
    if let Some(query) = filter.query.as_deref().and_then(non_empty) {
        parts.push(format!("query={query}"));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

fn non_empty(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }

    fn status(&self, status: &str) -> String {
        let upper = status.to_ascii_uppercase();
        self.paint(status_color_code(status), &format!("[{upper}]"))
    }

    fn hectares(&self, text: &str) -> String {
        self.paint("35", text)
    }

    fn buffer_label(&self) -> String {
        self.paint("90", "(comodín)")
    }

    fn tag(&self, label: &str, code: &str) -> String {
        self.paint(code, &format!("[{label}]"))
    }
}

fn status_color_code(status: &str) -> &'static str {
    match status.trim().to_ascii_lowercase().as_str() {
        "scheduled" => "36",
        "deferred" => "33",
        "completed" => "32",
        "cancelled" => "31",
        "rescheduled" => "35",
        _ => "37",
    }
}

#[cfg(test)]
mod tests {
    use super::{day_of, filter_summary};
    use crate::listing::ActivityListFilter;

    #[test]
    fn filter_summary_formats_only_active_filters() {
        let filter = ActivityListFilter {
            include_all: false,
            status: Some("deferred".to_string()),
            activity_type: Some("spraying".to_string()),
            block: Some(9),
            query: Some("remanente".to_string()),
        };

        let summary = filter_summary(&filter).expect("summary should exist");
        assert_eq!(summary, "status=deferred type=spraying block=9 query=remanente");
    }

    #[test]
    fn filter_summary_is_none_for_empty_filters() {
        let filter = ActivityListFilter::default();
        assert!(filter_summary(&filter).is_none());
    }

    #[test]
    fn filter_summary_includes_all_flag() {
        let filter = ActivityListFilter {
            include_all: true,
            ..ActivityListFilter::default()
        };
        let summary = filter_summary(&filter).expect("summary should exist");
        assert_eq!(summary, "all=true");
    }

    #[test]
    fn day_of_truncates_to_the_date() {
        assert_eq!(day_of("2026-02-03T06:00:00Z"), "2026-02-03");
        assert_eq!(day_of("short"), "short");
    }
}

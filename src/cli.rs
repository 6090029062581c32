use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, Parser, Subcommand};

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

#[derive(Debug, Parser)]
#[command(name = "surco")]
#[command(bin_name = "surco")]
#[command(version)]
#[command(about = "A seasonal-cycle activity scheduler with hectare redistribution")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'd',
        long,
        env = "SURCO_DB_PATH",
        default_value = ".surco/activities.sqlite",
        help = "Path to the local SQLite activity database."
    )]
    pub db: String,

    #[arg(
        short = 'C',
        long = "data-root",
        env = "SURCO_DATA_ROOT",
        default_value = ".",
        help = "Farm data root that contains .surco/."
    )]
    pub data_root: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Create a new activity.")]
    New(NewArgs),
    #[command(about = "List activities with filtering.")]
    Ls(ListArgs),
    #[command(about = "Show one activity by id.")]
    Show(ShowArgs),
    #[command(about = "Update activity fields.")]
    Update(UpdateArgs),
    #[command(about = "Delete one activity.")]
    Rm(RmArgs),
    #[command(about = "Complete an activity with its actual hectares and rebalance the block.")]
    Complete(CompleteArgs),
    #[command(about = "Defer an activity to a new date and reflow its cycle.")]
    Defer(DeferArgs),
    #[command(about = "Show block-level hectare totals.")]
    Stats(StatsArgs),
    #[command(about = "Generate or install shell completions.")]
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
#[command(about = "Create a new activity.")]
pub struct NewArgs {
    #[arg(help = "Activity name, e.g. 'Aplicación Preventiva - Bloque 14 Día 2'.")]
    pub name: String,

    #[arg(
        short = 't',
        long = "type",
        help = "Activity type (irrigation, spraying, harvest, ...)."
    )]
    pub activity_type: Option<String>,

    #[arg(
        short = 'D',
        long = "date",
        help = "Scheduled date (RFC3339 or YYYY-MM-DD)."
    )]
    pub date: String,

    #[arg(short = 'p', long, help = "Priority (critical, high, medium, low).")]
    pub priority: Option<String>,

    #[arg(short = 'H', long, help = "Planned hectares for the slot.")]
    pub hectares: Option<f64>,

    #[arg(
        long,
        help = "Duration in minutes (derived from hectares at 8 min/ha when omitted)."
    )]
    pub duration: Option<i64>,
}

#[derive(Debug, Args)]
#[command(about = "List activities.")]
pub struct ListArgs {
    #[arg(
        short = 'a',
        long = "all",
        help = "Include completed and cancelled activities."
    )]
    pub all: bool,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,

    #[arg(short = 's', long, help = "Filter by status.")]
    pub status: Option<String>,

    #[arg(short = 't', long = "type", help = "Filter by activity type.")]
    pub activity_type: Option<String>,

    #[arg(short = 'b', long, help = "Filter by block number.")]
    pub block: Option<u32>,

    #[arg(short = 'q', long, help = "Text query over id, name, and notes.")]
    pub query: Option<String>,
}

#[derive(Debug, Args)]
#[command(about = "Show one activity.")]
pub struct ShowArgs {
    #[arg(help = "Activity id.")]
    pub id: String,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(about = "Update activity fields.")]
pub struct UpdateArgs {
    #[arg(help = "Activity id.")]
    pub id: String,

    #[arg(short = 'n', long, help = "Set name.")]
    pub name: Option<String>,

    #[arg(short = 't', long = "type", help = "Set activity type.")]
    pub activity_type: Option<String>,

    #[arg(short = 'D', long = "date", help = "Set scheduled date.")]
    pub date: Option<String>,

    #[arg(short = 'p', long, help = "Set priority.")]
    pub priority: Option<String>,

    #[arg(short = 's', long, help = "Set status.")]
    pub status: Option<String>,

    #[arg(short = 'H', long, help = "Set planned hectares.")]
    pub hectares: Option<f64>,

    #[arg(long, help = "Set duration in minutes.")]
    pub duration: Option<i64>,

    #[arg(long, help = "Set notes.")]
    pub notes: Option<String>,
}

#[derive(Debug, Args)]
#[command(about = "Delete one activity.")]
pub struct RmArgs {
    #[arg(help = "Activity id.")]
    pub id: String,
}

#[derive(Debug, Args)]
#[command(about = "Complete an activity with actual hectares.")]
pub struct CompleteArgs {
    #[arg(help = "Activity id.")]
    pub id: String,

    #[arg(short = 'H', long, help = "Actual hectares worked.")]
    pub hectares: f64,

    #[arg(short = 'n', long, help = "Completion notes.")]
    pub notes: Option<String>,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(about = "Defer an activity and reflow its cycle.")]
pub struct DeferArgs {
    #[arg(help = "Activity id.")]
    pub id: String,

    #[arg(
        short = 'o',
        long = "old-date",
        help = "Current scheduled date (RFC3339)."
    )]
    pub old_date: String,

    #[arg(
        short = 'n',
        long = "new-date",
        help = "New date (RFC3339, must fall on a working day)."
    )]
    pub new_date: String,

    #[arg(short = 'r', long, help = "Reason for the deferral.")]
    pub reason: String,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(about = "Show block totals.")]
pub struct StatsArgs {
    #[arg(short = 'b', long, help = "Block number.")]
    pub block: u32,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
#[command(about = "Generate or install shell completions.")]
pub struct CompletionsArgs {
    #[arg(help = "Shell name (bash, zsh, fish). Auto-detected if omitted.")]
    pub shell: Option<String>,

    #[arg(
        short = 'i',
        long = "install",
        help = "Write completions to the canonical path for the shell."
    )]
    pub install: bool,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;

use clap::Parser;

use super::{Cli, Commands};

fn parse(args: &[&str]) -> Cli {
    Cli::parse_from(args)
}

#[test]
fn global_defaults_apply() {
    let cli = parse(&["surco", "ls"]);
    assert_eq!(cli.db, ".surco/activities.sqlite");
    assert_eq!(cli.data_root.to_str(), Some("."));
}

#[test]
fn new_parses_all_flags() {
    let cli = parse(&[
        "surco",
        "new",
        "Bloque 14 - Día 2",
        "--type",
        "spraying",
        "--date",
        "2026-02-03T06:00:00Z",
        "--priority",
        "high",
        "--hectares",
        "60",
    ]);
    match cli.command {
        Commands::New(args) => {
            assert_eq!(args.name, "Bloque 14 - Día 2");
            assert_eq!(args.activity_type.as_deref(), Some("spraying"));
            assert_eq!(args.date, "2026-02-03T06:00:00Z");
            assert_eq!(args.priority.as_deref(), Some("high"));
            assert_eq!(args.hectares, Some(60.0));
            assert!(args.duration.is_none());
        }
        other => panic!("expected New, got {:?}", other),
    }
}

#[test]
fn ls_filters_parse() {
    let cli = parse(&[
        "surco", "ls", "--all", "--status", "deferred", "--block", "9", "--json",
    ]);
    match cli.command {
        Commands::Ls(args) => {
            assert!(args.all);
            assert!(args.json);
            assert_eq!(args.status.as_deref(), Some("deferred"));
            assert_eq!(args.block, Some(9));
            assert!(args.query.is_none());
        }
        other => panic!("expected Ls, got {:?}", other),
    }
}

#[test]
fn complete_requires_hectares_value() {
    let cli = parse(&["surco", "complete", "finca-1a2b", "--hectares", "72.5"]);
    match cli.command {
        Commands::Complete(args) => {
            assert_eq!(args.id, "finca-1a2b");
            assert_eq!(args.hectares, 72.5);
            assert!(args.notes.is_none());
        }
        other => panic!("expected Complete, got {:?}", other),
    }

    let missing = Cli::try_parse_from(["surco", "complete", "finca-1a2b"]);
    assert!(missing.is_err());
}

#[test]
fn defer_parses_dates_and_reason() {
    let cli = parse(&[
        "surco",
        "defer",
        "finca-1a2b",
        "--old-date",
        "2026-02-02T06:00:00Z",
        "--new-date",
        "2026-02-05T06:00:00Z",
        "--reason",
        "lluvia fuerte",
    ]);
    match cli.command {
        Commands::Defer(args) => {
            assert_eq!(args.old_date, "2026-02-02T06:00:00Z");
            assert_eq!(args.new_date, "2026-02-05T06:00:00Z");
            assert_eq!(args.reason, "lluvia fuerte");
        }
        other => panic!("expected Defer, got {:?}", other),
    }
}

#[test]
fn stats_parses_block() {
    let cli = parse(&["surco", "stats", "--block", "12"]);
    match cli.command {
        Commands::Stats(args) => {
            assert_eq!(args.block, 12);
            assert!(!args.json);
        }
        other => panic!("expected Stats, got {:?}", other),
    }
}

#[test]
fn completions_parses_with_shell() {
    let cli = parse(&["surco", "completions", "bash"]);
    match cli.command {
        Commands::Completions(args) => {
            assert_eq!(args.shell.as_deref(), Some("bash"));
            assert!(!args.install);
        }
        other => panic!("expected Completions, got {:?}", other),
    }
}

#[test]
fn completions_install_flag_parses() {
    let cli = parse(&["surco", "completions", "--install"]);
    match cli.command {
        Commands::Completions(args) => {
            assert!(args.shell.is_none());
            assert!(args.install);
        }
        other => panic!("expected Completions, got {:?}", other),
    }
}

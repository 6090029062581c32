mod activity_id;
mod app;
mod audit;
mod cli;
mod completions;
mod config;
mod cycles;
mod dates;
mod db;
mod domain;
mod listing;
mod locks;
mod redistribution;
mod reorganize;
mod shift;
mod ui;
mod workdays;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

fn run() -> Result<(), app::AppError> {
    use app::{NewActivityInput, UpdateActivityPatch};
    use clap::Parser;
    use cli::Commands;

    let cli = cli::Cli::parse();

    if let Commands::Completions(args) = &cli.command {
        return completions::run_completions_command(args.shell.as_deref(), args.install);
    }

    let app = app::App::open(&cli.db, cli.data_root)?;

    match cli.command {
        Commands::New(args) => {
            let activity = app.create_activity(NewActivityInput {
                name: args.name,
                activity_type: args.activity_type,
                scheduled_date: args.date,
                priority: args.priority,
                planned_hectares: args.hectares,
                duration_minutes: args.duration,
            })?;
            println!("created {} [{}] {}", activity.id, activity.status, activity.name);
        }
        Commands::Ls(args) => {
            let filter = listing::ActivityListFilter {
                include_all: args.all,
                status: args.status.clone(),
                activity_type: args.activity_type.clone(),
                block: args.block,
                query: args.query.clone(),
            };
            let activities = listing::apply_filters(app.list_activities()?, &filter);
            if args.json {
                print_json(&activities);
            } else {
                ui::print_activity_list(&activities, &filter);
            }
        }
        Commands::Show(args) => match app.show_activity(&args.id)? {
            Some(activity) => {
                if args.json {
                    print_json(&activity);
                } else {
                    ui::print_activity_show(&activity);
                }
            }
            None => return Err(app::AppError::NotFound(args.id)),
        },
        Commands::Update(args) => {
            let activity = app.update_activity(
                &args.id,
                UpdateActivityPatch {
                    name: args.name,
                    activity_type: args.activity_type,
                    scheduled_date: args.date,
                    priority: args.priority,
                    status: args.status,
                    planned_hectares: args.hectares,
                    duration_minutes: args.duration,
                    notes: args.notes,
                },
            )?;
            println!("updated {} [{}] {}", activity.id, activity.status, activity.name);
        }
        Commands::Rm(args) => {
            app.delete_activity(&args.id)?;
            println!("deleted {}", args.id);
        }
        Commands::Complete(args) => {
            let outcome =
                app.complete_with_hectares(&args.id, args.hectares, args.notes.as_deref())?;
            if args.json {
                print_json(&outcome);
            } else {
                ui::print_completion(&outcome);
            }
        }
        Commands::Defer(args) => {
            let outcome =
                app.defer_activity(&args.id, &args.old_date, &args.new_date, &args.reason)?;
            if args.json {
                print_json(&outcome);
            } else {
                ui::print_defer(&outcome);
            }
        }
        Commands::Stats(args) => {
            let stats = app.block_stats(args.block)?;
            if args.json {
                print_json(&stats);
            } else {
                ui::print_block_stats(&stats);
            }
        }
        Commands::Completions(_) => {
            unreachable!("completions are handled before app initialization")
        }
    }

    Ok(())
}

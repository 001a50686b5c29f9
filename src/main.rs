use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use workout_planner::app::{handle_fatal_error, init_logging, AppConfig};
use workout_planner::extraction::{
    AnthropicClient, CaptureFlow, ExtractionPipeline, TextFileRecognizer,
};
use workout_planner::form::{commit_new_workout_day, WorkoutDayForm};
use workout_planner::ids::UuidGenerator;
use workout_planner::persistence::{FileKeyValueStore, LoadOutcome, PersistenceAdapter};
use workout_planner::query::{
    get_workout_day, get_workout_days_by_routine, resolve_workout_day_program,
    sorted_workout_days,
};
use workout_planner::store::{StoreState, WorkoutDayExercise};
use workout_planner::workspace::Workspace;
use workout_planner::Error;

/// Plan training routines and import exercise sheets
#[derive(Parser)]
#[command(name = "workout-planner")]
#[command(about = "Plan training routines and import exercise sheets", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding the persisted store
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage routines
    Routine {
        #[command(subcommand)]
        command: RoutineCommands,
    },
    /// Manage workout days
    Day {
        #[command(subcommand)]
        command: DayCommands,
    },
    /// Extract exercises from recognized sheet text and print them as JSON
    Extract {
        /// File containing the recognized text
        file: PathBuf,
    },
    /// Extract exercises from recognized sheet text into a new workout day
    Import {
        /// File containing the recognized text
        file: PathBuf,
        /// Name of the new workout day
        name: String,
        /// Routine to add the day to (default: the selected routine)
        #[arg(long)]
        routine: Option<String>,
    },
}

#[derive(Subcommand)]
enum RoutineCommands {
    /// Create a routine
    New { name: String },
    /// List routines, marking the selected one
    List,
    /// Make a routine the current one
    Select { id: String },
}

#[derive(Subcommand)]
enum DayCommands {
    /// Append an empty workout day to a routine
    New {
        name: String,
        #[arg(long)]
        routine: Option<String>,
    },
    /// List the days of a routine in order
    List {
        #[arg(long)]
        routine: Option<String>,
    },
    /// Show a day and its exercises
    Show { id: String },
    /// Rename a day, keeping its position
    Rename { id: String, name: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    let result = run(cli).await;

    if let Err(e) = result {
        handle_fatal_error(e, verbose);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load(cli.verbose, cli.data_dir)?;
    init_logging(&config);

    match cli.command {
        Commands::Routine { command } => run_routine_command(&config, command),
        Commands::Day { command } => run_day_command(&config, command),
        Commands::Extract { file } => run_extract(&config, &file).await,
        Commands::Import {
            file,
            name,
            routine,
        } => run_import(&config, &file, name, routine).await,
    }
}

fn open_workspace(config: &AppConfig) -> anyhow::Result<Workspace<FileKeyValueStore>> {
    let backend = FileKeyValueStore::open(&config.data_dir).with_context(|| {
        format!("Failed to open data directory {}", config.data_dir.display())
    })?;
    let workspace = Workspace::open_with(
        PersistenceAdapter::with_slot(backend, config.slot.as_str()),
        Arc::new(UuidGenerator),
        config.reference_policy,
    )
    .map_err(Error::from)?;

    match workspace.load_outcome() {
        LoadOutcome::Corrupted => warn!("Stored data was unreadable and has been reset"),
        LoadOutcome::Migration(outcome) => info!("Stored data upgraded: {:?}", outcome),
        LoadOutcome::Fresh | LoadOutcome::Current => {}
    }
    Ok(workspace)
}

/// Explicit id, else the selected routine, else the first one
fn resolve_routine(state: &StoreState, requested: Option<String>) -> Result<String, Error> {
    let id = requested
        .or_else(|| state.selected_routine_id.clone())
        .or_else(|| state.routines.first().map(|r| r.id.clone()))
        .ok_or_else(|| Error::not_found("no routine exists"))?;

    if state.routines.iter().any(|r| r.id == id) {
        Ok(id)
    } else {
        Err(Error::not_found(format!("routine {id}")))
    }
}

fn run_routine_command(config: &AppConfig, command: RoutineCommands) -> anyhow::Result<()> {
    let mut workspace = open_workspace(config)?;

    match command {
        RoutineCommands::New { name } => {
            let routine = workspace.new_routine(name).into_result().map_err(Error::from)?;
            println!("{}\t{}", routine.id, routine.name);
        }
        RoutineCommands::List => {
            let state = workspace.state();
            for routine in state.routines.iter() {
                let marker = if state.selected_routine_id.as_deref() == Some(routine.id.as_str()) {
                    "*"
                } else {
                    " "
                };
                println!("{} {}\t{}", marker, routine.id, routine.name);
            }
        }
        RoutineCommands::Select { id } => {
            let routine = workspace
                .select_routine(&id)
                .into_result()
                .map_err(Error::from)?
                .ok_or_else(|| Error::not_found(format!("routine {id}")))?;
            println!("Selected {}", routine.name);
        }
    }

    workspace.close().map_err(Error::from)?;
    Ok(())
}

fn run_day_command(config: &AppConfig, command: DayCommands) -> anyhow::Result<()> {
    let mut workspace = open_workspace(config)?;

    match command {
        DayCommands::New { name, routine } => {
            let routine_id = resolve_routine(workspace.state(), routine)?;
            let day_order = u32::try_from(
                get_workout_days_by_routine(&workspace.state().workout_days, &routine_id).len(),
            )
            .unwrap_or(u32::MAX)
            .saturating_add(1);

            let day = workspace
                .new_workout_day(&routine_id, name, day_order)
                .map_err(Error::from)?
                .into_result()
                .map_err(Error::from)?;
            println!("{}\t{}", day.id, day.name);
        }
        DayCommands::List { routine } => {
            let state = workspace.state();
            let routine_id = resolve_routine(state, routine)?;
            let days = get_workout_days_by_routine(&state.workout_days, &routine_id);
            for day in sorted_workout_days(&days) {
                println!("{}. {}\t{}", day.day_order, day.name, day.id);
            }
        }
        DayCommands::Show { id } => {
            let state = workspace.state();
            let day = get_workout_day(&state.workout_days, &id)
                .ok_or_else(|| Error::not_found(format!("workout day {id}")))?;
            println!("{}", day.name);
            for (record, exercise) in
                resolve_workout_day_program(&state.exercises, &state.workout_day_exercises, &id)
            {
                println!(
                    "  {}. {} {}",
                    record.exercise_order,
                    exercise.name,
                    describe_prescription(&record)
                );
            }
        }
        DayCommands::Rename { id, name } => {
            let order = get_workout_day(&workspace.state().workout_days, &id)
                .map(|day| day.day_order)
                .ok_or_else(|| Error::not_found(format!("workout day {id}")))?;
            let day = workspace
                .update_workout_day(&id, name, order)
                .into_result()
                .map_err(Error::from)?
                .ok_or_else(|| Error::not_found(format!("workout day {id}")))?;
            println!("{}\t{}", day.id, day.name);
        }
    }

    workspace.close().map_err(Error::from)?;
    Ok(())
}

fn describe_prescription(record: &WorkoutDayExercise) -> String {
    let mut text = format!("{}x", record.sets);
    match (record.min_reps, record.max_reps) {
        (Some(min), Some(max)) if min != max => text.push_str(&format!("{min}-{max}")),
        (Some(reps), _) | (None, Some(reps)) => text.push_str(&reps.to_string()),
        (None, None) => text.push('?'),
    }
    if let Some(weight) = record.weight {
        text.push_str(&format!(" @ {weight}"));
    }
    if let Some(rest) = record.rest_interval_seconds {
        text.push_str(&format!(", rest {rest}s"));
    }
    text
}

fn build_pipeline(config: &AppConfig) -> anyhow::Result<ExtractionPipeline> {
    let client = AnthropicClient::new(
        config.require_api_key()?.to_string(),
        config.max_retries,
        config.retry_delay_ms,
    )
    .map_err(Error::from)?;

    Ok(ExtractionPipeline::new(Arc::new(client))
        .with_model(config.model.as_str())
        .with_max_tokens(config.max_tokens))
}

/// Token cancelled on Ctrl-C
fn ctrl_c_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted, cancelling extraction");
            trigger.cancel();
        }
    });
    cancel
}

async fn run_extract(config: &AppConfig, file: &Path) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config)?;
    let cancel = ctrl_c_token();

    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let drafts = pipeline
        .get_exercises_from_text_cancellable(&text, &cancel)
        .await
        .map_err(Error::from)?;

    println!("{}", serde_json::to_string_pretty(&drafts)?);
    Ok(())
}

async fn run_import(
    config: &AppConfig,
    file: &Path,
    name: String,
    routine: Option<String>,
) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config)?;
    let mut workspace = open_workspace(config)?;
    let routine_id = resolve_routine(workspace.state(), routine)?;

    let flow = CaptureFlow::new(Arc::new(TextFileRecognizer), pipeline);
    let mut form = WorkoutDayForm::named(name);
    let added = flow
        .run(file, &mut form, &ctrl_c_token())
        .await
        .map_err(Error::from)?;
    info!("Extracted {} exercises from {}", added, file.display());

    let day = commit_new_workout_day(&mut workspace, &routine_id, &form)
        .map_err(Error::from)?
        .into_result()
        .map_err(Error::from)?;
    println!("{}\t{}\t{} exercises", day.id, day.name, added);

    workspace.close().map_err(Error::from)?;
    Ok(())
}

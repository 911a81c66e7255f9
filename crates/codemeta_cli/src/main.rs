//! Command-line shell over `codemeta_core`.
//!
//! # Responsibility
//! - Resolve settings, start logging, and drive project create/open.
//! - Print the decorated tree and the dangling-note list.

use clap::{Parser, Subcommand};
use codemeta_core::db::open_db;
use codemeta_core::{
    init_logging, CanonicalPath, CoreSettings, NoteRepository, ProjectService, SqliteNoteStore,
    SqliteProjectRepository, TaskOutcome, WorkspaceService, WorkspaceView,
};
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;

/// Attach notes to files inside a project directory.
#[derive(Parser)]
#[command(name = "codemeta")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn a directory into a project and show its tree
    New {
        /// Project root directory
        dir: PathBuf,
        /// Project display name
        #[arg(long)]
        name: String,
    },
    /// Open a project from its s_config.json and show its tree
    Open {
        /// Path to the project's s_config.json
        config: PathBuf,
        /// Only list dangling notes whose path contains this text
        #[arg(long)]
        filter: Option<String>,
    },
    /// Save a note for one file of a project
    Note {
        /// Path to the project's s_config.json
        config: PathBuf,
        /// File the note belongs to
        file: PathBuf,
        /// Note content; blank content clears the highlight
        text: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match CoreSettings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_logging(settings.log_level, &settings.log_dir) {
        eprintln!("warning: logging disabled: {err}");
    }

    match run(cli.command, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_command module=cli status=error");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, settings: &CoreSettings) -> Result<(), String> {
    let workspace = WorkspaceService::new(&settings.db_path);
    match command {
        Commands::New { dir, name } => {
            let handle = workspace
                .create(&dir, &name)
                .map_err(|err| err.to_string())?;
            print_outcome(handle.join(), None)
        }
        Commands::Open { config, filter } => {
            let handle = workspace.open(&config).map_err(|err| err.to_string())?;
            print_outcome(handle.join(), filter.as_deref())
        }
        Commands::Note { config, file, text } => {
            let conn = open_db(&settings.db_path).map_err(|err| err.to_string())?;
            let context = ProjectService::new(SqliteProjectRepository::new(&conn))
                .open_project(&config)
                .map_err(|err| err.to_string())?;
            let absolute = std::path::absolute(&file).map_err(|err| err.to_string())?;
            let path = CanonicalPath::from_path(absolute).map_err(|err| err.to_string())?;
            let note = SqliteNoteStore::new(&conn)
                .save_note(context.project_id, &path, &text)
                .map_err(|err| err.to_string())?;
            let state = if note.is_empty() { "cleared" } else { "saved" };
            println!("{state} note for {path}");
            Ok(())
        }
    }
}

fn print_outcome(
    outcome: TaskOutcome<WorkspaceView, codemeta_core::WorkspaceError>,
    filter: Option<&str>,
) -> Result<(), String> {
    let view = match outcome {
        TaskOutcome::Completed(result) => result.map_err(|err| err.to_string())?,
        TaskOutcome::Cancelled => return Err("scan was superseded".to_string()),
        TaskOutcome::Panicked => return Err("scan worker crashed".to_string()),
    };

    println!("[{}]", view.tree.label);
    for (depth, node) in view.tree.walk() {
        let marker = if node.has_note { "*" } else { " " };
        let suffix = if node.is_dir { "/" } else { "" };
        let label = if depth == 0 { node.path.as_str() } else { node.name.as_str() };
        println!("{marker} {}{label}{suffix}", "  ".repeat(depth));
    }

    println!();
    println!("Dangling Notes");
    for path in view.dangling.filter(filter.unwrap_or("")) {
        println!("  {path}");
    }

    for warning in &view.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(())
}

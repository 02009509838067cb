use anyhow::{anyhow, Result};
use clap::Parser;
use lectern_ingest::Config;
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "lectern", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the database (default: ~/.local/share/lectern/lectern.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Ingest course transcripts into the search index
    ///
    /// Accepts a single transcript or a folder. Folders are walked recursively
    /// for .txt and .md files. For each transcript:
    ///
    /// - Parses the header (course title, link, instructor)
    /// - Records every lesson with its number, title and link
    /// - Splits lesson text into overlapping, sentence-aligned chunks
    /// - Embeds and stores the chunks
    ///
    /// Courses that are already catalogued are skipped unless --replace is
    /// given. Malformed transcripts in a folder are reported and skipped.
    ///
    /// After ingesting, the index stage re-embeds anything stored with a
    /// different embedding model.
    Ingest {
        /// Transcript file or folder (default: docs_path from the config)
        path: Option<PathBuf>,

        /// Remove all courses before ingesting
        #[arg(long)]
        clear: bool,

        /// Re-ingest courses that already exist
        #[arg(long)]
        replace: bool,
    },
    /// Search course content
    Search {
        /// What to search for
        query: String,

        /// Restrict to a course (partial titles work)
        #[arg(long)]
        course: Option<String>,

        /// Restrict to a lesson number
        #[arg(long)]
        lesson: Option<u32>,

        /// Maximum number of results (default: max_results from the config)
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show catalogued courses and index statistics
    Courses,
    /// Show a course outline with its lessons and links
    Outline {
        /// Course title (partial titles work)
        course: String,
    },
    /// Ingest one transcript, search it, and print the lesson links found
    CheckLinks {
        /// Path to a course transcript
        file: PathBuf,

        /// Query to run against the ingested transcript
        #[arg(long, default_value = "introduction")]
        query: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print one setting, or the whole config file
    Get { key: Option<String> },
    /// Change a setting in the config file
    Set { key: String, value: String },
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file if it does not exist
    Init,
}

fn load_config(db: Option<PathBuf>) -> Result<Config> {
    match db {
        Some(path) => Config::load_with_db_path(path),
        None => Config::load(),
    }
}

fn run_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => commands::config::show_config(),
        ConfigAction::Get { key } => commands::config::get_config(key),
        ConfigAction::Set { key, value } => commands::config::set_config(&key, &value),
        ConfigAction::Path => commands::config::show_path(),
        ConfigAction::Example => commands::config::show_example(),
        ConfigAction::Init => commands::config::init_config(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config commands must work even when the config file is broken.
    let command = match cli.command {
        Commands::Config { action } => return run_config(action),
        command => command,
    };

    let config = load_config(cli.db)?;
    twyg::setup(config.logging.clone())
        .map_err(|e| anyhow!("Failed to set up logging: {e}"))?;

    // Ensure database directory exists
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    match command {
        Commands::Ingest {
            path,
            clear,
            replace,
        } => {
            let path = path.unwrap_or_else(|| config.docs_path.clone());
            commands::run_ingest(path, &config, clear, replace).await?;
        }
        Commands::Search {
            query,
            course,
            lesson,
            limit,
        } => {
            commands::run_search(&query, course, lesson, limit, &config)?;
        }
        Commands::Courses => {
            commands::show_courses(&config)?;
        }
        Commands::Outline { course } => {
            commands::show_outline(&course, &config)?;
        }
        Commands::CheckLinks { file, query } => {
            let stdout = std::io::stdout();
            commands::run_link_check(&file, &query, &config, &mut stdout.lock())?;
        }
        Commands::Config { action } => run_config(action)?,
    }

    Ok(())
}

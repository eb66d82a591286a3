use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};

use quizdrill::{EntityStore, QuizEngine};

#[derive(Parser)]
#[command(name = "quizdrill-cli", about = "Spaced-repetition quiz engine CLI", version)]
struct Cli {
    /// Path to the SQLite database (default: platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List all question sets with their statistics
    Sets,

    /// Show the sets due today, or a single set's due questions
    Due {
        /// Limit to one set
        #[arg(long)]
        set: Option<i64>,
    },

    /// Show aggregated statistics across sets, or for one set
    Stats {
        /// Limit to one set
        #[arg(long)]
        set: Option<i64>,
    },

    /// Create an empty question set
    NewSet {
        /// Unique set name
        name: String,
    },

    /// Delete a question set with its questions and statistics
    DeleteSet {
        /// Set id
        id: i64,
    },

    /// Import a newline-delimited trivia payload file
    Import {
        /// Payload file, one JSON object per line
        file: PathBuf,
    },

    /// Insert the starter sample sets into an empty database
    Seed,
}

fn default_db_path() -> Result<PathBuf> {
    dirs::data_local_dir()
        .map(|p| p.join("quizdrill").join("quizdrill.db"))
        .context("could not determine the platform data directory")
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let db_path = match cli.db {
        Some(path) => path,
        None => default_db_path()?,
    };
    let store = EntityStore::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    let engine = QuizEngine::new(store);
    let today = Local::now().date_naive();

    match cli.command {
        Command::Sets => {
            let sets = engine.sets()?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&sets)?),
                OutputFormat::Plain => {
                    for set in sets {
                        let overview = engine.aggregate_for_set(set.set_id, today)?;
                        println!(
                            "{:>4}  {}  ({}/{} correct, {})",
                            set.set_id,
                            set.name,
                            overview.statistics.correct_count,
                            overview.statistics.total_asked,
                            describe_days(overview.days_since_training),
                        );
                    }
                }
            }
        }
        Command::Due { set: Some(set_id) } => {
            let due = engine.due_questions(set_id, today)?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&due)?),
                OutputFormat::Plain => {
                    if due.is_empty() {
                        println!("nothing due in set {} today", set_id);
                    }
                    for question in due {
                        println!("{:>4}  {}", question.question_id, question.content);
                    }
                }
            }
        }
        Command::Due { set: None } => {
            let sets = engine.sets_with_due_questions(today)?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&sets)?),
                OutputFormat::Plain => {
                    if sets.is_empty() {
                        println!("no set has due questions today");
                    }
                    for set in sets {
                        println!("{:>4}  {}", set.set_id, set.name);
                    }
                }
            }
        }
        Command::Stats { set: Some(set_id) } => {
            let overview = engine.aggregate_for_set(set_id, today)?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&overview)?),
                OutputFormat::Plain => {
                    let name = engine.set(set_id)?.name;
                    println!("{}", name);
                    println!(
                        "  correct: {}/{}",
                        overview.statistics.correct_count, overview.statistics.total_asked
                    );
                    println!("  last trained: {}", describe_days(overview.days_since_training));
                }
            }
        }
        Command::Stats { set: None } => {
            let totals = engine.aggregate_all(today)?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&totals)?),
                OutputFormat::Plain => {
                    println!("correct: {}/{}", totals.correct_count, totals.total_asked);
                    println!("last trained: {}", describe_days(totals.days_since_training));
                }
            }
        }
        Command::NewSet { name } => {
            let set_id = engine.create_set(&name)?;
            println!("created set {} '{}'", set_id, name);
        }
        Command::DeleteSet { id } => {
            engine.delete_set(id)?;
            println!("deleted set {}", id);
        }
        Command::Import { file } => {
            let payload = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let outcomes = engine.import_payload(&payload);
            let mut imported = 0;
            for outcome in &outcomes {
                match &outcome.result {
                    Ok(set) => {
                        imported += 1;
                        println!(
                            "line {}: imported '{}' with {} questions",
                            outcome.line, set.name, set.question_count
                        );
                    }
                    Err(e) => println!("line {}: failed: {}", outcome.line, e),
                }
            }
            println!("{}/{} lines imported", imported, outcomes.len());
        }
        Command::Seed => {
            if engine.seed_sample_data()? {
                println!("inserted sample question sets");
            } else {
                println!("database already has question sets, nothing to do");
            }
        }
    }

    Ok(())
}

fn describe_days(days: Option<i64>) -> String {
    match days {
        None => "never trained".to_string(),
        Some(0) => "trained today".to_string(),
        Some(1) => "trained yesterday".to_string(),
        Some(n) => format!("trained {} days ago", n),
    }
}

//! EduAssess - AI-assisted answer assessment CLI
//!
//! The `eduassess` command batch-scores student answers against a
//! reference answer.
//!
//! ## Commands
//!
//! - `score`: Run a full assessment over a CSV roster
//! - `history`: Browse, export or delete saved assessment runs
//! - `stats`: Aggregate statistics over all saved runs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn, Level};

use eduassess_core::{
    init_tracing, AnswerScorer, BatchScorer, LexicalScorer, ScoredCandidate, ScoringClient,
    ScoringConfig, SortKey, SortOrder,
};
use eduassess_roster::{export_results, load_roster};
use eduassess_store::{AssessmentRecord, AssessmentStore, JsonFileStore};

/// Default location of the assessment history file.
const DEFAULT_STORE: &str = ".eduassess/history.json";

#[derive(Parser)]
#[command(name = "eduassess")]
#[command(author = "EduAssess Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "AI-assisted answer assessment", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a roster of student answers against a reference answer
    Score {
        /// Reference answer text
        #[arg(short, long, conflicts_with = "reference_file")]
        reference: Option<String>,

        /// File containing the reference answer text
        #[arg(long)]
        reference_file: Option<PathBuf>,

        /// CSV roster with student names and answers
        #[arg(long)]
        roster: PathBuf,

        /// Write results to this CSV file
        #[arg(short, long)]
        export: Option<PathBuf>,

        /// Sort results by this key
        #[arg(long, value_enum, default_value_t = SortKeyArg::Name)]
        sort_by: SortKeyArg,

        /// Sort direction
        #[arg(long, value_enum, default_value_t = SortOrderArg::Asc)]
        order: SortOrderArg,

        /// Delay between scoring calls, in milliseconds
        #[arg(long, default_value_t = 2000)]
        pacing_ms: u64,

        /// Scoring service API key
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Score by word overlap only, without calling the AI service
        #[arg(long)]
        offline: bool,

        /// Save the completed run to the history store
        #[arg(long)]
        save: bool,

        /// History store file
        #[arg(long, default_value = DEFAULT_STORE)]
        store: PathBuf,

        /// Name recorded as having run the assessment
        #[arg(long, default_value = "instructor")]
        processed_by: String,

        /// Include student answers in the printed table
        #[arg(long)]
        show_answers: bool,
    },

    /// Browse saved assessment runs
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Aggregate statistics over all saved runs
    Stats {
        /// History store file
        #[arg(long, default_value = DEFAULT_STORE)]
        store: PathBuf,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List saved runs, newest first
    List {
        #[arg(long, default_value = DEFAULT_STORE)]
        store: PathBuf,
    },

    /// Show one saved run in full
    Show {
        /// Run id (full or unique prefix)
        id: String,

        #[arg(long, default_value = DEFAULT_STORE)]
        store: PathBuf,
    },

    /// Export one saved run's results to CSV
    Export {
        /// Run id (full or unique prefix)
        id: String,

        /// Output CSV path
        output: PathBuf,

        #[arg(long, default_value = DEFAULT_STORE)]
        store: PathBuf,
    },

    /// Delete one saved run
    Delete {
        /// Run id (full or unique prefix)
        id: String,

        #[arg(long, default_value = DEFAULT_STORE)]
        store: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortKeyArg {
    Name,
    Score,
    Similarity,
}

impl From<SortKeyArg> for SortKey {
    fn from(arg: SortKeyArg) -> Self {
        match arg {
            SortKeyArg::Name => SortKey::Name,
            SortKeyArg::Score => SortKey::Score,
            SortKeyArg::Similarity => SortKey::Similarity,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortOrderArg {
    Asc,
    Desc,
}

impl From<SortOrderArg> for SortOrder {
    fn from(arg: SortOrderArg) -> Self {
        match arg {
            SortOrderArg::Asc => SortOrder::Asc,
            SortOrderArg::Desc => SortOrder::Desc,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Score {
            reference,
            reference_file,
            roster,
            export,
            sort_by,
            order,
            pacing_ms,
            api_key,
            offline,
            save,
            store,
            processed_by,
            show_answers,
        } => {
            cmd_score(ScoreArgs {
                reference,
                reference_file,
                roster,
                export,
                sort_by: sort_by.into(),
                order: order.into(),
                pacing: Duration::from_millis(pacing_ms),
                api_key,
                offline,
                save,
                store,
                processed_by,
                show_answers,
            })
            .await
        }
        Commands::History { action } => match action {
            HistoryAction::List { store } => cmd_history_list(&store).await,
            HistoryAction::Show { id, store } => cmd_history_show(&id, &store).await,
            HistoryAction::Export { id, output, store } => {
                cmd_history_export(&id, &output, &store).await
            }
            HistoryAction::Delete { id, store } => cmd_history_delete(&id, &store).await,
        },
        Commands::Stats { store } => cmd_stats(&store).await,
    }
}

struct ScoreArgs {
    reference: Option<String>,
    reference_file: Option<PathBuf>,
    roster: PathBuf,
    export: Option<PathBuf>,
    sort_by: SortKey,
    order: SortOrder,
    pacing: Duration,
    api_key: Option<String>,
    offline: bool,
    save: bool,
    store: PathBuf,
    processed_by: String,
    show_answers: bool,
}

async fn cmd_score(args: ScoreArgs) -> Result<()> {
    let reference = resolve_reference(args.reference, args.reference_file.as_deref())?;

    let roster = load_roster(&args.roster)
        .with_context(|| format!("failed to load roster {}", args.roster.display()))?;
    info!(
        candidates = roster.candidates.len(),
        "using columns: name = {:?}, answer = {:?}",
        roster.name_column,
        roster.answer_column
    );

    let scorer: Arc<dyn AnswerScorer> = if args.offline {
        info!("offline mode: scoring by word overlap only");
        Arc::new(LexicalScorer)
    } else {
        let api_key = args.api_key.unwrap_or_default();
        if api_key.is_empty() {
            bail!("no API key; pass --api-key, set GEMINI_API_KEY, or use --offline");
        }
        Arc::new(ScoringClient::new(
            ScoringConfig::default().with_api_key(api_key),
        ))
    };

    let batch = BatchScorer::new(scorer)
        .with_pacing(args.pacing)
        .with_sort(args.sort_by, args.order);

    // Ctrl-C stops the run between candidates; completed rows are kept.
    let token = batch.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("cancellation requested; finishing current candidate");
            token.cancel();
        }
    });

    let total = roster.candidates.len();
    let results = batch
        .score_batch(&reference, &roster.candidates, |progress| {
            info!(
                "[{:>3.0}%] scored {} ({}/{})",
                progress.percent(),
                progress.current_name,
                progress.completed,
                progress.total
            );
        })
        .await;

    if results.len() < total {
        warn!(
            scored = results.len(),
            total, "run was cancelled before completion"
        );
    }

    print_results(&results, args.show_answers);

    if let Some(path) = &args.export {
        export_results(path, &results)
            .with_context(|| format!("failed to export results to {}", path.display()))?;
        println!("Exported results to {}", path.display());
    }

    if args.save {
        let source_file = args
            .roster
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        let record = AssessmentRecord::new(
            reference.as_str(),
            results,
            args.processed_by.as_str(),
            source_file,
        );
        let store = JsonFileStore::new(&args.store);
        store
            .save(&record)
            .await
            .with_context(|| format!("failed to save run to {}", args.store.display()))?;
        println!("Saved assessment {}", record.id);
    }

    Ok(())
}

fn resolve_reference(inline: Option<String>, file: Option<&Path>) -> Result<String> {
    let text = match (inline, file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read reference answer from {}", path.display()))?,
        (None, None) => bail!("a reference answer is required (--reference or --reference-file)"),
    };
    let text = text.trim().to_string();
    if text.is_empty() {
        bail!("reference answer is empty");
    }
    Ok(text)
}

fn print_results(results: &[ScoredCandidate], show_answers: bool) {
    if results.is_empty() {
        println!("No results.");
        return;
    }

    println!();
    println!(
        "{:<24} {:>9} {:>14} {:>8}  {}",
        "Student", "Score (%)", "Similarity (%)", "Status", "Feedback"
    );
    println!("{}", "-".repeat(96));
    for result in results {
        println!(
            "{:<24} {:>9} {:>14} {:>8}  {}",
            result.name,
            result.score,
            result.similarity,
            if result.passed { "PASS" } else { "FAIL" },
            result.feedback
        );
        if show_answers {
            println!("{:<24} answer: {}", "", result.answer);
        }
    }
    println!("{}", "-".repeat(96));

    let passed = results.iter().filter(|r| r.passed).count();
    let average: f64 =
        results.iter().map(|r| r.score as f64).sum::<f64>() / results.len() as f64;
    println!(
        "{} students | {} passed | {} failed | average score {:.1}%",
        results.len(),
        passed,
        results.len() - passed,
        average
    );
}

async fn cmd_history_list(store_path: &Path) -> Result<()> {
    let store = JsonFileStore::new(store_path);
    let records = store.list().await.context("failed to list assessments")?;

    if records.is_empty() {
        println!("No saved assessments.");
        return Ok(());
    }

    println!(
        "{:<10} {:<17} {:>8} {:>10} {:>10}  {}",
        "Id", "Date", "Students", "Avg", "Pass rate", "Source"
    );
    for record in &records {
        println!(
            "{:<10} {:<17} {:>8} {:>9.1}% {:>9.0}%  {}",
            short_id(&record.id),
            record.created_at.format("%Y-%m-%d %H:%M"),
            record.results.len(),
            record.average_score(),
            record.pass_rate(),
            record.source_file.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn cmd_history_show(id: &str, store_path: &Path) -> Result<()> {
    let store = JsonFileStore::new(store_path);
    let record = find_record(&store, id).await?;

    println!("Assessment {}", record.id);
    println!("Date:         {}", record.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Processed by: {}", record.processed_by);
    if let Some(source) = &record.source_file {
        println!("Source file:  {source}");
    }
    println!("Reference answer:\n  {}", record.reference_answer);
    print_results(&record.results, false);
    Ok(())
}

async fn cmd_history_export(id: &str, output: &Path, store_path: &Path) -> Result<()> {
    let store = JsonFileStore::new(store_path);
    let record = find_record(&store, id).await?;

    export_results(output, &record.results)
        .with_context(|| format!("failed to export to {}", output.display()))?;
    println!("Exported {} results to {}", record.results.len(), output.display());
    Ok(())
}

async fn cmd_history_delete(id: &str, store_path: &Path) -> Result<()> {
    let store = JsonFileStore::new(store_path);
    let record = find_record(&store, id).await?;
    store
        .delete(&record.id)
        .await
        .context("failed to delete assessment")?;
    println!("Deleted assessment {}", record.id);
    Ok(())
}

async fn cmd_stats(store_path: &Path) -> Result<()> {
    let store = JsonFileStore::new(store_path);
    let stats = store.stats().await.context("failed to compute stats")?;

    println!("Assessments:   {}", stats.total_assessments);
    println!("Students:      {}", stats.total_students);
    println!("Average score: {:.1}%", stats.average_score);
    println!("Pass rate:     {:.1}%", stats.pass_rate);
    Ok(())
}

/// Resolve a full id or unique prefix to a stored record.
async fn find_record(store: &JsonFileStore, id: &str) -> Result<AssessmentRecord> {
    let records = store.list().await.context("failed to read history store")?;
    let mut matches: Vec<_> = records
        .into_iter()
        .filter(|r| r.id.starts_with(id))
        .collect();

    match matches.len() {
        0 => bail!("no assessment matching id {id}"),
        1 => Ok(matches.remove(0)),
        n => bail!("id {id} is ambiguous ({n} matches); use more characters"),
    }
}

fn short_id(id: &str) -> &str {
    &id[..8.min(id.len())]
}

//! mull CLI - perspective collection with shift-gated reports
//!
//! Usage:
//!   mull init                 Create .mull/config.toml and the workspace
//!   mull save <file>          Save perspective draft(s) from a JSON file
//!   mull list                 List saved perspectives
//!   mull show <id>            Show one perspective
//!   mull check                Evaluate the report guards
//!   mull report               Run one report cycle now
//!   mull status               Show baseline and engagement
//!   mull run                  Run the continuous loop

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mull_core::{MullConfig, NewPerspective};
use mull_drift::{GuardPhase, KeyIdeaExtractor, ReportGuard, ThemeExtractor, VocabularyExtractor};
use mull_loop::{load_state, run_loop, ReportCycle, StopReason};
use mull_report::{format_citation, ExplorationLog, MarkdownReportGenerator};
use mull_store::{JsonPerspectiveStore, PerspectiveStore};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

type Cycle = ReportCycle<JsonPerspectiveStore, MarkdownReportGenerator, Box<dyn ThemeExtractor>>;

#[derive(Parser)]
#[command(name = "mull")]
#[command(author, version, about = "Track perspectives and report when they shift")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project root (defaults to current directory)
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// How themes are read from perspectives
    #[arg(long, global = true, value_enum, default_value = "key-ideas")]
    themes: ThemeSource,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeSource {
    /// Only the tagged key ideas
    KeyIdeas,
    /// Key ideas, or vocabulary found in untagged quotes
    Vocabulary,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config file, workspace and output directories
    Init,

    /// Save perspective draft(s) from a JSON file (object or array)
    Save {
        file: PathBuf,
    },

    /// List saved perspectives
    List,

    /// Show one perspective with its citation
    Show {
        /// Perspective id (e.g. perspective_007)
        id: String,
    },

    /// Evaluate the report guards without generating
    Check,

    /// Run one report cycle now
    Report,

    /// Show baseline, engagement and loop state
    Status,

    /// Run the continuous loop until Ctrl-C
    Run {
        /// Seconds between iterations
        #[arg(long)]
        interval: Option<u64>,

        /// Stop after N iterations (0 = unlimited)
        #[arg(long)]
        max_iterations: Option<usize>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Drafts {
    Many(Vec<NewPerspective>),
    One(NewPerspective),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let root = cli.root.as_path();
    let source = cli.themes;

    match cli.command {
        Commands::Init => cmd_init(root).await,
        Commands::Save { file } => cmd_save(root, source, file).await,
        Commands::List => cmd_list(root).await,
        Commands::Show { id } => cmd_show(root, id).await,
        Commands::Check => cmd_check(root, source).await,
        Commands::Report => cmd_report(root, source).await,
        Commands::Status => cmd_status(root, source).await,
        Commands::Run {
            interval,
            max_iterations,
        } => cmd_run(root, source, interval, max_iterations).await,
    }
}

fn load_config(root: &Path) -> Result<MullConfig> {
    MullConfig::load_or_default(root).context("Failed to load config")
}

async fn open_store(root: &Path, config: &MullConfig) -> Result<JsonPerspectiveStore> {
    JsonPerspectiveStore::open(config.perspectives_dir(root))
        .await
        .context("Failed to open perspective store")
}

async fn open_cycle(root: &Path, config: &MullConfig, source: ThemeSource) -> Result<Cycle> {
    let extractor: Box<dyn ThemeExtractor> = match source {
        ThemeSource::KeyIdeas => Box::new(KeyIdeaExtractor),
        ThemeSource::Vocabulary => Box::new(VocabularyExtractor::default()),
    };

    let cycle = ReportCycle::new(
        open_store(root, config).await?,
        MarkdownReportGenerator::new(config.output_dir(root)),
        ReportGuard::from_config(&config.guard),
        config.evolution_log(root),
    )
    .await
    .context("Failed to load evolution log")?
    .with_extractor(extractor)
    .with_exploration_log(ExplorationLog::new(config.exploration_log(root)));

    Ok(cycle)
}

async fn cmd_init(root: &Path) -> Result<()> {
    info!("Initializing mull in {:?}", root);

    let config_path = MullConfig::config_path(root);
    if config_path.exists() {
        println!("Config already exists at {:?}", config_path);
    } else {
        MullConfig::write_default(root).context("Failed to write config")?;
        println!("Created {:?}", config_path);
    }

    let config = load_config(root)?;
    tokio::fs::create_dir_all(config.perspectives_dir(root)).await?;
    tokio::fs::create_dir_all(config.output_dir(root)).await?;

    println!("Workspace: {:?}", config.workspace_dir(root));
    println!("Reports:   {:?}", config.output_dir(root));
    Ok(())
}

async fn cmd_save(root: &Path, source: ThemeSource, file: PathBuf) -> Result<()> {
    let config = load_config(root)?;
    let content = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("Failed to read {:?}", file))?;
    let parsed: Drafts =
        serde_json::from_str(&content).context("Failed to parse perspective JSON")?;
    let drafts = match parsed {
        Drafts::Many(drafts) => drafts,
        Drafts::One(draft) => vec![draft],
    };

    let mut cycle = open_cycle(root, &config, source).await?;
    let mut saved = 0;
    for draft in drafts {
        let label = format!("post {} by {}", draft.post_id, draft.author);
        match cycle.save_perspective(draft).await {
            Ok(id) => {
                println!("Saved {} ({})", id, label);
                saved += 1;
            }
            Err(e) if e.is_duplicate() => println!("Skipped duplicate: {}", label),
            Err(e) => return Err(e).with_context(|| format!("Failed to save {}", label)),
        }
    }

    println!("{} saved, {} total", saved, cycle.store().count().await?);
    Ok(())
}

async fn cmd_list(root: &Path) -> Result<()> {
    let store = open_store(root, &load_config(root)?).await?;
    let perspectives = store.list().await?;

    if perspectives.is_empty() {
        println!("No perspectives saved yet in {:?}", store.dir());
        return Ok(());
    }

    for p in &perspectives {
        println!(
            "{:<18} {:<16} {:<18} {}",
            p.id,
            p.author,
            p.submolt,
            p.preview(60)
        );
    }
    println!("\n{} perspectives in {:?}", perspectives.len(), store.dir());
    Ok(())
}

async fn cmd_show(root: &Path, id: String) -> Result<()> {
    let store = open_store(root, &load_config(root)?).await?;
    let perspective = store.get(&id).await?;

    println!("{}", format_citation(&perspective));
    if !perspective.key_ideas.is_empty() {
        println!("Key ideas: {}", perspective.key_ideas.join(", "));
    }
    if let Some(angle) = &perspective.unique_angle {
        println!("Unique angle: {}", angle);
    }
    if let Some(context) = &perspective.thread_context {
        println!("Thread context: {}", context);
    }
    println!("Collected: {}", perspective.collected_at.to_rfc3339());
    Ok(())
}

async fn cmd_check(root: &Path, source: ThemeSource) -> Result<()> {
    let cycle = open_cycle(root, &load_config(root)?, source).await?;
    let decision = cycle.check().await?;

    println!("Report Guards");
    println!("=============");
    for check in decision.checks() {
        let mark = if check.passed { "PASS" } else { "FAIL" };
        println!("[{}] {}: {}", mark, check.name, check.message);
    }
    let guard = cycle.guard();
    println!(
        "\nJaccard distance: {:.3} (threshold {:.2})",
        decision.shift.distance,
        guard.detector().threshold()
    );
    println!(
        "Requires: {} new conversations, {} themes",
        guard.min_conversations(),
        decision.min_size
    );
    println!("Decision: {}", decision.phase());
    Ok(())
}

async fn cmd_report(root: &Path, source: ThemeSource) -> Result<()> {
    let config = load_config(root)?;
    let mut cycle = open_cycle(root, &config, source).await?;
    let mut settings = config.loop_settings.clone();
    settings.max_iterations = 1;
    settings.iteration_sleep_seconds = 0;

    let summary = run_loop(
        &mut cycle,
        &settings,
        &config.state_file(root),
        std::future::pending(),
    )
    .await?;

    match (summary.reports_generated, cycle.evolution().latest()) {
        (0, _) if cycle.phase() == GuardPhase::Ready => {
            println!("Report is due but generation failed; it will be retried");
        }
        (0, _) => println!("Guards not satisfied, no report written (see `mull check`)"),
        (_, Some(entry)) => println!(
            "Published report v{} ({} perspectives, {} themes)",
            entry.version,
            entry.perspective_count,
            entry.themes.len()
        ),
        (_, None) => println!("Report written"),
    }
    Ok(())
}

async fn cmd_status(root: &Path, source: ThemeSource) -> Result<()> {
    let config = load_config(root)?;
    let cycle = open_cycle(root, &config, source).await?;
    let state = load_state(&config.state_file(root)).await?;
    let decision = cycle.check().await?;
    let baseline = cycle.baseline();

    println!("mull Status");
    println!("===========");
    println!("Perspectives: {}", decision.current_count);
    println!(
        "Since last report: {} (need {})",
        decision.engagement, decision.min_conversations
    );
    println!("Current themes: {}", decision.theme_count);

    if baseline.is_initial() {
        println!("\nNo report published yet");
    } else {
        println!("\nBaseline: v{}", baseline.version);
        println!("  Perspectives: {}", baseline.perspective_count);
        println!("  Themes: {}", baseline.themes.to_vec().join(", "));
    }

    println!("\nLoop iteration: {}", state.iteration);
    if let Some(iteration) = state.last_report_iteration {
        println!("Last report at iteration: {}", iteration);
    }
    println!("Guard: {}", decision.phase());
    Ok(())
}

async fn cmd_run(
    root: &Path,
    source: ThemeSource,
    interval: Option<u64>,
    max_iterations: Option<usize>,
) -> Result<()> {
    let config = load_config(root)?;
    let mut settings = config.loop_settings.clone();
    if let Some(interval) = interval {
        settings.iteration_sleep_seconds = interval;
    }
    if let Some(max) = max_iterations {
        settings.max_iterations = max;
    }

    let mut cycle = open_cycle(root, &config, source).await?;
    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    let summary = run_loop(&mut cycle, &settings, &config.state_file(root), shutdown).await?;

    let reason = match summary.stop_reason {
        StopReason::MaxIterations => "max iterations reached",
        StopReason::Shutdown => "interrupted",
    };
    println!(
        "Stopped ({}): {} iterations, {} reports, {} failed iterations",
        reason, summary.iterations, summary.reports_generated, summary.failed_iterations
    );
    Ok(())
}

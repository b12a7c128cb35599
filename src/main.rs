//! PharmAssist - multi-agent pharmaceutical research assistant
//!
//! A CLI driver for the PharmAssist core: runs an analysis for a molecule
//! (locally simulated or on the backend), renders the agent pipeline's
//! progress, writes a Markdown/JSON report and answers follow-up questions.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (invalid arguments, config, report write failure, etc.)

mod cli;
mod config;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use pharmassist::models::StepStatus;
use pharmassist::pipeline::STAGE_COUNT;
use pharmassist::{
    report, AnalysisOrchestrator, AnalysisRequest, AnalysisResult, AnalysisService, ChatHandler,
    ChatService, HttpBackend, Session,
};
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config is loaded before logging so the file can enable verbose output
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(args.log_level(config.general.verbose))?;

    info!("PharmAssist v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Config: {:?}", config);

    if let Err(e) = run(args, config).await {
        error!("Run failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .pharmassist.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to enable the backend or tune simulation timing.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(level: tracing::Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Run one analysis, report it and answer the requested questions.
async fn run(args: Args, config: Config) -> Result<()> {
    let start_time = Instant::now();

    let backend = if config.api.enabled {
        let client = HttpBackend::new(
            &config.api.base_url,
            Duration::from_secs(config.api.request_timeout_seconds),
        )
        .context("Failed to create backend client")?;
        Some(Arc::new(client))
    } else {
        None
    };

    let timing = config.timing();
    let session = Session::new();
    let orchestrator = AnalysisOrchestrator::new(
        session.clone(),
        backend
            .clone()
            .map(|b| b as Arc<dyn AnalysisService>),
        timing.clone(),
    );

    if args.history {
        let limit = args.limit.unwrap_or(config.general.history_limit);
        return print_history(&orchestrator, limit).await;
    }

    let chat = ChatHandler::new(
        session.clone(),
        backend.map(|b| b as Arc<dyn ChatService>),
        timing.chat_delay,
    );

    let request = AnalysisRequest::new(
        args.molecule.clone().unwrap_or_default(),
        args.types.iter().copied(),
        args.context.clone(),
    )?;

    if !args.quiet {
        let types: Vec<String> = request
            .analysis_types()
            .iter()
            .map(|t| t.to_string())
            .collect();
        println!("🔬 Analyzing {}", request.molecule_name());
        println!("   Types: {}", types.join(", "));
        if orchestrator.is_remote() {
            println!("   Mode: Remote ({})", config.api.base_url);
        } else {
            println!("   Mode: Local simulation");
        }
        println!();
    }

    orchestrator.start(request);
    let result = track_progress(&session, args.quiet)
        .await?
        .context("Analysis ended without a result")?;

    if !args.quiet {
        print_summary(&result, start_time.elapsed());
    }

    // Generate and save the report
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&result)?,
        OutputFormat::Markdown => report::generate_markdown_report(&result),
    };

    if config.general.output.is_empty() {
        println!("\n{}", output);
    } else {
        std::fs::write(&config.general.output, &output)
            .with_context(|| format!("Failed to write report to {}", config.general.output))?;
        println!("\n✅ Report saved to: {}", config.general.output);
    }

    // Chat about the result
    if let Some(welcome) = chat.messages().first() {
        println!("\n🤖 {}", welcome.content);
    }

    for question in &args.ask {
        ask(&chat, question).await;
    }

    if args.interactive {
        interactive(&chat).await?;
    }

    Ok(())
}

/// Render the session's step progress until the run finishes.
async fn track_progress(session: &Session, quiet: bool) -> Result<Option<AnalysisResult>> {
    let mut rx = session.subscribe();

    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(100)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );

    let mut reported = [false; STAGE_COUNT];

    loop {
        {
            let state = rx.borrow_and_update();
            pb.set_position(state.progress.round() as u64);

            if let Some(step) = state
                .steps
                .iter()
                .find(|s| s.status == StepStatus::InProgress)
            {
                pb.set_message(step.name.clone());
            }

            for (i, step) in state.steps.iter().enumerate() {
                if i < reported.len() && step.status.is_terminal() && !reported[i] {
                    reported[i] = true;
                    pb.println(format!("   {} {}", step.status.symbol(), step.name));
                }
            }

            if !state.is_analyzing {
                pb.finish_and_clear();
                return Ok(state.current_result.clone());
            }
        }

        if rx.changed().await.is_err() {
            pb.abandon();
            warn!("Session closed before the analysis finished");
            return Ok(None);
        }
    }
}

fn print_summary(result: &AnalysisResult, elapsed: Duration) {
    let molecule = &result.molecule_data;

    println!("\n📊 Analysis Summary:");
    println!(
        "   Molecule: {} ({}, {})",
        molecule.name, molecule.formula, molecule.category
    );
    println!(
        "   Market: {} | growth {:.1}%",
        pharmassist::chat::format_billions(result.market_data.market_size),
        result.market_data.growth_rate
    );
    println!("   Clinical trials: {}", result.clinical_trials.len());
    println!(
        "   Patent: {} (expires {})",
        result.patent_info.patent_number, result.patent_info.expiry_date
    );
    println!(
        "   FDA: {} | EMA: {}",
        result.regulatory_status.fda, result.regulatory_status.ema
    );
    println!("   Insights: {}", result.insights.len());
    println!("   Duration: {:.1}s", elapsed.as_secs_f64());
}

/// Send one question and print the reply.
async fn ask(chat: &ChatHandler, question: &str) {
    println!("\n🧑 {}", question);

    match chat.send(question).await {
        Some(reply) => {
            println!("🤖 {}", reply.content);
            for source in reply.sources.iter().flatten() {
                println!("   📎 {}", source.title);
            }
        }
        None => println!("   (reply discarded, the session was reset)"),
    }
}

/// Read questions from stdin until EOF or `exit`.
async fn interactive(chat: &ChatHandler) -> Result<()> {
    println!("\n💬 Ask about the analysis (type 'exit' to quit)");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines
            .next_line()
            .await
            .context("Failed to read from stdin")?
        else {
            break;
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }

        ask(chat, question).await;

        let suggestions = chat.suggested_questions();
        if !suggestions.is_empty() {
            println!("   Suggested:");
            for suggestion in suggestions {
                println!("   • {}", suggestion);
            }
        }
    }

    Ok(())
}

/// Handle --history: list past analyses from the backend.
async fn print_history(orchestrator: &AnalysisOrchestrator, limit: usize) -> Result<()> {
    if !orchestrator.is_remote() {
        println!("History is only available with the backend enabled (--remote).");
        return Ok(());
    }

    let analyses = orchestrator
        .history(limit, 0)
        .await
        .context("Failed to fetch analysis history")?;

    if analyses.is_empty() {
        println!("No past analyses found.");
        return Ok(());
    }

    println!("📚 Past analyses:\n");
    for analysis in &analyses {
        println!(
            "   {} {:<24} {:<10} {:>5.1}%  {}",
            analysis.id,
            analysis.molecule_name,
            analysis.status,
            analysis.progress,
            analysis.created_at.as_deref().unwrap_or("")
        );
    }
    println!("\n   Total: {}", analyses.len());

    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is initialized, so problems go straight to stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Ignoring {}: {:#}", CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use encoding_protocol::{report_schema_json, RenderState};
use encoding_session::settings::ENV_SAFE_ENCODINGS;
use encoding_session::{
    classify, LogSink, ResourceId, SafeEncodingSet, SafeEncodingSource, SessionManager, Settings,
    SettingsFileSafeEncodings, Verdict,
};
use flags::BackendFlag;
use log::info;
use report::{render_line, ScanSummary};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

mod flags;
mod report;
mod scan;
mod watch;

pub(crate) fn print_stdout(text: &str) -> Result<()> {
    write_line(&mut io::stdout().lock(), text)
}

/// Writes one line; a closed reader (`| head`) is not an error.
fn write_line(out: &mut impl io::Write, text: &str) -> Result<()> {
    if let Err(err) = out
        .write_all(text.as_bytes())
        .and_then(|_| out.write_all(b"\n"))
        .and_then(|_| out.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "encoding-detector")]
#[command(about = "Detect file encodings and flag ones unsafe to re-save as UTF-8", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for results)
    #[arg(long, global = true)]
    quiet: bool,

    /// Settings file (defaults to <config dir>/encoding-detector/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Comma-separated safe encodings, e.g. "ascii,utf-8"
    #[arg(long, global = true)]
    safe_encodings: Option<String>,

    /// Detection deadline in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Leading bytes read from each file
    #[arg(long, global = true)]
    sample_bytes: Option<usize>,

    /// Detection backend
    #[arg(long, global = true, value_enum)]
    backend: Option<BackendFlag>,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the encoding of one or more files
    Detect(DetectArgs),

    /// Detect every file under a directory and list the problematic ones
    Scan(ScanArgs),

    /// Detect files and re-detect whenever they change
    Watch(WatchArgs),

    /// Check whether an encoding label is in the safe set
    Classify(ClassifyArgs),

    /// Print the JSON schema of report lines
    Schema,
}

#[derive(Args)]
struct DetectArgs {
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Emit JSON lines
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ScanArgs {
    /// Directory to scan (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// List every file, not only problematic or unknown ones
    #[arg(long)]
    all: bool,

    /// Include hidden files
    #[arg(long)]
    hidden: bool,

    /// Emit JSON lines
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct WatchArgs {
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Emit JSON lines
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ClassifyArgs {
    label: String,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let settings = resolve_settings(&cli)?;

    match cli.command {
        Commands::Detect(ref args) => run_detect(&cli, &settings, args).await?,
        Commands::Scan(ref args) => run_scan(&cli, &settings, args).await?,
        Commands::Watch(ref args) => {
            let manager = start_manager(&cli, &settings)?;
            watch::run_watch(&manager, &args.paths, args.json).await?;
            manager.shutdown().await;
        }
        Commands::Classify(ref args) => {
            let verdict = classify(&args.label, &settings.safe_encodings);
            print_stdout(match verdict {
                Verdict::Safe => "safe",
                Verdict::Problematic => "problematic",
            })?;
        }
        Commands::Schema => print_stdout(&report_schema_json()?)?,
    }
    Ok(())
}

/// Settings file or defaults, then environment, then flags.
fn resolve_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    if let Some(raw) = &cli.safe_encodings {
        settings.safe_encodings = SafeEncodingSet::parse_csv(raw);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        settings.timeout_ms = timeout_ms;
    }
    if let Some(sample_bytes) = cli.sample_bytes {
        settings.sample_bytes = sample_bytes;
    }
    if let Some(backend) = cli.backend {
        settings.backend = backend.as_settings();
    }
    settings.validate().context("Invalid settings")?;
    Ok(settings)
}

/// Where the allow-list comes from. A settings file is re-read on every
/// classification unless the list was pinned by flag or environment.
fn safe_source(cli: &Cli, settings: &Settings) -> Arc<dyn SafeEncodingSource> {
    let pinned = cli.safe_encodings.is_some()
        || std::env::var(ENV_SAFE_ENCODINGS).is_ok_and(|v| !v.trim().is_empty());
    let file = cli
        .config
        .clone()
        .or_else(|| Settings::default_path().filter(|p| p.is_file()));
    match file {
        Some(path) if !pinned => Arc::new(SettingsFileSafeEncodings::new(
            path,
            settings.safe_encodings.clone(),
        )),
        _ => Arc::new(settings.safe_encodings.clone()),
    }
}

fn start_manager(cli: &Cli, settings: &Settings) -> Result<SessionManager> {
    let backend = settings
        .build_backend()
        .context("Failed to initialise detection backend")?;
    info!("Using {} backend", backend.name());
    let mut builder = SessionManager::builder(backend)
        .config(settings.session_config())
        .safe_encodings(safe_source(cli, settings));
    if cli.verbose {
        builder = builder.sink(Arc::new(LogSink));
    }
    Ok(builder.start()?)
}

async fn run_detect(cli: &Cli, settings: &Settings, args: &DetectArgs) -> Result<()> {
    let manager = start_manager(cli, settings)?;
    let resources: Vec<ResourceId> = args.paths.iter().map(|p| scan::resource_for(p)).collect();
    scan::detect_all(&manager, &resources, |resource, outcome| {
        let report = manager.report_for(resource, outcome);
        print_stdout(&render_line(&report, args.json)?)
    })
    .await?;
    manager.shutdown().await;
    Ok(())
}

async fn run_scan(cli: &Cli, settings: &Settings, args: &ScanArgs) -> Result<()> {
    if !args.path.is_dir() {
        anyhow::bail!("{} is not a directory", args.path.display());
    }
    let manager = start_manager(cli, settings)?;
    let files = scan::collect_files(&args.path, args.hidden);
    // Paths stay relative to the scanned directory in the output.
    let resources: Vec<ResourceId> = files.into_iter().map(ResourceId::new).collect();

    let mut summary = ScanSummary::default();
    scan::detect_all(&manager, &resources, |resource, outcome| {
        let report = manager.report_for(resource, outcome);
        summary.record(&report.render);
        if args.all || !matches!(report.render, RenderState::ResolvedSafe { .. }) {
            print_stdout(&render_line(&report, args.json)?)?;
        }
        Ok(())
    })
    .await?;
    manager.shutdown().await;

    info!(
        "Scanned {} files: {} safe, {} problematic, {} unknown, {} failed",
        summary.total(),
        summary.safe,
        summary.problematic,
        summary.unknown,
        summary.failed
    );
    Ok(())
}

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use footprint_seed::aggregate::summarize;
use footprint_seed::app::{App, PollOptions};
use footprint_seed::cache::{CacheStore, MemoryCache, RedisCache};
use footprint_seed::config::{ConfigLoader, ResolvedConfig};
use footprint_seed::domain::{Country, YearlyRecord};
use footprint_seed::error::EmissionsError;
use footprint_seed::footprint::{FootprintClient, FootprintHttpClient};
use footprint_seed::output::{JsonOutput, LogProgress};

#[derive(Parser)]
#[command(name = "footprint-seed")]
#[command(about = "Incrementally ingest per-country carbon footprint data into a yearly leaderboard")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[arg(long, global = true, help = "Use an in-process cache instead of Redis")]
    memory: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run one ingestion round and print the leaderboard")]
    Snapshot,
    #[command(about = "Run rounds until every country has been fetched")]
    Poll(PollArgs),
    #[command(about = "Run one ingestion round and print per-year totals")]
    Summary,
    #[command(about = "Show the persisted pagination offset")]
    Cursor,
    #[command(about = "Rewind pagination")]
    Reset(ResetArgs),
}

#[derive(Args)]
struct PollArgs {
    #[arg(long, default_value_t = 30)]
    max_rounds: usize,

    #[arg(long, default_value_t = 5)]
    interval_secs: u64,
}

#[derive(Args)]
struct ResetArgs {
    #[arg(long, help = "Drop every cached entry, not just the offset")]
    flush: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<EmissionsError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &EmissionsError) -> u8 {
    match error {
        EmissionsError::UpstreamRateLimited => 4,
        EmissionsError::UpstreamHttp(_)
        | EmissionsError::UpstreamStatus { .. }
        | EmissionsError::DirectoryFetchFailed(_) => 3,
        EmissionsError::MissingSetting(_)
        | EmissionsError::ConfigRead(_)
        | EmissionsError::ConfigParse(_)
        | EmissionsError::InvalidSetting(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let resolved = ConfigLoader::resolve(cli.config.as_deref()).map_err(miette::Report::new)?;
    let cache = connect_cache(&resolved, cli.memory)?;

    match cli.command.unwrap_or(Commands::Snapshot) {
        Commands::Snapshot => {
            let app = App::new(cache, http_client(&resolved)?, resolved.pipeline);
            let snapshot = report(app.prepare_emissions_snapshot())?;
            JsonOutput::print_snapshot(&snapshot).into_diagnostic()
        }
        Commands::Poll(args) => {
            let app = App::new(cache, http_client(&resolved)?, resolved.pipeline);
            let options = PollOptions {
                max_rounds: args.max_rounds,
                interval: Duration::from_secs(args.interval_secs),
            };
            let result = report(app.poll_until_complete(&options, &LogProgress))?;
            JsonOutput::print_poll(&result).into_diagnostic()
        }
        Commands::Summary => {
            let app = App::new(cache, http_client(&resolved)?, resolved.pipeline);
            let snapshot = report(app.prepare_emissions_snapshot())?;
            JsonOutput::print_summary(&summarize(&snapshot.emissions_per_country)).into_diagnostic()
        }
        Commands::Cursor => {
            let app = App::new(cache, NopFootprint, resolved.pipeline);
            let offset = app.cursor().map_err(miette::Report::new)?;
            JsonOutput::print_json(&serde_json::json!({ "offset": offset })).into_diagnostic()
        }
        Commands::Reset(args) => {
            let app = App::new(cache, NopFootprint, resolved.pipeline);
            app.reset(args.flush).map_err(miette::Report::new)?;
            JsonOutput::print_json(&serde_json::json!({ "reset": true, "flushed": args.flush }))
                .into_diagnostic()
        }
    }
}

// The store must be reachable before any work is accepted.
fn connect_cache(resolved: &ResolvedConfig, memory: bool) -> miette::Result<Arc<dyn CacheStore>> {
    if memory {
        return Ok(Arc::new(MemoryCache::new()));
    }
    let redis = RedisCache::connect(&resolved.redis_url).map_err(miette::Report::new)?;
    Ok(Arc::new(redis))
}

fn http_client(resolved: &ResolvedConfig) -> miette::Result<FootprintHttpClient> {
    FootprintHttpClient::new(&resolved.upstream).map_err(miette::Report::new)
}

fn report<T>(result: Result<T, EmissionsError>) -> miette::Result<T> {
    result.map_err(|err| {
        JsonOutput::report_error(&mut std::io::stdout(), &err);
        miette::Report::new(err)
    })
}

struct NopFootprint;

impl FootprintClient for NopFootprint {
    fn list_countries(&self) -> Result<Vec<Country>, EmissionsError> {
        Err(EmissionsError::UpstreamHttp(
            "footprint client not configured".to_string(),
        ))
    }

    fn country_data(&self, _country_code: &str) -> Result<Vec<YearlyRecord>, EmissionsError> {
        Err(EmissionsError::UpstreamHttp(
            "footprint client not configured".to_string(),
        ))
    }
}

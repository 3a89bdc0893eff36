//! Thin CLI entry point: parses flags, loads the settings/filters files,
//! wires the pipeline, runs every query, and streams the result to a
//! spreadsheet. Subcommand dispatch, interactive credential prompts, and
//! config-file editing are deliberately not part of this binary.

use chrono::Local;
use clap::Parser;
use clinvar_dl::config::validator::validate_entrez_setting;
use clinvar_dl::config::{RuntimeConfig, Settings};
use clinvar_dl::filters::FiltersFile;
use clinvar_dl::http::client::ClientConfig;
use clinvar_dl::http::{Client, RetryConfig};
use clinvar_dl::input::FileParser;
use clinvar_dl::output::SpreadsheetWriter;
use clinvar_dl::pipeline::{EntrezParams, Pipeline};
use clinvar_dl::rate_limiter::RateLimiter;
use clinvar_dl::{cache::FileCache, executor::QueryExecutor, PipelineError};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Batch-fetches ClinVar-style records for a list of search terms and writes one spreadsheet.",
    long_about = "Reads newline-delimited search terms from a text file, runs them through a \
                  rate-limited search/summary pipeline with a resumable on-disk cache, and \
                  writes every matching record into one spreadsheet.\n\n\
                  Example:\n  clinvar-dl --input terms.txt --settings settings.yaml --filters filters.yaml"
)]
struct Cli {
    /// Newline-delimited search terms (blank lines and `#`-comments ignored).
    #[arg(long, short = 'i', value_name = "FILE")]
    input: PathBuf,

    /// Settings YAML (identity/credential, rate class, timeouts, cache policy).
    #[arg(long, short = 's', value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Filters YAML (activated options combined into a server-side term).
    #[arg(long, short = 'f', value_name = "FILE")]
    filters: Option<PathBuf>,

    /// Directory the result spreadsheet is written into.
    #[arg(long, short = 'o', value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Directory daily log files are written into.
    #[arg(long, value_name = "DIR", default_value = "logs")]
    log_dir: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    let _log_guard = init_logging(&cli.log_dir);

    if let Err(err) = run(cli) {
        tracing::error!(error = %err, kind = err.kind(), "run failed");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(log_dir: &std::path::Path) -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(log_dir, "clinvar-dl.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false);
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry().with(filter).with(file_layer).with(stderr_layer).init();

    guard
}

#[tokio::main]
async fn run(cli: Cli) -> Result<(), PipelineError> {
    let settings = load_yaml::<Settings>(cli.settings.as_deref())?.unwrap_or_default();
    let filters = load_yaml::<FiltersFile>(cli.filters.as_deref())?.unwrap_or_default();

    let has_api_key = settings.entrez_setting.has_api_key();
    let runtime = RuntimeConfig::new(has_api_key);
    runtime.validate(has_api_key)?;
    validate_entrez_setting(settings.entrez_setting.ret_max, &settings.entrez_setting.ret_mode)?;

    let entrez_params = EntrezParams {
        base_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string(),
        db: settings.entrez_setting.db.clone(),
        use_history: settings.entrez_setting.use_history,
        email: settings.entrez_setting.email.clone(),
        tool_name: settings.entrez_setting.tool_name.clone(),
        api_key: settings.entrez_setting.api_key.clone(),
        ret_max: settings.entrez_setting.ret_max,
        ret_mode: settings.entrez_setting.ret_mode.clone(),
    };

    let client = Client::new(ClientConfig::default())?;
    let rate_limiter = RateLimiter::new(has_api_key);
    let pipeline = Pipeline::new(client, rate_limiter, RetryConfig::default());

    let cache = if settings.cache_setting.enabled {
        Some(FileCache::new(settings.cache_setting.dir.clone(), Duration::from_secs(settings.cache_setting.ttl))?)
    } else {
        None
    };

    let filters_expr = filters.build_query_string();
    if filters.has_any_active() {
        tracing::info!(filters = %filters.describe_active(), "applying active filters");
    }

    let parser = FileParser::new(settings.entrez_setting.batch_size as usize, settings.entrez_setting.search_type.clone());
    let queries = parser.parse_file(&cli.input).await?;
    tracing::info!(query_count = queries.len(), "parsed input file");

    let executor = QueryExecutor::new(pipeline, cache, entrez_params, runtime, filters_expr);
    let query_timeout = Duration::from_secs(settings.timeout_setting.query_timeout);
    let results = tokio::time::timeout(query_timeout, executor.execute_queries(queries))
        .await
        .map_err(|_| PipelineError::timeout("overall query run"))??;

    write_results(&results, cli.output_dir.unwrap_or_else(|| PathBuf::from(&settings.output_setting.storage)))?;

    Ok(())
}

fn load_yaml<T: serde::de::DeserializeOwned>(path: Option<&std::path::Path>) -> Result<Option<T>, PipelineError> {
    let Some(path) = path else { return Ok(None) };
    let content = std::fs::read_to_string(path)?;
    Ok(Some(serde_yaml::from_str(&content)?))
}

fn write_results(results: &[clinvar_dl::types::QueryResult], output_dir: PathBuf) -> Result<(), PipelineError> {
    std::fs::create_dir_all(&output_dir)?;
    let mut writer = SpreadsheetWriter::new()?;
    for result in results {
        writer.write_result(result)?;
    }

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let path = output_dir.join(format!("clinvar_results_{timestamp}.xlsx"));
    writer.save(&path)?;
    tracing::info!(path = %path.display(), "wrote result spreadsheet");
    Ok(())
}

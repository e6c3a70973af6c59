use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use quotadeck_client::{
    refresh_quotas, ClientConfig, HttpManagementApi, ManagementApi, QuotaFetcher,
    DEFAULT_BASE_URL, DEFAULT_CONCURRENCY,
};
use quotadeck_core::{
    CacheStatus, CredentialFileDescriptor, NormalizedQuotaItem, QuotaCache, QuotaReport,
    ReportEntry, DEFAULT_ANTIGRAVITY_PROJECT,
};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "quotadeck")]
#[command(about = "Quota console for credentials stored in a CLI proxy service")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Args, Clone)]
struct ConnectionArgs {
    #[arg(long, global = true, env = "QUOTADECK_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, global = true, env = "QUOTADECK_MANAGEMENT_KEY", hide_env_values = true)]
    management_key: Option<String>,

    #[arg(long, global = true, default_value_t = 30)]
    timeout_secs: u64,

    #[arg(long, global = true, default_value = DEFAULT_ANTIGRAVITY_PROJECT)]
    antigravity_project: String,
}

impl ConnectionArgs {
    fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url.clone())
            .with_management_key(self.management_key.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_antigravity_default_project(self.antigravity_project.clone())
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch quota for auth files.
    Quota(QuotaArgs),
    /// List auth files known to the proxy.
    Files(FilesArgs),
}

#[derive(Debug, Parser, Clone)]
struct QuotaArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Auth file name; repeat for several. Defaults to every supported file.
    #[arg(long = "name")]
    names: Vec<String>,

    /// Read descriptors from a JSON file instead of the listing API.
    #[arg(long)]
    input: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Debug, Parser, Clone)]
struct FilesArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[arg(long, default_value_t = false)]
    pretty: bool,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

impl Default for QuotaArgs {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            names: Vec::new(),
            input: None,
            concurrency: DEFAULT_CONCURRENCY,
            pretty: false,
        }
    }
}

fn main() {
    init_tracing();
    if let Err(error) = run() {
        eprintln!("quotadeck: {error:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Quota(QuotaArgs::default()));
    let config = cli.connection.client_config();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        let api = Arc::new(
            HttpManagementApi::new(config.clone()).context("failed to build HTTP client")?,
        );

        match command {
            Commands::Quota(args) => run_quota(api, &config, &args).await,
            Commands::Files(args) => run_files(api.as_ref(), &args).await,
        }
    })
}

async fn run_quota(api: Arc<HttpManagementApi>, config: &ClientConfig, args: &QuotaArgs) -> Result<()> {
    let files = selected_files(api.as_ref(), args).await?;
    let fetcher = QuotaFetcher::new(api, config);
    let mut cache = QuotaCache::new();

    let summary = refresh_quotas(&fetcher, &mut cache, &files, args.concurrency).await;
    if cache.is_empty() {
        bail!("no auth files with a supported quota provider were selected");
    }

    let report = QuotaReport::from_cache(&cache);
    match args.format {
        OutputFormat::Json => print_json(&report, args.pretty)?,
        OutputFormat::Text => print_text(&report),
    }

    if summary.failed > 0 {
        eprintln!(
            "quotadeck: {} of {} quota lookups failed",
            summary.failed,
            summary.failed + summary.refreshed
        );
    }

    Ok(())
}

async fn selected_files(
    api: &dyn ManagementApi,
    args: &QuotaArgs,
) -> Result<Vec<CredentialFileDescriptor>> {
    if let Some(path) = args.input.as_ref() {
        return read_descriptors(path);
    }

    let listing = api
        .list_auth_files()
        .await
        .context("failed to list auth files")?;

    if args.names.is_empty() {
        return Ok(listing
            .into_iter()
            .filter(|file| file.provider_type().is_some())
            .collect());
    }

    let mut selected = Vec::with_capacity(args.names.len());
    for name in &args.names {
        match listing.iter().find(|file| &file.name == name) {
            Some(file) => selected.push(file.clone()),
            None => bail!("auth file '{name}' not found"),
        }
    }

    Ok(selected)
}

async fn run_files(api: &dyn ManagementApi, args: &FilesArgs) -> Result<()> {
    let files = api
        .list_auth_files()
        .await
        .context("failed to list auth files")?;

    match args.format {
        OutputFormat::Json => print_json(&files, args.pretty)?,
        OutputFormat::Text => {
            for file in &files {
                println!(
                    "{}\t{}\tauth_index={}\tquota={}",
                    file.name,
                    if file.file_type.is_empty() { "-" } else { file.file_type.as_str() },
                    file.auth_index().unwrap_or("-"),
                    if file.provider_type().is_some() { "yes" } else { "no" }
                );
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(payload: &T, pretty: bool) -> Result<()> {
    if pretty {
        println!("{}", serde_json::to_string_pretty(payload)?);
    } else {
        println!("{}", serde_json::to_string(payload)?);
    }
    Ok(())
}

fn print_text(report: &QuotaReport) {
    for entry in &report.entries {
        for line in entry_lines(entry) {
            println!("{line}");
        }
        println!();
    }
}

fn entry_lines(entry: &ReportEntry) -> Vec<String> {
    let provider = entry
        .provider
        .map(|provider| provider.as_str())
        .unwrap_or("unknown");
    let mut lines = vec![format!("== {} ({provider}) ==", entry.name)];

    if let Some(quota) = entry.quota.as_ref() {
        if let Some(plan) = quota.plan_type() {
            lines.push(format!("Plan: {plan}"));
        }

        let mut shown = 0;
        for item in quota.table_items() {
            lines.push(item_line(item));
            shown += 1;
        }
        if shown == 0 {
            lines.push("No quota data".to_string());
        }
    }

    if entry.status == CacheStatus::Error {
        lines.push(format!(
            "Error: {}",
            entry.error.as_deref().unwrap_or("unknown error")
        ));
    }

    lines.push(format!("Updated: {}", entry.updated_at));
    lines
}

fn item_line(item: &NormalizedQuotaItem) -> String {
    let mut line = format!("{}: {}", item.label, format_percent(item.percent));
    if let Some(reset_time) = item.reset_time.as_ref() {
        line.push_str(&format!(" (resets {reset_time})"));
    }
    line
}

fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{value:.0}% left"),
        None => "n/a".to_string(),
    }
}

fn read_descriptors(path: &Path) -> Result<Vec<CredentialFileDescriptor>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read JSON input from {}", path.display()))?;
    parse_json_values(&raw)?
        .into_iter()
        .map(|value| {
            serde_json::from_value::<CredentialFileDescriptor>(value)
                .context("failed to decode auth file descriptor")
        })
        .collect()
}

/// Accepts one JSON document (an array or a single object), or one object
/// per line. A `{"files": [...]}` listing envelope is unwrapped.
fn parse_json_values(raw: &str) -> Result<Vec<Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("empty JSON payload");
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(match value {
            Value::Array(items) => items,
            Value::Object(mut object) => match object.remove("files") {
                Some(Value::Array(items)) => items,
                Some(other) => {
                    object.insert("files".to_string(), other);
                    vec![Value::Object(object)]
                }
                None => vec![Value::Object(object)],
            },
            _ => {
                bail!("JSON payload must be an object or an array");
            }
        });
    }

    let line_values = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .collect::<Vec<_>>();

    if line_values.is_empty() {
        bail!("unable to parse payload as JSON");
    }

    Ok(line_values)
}

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;
use taxii_testlab_client::UreqTransport;
use taxii_testlab_core::testlab::{Testlab, BUNDLE_ID};
use taxii_testlab_core::{
    evaluate_in, Bundle, CompareDepth, FilterExpression, MatchStrategy, StixObject, Timestamp,
    MATCH_ID_PARAM, MATCH_TYPE_PARAM, MATCH_VERSION_PARAM,
};
use taxii_testlab_suite::{SettingsOverrides, Suite, SuiteReport, SuiteSettings};
use tracing_subscriber::EnvFilter;

const CLI_CONTRACT_VERSION: &str = "testlab.cli.v1";

#[derive(Debug, Parser)]
#[command(name = "testlab")]
#[command(about = "TAXII 2.1 TestLab conformance client")]
struct Cli {
    /// Log per-request detail lines.
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,

    /// Also log payload dumps and per-field differences.
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Run(Box<RunArgs>),
    Expect(ExpectArgs),
    Testdata(TestdataArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// YAML settings file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    proxy: Option<String>,
    #[arg(long)]
    discovery: Option<String>,
    #[arg(long)]
    api_root: Option<String>,
    #[arg(long)]
    read_only: Option<String>,
    #[arg(long)]
    write_only: Option<String>,
    #[arg(long)]
    read_write: Option<String>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    password: Option<String>,
    #[arg(long)]
    connect_timeout_secs: Option<u64>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    #[arg(long, value_enum)]
    match_strategy: Option<MatchStrategyArg>,
    #[arg(long, value_enum)]
    compare_depth: Option<CompareDepthArg>,
}

#[derive(Debug, Args)]
struct ExpectArgs {
    /// Comma separated `match[version]` value.
    #[arg(long = "version")]
    versions: Option<String>,
    /// Comma separated `match[id]` value.
    #[arg(long = "id")]
    ids: Option<String>,
    /// Comma separated `match[type]` value.
    #[arg(long = "type")]
    types: Option<String>,
    /// Evaluate as the object-by-id endpoint of this identifier.
    #[arg(long)]
    object: Option<String>,
}

#[derive(Debug, Args)]
struct TestdataArgs {
    /// Also emit the attack pattern, threat actor and campaign fixtures. `run`
    /// expects the indicator-only data, so a server seeded with this set fails
    /// the objects tests.
    #[arg(long, default_value_t = false)]
    all_types: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MatchStrategyArg {
    Positional,
    Keyed,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompareDepthArg {
    Shallow,
    Full,
}

#[derive(Debug, Serialize)]
struct ExpectedRow<'a> {
    position: usize,
    id: &'a str,
    #[serde(rename = "type")]
    object_type: &'a str,
    modified: Option<Timestamp>,
}

fn with_contract_version(value: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            object.insert(
                "contract_version".to_string(),
                Value::String(CLI_CONTRACT_VERSION.to_string()),
            );
            Value::Object(object)
        }
        other => serde_json::json!({
            "contract_version": CLI_CONTRACT_VERSION,
            "payload": other
        }),
    }
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&with_contract_version(value))?);
    Ok(())
}

fn init_tracing(verbose: bool, debug: bool) {
    let level = if debug {
        "trace"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.debug);
    match cli.command {
        Command::Run(args) => run_suite(*args),
        Command::Expect(args) => run_expect(&args).map(|()| ExitCode::SUCCESS),
        Command::Testdata(args) => run_testdata(&args).map(|()| ExitCode::SUCCESS),
    }
}

fn run_suite(args: RunArgs) -> Result<ExitCode> {
    let settings = match &args.config {
        Some(path) => SuiteSettings::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => SuiteSettings::default(),
    };
    let settings = settings.apply(args.into_overrides());
    settings.validate().context("invalid settings")?;

    let transport = UreqTransport::new(&settings.client_config())
        .context("failed to build HTTP transport")?;
    let report = Suite::new(settings, transport)
        .context("failed to prepare TestLab run")?
        .run()
        .context("TestLab run aborted")?;

    emit_json(summary(&report)?)?;
    Ok(if report.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn summary(report: &SuiteReport) -> Result<Value> {
    Ok(serde_json::json!({
        "success": report.is_success(),
        "total_problems": report.total_problems(),
        "tests_run": report.tests.len(),
        "tests_failed": report.failures().count(),
        "population_fingerprint": report.population_fingerprint,
        "tests": serde_json::to_value(&report.tests).context("failed to serialize test outcomes")?,
    }))
}

fn run_expect(args: &ExpectArgs) -> Result<()> {
    let pairs = [
        (MATCH_ID_PARAM, args.ids.as_deref()),
        (MATCH_TYPE_PARAM, args.types.as_deref()),
        (MATCH_VERSION_PARAM, args.versions.as_deref()),
    ];
    let mut filter = FilterExpression::parse_query(
        pairs.iter().filter_map(|(key, value)| value.map(|value| (*key, value))),
    )
    .context("invalid filter")?;
    if let Some(object) = &args.object {
        filter.ids = Some(vec![object.clone()]);
    }

    let lab = Testlab::build().context("failed to build TestLab data")?;
    let selections = evaluate_in(&lab.population, &lab.read_only, &filter);
    let rows = selections
        .iter()
        .enumerate()
        .map(|(position, selection)| ExpectedRow {
            position,
            id: selection.id(),
            object_type: selection.identity.object_type(),
            modified: selection.modified(),
        })
        .collect::<Vec<_>>();

    emit_json(serde_json::json!({
        "query": filter.to_query_pairs(),
        "count": rows.len(),
        "objects": serde_json::to_value(&rows).context("failed to serialize expected list")?,
    }))
}

fn run_testdata(args: &TestdataArgs) -> Result<()> {
    let lab = Testlab::build_with(!args.all_types).context("failed to build TestLab data")?;
    let objects = lab.population.all_versions().cloned().collect::<Vec<StixObject>>();
    let collections = lab.collections().into_iter().map(|fixture| &fixture.resource).collect::<Vec<_>>();

    emit_json(serde_json::json!({
        "population_fingerprint": lab.population.fingerprint().context("failed to fingerprint population")?,
        "collections": serde_json::to_value(&collections).context("failed to serialize collections")?,
        "bundle": serde_json::to_value(Bundle::new(BUNDLE_ID, &objects)).context("failed to serialize bundle")?,
    }))
}

impl RunArgs {
    fn into_overrides(self) -> SettingsOverrides {
        SettingsOverrides {
            url: self.url,
            proxy: self.proxy,
            discovery: self.discovery,
            api_root: self.api_root,
            read_only: self.read_only,
            write_only: self.write_only,
            read_write: self.read_write,
            username: self.username,
            password: self.password,
            connect_timeout_secs: self.connect_timeout_secs,
            timeout_secs: self.timeout_secs,
            match_strategy: self.match_strategy.map(MatchStrategyArg::into_strategy),
            compare_depth: self.compare_depth.map(CompareDepthArg::into_depth),
        }
    }
}

impl MatchStrategyArg {
    fn into_strategy(self) -> MatchStrategy {
        match self {
            Self::Positional => MatchStrategy::Positional,
            Self::Keyed => MatchStrategy::Keyed,
        }
    }
}

impl CompareDepthArg {
    fn into_depth(self) -> CompareDepth {
        match self {
            Self::Shallow => CompareDepth::Shallow,
            Self::Full => CompareDepth::Full,
        }
    }
}

//! CLI command definitions and handlers.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use tracing::info;

use crate::client::CloudClient;
use crate::config::Config;
use crate::profiles::{ProfileSettings, ProfileStore};
use crate::runner::{TestRunner, TestStatus};

/// Natural-language web testing against a cloud browser-automation service.
#[derive(Parser)]
#[command(name = "webrunner")]
#[command(about = "Run natural-language web tests on a cloud browser-automation service")]
#[command(version)]
#[command(
    long_about = "webrunner registers test cases from a YAML suite file and executes each one \
as a remote browser-automation task, polling it to completion and aggregating results \
into a JSON report.\n\nExample usage:\n  webrunner run suites/smoke.yaml --tags smoke --parallel"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run tests from a YAML suite file.
    Run(RunArgs),

    /// Manage browser profiles.
    Profiles(ProfilesArgs),
}

/// Arguments for `webrunner run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the YAML suite file.
    pub path: PathBuf,

    /// Only run tests carrying at least one of these tags.
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Only run tests with these names.
    #[arg(long, value_delimiter = ',')]
    pub tests: Vec<String>,

    /// Run tests concurrently (default).
    #[arg(long, conflicts_with = "sequential")]
    pub parallel: bool,

    /// Run tests one at a time in registration order.
    #[arg(long)]
    pub sequential: bool,

    /// API key for the remote service.
    #[arg(long, env = "WEBRUNNER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Cap on concurrently in-flight tests in parallel mode.
    #[arg(long)]
    pub max_parallel: Option<usize>,
}

/// Arguments for `webrunner profiles`.
#[derive(Parser, Debug)]
pub struct ProfilesArgs {
    #[command(subcommand)]
    pub command: ProfilesSubcommand,
}

/// Profile management subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum ProfilesSubcommand {
    /// List stored profiles.
    List,

    /// Create a new profile.
    Create(CreateProfileArgs),
}

/// Arguments for `webrunner profiles create`.
#[derive(Parser, Debug)]
pub struct CreateProfileArgs {
    /// Profile name.
    #[arg(long)]
    pub name: String,

    /// User agent string.
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Viewport width in pixels.
    #[arg(long, default_value = "1920")]
    pub width: u32,

    /// Viewport height in pixels.
    #[arg(long, default_value = "1080")]
    pub height: u32,

    /// BCP 47 locale tag.
    #[arg(long, default_value = "en-US")]
    pub locale: String,

    /// IANA timezone name.
    #[arg(long, default_value = "America/New_York")]
    pub timezone: String,
}

/// One declarative test case in a suite file.
#[derive(Debug, Deserialize)]
struct SuiteCase {
    name: String,
    instruction: String,
    #[serde(default)]
    tags: Vec<String>,
    /// When set, the test additionally asserts that the task output
    /// contains this substring.
    #[serde(default)]
    expect_contains: Option<String>,
}

/// A YAML suite file: a list of declarative test cases.
#[derive(Debug, Deserialize)]
struct SuiteFile {
    #[serde(default)]
    tests: Vec<SuiteCase>,
}

/// Parses command-line arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Dispatches a parsed CLI invocation.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => {
            let all_passed = run_suite(args).await?;
            if !all_passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Profiles(args) => match args.command {
            ProfilesSubcommand::List => list_profiles(),
            ProfilesSubcommand::Create(create) => create_profile(create),
        },
    }
}

/// Loads a suite file, registers its cases and runs them. Returns true
/// when every executed test passed.
async fn run_suite(args: RunArgs) -> anyhow::Result<bool> {
    let mut config = Config::from_env();
    if let Some(key) = args.api_key {
        config.api_key = key;
    }
    if let Some(cap) = args.max_parallel {
        config.max_parallel = Some(cap);
    }
    let config = Arc::new(config);

    let suite = load_suite(&args.path)?;
    anyhow::ensure!(
        !suite.tests.is_empty(),
        "no tests found in {}",
        args.path.display()
    );

    let backend = Arc::new(CloudClient::new(&config));
    let mut runner = TestRunner::new(Arc::clone(&config), backend);
    for case in suite.tests {
        register_suite_case(&mut runner, case);
    }
    info!(count = runner.case_count(), path = %args.path.display(), "registered suite");

    let test_names = non_empty(args.tests);
    let tags = non_empty(args.tags);
    let parallel = !args.sequential;

    let results = runner
        .run_tests(test_names.as_deref(), tags.as_deref(), parallel)
        .await?;

    Ok(results.iter().all(|r| r.status == TestStatus::Passed))
}

/// Compiles one declarative case into a registered test function.
fn register_suite_case(runner: &mut TestRunner, case: SuiteCase) {
    let expect = case.expect_contains;
    runner.register_test(
        case.name,
        case.instruction,
        move |agent| {
            let expect = expect.clone();
            async move {
                let output = agent.run().await?;
                if let Some(needle) = expect {
                    anyhow::ensure!(
                        output.contains(&needle),
                        "output did not contain {needle:?}: {output:?}"
                    );
                }
                Ok(())
            }
        },
        case.tags,
    );
}

fn load_suite(path: &Path) -> anyhow::Result<SuiteFile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read suite file {}", path.display()))?;
    serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse suite file {}", path.display()))
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn list_profiles() -> anyhow::Result<()> {
    let config = Config::from_env();
    let mut store = ProfileStore::new(&config.profiles_dir);
    store.load_from_disk()?;

    let profiles = store.list();
    if profiles.is_empty() {
        println!("No profiles found under {}", config.profiles_dir.display());
        return Ok(());
    }

    for profile in profiles {
        println!(
            "{}  {}x{}  {}  {}",
            profile.name,
            profile.viewport.width,
            profile.viewport.height,
            profile.locale,
            profile.user_agent.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

fn create_profile(args: CreateProfileArgs) -> anyhow::Result<()> {
    let config = Config::from_env();
    let mut store = ProfileStore::new(&config.profiles_dir);
    store.load_from_disk()?;

    let mut profile = ProfileSettings::new(&args.name)
        .with_viewport(args.width, args.height)
        .with_locale(args.locale)
        .with_timezone(args.timezone);
    if let Some(user_agent) = args.user_agent {
        profile = profile.with_user_agent(user_agent);
    }

    store.create(profile)?;
    println!("Profile '{}' created", args.name);
    Ok(())
}

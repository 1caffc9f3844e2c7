//! Buildlight - Travis CI build status for a git working copy
//!
//! ## Commands
//!
//! - `status`: Run one update cycle and print the indicator
//! - `watch`: Re-run update cycles on an interval, printing changes
//! - `identity`: Show which `owner/name` the workspace resolves to
//! - `url`: Print the repository's Travis web page
//! - `open`: Open the repository's Travis web page in a browser

mod render;

use anyhow::{anyhow, bail, Context, Result};
use buildlight_core::{
    connect, CompletionPolicy, IndicatorState, Session, SessionOptions, StatusError, METRICS,
};
use clap::{Parser, Subcommand, ValueEnum};
use render::{render, Rendered};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "buildlight")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Travis CI build status for the current working copy", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Workspace root (the directory holding .travis.yml)
    #[arg(short, long, global = true, default_value = ".")]
    workspace: PathBuf,

    /// Query travis-ci.com instead of travis-ci.org
    #[arg(long, global = true)]
    pro: bool,

    /// API base of a private Travis instance
    #[arg(long, global = true, env = "BUILDLIGHT_API_BASE")]
    api_base: Option<String>,

    /// Web base of a private Travis instance (derived from --api-base if omitted)
    #[arg(long, global = true, env = "BUILDLIGHT_WEB_BASE")]
    web_base: Option<String>,

    /// Upper bound on one update cycle, in seconds
    #[arg(long, global = true, default_value = "30")]
    timeout_secs: u64,

    /// Upper bound on one Travis API request, in seconds
    #[arg(long, global = true, default_value = "15")]
    http_timeout_secs: u64,

    /// How overlapping update cycles are resolved
    #[arg(long, global = true, value_enum, default_value = "latest-request")]
    policy: PolicyArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one update cycle and print the result
    Status {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Poll the build status, printing whenever it changes
    Watch {
        /// Seconds between update cycles
        #[arg(short, long, default_value = "60")]
        interval_secs: u64,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Show the resolved repository identity
    Identity,

    /// Print the repository's Travis web page
    Url,

    /// Open the repository's Travis web page in a browser
    Open,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    LatestRequest,
    LastWriteWins,
}

impl From<PolicyArg> for CompletionPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::LatestRequest => CompletionPolicy::LatestRequest,
            PolicyArg::LastWriteWins => CompletionPolicy::LastWriteWins,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    buildlight_core::init_tracing(cli.json, level);

    let session = start_session(&cli)?;
    let root = cli.workspace.as_path();

    match cli.command {
        Commands::Status { format } => cmd_status(&session, root, format).await,
        Commands::Watch {
            interval_secs,
            format,
        } => cmd_watch(&session, root, interval_secs, format).await,
        Commands::Identity => cmd_identity(&session, root).await,
        Commands::Url => cmd_url(&session, root).await,
        Commands::Open => cmd_open(&session, root).await,
    }
}

fn session_options(cli: &Cli) -> SessionOptions {
    let mut options = SessionOptions::new(&cli.workspace);
    options.pro = cli.pro.then_some(true);
    options.api_base = cli.api_base.clone().filter(|s| !s.is_empty());
    options.web_base = cli.web_base.clone().filter(|s| !s.is_empty());
    options.cycle_timeout = Duration::from_secs(cli.timeout_secs.max(1));
    options.transport = options
        .transport
        .with_timeout(Duration::from_secs(cli.http_timeout_secs.max(1)));
    options.policy = cli.policy.into();
    options
}

/// Connect once, printing startup warnings (e.g. a bad proxy) a single time.
fn start_session(cli: &Cli) -> Result<Session> {
    let startup = connect(session_options(cli)).context("Failed to set up Travis client")?;
    for warning in &startup.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(startup.session)
}

/// Run one cycle; an error report exits non-zero after being printed.
async fn cmd_status(session: &Session, root: &Path, format: Format) -> Result<()> {
    let report = session.update_status(root).await;
    let state = IndicatorState::from_outcome(&report.outcome);

    match render(&state) {
        Some(rendered) => print_rendered(&rendered, format)?,
        None => println!("{} is not a Travis CI project", root.display()),
    }

    match report.outcome {
        Err(e) => Err(anyhow!(e)),
        Ok(_) => Ok(()),
    }
}

/// Poll until interrupted. Only changes are printed.
async fn cmd_watch(session: &Session, root: &Path, interval_secs: u64, format: Format) -> Result<()> {
    if interval_secs == 0 {
        bail!("--interval-secs must be at least 1");
    }
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    let mut last: Option<Rendered> = None;

    info!(workspace = %root.display(), interval_secs, "watching build status");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                session.update_status(root).await;
                let current = render(&session.indicator().state());
                if current != last {
                    if let Some(rendered) = &current {
                        print_rendered(rendered, format)?;
                    }
                    last = current;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                METRICS.flush();
                return Ok(());
            }
        }
    }
}

async fn cmd_identity(session: &Session, root: &Path) -> Result<()> {
    let identity = session.identity(root).await;
    if !identity.is_resolved() {
        return Err(anyhow!(StatusError::IdentityUnresolved));
    }
    println!("Owner: {}", identity.owner);
    println!("Repository: {}", identity.name);
    println!("Slug: {}", identity.slug());
    Ok(())
}

async fn cmd_url(session: &Session, root: &Path) -> Result<()> {
    println!("{}", repository_page(session, root).await?);
    Ok(())
}

async fn cmd_open(session: &Session, root: &Path) -> Result<()> {
    let url = repository_page(session, root).await?;
    let (program, args) = opener();

    let status = tokio::process::Command::new(program)
        .args(args)
        .arg(&url)
        .status()
        .await
        .with_context(|| format!("Failed to launch {program}"))?;
    if !status.success() {
        bail!("{program} exited with {status}");
    }

    info!(url = %url, "opened repository page");
    Ok(())
}

async fn repository_page(session: &Session, root: &Path) -> Result<String> {
    session
        .browser_url(root)
        .await?
        .ok_or_else(|| anyhow!("{} is not a Travis CI project", root.display()))
}

/// Platform browser launcher and its leading arguments.
fn opener() -> (&'static str, &'static [&'static str]) {
    if cfg!(target_os = "macos") {
        ("open", &[])
    } else if cfg!(target_os = "windows") {
        ("cmd", &["/C", "start", ""])
    } else {
        ("xdg-open", &[])
    }
}

fn print_rendered(rendered: &Rendered, format: Format) -> Result<()> {
    match format {
        Format::Text => {
            println!("{}", rendered.text);
            for line in rendered.tooltip.lines() {
                println!("  {line}");
            }
        }
        Format::Json => println!("{}", serde_json::to_string(rendered)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["buildlight", "status"]).unwrap();
        assert_eq!(cli.workspace, PathBuf::from("."));
        assert_eq!(cli.timeout_secs, 30);
        assert_eq!(cli.policy, PolicyArg::LatestRequest);
        assert!(matches!(cli.command, Commands::Status { format: Format::Text }));

        let options = session_options(&cli);
        assert_eq!(options.pro, None);
        assert_eq!(options.policy, CompletionPolicy::LatestRequest);
        assert_eq!(options.cycle_timeout, Duration::from_secs(30));
        assert_eq!(options.transport.timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "buildlight",
            "watch",
            "--interval-secs",
            "5",
            "--pro",
            "--policy",
            "last-write-wins",
            "--workspace",
            "/tmp/project",
            "--http-timeout-secs",
            "4",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Watch {
                interval_secs: 5,
                ..
            }
        ));

        let options = session_options(&cli);
        assert_eq!(options.pro, Some(true));
        assert_eq!(options.policy, CompletionPolicy::LastWriteWins);
        assert_eq!(options.workspace_root, PathBuf::from("/tmp/project"));
        assert_eq!(options.transport.timeout, Duration::from_secs(4));
    }

    #[test]
    fn test_empty_api_base_is_ignored() {
        let cli = Cli::try_parse_from(["buildlight", "--api-base", "", "url"]).unwrap();
        assert_eq!(session_options(&cli).api_base, None);
    }

    #[tokio::test]
    async fn test_url_for_non_ci_workspace_fails() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from([
            "buildlight",
            "--workspace",
            dir.path().to_str().unwrap(),
            "url",
        ])
        .unwrap();
        let session = start_session(&cli).unwrap();

        let err = repository_page(&session, dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("not a Travis CI project"));
    }

    #[tokio::test]
    async fn test_url_from_settings_identity() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".travis.yml"), "language: rust\n").unwrap();
        std::fs::create_dir(dir.path().join(".vscode")).unwrap();
        std::fs::write(
            dir.path().join(".vscode/settings.json"),
            r#"{"travis.username": "octo", "travis.repository": "widgets", "travis.pro": true}"#,
        )
        .unwrap();
        let cli = Cli::try_parse_from([
            "buildlight",
            "--workspace",
            dir.path().to_str().unwrap(),
            "url",
        ])
        .unwrap();
        let session = start_session(&cli).unwrap();

        assert_eq!(
            repository_page(&session, dir.path()).await.unwrap(),
            "https://travis-ci.com/octo/widgets"
        );
    }
}

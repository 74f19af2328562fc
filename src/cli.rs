//! `uihealth` command line
//!
//! Drives the monitor against the headless in-memory host, so failure
//! scenarios can be reproduced and the resulting reports inspected without
//! a real UI.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{ElementIds, MonitorConfig};
use crate::host::memory::{SAVE_SETTINGS_BUTTON, TEST_CONNECTION_BUTTON};
use crate::host::{InMemoryHost, UiHost};
use crate::monitor::{health, MonitorStatistics, UiHealthMonitor};
use crate::observability::telemetry::init_tracing_with_filter;
use crate::tracker::{GitHubTracker, IssueTracker, RecordingTracker};

#[derive(Parser)]
#[command(name = "uihealth")]
#[command(about = "Watch a UI for broken interactions, repair them, report what cannot be repaired")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    /// Verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default)
    #[default]
    Text,
    /// JSON output for scripting
    Json,
}

/// Failure modes the in-memory host can be put into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Everything wired correctly
    #[default]
    Healthy,
    /// Settings button lost its click handler; repaired on first failure
    BrokenSettings,
    /// Open-settings capability gone; repairs cannot help
    UnresponsiveSettings,
    /// Close-settings capability gone
    MissingCapability,
    /// Settings modal removed from the tree
    RemovedModal,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted session against the in-memory host
    Simulate {
        #[arg(short, long, value_enum, default_value = "healthy")]
        scenario: Scenario,

        /// Number of settings-button clicks
        #[arg(long, default_value_t = 3)]
        clicks: u32,

        /// Answer yes to the restart prompt
        #[arg(long)]
        accept_restart: bool,

        /// File issues with the configured GitHub tracker instead of recording them
        #[arg(long)]
        file_issues: bool,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// One-shot health evaluation of a scenario layout
    Check {
        #[arg(short, long, value_enum, default_value = "healthy")]
        scenario: Scenario,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the effective configuration
    Config,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub scenario: Scenario,
    pub statistics: MonitorStatistics,
    pub health_issues: Vec<String>,
    pub filed_issues: Vec<String>,
    pub prompts: Vec<String>,
    pub restarts: u32,
}

/// Put a default-layout host into `scenario`.
pub fn apply_scenario(host: &InMemoryHost, ids: &ElementIds, scenario: Scenario) -> Result<()> {
    match scenario {
        Scenario::Healthy => {}
        Scenario::BrokenSettings => host.detach_handler(&ids.settings_trigger)?,
        Scenario::UnresponsiveSettings => host.remove_capability(&ids.open_settings),
        Scenario::MissingCapability => host.remove_capability(&ids.close_settings),
        Scenario::RemovedModal => host.remove_element(&ids.settings_modal)?,
    }
    Ok(())
}

fn settle_delay(config: &MonitorConfig, category_extra_ms: u64) -> Duration {
    config.timing.verification_delay() + Duration::from_millis(category_extra_ms + 50)
}

pub async fn simulate(
    config: MonitorConfig,
    scenario: Scenario,
    clicks: u32,
    accept_restart: bool,
    file_issues: bool,
) -> Result<SimulationReport> {
    let ids = config.elements.clone();
    let (host, feeds) = InMemoryHost::with_default_layout(&ids);
    host.set_confirm_answer(accept_restart);

    let recorder = Arc::new(if file_issues {
        let github: Arc<dyn IssueTracker> = Arc::new(GitHubTracker::new(&config.tracker)?);
        RecordingTracker::forwarding(github)
    } else {
        RecordingTracker::new()
    });

    let monitor = UiHealthMonitor::new(config.clone(), host.clone(), recorder.clone())?;
    let handle = monitor
        .initialize(feeds)
        .await
        .context("monitor was already initialized")?;

    apply_scenario(&host, &ids, scenario)?;
    info!(?scenario, "Scenario applied");

    let open_settle = settle_delay(&config, 0);
    for n in 0..clicks {
        debug!(click = n + 1, "Clicking settings button");
        host.click(&ids.settings_trigger)?;
        tokio::time::sleep(open_settle).await;
        // Close again so the next click has something to verify
        if host.is_active(&ids.settings_modal).await {
            host.set_active(&ids.settings_modal, false)?;
        }
    }

    host.click(&ids.chat_trigger)?;
    host.click(TEST_CONNECTION_BUTTON)?;
    tokio::time::sleep(settle_delay(&config, config.timing.connection_test_delay_ms)).await;

    if host.element(SAVE_SETTINGS_BUTTON).await.is_some() {
        host.click(SAVE_SETTINGS_BUTTON)?;
        tokio::time::sleep(settle_delay(&config, config.timing.save_verification_delay_ms)).await;
    }

    let health_issues = monitor
        .health()
        .perform_health_check()
        .await
        .iter()
        .map(ToString::to_string)
        .collect();
    handle.shutdown().await;

    Ok(SimulationReport {
        scenario,
        statistics: monitor.get_statistics(),
        health_issues,
        filed_issues: recorder.filed_titles(),
        prompts: host.prompts(),
        restarts: host.restart_count(),
    })
}

fn print_report(report: &SimulationReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            let stats = &report.statistics;
            println!("Scenario: {:?}", report.scenario);
            println!(
                "Interactions: {} recorded, {} verified",
                stats.total_interactions, stats.verified_interactions
            );
            println!("Critical errors: {}", stats.critical_error_count);
            for (target, count) in &stats.auto_fix_attempts {
                println!("Auto-fix attempts [{}]: {}", target, count);
            }
            if report.health_issues.is_empty() {
                println!("Health: OK");
            } else {
                for issue in &report.health_issues {
                    println!("Health issue: {}", issue);
                }
            }
            for title in &report.filed_issues {
                println!("Issue: {}", title);
            }
            if !report.prompts.is_empty() {
                println!("Restart prompts: {}", report.prompts.len());
            }
        }
    }
    Ok(())
}

async fn check(config: &MonitorConfig, scenario: Scenario, format: OutputFormat) -> Result<()> {
    let (host, _feeds) = InMemoryHost::with_default_layout(&config.elements);
    apply_scenario(&host, &config.elements, scenario)?;
    let issues: Vec<String> = health::evaluate(host.as_ref(), &config.elements)
        .await
        .iter()
        .map(ToString::to_string)
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&issues)?),
        OutputFormat::Text if issues.is_empty() => println!("Health: OK"),
        OutputFormat::Text => {
            for issue in &issues {
                println!("{}", issue);
            }
        }
    }
    Ok(())
}

/// Effective configuration as TOML, with the tracker token masked.
pub fn render_config(config: &MonitorConfig) -> Result<String> {
    let mut shown = config.clone();
    if shown.tracker.token.is_some() {
        shown.tracker.token = Some("********".to_string());
    }
    toml::to_string_pretty(&shown).context("Failed to serialize config")
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_string());
    init_tracing_with_filter(&filter, matches!(cli.log_format, LogFormat::Json));

    let config = MonitorConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate {
            scenario,
            clicks,
            accept_restart,
            file_issues,
            format,
        } => {
            let report = simulate(config, scenario, clicks, accept_restart, file_issues).await?;
            print_report(&report, format)?;
        }
        Commands::Check { scenario, format } => check(&config, scenario, format).await?,
        Commands::Config => print!("{}", render_config(&config)?),
    }
    Ok(())
}

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vision_navigator::brain::providers::VisionBackend;
use vision_navigator::cli::Cli;
use vision_navigator::{
    ChromeBrowser, FailureReason, NavigationResult, Navigator, ProviderSettings, VisionBrain,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let goal = cli.goal();
    let config = cli.navigator_config();
    let kind = cli.provider_kind(|var| std::env::var(var).ok());
    let settings = match ProviderSettings::from_env(kind) {
        Ok(settings) => settings,
        Err(e) => return report_setup_failure(&cli, FailureReason::ProviderError, e),
    };
    let backend = VisionBackend::from_settings(&settings);
    info!(provider = kind.name(), model = backend.model(), goal = goal.text(), "starting navigation");

    let headless = cli.headless();
    let viewport = config.viewport;
    let launched = tokio::task::spawn_blocking(move || ChromeBrowser::launch(headless, viewport))
        .await
        .context("browser launch panicked")
        .and_then(|launch| launch);
    let browser = match launched {
        Ok(browser) => browser,
        Err(e) => return report_setup_failure(&cli, FailureReason::BrowserError, e),
    };

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, stopping after the current step");
                cancel.cancel();
            }
        }
    });

    let navigator = Navigator::new(VisionBrain::new(backend, &config), config);
    let run = navigator.run(browser, &goal, &cancel).await;

    println!("{}", run.result.to_json()?);
    run.result
        .write_to(&cli.output)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    info!(path = %cli.output.display(), steps = run.steps, "result saved");

    Ok(if run.result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Writes the failure report for a run that could not start.
fn report_setup_failure(
    cli: &Cli,
    reason: FailureReason,
    detail: impl std::fmt::Display,
) -> Result<ExitCode> {
    let result = NavigationResult::setup_failure(reason, detail);
    if let NavigationResult::Failed(report) = &result {
        error!(%reason, detail = report.detail.as_deref().unwrap_or_default(), "run could not start");
    }
    println!("{}", result.to_json()?);
    result
        .write_to(&cli.output)
        .with_context(|| format!("writing {}", cli.output.display()))?;
    Ok(ExitCode::FAILURE)
}

fn init_tracing(debug: bool) {
    let fallback = if debug { "vision_navigator=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

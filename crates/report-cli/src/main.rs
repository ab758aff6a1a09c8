use std::io::Write as _;
use std::sync::Arc;

use analysis_core::export::{download, render_text, share_message};
use analysis_core::{AnalysisRequest, JobService, NormalizedReport};
use analysis_orchestrator::{AnalysisOrchestrator, OrchestratorState, Phase, RetryDecision};
use analyst_client::{AnalystClient, HttpJobService};
use anyhow::{Context, Result};
use tokio::sync::watch;

mod args;
mod config;

use args::CliArgs;
use config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let argv: Vec<String> = std::env::args().collect();
    let Some(cli) = CliArgs::parse(&argv) else {
        args::print_usage();
        std::process::exit(2);
    };

    let mut config = AppConfig::from_env()?;
    if cli.auto_retry {
        config.orchestrator.retry.auto_retry = true;
    }
    tracing::info!("Analysis service: {}", config.client.base_url);
    tracing::info!(
        "  Poll every {:?}, give up after {:?}",
        config.orchestrator.poll.interval,
        config.orchestrator.poll.deadline
    );
    tracing::info!(
        "  Max attempts: {} (auto-retry: {})",
        config.orchestrator.retry.max_attempts,
        config.orchestrator.retry.auto_retry
    );

    let client = AnalystClient::new(config.client.clone()).context("Failed to build analysis client")?;

    if !cli.skip_health {
        match client.health().await {
            Ok(true) => tracing::info!("Analysis service is healthy"),
            Ok(false) => tracing::warn!("Analysis service health check did not report healthy"),
            Err(e) => tracing::warn!("Analysis service health check failed: {}", e),
        }
    }

    let service: Arc<dyn JobService> = Arc::new(HttpJobService::new(client));
    tracing::debug!("Job backend: {}", service.backend_name());
    let mut orchestrator = AnalysisOrchestrator::new(service, config.orchestrator);
    let progress = tokio::spawn(report_progress(
        orchestrator.subscribe(),
        config.orchestrator.retry.max_attempts,
    ));

    let request = AnalysisRequest::new(&cli.symbol, &cli.company);
    if let Err(e) = orchestrator.submit(request.clone()) {
        progress.abort();
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }

    let state = loop {
        let finished = until_interrupted(orchestrator.wait(), tokio::signal::ctrl_c()).await;
        let Some(state) = finished else {
            tracing::warn!("Interrupted, cancelling analysis");
            orchestrator.cancel();
            progress.abort();
            std::process::exit(130);
        };

        if state.phase != Phase::Failed || !orchestrator.retry_available() || cli.no_prompt {
            break state;
        }
        let message = state.error_message.clone().unwrap_or_default();
        if !ask_retry(&message, state.attempt_count, config.orchestrator.retry.max_attempts).await? {
            break state;
        }
        if let RetryDecision::Scheduled { attempt } = orchestrator.retry() {
            tracing::info!("Scheduled attempt {}", attempt);
        }
    };
    progress.abort();

    match (&state.phase, &state.report) {
        (Phase::Succeeded, Some(report)) => {
            print_report(&request, report, cli.json)?;
            if let Some(dir) = &cli.output {
                let file = download(&request.symbol, report)?;
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
                let path = dir.join(&file.file_name);
                std::fs::write(&path, &file.body)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                tracing::info!("Saved {} ({})", path.display(), file.mime_type);
            }
            Ok(())
        }
        _ => {
            eprintln!(
                "Error: {}",
                state.error_message.as_deref().unwrap_or("Analysis did not complete")
            );
            std::process::exit(1);
        }
    }
}

/// Log the progress line whenever the visible state changes.
async fn report_progress(mut rx: watch::Receiver<OrchestratorState>, max_attempts: u32) {
    let mut last: Option<String> = None;
    while rx.changed().await.is_ok() {
        let line = rx.borrow_and_update().progress_message(max_attempts);
        if line.is_some() && line != last {
            if let Some(text) = &line {
                tracing::info!("{}", text);
            }
        }
        last = line;
    }
}

async fn ask_retry(message: &str, attempt: u32, max_attempts: u32) -> Result<bool> {
    eprintln!("Error: {}", message);
    eprint!("Retry? ({}/{} attempts used) [y/N] ", attempt, max_attempts);
    std::io::stderr().flush()?;

    let read = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| line)
    });
    // ctrl_c has been registered, so SIGINT no longer ends the process on its own
    let Some(answer) = until_interrupted(read, tokio::signal::ctrl_c()).await else {
        eprintln!();
        std::process::exit(130);
    };
    let answer = answer??;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// `None` when `interrupt` resolves first.
async fn until_interrupted<T>(
    work: impl std::future::Future<Output = T>,
    interrupt: impl std::future::Future,
) -> Option<T> {
    tokio::select! {
        biased;
        _ = interrupt => None,
        out = work => Some(out),
    }
}

fn print_report(request: &AnalysisRequest, report: &NormalizedReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&report.raw)?);
        return Ok(());
    }

    let share = share_message(request);
    println!("{}", share.title);
    println!("{}", share.text);
    println!(
        "Generated {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S %Z")
    );
    println!();
    print!("{}", render_text(report));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_ends_a_pending_prompt() {
        let read = std::future::pending::<String>();
        let interrupt = tokio::time::sleep(Duration::from_secs(1));
        assert_eq!(until_interrupted(read, interrupt).await, None);
    }

    #[tokio::test]
    async fn test_answer_passes_through() {
        let read = async { "y\n".to_string() };
        let answer = until_interrupted(read, std::future::pending::<()>()).await;
        assert_eq!(answer.as_deref(), Some("y\n"));
    }
}

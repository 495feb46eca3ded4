mod app;
mod cli;
mod collaborators;

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use app::Orchestrator;
use cli::{Cli, RunMode};

const EXIT_OK: i32 = 0;
const EXIT_USER_INTERRUPT: i32 = 130;
const EXIT_FATAL: i32 = 1;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    env_logger::Builder::new().filter_level(cli.log_level.to_filter()).init();

    std::process::exit(match run(cli).await {
        Ok(RunOutcome::Normal) => EXIT_OK,
        Ok(RunOutcome::UserInterrupt) => EXIT_USER_INTERRUPT,
        Err(err) => {
            log::error!("fatal error: {err:#}");
            EXIT_FATAL
        }
    });
}

enum RunOutcome {
    Normal,
    UserInterrupt,
}

async fn run(cli: Cli) -> anyhow::Result<RunOutcome> {
    let app = Orchestrator::bootstrap(&cli).await?;
    app.start_enabled_modules().await;

    #[cfg(unix)]
    orchestrator_shutdown::install_signal_handlers(Arc::clone(&app.shutdown));

    let outcome = match cli.mode {
        RunMode::Interactive => run_interactive(Arc::clone(&app)).await,
        RunMode::Cli | RunMode::Gui => {
            if matches!(cli.mode, RunMode::Gui) {
                log::warn!("--mode gui has no rendering surface in this build; running headless");
            }
            wait_for_shutdown(Arc::clone(&app)).await
        }
    };

    if !app.shutdown.is_complete().await {
        app.shutdown.initiate_shutdown("normal exit").await;
    }
    Ok(outcome)
}

/// Blocks until `ShutdownCoordinator` runs (signal-triggered), mirroring a
/// headless `cli`/`gui` run with no interactive command surface.
async fn wait_for_shutdown(app: Arc<Orchestrator>) -> RunOutcome {
    while !app.shutdown.is_complete().await {
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    }
    RunOutcome::UserInterrupt
}

/// A minimal line-oriented command surface for `--mode interactive`
/// (spec §6 names the master CLI's modes but leaves their interaction
/// model to the embedding UI, which is a Non-goal here — this is the
/// smallest headless stand-in for that UI).
async fn run_interactive(app: Arc<Orchestrator>) -> RunOutcome {
    println!("orchestrator ready. commands: start <id> | stop <id> | session start|stop|status | record <trial> <label> | pause | quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if handle_command(&app, line.trim()).await {
                            break RunOutcome::Normal;
                        }
                    }
                    Ok(None) => break RunOutcome::Normal,
                    Err(err) => {
                        log::warn!("stdin read error: {err}");
                        break RunOutcome::Normal;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break RunOutcome::UserInterrupt;
            }
        }
    }
}

/// Returns `true` when the command loop should exit.
async fn handle_command(app: &Arc<Orchestrator>, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("start") => {
            if let Some(device_id) = parts.next() {
                match app.spawn_spec_for_id(device_id) {
                    Some(spec) => match app.coordinator.connect_and_start(device_id, spec).await {
                        Ok(true) => println!("{device_id}: started"),
                        Ok(false) => println!("{device_id}: did not become ready"),
                        Err(err) => println!("{device_id}: {err}"),
                    },
                    None => println!("{device_id}: no such module"),
                }
            }
        }
        Some("stop") => {
            if let Some(device_id) = parts.next() {
                let stopped = app.coordinator.stop_and_disconnect(device_id).await;
                println!("{device_id}: stop requested (known={stopped}), settled={}", app.is_stopped(device_id).await);
            }
        }
        Some("session") => match parts.next() {
            Some("start") => {
                app.sessions.start_session().await;
                println!("session start dispatched");
            }
            Some("stop") => {
                app.sessions.stop_session().await;
                println!("session stop dispatched");
            }
            Some("status") | None => {
                let status = app.sessions.get_status().await;
                println!("{status:?}");
            }
            _ => println!("unknown session subcommand"),
        },
        Some("record") => {
            let trial: u32 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(1);
            let label = parts.next().unwrap_or("trial");
            match app.sessions.record(trial, label, &app.session_output_dir()).await {
                Ok(results) => println!("record dispatched: {results:?}"),
                Err(err) => println!("record rejected: {err}"),
            }
        }
        Some("pause") => {
            let results = app.sessions.pause().await;
            println!("pause dispatched: {results:?}");
        }
        Some("quit") | Some("exit") => return true,
        Some(other) => println!("unrecognized command: {other}"),
        None => {}
    }
    false
}

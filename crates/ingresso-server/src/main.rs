//! Ingresso.com now-playing integration
//!
//! Main entry point: entry management commands and the polling loop.

mod app;
mod cli;
mod wizard;

use std::io::{self, Write};

use anyhow::{bail, Result};
use app::{describe_setup, Ingresso};
use clap::Parser;
use cli::{Cli, Commands};
use ingresso_config_entries::{ConfigEntryState, IngressoConfig, REASON_AUTH_FAILED};
use ingresso_config_flow::{FlowResult, FlowResultType};
use ingresso_core::State;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing, RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let app = Ingresso::load(&cli.config_dir, cli.base_url.as_deref()).await?;

    match cli.command {
        Commands::Setup => setup(&app).await,
        Commands::Reconfigure { entry_id } => reconfigure(&app, &entry_id).await,
        Commands::List { json } => list(&app, json),
        Commands::Remove { entry_id } => remove(&app, &entry_id).await,
        Commands::Update { json } => update(&app, json).await,
        Commands::Run => run(&app).await,
    }
}

async fn setup(app: &Ingresso) -> Result<()> {
    let start = app.flows.start_user_flow().await?;
    let result = run_wizard(app, start).await?;
    report_flow(app, &result)
}

async fn reconfigure(app: &Ingresso, entry_id: &str) -> Result<()> {
    let start = app.flows.start_options_flow(entry_id).await?;
    let result = run_wizard(app, start).await?;
    report_flow(app, &result)
}

async fn run_wizard(app: &Ingresso, start: FlowResult) -> Result<FlowResult> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    wizard::drive(&app.flows, start, &mut input, &mut output).await
}

/// Print what a finished flow did to its entry
fn report_flow(app: &Ingresso, result: &FlowResult) -> Result<()> {
    if result.result_type == FlowResultType::Abort {
        println!("Aborted");
        return Ok(());
    }

    let Some(entry) = result.entry_id.as_deref().and_then(|id| app.entries.get(id)) else {
        bail!("flow {} finished without an entry", result.flow_id);
    };

    println!("{} [{}]", entry.title, entry.entry_id);
    if entry.state == ConfigEntryState::SetupError
        && entry.reason.as_deref() == Some(REASON_AUTH_FAILED)
    {
        println!(
            "  reconfiguration required: run `ingresso reconfigure {}`",
            entry.entry_id
        );
    } else if let Some(sensor) = app.platform.sensor(&entry.entry_id) {
        let sensor = sensor.try_lock().map(|s| s.entity_id().to_string());
        if let Ok(entity_id) = sensor {
            println!("  sensor: {}", entity_id);
        }
    }
    Ok(())
}

fn list(app: &Ingresso, json: bool) -> Result<()> {
    let entries = app.entries.entries();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No entries configured. Run `ingresso setup` to add one.");
        return Ok(());
    }

    for entry in entries {
        println!("{}  {}", entry.entry_id, entry.title);
        match IngressoConfig::from_data(&entry.data) {
            Ok(config) => println!(
                "    city {} ({}), theater {}, partnership {}",
                config.city_name,
                config.city_id,
                config.theater.as_deref().unwrap_or("all"),
                config.partnership
            ),
            Err(e) => println!("    unusable: {}", e),
        }
    }
    Ok(())
}

async fn remove(app: &Ingresso, entry_id: &str) -> Result<()> {
    let entry = app.entries.remove(entry_id).await?;
    println!("Removed {} [{}]", entry.title, entry.entry_id);
    Ok(())
}

async fn update(app: &Ingresso, json: bool) -> Result<()> {
    for (entry_id, result) in app.entries.setup_all().await {
        if let Err(e) = &result {
            app::report_setup_error(&entry_id, e);
        }
        if !json {
            println!("{}: {}", entry_id, describe_setup(&result));
        }
    }

    let states = app.publish().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&states)?);
    } else {
        print_states(&states);
    }
    Ok(())
}

fn print_states(states: &[State]) {
    for state in states {
        let last_updated: Option<String> = state.attribute("last_updated");
        println!(
            "{} = {} (last updated {})",
            state.entity_id,
            state.state,
            last_updated.as_deref().unwrap_or("never")
        );
    }
}

async fn run(app: &Ingresso) -> Result<()> {
    let loaded = app.setup_entries().await;
    if loaded == 0 {
        warn!("No entry could be set up, nothing to poll");
    }

    let mut interval = tokio::time::interval(app.settings.scan_interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick is immediate and setup already fetched every sensor
    interval.tick().await;
    app.publish().await?;

    info!(
        "Polling {} sensors every {}s",
        loaded,
        app.settings.scan_interval().as_secs()
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let states = app.update().await?;
                let available = states.iter().filter(|s| !s.is_unavailable()).count();
                info!("Updated {} sensors ({} available)", states.len(), available);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                break;
            }
        }
    }

    io::stdout().flush()?;
    Ok(())
}

//! agentgate: HTTP gateway for chat and research agents.

use std::sync::Arc;

use tracing::info;

use agentgate_core::GatewayConfig;
use agentgate_server::{build_router, telemetry, AppState};

fn print_help() {
    println!("agentgate: HTTP gateway for chat and research agents");
    println!();
    println!("Usage: agentgate [command]");
    println!();
    println!("Commands:");
    println!("  (none)                   Start the server");
    println!("  check-config             Load configuration and print it without secrets");
    println!("  help                     Show this help message");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            "--check-config" | "check-config" => {
                // API keys are never serialized.
                let config = GatewayConfig::from_env()?;
                println!("{}", serde_json::to_string_pretty(&config)?);
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'agentgate help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    let config = GatewayConfig::from_env()?;
    telemetry::init(&config);

    info!(
        "Starting agentgate ({}) with default model {}",
        config.environment, config.model_name
    );
    if !config.research_enabled() {
        info!("EXA_API_KEY not set; research requests will return an error");
    }

    let addr = config.bind_addr();
    let state = Arc::new(AppState::from_config(config));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("agentgate listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("agentgate stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

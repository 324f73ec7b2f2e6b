#![cfg_attr(not(test), deny(clippy::panic))]

use clap::Parser;
use quizdash_server::config;
use quizdash_server::logging;
use quizdash_server::server::GameServer;
use quizdash_server::websocket;
use std::net::SocketAddr;
use std::sync::Arc;

/// Quizdash -- realtime WebSocket game server for live multiplayer quizzes
#[derive(Parser, Debug)]
#[command(name = "quizdash-server")]
#[command(about = "A realtime, in-memory WebSocket game server for live multiplayer quizzes")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines and pre-deployment checks.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    /// Useful for debugging configuration loading from multiple sources.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration from config.json if present; otherwise use code defaults.
    let cfg = Arc::new(config::load());

    // Handle --print-config: output the loaded configuration as JSON
    if cli.print_config {
        let json = serde_json::to_string_pretty(&*cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    // config::load() already validated but only warned on stderr; capture
    // the result here for a proper exit code and hard failure in production.
    let validation_result = config::validate_config(&cfg);

    // Handle --validate-config: exit after validation
    if cli.validate_config {
        match validation_result {
            Ok(()) => {
                println!("Configuration validation passed");
                println!();
                println!("Configuration summary:");
                println!("  Port: {}", cfg.port);
                println!("  Room TTL: {}s", cfg.server.room_ttl_seconds);
                println!(
                    "  Organizer grace: {}s",
                    cfg.server.organizer_grace_seconds
                );
                println!("  Max rooms: {}", cfg.server.max_rooms);
                println!(
                    "  Max players per room: {}",
                    cfg.server.max_players_per_room
                );
                println!("  Allowed origins: {}", cfg.security.allowed_origins);
                return Ok(());
            }
            Err(e) => {
                eprintln!("Configuration validation failed:\n{e}");
                std::process::exit(1);
            }
        }
    }

    // In normal operation, propagate validation errors
    validation_result?;

    // Initialize logging from config.
    logging::init_with_config(&cfg.logging);

    let port: u16 = cfg.port;
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "Starting Quizdash server");

    let game_server = GameServer::new(&cfg);

    // Start the sweep task that reaps closed rooms.
    let sweeper = Arc::clone(game_server.directory());
    tokio::spawn(async move {
        sweeper.sweep_task().await;
    });

    let app = websocket::create_router(&cfg.security.allowed_origins).with_state(game_server.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        allowed_origins = %cfg.security.allowed_origins,
        "Server started - realtime protocol: /ws/{{room_code}}/{{client_id}}, control plane: /room/create"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(game_server))
        .await?;

    Ok(())
}

async fn shutdown_signal(game_server: Arc<GameServer>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received; closing rooms");
    game_server.directory().close_all().await;
}

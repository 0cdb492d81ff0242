use axum::routing::get;
use axum::Router;
use pong_server::config::ServerConfig;
use pong_server::game_loop::{run_game_loop, GameCommand};
use pong_server::ws::{ws_handler, AppState};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid server configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Validate configuration before starting
    if let Err(e) = config.validate() {
        eprintln!("Invalid server configuration: {}", e);
        std::process::exit(1);
    }

    let listen_addr = config.listen_addr.clone();
    let outbound_buffer = config.outbound_buffer;

    let (game_tx, game_rx) = mpsc::channel::<GameCommand>(config.command_buffer);

    // Spawn game loop
    let tick_tx = game_tx.clone();
    tokio::spawn(async move {
        run_game_loop(game_rx, tick_tx, config).await;
    });

    // Axum app. The browser client connects to the bare host.
    let app_state = AppState {
        game_tx,
        outbound_buffer,
    };
    let app = Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    tracing::info!("Starting pong server on {}", listen_addr);
    println!("Pong server listening on {}", listen_addr);

    let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", listen_addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

use std::sync::Arc;

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use lobby_hub::adapters::mapgen::TemplateMapGenerator;
use lobby_hub::adapters::websocket::{
    lobby_dispatcher, websocket_router, Hub, Lobby, PumpSettings, WebSocketState,
};
use lobby_hub::config::{AppConfig, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config.server);

    let hub = Hub::spawn();
    let lobby = Arc::new(Lobby::new(
        hub,
        Arc::new(TemplateMapGenerator::default()),
        &config.hub,
    ));
    let dispatcher = Arc::new(lobby_dispatcher(lobby.clone()));
    let state = WebSocketState::new(lobby, dispatcher, PumpSettings::from(&config.hub));

    let mut app = websocket_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http());
    if let Some(cors) = cors_layer(&config.server) {
        app = app.layer(cors);
    }

    let addr = config.server.socket_addr()?;
    tracing::info!(
        %addr,
        environment = ?config.server.environment,
        room_capacity = config.hub.room_capacity,
        "starting lobby hub"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("lobby hub stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    if server.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

fn cors_layer(server: &ServerConfig) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }
    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

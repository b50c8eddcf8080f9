use std::{net::SocketAddr, sync::Arc, time::Duration};

use {
    anyhow::Context as _,
    axum::{
        Router,
        extract::State,
        middleware,
        response::{IntoResponse, Json},
        routing::{get, post},
    },
    tracing::{error, info, warn},
};

use {
    linecord_config::BridgeConfig,
    linecord_discord::DiscordOutbound,
    linecord_line::LineClient,
    linecord_relay::{InboundFanout, RelayQueue},
};

use crate::{
    signature_middleware::require_line_signature, state::AppState, webhook::webhook_handler,
};

/// How long the relay queue may keep draining after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

// ── Router ───────────────────────────────────────────────────────────────────

/// Build the HTTP router (shared between production startup and tests).
pub fn build_app(state: AppState, webhook_path: &str) -> Router {
    let webhook = Router::new()
        .route(webhook_path, post(webhook_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_line_signature,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .merge(webhook)
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": state.version,
        "destinations": state.fanout.destinations().len(),
        "relay": state.relay.stats(),
    }))
}

// ── Startup ──────────────────────────────────────────────────────────────────

/// Run the bridge until a shutdown signal arrives.
///
/// `config` is expected to have passed validation.
pub async fn start_gateway(config: BridgeConfig) -> anyhow::Result<()> {
    let line = Arc::new(LineClient::from_config(&config.line));
    let relay = RelayQueue::new(line.clone(), config.relay.pacing());

    let mut discord = linecord_discord::build_client(&config.discord, relay.clone()).await?;
    let outbound = Arc::new(DiscordOutbound::new(discord.http.clone()));
    let fanout = InboundFanout::new(
        config.discord.channel_id.clone(),
        config.discord.fanout_channel_ids.iter().cloned(),
        outbound,
        line,
    )
    .with_include_author(config.discord.include_author);
    info!(
        destinations = fanout.destinations().len(),
        pacing_ms = config.relay.pacing_ms,
        "bridge configured"
    );

    let mut state = AppState::new(fanout, relay.clone());
    if config.line.verify_signature {
        state = state.with_channel_secret(config.line.channel_secret.clone());
    }
    let app = build_app(state, &config.server.webhook_path);

    let shard_manager = discord.shard_manager.clone();
    let discord_task = tokio::spawn(async move {
        if let Err(e) = discord.start().await {
            error!(error = %e, "discord client stopped");
        }
    });

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid listen address {}:{}",
                config.server.bind, config.server.port
            )
        })?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, webhook_path = %config.server.webhook_path, "linecord listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down");
    shard_manager.shutdown_all().await;
    if tokio::time::timeout(DRAIN_TIMEOUT, relay.wait_idle())
        .await
        .is_err()
    {
        warn!(queued = relay.len(), "relay queue not drained, dropping remaining messages");
    }
    discord_task.abort();
    info!("linecord stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

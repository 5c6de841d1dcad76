use std::sync::Arc;

use axum::http::Method;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app_auth::api;
use app_auth::canonical::CANONICALIZATION_VERSION;
use app_auth::config::Config;
use app_auth::crypto::{fingerprint, parse_public_key_b64};
use app_auth::keyfile::load_or_generate;
use app_auth::keystore::TrustedKeyStore;
use app_auth::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app_auth=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!("Starting app-auth server v{}", config.version);
    tracing::info!("Host: {}:{}", config.host, config.port);
    tracing::info!("Key dir: {:?}", config.key_dir);
    tracing::info!("Canonicalization v{}", CANONICALIZATION_VERSION);

    // Trust our own key plus anything configured explicitly
    let signing_key = load_or_generate(&config.public_key_path(), &config.private_key_path())?;
    let store = TrustedKeyStore::new();
    let own_id = store.trust(signing_key.verifying_key());
    tracing::info!("Trusting local key {}", fingerprint(&own_id));

    for encoded in &config.trusted_keys {
        match parse_public_key_b64(encoded) {
            Ok(key) => {
                let id = store.trust(key);
                tracing::info!("Trusting configured key {}", fingerprint(&id));
            }
            Err(e) => tracing::warn!("Skipping invalid trusted key: {}", e),
        }
    }
    tracing::info!("{} trusted keys loaded", store.len());

    let state = AppState::new(config.clone(), Arc::new(store));

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .allow_origin(Any);

    let app = api::create_router(Arc::clone(&state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config))
        .await?;

    tracing::info!(
        "Shutdown complete: {} echo, {} add, {} rejected",
        state.echo_handled(),
        state.add_handled(),
        state.rejected()
    );
    Ok(())
}

async fn shutdown_signal(config: Config) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let deadline = async {
        match config.shutdown_after {
            Some(after) => tokio::time::sleep(after).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
        _ = deadline => tracing::info!("Shutdown deadline reached"),
    }
}

use std::net::SocketAddr;
use std::sync::Arc;

use ed25519_dalek::SigningKey;
use tempfile::TempDir;
use tokio::net::TcpListener;

use app_auth::{api, AppState, Config, KeyStore};

/// Start a test server trusting `keys` and return its address
pub async fn spawn_test_server(keys: Arc<dyn KeyStore>) -> (SocketAddr, Arc<AppState>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = Config {
        key_dir: temp_dir.path().to_path_buf(),
        host: "127.0.0.1".into(),
        port: 0,
        ..Config::default()
    };

    let state = AppState::new(config, keys);
    let app = api::create_router(Arc::clone(&state));

    // Bind to random port
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    // Wait for server to be ready
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    (addr, state, temp_dir)
}

/// Deterministic key pair for tests
pub fn test_key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

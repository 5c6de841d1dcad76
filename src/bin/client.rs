use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app_auth::client::Client;
use app_auth::config::Config;
use app_auth::keyfile::load_key_pair;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app_auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let signing_key = load_key_pair(&config.public_key_path(), &config.private_key_path())?;

    let client = Client::with_timeout(&config.server_url, signing_key, config.request_timeout)?;
    tracing::info!("Client key: {}", client.key_id());

    let echoed = client.echo("Hello World").await?;
    tracing::info!("Echo reply: {}", echoed);

    let sum = client.add(1.0, 2.0).await?;
    tracing::info!("Add reply: {}", sum);

    Ok(())
}

use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub version: String,
    pub host: String,
    pub port: u16,
    pub key_dir: PathBuf,
    pub public_key_file: String,
    pub private_key_file: String,
    /// Extra base64 public keys to trust at startup
    pub trusted_keys: Vec<String>,
    pub server_url: String,
    pub request_timeout: Duration,
    pub shutdown_after: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(50051),
            key_dir: env::var("KEY_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./fixtures")),
            public_key_file: env::var("PUBLIC_KEY_FILE").unwrap_or_else(|_| "public.key".into()),
            private_key_file: env::var("PRIVATE_KEY_FILE").unwrap_or_else(|_| "private.key".into()),
            trusted_keys: env::var("TRUSTED_KEYS")
                .map(|s| parse_list(&s))
                .unwrap_or_default(),
            server_url: env::var("SERVER_URL").unwrap_or_else(|_| "http://localhost:50051".into()),
            request_timeout: Duration::from_secs(
                env::var("REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1),
            ),
            shutdown_after: env::var("SHUTDOWN_AFTER_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
        }
    }

    pub fn public_key_path(&self) -> PathBuf {
        self.key_dir.join(&self.public_key_file)
    }

    pub fn private_key_path(&self) -> PathBuf {
        self.key_dir.join(&self.private_key_file)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn parse_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

mod items;

use items::{ItemStore, ItemsManager};
use jsonwebtoken::Algorithm;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use taskwire_broker::LocalBroker;
use taskwire_core::app::AppBuilder;
use taskwire_core::config::TaskwireConfig;
use taskwire_security::{AuthMiddleware, JwtValidator};

const DEFAULT_CONFIG: &str = "\
server:
  host: \"0.0.0.0\"
  port: 8080
session:
  capacity: 10000
  max_idle_secs: 1800
security:
  jwt_secret: \"dev-only-secret-change-me\"
";

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let config = TaskwireConfig::from_yaml_str(DEFAULT_CONFIG, "default")
        .expect("embedded default config is valid yaml");

    let store = Arc::new(ItemStore::default());
    let broker = Arc::new(LocalBroker::new());
    let jwt_secret = config.get_str("security.jwt_secret").unwrap_or("dev-only-secret-change-me").to_string();
    let validator = JwtValidator::new(jwt_secret.as_bytes(), Algorithm::HS256);

    let capacity = config.get_int("session.capacity").unwrap_or(10_000) as usize;
    let max_idle = Duration::from_secs(config.get_int("session.max_idle_secs").unwrap_or(1800) as u64);

    let app = AppBuilder::new()
        .with_config(config.clone())
        .with_manager(Arc::new(ItemsManager::new(store, broker)))
        .with_middleware(Arc::new(AuthMiddleware::new(validator)))
        .with_sessions(capacity, max_idle)
        .build();

    let host = config.get_str("server.host").unwrap_or("0.0.0.0");
    let port = config.get_int("server.port").unwrap_or(8080) as u16;
    let addr: SocketAddr = format!("{host}:{port}").parse().expect("configured host/port form a valid address");

    taskwire_http::serve(Arc::new(app), addr).await
}

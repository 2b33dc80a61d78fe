//! Test helper utilities for integration tests

use broker_config::GatewayConfig;
use broker_sdk::Broker;
use once_cell::sync::Lazy;
use tracing_subscriber::EnvFilter;

/// Initialize tracing for tests (only once)
static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
});

/// Initialize tracing for tests
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// Connect a broker, panicking with the error on failure
pub async fn connect(config: GatewayConfig) -> Broker {
    init_tracing();
    match Broker::connect(config).await {
        Ok(broker) => broker,
        Err(e) => panic!("broker failed to connect: {e}"),
    }
}

/// Bearer header value for `credential`
pub fn bearer(credential: &str) -> String {
    format!("Bearer {credential}")
}

use route_cost::api;
use route_cost::calculator::RouteCostCalculator;
use route_cost::config;
use route_cost::ledger::InMemoryLedger;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};

fn init_tracing(level: tracing::Level) {
    let subscriber = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_default()?;
    init_tracing(config.log_level().unwrap_or(tracing::Level::INFO));
    if config.log_level().is_none() {
        tracing::warn!(level = %config.logging.level, "Unknown log level, using info");
    }
    tracing::info!(
        app = %config.app.name,
        config_path = config::DEFAULT_CONFIG_PATH,
        "route-cost starting"
    );

    let settings = config.estimation_settings();
    tracing::info!(
        base_rate_per_km = settings.formula.base_rate_per_km,
        fuel_overhead_per_km = settings.formula.fuel_overhead_per_km,
        min_history_samples = settings.min_history_samples,
        "Estimation settings loaded"
    );
    let calculator = RouteCostCalculator::from_settings(InMemoryLedger::new(), &settings);
    let state = Arc::new(RwLock::new(calculator));

    let app = api::router(state);
    let port = config.server_port();
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

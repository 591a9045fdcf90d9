use std::env;
use std::sync::Arc;

use attendance_engine::api::{AppState, create_router};
use attendance_engine::config::ConfigLoader;
use attendance_engine::engine::{AttendanceEngine, SystemTimeSource};
use attendance_engine::store::MemoryStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_DIR: &str = "./config/default";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_dir = env::var("ATTENDANCE_CONFIG_DIR").unwrap_or_else(|_| DEFAULT_CONFIG_DIR.to_string());
    let bind_addr = env::var("ATTENDANCE_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

    let (config, roster) = ConfigLoader::load(&config_dir)?.into_parts();
    info!(
        config_dir = %config_dir,
        utc_offset = %config.offset(),
        shifts = config.catalog().len(),
        employees = roster.len(),
        "Configuration loaded"
    );

    let engine = AttendanceEngine::new(
        config,
        Arc::new(MemoryStore::with_employees(roster)),
        Arc::new(SystemTimeSource),
    );
    let app = create_router(AppState::new(engine));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "Attendance engine listening");
    axum::serve(listener, app).await?;
    Ok(())
}

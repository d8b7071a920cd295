use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing_subscriber::EnvFilter;

use mcp_hotel_booking::adapters::cache::memory_cache::MemoryCache;
use mcp_hotel_booking::adapters::rest::client::HotelApiClient;
use mcp_hotel_booking::config::load_config;
use mcp_hotel_booking::domain::session::SessionContext;
use mcp_hotel_booking::mcp::server::HotelMcpServer;
use mcp_hotel_booking::ports::cache::ResponseCache;
use mcp_hotel_booking::ports::clock::SystemClock;

fn find_config_path() -> PathBuf {
    let candidates = [PathBuf::from("config.yaml"), binary_dir().join("config.yaml")];

    for path in &candidates {
        if path.exists() {
            return path.clone();
        }
    }

    candidates[0].clone()
}

fn binary_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout is reserved for MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting mcp-hotel-booking server");

    let config_path = find_config_path();
    let config = load_config(&config_path)?;
    tracing::info!(base_url = %config.api.base_url, "Using hotel API");

    let cache: Arc<dyn ResponseCache> = Arc::new(MemoryCache::new(config.cache.max_entries));
    let api = Arc::new(HotelApiClient::new(&config.api, config.cache, cache)?);

    let server = HotelMcpServer::new(api, SessionContext::default(), Arc::new(SystemClock));

    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}

use std::sync::Arc;

use flexhire_gateway::modules;
use flexhire_gateway::modules::logger::LogTarget;
use flexhire_gateway::proxy;

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|value| matches!(value.as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let _log_guard = modules::logger::init_logger(LogTarget::gateway());

    let mut proxy_config = match modules::config::load_gateway_config() {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::warn!("failed to load gateway config: {}. using defaults", err);
            proxy::ProxyConfig::default()
        }
    };

    if env_flag("FLEXHIRE_GATEWAY_ALLOW_LAN") {
        proxy_config.allow_lan_access = true;
    }

    if let Ok(value) = std::env::var("FLEXHIRE_GATEWAY_PORT") {
        proxy_config.port = value
            .parse()
            .map_err(|e| format!("invalid FLEXHIRE_GATEWAY_PORT '{}': {}", value, e))?;
    }

    if let Ok(url) = std::env::var("FLEXHIRE_UPSTREAM_URL") {
        proxy_config.upstream_url = url;
    }

    if let Ok(key) = std::env::var("FLEXHIRE_API_KEY") {
        proxy_config.default_api_key = Some(key);
    }

    let bind_address = if let Ok(addr) = std::env::var("FLEXHIRE_GATEWAY_BIND") {
        if addr != "127.0.0.1" && addr != "localhost" {
            proxy_config.allow_lan_access = true;
        }
        addr
    } else {
        proxy_config.get_bind_address().to_string()
    };

    if proxy_config.default_credential().is_none() {
        tracing::info!("no default API key configured; callers must supply their own");
    }

    let upstream = Arc::new(proxy::UpstreamClient::new(&proxy_config)?);
    tracing::info!("forwarding GraphQL requests to {}", upstream.endpoint());

    let port = proxy_config.port;
    let state = proxy::server::AppState::new(proxy_config, upstream);

    let (server, handle) = proxy::AxumServer::start(&bind_address, port, state)
        .await
        .map_err(|e| format!("failed to start gateway: {}", e))?;

    tracing::info!("flexhire-gateway listening on http://{}", server.local_addr());

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("failed to listen for shutdown signal: {}", e))?;

    tracing::info!("shutdown requested, stopping server...");
    server.stop();
    let _ = handle.await;

    Ok(())
}

use std::fs;
use std::path::Path;

use crate::proxy::ProxyConfig;
use super::paths::get_data_dir;

const CONFIG_FILE: &str = "gateway_config.json";

/// Load gateway configuration from the data directory
pub fn load_gateway_config() -> Result<ProxyConfig, String> {
    let data_dir = get_data_dir()?;
    load_gateway_config_from(&data_dir.join(CONFIG_FILE))
}

/// Load gateway configuration, writing defaults when the file does not exist
pub fn load_gateway_config_from(config_path: &Path) -> Result<ProxyConfig, String> {
    if !config_path.exists() {
        let config = ProxyConfig::default();
        let _ = save_gateway_config_to(&config, config_path);
        return Ok(config);
    }

    let content = fs::read_to_string(config_path)
        .map_err(|e| format!("Failed to read config file: {}", e))?;

    serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse config file: {}", e))
}

fn save_gateway_config_to(config: &ProxyConfig, config_path: &Path) -> Result<(), String> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    fs::write(config_path, content)
        .map_err(|e| format!("Failed to save config: {}", e))
}

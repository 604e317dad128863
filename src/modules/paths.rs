use std::fs;
use std::path::{Path, PathBuf};

const DATA_DIR: &str = ".flexhire_gateway";
const LOG_DIR: &str = "logs";

/// Get data directory path, creating it when missing
pub fn get_data_dir() -> Result<PathBuf, String> {
    if let Ok(dir) = std::env::var("FLEXHIRE_GATEWAY_HOME") {
        let data_dir = PathBuf::from(dir);
        ensure_dir(&data_dir)?;
        return Ok(data_dir);
    }

    let home = dirs::home_dir().ok_or("Failed to get user home directory")?;
    let data_dir = home.join(DATA_DIR);
    ensure_dir(&data_dir)?;

    Ok(data_dir)
}

/// Get log directory path
pub fn get_log_dir() -> Result<PathBuf, String> {
    let log_dir = get_data_dir()?.join(LOG_DIR);
    ensure_dir(&log_dir)?;
    Ok(log_dir)
}

fn ensure_dir(dir: &Path) -> Result<(), String> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .map_err(|e| format!("Failed to create directory {}: {}", dir.display(), e))?;
    }
    Ok(())
}

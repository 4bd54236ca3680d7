//! Configuration loading and root folder resolution

use crate::{Error, Result};
use std::path::PathBuf;

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "wits.db";

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    config_file_key: Option<&str>,
) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(PathBuf::from(path));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return Ok(PathBuf::from(path));
    }

    // Priority 3: TOML config file
    if let Some(key) = config_file_key {
        if let Ok(config_path) = load_config_file() {
            if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
                if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                    if let Some(root_folder) = config.get(key).and_then(|v| v.as_str()) {
                        return Ok(PathBuf::from(root_folder));
                    }
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(get_default_root_folder())
}

/// Resolve the database path inside a root folder, creating the folder if needed
pub fn database_path(root_folder: &PathBuf) -> Result<PathBuf> {
    if !root_folder.exists() {
        std::fs::create_dir_all(root_folder)?;
    }
    Ok(root_folder.join(DATABASE_FILE))
}

/// Get default configuration file path for the platform
fn load_config_file() -> Result<PathBuf> {
    let config_dir = if cfg!(target_os = "linux") {
        // Try ~/.config/wits/config.toml first, then /etc/wits/config.toml
        let user_config = dirs::config_dir()
            .map(|d| d.join("wits").join("config.toml"));
        let system_config = PathBuf::from("/etc/wits/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("No config file found".to_string()));
    } else if cfg!(target_os = "macos") || cfg!(target_os = "windows") {
        dirs::config_dir()
            .map(|d| d.join("wits").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?
    } else {
        return Err(Error::Config("Unsupported platform".to_string()));
    };

    if config_dir.exists() {
        Ok(config_dir)
    } else {
        Err(Error::Config(format!("Config file not found: {:?}", config_dir)))
    }
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/wits (or /var/lib/wits for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("wits"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/wits"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/wits
        dirs::data_dir()
            .map(|d| d.join("wits"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/wits"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\wits
        dirs::data_local_dir()
            .map(|d| d.join("wits"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\wits"))
    } else {
        PathBuf::from("./wits_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn cli_argument_takes_priority() {
        std::env::set_var("WITS_TEST_ROOT", "/from/env");
        let resolved = resolve_root_folder(Some("/from/cli"), "WITS_TEST_ROOT", None).unwrap();
        assert_eq!(resolved, PathBuf::from("/from/cli"));
        std::env::remove_var("WITS_TEST_ROOT");
    }

    #[test]
    #[serial]
    fn env_variable_used_when_no_cli_arg() {
        std::env::set_var("WITS_TEST_ROOT", "/from/env");
        let resolved = resolve_root_folder(None, "WITS_TEST_ROOT", None).unwrap();
        assert_eq!(resolved, PathBuf::from("/from/env"));
        std::env::remove_var("WITS_TEST_ROOT");
    }

    #[test]
    #[serial]
    fn falls_back_to_platform_default() {
        std::env::remove_var("WITS_TEST_ROOT");
        let resolved = resolve_root_folder(None, "WITS_TEST_ROOT", None).unwrap();
        assert!(resolved.to_string_lossy().contains("wits"));
    }
}

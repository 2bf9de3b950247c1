use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const API_URL_VAR: &str = "SURVEY_API_URL";
pub const HOME_VAR: &str = "SURVEY_CLIENT_HOME";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub api_url: String,
    pub timeout_secs: u64,
    pub token_file: String,
    #[serde(default)]
    pub export_dir: Option<String>,
}

impl ClientConfig {
    pub fn default_for(root: &Path) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 30,
            token_file: root.join("token.json").to_string_lossy().to_string(),
            export_dir: None,
        }
    }

    /// Loads the config from the data root, then applies environment overrides.
    pub fn load() -> Result<Self, String> {
        let root = app_data_root()?;
        let mut config = load_config(&root)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        match env::var(API_URL_VAR) {
            Ok(url) if !url.trim().is_empty() => {
                info!("{API_URL_VAR} set, using {url}");
                self.api_url = url.trim().to_string();
            }
            Ok(_) => warn!("{API_URL_VAR} is empty, keeping {}", self.api_url),
            Err(_) => {}
        }
    }

    pub fn base_url(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

pub fn app_data_root() -> Result<PathBuf, String> {
    let root = match env::var(HOME_VAR) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => {
            let home = env::var("HOME")
                .or_else(|_| env::var("USERPROFILE"))
                .map_err(|_| "Unable to resolve home directory".to_string())?;
            PathBuf::from(home).join(".survey-client")
        }
    };
    fs::create_dir_all(&root).map_err(|e| e.to_string())?;
    Ok(root)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join("settings").join("client.json")
}

pub fn load_config(root: &Path) -> Result<ClientConfig, String> {
    let path = config_path(root);
    if !path.exists() {
        let defaults = ClientConfig::default_for(root);
        save_config(root, &defaults)?;
        return Ok(defaults);
    }
    let raw =
        fs::read_to_string(&path).map_err(|e| format!("Unable to read {}: {e}", path.display()))?;
    if raw.trim().is_empty() {
        warn!("{} is empty, rewriting defaults", path.display());
        let defaults = ClientConfig::default_for(root);
        save_config(root, &defaults)?;
        return Ok(defaults);
    }
    serde_json::from_str(&raw).map_err(|e| format!("Invalid client config JSON: {e}"))
}

pub fn save_config(root: &Path, config: &ClientConfig) -> Result<(), String> {
    let path = config_path(root);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    let payload = serde_json::to_string_pretty(config).map_err(|e| e.to_string())?;
    fs::write(&path, payload).map_err(|e| format!("Unable to write {}: {e}", path.display()))
}

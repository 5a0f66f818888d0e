use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub endpoint: String,
    pub listen: String,
    #[serde(default = "default_state_path")]
    pub state_path: String,
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,
    #[serde(default = "default_max_interval_secs")]
    pub max_interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("не удалось прочитать файл конфигурации {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("не удалось разобрать YAML в {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("ошибка валидации конфигурации: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Validation(
                "поле endpoint обязательно".to_string(),
            ));
        }
        if reqwest::Url::parse(&self.endpoint).is_err() {
            return Err(ConfigError::Validation(
                "поле endpoint должно быть корректным URL".to_string(),
            ));
        }
        if self.listen.trim().is_empty() {
            return Err(ConfigError::Validation(
                "поле listen обязательно".to_string(),
            ));
        }
        if SocketAddr::from_str(&self.listen).is_err() {
            return Err(ConfigError::Validation(
                "поле listen должно быть корректным адресом host:port".to_string(),
            ));
        }
        if self.state_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "поле state_path не должно быть пустым".to_string(),
            ));
        }
        if self.min_interval_secs < 1 {
            return Err(ConfigError::Validation(
                "min_interval_secs должно быть >= 1".to_string(),
            ));
        }
        if self.min_interval_secs > self.max_interval_secs {
            return Err(ConfigError::Validation(
                "min_interval_secs не должно превышать max_interval_secs".to_string(),
            ));
        }
        if self.request_timeout_secs < 1 {
            return Err(ConfigError::Validation(
                "request_timeout_secs должно быть >= 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn default_state_path() -> String {
    "./reportd_state.json".to_string()
}

const fn default_min_interval_secs() -> u64 {
    900
}

const fn default_max_interval_secs() -> u64 {
    3600
}

const fn default_request_timeout_secs() -> u64 {
    30
}

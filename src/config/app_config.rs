// ==========================================
// 任务规划控制台 - 应用配置文件
// ==========================================
// 位置: {config_dir}/mission-planner/config.json
// 覆写: MISSION_PLANNER_CONFIG / MISSION_PLANNER_BACKEND_URL /
//       MISSION_PLANNER_DB_PATH / MISSION_PLANNER_LOCALE
// ==========================================

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::wizard_settings::WizardSettings;
use crate::repository::http_backend::DEFAULT_REQUEST_TIMEOUT_MS;

pub const ENV_CONFIG_PATH: &str = "MISSION_PLANNER_CONFIG";
pub const ENV_BACKEND_URL: &str = "MISSION_PLANNER_BACKEND_URL";
pub const ENV_DB_PATH: &str = "MISSION_PLANNER_DB_PATH";
pub const ENV_LOCALE: &str = "MISSION_PLANNER_LOCALE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败 {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("配置文件解析失败 {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("配置项无效: {0}")]
    Invalid(String),
}

// ==========================================
// BackendConfig - 后端选择
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendConfig {
    /// 本地 SQLite（db_path 缺省时使用默认数据目录）
    Local {
        #[serde(default)]
        db_path: Option<String>,
    },
    /// 远程 REST 服务
    Http {
        base_url: String,
        #[serde(default = "default_request_timeout_ms")]
        request_timeout_ms: u64,
    },
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Local { db_path: None }
    }
}

// ==========================================
// AppConfig
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub locale: String,
    pub wizard: WizardSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            locale: "zh-CN".to_string(),
            wizard: WizardSettings::default(),
        }
    }
}

impl AppConfig {
    /// 默认配置文件路径
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mission-planner")
            .join("config.json")
    }

    /// 加载配置：默认路径文件（不存在则使用默认值）+ 环境变量覆写
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from_path(&Self::default_path())?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// 从指定路径加载；文件不存在时返回默认配置
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: AppConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        info!(path = %path.display(), "已加载配置文件");
        Ok(config)
    }

    /// 应用环境变量覆写
    ///
    /// # 参数
    /// - lookup: 变量读取函数（测试中可注入）
    ///
    /// # 规则
    /// - BACKEND_URL 非空 → 切换为 Http 后端（保留已配置的请求超时）
    /// - DB_PATH 非空且为本地后端 → 覆盖 db_path
    /// - LOCALE 非空 → 覆盖 locale
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(base_url) = non_empty(ENV_BACKEND_URL) {
            let request_timeout_ms = match &self.backend {
                BackendConfig::Http {
                    request_timeout_ms, ..
                } => *request_timeout_ms,
                BackendConfig::Local { .. } => DEFAULT_REQUEST_TIMEOUT_MS,
            };
            self.backend = BackendConfig::Http {
                base_url,
                request_timeout_ms,
            };
        }

        if let Some(path) = non_empty(ENV_DB_PATH) {
            if let BackendConfig::Local { db_path } = &mut self.backend {
                *db_path = Some(path);
            }
        }

        if let Some(locale) = non_empty(ENV_LOCALE) {
            self.locale = locale;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let BackendConfig::Http {
            base_url,
            request_timeout_ms,
        } = &self.backend
        {
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!("后端地址无效: {}", base_url)));
            }
            if *request_timeout_ms == 0 {
                return Err(ConfigError::Invalid(
                    "request_timeout_ms 必须大于 0".to_string(),
                ));
            }
        }
        self.wizard.validate().map_err(ConfigError::Invalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = AppConfig::load_from_path(Path::new("/nonexistent/mission-planner.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_http_backend_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "backend": {{"type": "http", "base_url": "http://planner:8000"}},
                "locale": "en",
                "wizard": {{"commit_timeout_ms": 1200}}
            }}"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(
            config.backend,
            BackendConfig::Http {
                base_url: "http://planner:8000".to_string(),
                request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            }
        );
        assert_eq!(config.locale, "en");
        assert_eq!(config.wizard.commit_timeout_ms, 1200);
        assert!(config.wizard.compensate_on_failure);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            AppConfig::load_from_path(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_overrides(lookup_from(&[
            (ENV_DB_PATH, "/tmp/planner.db"),
            (ENV_LOCALE, " en "),
        ]));
        assert_eq!(
            config.backend,
            BackendConfig::Local {
                db_path: Some("/tmp/planner.db".to_string())
            }
        );
        assert_eq!(config.locale, "en");

        config.apply_overrides(lookup_from(&[(ENV_BACKEND_URL, "https://planner.example")]));
        assert!(matches!(config.backend, BackendConfig::Http { .. }));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = AppConfig {
            backend: BackendConfig::Http {
                base_url: "planner:8000".to_string(),
                request_timeout_ms: 1000,
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}

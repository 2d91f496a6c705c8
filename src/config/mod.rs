// ==========================================
// 任务规划控制台 - 配置层
// ==========================================
// 职责: 应用配置文件 + 向导参数，支持多级覆写
// 存储: config.json / 环境变量 / config_kv 表
// ==========================================

pub mod app_config;
pub mod config_manager;
pub mod wizard_settings;

// 重导出核心配置类型
pub use app_config::{AppConfig, BackendConfig, ConfigError};
pub use config_manager::{config_keys, ConfigManager};
pub use wizard_settings::WizardSettings;

// ==========================================
// 任务规划控制台 - 应用状态
// ==========================================
// 职责: 按配置装配后端、向导参数与 API 实例
// ==========================================

use std::path::PathBuf;
use std::sync::Arc;

use crate::api::WizardApi;
use crate::config::{AppConfig, BackendConfig, ConfigManager, WizardSettings};
use crate::i18n::set_locale;
use crate::repository::{EntityCatalogClient, HttpBackend, JobDraftStore, LocalBackend};

/// 应用状态
///
/// 包含后端实例和向导 API，在命令行/界面进程中全局共享
pub struct AppState {
    /// 生效的应用配置
    pub config: AppConfig,

    /// 本地后端（仅 Local 模式）
    pub local_backend: Option<Arc<LocalBackend>>,

    /// 配置管理器（仅 Local 模式，读写 config_kv）
    pub config_manager: Option<Arc<ConfigManager>>,

    /// 生效的向导参数（配置文件 + config_kv 覆写）
    pub wizard_settings: WizardSettings,

    /// 作业配置向导 API
    pub wizard_api: Arc<WizardApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 1. 设置界面语言
    /// 2. 按 backend 段创建本地或远程后端
    /// 3. 本地模式下用 config_kv 覆写向导参数
    pub fn new(config: AppConfig) -> Result<Self, String> {
        set_locale(&config.locale);

        match &config.backend {
            BackendConfig::Local { db_path } => {
                let db_path = db_path.clone().unwrap_or_else(get_default_db_path);
                tracing::info!("初始化AppState（本地后端），数据库路径: {}", db_path);

                let backend = Arc::new(
                    LocalBackend::new(&db_path)
                        .map_err(|e| format!("无法打开本地后端: {}", e))?,
                );
                let config_manager = Arc::new(
                    ConfigManager::from_connection(backend.connection())
                        .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
                );
                let wizard_settings = config_manager
                    .load_wizard_settings(&config.wizard)
                    .map_err(|e| format!("无法读取向导参数: {}", e))?;

                let catalog: Arc<dyn EntityCatalogClient> = backend.clone();
                let store: Arc<dyn JobDraftStore> = backend.clone();
                let wizard_api = Arc::new(WizardApi::new(catalog, store, wizard_settings.clone()));

                tracing::info!("AppState初始化完成");
                Ok(Self {
                    config,
                    local_backend: Some(backend),
                    config_manager: Some(config_manager),
                    wizard_settings,
                    wizard_api,
                })
            }
            BackendConfig::Http {
                base_url,
                request_timeout_ms,
            } => {
                tracing::info!("初始化AppState（远程后端）: {}", base_url);

                let backend = Arc::new(
                    HttpBackend::new(
                        base_url,
                        std::time::Duration::from_millis(*request_timeout_ms),
                    )
                    .map_err(|e| format!("无法创建HTTP客户端: {}", e))?,
                );
                let wizard_settings = config.wizard.clone();

                let catalog: Arc<dyn EntityCatalogClient> = backend.clone();
                let store: Arc<dyn JobDraftStore> = backend;
                let wizard_api = Arc::new(WizardApi::new(catalog, store, wizard_settings.clone()));

                tracing::info!("AppState初始化完成");
                Ok(Self {
                    config,
                    local_backend: None,
                    config_manager: None,
                    wizard_settings,
                    wizard_api,
                })
            }
        }
    }
}

/// 获取默认数据库路径
///
/// MISSION_PLANNER_DB_PATH 非空时优先；否则使用用户数据目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(crate::config::app_config::ENV_DB_PATH) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./mission_planner.db");

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        let dir = data_dir.join("mission-planner-dev");
        #[cfg(not(debug_assertions))]
        let dir = data_dir.join("mission-planner");

        // best-effort: 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("mission_planner.db");
        }
    }

    path.to_string_lossy().to_string()
}

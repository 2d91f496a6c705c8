// ==========================================
// 任务规划控制台 - 核心库
// ==========================================
// 功能: 优化作业配置向导（六步：作业信息 → 实体选择 → 初始库存
//       → 需求/截止 → 周资源/产能 → 复核运行）
// 技术栈: Rust + tokio + SQLite / REST 后端
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 后端契约与实现
pub mod repository;

// 引擎层 - 向导流程
pub mod engine;

// 配置层 - 应用配置与向导参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 向导会话接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{EntityId, EntityKind, JobId, JobStatus, MissionId, WizardStep};

// 领域实体
pub use domain::{Catalog, CatalogEntity, Job, JobConfiguration, Mission, RunResult};

// 引擎
pub use engine::{JobWizard, StepCommitter, StepOutcome, WizardDraft, WizardError};

// API
pub use api::{ApiError, DraftEdit, WizardApi, WizardView};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "任务规划控制台";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

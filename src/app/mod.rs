// ==========================================
// 任务规划控制台 - 应用层
// ==========================================
// 职责: 按配置装配后端与 API，供命令行/界面进程使用
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};

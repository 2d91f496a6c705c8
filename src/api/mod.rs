// ==========================================
// 任务规划控制台 - API 层
// ==========================================
// 职责: 向界面/命令行提供向导会话接口，统一错误响应
// ==========================================

pub mod draft_edit;
pub mod error;
pub mod wizard_api;

// 重导出核心类型
pub use draft_edit::DraftEdit;
pub use error::{map_api_error, ApiError, ApiResult, ErrorResponse};
pub use wizard_api::{NextResponse, WizardApi, WizardView};

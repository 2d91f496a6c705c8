// ==========================================
// 任务规划控制台 - API层错误类型
// ==========================================
// 职责: 将引擎/仓储错误转换为面向界面的单条提示
// 约束: 每个错误只产生一条用户可读消息，附带稳定错误码
// ==========================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::error::WizardError;
use crate::i18n::{t, t_with_args};
use crate::repository::error::RepositoryError;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 向导本地错误
    // ==========================================
    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    StepNotReached(String),

    #[error("{message}")]
    InvalidStateTransition {
        from: String,
        to: String,
        message: String,
    },

    // ==========================================
    // 步骤提交错误
    // ==========================================
    #[error("{message}")]
    CommitFailed {
        step: u8,
        message: String,
        compensated: bool,
    },

    #[error("{message}")]
    Timeout { step: u8, message: String },

    #[error("{message}")]
    Cancelled { step: u8, message: String },

    // ==========================================
    // 会话错误
    // ==========================================
    #[error("{0}")]
    CommitInFlight(String),

    #[error("{0}")]
    SessionNotFound(String),

    // ==========================================
    // 加载/运行错误
    // ==========================================
    #[error("{0}")]
    CatalogLoad(String),

    #[error("{0}")]
    LoadFailed(String),

    #[error("{0}")]
    RunRejected(String),

    #[error("{0}")]
    RunFailed(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("资源冲突: {0}")]
    Conflict(String),

    #[error("后端错误: {0}")]
    BackendError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    pub fn commit_in_flight() -> Self {
        ApiError::CommitInFlight(t("wizard.error.commit_in_flight"))
    }

    pub fn session_not_found(id: impl ToString) -> Self {
        let id = id.to_string();
        ApiError::SessionNotFound(t_with_args(
            "wizard.error.session_not_found",
            &[("id", id.as_str())],
        ))
    }

    /// 稳定错误码（前端据此分支）
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::StepNotReached(_) => "STEP_NOT_REACHED",
            ApiError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            ApiError::CommitFailed { .. } => "COMMIT_FAILED",
            ApiError::Timeout { .. } => "COMMIT_TIMEOUT",
            ApiError::Cancelled { .. } => "COMMIT_CANCELLED",
            ApiError::CommitInFlight(_) => "COMMIT_IN_FLIGHT",
            ApiError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            ApiError::CatalogLoad(_) => "CATALOG_LOAD_FAILED",
            ApiError::LoadFailed(_) => "LOAD_FAILED",
            ApiError::RunRejected(_) => "RUN_REJECTED",
            ApiError::RunFailed(_) => "RUN_FAILED",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::BackendError(_) => "BACKEND_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "OTHER_ERROR",
        }
    }
}

// ==========================================
// 从 WizardError 转换
// ==========================================
impl From<WizardError> for ApiError {
    fn from(err: WizardError) -> Self {
        let message = err.user_message();
        match err {
            WizardError::Validation(_) => ApiError::ValidationError(message),
            WizardError::Draft(_) => ApiError::InvalidInput(message),
            WizardError::StepNotReached { .. } | WizardError::NotAtReview => {
                ApiError::StepNotReached(message)
            }
            WizardError::JobNotCreated => ApiError::InvalidInput(message),
            WizardError::InvalidStateTransition { from, to } => ApiError::InvalidStateTransition {
                from: from.to_string(),
                to: to.to_string(),
                message,
            },
            WizardError::Commit {
                step, compensated, ..
            } => ApiError::CommitFailed {
                step: step.number(),
                message,
                compensated,
            },
            WizardError::Timeout { step, .. } => ApiError::Timeout {
                step: step.number(),
                message,
            },
            WizardError::Cancelled { step, .. } => ApiError::Cancelled {
                step: step.number(),
                message,
            },
            WizardError::CatalogLoad(_) => ApiError::CatalogLoad(message),
            WizardError::Load(_) => ApiError::LoadFailed(message),
            WizardError::RunRejected(_) => ApiError::RunRejected(message),
            WizardError::Run(_) => ApiError::RunFailed(message),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})", entity, id))
            }
            RepositoryError::Conflict(msg) => ApiError::Conflict(msg),
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
            other => ApiError::BackendError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

// ==========================================
// 错误响应（返回给前端）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误代码
    pub code: String,

    /// 错误消息
    pub message: String,

    /// 详细信息（可选）
    pub details: Option<serde_json::Value>,
}

impl From<&ApiError> for ErrorResponse {
    fn from(err: &ApiError) -> Self {
        let details = match err {
            ApiError::CommitFailed {
                step, compensated, ..
            } => Some(serde_json::json!({ "step": step, "compensated": compensated })),
            ApiError::Timeout { step, .. } | ApiError::Cancelled { step, .. } => {
                Some(serde_json::json!({ "step": step }))
            }
            ApiError::InvalidStateTransition { from, to, .. } => {
                Some(serde_json::json!({ "from": from, "to": to }))
            }
            _ => None,
        };

        ErrorResponse {
            code: err.code().to_string(),
            message: err.to_string(),
            details,
        }
    }
}

/// 将 ApiError 转换为 JSON 字符串
pub fn map_api_error(err: ApiError) -> String {
    let response = ErrorResponse::from(&err);
    serde_json::to_string(&response).unwrap_or_else(|_| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{JobStatus, WizardStep};
    use crate::i18n::{set_locale, tests::LOCALE_TEST_LOCK};

    #[test]
    fn test_wizard_error_conversion() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");

        let api_err: ApiError = WizardError::Commit {
            step: WizardStep::EntitySelection,
            source: RepositoryError::Conflict("job locked".to_string()),
            compensated: true,
        }
        .into();
        match &api_err {
            ApiError::CommitFailed {
                step,
                message,
                compensated,
            } => {
                assert_eq!(*step, 2);
                assert!(*compensated);
                assert!(message.contains("job locked"));
            }
            other => panic!("Expected CommitFailed, got {:?}", other),
        }
        assert_eq!(api_err.code(), "COMMIT_FAILED");

        let api_err: ApiError = WizardError::InvalidStateTransition {
            from: JobStatus::Running,
            to: JobStatus::EntitiesConfig,
        }
        .into();
        assert_eq!(api_err.code(), "INVALID_STATE_TRANSITION");
        assert!(api_err.to_string().contains("running -> entities_config"));

        set_locale("zh-CN");
    }

    #[test]
    fn test_repository_error_conversion() {
        let api_err: ApiError = RepositoryError::not_found("Job", 42).into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("Job"));
                assert!(msg.contains("42"));
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }

        let api_err: ApiError = RepositoryError::Timeout("read".to_string()).into();
        assert_eq!(api_err.code(), "BACKEND_ERROR");
    }

    #[test]
    fn test_map_api_error_json() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");

        let json = map_api_error(ApiError::Timeout {
            step: 5,
            message: "timed out".to_string(),
        });
        let parsed: ErrorResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.code, "COMMIT_TIMEOUT");
        assert_eq!(parsed.message, "timed out");
        assert_eq!(parsed.details, Some(serde_json::json!({ "step": 5 })));

        let json = map_api_error(ApiError::session_not_found("abc"));
        let parsed: ErrorResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.code, "SESSION_NOT_FOUND");
        assert_eq!(parsed.message, "Wizard session not found: abc");

        set_locale("zh-CN");
    }
}

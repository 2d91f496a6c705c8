// ==========================================
// 任务规划控制台 - 向导引擎错误类型
// ==========================================
// 分类:
// - 目录加载失败: 阻止打开向导
// - 步骤提交失败: 单条提示，步骤不前进（含补偿结果）
// - 校验失败: 不发起任何调用
// - 运行失败: 提示，不改变状态
// ==========================================

use thiserror::Error;

use crate::domain::types::{JobStatus, WizardStep};
use crate::engine::draft::DraftError;
use crate::engine::validators::ValidationFailure;
use crate::i18n::{t, t_with_args};
use crate::repository::error::RepositoryError;

#[derive(Error, Debug)]
pub enum WizardError {
    // ===== 本地错误（无网络调用）=====
    #[error("步骤校验未通过: {0}")]
    Validation(#[from] ValidationFailure),

    #[error("草稿编辑无效: {0}")]
    Draft(#[from] DraftError),

    #[error("尚未到达第 {requested} 步（最远第 {furthest} 步）")]
    StepNotReached {
        requested: WizardStep,
        furthest: WizardStep,
    },

    #[error("尚未到达复核步骤")]
    NotAtReview,

    #[error("作业尚未创建")]
    JobNotCreated,

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: JobStatus, to: JobStatus },

    // ===== 步骤提交 =====
    #[error("第 {step} 步提交失败: {source}")]
    Commit {
        step: WizardStep,
        #[source]
        source: RepositoryError,
        compensated: bool,
    },

    #[error("第 {step} 步提交超时: {timeout_ms}ms")]
    Timeout {
        step: WizardStep,
        timeout_ms: u64,
        compensated: bool,
    },

    #[error("第 {step} 步提交已取消")]
    Cancelled { step: WizardStep, compensated: bool },

    // ===== 加载 =====
    #[error("目录加载失败: {0}")]
    CatalogLoad(#[source] RepositoryError),

    #[error("作业加载失败: {0}")]
    Load(#[source] RepositoryError),

    // ===== 运行 =====
    #[error("运行被拒绝: {0}")]
    RunRejected(String),

    #[error("运行请求失败: {0}")]
    Run(#[source] RepositoryError),
}

impl WizardError {
    /// 面向用户的单条本地化提示
    pub fn user_message(&self) -> String {
        match self {
            WizardError::Validation(failure) => failure.user_message(),
            WizardError::Draft(err) => err.user_message(),
            WizardError::StepNotReached { .. } => self.to_string(),
            WizardError::NotAtReview => t("wizard.error.not_at_review"),
            WizardError::JobNotCreated => t("wizard.error.job_not_created"),
            WizardError::InvalidStateTransition { from, to } => t_with_args(
                "wizard.error.invalid_transition",
                &[("from", from.as_str()), ("to", to.as_str())],
            ),
            WizardError::Commit {
                step,
                source,
                compensated,
            } => {
                let key = if *compensated {
                    "wizard.error.commit_compensated"
                } else {
                    "wizard.error.commit"
                };
                let step = step.to_string();
                let reason = source.to_string();
                t_with_args(key, &[("step", step.as_str()), ("reason", reason.as_str())])
            }
            WizardError::Timeout {
                step, timeout_ms, ..
            } => {
                let step = step.to_string();
                let ms = timeout_ms.to_string();
                t_with_args(
                    "wizard.error.timeout",
                    &[("step", step.as_str()), ("ms", ms.as_str())],
                )
            }
            WizardError::Cancelled { step, .. } => {
                let step = step.to_string();
                t_with_args("wizard.error.cancelled", &[("step", step.as_str())])
            }
            WizardError::CatalogLoad(source) => {
                let reason = source.to_string();
                t_with_args("wizard.error.catalog_load", &[("reason", reason.as_str())])
            }
            WizardError::Load(source) => {
                let reason = source.to_string();
                t_with_args("wizard.error.load", &[("reason", reason.as_str())])
            }
            WizardError::RunRejected(message) => {
                t_with_args("wizard.error.run_rejected", &[("reason", message.as_str())])
            }
            WizardError::Run(source) => {
                let reason = source.to_string();
                t_with_args("wizard.error.run_failed", &[("reason", reason.as_str())])
            }
        }
    }

    /// 失败发生在哪一步（非提交类错误返回 None）
    pub fn step(&self) -> Option<WizardStep> {
        match self {
            WizardError::Commit { step, .. }
            | WizardError::Timeout { step, .. }
            | WizardError::Cancelled { step, .. } => Some(*step),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, WizardError::Timeout { .. })
    }
}

/// Result 类型别名
pub type WizardResult<T> = Result<T, WizardError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::{set_locale, tests::LOCALE_TEST_LOCK};

    #[test]
    fn test_user_messages_localized() {
        let _guard = LOCALE_TEST_LOCK.lock().unwrap();
        set_locale("en");

        let err = WizardError::Commit {
            step: WizardStep::Inventories,
            source: RepositoryError::Conflict("stale".to_string()),
            compensated: true,
        };
        let msg = err.user_message();
        assert!(msg.starts_with("Failed to save step 3"));
        assert!(msg.contains("stale"));

        let err = WizardError::Timeout {
            step: WizardStep::Resources,
            timeout_ms: 250,
            compensated: false,
        };
        assert_eq!(
            err.user_message(),
            "Saving step 5 timed out after 250 ms, please retry"
        );

        assert_eq!(
            WizardError::Validation(ValidationFailure::JobNameRequired).user_message(),
            "Job name is required"
        );

        set_locale("zh-CN");
        assert_eq!(
            WizardError::Validation(ValidationFailure::NoEntitiesSelected).user_message(),
            "至少需要选择一个实体"
        );
    }

    #[test]
    fn test_step_accessor() {
        let err = WizardError::Cancelled {
            step: WizardStep::DemandsDeadlines,
            compensated: true,
        };
        assert_eq!(err.step(), Some(WizardStep::DemandsDeadlines));
        assert_eq!(WizardError::NotAtReview.step(), None);
    }
}

// ==========================================
// 任务规划控制台 - 引擎层
// ==========================================
// 职责: 向导草稿、步骤校验、状态转换、分步提交与补偿、运行触发
// 红线: 引擎不拼 SQL / URL，所有后端访问经由仓储 trait
// ==========================================

pub mod commit;
pub mod draft;
pub mod error;
pub mod run_trigger;
pub mod transition;
pub mod validators;
pub mod wizard;

// 重导出核心引擎
pub use commit::{plan_mutations, CommitCancel, StepCommitter, StepMutation};
pub use draft::{DraftError, JobDetailsDraft, WeekDefaults, WizardDraft};
pub use error::{WizardError, WizardResult};
pub use run_trigger::RunTrigger;
pub use transition::{allowed_next, is_allowed, plan_status_update, StatusUpdate};
pub use validators::{is_step_valid, validate_step, ValidationFailure};
pub use wizard::{load_catalog, JobWizard, StepOutcome};

// ==========================================
// 任务规划控制台 - 步骤校验器
// ==========================================
// 职责: 判定当前草稿能否提交某一步
// 红线: 纯函数，不发起任何后端调用
// ==========================================
// 规则:
// - 步骤1: 去除首尾空白后的作业名称非空
// - 步骤2: 五类实体中至少选择一个
// - 步骤3~6: 始终通过
// ==========================================

use thiserror::Error;

use crate::domain::types::WizardStep;
use crate::engine::draft::WizardDraft;
use crate::i18n::t;

/// 步骤校验失败原因
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("作业名称不能为空")]
    JobNameRequired,

    #[error("至少需要选择一个实体")]
    NoEntitiesSelected,
}

impl ValidationFailure {
    pub fn message_key(&self) -> &'static str {
        match self {
            ValidationFailure::JobNameRequired => "wizard.validation.job_name_required",
            ValidationFailure::NoEntitiesSelected => "wizard.validation.no_entities_selected",
        }
    }

    /// 本地化提示
    pub fn user_message(&self) -> String {
        t(self.message_key())
    }
}

/// 校验某一步是否可以提交
pub fn validate_step(step: WizardStep, draft: &WizardDraft) -> Result<(), ValidationFailure> {
    match step {
        WizardStep::JobDetails => {
            if draft.details().name.trim().is_empty() {
                return Err(ValidationFailure::JobNameRequired);
            }
            Ok(())
        }
        WizardStep::EntitySelection => {
            if draft.selection().is_empty() {
                return Err(ValidationFailure::NoEntitiesSelected);
            }
            Ok(())
        }
        WizardStep::Inventories
        | WizardStep::DemandsDeadlines
        | WizardStep::Resources
        | WizardStep::Review => Ok(()),
    }
}

pub fn is_step_valid(step: WizardStep, draft: &WizardDraft) -> bool {
    validate_step(step, draft).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WizardSettings;
    use crate::domain::catalog::{Catalog, CatalogEntity};
    use crate::domain::mission::Mission;
    use crate::domain::types::EntityKind;

    fn mission() -> Mission {
        Mission {
            id: 1,
            name: "Ares".to_string(),
            status: "planning".to_string(),
            duration_weeks: 4,
            crew_hours_per_week: 40.0,
            crew_count: 3,
        }
    }

    fn catalog() -> Catalog {
        Catalog {
            substitutes: vec![CatalogEntity {
                id: 5,
                kind: EntityKind::Substitute,
                name: "Foam".to_string(),
                category: String::new(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_step1_rejects_blank_names() {
        let draft = WizardDraft::new(&mission(), &WizardSettings::default());
        assert_eq!(
            validate_step(WizardStep::JobDetails, &draft),
            Err(ValidationFailure::JobNameRequired)
        );

        let blank = draft.with_name("   \t ");
        assert_eq!(
            validate_step(WizardStep::JobDetails, &blank),
            Err(ValidationFailure::JobNameRequired)
        );

        let named = draft.with_name("  Ares Recycling Run ");
        assert!(validate_step(WizardStep::JobDetails, &named).is_ok());
    }

    #[test]
    fn test_step2_requires_any_selection() {
        let draft = WizardDraft::new(&mission(), &WizardSettings::default());
        assert_eq!(
            validate_step(WizardStep::EntitySelection, &draft),
            Err(ValidationFailure::NoEntitiesSelected)
        );

        // 任意一类有选择即可
        let one = draft
            .with_entity(&catalog(), EntityKind::Substitute, 5, true)
            .unwrap();
        assert!(validate_step(WizardStep::EntitySelection, &one).is_ok());
    }

    #[test]
    fn test_later_steps_always_valid() {
        let draft = WizardDraft::new(&mission(), &WizardSettings::default());
        for step in [
            WizardStep::Inventories,
            WizardStep::DemandsDeadlines,
            WizardStep::Resources,
            WizardStep::Review,
        ] {
            assert!(is_step_valid(step, &draft), "step {} should pass", step);
        }
    }
}

// ==========================================
// 任务规划控制台 - 作业状态转换表
// ==========================================
// 职责: 显式定义 当前状态 → 允许的后继状态
// 红线: 向导提交不回退状态（重新提交已通过的步骤时保持最远状态）
// ==========================================
// 转换表:
// - 向导状态 S      → {S, S 的下一向导状态, cancelled}
// - ready           → {ready, pending, cancelled}
// - pending         → {running, failed, cancelled}
// - running         → {completed, failed, cancelled}
// - completed/failed/cancelled/unknown → 任一向导状态（重新打开编辑）
// ==========================================

use crate::domain::types::JobStatus;
use crate::engine::error::{WizardError, WizardResult};

/// 提交某一步时对作业状态的处理
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    /// 发出状态更新调用
    Advance(JobStatus),
    /// 保持当前状态，不发出调用
    Keep,
}

/// 允许的后继状态（对全部状态均有定义）
pub fn allowed_next(status: JobStatus) -> Vec<JobStatus> {
    match status {
        JobStatus::Ready => vec![JobStatus::Ready, JobStatus::Pending, JobStatus::Cancelled],
        JobStatus::Pending => vec![JobStatus::Running, JobStatus::Failed, JobStatus::Cancelled],
        JobStatus::Running => vec![
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ],
        JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled | JobStatus::Unknown => {
            JobStatus::WIZARD_SEQUENCE.to_vec()
        }
        wizard => {
            let mut next = vec![wizard];
            if let Some(rank) = wizard.wizard_rank() {
                if let Some(following) = JobStatus::WIZARD_SEQUENCE.get(rank + 1) {
                    next.push(*following);
                }
            }
            next.push(JobStatus::Cancelled);
            next
        }
    }
}

pub fn is_allowed(from: JobStatus, to: JobStatus) -> bool {
    allowed_next(from).contains(&to)
}

/// 决定提交某一步时是否推进作业状态
///
/// # 参数
/// - current: 作业当前（最近一次持久化的）状态
/// - target: 该步骤对应的向导状态
///
/// # 返回
/// - Advance(target): target 不早于 current 且转换合法
/// - Keep: target 早于 current（重新提交已通过的步骤，状态不回退）
/// - Err(InvalidStateTransition): 求解器已接手，或越级推进
pub fn plan_status_update(current: JobStatus, target: JobStatus) -> WizardResult<StatusUpdate> {
    let invalid = || WizardError::InvalidStateTransition {
        from: current,
        to: target,
    };

    let target_rank = target.wizard_rank().ok_or_else(invalid)?;

    if let Some(current_rank) = current.wizard_rank() {
        if target_rank < current_rank {
            return Ok(StatusUpdate::Keep);
        }
    }

    if is_allowed(current, target) {
        Ok(StatusUpdate::Advance(target))
    } else {
        Err(invalid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_total() {
        for status in JobStatus::ALL {
            assert!(
                !allowed_next(status).is_empty(),
                "{} has no successor",
                status
            );
        }
    }

    #[test]
    fn test_wizard_sequence_advances_one_step() {
        for pair in JobStatus::WIZARD_SEQUENCE.windows(2) {
            assert!(is_allowed(pair[0], pair[1]));
            assert_eq!(
                plan_status_update(pair[0], pair[1]).unwrap(),
                StatusUpdate::Advance(pair[1])
            );
        }
        // 不允许越级
        assert!(plan_status_update(JobStatus::Draft, JobStatus::InventoryConfig).is_err());
    }

    #[test]
    fn test_recommit_same_step_reissues_status() {
        assert_eq!(
            plan_status_update(JobStatus::DemandsConfig, JobStatus::DemandsConfig).unwrap(),
            StatusUpdate::Advance(JobStatus::DemandsConfig)
        );
    }

    #[test]
    fn test_earlier_step_keeps_status() {
        for (i, current) in JobStatus::WIZARD_SEQUENCE.iter().enumerate() {
            for earlier in &JobStatus::WIZARD_SEQUENCE[..i] {
                assert_eq!(
                    plan_status_update(*current, *earlier).unwrap(),
                    StatusUpdate::Keep
                );
            }
        }
    }

    #[test]
    fn test_executing_job_rejects_wizard_commit() {
        for status in [JobStatus::Pending, JobStatus::Running] {
            let err = plan_status_update(status, JobStatus::Draft).unwrap_err();
            assert!(matches!(err, WizardError::InvalidStateTransition { .. }));
        }
    }

    #[test]
    fn test_terminal_job_reopens() {
        for status in [
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
            JobStatus::Unknown,
        ] {
            assert_eq!(
                plan_status_update(status, JobStatus::Draft).unwrap(),
                StatusUpdate::Advance(JobStatus::Draft)
            );
        }
    }

    #[test]
    fn test_non_wizard_target_rejected() {
        assert!(plan_status_update(JobStatus::Ready, JobStatus::Pending).is_err());
    }

    #[test]
    fn test_execution_statuses_progress() {
        assert!(is_allowed(JobStatus::Ready, JobStatus::Pending));
        assert!(is_allowed(JobStatus::Pending, JobStatus::Running));
        assert!(is_allowed(JobStatus::Running, JobStatus::Completed));
        assert!(!is_allowed(JobStatus::Completed, JobStatus::Running));
        assert!(!is_allowed(JobStatus::Pending, JobStatus::Draft));
    }
}

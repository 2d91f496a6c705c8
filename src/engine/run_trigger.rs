// ==========================================
// 任务规划控制台 - 运行触发器
// ==========================================
// 职责: 将处于 ready 的作业交给求解器
// 红线: 只触发不轮询；被拒绝/失败时不改变任何状态
// ==========================================

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::domain::job::RunResult;
use crate::domain::types::{JobId, WizardStep};
use crate::engine::error::{WizardError, WizardResult};
use crate::repository::job_store::JobDraftStore;

pub struct RunTrigger {
    store: Arc<dyn JobDraftStore>,
    timeout: Duration,
}

impl RunTrigger {
    pub fn new(store: Arc<dyn JobDraftStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// 触发运行
    ///
    /// # 返回
    /// - Ok(RunResult): 后端接受（success = true）
    /// - Err(RunRejected): 后端返回 success = false
    /// - Err(Run): 传输/后端错误
    /// - Err(Timeout): 超过 run_timeout
    #[instrument(skip(self))]
    pub async fn run(&self, job_id: JobId) -> WizardResult<RunResult> {
        let outcome = tokio::time::timeout(self.timeout, self.store.run_job(job_id)).await;

        match outcome {
            Err(_) => {
                warn!(job_id, "运行请求超时");
                Err(WizardError::Timeout {
                    step: WizardStep::Review,
                    timeout_ms: self.timeout.as_millis() as u64,
                    compensated: false,
                })
            }
            Ok(Err(e)) => {
                warn!(job_id, error = %e, "运行请求失败");
                Err(WizardError::Run(e))
            }
            Ok(Ok(result)) if !result.success => {
                warn!(job_id, message = %result.message, "运行请求被拒绝");
                Err(WizardError::RunRejected(result.message))
            }
            Ok(Ok(result)) => {
                info!(job_id, "作业已提交求解器");
                Ok(result)
            }
        }
    }
}

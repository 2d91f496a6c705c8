// ==========================================
// 任务规划控制台 - 向导运行参数
// ==========================================
// 来源: 配置文件 wizard 段 + config_kv 覆写（本地后端）
// ==========================================

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::job::ObjectiveWeights;

pub const DEFAULT_COMMIT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_RUN_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_ENERGY_PER_WEEK: f64 = 100.0;
pub const FALLBACK_CREW_HOURS_PER_WEEK: f64 = 40.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardSettings {
    /// 单步提交批次超时（含状态推进）
    pub commit_timeout_ms: u64,
    /// 运行触发超时
    pub run_timeout_ms: u64,
    /// 周资源预置能源值
    pub default_energy_per_week: f64,
    /// 任务缺失时的周乘员工时
    pub fallback_crew_hours_per_week: f64,
    /// 新建作业的默认目标权重
    pub default_objective_weights: ObjectiveWeights,
    /// 批次失败时是否执行补偿
    pub compensate_on_failure: bool,
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self {
            commit_timeout_ms: DEFAULT_COMMIT_TIMEOUT_MS,
            run_timeout_ms: DEFAULT_RUN_TIMEOUT_MS,
            default_energy_per_week: DEFAULT_ENERGY_PER_WEEK,
            fallback_crew_hours_per_week: FALLBACK_CREW_HOURS_PER_WEEK,
            default_objective_weights: ObjectiveWeights::default(),
            compensate_on_failure: true,
        }
    }
}

impl WizardSettings {
    pub fn commit_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_timeout_ms)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_millis(self.run_timeout_ms)
    }

    /// 校验参数取值，返回第一个问题描述
    pub fn validate(&self) -> Result<(), String> {
        if self.commit_timeout_ms == 0 {
            return Err("commit_timeout_ms 必须大于 0".to_string());
        }
        if self.run_timeout_ms == 0 {
            return Err("run_timeout_ms 必须大于 0".to_string());
        }
        for (field, value) in [
            ("default_energy_per_week", self.default_energy_per_week),
            ("fallback_crew_hours_per_week", self.fallback_crew_hours_per_week),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} 必须为非负数: {}", field, value));
            }
        }
        if let Some(name) = self.default_objective_weights.first_invalid() {
            return Err(format!("默认目标权重 {} 必须为非负数", name));
        }
        Ok(())
    }
}

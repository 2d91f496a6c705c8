// ==========================================
// 任务规划控制台 - 任务领域模型
// ==========================================
// 职责: 任务元数据（作业默认值的来源）
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::types::MissionId;

// ==========================================
// Mission - 任务
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,             // 任务ID
    pub name: String,              // 任务名称
    #[serde(default)]
    pub status: String,            // 任务状态（后端自由文本）
    pub duration_weeks: u32,       // 任务周期（周）
    pub crew_hours_per_week: f64,  // 每周乘员工时
    #[serde(default)]
    pub crew_count: u32,           // 乘员人数
}

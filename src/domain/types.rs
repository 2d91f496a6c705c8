// ==========================================
// 任务规划控制台 - 领域类型定义
// ==========================================
// 依据: 作业配置向导 - 状态序列与步骤对应
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 后端资源标识（任务/作业/目录实体统一使用整数 ID）
pub type EntityId = i64;
pub type JobId = i64;
pub type MissionId = i64;

// ==========================================
// 作业状态 (Job Status)
// ==========================================
// 向导状态按提交顺序排列: draft → ... → ready
// 执行状态仅由运行触发器/外部求解器推进
// 序列化格式: snake_case (与后端一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Draft,           // 步骤1: 作业信息
    EntitiesConfig,  // 步骤2: 实体选择
    InventoryConfig, // 步骤3: 初始库存
    DemandsConfig,   // 步骤4: 需求/截止
    ResourcesConfig, // 步骤5: 周资源/产能
    Ready,           // 步骤6: 复核完成，待运行
    Pending,         // 已提交求解器
    Running,         // 求解中
    Completed,       // 求解完成
    Failed,          // 求解失败
    Cancelled,       // 已取消
    #[serde(other)]
    Unknown,         // 后端返回的未知状态
}

impl JobStatus {
    /// 向导状态（按提交顺序）
    pub const WIZARD_SEQUENCE: [JobStatus; 6] = [
        JobStatus::Draft,
        JobStatus::EntitiesConfig,
        JobStatus::InventoryConfig,
        JobStatus::DemandsConfig,
        JobStatus::ResourcesConfig,
        JobStatus::Ready,
    ];

    /// 全部状态（用于转换表完备性检查）
    pub const ALL: [JobStatus; 12] = [
        JobStatus::Draft,
        JobStatus::EntitiesConfig,
        JobStatus::InventoryConfig,
        JobStatus::DemandsConfig,
        JobStatus::ResourcesConfig,
        JobStatus::Ready,
        JobStatus::Pending,
        JobStatus::Running,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Cancelled,
        JobStatus::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Draft => "draft",
            JobStatus::EntitiesConfig => "entities_config",
            JobStatus::InventoryConfig => "inventory_config",
            JobStatus::DemandsConfig => "demands_config",
            JobStatus::ResourcesConfig => "resources_config",
            JobStatus::Ready => "ready",
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Unknown => "unknown",
        }
    }

    /// 从字符串解析状态（未知值返回 Unknown）
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "draft" => JobStatus::Draft,
            "entities_config" => JobStatus::EntitiesConfig,
            "inventory_config" => JobStatus::InventoryConfig,
            "demands_config" => JobStatus::DemandsConfig,
            "resources_config" => JobStatus::ResourcesConfig,
            "ready" => JobStatus::Ready,
            "pending" => JobStatus::Pending,
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            "cancelled" => JobStatus::Cancelled,
            _ => JobStatus::Unknown,
        }
    }

    /// 向导序列中的位置（0..=5），非向导状态返回 None
    pub fn wizard_rank(&self) -> Option<usize> {
        Self::WIZARD_SEQUENCE.iter().position(|s| s == self)
    }

    /// 该状态对应的向导步骤
    pub fn wizard_step(&self) -> Option<WizardStep> {
        self.wizard_rank()
            .and_then(|rank| WizardStep::from_number(rank as u8 + 1))
    }

    /// 求解器已接手（不可在向导中编辑）
    pub fn is_executing(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }

    /// 终态（求解结束/失败/取消）
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 向导步骤 (Wizard Step)
// ==========================================
// 步骤编号 1..=6，与向导状态一一对应
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    JobDetails,       // 1
    EntitySelection,  // 2
    Inventories,      // 3
    DemandsDeadlines, // 4
    Resources,        // 5
    Review,           // 6
}

impl WizardStep {
    pub const ALL: [WizardStep; 6] = [
        WizardStep::JobDetails,
        WizardStep::EntitySelection,
        WizardStep::Inventories,
        WizardStep::DemandsDeadlines,
        WizardStep::Resources,
        WizardStep::Review,
    ];

    pub fn number(&self) -> u8 {
        match self {
            WizardStep::JobDetails => 1,
            WizardStep::EntitySelection => 2,
            WizardStep::Inventories => 3,
            WizardStep::DemandsDeadlines => 4,
            WizardStep::Resources => 5,
            WizardStep::Review => 6,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(WizardStep::JobDetails),
            2 => Some(WizardStep::EntitySelection),
            3 => Some(WizardStep::Inventories),
            4 => Some(WizardStep::DemandsDeadlines),
            5 => Some(WizardStep::Resources),
            6 => Some(WizardStep::Review),
            _ => None,
        }
    }

    pub fn next(&self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    pub fn prev(&self) -> Option<Self> {
        Self::from_number(self.number().saturating_sub(1))
    }

    /// 提交该步骤后作业应处于的状态
    pub fn target_status(&self) -> JobStatus {
        JobStatus::WIZARD_SEQUENCE[(self.number() - 1) as usize]
    }

    /// 由作业状态推导当前步骤（固定查表，未知/执行/终态默认步骤1）
    pub fn for_status(status: JobStatus) -> Self {
        status.wizard_step().unwrap_or(WizardStep::JobDetails)
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

// ==========================================
// 实体种类 (Entity Kind)
// ==========================================
// 作业可引用的五类全局目录实体
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Material,
    Method,
    Output,
    Item,
    Substitute,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Material,
        EntityKind::Method,
        EntityKind::Output,
        EntityKind::Item,
        EntityKind::Substitute,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Material => "material",
            EntityKind::Method => "method",
            EntityKind::Output => "output",
            EntityKind::Item => "item",
            EntityKind::Substitute => "substitute",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "material" => Some(EntityKind::Material),
            "method" => Some(EntityKind::Method),
            "output" => Some(EntityKind::Output),
            "item" => Some(EntityKind::Item),
            "substitute" => Some(EntityKind::Substitute),
            _ => None,
        }
    }

    /// 库存计量单位（方法不持有库存）
    pub fn inventory_unit(&self) -> Option<InventoryUnit> {
        match self {
            EntityKind::Material | EntityKind::Output => Some(InventoryUnit::Kilograms),
            EntityKind::Item | EntityKind::Substitute => Some(InventoryUnit::Units),
            EntityKind::Method => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 库存计量单位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryUnit {
    Kilograms, // 质量类实体
    Units,     // 离散类实体
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_step_lookup() {
        assert_eq!(WizardStep::for_status(JobStatus::Draft), WizardStep::JobDetails);
        assert_eq!(
            WizardStep::for_status(JobStatus::DemandsConfig),
            WizardStep::DemandsDeadlines
        );
        assert_eq!(WizardStep::for_status(JobStatus::Ready), WizardStep::Review);
        // 执行/终态/未知状态默认回到步骤1
        assert_eq!(WizardStep::for_status(JobStatus::Running), WizardStep::JobDetails);
        assert_eq!(WizardStep::for_status(JobStatus::Completed), WizardStep::JobDetails);
        assert_eq!(WizardStep::for_status(JobStatus::Unknown), WizardStep::JobDetails);
    }

    #[test]
    fn test_step_target_status_round_trips_through_lookup() {
        for step in WizardStep::ALL {
            assert_eq!(WizardStep::for_status(step.target_status()), step);
        }
        assert_eq!(WizardStep::Review.next(), None);
        assert_eq!(WizardStep::JobDetails.prev(), None);
    }

    #[test]
    fn test_unknown_status_deserializes() {
        let status: JobStatus = serde_json::from_str("\"archived_v2\"").unwrap();
        assert_eq!(status, JobStatus::Unknown);

        let status: JobStatus = serde_json::from_str("\"demands_config\"").unwrap();
        assert_eq!(status, JobStatus::DemandsConfig);
        assert_eq!(JobStatus::parse("RESOURCES_CONFIG"), JobStatus::ResourcesConfig);
    }

    #[test]
    fn test_inventory_units() {
        assert_eq!(EntityKind::Material.inventory_unit(), Some(InventoryUnit::Kilograms));
        assert_eq!(EntityKind::Item.inventory_unit(), Some(InventoryUnit::Units));
        assert_eq!(EntityKind::Method.inventory_unit(), None);
    }
}

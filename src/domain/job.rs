// ==========================================
// 任务规划控制台 - 优化作业领域模型
// ==========================================
// 职责: 作业、作业配置集合、运行结果
// 红线: 不含数据访问逻辑，不含向导流程逻辑
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::types::{EntityId, EntityKind, JobId, JobStatus, MissionId};

// ==========================================
// ObjectiveWeights - 目标权重
// ==========================================
// 全部为非负实数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    pub mass: f64,
    pub value: f64,
    pub crew: f64,
    pub energy: f64,
    pub risk: f64,
    pub make: f64,
    pub carry: f64,
    pub shortage: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            mass: 1.0,
            value: 1.0,
            crew: 1.0,
            energy: 1.0,
            risk: 1.0,
            make: 1.0,
            carry: 1.0,
            shortage: 1.0,
        }
    }
}

impl ObjectiveWeights {
    /// 按名称列出所有权重（用于校验与日志）
    pub fn named(&self) -> [(&'static str, f64); 8] {
        [
            ("mass", self.mass),
            ("value", self.value),
            ("crew", self.crew),
            ("energy", self.energy),
            ("risk", self.risk),
            ("make", self.make),
            ("carry", self.carry),
            ("shortage", self.shortage),
        ]
    }

    /// 返回第一个非法（负数/非有限）权重的名称
    pub fn first_invalid(&self) -> Option<&'static str> {
        self.named()
            .into_iter()
            .find(|(_, v)| !v.is_finite() || *v < 0.0)
            .map(|(name, _)| name)
    }
}

// ==========================================
// JobParameters - 自由参数
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobParameters {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ==========================================
// Job - 优化作业
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub mission_id: MissionId,
    pub status: JobStatus,
    pub total_weeks: u32,
    pub weights: ObjectiveWeights,
    pub parameters: JobParameters,

    // 求解后填充
    #[serde(default)]
    pub result_summary: Option<serde_json::Value>,
    #[serde(default)]
    pub result_bundle: Option<serde_json::Value>,
    #[serde(default)]
    pub solver_status: Option<String>,

    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// 创建作业请求（步骤1首次提交）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub mission_id: MissionId,
    pub total_weeks: u32,
    pub weights: ObjectiveWeights,
    pub parameters: JobParameters,
}

/// 作业基本信息更新（步骤1重新提交）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetailsUpdate {
    pub total_weeks: u32,
    pub weights: ObjectiveWeights,
    pub parameters: JobParameters,
}

// ==========================================
// EntitySelection - 启用实体集合
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySelection {
    #[serde(default)]
    pub materials: BTreeSet<EntityId>,
    #[serde(default)]
    pub methods: BTreeSet<EntityId>,
    #[serde(default)]
    pub outputs: BTreeSet<EntityId>,
    #[serde(default)]
    pub items: BTreeSet<EntityId>,
    #[serde(default)]
    pub substitutes: BTreeSet<EntityId>,
}

impl EntitySelection {
    pub fn get(&self, kind: EntityKind) -> &BTreeSet<EntityId> {
        match kind {
            EntityKind::Material => &self.materials,
            EntityKind::Method => &self.methods,
            EntityKind::Output => &self.outputs,
            EntityKind::Item => &self.items,
            EntityKind::Substitute => &self.substitutes,
        }
    }

    pub fn get_mut(&mut self, kind: EntityKind) -> &mut BTreeSet<EntityId> {
        match kind {
            EntityKind::Material => &mut self.materials,
            EntityKind::Method => &mut self.methods,
            EntityKind::Output => &mut self.outputs,
            EntityKind::Item => &mut self.items,
            EntityKind::Substitute => &mut self.substitutes,
        }
    }

    pub fn contains(&self, kind: EntityKind, id: EntityId) -> bool {
        self.get(kind).contains(&id)
    }

    /// 五类实体合计选择数
    pub fn total(&self) -> usize {
        EntityKind::ALL.iter().map(|k| self.get(*k).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

// ==========================================
// 配置集合条目
// ==========================================

/// 初始库存（缺省即为 0）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InventoryLevel {
    pub kind: EntityKind,
    pub entity_id: EntityId,
    pub quantity: f64,
}

/// 物品需求（到某周希望消耗的数量）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandEntry {
    /// 后端分配的条目ID（尚未持久化时为 None）
    #[serde(default)]
    pub id: Option<i64>,
    pub item_id: EntityId,
    pub week: u32,
    pub amount: f64,
}

/// 截止要求（到某周必须满足的数量）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeadlineEntry {
    #[serde(default)]
    pub id: Option<i64>,
    pub item_id: EntityId,
    pub week: u32,
    pub amount: f64,
}

/// 周资源配额
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeekResource {
    pub week: u32,
    pub crew_hours: f64,
    pub energy: f64,
}

/// 方法周产能
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MethodCapacity {
    pub method_id: EntityId,
    pub week: u32,
    pub max_capacity_kg: f64,
    pub available: bool,
}

// ==========================================
// JobConfiguration - 作业完整配置
// ==========================================
// 后端一次性返回：作业 + 五类配置集合 + 派生的已选ID列表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfiguration {
    pub job: Job,
    #[serde(default)]
    pub enabled: EntitySelection,
    #[serde(default)]
    pub inventories: Vec<InventoryLevel>,
    #[serde(default)]
    pub demands: Vec<DemandEntry>,
    #[serde(default)]
    pub deadlines: Vec<DeadlineEntry>,
    #[serde(default)]
    pub week_resources: Vec<WeekResource>,
    #[serde(default)]
    pub method_capacities: Vec<MethodCapacity>,
}

impl JobConfiguration {
    /// 查询某实体的已持久化库存（缺省为 0）
    pub fn inventory_of(&self, kind: EntityKind, entity_id: EntityId) -> f64 {
        self.inventories
            .iter()
            .find(|l| l.kind == kind && l.entity_id == entity_id)
            .map(|l| l.quantity)
            .unwrap_or(0.0)
    }

    pub fn week_resource(&self, week: u32) -> Option<&WeekResource> {
        self.week_resources.iter().find(|r| r.week == week)
    }

    pub fn method_capacity(&self, method_id: EntityId, week: u32) -> Option<&MethodCapacity> {
        self.method_capacities
            .iter()
            .find(|c| c.method_id == method_id && c.week == week)
    }
}

// ==========================================
// RunResult - 运行触发结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_selection_total() {
        let mut selection = EntitySelection::default();
        assert!(selection.is_empty());

        selection.get_mut(EntityKind::Material).insert(1);
        selection.get_mut(EntityKind::Material).insert(2);
        selection.get_mut(EntityKind::Method).insert(7);
        // 重复启用不改变集合
        selection.get_mut(EntityKind::Method).insert(7);

        assert_eq!(selection.total(), 3);
        assert!(selection.contains(EntityKind::Method, 7));
        assert!(!selection.contains(EntityKind::Item, 7));
    }

    #[test]
    fn test_objective_weights_validation() {
        let weights = ObjectiveWeights::default();
        assert_eq!(weights.first_invalid(), None);

        let weights = ObjectiveWeights {
            carry: -0.5,
            ..ObjectiveWeights::default()
        };
        assert_eq!(weights.first_invalid(), Some("carry"));

        let weights = ObjectiveWeights {
            risk: f64::NAN,
            ..ObjectiveWeights::default()
        };
        assert_eq!(weights.first_invalid(), Some("risk"));
    }

    #[test]
    fn test_configuration_deserializes_with_missing_collections() {
        let raw = serde_json::json!({
            "job": {
                "id": 3,
                "mission_id": 1,
                "status": "inventory_config",
                "total_weeks": 4,
                "weights": ObjectiveWeights::default(),
                "parameters": { "name": "Ares" },
                "created_at": "2026-01-20T08:00:00Z"
            },
            "enabled": { "materials": [2, 1] }
        });

        let config: JobConfiguration = serde_json::from_value(raw).unwrap();
        assert_eq!(config.job.status, JobStatus::InventoryConfig);
        assert_eq!(config.enabled.total(), 2);
        assert!(config.week_resources.is_empty());
        assert_eq!(config.inventory_of(EntityKind::Material, 1), 0.0);
    }
}

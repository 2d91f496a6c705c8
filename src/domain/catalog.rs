// ==========================================
// 任务规划控制台 - 全局目录领域模型
// ==========================================
// 职责: 材料/方法/产出/物品/替代品 目录条目
// 红线: 目录只读，向导不修改目录
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::mission::Mission;
use crate::domain::types::{EntityId, EntityKind, MissionId};

// ==========================================
// CatalogEntity - 目录实体
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    #[serde(default)]
    pub category: String,
}

// ==========================================
// Catalog - 向导打开时加载的目录快照
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub materials: Vec<CatalogEntity>,
    pub methods: Vec<CatalogEntity>,
    pub outputs: Vec<CatalogEntity>,
    pub items: Vec<CatalogEntity>,
    pub substitutes: Vec<CatalogEntity>,
    pub missions: Vec<Mission>,
}

impl Catalog {
    /// 按种类获取目录条目
    pub fn entities(&self, kind: EntityKind) -> &[CatalogEntity] {
        match kind {
            EntityKind::Material => &self.materials,
            EntityKind::Method => &self.methods,
            EntityKind::Output => &self.outputs,
            EntityKind::Item => &self.items,
            EntityKind::Substitute => &self.substitutes,
        }
    }

    pub fn contains(&self, kind: EntityKind, id: EntityId) -> bool {
        self.entities(kind).iter().any(|e| e.id == id)
    }

    pub fn find_mission(&self, mission_id: MissionId) -> Option<&Mission> {
        self.missions.iter().find(|m| m.id == mission_id)
    }
}

// ==========================================
// 任务规划控制台 - 草稿编辑命令
// ==========================================
// 职责: 界面发来的单个编辑动作（可序列化），映射到 WizardDraft 的编辑方法
// ==========================================

use serde::{Deserialize, Serialize};

use crate::domain::catalog::Catalog;
use crate::domain::job::{MethodCapacity, ObjectiveWeights};
use crate::domain::types::{EntityId, EntityKind};
use crate::engine::draft::{DraftError, WizardDraft};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DraftEdit {
    // ===== 步骤1 =====
    SetName {
        name: String,
    },
    SetDescription {
        description: Option<String>,
    },
    SetTotalWeeks {
        total_weeks: u32,
    },
    SetWeights {
        weights: ObjectiveWeights,
    },

    // ===== 步骤2 =====
    SetEntity {
        kind: EntityKind,
        entity_id: EntityId,
        selected: bool,
    },
    SetSelection {
        kind: EntityKind,
        entity_ids: Vec<EntityId>,
    },

    // ===== 步骤3 =====
    SetInventory {
        kind: EntityKind,
        entity_id: EntityId,
        quantity: f64,
    },

    // ===== 步骤4 =====
    AddDemand {
        item_id: EntityId,
        week: u32,
        amount: f64,
    },
    RemoveDemand {
        index: usize,
    },
    AddDeadline {
        item_id: EntityId,
        week: u32,
        amount: f64,
    },
    RemoveDeadline {
        index: usize,
    },

    // ===== 步骤5 =====
    SetWeekResource {
        week: u32,
        crew_hours: f64,
        energy: f64,
    },
    SetMethodCapacity {
        capacity: MethodCapacity,
    },
    RemoveMethodCapacity {
        method_id: EntityId,
        week: u32,
    },
}

impl DraftEdit {
    pub fn apply(&self, draft: &WizardDraft, catalog: &Catalog) -> Result<WizardDraft, DraftError> {
        match self {
            DraftEdit::SetName { name } => Ok(draft.with_name(name)),
            DraftEdit::SetDescription { description } => {
                Ok(draft.with_description(description.clone()))
            }
            DraftEdit::SetTotalWeeks { total_weeks } => draft.with_total_weeks(*total_weeks),
            DraftEdit::SetWeights { weights } => draft.with_weights(*weights),
            DraftEdit::SetEntity {
                kind,
                entity_id,
                selected,
            } => draft.with_entity(catalog, *kind, *entity_id, *selected),
            DraftEdit::SetSelection { kind, entity_ids } => {
                draft.with_selection(catalog, *kind, entity_ids)
            }
            DraftEdit::SetInventory {
                kind,
                entity_id,
                quantity,
            } => draft.with_inventory(catalog, *kind, *entity_id, *quantity),
            DraftEdit::AddDemand {
                item_id,
                week,
                amount,
            } => draft.add_demand(catalog, *item_id, *week, *amount),
            DraftEdit::RemoveDemand { index } => draft.remove_demand(*index),
            DraftEdit::AddDeadline {
                item_id,
                week,
                amount,
            } => draft.add_deadline(catalog, *item_id, *week, *amount),
            DraftEdit::RemoveDeadline { index } => draft.remove_deadline(*index),
            DraftEdit::SetWeekResource {
                week,
                crew_hours,
                energy,
            } => draft.with_week_resource(*week, *crew_hours, *energy),
            DraftEdit::SetMethodCapacity { capacity } => {
                draft.with_method_capacity(catalog, *capacity)
            }
            DraftEdit::RemoveMethodCapacity { method_id, week } => {
                Ok(draft.without_method_capacity(*method_id, *week))
            }
        }
    }
}

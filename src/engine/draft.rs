// ==========================================
// 任务规划控制台 - 向导草稿
// ==========================================
// 职责: 一次编辑会话内作业配置的内存镜像
// 红线: 值语义，每次编辑返回新草稿；只有提交成功后才整体替换
// ==========================================
// 基线 (baseline): 最近一次已持久化的作业配置，
// 提交时与草稿比较，只发出必要的修改调用
// ==========================================

use serde::Serialize;
use thiserror::Error;

use crate::config::WizardSettings;
use crate::domain::catalog::Catalog;
use crate::domain::job::{
    CreateJobRequest, DeadlineEntry, DemandEntry, EntitySelection, InventoryLevel, Job,
    JobConfiguration, JobDetailsUpdate, JobParameters, MethodCapacity, ObjectiveWeights,
    WeekResource,
};
use crate::domain::mission::Mission;
use crate::domain::types::{EntityId, EntityKind, JobId, JobStatus, MissionId, WizardStep};
use crate::i18n::{t, t_with_args};

// ==========================================
// DraftError - 草稿编辑输入错误
// ==========================================
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DraftError {
    #[error("{field} 必须为非负数: {value}")]
    NegativeValue { field: &'static str, value: f64 },

    #[error("周次 {week} 超出作业周期 [1, {total_weeks}]")]
    WeekOutOfRange { week: u32, total_weeks: u32 },

    #[error("目录中不存在该实体: {kind}#{id}")]
    UnknownEntity { kind: EntityKind, id: EntityId },

    #[error("{0} 不支持设置库存")]
    NoInventory(EntityKind),

    #[error("实体未选择，不能设置库存: {kind}#{id}")]
    NotSelected { kind: EntityKind, id: EntityId },

    #[error("作业周期必须至少为 1 周")]
    InvalidHorizon,

    #[error("目标权重 {0} 必须为非负数")]
    InvalidWeight(&'static str),

    #[error("条目不存在: index={0}")]
    EntryNotFound(usize),
}

impl DraftError {
    /// 本地化提示
    pub fn user_message(&self) -> String {
        match self {
            DraftError::NegativeValue { field, value } => {
                let value = value.to_string();
                t_with_args(
                    "wizard.draft.negative_value",
                    &[("field", *field), ("value", value.as_str())],
                )
            }
            DraftError::WeekOutOfRange { week, total_weeks } => {
                let week = week.to_string();
                let total = total_weeks.to_string();
                t_with_args(
                    "wizard.draft.week_out_of_range",
                    &[("week", week.as_str()), ("total", total.as_str())],
                )
            }
            DraftError::UnknownEntity { kind, id } => {
                let id = id.to_string();
                t_with_args(
                    "wizard.draft.unknown_entity",
                    &[("kind", kind.as_str()), ("id", id.as_str())],
                )
            }
            DraftError::NoInventory(kind) => {
                t_with_args("wizard.draft.no_inventory", &[("kind", kind.as_str())])
            }
            DraftError::NotSelected { kind, id } => {
                let id = id.to_string();
                t_with_args(
                    "wizard.draft.not_selected",
                    &[("kind", kind.as_str()), ("id", id.as_str())],
                )
            }
            DraftError::InvalidHorizon => t("wizard.draft.invalid_horizon"),
            DraftError::InvalidWeight(name) => {
                t_with_args("wizard.draft.invalid_weight", &[("name", *name)])
            }
            DraftError::EntryNotFound(_) => self.to_string(),
        }
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<f64, DraftError> {
    if !value.is_finite() || value < 0.0 {
        return Err(DraftError::NegativeValue { field, value });
    }
    Ok(value)
}

/// 步骤1字段
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobDetailsDraft {
    pub name: String,
    pub description: Option<String>,
    pub total_weeks: u32,
    pub weights: ObjectiveWeights,
}

impl JobDetailsDraft {
    fn parameters(&self) -> JobParameters {
        JobParameters {
            name: self.name.trim().to_string(),
            description: self.description.clone(),
        }
    }
}

/// 新增周次时使用的周资源预置值
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeekDefaults {
    pub crew_hours: f64,
    pub energy: f64,
}

impl WeekDefaults {
    fn seed(&self, total_weeks: u32) -> Vec<WeekResource> {
        self.fill(Vec::new(), total_weeks)
    }

    /// 截断到 [1, total_weeks]，缺失的周次按预置值补齐，按周排序
    fn fill(&self, mut resources: Vec<WeekResource>, total_weeks: u32) -> Vec<WeekResource> {
        resources.retain(|r| r.week >= 1 && r.week <= total_weeks);
        for week in 1..=total_weeks {
            if !resources.iter().any(|r| r.week == week) {
                resources.push(WeekResource {
                    week,
                    crew_hours: self.crew_hours,
                    energy: self.energy,
                });
            }
        }
        resources.sort_by_key(|r| r.week);
        resources
    }
}

// ==========================================
// WizardDraft
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WizardDraft {
    job_id: Option<JobId>,
    mission_id: MissionId,
    status: JobStatus,
    details: JobDetailsDraft,
    selection: EntitySelection,
    inventories: Vec<InventoryLevel>,
    demands: Vec<DemandEntry>,
    deadlines: Vec<DeadlineEntry>,
    week_resources: Vec<WeekResource>,
    method_capacities: Vec<MethodCapacity>,
    week_defaults: WeekDefaults,
    #[serde(skip)]
    baseline: Option<JobConfiguration>,
}

impl WizardDraft {
    /// 新建作业的初始草稿（周资源按任务默认值预置）
    pub fn new(mission: &Mission, settings: &WizardSettings) -> Self {
        let total_weeks = mission.duration_weeks.max(1);
        let week_defaults = WeekDefaults {
            crew_hours: mission.crew_hours_per_week,
            energy: settings.default_energy_per_week,
        };

        Self {
            job_id: None,
            mission_id: mission.id,
            status: JobStatus::Draft,
            details: JobDetailsDraft {
                name: String::new(),
                description: None,
                total_weeks,
                weights: settings.default_objective_weights,
            },
            selection: EntitySelection::default(),
            inventories: Vec::new(),
            demands: Vec::new(),
            deadlines: Vec::new(),
            week_resources: week_defaults.seed(total_weeks),
            method_capacities: Vec::new(),
            week_defaults,
            baseline: None,
        }
    }

    /// 由已持久化配置重建草稿
    ///
    /// # 说明
    /// - 周资源缺失的周次按任务默认值预置
    /// - 超出作业周期的已存条目不进入草稿（仍留在基线中，由后续提交删除）
    /// - mission 缺失时乘员工时取 fallback_crew_hours_per_week
    pub fn from_configuration(
        config: JobConfiguration,
        mission: Option<&Mission>,
        settings: &WizardSettings,
    ) -> Self {
        let job = &config.job;
        let week_defaults = WeekDefaults {
            crew_hours: mission
                .map(|m| m.crew_hours_per_week)
                .unwrap_or(settings.fallback_crew_hours_per_week),
            energy: settings.default_energy_per_week,
        };

        let total_weeks = job.total_weeks;
        let week_resources = week_defaults.fill(config.week_resources.clone(), total_weeks);

        Self {
            job_id: Some(job.id),
            mission_id: job.mission_id,
            status: job.status,
            details: JobDetailsDraft {
                name: job.parameters.name.clone(),
                description: job.parameters.description.clone(),
                total_weeks: job.total_weeks,
                weights: job.weights,
            },
            selection: config.enabled.clone(),
            inventories: config
                .inventories
                .iter()
                .filter(|l| l.quantity > 0.0)
                .copied()
                .collect(),
            demands: config
                .demands
                .iter()
                .filter(|d| d.week <= total_weeks)
                .copied()
                .collect(),
            deadlines: config
                .deadlines
                .iter()
                .filter(|d| d.week <= total_weeks)
                .copied()
                .collect(),
            week_resources,
            method_capacities: config
                .method_capacities
                .iter()
                .filter(|c| c.week <= total_weeks)
                .copied()
                .collect(),
            week_defaults,
            baseline: Some(config),
        }
    }

    // ==========================================
    // 只读访问
    // ==========================================

    pub fn job_id(&self) -> Option<JobId> {
        self.job_id
    }

    pub fn mission_id(&self) -> MissionId {
        self.mission_id
    }

    /// 最近一次持久化的作业状态
    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn details(&self) -> &JobDetailsDraft {
        &self.details
    }

    pub fn selection(&self) -> &EntitySelection {
        &self.selection
    }

    /// 非零库存
    pub fn inventories(&self) -> &[InventoryLevel] {
        &self.inventories
    }

    pub fn inventory_of(&self, kind: EntityKind, entity_id: EntityId) -> f64 {
        self.inventories
            .iter()
            .find(|l| l.kind == kind && l.entity_id == entity_id)
            .map(|l| l.quantity)
            .unwrap_or(0.0)
    }

    pub fn demands(&self) -> &[DemandEntry] {
        &self.demands
    }

    pub fn deadlines(&self) -> &[DeadlineEntry] {
        &self.deadlines
    }

    pub fn week_resources(&self) -> &[WeekResource] {
        &self.week_resources
    }

    pub fn week_resource(&self, week: u32) -> Option<&WeekResource> {
        self.week_resources.iter().find(|r| r.week == week)
    }

    pub fn method_capacities(&self) -> &[MethodCapacity] {
        &self.method_capacities
    }

    pub fn baseline(&self) -> Option<&JobConfiguration> {
        self.baseline.as_ref()
    }

    // ==========================================
    // 编辑（返回新草稿）
    // ==========================================

    pub fn with_name(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.details.name = name.to_string();
        next
    }

    pub fn with_description(&self, description: Option<String>) -> Self {
        let mut next = self.clone();
        next.details.description = description.filter(|d| !d.trim().is_empty());
        next
    }

    pub fn with_weights(&self, weights: ObjectiveWeights) -> Result<Self, DraftError> {
        if let Some(name) = weights.first_invalid() {
            return Err(DraftError::InvalidWeight(name));
        }
        let mut next = self.clone();
        next.details.weights = weights;
        Ok(next)
    }

    /// 调整作业周期
    ///
    /// 新增周次按预置值补齐周资源；超出新周期的周资源/需求/截止/产能被丢弃
    pub fn with_total_weeks(&self, total_weeks: u32) -> Result<Self, DraftError> {
        if total_weeks == 0 {
            return Err(DraftError::InvalidHorizon);
        }

        let mut next = self.clone();
        next.details.total_weeks = total_weeks;
        next.week_resources = self
            .week_defaults
            .fill(self.week_resources.clone(), total_weeks);
        next.demands.retain(|d| d.week <= total_weeks);
        next.deadlines.retain(|d| d.week <= total_weeks);
        next.method_capacities.retain(|c| c.week <= total_weeks);
        Ok(next)
    }

    /// 选择/取消选择一个目录实体；取消时同时清除其库存
    pub fn with_entity(
        &self,
        catalog: &Catalog,
        kind: EntityKind,
        entity_id: EntityId,
        selected: bool,
    ) -> Result<Self, DraftError> {
        let mut next = self.clone();
        if selected {
            if !catalog.contains(kind, entity_id) {
                return Err(DraftError::UnknownEntity {
                    kind,
                    id: entity_id,
                });
            }
            next.selection.get_mut(kind).insert(entity_id);
        } else {
            next.selection.get_mut(kind).remove(&entity_id);
            next.inventories
                .retain(|l| !(l.kind == kind && l.entity_id == entity_id));
        }
        Ok(next)
    }

    /// 整体替换某一类的选择
    pub fn with_selection(
        &self,
        catalog: &Catalog,
        kind: EntityKind,
        entity_ids: &[EntityId],
    ) -> Result<Self, DraftError> {
        if let Some(unknown) = entity_ids.iter().find(|id| !catalog.contains(kind, **id)) {
            return Err(DraftError::UnknownEntity {
                kind,
                id: *unknown,
            });
        }

        let mut next = self.clone();
        let set = next.selection.get_mut(kind);
        set.clear();
        set.extend(entity_ids.iter().copied());
        let selection = next.selection.clone();
        next.inventories
            .retain(|l| l.kind != kind || selection.contains(kind, l.entity_id));
        Ok(next)
    }

    /// 设置初始库存；0 表示无库存
    pub fn with_inventory(
        &self,
        catalog: &Catalog,
        kind: EntityKind,
        entity_id: EntityId,
        quantity: f64,
    ) -> Result<Self, DraftError> {
        if kind.inventory_unit().is_none() {
            return Err(DraftError::NoInventory(kind));
        }
        let quantity = non_negative("quantity", quantity)?;
        if !catalog.contains(kind, entity_id) {
            return Err(DraftError::UnknownEntity {
                kind,
                id: entity_id,
            });
        }
        if !self.selection.contains(kind, entity_id) {
            return Err(DraftError::NotSelected {
                kind,
                id: entity_id,
            });
        }

        let mut next = self.clone();
        next.inventories
            .retain(|l| !(l.kind == kind && l.entity_id == entity_id));
        if quantity > 0.0 {
            next.inventories.push(InventoryLevel {
                kind,
                entity_id,
                quantity,
            });
        }
        Ok(next)
    }

    fn check_week(&self, week: u32) -> Result<(), DraftError> {
        if week == 0 || week > self.details.total_weeks {
            return Err(DraftError::WeekOutOfRange {
                week,
                total_weeks: self.details.total_weeks,
            });
        }
        Ok(())
    }

    fn check_item(&self, catalog: &Catalog, item_id: EntityId) -> Result<(), DraftError> {
        if !catalog.contains(EntityKind::Item, item_id) {
            return Err(DraftError::UnknownEntity {
                kind: EntityKind::Item,
                id: item_id,
            });
        }
        Ok(())
    }

    /// 追加物品需求（同物品同周允许多条）
    pub fn add_demand(
        &self,
        catalog: &Catalog,
        item_id: EntityId,
        week: u32,
        amount: f64,
    ) -> Result<Self, DraftError> {
        self.check_item(catalog, item_id)?;
        self.check_week(week)?;
        let amount = non_negative("amount", amount)?;

        let mut next = self.clone();
        next.demands.push(DemandEntry {
            id: None,
            item_id,
            week,
            amount,
        });
        Ok(next)
    }

    pub fn remove_demand(&self, index: usize) -> Result<Self, DraftError> {
        if index >= self.demands.len() {
            return Err(DraftError::EntryNotFound(index));
        }
        let mut next = self.clone();
        next.demands.remove(index);
        Ok(next)
    }

    /// 追加截止要求
    pub fn add_deadline(
        &self,
        catalog: &Catalog,
        item_id: EntityId,
        week: u32,
        amount: f64,
    ) -> Result<Self, DraftError> {
        self.check_item(catalog, item_id)?;
        self.check_week(week)?;
        let amount = non_negative("amount", amount)?;

        let mut next = self.clone();
        next.deadlines.push(DeadlineEntry {
            id: None,
            item_id,
            week,
            amount,
        });
        Ok(next)
    }

    pub fn remove_deadline(&self, index: usize) -> Result<Self, DraftError> {
        if index >= self.deadlines.len() {
            return Err(DraftError::EntryNotFound(index));
        }
        let mut next = self.clone();
        next.deadlines.remove(index);
        Ok(next)
    }

    pub fn with_week_resource(
        &self,
        week: u32,
        crew_hours: f64,
        energy: f64,
    ) -> Result<Self, DraftError> {
        self.check_week(week)?;
        let crew_hours = non_negative("crew_hours", crew_hours)?;
        let energy = non_negative("energy", energy)?;

        let mut next = self.clone();
        match next.week_resources.iter_mut().find(|r| r.week == week) {
            Some(existing) => {
                existing.crew_hours = crew_hours;
                existing.energy = energy;
            }
            None => {
                next.week_resources.push(WeekResource {
                    week,
                    crew_hours,
                    energy,
                });
                next.week_resources.sort_by_key(|r| r.week);
            }
        }
        Ok(next)
    }

    /// 设置方法周产能（按 方法+周 覆盖）
    pub fn with_method_capacity(
        &self,
        catalog: &Catalog,
        capacity: MethodCapacity,
    ) -> Result<Self, DraftError> {
        if !catalog.contains(EntityKind::Method, capacity.method_id) {
            return Err(DraftError::UnknownEntity {
                kind: EntityKind::Method,
                id: capacity.method_id,
            });
        }
        self.check_week(capacity.week)?;
        non_negative("max_capacity_kg", capacity.max_capacity_kg)?;

        let mut next = self.clone();
        next.method_capacities
            .retain(|c| !(c.method_id == capacity.method_id && c.week == capacity.week));
        next.method_capacities.push(capacity);
        next.method_capacities
            .sort_by_key(|c| (c.method_id, c.week));
        Ok(next)
    }

    pub fn without_method_capacity(&self, method_id: EntityId, week: u32) -> Self {
        let mut next = self.clone();
        next.method_capacities
            .retain(|c| !(c.method_id == method_id && c.week == week));
        next
    }

    // ==========================================
    // 提交辅助（仅 engine 内部使用）
    // ==========================================

    pub(crate) fn create_request(&self) -> CreateJobRequest {
        CreateJobRequest {
            mission_id: self.mission_id,
            total_weeks: self.details.total_weeks,
            weights: self.details.weights,
            parameters: self.details.parameters(),
        }
    }

    pub(crate) fn details_update(&self) -> JobDetailsUpdate {
        JobDetailsUpdate {
            total_weeks: self.details.total_weeks,
            weights: self.details.weights,
            parameters: self.details.parameters(),
        }
    }

    /// 提交成功后生成新草稿
    ///
    /// # 参数
    /// - step: 已提交的步骤（仅该步骤对应的集合并入基线）
    /// - job: 提交后的作业
    /// - demands / deadlines: 已回填后端条目ID的列表（步骤4）
    pub(crate) fn committed(
        &self,
        step: WizardStep,
        job: Job,
        demands: Option<Vec<DemandEntry>>,
        deadlines: Option<Vec<DeadlineEntry>>,
    ) -> Self {
        let mut next = self.clone();
        next.job_id = Some(job.id);
        next.status = job.status;
        if let Some(demands) = demands {
            next.demands = demands;
        }
        if let Some(deadlines) = deadlines {
            next.deadlines = deadlines;
        }

        let mut baseline = self.baseline.clone().unwrap_or_else(|| JobConfiguration {
            job: job.clone(),
            enabled: EntitySelection::default(),
            inventories: Vec::new(),
            demands: Vec::new(),
            deadlines: Vec::new(),
            week_resources: Vec::new(),
            method_capacities: Vec::new(),
        });
        baseline.job = job;

        match step {
            WizardStep::JobDetails => {
                // 超出新周期的条目已随本次提交删除
                let total = next.details.total_weeks;
                baseline.week_resources.retain(|r| r.week <= total);
                baseline.method_capacities.retain(|c| c.week <= total);
                baseline.demands.retain(|d| d.week <= total);
                baseline.deadlines.retain(|d| d.week <= total);
            }
            WizardStep::EntitySelection => baseline.enabled = next.selection.clone(),
            WizardStep::Inventories => baseline.inventories = next.inventories.clone(),
            WizardStep::DemandsDeadlines => {
                baseline.demands = next.demands.clone();
                baseline.deadlines = next.deadlines.clone();
            }
            WizardStep::Resources => {
                baseline.week_resources = next.week_resources.clone();
                baseline.method_capacities = next.method_capacities.clone();
            }
            WizardStep::Review => {}
        }

        next.baseline = Some(baseline);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::CatalogEntity;
    use chrono::Utc;

    fn mission(weeks: u32, crew: f64) -> Mission {
        Mission {
            id: 3,
            name: "Ares".to_string(),
            status: "planning".to_string(),
            duration_weeks: weeks,
            crew_hours_per_week: crew,
            crew_count: 4,
        }
    }

    fn entity(kind: EntityKind, id: EntityId) -> CatalogEntity {
        CatalogEntity {
            id,
            kind,
            name: format!("{}-{}", kind, id),
            category: String::new(),
        }
    }

    fn catalog() -> Catalog {
        Catalog {
            materials: vec![entity(EntityKind::Material, 1), entity(EntityKind::Material, 2)],
            methods: vec![entity(EntityKind::Method, 10)],
            items: vec![entity(EntityKind::Item, 20)],
            ..Default::default()
        }
    }

    fn job(status: JobStatus, weeks: u32) -> Job {
        Job {
            id: 42,
            mission_id: 3,
            status,
            total_weeks: weeks,
            weights: ObjectiveWeights::default(),
            parameters: JobParameters {
                name: "Existing".to_string(),
                description: None,
            },
            result_summary: None,
            result_bundle: None,
            solver_status: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
        }
    }

    #[test]
    fn test_new_draft_seeds_weeks_from_mission() {
        let draft = WizardDraft::new(&mission(6, 40.0), &WizardSettings::default());
        assert_eq!(draft.week_resources().len(), 6);
        for (i, r) in draft.week_resources().iter().enumerate() {
            assert_eq!(r.week, i as u32 + 1);
            assert_eq!(r.crew_hours, 40.0);
            assert_eq!(r.energy, 100.0);
        }
        assert!(draft.job_id().is_none());
        assert_eq!(draft.details().total_weeks, 6);
    }

    #[test]
    fn test_from_configuration_fills_horizon() {
        let config = JobConfiguration {
            job: job(JobStatus::DemandsConfig, 3),
            enabled: EntitySelection::default(),
            inventories: vec![],
            demands: vec![],
            deadlines: vec![],
            week_resources: vec![],
            method_capacities: vec![],
        };
        let draft =
            WizardDraft::from_configuration(config.clone(), Some(&mission(3, 35.0)), &WizardSettings::default());
        assert_eq!(draft.week_resources().len(), 3);
        assert_eq!(draft.week_resources()[0].crew_hours, 35.0);

        // 已存周次保留，缺失周次补齐，超出周期的周次不进入草稿
        let mut stored = config;
        stored.week_resources = vec![
            WeekResource { week: 1, crew_hours: 10.0, energy: 5.0 },
            WeekResource { week: 5, crew_hours: 10.0, energy: 5.0 },
        ];
        stored.method_capacities = vec![MethodCapacity {
            method_id: 10,
            week: 4,
            max_capacity_kg: 1.0,
            available: true,
        }];
        stored.demands = vec![
            DemandEntry { id: Some(1), item_id: 20, week: 3, amount: 1.0 },
            DemandEntry { id: Some(2), item_id: 20, week: 4, amount: 1.0 },
        ];
        let draft = WizardDraft::from_configuration(stored, None, &WizardSettings::default());
        assert_eq!(
            draft.week_resources(),
            &[
                WeekResource { week: 1, crew_hours: 10.0, energy: 5.0 },
                WeekResource { week: 2, crew_hours: 40.0, energy: 100.0 },
                WeekResource { week: 3, crew_hours: 40.0, energy: 100.0 },
            ]
        );
        assert!(draft.method_capacities().is_empty());
        assert_eq!(draft.demands().len(), 1);
        assert_eq!(draft.baseline().unwrap().week_resources.len(), 2);
        assert_eq!(draft.status(), JobStatus::DemandsConfig);
    }

    #[test]
    fn test_edits_return_new_values() {
        let original = WizardDraft::new(&mission(4, 40.0), &WizardSettings::default());
        let edited = original
            .with_name("Ares Recycling Run")
            .with_entity(&catalog(), EntityKind::Material, 1, true)
            .unwrap();
        assert!(original.selection().is_empty());
        assert_eq!(edited.selection().total(), 1);
        assert_eq!(original.details().name, "");
    }

    #[test]
    fn test_input_invariants() {
        let draft = WizardDraft::new(&mission(4, 40.0), &WizardSettings::default());
        let cat = catalog();

        assert!(matches!(
            draft.with_inventory(&cat, EntityKind::Material, 1, -1.0),
            Err(DraftError::NegativeValue { .. })
        ));
        assert!(matches!(
            draft.with_inventory(&cat, EntityKind::Method, 10, 1.0),
            Err(DraftError::NoInventory(EntityKind::Method))
        ));
        assert!(matches!(
            draft.add_demand(&cat, 20, 5, 1.0),
            Err(DraftError::WeekOutOfRange { week: 5, total_weeks: 4 })
        ));
        assert!(matches!(
            draft.add_demand(&cat, 99, 1, 1.0),
            Err(DraftError::UnknownEntity { .. })
        ));
        assert!(matches!(
            draft.with_week_resource(0, 1.0, 1.0),
            Err(DraftError::WeekOutOfRange { .. })
        ));
        assert!(matches!(draft.with_total_weeks(0), Err(DraftError::InvalidHorizon)));
    }

    #[test]
    fn test_zero_inventory_removes_entry() {
        let cat = catalog();
        let draft = WizardDraft::new(&mission(4, 40.0), &WizardSettings::default())
            .with_selection(&cat, EntityKind::Material, &[1, 2])
            .unwrap()
            .with_inventory(&cat, EntityKind::Material, 1, 12.5)
            .unwrap()
            .with_inventory(&cat, EntityKind::Material, 2, 0.0)
            .unwrap();
        assert_eq!(draft.inventories().len(), 1);

        let cleared = draft.with_inventory(&cat, EntityKind::Material, 1, 0.0).unwrap();
        assert!(cleared.inventories().is_empty());
    }

    #[test]
    fn test_inventory_requires_selected_entity() {
        let cat = catalog();
        let draft = WizardDraft::new(&mission(4, 40.0), &WizardSettings::default())
            .with_entity(&cat, EntityKind::Material, 1, true)
            .unwrap();

        let err = draft
            .with_inventory(&cat, EntityKind::Material, 2, 7.0)
            .unwrap_err();
        assert_eq!(err, DraftError::NotSelected { kind: EntityKind::Material, id: 2 });
        assert!(draft.with_inventory(&cat, EntityKind::Material, 1, 7.0).is_ok());
    }

    #[test]
    fn test_deselect_clears_inventory() {
        let cat = catalog();
        let draft = WizardDraft::new(&mission(4, 40.0), &WizardSettings::default())
            .with_entity(&cat, EntityKind::Material, 1, true)
            .unwrap()
            .with_inventory(&cat, EntityKind::Material, 1, 3.0)
            .unwrap()
            .with_entity(&cat, EntityKind::Material, 1, false)
            .unwrap();
        assert_eq!(draft.inventory_of(EntityKind::Material, 1), 0.0);
    }

    #[test]
    fn test_resize_horizon() {
        let cat = catalog();
        let draft = WizardDraft::new(&mission(4, 40.0), &WizardSettings::default())
            .add_demand(&cat, 20, 4, 2.0)
            .unwrap()
            .with_week_resource(2, 12.0, 8.0)
            .unwrap();

        let shorter = draft.with_total_weeks(2).unwrap();
        assert_eq!(shorter.week_resources().len(), 2);
        assert_eq!(shorter.week_resources()[1].crew_hours, 12.0);
        assert!(shorter.demands().is_empty());

        let longer = shorter.with_total_weeks(5).unwrap();
        assert_eq!(longer.week_resources().len(), 5);
        assert_eq!(longer.week_resources()[4].crew_hours, 40.0);
    }

    #[test]
    fn test_committed_rebases_only_that_step() {
        let cat = catalog();
        let draft = WizardDraft::new(&mission(4, 40.0), &WizardSettings::default())
            .with_name("Ares Recycling Run")
            .with_entity(&cat, EntityKind::Material, 1, true)
            .unwrap();

        let after_step1 = draft.committed(WizardStep::JobDetails, job(JobStatus::Draft, 4), None, None);
        assert_eq!(after_step1.job_id(), Some(42));
        let baseline = after_step1.baseline().unwrap();
        assert!(baseline.enabled.is_empty());
        assert!(baseline.week_resources.is_empty());

        let after_step2 = after_step1.committed(
            WizardStep::EntitySelection,
            job(JobStatus::EntitiesConfig, 4),
            None,
            None,
        );
        assert_eq!(after_step2.baseline().unwrap().enabled.total(), 1);
        assert_eq!(after_step2.status(), JobStatus::EntitiesConfig);
    }
}

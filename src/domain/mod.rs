// ==========================================
// 任务规划控制台 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑，不含向导流程逻辑
// ==========================================

pub mod catalog;
pub mod job;
pub mod mission;
pub mod types;

// 重导出核心类型
pub use catalog::{Catalog, CatalogEntity};
pub use job::{
    CreateJobRequest, DeadlineEntry, DemandEntry, EntitySelection, InventoryLevel, Job,
    JobConfiguration, JobDetailsUpdate, JobParameters, MethodCapacity, ObjectiveWeights,
    RunResult, WeekResource,
};
pub use mission::Mission;
pub use types::{
    EntityId, EntityKind, InventoryUnit, JobId, JobStatus, MissionId, WizardStep,
};

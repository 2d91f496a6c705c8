// ==========================================
// 任务规划控制台 - 作业草稿存储 Trait
// ==========================================
// 职责: 定义作业配置的权威外部资源接口
// 红线: 存储层不含向导流程逻辑，只做资源读写
// ==========================================
// 说明:
// - enable/disable 幂等
// - 需求/截止为追加语义，由后端分配条目ID
// - 周资源/方法产能按 (周) / (方法, 周) 覆盖写入
// - remove_* / disable_* / delete_job 供步骤提交失败时补偿使用
// ==========================================

use async_trait::async_trait;

use crate::domain::job::{
    CreateJobRequest, DeadlineEntry, DemandEntry, Job, JobConfiguration, JobDetailsUpdate,
    MethodCapacity, RunResult, WeekResource,
};
use crate::domain::types::{EntityId, EntityKind, JobId, JobStatus};
use crate::repository::error::RepositoryResult;

// ==========================================
// JobDraftStore Trait
// ==========================================
// 实现者: HttpBackend（REST）/ LocalBackend（SQLite）
#[async_trait]
pub trait JobDraftStore: Send + Sync {
    // ===== 作业生命周期 =====

    /// 创建作业（初始状态 draft）
    async fn create_job(&self, request: &CreateJobRequest) -> RepositoryResult<Job>;

    async fn get_job(&self, job_id: JobId) -> RepositoryResult<Job>;

    /// 查询作业完整配置（作业 + 五类配置集合）
    async fn get_job_configuration(&self, job_id: JobId) -> RepositoryResult<JobConfiguration>;

    /// 更新作业基本信息（名称/描述/周期/权重）
    async fn update_job_details(
        &self,
        job_id: JobId,
        update: &JobDetailsUpdate,
    ) -> RepositoryResult<Job>;

    async fn delete_job(&self, job_id: JobId) -> RepositoryResult<()>;

    /// 更新作业状态
    async fn update_status(&self, job_id: JobId, status: JobStatus) -> RepositoryResult<Job>;

    /// 触发求解器运行（不等待完成）
    async fn run_job(&self, job_id: JobId) -> RepositoryResult<RunResult>;

    // ===== 启用实体 =====

    /// 启用一组实体（幂等）
    async fn enable_entities(
        &self,
        job_id: JobId,
        kind: EntityKind,
        entity_ids: &[EntityId],
    ) -> RepositoryResult<()>;

    /// 停用一组实体（幂等）
    async fn disable_entities(
        &self,
        job_id: JobId,
        kind: EntityKind,
        entity_ids: &[EntityId],
    ) -> RepositoryResult<()>;

    // ===== 库存 =====

    /// 设置初始库存（materials/outputs/items/substitutes）
    async fn set_inventory(
        &self,
        job_id: JobId,
        kind: EntityKind,
        entity_id: EntityId,
        quantity: f64,
    ) -> RepositoryResult<()>;

    // ===== 需求/截止 =====

    /// 追加一条需求，返回带后端ID的条目
    async fn add_item_demand(
        &self,
        job_id: JobId,
        entry: &DemandEntry,
    ) -> RepositoryResult<DemandEntry>;

    async fn remove_item_demand(&self, job_id: JobId, entry_id: i64) -> RepositoryResult<()>;

    /// 追加一条截止要求，返回带后端ID的条目
    async fn add_deadline(
        &self,
        job_id: JobId,
        entry: &DeadlineEntry,
    ) -> RepositoryResult<DeadlineEntry>;

    async fn remove_deadline(&self, job_id: JobId, entry_id: i64) -> RepositoryResult<()>;

    // ===== 周资源/方法产能 =====

    async fn set_week_resources(
        &self,
        job_id: JobId,
        resource: &WeekResource,
    ) -> RepositoryResult<()>;

    /// 删除某周的资源记录（周期缩短后清理超出范围的周次）
    async fn remove_week_resource(&self, job_id: JobId, week: u32) -> RepositoryResult<()>;

    async fn set_method_capacity(
        &self,
        job_id: JobId,
        capacity: &MethodCapacity,
    ) -> RepositoryResult<()>;

    async fn remove_method_capacity(
        &self,
        job_id: JobId,
        method_id: EntityId,
        week: u32,
    ) -> RepositoryResult<()>;
}

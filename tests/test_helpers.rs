// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、Ares 种子数据、可注入故障的记录型存储
// ==========================================

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;

use mission_planner::config::WizardSettings;
use mission_planner::domain::job::{
    CreateJobRequest, DeadlineEntry, DemandEntry, Job, JobConfiguration, JobDetailsUpdate,
    MethodCapacity, RunResult, WeekResource,
};
use mission_planner::domain::types::{EntityId, EntityKind, JobId, JobStatus, MissionId};
use mission_planner::repository::{
    JobDraftStore, LocalBackend, RepositoryError, RepositoryResult,
};

// ==========================================
// 数据库
// ==========================================

/// 创建临时测试数据库上的本地后端
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - Arc<LocalBackend>: 已建表的本地后端
pub fn create_test_backend() -> (NamedTempFile, Arc<LocalBackend>) {
    let temp_file = NamedTempFile::new().expect("创建临时文件失败");
    let db_path = temp_file.path().to_string_lossy().to_string();
    let backend = LocalBackend::new(&db_path).expect("打开本地后端失败");
    (temp_file, Arc::new(backend))
}

// ==========================================
// 种子数据
// ==========================================

pub const MATERIAL_A: EntityId = 1;
pub const MATERIAL_B: EntityId = 2;
pub const METHOD_M: EntityId = 10;
pub const OUTPUT_O: EntityId = 30;
pub const ITEM_X: EntityId = 20;
pub const SUBSTITUTE_S: EntityId = 40;

/// 写入 Ares 任务（4 周，每周 40 工时）和一组目录实体
pub fn seed_ares(backend: &LocalBackend) -> MissionId {
    let mission_id = backend
        .insert_mission("Ares", 4, 40.0, 3)
        .expect("写入任务失败");
    seed_catalog(backend);
    mission_id
}

pub fn seed_catalog(backend: &LocalBackend) {
    let entities = [
        (EntityKind::Material, MATERIAL_A, "Aluminium scrap", "metal"),
        (EntityKind::Material, MATERIAL_B, "Polymer film", "plastic"),
        (EntityKind::Method, METHOD_M, "Melt and cast", "thermal"),
        (EntityKind::Output, OUTPUT_O, "Ingot", "metal"),
        (EntityKind::Item, ITEM_X, "Strut", "structure"),
        (EntityKind::Substitute, SUBSTITUTE_S, "Printed strut", "structure"),
    ];
    for (kind, id, name, category) in entities {
        backend
            .upsert_catalog_entity(kind, id, name, category)
            .expect("写入目录实体失败");
    }
}

/// 测试用短超时参数
pub fn fast_settings() -> WizardSettings {
    WizardSettings {
        commit_timeout_ms: 200,
        run_timeout_ms: 200,
        ..WizardSettings::default()
    }
}

// ==========================================
// RecordingStore - 记录调用并可注入故障
// ==========================================
// 调用标签格式:
//   create_job / update_job_details / delete_job / run_job
//   update_status:<status>
//   enable:<kind> / disable:<kind>
//   set_inventory:<kind>:<id>
//   add_item_demand / remove_item_demand / add_deadline / remove_deadline
//   set_week_resources:<week> / remove_week_resource:<week>
//   set_method_capacity / remove_method_capacity
pub struct RecordingStore {
    inner: Arc<dyn JobDraftStore>,
    calls: Mutex<Vec<String>>,
    fail_on: Mutex<Option<String>>,
    delay_on: Mutex<Option<(String, Duration)>>,
    run_result: Mutex<Option<RunResult>>,
}

impl RecordingStore {
    pub fn new(inner: Arc<dyn JobDraftStore>) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            fail_on: Mutex::new(None),
            delay_on: Mutex::new(None),
            run_result: Mutex::new(None),
        }
    }

    /// 以标签前缀匹配的调用返回 Conflict
    pub fn fail_on(&self, prefix: &str) {
        *self.fail_on.lock().unwrap() = Some(prefix.to_string());
    }

    /// 以标签前缀匹配的调用先等待 delay
    pub fn delay_on(&self, prefix: &str, delay: Duration) {
        *self.delay_on.lock().unwrap() = Some((prefix.to_string(), delay));
    }

    /// 覆盖 run_job 的返回
    pub fn respond_to_run(&self, result: RunResult) {
        *self.run_result.lock().unwrap() = Some(result);
    }

    pub fn clear_faults(&self) {
        *self.fail_on.lock().unwrap() = None;
        *self.delay_on.lock().unwrap() = None;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn take_calls(&self) -> Vec<String> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    async fn enter(&self, label: String) -> RepositoryResult<()> {
        self.calls.lock().unwrap().push(label.clone());

        let delay = self
            .delay_on
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(prefix, _)| label.starts_with(prefix.as_str()))
            .map(|(_, d)| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let fail = self
            .fail_on
            .lock()
            .unwrap()
            .as_ref()
            .map_or(false, |prefix| label.starts_with(prefix.as_str()));
        if fail {
            return Err(RepositoryError::Conflict(format!("injected failure: {}", label)));
        }
        Ok(())
    }
}

#[async_trait]
impl JobDraftStore for RecordingStore {
    async fn create_job(&self, request: &CreateJobRequest) -> RepositoryResult<Job> {
        self.enter("create_job".to_string()).await?;
        self.inner.create_job(request).await
    }

    async fn get_job(&self, job_id: JobId) -> RepositoryResult<Job> {
        self.inner.get_job(job_id).await
    }

    async fn get_job_configuration(&self, job_id: JobId) -> RepositoryResult<JobConfiguration> {
        self.inner.get_job_configuration(job_id).await
    }

    async fn update_job_details(
        &self,
        job_id: JobId,
        update: &JobDetailsUpdate,
    ) -> RepositoryResult<Job> {
        self.enter("update_job_details".to_string()).await?;
        self.inner.update_job_details(job_id, update).await
    }

    async fn delete_job(&self, job_id: JobId) -> RepositoryResult<()> {
        self.enter("delete_job".to_string()).await?;
        self.inner.delete_job(job_id).await
    }

    async fn update_status(&self, job_id: JobId, status: JobStatus) -> RepositoryResult<Job> {
        self.enter(format!("update_status:{}", status)).await?;
        self.inner.update_status(job_id, status).await
    }

    async fn run_job(&self, job_id: JobId) -> RepositoryResult<RunResult> {
        self.enter("run_job".to_string()).await?;
        let canned = self.run_result.lock().unwrap().clone();
        match canned {
            Some(result) => Ok(result),
            None => self.inner.run_job(job_id).await,
        }
    }

    async fn enable_entities(
        &self,
        job_id: JobId,
        kind: EntityKind,
        entity_ids: &[EntityId],
    ) -> RepositoryResult<()> {
        self.enter(format!("enable:{}", kind.as_str())).await?;
        self.inner.enable_entities(job_id, kind, entity_ids).await
    }

    async fn disable_entities(
        &self,
        job_id: JobId,
        kind: EntityKind,
        entity_ids: &[EntityId],
    ) -> RepositoryResult<()> {
        self.enter(format!("disable:{}", kind.as_str())).await?;
        self.inner.disable_entities(job_id, kind, entity_ids).await
    }

    async fn set_inventory(
        &self,
        job_id: JobId,
        kind: EntityKind,
        entity_id: EntityId,
        quantity: f64,
    ) -> RepositoryResult<()> {
        self.enter(format!("set_inventory:{}:{}", kind.as_str(), entity_id))
            .await?;
        self.inner.set_inventory(job_id, kind, entity_id, quantity).await
    }

    async fn add_item_demand(
        &self,
        job_id: JobId,
        entry: &DemandEntry,
    ) -> RepositoryResult<DemandEntry> {
        self.enter("add_item_demand".to_string()).await?;
        self.inner.add_item_demand(job_id, entry).await
    }

    async fn remove_item_demand(&self, job_id: JobId, entry_id: i64) -> RepositoryResult<()> {
        self.enter("remove_item_demand".to_string()).await?;
        self.inner.remove_item_demand(job_id, entry_id).await
    }

    async fn add_deadline(
        &self,
        job_id: JobId,
        entry: &DeadlineEntry,
    ) -> RepositoryResult<DeadlineEntry> {
        self.enter("add_deadline".to_string()).await?;
        self.inner.add_deadline(job_id, entry).await
    }

    async fn remove_deadline(&self, job_id: JobId, entry_id: i64) -> RepositoryResult<()> {
        self.enter("remove_deadline".to_string()).await?;
        self.inner.remove_deadline(job_id, entry_id).await
    }

    async fn set_week_resources(
        &self,
        job_id: JobId,
        resource: &WeekResource,
    ) -> RepositoryResult<()> {
        self.enter(format!("set_week_resources:{}", resource.week))
            .await?;
        self.inner.set_week_resources(job_id, resource).await
    }

    async fn remove_week_resource(&self, job_id: JobId, week: u32) -> RepositoryResult<()> {
        self.enter(format!("remove_week_resource:{}", week)).await?;
        self.inner.remove_week_resource(job_id, week).await
    }

    async fn set_method_capacity(
        &self,
        job_id: JobId,
        capacity: &MethodCapacity,
    ) -> RepositoryResult<()> {
        self.enter("set_method_capacity".to_string()).await?;
        self.inner.set_method_capacity(job_id, capacity).await
    }

    async fn remove_method_capacity(
        &self,
        job_id: JobId,
        method_id: EntityId,
        week: u32,
    ) -> RepositoryResult<()> {
        self.enter("remove_method_capacity".to_string()).await?;
        self.inner
            .remove_method_capacity(job_id, method_id, week)
            .await
    }
}

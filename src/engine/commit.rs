// ==========================================
// 任务规划控制台 - 步骤提交编排
// ==========================================
// 流程 (提交第 N 步):
// 1. 步骤校验（失败则不发起任何调用）
// 2. 并发发出本步修改批次（全部成功才算提交）
// 3. 推进作业状态（重新提交早前步骤时保持状态）
// 4. 返回新草稿；任一步失败则草稿不变
// ==========================================
// 补偿: 每个已生效的修改记录其逆操作，批次/状态更新失败、
//       超时、取消时按批次中的逆序尽力执行；本次新建的作业最后删除
// 已知窗口: create_job 已发出但尚未返回时发生超时/取消，后端可能
//           已建出作业而本地拿不到ID，该作业不会被补偿删除
// ==========================================

use futures::future::{join_all, AbortHandle, AbortRegistration, Abortable, Aborted};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};

use crate::config::WizardSettings;
use crate::domain::job::{
    DeadlineEntry, DemandEntry, Job, JobConfiguration, JobDetailsUpdate, MethodCapacity, WeekResource,
};
use crate::domain::types::{EntityId, EntityKind, JobId, WizardStep};
use crate::engine::draft::WizardDraft;
use crate::engine::error::{WizardError, WizardResult};
use crate::engine::transition::{plan_status_update, StatusUpdate};
use crate::engine::validators::validate_step;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::job_store::JobDraftStore;

// ==========================================
// CommitCancel - 取消句柄
// ==========================================
// 同一句柄只能用于一次提交；cancel() 可在提交开始前或进行中调用
#[derive(Clone)]
pub struct CommitCancel {
    handle: AbortHandle,
    registration: Arc<Mutex<Option<AbortRegistration>>>,
}

impl CommitCancel {
    pub fn new() -> Self {
        let (handle, registration) = AbortHandle::new_pair();
        Self {
            handle,
            registration: Arc::new(Mutex::new(Some(registration))),
        }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_aborted()
    }

    /// 取出注册对象；已被使用过时返回一个不会触发的新注册
    fn take_registration(&self) -> AbortRegistration {
        let taken = self
            .registration
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        match taken {
            Some(registration) => registration,
            None => {
                warn!("取消句柄已被使用，本次提交不可取消");
                AbortHandle::new_pair().1
            }
        }
    }
}

impl Default for CommitCancel {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// StepMutation - 单个修改调用
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum StepMutation {
    DeleteJob,
    UpdateDetails(JobDetailsUpdate),
    Enable { kind: EntityKind, ids: Vec<EntityId> },
    Disable { kind: EntityKind, ids: Vec<EntityId> },
    SetInventory { kind: EntityKind, entity_id: EntityId, quantity: f64 },
    AddDemand(DemandEntry),
    RemoveDemand(DemandEntry),
    AddDeadline(DeadlineEntry),
    RemoveDeadline(DeadlineEntry),
    SetWeekResource(WeekResource),
    RemoveWeekResource(WeekResource),
    SetMethodCapacity(MethodCapacity),
    RemoveMethodCapacity(MethodCapacity),
}

/// 修改调用的返回值
#[derive(Debug, Clone)]
enum MutationOutput {
    Job(Job),
    Demand(DemandEntry),
    Deadline(DeadlineEntry),
    Unit,
}

impl StepMutation {
    fn label(&self) -> &'static str {
        match self {
            StepMutation::DeleteJob => "delete_job",
            StepMutation::UpdateDetails(_) => "update_job_details",
            StepMutation::Enable { .. } => "enable_entities",
            StepMutation::Disable { .. } => "disable_entities",
            StepMutation::SetInventory { .. } => "set_inventory",
            StepMutation::AddDemand(_) => "add_item_demand",
            StepMutation::RemoveDemand(_) => "remove_item_demand",
            StepMutation::AddDeadline(_) => "add_deadline",
            StepMutation::RemoveDeadline(_) => "remove_deadline",
            StepMutation::SetWeekResource(_) => "set_week_resources",
            StepMutation::RemoveWeekResource(_) => "remove_week_resource",
            StepMutation::SetMethodCapacity(_) => "set_method_capacity",
            StepMutation::RemoveMethodCapacity(_) => "remove_method_capacity",
        }
    }

    async fn apply(&self, store: &dyn JobDraftStore, job_id: JobId) -> RepositoryResult<MutationOutput> {
        debug!(job_id, call = self.label(), "发出修改调用");
        match self {
            StepMutation::DeleteJob => store.delete_job(job_id).await.map(|_| MutationOutput::Unit),
            StepMutation::UpdateDetails(update) => store
                .update_job_details(job_id, update)
                .await
                .map(MutationOutput::Job),
            StepMutation::Enable { kind, ids } => store
                .enable_entities(job_id, *kind, ids)
                .await
                .map(|_| MutationOutput::Unit),
            StepMutation::Disable { kind, ids } => store
                .disable_entities(job_id, *kind, ids)
                .await
                .map(|_| MutationOutput::Unit),
            StepMutation::SetInventory {
                kind,
                entity_id,
                quantity,
            } => store
                .set_inventory(job_id, *kind, *entity_id, *quantity)
                .await
                .map(|_| MutationOutput::Unit),
            StepMutation::AddDemand(entry) => store
                .add_item_demand(job_id, entry)
                .await
                .map(MutationOutput::Demand),
            StepMutation::RemoveDemand(entry) => {
                let entry_id = entry.id.ok_or_else(|| missing_entry_id("demand"))?;
                store
                    .remove_item_demand(job_id, entry_id)
                    .await
                    .map(|_| MutationOutput::Unit)
            }
            StepMutation::AddDeadline(entry) => store
                .add_deadline(job_id, entry)
                .await
                .map(MutationOutput::Deadline),
            StepMutation::RemoveDeadline(entry) => {
                let entry_id = entry.id.ok_or_else(|| missing_entry_id("deadline"))?;
                store
                    .remove_deadline(job_id, entry_id)
                    .await
                    .map(|_| MutationOutput::Unit)
            }
            StepMutation::SetWeekResource(resource) => store
                .set_week_resources(job_id, resource)
                .await
                .map(|_| MutationOutput::Unit),
            StepMutation::RemoveWeekResource(resource) => store
                .remove_week_resource(job_id, resource.week)
                .await
                .map(|_| MutationOutput::Unit),
            StepMutation::SetMethodCapacity(capacity) => store
                .set_method_capacity(job_id, capacity)
                .await
                .map(|_| MutationOutput::Unit),
            StepMutation::RemoveMethodCapacity(capacity) => store
                .remove_method_capacity(job_id, capacity.method_id, capacity.week)
                .await
                .map(|_| MutationOutput::Unit),
        }
    }

    /// 逆操作（基于提交前的基线）；None 表示无需或无法补偿
    fn inverse(&self, output: &MutationOutput, draft: &WizardDraft) -> Option<StepMutation> {
        let baseline = draft.baseline();
        match (self, output) {
            (StepMutation::DeleteJob, _) => None,
            (StepMutation::UpdateDetails(_), _) => baseline.map(|b| {
                StepMutation::UpdateDetails(JobDetailsUpdate {
                    total_weeks: b.job.total_weeks,
                    weights: b.job.weights,
                    parameters: b.job.parameters.clone(),
                })
            }),
            (StepMutation::Enable { kind, ids }, _) => {
                // 已启用的实体再次启用是空操作，只撤销新启用的部分
                let before = baseline.map(|b| b.enabled.get(*kind).clone()).unwrap_or_default();
                let added: Vec<EntityId> = ids.iter().copied().filter(|id| !before.contains(id)).collect();
                if added.is_empty() {
                    None
                } else {
                    Some(StepMutation::Disable { kind: *kind, ids: added })
                }
            }
            (StepMutation::Disable { kind, ids }, _) => Some(StepMutation::Enable {
                kind: *kind,
                ids: ids.clone(),
            }),
            (StepMutation::SetInventory { kind, entity_id, .. }, _) => Some(StepMutation::SetInventory {
                kind: *kind,
                entity_id: *entity_id,
                quantity: baseline.map(|b| b.inventory_of(*kind, *entity_id)).unwrap_or(0.0),
            }),
            (StepMutation::AddDemand(_), MutationOutput::Demand(created)) => {
                Some(StepMutation::RemoveDemand(*created))
            }
            (StepMutation::RemoveDemand(entry), _) => Some(StepMutation::AddDemand(DemandEntry {
                id: None,
                ..*entry
            })),
            (StepMutation::AddDeadline(_), MutationOutput::Deadline(created)) => {
                Some(StepMutation::RemoveDeadline(*created))
            }
            (StepMutation::RemoveDeadline(entry), _) => Some(StepMutation::AddDeadline(DeadlineEntry {
                id: None,
                ..*entry
            })),
            (StepMutation::SetWeekResource(resource), _) => baseline
                .and_then(|b| b.week_resource(resource.week))
                .map(|previous| StepMutation::SetWeekResource(*previous)),
            (StepMutation::RemoveWeekResource(resource), _) => {
                Some(StepMutation::SetWeekResource(*resource))
            }
            (StepMutation::SetMethodCapacity(capacity), _) => Some(
                match baseline.and_then(|b| b.method_capacity(capacity.method_id, capacity.week)) {
                    Some(previous) => StepMutation::SetMethodCapacity(*previous),
                    None => StepMutation::RemoveMethodCapacity(*capacity),
                },
            ),
            (StepMutation::RemoveMethodCapacity(capacity), _) => {
                Some(StepMutation::SetMethodCapacity(*capacity))
            }
            (StepMutation::AddDemand(_), _) | (StepMutation::AddDeadline(_), _) => None,
        }
    }
}

fn missing_entry_id(kind: &str) -> RepositoryError {
    RepositoryError::InternalError(format!("{} 条目缺少后端ID", kind))
}

// ==========================================
// 批次规划（纯函数）
// ==========================================

/// 计算提交某一步需要发出的修改调用（不含创建作业与状态更新）
pub fn plan_mutations(draft: &WizardDraft, step: WizardStep) -> Vec<StepMutation> {
    let baseline = draft.baseline();
    let mut mutations = Vec::new();

    match step {
        WizardStep::JobDetails => {
            if draft.job_id().is_some() {
                // 清理排在详情更新之前，补偿时先恢复周期再写回旧周次
                if let Some(b) = baseline {
                    mutations.extend(horizon_removals(b, draft.details().total_weeks));
                }
                mutations.push(StepMutation::UpdateDetails(draft.details_update()));
            }
        }
        WizardStep::EntitySelection => {
            for kind in EntityKind::ALL {
                let selected = draft.selection().get(kind);
                if !selected.is_empty() {
                    mutations.push(StepMutation::Enable {
                        kind,
                        ids: selected.iter().copied().collect(),
                    });
                }
                let removed: Vec<EntityId> = baseline
                    .map(|b| b.enabled.get(kind).difference(selected).copied().collect())
                    .unwrap_or_default();
                if !removed.is_empty() {
                    mutations.push(StepMutation::Disable { kind, ids: removed });
                }
            }
        }
        WizardStep::Inventories => {
            for level in draft.inventories().iter().filter(|l| l.quantity > 0.0) {
                mutations.push(StepMutation::SetInventory {
                    kind: level.kind,
                    entity_id: level.entity_id,
                    quantity: level.quantity,
                });
            }
            if let Some(b) = baseline {
                for level in b.inventories.iter().filter(|l| l.quantity > 0.0) {
                    if draft.inventory_of(level.kind, level.entity_id) == 0.0 {
                        mutations.push(StepMutation::SetInventory {
                            kind: level.kind,
                            entity_id: level.entity_id,
                            quantity: 0.0,
                        });
                    }
                }
            }
        }
        WizardStep::DemandsDeadlines => {
            for entry in draft.demands().iter().filter(|d| d.id.is_none()) {
                mutations.push(StepMutation::AddDemand(*entry));
            }
            for entry in draft.deadlines().iter().filter(|d| d.id.is_none()) {
                mutations.push(StepMutation::AddDeadline(*entry));
            }
            if let Some(b) = baseline {
                let kept: BTreeSet<i64> = draft.demands().iter().filter_map(|d| d.id).collect();
                for entry in b.demands.iter().filter(|d| d.id.map_or(false, |id| !kept.contains(&id))) {
                    mutations.push(StepMutation::RemoveDemand(*entry));
                }
                let kept: BTreeSet<i64> = draft.deadlines().iter().filter_map(|d| d.id).collect();
                for entry in b.deadlines.iter().filter(|d| d.id.map_or(false, |id| !kept.contains(&id))) {
                    mutations.push(StepMutation::RemoveDeadline(*entry));
                }
            }
        }
        WizardStep::Resources => {
            for resource in draft.week_resources() {
                mutations.push(StepMutation::SetWeekResource(*resource));
            }
            if let Some(b) = baseline {
                for resource in &b.week_resources {
                    if draft.week_resource(resource.week).is_none() {
                        mutations.push(StepMutation::RemoveWeekResource(*resource));
                    }
                }
            }
            for capacity in draft.method_capacities() {
                mutations.push(StepMutation::SetMethodCapacity(*capacity));
            }
            if let Some(b) = baseline {
                for capacity in &b.method_capacities {
                    let still_present = draft
                        .method_capacities()
                        .iter()
                        .any(|c| c.method_id == capacity.method_id && c.week == capacity.week);
                    if !still_present {
                        mutations.push(StepMutation::RemoveMethodCapacity(*capacity));
                    }
                }
            }
        }
        WizardStep::Review => {}
    }

    mutations
}

/// 周期缩短到 total_weeks 时需要删除的已持久化条目
fn horizon_removals(baseline: &JobConfiguration, total_weeks: u32) -> Vec<StepMutation> {
    let mut removals = Vec::new();
    for resource in baseline.week_resources.iter().filter(|r| r.week > total_weeks) {
        removals.push(StepMutation::RemoveWeekResource(*resource));
    }
    for capacity in baseline.method_capacities.iter().filter(|c| c.week > total_weeks) {
        removals.push(StepMutation::RemoveMethodCapacity(*capacity));
    }
    for entry in baseline.demands.iter().filter(|d| d.week > total_weeks && d.id.is_some()) {
        removals.push(StepMutation::RemoveDemand(*entry));
    }
    for entry in baseline.deadlines.iter().filter(|d| d.week > total_weeks && d.id.is_some()) {
        removals.push(StepMutation::RemoveDeadline(*entry));
    }
    removals
}

// ==========================================
// StepCommitter
// ==========================================

/// 已生效修改的逆操作日志
///
/// inverses 以修改在批次中的位置为键，补偿顺序与完成先后无关
#[derive(Default)]
struct Journal {
    created_job: Option<JobId>,
    inverses: Vec<(usize, StepMutation)>,
}

fn record(journal: &Mutex<Journal>, position: usize, inverse: StepMutation) {
    if let Ok(mut entries) = journal.lock() {
        entries.inverses.push((position, inverse));
    }
}

/// 批次成功后的产出
struct BatchOutcome {
    job_id: JobId,
    job: Option<Job>,
    demands: Vec<DemandEntry>,
    deadlines: Vec<DeadlineEntry>,
}

pub struct StepCommitter {
    store: Arc<dyn JobDraftStore>,
    settings: WizardSettings,
}

impl StepCommitter {
    pub fn new(store: Arc<dyn JobDraftStore>, settings: WizardSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &WizardSettings {
        &self.settings
    }

    /// 提交某一步，返回提交后的新草稿
    pub async fn commit_step(&self, draft: &WizardDraft, step: WizardStep) -> WizardResult<WizardDraft> {
        self.commit_step_with_cancel(draft, step, &CommitCancel::new())
            .await
    }

    /// 提交某一步（可取消）
    ///
    /// # 返回
    /// - Ok(新草稿): 批次与状态更新全部成功
    /// - Err: 草稿不变；已生效的修改按配置尽力补偿
    #[instrument(skip(self, draft, cancel), fields(step = step.number(), job_id = ?draft.job_id()))]
    pub async fn commit_step_with_cancel(
        &self,
        draft: &WizardDraft,
        step: WizardStep,
        cancel: &CommitCancel,
    ) -> WizardResult<WizardDraft> {
        validate_step(step, draft)?;

        let target = step.target_status();
        let status_plan = match draft.job_id() {
            Some(_) => plan_status_update(draft.status(), target)?,
            None if step == WizardStep::JobDetails => StatusUpdate::Advance(target),
            None => return Err(WizardError::JobNotCreated),
        };

        let mutations = plan_mutations(draft, step);
        info!(
            calls = mutations.len(),
            status = ?status_plan,
            "提交步骤"
        );

        let journal = Mutex::new(Journal::default());
        let batch = self.run_batch(draft, &mutations, status_plan, &journal);
        let guarded = Abortable::new(batch, cancel.take_registration());
        let timeout = self.settings.commit_timeout();

        let failure = match tokio::time::timeout(timeout, guarded).await {
            Ok(Ok(Ok(outcome))) => return self.finish(draft, step, outcome),
            Ok(Ok(Err(source))) => Failure::Backend(source),
            Ok(Err(Aborted)) => Failure::Cancelled,
            Err(_) => Failure::TimedOut,
        };

        let (job_id, inverses) = Self::take_journal(draft, journal);
        let compensated = self.compensate(job_id, inverses).await;

        Err(match failure {
            Failure::Backend(source) => {
                warn!(error = %source, compensated, "步骤提交失败");
                WizardError::Commit {
                    step,
                    source,
                    compensated,
                }
            }
            Failure::Cancelled => {
                warn!(compensated, "步骤提交已取消");
                WizardError::Cancelled { step, compensated }
            }
            Failure::TimedOut => {
                warn!(timeout_ms = self.settings.commit_timeout_ms, compensated, "步骤提交超时");
                WizardError::Timeout {
                    step,
                    timeout_ms: self.settings.commit_timeout_ms,
                    compensated,
                }
            }
        })
    }

    /// 批次本体: [创建作业] → 并发修改 → [状态更新]
    async fn run_batch(
        &self,
        draft: &WizardDraft,
        mutations: &[StepMutation],
        status_plan: StatusUpdate,
        journal: &Mutex<Journal>,
    ) -> RepositoryResult<BatchOutcome> {
        let store = self.store.as_ref();

        let (job_id, mut job) = match draft.job_id() {
            Some(id) => (id, None),
            None => {
                let created = store.create_job(&draft.create_request()).await?;
                info!(job_id = created.id, "作业已创建");
                if let Ok(mut entries) = journal.lock() {
                    entries.created_job = Some(created.id);
                }
                (created.id, Some(created))
            }
        };

        let results = join_all(mutations.iter().enumerate().map(|(position, mutation)| async move {
            let result = mutation.apply(store, job_id).await;
            if let Ok(output) = &result {
                match mutation.inverse(output, draft) {
                    Some(inverse) => record(journal, position, inverse),
                    None if matches!(mutation, StepMutation::SetWeekResource(_)) => {
                        debug!(job_id, call = mutation.label(), "无基线值，无法补偿")
                    }
                    None => {}
                }
            }
            result
        }))
        .await;

        let mut demands = Vec::new();
        let mut deadlines = Vec::new();
        let mut first_error = None;
        for result in results {
            match result {
                Ok(MutationOutput::Job(updated)) => job = Some(updated),
                Ok(MutationOutput::Demand(entry)) => demands.push(entry),
                Ok(MutationOutput::Deadline(entry)) => deadlines.push(entry),
                Ok(MutationOutput::Unit) => {}
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        if let StatusUpdate::Advance(status) = status_plan {
            job = Some(store.update_status(job_id, status).await?);
        }

        Ok(BatchOutcome {
            job_id,
            job,
            demands,
            deadlines,
        })
    }

    fn finish(&self, draft: &WizardDraft, step: WizardStep, outcome: BatchOutcome) -> WizardResult<WizardDraft> {
        let job = outcome
            .job
            .or_else(|| draft.baseline().map(|b| b.job.clone()))
            .ok_or(WizardError::JobNotCreated)?;
        debug_assert_eq!(job.id, outcome.job_id);

        let (demands, deadlines) = if step == WizardStep::DemandsDeadlines {
            (
                Some(resolve_ids(draft.demands(), outcome.demands, |d| d.id)),
                Some(resolve_ids(draft.deadlines(), outcome.deadlines, |d| d.id)),
            )
        } else {
            (None, None)
        };

        info!(job_id = job.id, status = %job.status, "步骤提交成功");
        Ok(draft.committed(step, job, demands, deadlines))
    }

    /// 取出日志，按执行顺序排列（compensate 逆序执行，删除作业排在首位即最后执行）
    fn take_journal(draft: &WizardDraft, journal: Mutex<Journal>) -> (Option<JobId>, Vec<StepMutation>) {
        let journal = journal.into_inner().unwrap_or_default();
        let mut positioned = journal.inverses;
        positioned.sort_by_key(|(position, _)| *position);

        let mut inverses = Vec::with_capacity(positioned.len() + 1);
        if journal.created_job.is_some() {
            inverses.push(StepMutation::DeleteJob);
        }
        inverses.extend(positioned.into_iter().map(|(_, inverse)| inverse));
        (draft.job_id().or(journal.created_job), inverses)
    }

    /// 按逆序执行补偿；存在已生效修改且全部撤销成功时返回 true
    async fn compensate(&self, job_id: Option<JobId>, inverses: Vec<StepMutation>) -> bool {
        if inverses.is_empty() {
            return false;
        }
        let Some(job_id) = job_id else {
            return false;
        };
        if !self.settings.compensate_on_failure {
            warn!(job_id, pending = inverses.len(), "补偿已关闭，已生效的修改保留");
            return false;
        }

        let mut all_ok = true;
        for inverse in inverses.into_iter().rev() {
            if let Err(e) = inverse.apply(self.store.as_ref(), job_id).await {
                warn!(job_id, call = inverse.label(), error = %e, "补偿调用失败");
                all_ok = false;
            }
        }
        info!(job_id, all_ok, "补偿完成");
        all_ok
    }
}

enum Failure {
    Backend(RepositoryError),
    Cancelled,
    TimedOut,
}

/// 用后端返回的条目回填草稿中尚无ID的条目（按出现顺序一一对应）
fn resolve_ids<T: Copy>(current: &[T], created: Vec<T>, id_of: impl Fn(&T) -> Option<i64>) -> Vec<T> {
    let mut created = created.into_iter();
    current
        .iter()
        .map(|entry| match id_of(entry) {
            Some(_) => *entry,
            None => created.next().unwrap_or(*entry),
        })
        .collect()
}

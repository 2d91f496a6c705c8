// ==========================================
// 任务规划控制台 - 作业配置向导 API
// ==========================================
// 职责: 管理向导会话（打开/编辑/导航/提交/取消/运行/关闭）
// 约束:
// - 每个会话同一时刻只允许一个提交，提交进行中拒绝编辑与导航
// - 取消只作用于正在进行的提交
// ==========================================

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::api::draft_edit::DraftEdit;
use crate::api::error::{ApiError, ApiResult};
use crate::config::WizardSettings;
use crate::domain::catalog::Catalog;
use crate::domain::job::RunResult;
use crate::domain::mission::Mission;
use crate::domain::types::{JobId, MissionId, WizardStep};
use crate::engine::commit::CommitCancel;
use crate::engine::draft::WizardDraft;
use crate::engine::wizard::{JobWizard, StepOutcome};
use crate::i18n::step_label;
use crate::repository::catalog_client::EntityCatalogClient;
use crate::repository::job_store::JobDraftStore;

// ==========================================
// 视图 DTO
// ==========================================

/// 向导当前状态快照（返回给界面）
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub session_id: Uuid,
    pub current_step: WizardStep,
    pub step_number: u8,
    pub step_label: String,
    pub furthest_step: WizardStep,
    pub can_advance: bool,
    /// 当前步骤不能提交的原因
    pub validation_message: Option<String>,
    pub last_error: Option<String>,
    pub finished: bool,
    pub draft: WizardDraft,
    pub last_run: Option<RunResult>,
}

impl WizardView {
    fn of(session_id: Uuid, wizard: &JobWizard) -> Self {
        let step = wizard.current_step();
        Self {
            session_id,
            current_step: step,
            step_number: step.number(),
            step_label: step_label(step),
            furthest_step: wizard.furthest_step(),
            can_advance: wizard.can_advance(),
            validation_message: wizard.validation().err().map(|f| f.user_message()),
            last_error: wizard.last_error().map(str::to_string),
            finished: wizard.is_finished(),
            draft: wizard.draft().clone(),
            last_run: wizard.last_run().cloned(),
        }
    }
}

/// next() 的返回
#[derive(Debug, Clone, Serialize)]
pub struct NextResponse {
    pub view: WizardView,
    /// 第6步触发运行时的结果
    pub run: Option<RunResult>,
}

// ==========================================
// 会话
// ==========================================

#[derive(Clone)]
struct SessionEntry {
    wizard: Arc<tokio::sync::Mutex<JobWizard>>,
    /// 正在进行的提交的取消句柄
    in_flight: Arc<Mutex<Option<CommitCancel>>>,
}

// ==========================================
// WizardApi
// ==========================================
pub struct WizardApi {
    catalog_client: Arc<dyn EntityCatalogClient>,
    store: Arc<dyn JobDraftStore>,
    settings: WizardSettings,
    sessions: Mutex<HashMap<Uuid, SessionEntry>>,
}

impl WizardApi {
    pub fn new(
        catalog_client: Arc<dyn EntityCatalogClient>,
        store: Arc<dyn JobDraftStore>,
        settings: WizardSettings,
    ) -> Self {
        Self {
            catalog_client,
            store,
            settings,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &WizardSettings {
        &self.settings
    }

    fn sessions(&self) -> ApiResult<std::sync::MutexGuard<'_, HashMap<Uuid, SessionEntry>>> {
        self.sessions
            .lock()
            .map_err(|e| ApiError::InternalError(format!("会话表锁获取失败: {}", e)))
    }

    fn register(&self, wizard: JobWizard) -> ApiResult<WizardView> {
        let session_id = Uuid::new_v4();
        let view = WizardView::of(session_id, &wizard);
        self.sessions()?.insert(
            session_id,
            SessionEntry {
                wizard: Arc::new(tokio::sync::Mutex::new(wizard)),
                in_flight: Arc::new(Mutex::new(None)),
            },
        );
        info!(%session_id, step = view.step_number, "向导会话已创建");
        Ok(view)
    }

    fn entry(&self, session_id: Uuid) -> ApiResult<SessionEntry> {
        self.sessions()?
            .get(&session_id)
            .cloned()
            .ok_or_else(|| ApiError::session_not_found(session_id))
    }

    /// 取得会话中的向导；提交进行中时返回 CommitInFlight
    fn lock_idle(
        entry: &SessionEntry,
    ) -> ApiResult<tokio::sync::OwnedMutexGuard<JobWizard>> {
        entry
            .wizard
            .clone()
            .try_lock_owned()
            .map_err(|_| ApiError::commit_in_flight())
    }

    /// 登记本次提交的取消句柄
    fn begin_commit(entry: &SessionEntry) -> CommitCancel {
        let cancel = CommitCancel::new();
        if let Ok(mut slot) = entry.in_flight.lock() {
            *slot = Some(cancel.clone());
        }
        cancel
    }

    fn end_commit(entry: &SessionEntry) {
        if let Ok(mut slot) = entry.in_flight.lock() {
            *slot = None;
        }
    }

    /// 可选任务列表（新建作业入口）
    pub async fn list_missions(&self) -> ApiResult<Vec<Mission>> {
        Ok(self.catalog_client.list_missions().await?)
    }

    // ==========================================
    // 打开/关闭
    // ==========================================

    /// 为任务新建作业
    #[instrument(skip(self))]
    pub async fn open_new(&self, mission_id: MissionId) -> ApiResult<WizardView> {
        let wizard = JobWizard::open_new(
            self.catalog_client.clone(),
            self.store.clone(),
            self.settings.clone(),
            mission_id,
        )
        .await?;
        self.register(wizard)
    }

    /// 继续配置已有作业
    #[instrument(skip(self))]
    pub async fn open_existing(&self, job_id: JobId) -> ApiResult<WizardView> {
        let wizard = JobWizard::open_existing(
            self.catalog_client.clone(),
            self.store.clone(),
            self.settings.clone(),
            job_id,
        )
        .await?;
        self.register(wizard)
    }

    /// 关闭会话（提交进行中时先取消）
    pub fn close(&self, session_id: Uuid) -> ApiResult<()> {
        let entry = self
            .sessions()?
            .remove(&session_id)
            .ok_or_else(|| ApiError::session_not_found(session_id))?;
        if let Ok(slot) = entry.in_flight.lock() {
            if let Some(cancel) = slot.as_ref() {
                cancel.cancel();
            }
        }
        info!(%session_id, "向导会话已关闭");
        Ok(())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn view(&self, session_id: Uuid) -> ApiResult<WizardView> {
        let entry = self.entry(session_id)?;
        let wizard = Self::lock_idle(&entry)?;
        Ok(WizardView::of(session_id, &wizard))
    }

    pub fn catalog(&self, session_id: Uuid) -> ApiResult<Catalog> {
        let entry = self.entry(session_id)?;
        let wizard = Self::lock_idle(&entry)?;
        Ok(wizard.catalog().clone())
    }

    // ==========================================
    // 编辑/导航
    // ==========================================

    pub fn edit(&self, session_id: Uuid, edit: DraftEdit) -> ApiResult<WizardView> {
        let entry = self.entry(session_id)?;
        let mut wizard = Self::lock_idle(&entry)?;
        debug!(%session_id, ?edit, "编辑草稿");
        wizard.edit(|draft, catalog| edit.apply(draft, catalog))?;
        Ok(WizardView::of(session_id, &wizard))
    }

    pub fn back(&self, session_id: Uuid) -> ApiResult<WizardView> {
        let entry = self.entry(session_id)?;
        let mut wizard = Self::lock_idle(&entry)?;
        wizard.back();
        Ok(WizardView::of(session_id, &wizard))
    }

    pub fn go_to(&self, session_id: Uuid, step: WizardStep) -> ApiResult<WizardView> {
        let entry = self.entry(session_id)?;
        let mut wizard = Self::lock_idle(&entry)?;
        wizard.go_to(step)?;
        Ok(WizardView::of(session_id, &wizard))
    }

    // ==========================================
    // 提交/运行
    // ==========================================

    /// 提交当前步骤并前进（在复核步骤上触发运行）
    #[instrument(skip(self))]
    pub async fn next(&self, session_id: Uuid) -> ApiResult<NextResponse> {
        let entry = self.entry(session_id)?;
        let mut wizard = Self::lock_idle(&entry)?;

        let cancel = Self::begin_commit(&entry);
        let outcome = wizard.next_with_cancel(&cancel).await;
        Self::end_commit(&entry);

        let run = match outcome? {
            StepOutcome::Advanced(_) => None,
            StepOutcome::Ran(result) => Some(result),
        };
        Ok(NextResponse {
            view: WizardView::of(session_id, &wizard),
            run,
        })
    }

    /// 取消正在进行的提交；没有进行中的提交时返回 false
    pub fn cancel_commit(&self, session_id: Uuid) -> ApiResult<bool> {
        let entry = self.entry(session_id)?;
        let slot = entry
            .in_flight
            .lock()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        match slot.as_ref() {
            Some(cancel) => {
                cancel.cancel();
                info!(%session_id, "已请求取消提交");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// 在复核步骤上提交并触发运行
    #[instrument(skip(self))]
    pub async fn run(&self, session_id: Uuid) -> ApiResult<NextResponse> {
        let entry = self.entry(session_id)?;
        let mut wizard = Self::lock_idle(&entry)?;

        let cancel = Self::begin_commit(&entry);
        let result = wizard.run_with_cancel(&cancel).await;
        Self::end_commit(&entry);

        let result = result?;
        Ok(NextResponse {
            view: WizardView::of(session_id, &wizard),
            run: Some(result),
        })
    }
}

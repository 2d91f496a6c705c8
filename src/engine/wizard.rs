// ==========================================
// 任务规划控制台 - 作业配置向导状态机
// ==========================================
// 步骤 ↔ 状态:
//   1 作业信息   → draft
//   2 实体选择   → entities_config
//   3 初始库存   → inventory_config
//   4 需求/截止  → demands_config
//   5 周资源     → resources_config
//   6 复核运行   → ready → run
// ==========================================
// 约束:
// - 打开向导时目录六个列表并发加载，任一失败则整体失败
// - 提交失败时停留在当前步骤，草稿不变
// - 同一时刻只有一个提交在进行（&mut self）
// ==========================================

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::config::WizardSettings;
use crate::domain::catalog::Catalog;
use crate::domain::job::RunResult;
use crate::domain::mission::Mission;
use crate::domain::types::{JobId, MissionId, WizardStep};
use crate::engine::commit::{CommitCancel, StepCommitter};
use crate::engine::draft::{DraftError, WizardDraft};
use crate::engine::error::{WizardError, WizardResult};
use crate::engine::run_trigger::RunTrigger;
use crate::engine::validators::{validate_step, ValidationFailure};
use crate::repository::catalog_client::EntityCatalogClient;
use crate::repository::error::RepositoryResult;
use crate::repository::job_store::JobDraftStore;

/// 并发加载六个目录列表
pub async fn load_catalog(client: &dyn EntityCatalogClient) -> RepositoryResult<Catalog> {
    let (materials, methods, outputs, items, substitutes, missions) = tokio::try_join!(
        client.list_materials(),
        client.list_methods(),
        client.list_outputs(),
        client.list_items(),
        client.list_substitutes(),
        client.list_missions(),
    )?;

    Ok(Catalog {
        materials,
        methods,
        outputs,
        items,
        substitutes,
        missions,
    })
}

/// next() 的结果
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// 已提交并前进到该步骤
    Advanced(WizardStep),
    /// 第6步提交并触发运行
    Ran(RunResult),
}

pub struct JobWizard {
    catalog_client: Arc<dyn EntityCatalogClient>,
    committer: StepCommitter,
    run_trigger: RunTrigger,
    catalog: Arc<Catalog>,
    mission: Option<Mission>,
    draft: WizardDraft,
    current_step: WizardStep,
    furthest_step: WizardStep,
    last_error: Option<String>,
    last_run: Option<RunResult>,
    finished: bool,
}

impl JobWizard {
    fn assemble(
        catalog_client: Arc<dyn EntityCatalogClient>,
        store: Arc<dyn JobDraftStore>,
        settings: WizardSettings,
        catalog: Catalog,
        mission: Option<Mission>,
        draft: WizardDraft,
    ) -> Self {
        let current_step = WizardStep::for_status(draft.status());
        let run_trigger = RunTrigger::new(store.clone(), settings.run_timeout());

        Self {
            catalog_client,
            committer: StepCommitter::new(store, settings),
            run_trigger,
            catalog: Arc::new(catalog),
            mission,
            draft,
            current_step,
            furthest_step: current_step,
            last_error: None,
            last_run: None,
            finished: false,
        }
    }

    /// 为任务新建作业打开向导（步骤1，周资源按任务默认值预置）
    #[instrument(skip(catalog_client, store, settings))]
    pub async fn open_new(
        catalog_client: Arc<dyn EntityCatalogClient>,
        store: Arc<dyn JobDraftStore>,
        settings: WizardSettings,
        mission_id: MissionId,
    ) -> WizardResult<Self> {
        let catalog = load_catalog(catalog_client.as_ref())
            .await
            .map_err(WizardError::CatalogLoad)?;

        let mission = match catalog.find_mission(mission_id) {
            Some(mission) => mission.clone(),
            None => catalog_client
                .get_mission(mission_id)
                .await
                .map_err(WizardError::CatalogLoad)?,
        };

        let draft = WizardDraft::new(&mission, &settings);
        info!(mission_id, weeks = draft.details().total_weeks, "向导已打开（新建作业）");
        Ok(Self::assemble(
            catalog_client,
            store,
            settings,
            catalog,
            Some(mission),
            draft,
        ))
    }

    /// 对已有作业重新打开向导（当前步骤由作业状态查表得出）
    #[instrument(skip(catalog_client, store, settings))]
    pub async fn open_existing(
        catalog_client: Arc<dyn EntityCatalogClient>,
        store: Arc<dyn JobDraftStore>,
        settings: WizardSettings,
        job_id: JobId,
    ) -> WizardResult<Self> {
        let (catalog, config) = tokio::try_join!(
            async {
                load_catalog(catalog_client.as_ref())
                    .await
                    .map_err(WizardError::CatalogLoad)
            },
            async {
                store
                    .get_job_configuration(job_id)
                    .await
                    .map_err(WizardError::Load)
            },
        )?;

        let mission_id = config.job.mission_id;
        let mission = match catalog.find_mission(mission_id) {
            Some(mission) => Some(mission.clone()),
            None => match catalog_client.get_mission(mission_id).await {
                Ok(mission) => Some(mission),
                Err(e) => {
                    warn!(mission_id, error = %e, "任务信息不可用，周资源使用回退默认值");
                    None
                }
            },
        };

        let draft = WizardDraft::from_configuration(config, mission.as_ref(), &settings);
        let wizard = Self::assemble(catalog_client, store, settings, catalog, mission, draft);
        info!(
            job_id,
            status = %wizard.draft.status(),
            step = wizard.current_step.number(),
            "向导已打开（已有作业）"
        );
        Ok(wizard)
    }

    // ==========================================
    // 只读访问
    // ==========================================

    pub fn current_step(&self) -> WizardStep {
        self.current_step
    }

    pub fn furthest_step(&self) -> WizardStep {
        self.furthest_step
    }

    pub fn draft(&self) -> &WizardDraft {
        &self.draft
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn mission(&self) -> Option<&Mission> {
        self.mission.as_ref()
    }

    /// 最近一次失败的用户提示（成功提交后清除）
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_run(&self) -> Option<&RunResult> {
        self.last_run.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// 当前步骤能否提交
    pub fn validation(&self) -> Result<(), ValidationFailure> {
        validate_step(self.current_step, &self.draft)
    }

    pub fn can_advance(&self) -> bool {
        self.validation().is_ok()
    }

    // ==========================================
    // 编辑
    // ==========================================

    /// 以编辑函数生成新草稿并整体替换；失败时草稿不变
    pub fn edit<F>(&mut self, f: F) -> WizardResult<()>
    where
        F: FnOnce(&WizardDraft, &Catalog) -> Result<WizardDraft, DraftError>,
    {
        match f(&self.draft, &self.catalog) {
            Ok(next) => {
                self.draft = next;
                Ok(())
            }
            Err(e) => Err(WizardError::Draft(e)),
        }
    }

    // ==========================================
    // 导航
    // ==========================================

    /// 提交当前步骤并前进；第6步提交后触发运行
    pub async fn next(&mut self) -> WizardResult<StepOutcome> {
        self.next_with_cancel(&CommitCancel::new()).await
    }

    pub async fn next_with_cancel(&mut self, cancel: &CommitCancel) -> WizardResult<StepOutcome> {
        if self.current_step == WizardStep::Review {
            return self.run_with_cancel(cancel).await.map(StepOutcome::Ran);
        }

        let step = self.current_step;
        let committed = self
            .committer
            .commit_step_with_cancel(&self.draft, step, cancel)
            .await;

        match committed {
            Ok(next_draft) => {
                self.draft = next_draft;
                let next_step = step.next().unwrap_or(WizardStep::Review);
                self.current_step = next_step;
                self.furthest_step = self.furthest_step.max(next_step);
                self.last_error = None;
                Ok(StepOutcome::Advanced(next_step))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// 返回上一步（不发起调用）
    pub fn back(&mut self) -> WizardStep {
        if let Some(prev) = self.current_step.prev() {
            self.current_step = prev;
        }
        self.current_step
    }

    /// 跳转到已到达过的步骤
    pub fn go_to(&mut self, step: WizardStep) -> WizardResult<()> {
        if step > self.furthest_step {
            return Err(WizardError::StepNotReached {
                requested: step,
                furthest: self.furthest_step,
            });
        }
        self.current_step = step;
        Ok(())
    }

    // ==========================================
    // 运行
    // ==========================================

    /// 提交第6步（状态 → ready）后触发运行
    pub async fn run(&mut self) -> WizardResult<RunResult> {
        self.run_with_cancel(&CommitCancel::new()).await
    }

    pub async fn run_with_cancel(&mut self, cancel: &CommitCancel) -> WizardResult<RunResult> {
        if self.current_step != WizardStep::Review {
            return Err(self.fail(WizardError::NotAtReview));
        }

        match self
            .committer
            .commit_step_with_cancel(&self.draft, WizardStep::Review, cancel)
            .await
        {
            Ok(next_draft) => self.draft = next_draft,
            Err(e) => return Err(self.fail(e)),
        }

        let job_id = match self.draft.job_id() {
            Some(id) => id,
            None => return Err(self.fail(WizardError::JobNotCreated)),
        };

        match self.run_trigger.run(job_id).await {
            Ok(result) => {
                self.finished = true;
                self.last_error = None;
                self.last_run = Some(result.clone());
                Ok(result)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// 重新加载目录（目录在会话期间被外部修改时使用）
    pub async fn reload_catalog(&mut self) -> WizardResult<()> {
        let catalog = load_catalog(self.catalog_client.as_ref())
            .await
            .map_err(WizardError::CatalogLoad)?;
        self.catalog = Arc::new(catalog);
        Ok(())
    }

    fn fail(&mut self, err: WizardError) -> WizardError {
        self.last_error = Some(err.user_message());
        err
    }
}

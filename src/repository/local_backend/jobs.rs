// ==========================================
// 本地后端 - 作业生命周期 + JobDraftStore 实现
// ==========================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::LocalBackend;
use crate::domain::job::{
    CreateJobRequest, DeadlineEntry, DemandEntry, Job, JobConfiguration, JobDetailsUpdate,
    JobParameters, MethodCapacity, ObjectiveWeights, RunResult, WeekResource,
};
use crate::domain::types::{EntityId, EntityKind, JobId, JobStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::job_store::JobDraftStore;

const JOB_COLUMNS: &str = r#"
    job_id, mission_id, status, total_weeks, weights_json, name, description,
    result_summary_json, result_bundle_json, solver_status,
    created_at, started_at, completed_at, error_message
"#;

/// 行映射中间结构（JSON 列在锁外解析）
struct JobRow {
    job_id: JobId,
    mission_id: i64,
    status: String,
    total_weeks: u32,
    weights_json: String,
    name: String,
    description: Option<String>,
    result_summary_json: Option<String>,
    result_bundle_json: Option<String>,
    solver_status: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

fn map_job_row(row: &Row) -> rusqlite::Result<JobRow> {
    Ok(JobRow {
        job_id: row.get(0)?,
        mission_id: row.get(1)?,
        status: row.get(2)?,
        total_weeks: row.get(3)?,
        weights_json: row.get(4)?,
        name: row.get(5)?,
        description: row.get(6)?,
        result_summary_json: row.get(7)?,
        result_bundle_json: row.get(8)?,
        solver_status: row.get(9)?,
        created_at: row.get(10)?,
        started_at: row.get(11)?,
        completed_at: row.get(12)?,
        error_message: row.get(13)?,
    })
}

fn parse_json_column(raw: Option<String>) -> RepositoryResult<Option<serde_json::Value>> {
    raw.map(|s| serde_json::from_str(&s))
        .transpose()
        .map_err(|e| RepositoryError::Decode(e.to_string()))
}

impl TryFrom<JobRow> for Job {
    type Error = RepositoryError;

    fn try_from(row: JobRow) -> RepositoryResult<Self> {
        let weights: ObjectiveWeights = serde_json::from_str(&row.weights_json)
            .map_err(|e| RepositoryError::Decode(format!("weights_json: {}", e)))?;

        Ok(Job {
            id: row.job_id,
            mission_id: row.mission_id,
            status: JobStatus::parse(&row.status),
            total_weeks: row.total_weeks,
            weights,
            parameters: JobParameters {
                name: row.name,
                description: row.description,
            },
            result_summary: parse_json_column(row.result_summary_json)?,
            result_bundle: parse_json_column(row.result_bundle_json)?,
            solver_status: row.solver_status,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            error_message: row.error_message,
        })
    }
}

/// 在已持有的连接上查询作业
pub(super) fn find_job(conn: &Connection, job_id: JobId) -> RepositoryResult<Job> {
    let sql = format!("SELECT {} FROM job WHERE job_id = ?1", JOB_COLUMNS);
    let row = conn
        .query_row(&sql, params![job_id], map_job_row)
        .optional()?
        .ok_or_else(|| RepositoryError::not_found("Job", job_id))?;
    Job::try_from(row)
}

fn validate_details(total_weeks: u32, weights: &ObjectiveWeights, name: &str) -> RepositoryResult<()> {
    if total_weeks == 0 {
        return Err(RepositoryError::ValidationError(
            "total_weeks 必须大于 0".to_string(),
        ));
    }
    if let Some(field) = weights.first_invalid() {
        return Err(RepositoryError::ValidationError(format!(
            "目标权重 {} 必须为非负数",
            field
        )));
    }
    if name.trim().is_empty() {
        return Err(RepositoryError::ValidationError("作业名称不能为空".to_string()));
    }
    Ok(())
}

impl LocalBackend {
    fn insert_job(&self, request: &CreateJobRequest) -> RepositoryResult<Job> {
        validate_details(request.total_weeks, &request.weights, &request.parameters.name)?;
        let weights_json = serde_json::to_string(&request.weights)
            .map_err(|e| RepositoryError::InternalError(e.to_string()))?;

        let conn = self.get_conn()?;
        let mission_exists: bool = conn
            .query_row(
                "SELECT 1 FROM mission WHERE mission_id = ?1",
                params![request.mission_id],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if !mission_exists {
            return Err(RepositoryError::not_found("Mission", request.mission_id));
        }

        conn.execute(
            r#"
            INSERT INTO job (mission_id, status, total_weeks, weights_json, name, description, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                request.mission_id,
                JobStatus::Draft.as_str(),
                request.total_weeks,
                weights_json,
                request.parameters.name,
                request.parameters.description,
                Utc::now(),
            ],
        )?;
        let job_id = conn.last_insert_rowid();
        find_job(&conn, job_id)
    }

    fn load_job(&self, job_id: JobId) -> RepositoryResult<Job> {
        let conn = self.get_conn()?;
        find_job(&conn, job_id)
    }

    fn update_details(&self, job_id: JobId, update: &JobDetailsUpdate) -> RepositoryResult<Job> {
        validate_details(update.total_weeks, &update.weights, &update.parameters.name)?;
        let weights_json = serde_json::to_string(&update.weights)
            .map_err(|e| RepositoryError::InternalError(e.to_string()))?;

        let conn = self.get_conn()?;
        let changed = conn.execute(
            r#"
            UPDATE job
            SET total_weeks = ?2, weights_json = ?3, name = ?4, description = ?5
            WHERE job_id = ?1
            "#,
            params![
                job_id,
                update.total_weeks,
                weights_json,
                update.parameters.name,
                update.parameters.description,
            ],
        )?;
        if changed == 0 {
            return Err(RepositoryError::not_found("Job", job_id));
        }
        find_job(&conn, job_id)
    }

    fn remove_job(&self, job_id: JobId) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let changed = conn.execute("DELETE FROM job WHERE job_id = ?1", params![job_id])?;
        if changed == 0 {
            return Err(RepositoryError::not_found("Job", job_id));
        }
        Ok(())
    }

    /// 状态写入（后端不校验转换合法性，最后写入者生效）
    fn write_status(&self, job_id: JobId, status: JobStatus) -> RepositoryResult<Job> {
        if status == JobStatus::Unknown {
            return Err(RepositoryError::ValidationError(
                "不能将作业状态设置为 unknown".to_string(),
            ));
        }

        let conn = self.get_conn()?;
        let completed_at = if status.is_terminal() { Some(Utc::now()) } else { None };
        let changed = conn.execute(
            "UPDATE job SET status = ?2, completed_at = COALESCE(?3, completed_at) WHERE job_id = ?1",
            params![job_id, status.as_str(), completed_at],
        )?;
        if changed == 0 {
            return Err(RepositoryError::not_found("Job", job_id));
        }
        find_job(&conn, job_id)
    }

    /// 运行请求：仅 ready 状态可被接受，拒绝时状态保持不变
    fn submit_run(&self, job_id: JobId) -> RepositoryResult<RunResult> {
        let conn = self.get_conn()?;
        let job = find_job(&conn, job_id)?;

        if job.status != JobStatus::Ready {
            return Ok(RunResult {
                success: false,
                message: format!("作业状态为 {}，只有 ready 状态的作业可以运行", job.status),
            });
        }

        conn.execute(
            "UPDATE job SET status = ?2, started_at = ?3, error_message = NULL WHERE job_id = ?1",
            params![job_id, JobStatus::Pending.as_str(), Utc::now()],
        )?;

        Ok(RunResult {
            success: true,
            message: format!("作业 {} 已提交求解器", job_id),
        })
    }

    fn load_configuration(&self, job_id: JobId) -> RepositoryResult<JobConfiguration> {
        let conn = self.get_conn()?;
        let job = find_job(&conn, job_id)?;

        Ok(JobConfiguration {
            enabled: super::facets::load_enabled(&conn, job_id)?,
            inventories: super::facets::load_inventories(&conn, job_id)?,
            demands: super::facets::load_demands(&conn, job_id)?,
            deadlines: super::facets::load_deadlines(&conn, job_id)?,
            week_resources: super::facets::load_week_resources(&conn, job_id)?,
            method_capacities: super::facets::load_method_capacities(&conn, job_id)?,
            job,
        })
    }
}

#[async_trait]
impl JobDraftStore for LocalBackend {
    async fn create_job(&self, request: &CreateJobRequest) -> RepositoryResult<Job> {
        self.insert_job(request)
    }

    async fn get_job(&self, job_id: JobId) -> RepositoryResult<Job> {
        self.load_job(job_id)
    }

    async fn get_job_configuration(&self, job_id: JobId) -> RepositoryResult<JobConfiguration> {
        self.load_configuration(job_id)
    }

    async fn update_job_details(
        &self,
        job_id: JobId,
        update: &JobDetailsUpdate,
    ) -> RepositoryResult<Job> {
        self.update_details(job_id, update)
    }

    async fn delete_job(&self, job_id: JobId) -> RepositoryResult<()> {
        self.remove_job(job_id)
    }

    async fn update_status(&self, job_id: JobId, status: JobStatus) -> RepositoryResult<Job> {
        self.write_status(job_id, status)
    }

    async fn run_job(&self, job_id: JobId) -> RepositoryResult<RunResult> {
        self.submit_run(job_id)
    }

    async fn enable_entities(
        &self,
        job_id: JobId,
        kind: EntityKind,
        entity_ids: &[EntityId],
    ) -> RepositoryResult<()> {
        self.write_enabled(job_id, kind, entity_ids, true)
    }

    async fn disable_entities(
        &self,
        job_id: JobId,
        kind: EntityKind,
        entity_ids: &[EntityId],
    ) -> RepositoryResult<()> {
        self.write_enabled(job_id, kind, entity_ids, false)
    }

    async fn set_inventory(
        &self,
        job_id: JobId,
        kind: EntityKind,
        entity_id: EntityId,
        quantity: f64,
    ) -> RepositoryResult<()> {
        self.write_inventory(job_id, kind, entity_id, quantity)
    }

    async fn add_item_demand(
        &self,
        job_id: JobId,
        entry: &DemandEntry,
    ) -> RepositoryResult<DemandEntry> {
        let entry_id = self.insert_week_entry("job_item_demand", job_id, entry.item_id, entry.week, entry.amount)?;
        Ok(DemandEntry {
            id: Some(entry_id),
            ..*entry
        })
    }

    async fn remove_item_demand(&self, job_id: JobId, entry_id: i64) -> RepositoryResult<()> {
        self.delete_week_entry("job_item_demand", job_id, entry_id)
    }

    async fn add_deadline(
        &self,
        job_id: JobId,
        entry: &DeadlineEntry,
    ) -> RepositoryResult<DeadlineEntry> {
        let entry_id = self.insert_week_entry("job_deadline", job_id, entry.item_id, entry.week, entry.amount)?;
        Ok(DeadlineEntry {
            id: Some(entry_id),
            ..*entry
        })
    }

    async fn remove_deadline(&self, job_id: JobId, entry_id: i64) -> RepositoryResult<()> {
        self.delete_week_entry("job_deadline", job_id, entry_id)
    }

    async fn set_week_resources(
        &self,
        job_id: JobId,
        resource: &WeekResource,
    ) -> RepositoryResult<()> {
        self.write_week_resource(job_id, resource)
    }

    async fn remove_week_resource(&self, job_id: JobId, week: u32) -> RepositoryResult<()> {
        self.delete_week_resource(job_id, week)
    }

    async fn set_method_capacity(
        &self,
        job_id: JobId,
        capacity: &MethodCapacity,
    ) -> RepositoryResult<()> {
        self.write_method_capacity(job_id, capacity)
    }

    async fn remove_method_capacity(
        &self,
        job_id: JobId,
        method_id: EntityId,
        week: u32,
    ) -> RepositoryResult<()> {
        self.delete_method_capacity(job_id, method_id, week)
    }
}

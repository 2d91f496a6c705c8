// ==========================================
// 任务规划控制台 - 本地 SQLite 后端
// ==========================================
// 职责: 以 rusqlite 实现目录读取与作业草稿存储两个接口
// 用途: 离线模式 / 命令行默认模式 / 集成测试
// 红线: 与远程 REST 后端保持相同的资源语义
// ==========================================

mod catalog;
mod facets;
mod jobs;

use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::db::{configure_sqlite_connection, ensure_schema, open_sqlite_connection};
use crate::domain::types::{EntityId, EntityKind, MissionId};
use crate::repository::error::{RepositoryError, RepositoryResult};

// ==========================================
// LocalBackend
// ==========================================
#[derive(Clone)]
pub struct LocalBackend {
    conn: Arc<Mutex<Connection>>,
}

impl LocalBackend {
    /// 打开（必要时创建）本地数据库
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 内存数据库（测试/演示）
    pub fn open_in_memory() -> RepositoryResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        configure_sqlite_connection(&conn)?;
        ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（对传入连接再次应用统一 PRAGMA 与建表，幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            ensure_schema(&guard)?;
        }
        Ok(Self { conn })
    }

    /// 共享连接（供 ConfigManager 读取 config_kv）
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 目录/任务录入
    // ==========================================
    // 任务与目录的维护界面不属于向导；这里仅提供最小录入能力

    /// 新增任务，返回任务ID
    pub fn insert_mission(
        &self,
        name: &str,
        duration_weeks: u32,
        crew_hours_per_week: f64,
        crew_count: u32,
    ) -> RepositoryResult<MissionId> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO mission (name, status, duration_weeks, crew_hours_per_week, crew_count)
            VALUES (?1, 'planning', ?2, ?3, ?4)
            "#,
            params![name, duration_weeks, crew_hours_per_week, crew_count],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 新增或覆盖目录实体
    pub fn upsert_catalog_entity(
        &self,
        kind: EntityKind,
        entity_id: EntityId,
        name: &str,
        category: &str,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO catalog_entity (entity_id, kind, name, category)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(kind, entity_id) DO UPDATE SET name = excluded.name, category = excluded.category
            "#,
            params![entity_id, kind.as_str(), name, category],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::{
        CreateJobRequest, DemandEntry, JobDetailsUpdate, JobParameters, MethodCapacity,
        ObjectiveWeights, WeekResource,
    };
    use crate::domain::types::JobStatus;
    use crate::repository::{EntityCatalogClient, JobDraftStore};

    fn seeded_backend() -> (LocalBackend, MissionId) {
        let backend = LocalBackend::open_in_memory().unwrap();
        let mission_id = backend.insert_mission("Ares", 4, 40.0, 3).unwrap();
        backend
            .upsert_catalog_entity(EntityKind::Material, 1, "Regolith", "raw")
            .unwrap();
        backend
            .upsert_catalog_entity(EntityKind::Method, 10, "Sintering", "thermal")
            .unwrap();
        backend
            .upsert_catalog_entity(EntityKind::Item, 20, "Brick", "structure")
            .unwrap();
        (backend, mission_id)
    }

    fn create_request(mission_id: MissionId) -> CreateJobRequest {
        CreateJobRequest {
            mission_id,
            total_weeks: 4,
            weights: ObjectiveWeights::default(),
            parameters: JobParameters {
                name: "Ares Recycling Run".to_string(),
                description: None,
            },
        }
    }

    #[tokio::test]
    async fn test_catalog_reads() {
        let (backend, mission_id) = seeded_backend();

        let materials = backend.list_materials().await.unwrap();
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].kind, EntityKind::Material);
        assert!(backend.list_outputs().await.unwrap().is_empty());

        let mission = backend.get_mission(mission_id).await.unwrap();
        assert_eq!(mission.duration_weeks, 4);
        assert!(matches!(
            backend.get_mission(999).await,
            Err(RepositoryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_job_lifecycle_and_facets() {
        let (backend, mission_id) = seeded_backend();

        let job = backend.create_job(&create_request(mission_id)).await.unwrap();
        assert_eq!(job.status, JobStatus::Draft);

        // 启用幂等
        backend
            .enable_entities(job.id, EntityKind::Material, &[1])
            .await
            .unwrap();
        backend
            .enable_entities(job.id, EntityKind::Material, &[1])
            .await
            .unwrap();
        // 目录中不存在的实体不可启用
        assert!(backend
            .enable_entities(job.id, EntityKind::Material, &[404])
            .await
            .is_err());

        backend
            .set_inventory(job.id, EntityKind::Material, 1, 12.5)
            .await
            .unwrap();
        let demand = backend
            .add_item_demand(
                job.id,
                &DemandEntry { id: None, item_id: 20, week: 2, amount: 3.0 },
            )
            .await
            .unwrap();
        assert!(demand.id.is_some());
        backend
            .set_week_resources(job.id, &WeekResource { week: 1, crew_hours: 40.0, energy: 100.0 })
            .await
            .unwrap();
        backend
            .set_method_capacity(
                job.id,
                &MethodCapacity { method_id: 10, week: 1, max_capacity_kg: 50.0, available: true },
            )
            .await
            .unwrap();

        let config = backend.get_job_configuration(job.id).await.unwrap();
        assert_eq!(config.enabled.total(), 1);
        assert_eq!(config.inventory_of(EntityKind::Material, 1), 12.5);
        assert_eq!(config.demands.len(), 1);
        assert_eq!(config.week_resources.len(), 1);
        assert_eq!(config.method_capacities.len(), 1);

        backend
            .remove_item_demand(job.id, demand.id.unwrap())
            .await
            .unwrap();
        backend
            .disable_entities(job.id, EntityKind::Material, &[1])
            .await
            .unwrap();
        let config = backend.get_job_configuration(job.id).await.unwrap();
        assert!(config.demands.is_empty());
        assert!(config.enabled.is_empty());
    }

    #[tokio::test]
    async fn test_inventory_requires_enabled_entity() {
        let (backend, mission_id) = seeded_backend();
        backend
            .upsert_catalog_entity(EntityKind::Material, 2, "Ice", "raw")
            .unwrap();
        let job = backend.create_job(&create_request(mission_id)).await.unwrap();
        backend
            .enable_entities(job.id, EntityKind::Material, &[1])
            .await
            .unwrap();

        let err = backend
            .set_inventory(job.id, EntityKind::Material, 2, 7.0)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError(_)));

        // 清零不要求启用
        backend
            .set_inventory(job.id, EntityKind::Material, 2, 0.0)
            .await
            .unwrap();
        let config = backend.get_job_configuration(job.id).await.unwrap();
        assert!(config.inventories.is_empty());
    }

    #[tokio::test]
    async fn test_remove_week_resource_ignores_horizon() {
        let (backend, mission_id) = seeded_backend();
        let job = backend.create_job(&create_request(mission_id)).await.unwrap();
        for week in 1..=4 {
            backend
                .set_week_resources(job.id, &WeekResource { week, crew_hours: 40.0, energy: 100.0 })
                .await
                .unwrap();
        }

        let update = JobDetailsUpdate {
            total_weeks: 2,
            weights: job.weights,
            parameters: job.parameters.clone(),
        };
        backend.update_job_details(job.id, &update).await.unwrap();
        assert!(backend
            .set_week_resources(job.id, &WeekResource { week: 3, crew_hours: 1.0, energy: 1.0 })
            .await
            .is_err());

        backend.remove_week_resource(job.id, 3).await.unwrap();
        backend.remove_week_resource(job.id, 4).await.unwrap();
        let config = backend.get_job_configuration(job.id).await.unwrap();
        let weeks: Vec<u32> = config.week_resources.iter().map(|r| r.week).collect();
        assert_eq!(weeks, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_run_requires_ready_status() {
        let (backend, mission_id) = seeded_backend();
        let job = backend.create_job(&create_request(mission_id)).await.unwrap();

        let rejected = backend.run_job(job.id).await.unwrap();
        assert!(!rejected.success);
        assert_eq!(backend.get_job(job.id).await.unwrap().status, JobStatus::Draft);

        backend.update_status(job.id, JobStatus::Ready).await.unwrap();
        let accepted = backend.run_job(job.id).await.unwrap();
        assert!(accepted.success);

        let job = backend.get_job(job.id).await.unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.started_at.is_some());
    }
}

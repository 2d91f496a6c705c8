// ==========================================
// 任务规划控制台 - 全局目录读取 Trait
// ==========================================
// 职责: 定义目录与任务元数据的只读访问接口
// 红线: 只读、无副作用，可并发调用
// ==========================================

use async_trait::async_trait;

use crate::domain::catalog::CatalogEntity;
use crate::domain::mission::Mission;
use crate::domain::types::MissionId;
use crate::repository::error::RepositoryResult;

// ==========================================
// EntityCatalogClient Trait
// ==========================================
// 实现者: HttpBackend（REST）/ LocalBackend（SQLite）
#[async_trait]
pub trait EntityCatalogClient: Send + Sync {
    async fn list_materials(&self) -> RepositoryResult<Vec<CatalogEntity>>;

    async fn list_methods(&self) -> RepositoryResult<Vec<CatalogEntity>>;

    async fn list_outputs(&self) -> RepositoryResult<Vec<CatalogEntity>>;

    async fn list_items(&self) -> RepositoryResult<Vec<CatalogEntity>>;

    async fn list_substitutes(&self) -> RepositoryResult<Vec<CatalogEntity>>;

    /// 查询单个任务
    ///
    /// # 返回
    /// - Err(NotFound): 任务不存在
    async fn get_mission(&self, mission_id: MissionId) -> RepositoryResult<Mission>;

    async fn list_missions(&self) -> RepositoryResult<Vec<Mission>>;
}

// ==========================================
// 任务规划控制台 - 数据仓储层
// ==========================================
// 红线: Repository 不含向导流程逻辑
// ==========================================
// 职责: 定义目录读取/作业草稿存储两个后端契约
// 实现: 本地 SQLite (rusqlite) / 远程 REST (reqwest)
// ==========================================

pub mod catalog_client;
pub mod error;
pub mod http_backend;
pub mod job_store;
pub mod local_backend;

// 重导出核心契约与实现
pub use catalog_client::EntityCatalogClient;
pub use error::{RepositoryError, RepositoryResult};
pub use http_backend::HttpBackend;
pub use job_store::JobDraftStore;
pub use local_backend::LocalBackend;

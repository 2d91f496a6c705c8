// ==========================================
// 任务规划控制台 - 远程 REST 后端
// ==========================================
// 职责: 以 reqwest 实现目录读取与作业草稿存储两个接口
// 约定: JSON 请求/响应体，HTTP 状态码表示错误
// ==========================================

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::domain::catalog::CatalogEntity;
use crate::domain::job::{
    CreateJobRequest, DeadlineEntry, DemandEntry, Job, JobConfiguration, JobDetailsUpdate,
    MethodCapacity, RunResult, WeekResource,
};
use crate::domain::mission::Mission;
use crate::domain::types::{EntityId, EntityKind, JobId, JobStatus, MissionId};
use crate::repository::catalog_client::EntityCatalogClient;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::job_store::JobDraftStore;

/// 默认单请求超时（毫秒）
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;

// ==========================================
// 请求/响应 DTO
// ==========================================

/// 目录条目（后端不返回种类，由调用路径决定）
#[derive(Debug, Deserialize)]
struct CatalogEntityDto {
    id: EntityId,
    name: String,
    #[serde(default)]
    category: String,
}

#[derive(Debug, Serialize)]
struct EntityIdsBody<'a> {
    ids: &'a [EntityId],
}

#[derive(Debug, Serialize)]
struct InventoryBody {
    entity_id: EntityId,
    quantity: f64,
}

#[derive(Debug, Serialize)]
struct StatusBody {
    status: JobStatus,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

// ==========================================
// 路径与错误映射（纯函数，便于单测）
// ==========================================

/// 实体种类对应的集合路径段
pub fn kind_segment(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Material => "materials",
        EntityKind::Method => "methods",
        EntityKind::Output => "outputs",
        EntityKind::Item => "items",
        EntityKind::Substitute => "substitutes",
    }
}

/// 从错误响应体提取可读消息（detail / message / error，均缺失时返回原文）
pub fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => {
            let detail = parsed.detail.map(|d| match d {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            });
            detail
                .or(parsed.message)
                .or(parsed.error)
                .unwrap_or_else(|| body.trim().to_string())
        }
        Err(_) => body.trim().to_string(),
    }
}

/// 将非 2xx 响应映射为仓储错误
pub fn map_error_status(status: StatusCode, path: &str, body: &str) -> RepositoryError {
    let message = extract_error_message(body);
    match status {
        StatusCode::NOT_FOUND => RepositoryError::NotFound {
            entity: path.to_string(),
            id: message,
        },
        StatusCode::CONFLICT => RepositoryError::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            RepositoryError::ValidationError(message)
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            RepositoryError::Timeout(message)
        }
        _ => RepositoryError::HttpStatus {
            status: status.as_u16(),
            message,
        },
    }
}

// ==========================================
// HttpBackend
// ==========================================
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// 创建 REST 后端客户端
    ///
    /// # 参数
    /// - base_url: 后端根地址（如 http://localhost:8000）
    /// - request_timeout: 单请求超时
    pub fn new(base_url: &str, request_timeout: Duration) -> RepositoryResult<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("mission-planner/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn send<B: Serialize + ?Sized + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> RepositoryResult<Response> {
        debug!(%method, path, "backend request");

        let mut request = self.client.request(method, self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(map_error_status(status, path, &body))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> RepositoryResult<T> {
        let response = self.send::<()>(Method::GET, path, None).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> RepositoryResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self.send(method, path, Some(body)).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_unit<B>(&self, method: Method, path: &str, body: Option<&B>) -> RepositoryResult<()>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.send(method, path, body).await?;
        Ok(())
    }

    async fn list_catalog(&self, kind: EntityKind) -> RepositoryResult<Vec<CatalogEntity>> {
        let path = format!("/{}", kind_segment(kind));
        let raw: Vec<CatalogEntityDto> = self.get_json(&path).await?;
        Ok(raw
            .into_iter()
            .map(|dto| CatalogEntity {
                id: dto.id,
                kind,
                name: dto.name,
                category: dto.category,
            })
            .collect())
    }
}

#[async_trait]
impl EntityCatalogClient for HttpBackend {
    async fn list_materials(&self) -> RepositoryResult<Vec<CatalogEntity>> {
        self.list_catalog(EntityKind::Material).await
    }

    async fn list_methods(&self) -> RepositoryResult<Vec<CatalogEntity>> {
        self.list_catalog(EntityKind::Method).await
    }

    async fn list_outputs(&self) -> RepositoryResult<Vec<CatalogEntity>> {
        self.list_catalog(EntityKind::Output).await
    }

    async fn list_items(&self) -> RepositoryResult<Vec<CatalogEntity>> {
        self.list_catalog(EntityKind::Item).await
    }

    async fn list_substitutes(&self) -> RepositoryResult<Vec<CatalogEntity>> {
        self.list_catalog(EntityKind::Substitute).await
    }

    async fn get_mission(&self, mission_id: MissionId) -> RepositoryResult<Mission> {
        self.get_json(&format!("/missions/{}", mission_id)).await
    }

    async fn list_missions(&self) -> RepositoryResult<Vec<Mission>> {
        self.get_json("/missions").await
    }
}

#[async_trait]
impl JobDraftStore for HttpBackend {
    async fn create_job(&self, request: &CreateJobRequest) -> RepositoryResult<Job> {
        self.send_json(Method::POST, "/jobs", request).await
    }

    async fn get_job(&self, job_id: JobId) -> RepositoryResult<Job> {
        self.get_json(&format!("/jobs/{}", job_id)).await
    }

    async fn get_job_configuration(&self, job_id: JobId) -> RepositoryResult<JobConfiguration> {
        self.get_json(&format!("/jobs/{}/config", job_id)).await
    }

    async fn update_job_details(
        &self,
        job_id: JobId,
        update: &JobDetailsUpdate,
    ) -> RepositoryResult<Job> {
        self.send_json(Method::PATCH, &format!("/jobs/{}", job_id), update)
            .await
    }

    async fn delete_job(&self, job_id: JobId) -> RepositoryResult<()> {
        self.send_unit::<()>(Method::DELETE, &format!("/jobs/{}", job_id), None)
            .await
    }

    async fn update_status(&self, job_id: JobId, status: JobStatus) -> RepositoryResult<Job> {
        self.send_json(
            Method::PUT,
            &format!("/jobs/{}/status", job_id),
            &StatusBody { status },
        )
        .await
    }

    async fn run_job(&self, job_id: JobId) -> RepositoryResult<RunResult> {
        self.send_json(Method::POST, &format!("/jobs/{}/run", job_id), &serde_json::json!({}))
            .await
    }

    async fn enable_entities(
        &self,
        job_id: JobId,
        kind: EntityKind,
        entity_ids: &[EntityId],
    ) -> RepositoryResult<()> {
        let path = format!("/jobs/{}/{}/enable", job_id, kind_segment(kind));
        self.send_unit(Method::POST, &path, Some(&EntityIdsBody { ids: entity_ids }))
            .await
    }

    async fn disable_entities(
        &self,
        job_id: JobId,
        kind: EntityKind,
        entity_ids: &[EntityId],
    ) -> RepositoryResult<()> {
        let path = format!("/jobs/{}/{}/disable", job_id, kind_segment(kind));
        self.send_unit(Method::POST, &path, Some(&EntityIdsBody { ids: entity_ids }))
            .await
    }

    async fn set_inventory(
        &self,
        job_id: JobId,
        kind: EntityKind,
        entity_id: EntityId,
        quantity: f64,
    ) -> RepositoryResult<()> {
        if kind.inventory_unit().is_none() {
            return Err(RepositoryError::ValidationError(format!(
                "{} 不支持设置库存",
                kind
            )));
        }
        let path = format!("/jobs/{}/{}-inventory", job_id, kind.as_str());
        self.send_unit(
            Method::PUT,
            &path,
            Some(&InventoryBody {
                entity_id,
                quantity,
            }),
        )
        .await
    }

    async fn add_item_demand(
        &self,
        job_id: JobId,
        entry: &DemandEntry,
    ) -> RepositoryResult<DemandEntry> {
        self.send_json(Method::POST, &format!("/jobs/{}/demands", job_id), entry)
            .await
    }

    async fn remove_item_demand(&self, job_id: JobId, entry_id: i64) -> RepositoryResult<()> {
        self.send_unit::<()>(
            Method::DELETE,
            &format!("/jobs/{}/demands/{}", job_id, entry_id),
            None,
        )
        .await
    }

    async fn add_deadline(
        &self,
        job_id: JobId,
        entry: &DeadlineEntry,
    ) -> RepositoryResult<DeadlineEntry> {
        self.send_json(Method::POST, &format!("/jobs/{}/deadlines", job_id), entry)
            .await
    }

    async fn remove_deadline(&self, job_id: JobId, entry_id: i64) -> RepositoryResult<()> {
        self.send_unit::<()>(
            Method::DELETE,
            &format!("/jobs/{}/deadlines/{}", job_id, entry_id),
            None,
        )
        .await
    }

    async fn set_week_resources(
        &self,
        job_id: JobId,
        resource: &WeekResource,
    ) -> RepositoryResult<()> {
        self.send_unit(
            Method::PUT,
            &format!("/jobs/{}/week-resources", job_id),
            Some(resource),
        )
        .await
    }

    async fn remove_week_resource(&self, job_id: JobId, week: u32) -> RepositoryResult<()> {
        self.send_unit::<()>(
            Method::DELETE,
            &format!("/jobs/{}/week-resources/{}", job_id, week),
            None,
        )
        .await
    }

    async fn set_method_capacity(
        &self,
        job_id: JobId,
        capacity: &MethodCapacity,
    ) -> RepositoryResult<()> {
        self.send_unit(
            Method::PUT,
            &format!("/jobs/{}/method-capacity", job_id),
            Some(capacity),
        )
        .await
    }

    async fn remove_method_capacity(
        &self,
        job_id: JobId,
        method_id: EntityId,
        week: u32,
    ) -> RepositoryResult<()> {
        self.send_unit::<()>(
            Method::DELETE,
            &format!("/jobs/{}/method-capacity/{}/{}", job_id, method_id, week),
            None,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_message_variants() {
        assert_eq!(extract_error_message(r#"{"detail":"job locked"}"#), "job locked");
        assert_eq!(extract_error_message(r#"{"message":"bad week"}"#), "bad week");
        assert_eq!(
            extract_error_message(r#"{"detail":[{"loc":["week"]}]}"#),
            r#"[{"loc":["week"]}]"#
        );
        assert_eq!(extract_error_message("  gateway exploded \n"), "gateway exploded");
    }

    #[test]
    fn test_map_error_status() {
        let err = map_error_status(StatusCode::NOT_FOUND, "/jobs/9", r#"{"detail":"missing"}"#);
        assert!(matches!(err, RepositoryError::NotFound { .. }));

        let err = map_error_status(StatusCode::CONFLICT, "/jobs/9/status", "{}");
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let err = map_error_status(StatusCode::UNPROCESSABLE_ENTITY, "/jobs", r#"{"detail":"x"}"#);
        assert!(matches!(err, RepositoryError::ValidationError(ref m) if m == "x"));

        let err = map_error_status(StatusCode::GATEWAY_TIMEOUT, "/jobs/1/run", "");
        assert!(err.is_timeout());

        let err = map_error_status(StatusCode::INTERNAL_SERVER_ERROR, "/jobs", "boom");
        assert!(matches!(err, RepositoryError::HttpStatus { status: 500, .. }));
    }

    #[test]
    fn test_url_building() {
        let backend = HttpBackend::new("http://planner.local:8000/", Duration::from_secs(5)).unwrap();
        assert_eq!(backend.base_url(), "http://planner.local:8000");
        assert_eq!(backend.url("/jobs/3/config"), "http://planner.local:8000/api/jobs/3/config");
        assert_eq!(kind_segment(EntityKind::Substitute), "substitutes");
    }
}

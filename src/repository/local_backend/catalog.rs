// ==========================================
// 本地后端 - 目录读取
// ==========================================

use async_trait::async_trait;
use rusqlite::{params, Row};

use super::LocalBackend;
use crate::domain::catalog::CatalogEntity;
use crate::domain::mission::Mission;
use crate::domain::types::{EntityKind, MissionId};
use crate::repository::catalog_client::EntityCatalogClient;
use crate::repository::error::{RepositoryError, RepositoryResult};

impl LocalBackend {
    fn query_entities(&self, kind: EntityKind) -> RepositoryResult<Vec<CatalogEntity>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT entity_id, name, category
            FROM catalog_entity
            WHERE kind = ?1
            ORDER BY entity_id
            "#,
        )?;

        let rows = stmt.query_map(params![kind.as_str()], |row| {
            Ok(CatalogEntity {
                id: row.get(0)?,
                kind,
                name: row.get(1)?,
                category: row.get(2)?,
            })
        })?;

        let mut entities = Vec::new();
        for row in rows {
            entities.push(row?);
        }
        Ok(entities)
    }

    fn query_missions(&self, mission_id: Option<MissionId>) -> RepositoryResult<Vec<Mission>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT mission_id, name, status, duration_weeks, crew_hours_per_week, crew_count
            FROM mission
            WHERE (?1 IS NULL OR mission_id = ?1)
            ORDER BY mission_id
            "#,
        )?;

        let rows = stmt.query_map(params![mission_id], map_mission_row)?;
        let mut missions = Vec::new();
        for row in rows {
            missions.push(row?);
        }
        Ok(missions)
    }
}

fn map_mission_row(row: &Row) -> rusqlite::Result<Mission> {
    Ok(Mission {
        id: row.get(0)?,
        name: row.get(1)?,
        status: row.get(2)?,
        duration_weeks: row.get(3)?,
        crew_hours_per_week: row.get(4)?,
        crew_count: row.get(5)?,
    })
}

#[async_trait]
impl EntityCatalogClient for LocalBackend {
    async fn list_materials(&self) -> RepositoryResult<Vec<CatalogEntity>> {
        self.query_entities(EntityKind::Material)
    }

    async fn list_methods(&self) -> RepositoryResult<Vec<CatalogEntity>> {
        self.query_entities(EntityKind::Method)
    }

    async fn list_outputs(&self) -> RepositoryResult<Vec<CatalogEntity>> {
        self.query_entities(EntityKind::Output)
    }

    async fn list_items(&self) -> RepositoryResult<Vec<CatalogEntity>> {
        self.query_entities(EntityKind::Item)
    }

    async fn list_substitutes(&self) -> RepositoryResult<Vec<CatalogEntity>> {
        self.query_entities(EntityKind::Substitute)
    }

    async fn get_mission(&self, mission_id: MissionId) -> RepositoryResult<Mission> {
        self.query_missions(Some(mission_id))?
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::not_found("Mission", mission_id))
    }

    async fn list_missions(&self) -> RepositoryResult<Vec<Mission>> {
        self.query_missions(None)
    }
}

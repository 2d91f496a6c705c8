// ==========================================
// 本地后端 - 作业配置集合读写
// ==========================================
// 启用实体 / 库存 / 需求截止 / 周资源 / 方法产能
// ==========================================

use rusqlite::{params, Connection, OptionalExtension};

use super::jobs::find_job;
use super::LocalBackend;
use crate::domain::job::{
    DeadlineEntry, DemandEntry, EntitySelection, InventoryLevel, MethodCapacity, WeekResource,
};
use crate::domain::types::{EntityId, EntityKind, JobId};
use crate::repository::error::{RepositoryError, RepositoryResult};

fn ensure_non_negative(field: &str, value: f64) -> RepositoryResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(RepositoryError::ValidationError(format!(
            "{} 必须为非负数: {}",
            field, value
        )));
    }
    Ok(())
}

fn ensure_week_in_range(conn: &Connection, job_id: JobId, week: u32) -> RepositoryResult<()> {
    let job = find_job(conn, job_id)?;
    if week == 0 || week > job.total_weeks {
        return Err(RepositoryError::ValidationError(format!(
            "周次 {} 超出作业周期 [1, {}]",
            week, job.total_weeks
        )));
    }
    Ok(())
}

fn catalog_contains(conn: &Connection, kind: EntityKind, entity_id: EntityId) -> RepositoryResult<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM catalog_entity WHERE kind = ?1 AND entity_id = ?2",
            params![kind.as_str(), entity_id],
            |_| Ok(true),
        )
        .optional()?
        .unwrap_or(false))
}

fn is_enabled(
    conn: &Connection,
    job_id: JobId,
    kind: EntityKind,
    entity_id: EntityId,
) -> RepositoryResult<bool> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM job_enabled_entity WHERE job_id = ?1 AND kind = ?2 AND entity_id = ?3",
            params![job_id, kind.as_str(), entity_id],
            |_| Ok(true),
        )
        .optional()?
        .unwrap_or(false))
}

impl LocalBackend {
    /// 启用/停用实体（事务内全部成功或全部回滚）
    pub(super) fn write_enabled(
        &self,
        job_id: JobId,
        kind: EntityKind,
        entity_ids: &[EntityId],
        enabled: bool,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        find_job(&tx, job_id)?;

        for entity_id in entity_ids {
            if enabled {
                if !catalog_contains(&tx, kind, *entity_id)? {
                    return Err(RepositoryError::ValidationError(format!(
                        "实体不存在于目录: {}#{}",
                        kind, entity_id
                    )));
                }
                tx.execute(
                    "INSERT OR IGNORE INTO job_enabled_entity (job_id, kind, entity_id) VALUES (?1, ?2, ?3)",
                    params![job_id, kind.as_str(), entity_id],
                )?;
            } else {
                tx.execute(
                    "DELETE FROM job_enabled_entity WHERE job_id = ?1 AND kind = ?2 AND entity_id = ?3",
                    params![job_id, kind.as_str(), entity_id],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// 设置库存；数量为 0 时删除记录（缺省即为 0），非零库存要求实体已启用
    pub(super) fn write_inventory(
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
        ensure_non_negative("quantity", quantity)?;

        let conn = self.get_conn()?;
        find_job(&conn, job_id)?;

        if quantity > 0.0 && !is_enabled(&conn, job_id, kind, entity_id)? {
            return Err(RepositoryError::ValidationError(format!(
                "实体未在作业中启用，不能设置库存: {}#{}",
                kind, entity_id
            )));
        }

        if quantity == 0.0 {
            conn.execute(
                "DELETE FROM job_inventory WHERE job_id = ?1 AND kind = ?2 AND entity_id = ?3",
                params![job_id, kind.as_str(), entity_id],
            )?;
        } else {
            conn.execute(
                r#"
                INSERT INTO job_inventory (job_id, kind, entity_id, quantity)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(job_id, kind, entity_id) DO UPDATE SET quantity = excluded.quantity
                "#,
                params![job_id, kind.as_str(), entity_id, quantity],
            )?;
        }
        Ok(())
    }

    /// 追加需求/截止条目，返回条目ID
    pub(super) fn insert_week_entry(
        &self,
        table: &'static str,
        job_id: JobId,
        item_id: EntityId,
        week: u32,
        amount: f64,
    ) -> RepositoryResult<i64> {
        ensure_non_negative("amount", amount)?;

        let conn = self.get_conn()?;
        ensure_week_in_range(&conn, job_id, week)?;

        let sql = format!(
            "INSERT INTO {} (job_id, item_id, week, amount) VALUES (?1, ?2, ?3, ?4)",
            table
        );
        conn.execute(&sql, params![job_id, item_id, week, amount])?;
        Ok(conn.last_insert_rowid())
    }

    pub(super) fn delete_week_entry(
        &self,
        table: &'static str,
        job_id: JobId,
        entry_id: i64,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let sql = format!("DELETE FROM {} WHERE job_id = ?1 AND entry_id = ?2", table);
        let changed = conn.execute(&sql, params![job_id, entry_id])?;
        if changed == 0 {
            return Err(RepositoryError::not_found(table, entry_id));
        }
        Ok(())
    }

    pub(super) fn write_week_resource(
        &self,
        job_id: JobId,
        resource: &WeekResource,
    ) -> RepositoryResult<()> {
        ensure_non_negative("crew_hours", resource.crew_hours)?;
        ensure_non_negative("energy", resource.energy)?;

        let conn = self.get_conn()?;
        ensure_week_in_range(&conn, job_id, resource.week)?;
        conn.execute(
            r#"
            INSERT INTO job_week_resource (job_id, week, crew_hours, energy)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(job_id, week) DO UPDATE SET crew_hours = excluded.crew_hours, energy = excluded.energy
            "#,
            params![job_id, resource.week, resource.crew_hours, resource.energy],
        )?;
        Ok(())
    }

    /// 删除周资源；不校验周期范围（用于清理超出新周期的周次）
    pub(super) fn delete_week_resource(&self, job_id: JobId, week: u32) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        find_job(&conn, job_id)?;
        conn.execute(
            "DELETE FROM job_week_resource WHERE job_id = ?1 AND week = ?2",
            params![job_id, week],
        )?;
        Ok(())
    }

    pub(super) fn write_method_capacity(
        &self,
        job_id: JobId,
        capacity: &MethodCapacity,
    ) -> RepositoryResult<()> {
        ensure_non_negative("max_capacity_kg", capacity.max_capacity_kg)?;

        let conn = self.get_conn()?;
        ensure_week_in_range(&conn, job_id, capacity.week)?;
        conn.execute(
            r#"
            INSERT INTO job_method_capacity (job_id, method_id, week, max_capacity_kg, available)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(job_id, method_id, week)
            DO UPDATE SET max_capacity_kg = excluded.max_capacity_kg, available = excluded.available
            "#,
            params![
                job_id,
                capacity.method_id,
                capacity.week,
                capacity.max_capacity_kg,
                capacity.available,
            ],
        )?;
        Ok(())
    }

    pub(super) fn delete_method_capacity(
        &self,
        job_id: JobId,
        method_id: EntityId,
        week: u32,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "DELETE FROM job_method_capacity WHERE job_id = ?1 AND method_id = ?2 AND week = ?3",
            params![job_id, method_id, week],
        )?;
        Ok(())
    }
}

// ==========================================
// 配置集合读取（供 get_job_configuration 使用）
// ==========================================

pub(super) fn load_enabled(conn: &Connection, job_id: JobId) -> RepositoryResult<EntitySelection> {
    let mut stmt = conn.prepare(
        "SELECT kind, entity_id FROM job_enabled_entity WHERE job_id = ?1 ORDER BY kind, entity_id",
    )?;
    let rows = stmt.query_map(params![job_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, EntityId>(1)?))
    })?;

    let mut selection = EntitySelection::default();
    for row in rows {
        let (kind, entity_id) = row?;
        match EntityKind::parse(&kind) {
            Some(kind) => {
                selection.get_mut(kind).insert(entity_id);
            }
            None => tracing::warn!(job_id, kind = %kind, "忽略未知实体种类"),
        }
    }
    Ok(selection)
}

pub(super) fn load_inventories(conn: &Connection, job_id: JobId) -> RepositoryResult<Vec<InventoryLevel>> {
    let mut stmt = conn.prepare(
        "SELECT kind, entity_id, quantity FROM job_inventory WHERE job_id = ?1 ORDER BY kind, entity_id",
    )?;
    let rows = stmt.query_map(params![job_id], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, EntityId>(1)?,
            row.get::<_, f64>(2)?,
        ))
    })?;

    let mut levels = Vec::new();
    for row in rows {
        let (kind, entity_id, quantity) = row?;
        if let Some(kind) = EntityKind::parse(&kind) {
            levels.push(InventoryLevel {
                kind,
                entity_id,
                quantity,
            });
        }
    }
    Ok(levels)
}

pub(super) fn load_demands(conn: &Connection, job_id: JobId) -> RepositoryResult<Vec<DemandEntry>> {
    let mut stmt = conn.prepare(
        "SELECT entry_id, item_id, week, amount FROM job_item_demand WHERE job_id = ?1 ORDER BY entry_id",
    )?;
    let rows = stmt.query_map(params![job_id], |row| {
        Ok(DemandEntry {
            id: Some(row.get(0)?),
            item_id: row.get(1)?,
            week: row.get(2)?,
            amount: row.get(3)?,
        })
    })?;
    let entries = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

pub(super) fn load_deadlines(conn: &Connection, job_id: JobId) -> RepositoryResult<Vec<DeadlineEntry>> {
    let mut stmt = conn.prepare(
        "SELECT entry_id, item_id, week, amount FROM job_deadline WHERE job_id = ?1 ORDER BY entry_id",
    )?;
    let rows = stmt.query_map(params![job_id], |row| {
        Ok(DeadlineEntry {
            id: Some(row.get(0)?),
            item_id: row.get(1)?,
            week: row.get(2)?,
            amount: row.get(3)?,
        })
    })?;
    let entries = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

pub(super) fn load_week_resources(conn: &Connection, job_id: JobId) -> RepositoryResult<Vec<WeekResource>> {
    let mut stmt = conn.prepare(
        "SELECT week, crew_hours, energy FROM job_week_resource WHERE job_id = ?1 ORDER BY week",
    )?;
    let rows = stmt.query_map(params![job_id], |row| {
        Ok(WeekResource {
            week: row.get(0)?,
            crew_hours: row.get(1)?,
            energy: row.get(2)?,
        })
    })?;
    let entries = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

pub(super) fn load_method_capacities(
    conn: &Connection,
    job_id: JobId,
) -> RepositoryResult<Vec<MethodCapacity>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT method_id, week, max_capacity_kg, available
        FROM job_method_capacity
        WHERE job_id = ?1
        ORDER BY method_id, week
        "#,
    )?;
    let rows = stmt.query_map(params![job_id], |row| {
        Ok(MethodCapacity {
            method_id: row.get(0)?,
            week: row.get(1)?,
            max_capacity_kg: row.get(2)?,
            available: row.get(3)?,
        })
    })?;
    let entries = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

// ==========================================
// 任务规划控制台 - 配置管理器
// ==========================================
// 职责: 读取/写入 config_kv 表中的向导参数覆写
// 存储: config_kv 表 (key-value + scope)
// 优先级: config_kv > 配置文件 > 内置默认值
// ==========================================

use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tracing::warn;

use crate::config::wizard_settings::WizardSettings;
use crate::db::open_sqlite_connection;
use crate::domain::job::ObjectiveWeights;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        crate::db::ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ===== 向导参数 =====

    /// 在给定基础参数上叠加 config_kv 覆写
    ///
    /// # 说明
    /// - 值无法解析时保留基础值并记录告警，不中断启动
    /// - 覆写后的参数整体不合法时返回错误
    pub fn load_wizard_settings(
        &self,
        base: &WizardSettings,
    ) -> Result<WizardSettings, Box<dyn Error>> {
        let mut settings = base.clone();

        if let Some(v) = self.parsed::<u64>(config_keys::COMMIT_TIMEOUT_MS)? {
            settings.commit_timeout_ms = v;
        }
        if let Some(v) = self.parsed::<u64>(config_keys::RUN_TIMEOUT_MS)? {
            settings.run_timeout_ms = v;
        }
        if let Some(v) = self.parsed::<f64>(config_keys::DEFAULT_ENERGY_PER_WEEK)? {
            settings.default_energy_per_week = v;
        }
        if let Some(v) = self.parsed::<f64>(config_keys::FALLBACK_CREW_HOURS_PER_WEEK)? {
            settings.fallback_crew_hours_per_week = v;
        }
        if let Some(v) = self.parsed::<bool>(config_keys::COMPENSATE_ON_FAILURE)? {
            settings.compensate_on_failure = v;
        }
        if let Some(raw) = self.get_config_value(config_keys::DEFAULT_OBJECTIVE_WEIGHTS)? {
            match serde_json::from_str::<ObjectiveWeights>(&raw) {
                Ok(weights) => settings.default_objective_weights = weights,
                Err(e) => warn!(key = config_keys::DEFAULT_OBJECTIVE_WEIGHTS, error = %e, "配置值解析失败，保留默认值"),
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, Box<dyn Error>> {
        let raw = match self.get_config_value(key)? {
            Some(v) => v,
            None => return Ok(None),
        };
        match raw.trim().parse::<T>() {
            Ok(v) => Ok(Some(v)),
            Err(_) => {
                warn!(key, value = %raw, "配置值解析失败，保留默认值");
                Ok(None)
            }
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 超时
    pub const COMMIT_TIMEOUT_MS: &str = "wizard.commit_timeout_ms";
    pub const RUN_TIMEOUT_MS: &str = "wizard.run_timeout_ms";

    // 周资源预置
    pub const DEFAULT_ENERGY_PER_WEEK: &str = "wizard.default_energy_per_week";
    pub const FALLBACK_CREW_HOURS_PER_WEEK: &str = "wizard.fallback_crew_hours_per_week";

    // 新建作业默认目标权重 (JSON)
    pub const DEFAULT_OBJECTIVE_WEIGHTS: &str = "wizard.default_objective_weights";

    // 批次失败补偿
    pub const COMPENSATE_ON_FAILURE: &str = "wizard.compensate_on_failure";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_no_overrides_returns_base() {
        let mgr = manager();
        let base = WizardSettings::default();
        assert_eq!(mgr.load_wizard_settings(&base).unwrap(), base);
    }

    #[test]
    fn test_overrides_applied() {
        let mgr = manager();
        mgr.set_global_config_value(config_keys::COMMIT_TIMEOUT_MS, "1500").unwrap();
        mgr.set_global_config_value(config_keys::COMPENSATE_ON_FAILURE, "false").unwrap();
        mgr.set_global_config_value(
            config_keys::DEFAULT_OBJECTIVE_WEIGHTS,
            r#"{"mass":2.0,"value":1.0,"crew":1.0,"energy":1.0,"risk":0.5,"make":1.0,"carry":1.0,"shortage":3.0}"#,
        )
        .unwrap();

        let settings = mgr.load_wizard_settings(&WizardSettings::default()).unwrap();
        assert_eq!(settings.commit_timeout_ms, 1500);
        assert!(!settings.compensate_on_failure);
        assert_eq!(settings.default_objective_weights.shortage, 3.0);
        assert_eq!(settings.run_timeout_ms, WizardSettings::default().run_timeout_ms);
    }

    #[test]
    fn test_unparsable_value_keeps_base() {
        let mgr = manager();
        mgr.set_global_config_value(config_keys::RUN_TIMEOUT_MS, "soon").unwrap();
        let settings = mgr.load_wizard_settings(&WizardSettings::default()).unwrap();
        assert_eq!(settings.run_timeout_ms, WizardSettings::default().run_timeout_ms);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mgr = manager();
        mgr.set_global_config_value(config_keys::DEFAULT_ENERGY_PER_WEEK, "-5").unwrap();
        assert!(mgr.load_wizard_settings(&WizardSettings::default()).is_err());
    }

    #[test]
    fn test_snapshot_lists_values() {
        let mgr = manager();
        mgr.set_global_config_value(config_keys::RUN_TIMEOUT_MS, "900").unwrap();
        let snapshot: HashMap<String, String> =
            serde_json::from_str(&mgr.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot.get(config_keys::RUN_TIMEOUT_MS).map(String::as_str), Some("900"));
    }
}

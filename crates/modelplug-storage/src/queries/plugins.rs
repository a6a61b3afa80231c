// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin record queries.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use modelplug_core::{PluginFilter, PluginInfo, PluginStatus, PluginType, RuntimeError};
use rusqlite::types::{Type, Value};
use rusqlite::{OptionalExtension, Row, params, params_from_iter};

use crate::database::{Database, map_tr_err};

const SELECT_COLUMNS: &str = "SELECT id, plugin_id, name, version, plugin_type, status, enabled, \
     bundle_path, main_implementation, icon_path, installed_at, updated_at, enabled_at, \
     disabled_at, last_error FROM plugins";

/// Insert or update a plugin keyed by `plugin_id`.
///
/// An existing row keeps its id and `installed_at`. Returns the stored row.
pub async fn upsert_plugin(db: &Database, info: &PluginInfo) -> Result<PluginInfo, RuntimeError> {
    let info = info.clone();
    db.connection()
        .call(move |conn| -> Result<PluginInfo, rusqlite::Error> {
            conn.execute(
                "INSERT INTO plugins (plugin_id, name, version, plugin_type, status, enabled, \
                 bundle_path, main_implementation, icon_path, installed_at, updated_at, \
                 enabled_at, disabled_at, last_error) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14) \
                 ON CONFLICT(plugin_id) DO UPDATE SET \
                   name = excluded.name, \
                   version = excluded.version, \
                   plugin_type = excluded.plugin_type, \
                   status = excluded.status, \
                   enabled = excluded.enabled, \
                   bundle_path = excluded.bundle_path, \
                   main_implementation = excluded.main_implementation, \
                   icon_path = excluded.icon_path, \
                   updated_at = excluded.updated_at, \
                   enabled_at = excluded.enabled_at, \
                   disabled_at = excluded.disabled_at, \
                   last_error = excluded.last_error",
                params![
                    info.plugin_id,
                    info.name,
                    info.version,
                    info.plugin_type.to_string(),
                    info.status.to_string(),
                    info.enabled,
                    info.bundle_path.to_string_lossy().into_owned(),
                    info.main_implementation,
                    info.icon_path,
                    format_ts(info.installed_at),
                    format_ts(info.updated_at),
                    info.enabled_at.map(format_ts),
                    info.disabled_at.map(format_ts),
                    info.last_error,
                ],
            )?;
            conn.query_row(
                &format!("{SELECT_COLUMNS} WHERE plugin_id = ?1"),
                params![info.plugin_id],
                row_to_info,
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_plugin(db: &Database, plugin_id: &str) -> Result<Option<PluginInfo>, RuntimeError> {
    let plugin_id = plugin_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("{SELECT_COLUMNS} WHERE plugin_id = ?1"),
                params![plugin_id],
                row_to_info,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Plugins matching `filter`, ordered by plugin id.
pub async fn list_plugins(
    db: &Database,
    filter: &PluginFilter,
) -> Result<Vec<PluginInfo>, RuntimeError> {
    let (clause, values) = where_clause(filter);
    db.connection()
        .call(move |conn| -> Result<Vec<PluginInfo>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS}{clause} ORDER BY plugin_id"))?;
            stmt.query_map(params_from_iter(values), row_to_info)?
                .collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_plugins(db: &Database, filter: &PluginFilter) -> Result<u64, RuntimeError> {
    let (clause, values) = where_clause(filter);
    let count: i64 = db
        .connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT COUNT(*) FROM plugins{clause}"),
                params_from_iter(values),
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(count.max(0) as u64)
}

/// Delete a plugin and every association row in one transaction.
pub async fn delete_plugin_cascade(db: &Database, plugin_id: &str) -> Result<bool, RuntimeError> {
    let plugin_id = plugin_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            for table in super::ASSOCIATION_TABLES {
                tx.execute(
                    &format!("DELETE FROM {table} WHERE plugin_id = ?1"),
                    params![plugin_id],
                )?;
            }
            let deleted = tx.execute("DELETE FROM plugins WHERE plugin_id = ?1", params![plugin_id])?;
            tx.commit()?;
            Ok(deleted > 0)
        })
        .await
        .map_err(map_tr_err)
}

fn where_clause(filter: &PluginFilter) -> (String, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    if let Some(name) = &filter.name {
        values.push(Value::Text(name.clone()));
        conditions.push(format!("name = ?{}", values.len()));
    }
    if let Some(plugin_type) = filter.plugin_type {
        values.push(Value::Text(plugin_type.to_string()));
        conditions.push(format!("plugin_type = ?{}", values.len()));
    }
    if let Some(status) = filter.status {
        values.push(Value::Text(status.to_string()));
        conditions.push(format!("status = ?{}", values.len()));
    }
    if let Some(enabled) = filter.enabled {
        values.push(Value::Integer(i64::from(enabled)));
        conditions.push(format!("enabled = ?{}", values.len()));
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}

fn row_to_info(row: &Row<'_>) -> Result<PluginInfo, rusqlite::Error> {
    let bundle_path: String = row.get(7)?;
    Ok(PluginInfo {
        id: row.get(0)?,
        plugin_id: row.get(1)?,
        name: row.get(2)?,
        version: row.get(3)?,
        plugin_type: parse_column::<PluginType>(row, 4)?,
        status: parse_column::<PluginStatus>(row, 5)?,
        enabled: row.get(6)?,
        bundle_path: PathBuf::from(bundle_path),
        main_implementation: row.get(8)?,
        icon_path: row.get(9)?,
        installed_at: parse_ts(row, 10)?,
        updated_at: parse_ts(row, 11)?,
        enabled_at: parse_optional_ts(row, 12)?,
        disabled_at: parse_optional_ts(row, 13)?,
        last_error: row.get(14)?,
    })
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(row: &Row<'_>, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_optional_ts(row: &Row<'_>, idx: usize) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        Some(_) => parse_ts(row, idx).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_builds_numbered_placeholders() {
        let filter = PluginFilter::all()
            .plugin_type(PluginType::Model)
            .enabled(true);
        let (clause, values) = where_clause(&filter);
        assert_eq!(clause, " WHERE plugin_type = ?1 AND enabled = ?2");
        assert_eq!(values, vec![Value::Text("MODEL".into()), Value::Integer(1)]);
    }

    #[test]
    fn empty_filter_has_no_clause() {
        assert_eq!(where_clause(&PluginFilter::all()).0, "");
    }
}

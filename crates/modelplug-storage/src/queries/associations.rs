// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dependency, extension and service rows attached to a plugin.

use std::str::FromStr;

use modelplug_core::{
    Dependency, DependencyKind, Extension, ModelType, PluginAssociations, RuntimeError,
    ServiceRecord,
};
use rusqlite::params;
use rusqlite::types::Type;

use crate::database::{Database, map_tr_err};

/// Replace every association of `plugin_id` in one transaction.
pub async fn replace_associations(
    db: &Database,
    plugin_id: &str,
    associations: &PluginAssociations,
) -> Result<(), RuntimeError> {
    let plugin_id = plugin_id.to_string();
    let associations = associations.clone();

    // Encode JSON columns before entering the connection thread.
    let extension_configs = associations
        .extensions
        .iter()
        .map(|e| serde_json::to_string(&e.config))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| RuntimeError::Storage { source: Box::new(e) })?;
    let service_types = associations
        .services
        .iter()
        .map(|s| serde_json::to_string(&s.model_types))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| RuntimeError::Storage { source: Box::new(e) })?;

    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            for table in super::ASSOCIATION_TABLES {
                tx.execute(
                    &format!("DELETE FROM {table} WHERE plugin_id = ?1"),
                    params![plugin_id],
                )?;
            }

            for (position, dep) in associations.dependencies.iter().enumerate() {
                tx.execute(
                    "INSERT INTO plugin_dependencies (plugin_id, position, depends_on, \
                     version_req, min_version, max_version, optional, kind) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        plugin_id,
                        position as i64,
                        dep.plugin_id,
                        dep.version,
                        dep.min_version,
                        dep.max_version,
                        dep.optional,
                        dep.kind.to_string(),
                    ],
                )?;
            }

            for (position, (ext, config)) in associations
                .extensions
                .iter()
                .zip(&extension_configs)
                .enumerate()
            {
                tx.execute(
                    "INSERT INTO plugin_extensions (plugin_id, position, extension_point, \
                     implementation, ordering, active, config) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        plugin_id,
                        position as i64,
                        ext.extension_point,
                        ext.implementation,
                        ext.ordering,
                        ext.active,
                        config,
                    ],
                )?;
            }

            for (position, (service, model_types)) in
                associations.services.iter().zip(&service_types).enumerate()
            {
                tx.execute(
                    "INSERT INTO plugin_services (plugin_id, position, provider_name, \
                     provider_implementation, model_types) VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        plugin_id,
                        position as i64,
                        service.provider_name,
                        service.provider_implementation,
                        model_types,
                    ],
                )?;
            }

            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn load_associations(
    db: &Database,
    plugin_id: &str,
) -> Result<PluginAssociations, RuntimeError> {
    let plugin_id = plugin_id.to_string();
    db.connection()
        .call(move |conn| -> Result<PluginAssociations, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT depends_on, version_req, min_version, max_version, optional, kind \
                 FROM plugin_dependencies WHERE plugin_id = ?1 ORDER BY position",
            )?;
            let dependencies = stmt
                .query_map(params![plugin_id], |row| {
                    let kind: String = row.get(5)?;
                    Ok(Dependency {
                        plugin_id: row.get(0)?,
                        version: row.get(1)?,
                        min_version: row.get(2)?,
                        max_version: row.get(3)?,
                        optional: row.get(4)?,
                        kind: DependencyKind::from_str(&kind).map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e))
                        })?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut stmt = conn.prepare(
                "SELECT extension_point, implementation, ordering, active, config \
                 FROM plugin_extensions WHERE plugin_id = ?1 ORDER BY position",
            )?;
            let extensions = stmt
                .query_map(params![plugin_id], |row| {
                    let config: String = row.get(4)?;
                    Ok(Extension {
                        extension_point: row.get(0)?,
                        implementation: row.get(1)?,
                        ordering: row.get(2)?,
                        active: row.get(3)?,
                        config: serde_json::from_str(&config).map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e))
                        })?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut stmt = conn.prepare(
                "SELECT provider_name, provider_implementation, model_types \
                 FROM plugin_services WHERE plugin_id = ?1 ORDER BY position",
            )?;
            let services = stmt
                .query_map(params![plugin_id], |row| {
                    let model_types: String = row.get(2)?;
                    Ok(ServiceRecord {
                        plugin_id: plugin_id.clone(),
                        provider_name: row.get(0)?,
                        provider_implementation: row.get(1)?,
                        model_types: serde_json::from_str::<Vec<ModelType>>(&model_types)
                            .map_err(|e| {
                                rusqlite::Error::FromSqlConversionFailure(
                                    2,
                                    Type::Text,
                                    Box::new(e),
                                )
                            })?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(PluginAssociations {
                dependencies,
                extensions,
                services,
            })
        })
        .await
        .map_err(map_tr_err)
}

// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection setup: pragmas, WAL mode, and migrations.
//!
//! Every statement runs on tokio-rusqlite's single background thread, which
//! serializes writes. Open one [`Database`] per file and share it.

use std::path::Path;
use std::sync::Arc;

use modelplug_core::RuntimeError;
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use crate::migrations::run_migrations;

/// Handle to the registry database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Connection>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Open (creating if needed) the database at `path` and migrate it.
    pub async fn open(path: impl AsRef<Path>, wal_mode: bool) -> Result<Self, RuntimeError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| RuntimeError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = Connection::open(path).await.map_err(open_err)?;
        let db = Self::prepare(conn, wal_mode).await?;
        info!(path = %path.display(), wal = wal_mode, "registry database opened");
        Ok(db)
    }

    /// Open a private in-memory database, mainly for tests.
    pub async fn open_in_memory() -> Result<Self, RuntimeError> {
        let conn = Connection::open_in_memory().await.map_err(open_err)?;
        Self::prepare(conn, false).await
    }

    async fn prepare(conn: Connection, wal_mode: bool) -> Result<Self, RuntimeError> {
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            if wal_mode {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
                conn.pragma_update(None, "synchronous", "NORMAL")?;
            }
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| run_migrations(conn))
            .await
            .map_err(|e: tokio_rusqlite::Error<refinery::Error>| {
                RuntimeError::storage(format!("registry migrations failed: {e}"))
            })?;
        debug!("registry migrations applied");

        Ok(Self {
            conn: Arc::new(conn),
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Wrap a tokio-rusqlite error as a storage error.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> RuntimeError {
    RuntimeError::Storage {
        source: Box::new(e),
    }
}

fn open_err(e: rusqlite::Error) -> RuntimeError {
    RuntimeError::Storage {
        source: Box::new(e),
    }
}

use querybot_schemas::{Rows, SqlValue};
use rusqlite::types::ValueRef;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::sql::SqlQuery;

const NO_SUCH_TABLE: &str = "no such table: ";

#[derive(Debug, Error)]
pub enum ExecError {
    /// The statement names a table the store does not have
    #[error("table '{0}' does not exist")]
    TableNotFound(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl ExecError {
    fn classify(err: rusqlite::Error) -> Self {
        let message = err.to_string();
        match message.find(NO_SUCH_TABLE) {
            Some(pos) => {
                let table = message[pos + NO_SUCH_TABLE.len()..]
                    .split_whitespace()
                    .next()
                    .unwrap_or_default();
                ExecError::TableNotFound(table.to_string())
            }
            None => ExecError::Sqlite(err),
        }
    }
}

/// Runs a built query and hands back its rows
pub trait QueryExecutor {
    fn execute(&self, query: &SqlQuery) -> Result<Rows, ExecError>;
}

impl<T: QueryExecutor + ?Sized> QueryExecutor for &T {
    fn execute(&self, query: &SqlQuery) -> Result<Rows, ExecError> {
        (**self).execute(query)
    }
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ExecError> {
        let conn = Connection::open(path)?;
        info!("Database opened");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, ExecError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Create a small campaign/agent schema with sample rows.
    ///
    /// Campaign 3 ("initech") deliberately has no live agents table.
    pub fn install_demo_schema(&self) -> Result<(), ExecError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS ct_domain (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS ct_user_group (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                domainid INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS ct_campaign (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                status TEXT NOT NULL,
                domainid INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS ct_users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                status TEXT NOT NULL,
                campid INTEGER,
                usergroupid INTEGER,
                domainid INTEGER
            );
            CREATE TABLE IF NOT EXISTS ct_live_agents_1 (agent_id INTEGER PRIMARY KEY, name TEXT);
            CREATE TABLE IF NOT EXISTS ct_live_agents_2 (agent_id INTEGER PRIMARY KEY, name TEXT);

            INSERT OR IGNORE INTO ct_domain (id, name) VALUES (1, 'sales'), (2, 'support');
            INSERT OR IGNORE INTO ct_user_group (id, name, domainid) VALUES
                (1, 'admins', 1), (2, 'callers', 1), (3, 'escalations', 2);
            INSERT OR IGNORE INTO ct_campaign (id, name, status, domainid) VALUES
                (1, 'acme', 'active', 1),
                (2, 'globex', 'active', 1),
                (3, 'initech', 'inactive', 2);
            INSERT OR IGNORE INTO ct_users (id, name, status, campid, usergroupid, domainid) VALUES
                (1, 'ana', 'active', 1, 2, 1),
                (2, 'bo', 'active', 1, 2, 1),
                (3, 'cy', 'inactive', 1, 1, 1),
                (4, 'di', 'active', 2, 2, 1),
                (5, 'ed', 'active', 3, 3, 2),
                (6, 'flo', 'inactive', 3, 3, 2);
            INSERT OR IGNORE INTO ct_live_agents_1 (agent_id, name) VALUES (1, 'ana'), (2, 'bo'), (3, 'cy');
            INSERT OR IGNORE INTO ct_live_agents_2 (agent_id, name) VALUES (4, 'di');",
        )?;

        info!("Demo schema installed");
        Ok(())
    }
}

impl QueryExecutor for Database {
    fn execute(&self, query: &SqlQuery) -> Result<Rows, ExecError> {
        debug!("Executing: {} {:?}", query.sql, query.params);

        let mut stmt = self.conn.prepare(&query.sql).map_err(ExecError::classify)?;
        let column_count = stmt.column_count();

        let rows = stmt
            .query_map(params_from_iter(query.params.iter()), |row| {
                (0..column_count)
                    .map(|i| row.get_ref(i).map(to_sql_value))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
            .map_err(ExecError::classify)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(ExecError::classify)?;

        debug!("Query returned {} rows", rows.len());
        Ok(rows)
    }
}

fn to_sql_value(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(v) => SqlValue::Integer(v),
        ValueRef::Real(v) => SqlValue::Real(v),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            SqlValue::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

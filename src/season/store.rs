//! Database access for the season-table generator.
//!
//! `PgSession` owns one PostgreSQL connection inside one transaction. The
//! only way to keep the work is `commit`; on every other exit (an error
//! propagating out, a panic unwinding) `Drop` rolls back and closes the
//! connection.

use crate::Result;
use anyhow::{Context, anyhow};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Executor};
use tokio::runtime::Runtime;

/// Connection parameters, passed explicitly instead of living in globals.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub database: String,
}

impl DbConfig {
    fn connect_options(&self) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.database);
        match &self.password {
            Some(password) => options.password(password),
            None => options,
        }
    }
}

/// The statements the generator needs from a database.
pub trait SeasonStore {
    /// Run a statement that returns no rows.
    fn execute(&mut self, sql: &str) -> Result<()>;

    /// Whether a query returns at least one row.
    fn has_rows(&mut self, sql: &str) -> Result<bool>;

    /// Make all work durable and release the connection.
    fn commit(self) -> Result<()>
    where
        Self: Sized;
}

/// Synchronous facade over an async sqlx connection.
pub struct PgSession {
    runtime: Runtime,
    conn: Option<PgConnection>,
}

impl PgSession {
    pub fn open(config: &DbConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("start database runtime")?;

        let options = config.connect_options();
        let mut conn = runtime
            .block_on(PgConnection::connect_with(&options))
            .with_context(|| {
                format!(
                    "connect to postgres://{}@{}:{}/{}",
                    config.user, config.host, config.port, config.database
                )
            })?;
        runtime.block_on(conn.execute("BEGIN"))?;

        tracing::info!(host = %config.host, database = %config.database, "opened PostgreSQL session");
        Ok(Self {
            runtime,
            conn: Some(conn),
        })
    }
}

impl SeasonStore for PgSession {
    fn execute(&mut self, sql: &str) -> Result<()> {
        let runtime = &self.runtime;
        let conn = self.conn.as_mut().ok_or_else(|| anyhow!("PostgreSQL session is already closed"))?;
        runtime
            .block_on(conn.execute(sql))
            .with_context(|| format!("execute: {}", first_line(sql)))?;
        Ok(())
    }

    fn has_rows(&mut self, sql: &str) -> Result<bool> {
        let runtime = &self.runtime;
        let conn = self.conn.as_mut().ok_or_else(|| anyhow!("PostgreSQL session is already closed"))?;
        let row = runtime
            .block_on(conn.fetch_optional(sql))
            .with_context(|| format!("query: {}", first_line(sql)))?;
        Ok(row.is_some())
    }

    fn commit(mut self) -> Result<()> {
        let mut conn = self
            .conn
            .take()
            .ok_or_else(|| anyhow!("PostgreSQL session is already closed"))?;
        self.runtime
            .block_on(async {
                conn.execute("COMMIT").await?;
                conn.close().await
            })
            .context("commit PostgreSQL session")?;
        tracing::info!("committed and closed PostgreSQL session");
        Ok(())
    }
}

impl Drop for PgSession {
    fn drop(&mut self) {
        let Some(mut conn) = self.conn.take() else {
            return;
        };
        let outcome = self.runtime.block_on(async {
            conn.execute("ROLLBACK").await?;
            conn.close().await
        });
        match outcome {
            Ok(()) => tracing::info!("rolled back and closed PostgreSQL session"),
            Err(e) => tracing::warn!(error = %e, "PostgreSQL session did not close cleanly"),
        }
    }
}

fn first_line(sql: &str) -> &str {
    sql.lines().next().unwrap_or_default()
}

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, info, instrument, warn};

const BASE_TABLES: &[(&str, &str)] = &[
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            user_id TEXT PRIMARY KEY,
            credential_token TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            last_login_at DATETIME
        );
    "#,
    ),
    (
        "workers",
        r#"
        CREATE TABLE IF NOT EXISTS workers (
            worker_id TEXT PRIMARY KEY,
            cpu_cores INTEGER NOT NULL DEFAULT 0,
            gpu INTEGER NOT NULL DEFAULT 0,
            can_execute INTEGER NOT NULL DEFAULT 1,
            ip TEXT,
            status TEXT NOT NULL DEFAULT 'offline',
            last_heartbeat DATETIME DEFAULT CURRENT_TIMESTAMP
        );
    "#,
    ),
    (
        "jobs",
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            job_id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            source TEXT NOT NULL,
            language TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'queued',
            assigned_worker_id TEXT,
            timeout_seconds INTEGER NOT NULL,
            reserved REAL NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            completed_at DATETIME,
            stdout TEXT,
            stderr TEXT,
            exit_code INTEGER
        );
    "#,
    ),
    (
        "credits",
        r#"
        CREATE TABLE IF NOT EXISTS credits (
            user_id TEXT PRIMARY KEY,
            balance REAL NOT NULL DEFAULT 0.0
        );
    "#,
    ),
];

/// Additive column evolution. Each entry is idempotent: "duplicate column
/// name" from a prior run is swallowed as a no-op, matching the additive
/// migration contract (columns are added with nullable/default values;
/// legacy rows missing them are tolerated everywhere a caller reads them).
const EVOLUTIONARY_COLUMNS: &[(&str, &str)] = &[
    ("workers_owner_id", "ALTER TABLE workers ADD COLUMN owner_id TEXT"),
    ("workers_auth_token", "ALTER TABLE workers ADD COLUMN auth_token TEXT"),
    (
        "workers_restriction",
        "ALTER TABLE workers ADD COLUMN restriction TEXT NOT NULL DEFAULT 'none'",
    ),
    ("jobs_assigned_at", "ALTER TABLE jobs ADD COLUMN assigned_at DATETIME"),
];

const INDEXES: &[(&str, &str)] = &[
    ("idx_jobs_status", "CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);"),
    ("idx_jobs_user", "CREATE INDEX IF NOT EXISTS idx_jobs_user ON jobs(user_id);"),
    (
        "idx_workers_owner",
        "CREATE INDEX IF NOT EXISTS idx_workers_owner ON workers(owner_id);",
    ),
];

#[instrument(skip(connection))]
pub async fn apply_schema(connection: &Connection) -> Result<()> {
    info!("applying store schema");
    create_base_tables(connection).await?;
    apply_evolutionary_columns(connection).await?;
    create_indexes(connection).await?;
    info!("store schema up to date");
    Ok(())
}

async fn create_base_tables(db: &Connection) -> Result<()> {
    for (name, sql) in BASE_TABLES {
        debug!("creating table {name}");
        db.execute(sql, ())
            .await
            .with_context(|| format!("failed to create table {name}"))?;
    }
    Ok(())
}

async fn apply_evolutionary_columns(db: &Connection) -> Result<()> {
    for (name, sql) in EVOLUTIONARY_COLUMNS {
        match db.execute(sql, ()).await {
            Ok(_) => info!("applied column migration {name}"),
            Err(e) => {
                let message = e.to_string();
                if message.contains("duplicate column name") {
                    debug!("column migration {name} already applied");
                } else {
                    warn!("column migration {name} incomplete: {message}");
                }
            }
        }
    }
    Ok(())
}

async fn create_indexes(db: &Connection) -> Result<()> {
    for (name, sql) in INDEXES {
        debug!("creating index {name}");
        db.execute(sql, ())
            .await
            .with_context(|| format!("failed to create index {name}"))?;
    }
    Ok(())
}

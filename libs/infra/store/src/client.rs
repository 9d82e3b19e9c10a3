use crate::errors::StoreError;
use crate::schema::apply_schema;
use libsql::{Builder, Connection, Database};
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Owns the libSQL database handle used by every repository.
///
/// When `db_path` points at an in-memory database, a connection is kept
/// open for the lifetime of the client as an anchor: without it SQLite
/// would drop the whole in-memory database the moment the bootstrap
/// connection used to apply the schema goes out of scope.
#[derive(Clone)]
pub struct StoreClient {
    database: Arc<Database>,
    _memory_anchor: Option<Arc<Connection>>,
}

impl StoreClient {
    #[instrument(skip(auth_token))]
    pub async fn connect(db_path: &str, auth_token: Option<String>) -> Result<Self, StoreError> {
        if db_path.is_empty() {
            return Err(StoreError::ConnectionError("db_path is empty".into()));
        }

        info!("opening store at {db_path}");

        let is_remote = db_path.starts_with("libsql://") || db_path.starts_with("https://");
        let is_memory = db_path.contains(":memory:") || db_path.contains("mode=memory");

        let database = if is_remote {
            let token = auth_token.ok_or_else(|| {
                StoreError::ConnectionError("remote store requires an auth token".into())
            })?;
            Builder::new_remote(db_path.to_string(), token).build().await
        } else {
            Builder::new_local(db_path).build().await
        }
        .map_err(|e| StoreError::ConnectionError(format!("failed to open driver: {e}")))?;

        let database = Arc::new(database);
        let mut anchor = None;

        if is_memory {
            let anchor_conn = database
                .connect()
                .map_err(|e| StoreError::ConnectionError(format!("anchor connection failed: {e}")))?;
            apply_schema(&anchor_conn)
                .await
                .map_err(|e| StoreError::ConnectionError(format!("schema sync failed: {e}")))?;
            anchor = Some(Arc::new(anchor_conn));
            info!("in-memory store anchored");
        } else {
            let bootstrap_conn = database
                .connect()
                .map_err(|e| StoreError::ConnectionError(format!("bootstrap connection failed: {e}")))?;
            apply_schema(&bootstrap_conn)
                .await
                .map_err(|e| StoreError::ConnectionError(format!("schema sync failed: {e}")))?;
        }

        Ok(Self {
            database,
            _memory_anchor: anchor,
        })
    }

    pub fn connection(&self) -> Result<Connection, StoreError> {
        self.database.connect().map_err(|e| {
            error!("connection allocation failed: {e}");
            StoreError::ConnectionError(e.to_string())
        })
    }
}

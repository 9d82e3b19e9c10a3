use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database connection failed: {0}")]
    ConnectionError(String),

    #[error("database query rejected: {0}")]
    QueryError(#[from] libsql::Error),

    #[error("row mapping failed: {0}")]
    MappingError(String),

    #[error("user not found")]
    UserNotFound,

    #[error("worker not found")]
    WorkerNotFound,

    #[error("job not found")]
    JobNotFound,
}

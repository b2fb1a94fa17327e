// [crates/spool-store/src/errors.rs]
//! Catálogo de errores estable y enumerable del adaptador de persistencia,
//! generalizado del catálogo `DbError` del adaptador Turso del taller original.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("CONNECTION_FAULT: {0}")]
    ConnectionError(String),

    #[error("TABLE_NOT_FOUND: {0}")]
    TableNotFound(String),

    #[error("ROW_NOT_FOUND: tag={0}")]
    RowNotFound(String),

    #[error("COLUMN_NOT_FOUND: table={table} column={column}")]
    ColumnNotFound { table: String, column: String },

    #[error("MAPPING_FAULT: {0}")]
    MappingError(String),

    #[error("TRANSACTION_FAULT: {0}")]
    TransactionError(String),

    #[error("LOCK_FAULT: {0}")]
    LockError(String),

    #[error("TRANSIENT_BACKEND_FAULT: {0}")]
    TransientBackendError(String),
}

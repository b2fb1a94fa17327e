// [crates/spool-core/src/errors.rs]
//! Catálogo de errores de dominio (§7), generalizado de la forma `DbError`
//! del taller original: variantes estables, enumerables y con prefijo.

use spool_store::errors::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("SPOOL_OCCUPIED: {tag} is held by {holder}")]
    SpoolOccupied { tag: String, holder: String },

    #[error("FORBIDDEN: caller is not the current holder of {tag}")]
    Forbidden { tag: String },

    #[error("GONE: lock for {tag} expired between verify and write")]
    Gone { tag: String },

    #[error("DEPENDENCIES_NOT_SATISFIED: {0}")]
    DependenciesNotSatisfied(String),

    #[error("ALREADY_COMPLETED: {0}")]
    AlreadyCompleted(String),

    #[error("SPOOL_BLOQUEADO: {tag} rework cycle governor rejects TOMAR")]
    SpoolBloqueado { tag: String },

    #[error("VERSION_CONFLICT: {tag} was modified concurrently")]
    VersionConflict { tag: String },

    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    #[error("VALIDATION_FAILED: {0}")]
    ValidationFailed(String),

    #[error("TRANSIENT_BACKEND_ERROR: {0}")]
    TransientBackendError(String),
}

impl From<StoreError> for CoreError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::RowNotFound(key) => CoreError::NotFound(key),
            StoreError::TableNotFound(table) => CoreError::NotFound(table),
            StoreError::TransientBackendError(message) => CoreError::TransientBackendError(message),
            other => CoreError::TransientBackendError(other.to_string()),
        }
    }
}

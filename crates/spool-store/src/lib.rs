// [crates/spool-store/src/lib.rs]
/*!
 * =================================================================
 * APARATO: SPOOL STORE (V1.0 - SHOP FLOOR GROUND ZERO)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: CONTRATOS DE PERSISTENCIA Y ADAPTADORES DE REFERENCIA
 * =================================================================
 */

pub mod column_map;
pub mod contracts;
pub mod errors;
pub mod memory;
pub mod schema_validator;

pub mod prelude {
    pub use crate::column_map::ColumnMap;
    pub use crate::contracts::{CellUpdate, EventLog, LockService, RowStore, EVENT_BATCH_CHUNK_SIZE};
    pub use crate::errors::StoreError;
    pub use crate::memory::{MemoryEventLog, MemoryLockService, MemoryRowStore};
    pub use crate::schema_validator::validate_schema;
}

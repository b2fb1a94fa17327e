// [crates/spool-core/src/lib.rs]
//! Motor de correctitud del taller: coordinador de ocupación (§4.4), cuatro
//! máquinas de estado por operación (§4.3), gobernador de ciclo de
//! reparación (§4.2), FINALIZAR a nivel de unión (§4.6), ValidationKernel
//! (§4.7) y HistoryAggregator (§4.8), compuestos por StateOrchestrator (§4.5).
//!
//! RowStore/EventLog/LockService son colaboradores externos fuera de
//! alcance (§1): este crate solo los consume a través de los traits de
//! `spool_store::contracts`.

pub mod cycle_counter;
pub mod errors;
pub mod finalizar;
pub mod history;
pub mod mapping;
pub mod occupation;
pub mod orchestrator;
pub mod render;
pub mod state_machines;
pub mod validation;

pub mod prelude {
    pub use crate::errors::CoreError;
    pub use crate::finalizar::{FinalizarPlan, SpoolAction, UnionCellWrite, UnionOperation};
    pub use crate::history::{fold_sessions, WorkerSession};
    pub use crate::occupation::{OccupationCoordinator, OwnershipToken, ReleaseMode, OCCUPATION_LEASE_TTL};
    pub use crate::orchestrator::{StateOrchestrator, TransitionOutcome};
    pub use crate::render::{render, DisplaySnapshot};
    pub use crate::validation;
}

// [apps/spool-orchestrator/src/lib.rs]
//! Centro de mando del taller: compone `spool-core` con los adaptadores de
//! referencia en memoria de `spool-store` y expone el escenario de
//! demostración ejecutado por el binario.

pub mod config;
pub mod demo;
pub mod kernel;
pub mod services;

pub mod prelude {
    pub use crate::config::RuntimeConfig;
    pub use crate::kernel::OrchestratorKernel;
}

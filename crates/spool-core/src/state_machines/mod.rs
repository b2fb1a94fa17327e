// [crates/spool-core/src/state_machines/mod.rs]
//! Las cuatro máquinas de estado por operación (§2, §4.3). Cada una se
//! hidrata en frío desde los testigos persistidos del carrete en cada
//! solicitud (§9: hydration over caching) — ninguna instancia se cachea
//! en memoria entre solicitudes.

pub mod arm;
pub mod metrologia;
pub mod reparacion;
pub mod sold;

// [crates/spool-core/src/state_machines/metrologia.rs]
//! Máquina de estado METROLOGIA (§4.3.3): PENDIENTE → APROBADO | RECHAZADO
//! (ambos terminales). Sin ocupación; las precondiciones viven en
//! `ValidationKernel`.

use spool_domain::spool::Spool;

use crate::cycle_counter::{self, CycleDisplayKind};
use crate::errors::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetrologiaState {
    Pendiente,
    Aprobado,
    Rechazado,
}

#[derive(Debug, Clone)]
pub struct MetrologiaSideEffect {
    pub fecha_qc_metrologia: String,
    pub estado_detalle: String,
}

/// Hidrata desde los testigos persistidos (§4.3): si `fecha_qc_metrologia`
/// está presente, el resultado (APROBADO/RECHAZADO) se lee de `estado_detalle`.
pub fn hydrate(spool: &Spool) -> MetrologiaState {
    if spool.fecha_qc_metrologia.is_none() {
        return MetrologiaState::Pendiente;
    }
    if spool.estado_detalle.contains("APROBADO") {
        MetrologiaState::Aprobado
    } else {
        MetrologiaState::Rechazado
    }
}

/// Transición APROBADO (§4.3.3): resetea el contador de ciclo a 0.
pub fn aprobar(state: MetrologiaState, today: &str) -> Result<(MetrologiaState, MetrologiaSideEffect), CoreError> {
    if state != MetrologiaState::Pendiente {
        return Err(CoreError::AlreadyCompleted("METROLOGIA already resolved".into()));
    }
    Ok((
        MetrologiaState::Aprobado,
        MetrologiaSideEffect { fecha_qc_metrologia: today.to_string(), estado_detalle: cycle_counter::reset() },
    ))
}

/// Transición RECHAZADO (§4.3.3): incrementa el contador leído de
/// `estado_detalle` y escribe BLOQUEADO si alcanza el máximo.
pub fn rechazar(
    state: MetrologiaState,
    current_estado_detalle: &str,
    today: &str,
) -> Result<(MetrologiaState, MetrologiaSideEffect), CoreError> {
    if state != MetrologiaState::Pendiente {
        return Err(CoreError::AlreadyCompleted("METROLOGIA already resolved".into()));
    }
    let next_cycle = cycle_counter::increment(cycle_counter::extract(current_estado_detalle));
    let kind = if cycle_counter::should_block(next_cycle) { CycleDisplayKind::Bloqueado } else { CycleDisplayKind::Rechazado };
    Ok((
        MetrologiaState::Rechazado,
        MetrologiaSideEffect { fecha_qc_metrologia: today.to_string(), estado_detalle: cycle_counter::format(kind, next_cycle, None) },
    ))
}

// [crates/spool-core/src/state_machines/reparacion.rs]
//! Máquina de estado REPARACION (§4.3.4): bucle de reparación acotado por
//! el gobernador de ciclo. El contador `c` se lee de `estado_detalle` y se
//! traslada sin mutación a través de cada transición; REPARACION nunca lo
//! incrementa (eso es exclusivo de METROLOGIA RECHAZADO, §4.3.3).

use spool_domain::spool::Spool;

use crate::cycle_counter::{self, CycleDisplayKind};
use crate::errors::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReparacionState {
    Rechazado,
    EnReparacion,
    ReparacionPausada,
    PendienteMetrologia,
    Bloqueado,
}

#[derive(Debug, Clone, Default)]
pub struct ReparacionSideEffect {
    pub ocupado_por: Option<Option<String>>,
    pub fecha_ocupacion_now: bool,
    pub fecha_ocupacion_clear: bool,
    pub estado_detalle: String,
    /// `true` solo en la transición COMPLETAR: reabre METROLOGIA para una
    /// nueva evaluación limpiando su único testigo de resolución
    /// (`fecha_qc_metrologia`), que de otro modo seguiría marcando el
    /// veredicto anterior como resuelto (`can_metrologia` lo rechazaría
    /// con `AlreadyCompleted` en cada reevaluación posterior del ciclo).
    pub fecha_qc_metrologia_clear: bool,
}

/// Hidrata el estado REPARACION desde `estado_detalle` (§4.3).
pub fn hydrate(spool: &Spool) -> ReparacionState {
    let estado = spool.estado_detalle.as_str();
    if estado.contains("BLOQUEADO") {
        ReparacionState::Bloqueado
    } else if estado.contains("PENDIENTE_METROLOGIA") {
        ReparacionState::PendienteMetrologia
    } else if estado.contains("REPARACION_PAUSADA") {
        ReparacionState::ReparacionPausada
    } else if estado.contains("EN_REPARACION") {
        ReparacionState::EnReparacion
    } else {
        ReparacionState::Rechazado
    }
}

fn current_cycle(spool: &Spool) -> u8 {
    cycle_counter::extract(&spool.estado_detalle)
}

/// `tomar`: RECHAZADO|REPARACION_PAUSADA → EN_REPARACION.
pub fn tomar(state: ReparacionState, spool: &Spool, worker_canonical: &str) -> Result<(ReparacionState, ReparacionSideEffect), CoreError> {
    match state {
        ReparacionState::Bloqueado => Err(CoreError::SpoolBloqueado { tag: spool.tag.clone() }),
        ReparacionState::Rechazado | ReparacionState::ReparacionPausada => {
            let cycle = current_cycle(spool);
            Ok((
                ReparacionState::EnReparacion,
                ReparacionSideEffect {
                    ocupado_por: Some(Some(worker_canonical.to_string())),
                    fecha_ocupacion_now: true,
                    fecha_ocupacion_clear: false,
                    estado_detalle: cycle_counter::format(CycleDisplayKind::EnReparacion, cycle, Some(worker_canonical)),
                    ..Default::default()
                },
            ))
        }
        other => Err(CoreError::ValidationFailed(format!("cannot tomar REPARACION from {other:?}"))),
    }
}

/// `pausar`: EN_REPARACION → REPARACION_PAUSADA.
pub fn pausar(state: ReparacionState, spool: &Spool) -> Result<(ReparacionState, ReparacionSideEffect), CoreError> {
    match state {
        ReparacionState::EnReparacion => {
            let cycle = current_cycle(spool);
            Ok((
                ReparacionState::ReparacionPausada,
                ReparacionSideEffect {
                    ocupado_por: Some(None),
                    fecha_ocupacion_now: false,
                    fecha_ocupacion_clear: true,
                    estado_detalle: cycle_counter::format(CycleDisplayKind::ReparacionPausada, cycle, None),
                    ..Default::default()
                },
            ))
        }
        other => Err(CoreError::ValidationFailed(format!("cannot pausar REPARACION from {other:?}"))),
    }
}

/// `completar`: EN_REPARACION → PENDIENTE_METROLOGIA.
pub fn completar(state: ReparacionState, spool: &Spool) -> Result<(ReparacionState, ReparacionSideEffect), CoreError> {
    match state {
        ReparacionState::EnReparacion => Ok((
            ReparacionState::PendienteMetrologia,
            ReparacionSideEffect {
                ocupado_por: Some(None),
                fecha_ocupacion_now: false,
                fecha_ocupacion_clear: true,
                estado_detalle: cycle_counter::format(CycleDisplayKind::PendienteMetrologia, current_cycle(spool), None),
                fecha_qc_metrologia_clear: true,
            },
        )),
        other => Err(CoreError::ValidationFailed(format!("cannot completar REPARACION from {other:?}"))),
    }
}

/// `cancelar`: {EN_REPARACION, REPARACION_PAUSADA} → RECHAZADO.
pub fn cancelar(state: ReparacionState, spool: &Spool) -> Result<(ReparacionState, ReparacionSideEffect), CoreError> {
    match state {
        ReparacionState::EnReparacion | ReparacionState::ReparacionPausada => {
            let cycle = current_cycle(spool);
            Ok((
                ReparacionState::Rechazado,
                ReparacionSideEffect {
                    ocupado_por: Some(None),
                    fecha_ocupacion_now: false,
                    fecha_ocupacion_clear: true,
                    estado_detalle: cycle_counter::format(CycleDisplayKind::Rechazado, cycle, None),
                    ..Default::default()
                },
            ))
        }
        other => Err(CoreError::ValidationFailed(format!("cannot cancelar REPARACION from {other:?}"))),
    }
}

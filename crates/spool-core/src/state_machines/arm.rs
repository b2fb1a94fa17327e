// [crates/spool-core/src/state_machines/arm.rs]
//! Máquina de estado ARM (§4.3.1): PENDIENTE → EN_PROGRESO → COMPLETADO,
//! con retorno `EN_PROGRESO → PENDIENTE` vía `cancelar`. Sin guardas.

use spool_domain::spool::Spool;

use crate::errors::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmState {
    Pendiente,
    EnProgreso,
    Completado,
}

/// Efectos de columna que el on-entry de una transición produce; el
/// orquestador los compone en la misma escritura por lote que
/// `estado_detalle` y `version` (§4.5 paso 5).
#[derive(Debug, Clone, Default)]
pub struct ArmSideEffect {
    pub armador: Option<Option<String>>,
    pub fecha_armado: Option<Option<String>>,
}

/// Hidrata el estado ARM desde los testigos persistidos (§4.3).
pub fn hydrate(spool: &Spool) -> ArmState {
    if spool.fecha_armado.is_some() {
        ArmState::Completado
    } else if spool.armador.is_some() {
        ArmState::EnProgreso
    } else {
        ArmState::Pendiente
    }
}

/// `tomar`: PENDIENTE|EN_PROGRESO → EN_PROGRESO. Escribe `armador` en cada
/// aplicación (la política confirmada en `DESIGN.md`: sobrescribe en cada TOMAR).
pub fn tomar(state: ArmState, worker_canonical: &str) -> Result<(ArmState, ArmSideEffect), CoreError> {
    if state == ArmState::Completado {
        return Err(CoreError::AlreadyCompleted("ARM already completed".into()));
    }
    Ok((ArmState::EnProgreso, ArmSideEffect { armador: Some(Some(worker_canonical.to_string())), ..Default::default() }))
}

/// `completar`: EN_PROGRESO → COMPLETADO.
pub fn completar(state: ArmState, today: &str) -> Result<(ArmState, ArmSideEffect), CoreError> {
    match state {
        ArmState::EnProgreso => {
            Ok((ArmState::Completado, ArmSideEffect { fecha_armado: Some(Some(today.to_string())), ..Default::default() }))
        }
        ArmState::Completado => Err(CoreError::AlreadyCompleted("ARM already completed".into())),
        ArmState::Pendiente => Err(CoreError::ValidationFailed("ARM must be EN_PROGRESO before completar".into())),
    }
}

/// `cancelar`: EN_PROGRESO → PENDIENTE, limpiando `armador`.
pub fn cancelar(state: ArmState) -> Result<(ArmState, ArmSideEffect), CoreError> {
    match state {
        ArmState::EnProgreso => Ok((ArmState::Pendiente, ArmSideEffect { armador: Some(None), ..Default::default() })),
        other => Err(CoreError::ValidationFailed(format!("cannot cancelar ARM from {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tomar_from_pendiente_moves_to_en_progreso() {
        let (state, effect) = tomar(ArmState::Pendiente, "MR(93)").unwrap();
        assert_eq!(state, ArmState::EnProgreso);
        assert_eq!(effect.armador, Some(Some("MR(93)".to_string())));
    }

    #[test]
    fn completar_requires_en_progreso() {
        assert!(completar(ArmState::Pendiente, "01-01-2026").is_err());
        let (state, _) = completar(ArmState::EnProgreso, "01-01-2026").unwrap();
        assert_eq!(state, ArmState::Completado);
    }

    #[test]
    fn completar_is_not_reapplicable() {
        assert!(matches!(completar(ArmState::Completado, "01-01-2026"), Err(CoreError::AlreadyCompleted(_))));
    }
}

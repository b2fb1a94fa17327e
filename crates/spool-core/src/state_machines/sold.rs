// [crates/spool-core/src/state_machines/sold.rs]
//! Máquina de estado SOLD (§4.3.2): isomorfa a ARM sobre `soldador` /
//! `fecha_soldadura`, con guarda de dependencia en `iniciar`.

use spool_domain::spool::Spool;

use crate::errors::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoldState {
    Pendiente,
    EnProgreso,
    Completado,
}

#[derive(Debug, Clone, Default)]
pub struct SoldSideEffect {
    pub soldador: Option<Option<String>>,
    pub fecha_soldadura: Option<Option<String>>,
}

pub fn hydrate(spool: &Spool) -> SoldState {
    if spool.fecha_soldadura.is_some() {
        SoldState::Completado
    } else if spool.soldador.is_some() {
        SoldState::EnProgreso
    } else {
        SoldState::Pendiente
    }
}

/// `iniciar`: PENDIENTE|EN_PROGRESO → EN_PROGRESO. Guarda: rechaza a menos
/// que `spool.armador ≠ ∅` (§4.3.2).
pub fn iniciar(state: SoldState, spool: &Spool, worker_canonical: &str) -> Result<(SoldState, SoldSideEffect), CoreError> {
    if state == SoldState::Completado {
        return Err(CoreError::AlreadyCompleted("SOLD already completed".into()));
    }
    if spool.armador.is_none() {
        return Err(CoreError::DependenciesNotSatisfied("ARM not initiated".into()));
    }
    Ok((SoldState::EnProgreso, SoldSideEffect { soldador: Some(Some(worker_canonical.to_string())), ..Default::default() }))
}

/// `completar`: EN_PROGRESO → COMPLETADO. Sin guarda adicional (§4.3.2).
pub fn completar(state: SoldState, today: &str) -> Result<(SoldState, SoldSideEffect), CoreError> {
    match state {
        SoldState::EnProgreso => {
            Ok((SoldState::Completado, SoldSideEffect { fecha_soldadura: Some(Some(today.to_string())), ..Default::default() }))
        }
        SoldState::Completado => Err(CoreError::AlreadyCompleted("SOLD already completed".into())),
        SoldState::Pendiente => Err(CoreError::ValidationFailed("SOLD must be EN_PROGRESO before completar".into())),
    }
}

pub fn cancelar(state: SoldState) -> Result<(SoldState, SoldSideEffect), CoreError> {
    match state {
        SoldState::EnProgreso => Ok((SoldState::Pendiente, SoldSideEffect { soldador: Some(None), ..Default::default() })),
        other => Err(CoreError::ValidationFailed(format!("cannot cancelar SOLD from {other:?}"))),
    }
}

// [crates/spool-core/src/validation.rs]
//! ValidationKernel (§4.7): predicados puros declarativos, evaluados antes
//! de invocar cualquier transición de máquina de estado.

use spool_domain::role::Role;
use spool_domain::spool::Spool;
use spool_domain::worker::WorkerRef;

use crate::cycle_counter;
use crate::errors::CoreError;
use crate::state_machines::reparacion::{self, ReparacionState};

/// `can_tomar(T, W, op)`: el carrete existe, está libre, el rol (si se
/// exige) coincide, y la dependencia entre operaciones se satisface.
pub fn can_tomar(spool: &Spool, worker: &WorkerRef, operation: &str) -> Result<(), CoreError> {
    if let Some(holder) = spool.ocupado_por.as_deref() {
        if !holder.is_empty() {
            return Err(CoreError::SpoolOccupied { tag: spool.tag.clone(), holder: holder.to_string() });
        }
    }
    if let Some(required_role) = Role::required_for_operation(operation) {
        if !worker.has_role(required_role) {
            return Err(CoreError::ValidationFailed(format!("worker lacks role {required_role:?} for {operation}")));
        }
    }
    if operation == "SOLD" && spool.armador.is_none() {
        return Err(CoreError::DependenciesNotSatisfied("ARM not initiated".into()));
    }
    if operation == "REPARACION" {
        can_tomar_reparacion(spool)?;
    }
    Ok(())
}

/// `can_pausar_or_completar(T, W)`: `ocupado_por = W`.
pub fn can_pausar_or_completar(spool: &Spool, worker: &WorkerRef) -> Result<(), CoreError> {
    match spool.ocupado_por.as_deref() {
        Some(holder) if holder == worker.canonical() => Ok(()),
        _ => Err(CoreError::Forbidden { tag: spool.tag.clone() }),
    }
}

/// `can_cancelar(T, W)`: `ocupado_por = W ∧ op-state ∈ in-progress`.
pub fn can_cancelar(spool: &Spool, worker: &WorkerRef) -> Result<(), CoreError> {
    can_pausar_or_completar(spool, worker)
}

/// `can_metrologia(T, W, resultado)`: ambas operaciones previas completas,
/// el carrete está libre, y METROLOGIA aún no se ha resuelto.
pub fn can_metrologia(spool: &Spool, worker: &WorkerRef) -> Result<(), CoreError> {
    if spool.armador.is_none() || spool.fecha_armado.is_none() {
        return Err(CoreError::DependenciesNotSatisfied("ARM not completed".into()));
    }
    if spool.soldador.is_none() || spool.fecha_soldadura.is_none() {
        return Err(CoreError::DependenciesNotSatisfied("SOLD not completed".into()));
    }
    if let Some(holder) = spool.ocupado_por.as_deref() {
        if !holder.is_empty() {
            return Err(CoreError::SpoolOccupied { tag: spool.tag.clone(), holder: holder.to_string() });
        }
    }
    if spool.fecha_qc_metrologia.is_some() {
        return Err(CoreError::AlreadyCompleted("METROLOGIA already resolved".into()));
    }
    if !worker.has_role(Role::Metrologo) {
        return Err(CoreError::ValidationFailed("worker lacks role Metrologo".into()));
    }
    Ok(())
}

/// `can_tomar_reparacion(T, W)`: `RECHAZADO ∧ ¬BLOQUEADO ∧ ocupado_por = ∅`.
///
/// Política de rol para REPARACION deliberadamente abierta (§4.7, §9 Open
/// Questions): cualquier trabajador activo puede tomarla.
pub fn can_tomar_reparacion(spool: &Spool) -> Result<(), CoreError> {
    let cycle = cycle_counter::extract(&spool.estado_detalle);
    if cycle_counter::should_block(cycle) {
        return Err(CoreError::SpoolBloqueado { tag: spool.tag.clone() });
    }
    match reparacion::hydrate(spool) {
        ReparacionState::Rechazado | ReparacionState::ReparacionPausada => Ok(()),
        ReparacionState::Bloqueado => Err(CoreError::SpoolBloqueado { tag: spool.tag.clone() }),
        other => Err(CoreError::ValidationFailed(format!("cannot tomar REPARACION from {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use uuid::Uuid;

    fn worker(roles: &[Role]) -> WorkerRef {
        WorkerRef::new(93, "Maria Reyes", "MR", roles.iter().copied().collect::<BTreeSet<_>>())
    }

    fn free_spool() -> Spool {
        Spool {
            tag: "T-1".into(),
            ot: "OT-1".into(),
            total_uniones: 0,
            ocupado_por: None,
            fecha_ocupacion: None,
            version: Uuid::new_v4(),
            estado_detalle: String::new(),
            armador: None,
            fecha_armado: None,
            soldador: None,
            fecha_soldadura: None,
            fecha_qc_metrologia: None,
        }
    }

    #[test]
    fn can_tomar_rejects_when_already_occupied() {
        let mut spool = free_spool();
        spool.ocupado_por = Some("JP(94)".into());
        let w = worker(&[Role::Armador]);
        assert!(matches!(can_tomar(&spool, &w, "ARM"), Err(CoreError::SpoolOccupied { .. })));
    }

    #[test]
    fn can_tomar_sold_requires_arm_initiated() {
        let spool = free_spool();
        let w = worker(&[Role::Soldador]);
        assert!(matches!(can_tomar(&spool, &w, "SOLD"), Err(CoreError::DependenciesNotSatisfied(_))));
    }
}

// [crates/spool-core/src/finalizar.rs]
//! FINALIZAR (§4.6): la acción a nivel de unión para carretes v4. Un solo
//! propietario selecciona un conjunto de uniones; el resultado a nivel de
//! carrete (PAUSAR/COMPLETAR/CANCELAR) se auto-determina por el tamaño de
//! la selección válida frente al total disponible.

use chrono::Utc;
use spool_domain::union::Union;
use tracing::warn;

/// La operación a nivel de unión sobre la que FINALIZAR actúa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionOperation {
    Arm,
    Sold,
}

impl UnionOperation {
    fn fecha_fin_column(self) -> &'static str {
        match self {
            UnionOperation::Arm => "arm_fecha_fin",
            UnionOperation::Sold => "sol_fecha_fin",
        }
    }

    fn worker_column(self) -> &'static str {
        match self {
            UnionOperation::Arm => "arm_worker",
            UnionOperation::Sold => "sol_worker",
        }
    }

    fn is_available(self, union: &Union) -> bool {
        match self {
            UnionOperation::Arm => union.available_for_arm(),
            UnionOperation::Sold => union.available_for_sold(),
        }
    }
}

/// La acción a nivel de carrete auto-determinada por FINALIZAR (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpoolAction {
    Cancelar,
    Pausar,
    Completar,
}

/// Una celda de unión a escribir, resuelta a partir de un empalme
/// seleccionado válido.
#[derive(Debug, Clone)]
pub struct UnionCellWrite {
    pub composite_id: String,
    pub column_name: String,
    pub value: String,
}

/// Resultado puro de planificar un FINALIZAR, antes de que el orquestador
/// lo traduzca a llamadas de RowStore/EventLog.
#[derive(Debug, Clone)]
pub struct FinalizarPlan {
    pub spool_action: SpoolAction,
    pub valid_union_ids: Vec<String>,
    pub dropped_union_ids: Vec<String>,
    pub cell_writes: Vec<UnionCellWrite>,
    /// `true` cuando SOLD alcanza el 100% y ARM también está 100% completo
    /// (§4.6: dispara la transición a PENDIENTE_METROLOGIA).
    pub triggers_pendiente_metrologia: bool,
}

/// Planifica un FINALIZAR puro sobre el conjunto de uniones del carrete y
/// la selección del llamador. `all_arm_available` se usa únicamente cuando
/// `operation = Sold`, para decidir si ARM también llegó al 100%.
pub fn plan(
    operation: UnionOperation,
    unions: &[Union],
    selected_ids: &[String],
    worker_canonical: &str,
) -> FinalizarPlan {
    let available_before: Vec<&Union> = unions.iter().filter(|u| operation.is_available(u)).collect();
    let available_count = available_before.len();

    let mut valid_union_ids = Vec::new();
    let mut dropped_union_ids = Vec::new();
    let mut cell_writes = Vec::new();
    let now = spool_domain::timefmt::format_timestamp(Utc::now());

    for id in selected_ids {
        let matched = available_before.iter().find(|u| &u.composite_id() == id);
        match matched {
            Some(union) => {
                valid_union_ids.push(id.clone());
                cell_writes.push(UnionCellWrite {
                    composite_id: union.composite_id(),
                    column_name: operation.fecha_fin_column().to_string(),
                    value: now.clone(),
                });
                cell_writes.push(UnionCellWrite {
                    composite_id: union.composite_id(),
                    column_name: operation.worker_column().to_string(),
                    value: worker_canonical.to_string(),
                });
            }
            None => {
                warn!(union_id = %id, "⚠️ [FINALIZAR]: dropping invalid union selection");
                dropped_union_ids.push(id.clone());
            }
        }
    }

    let spool_action = if valid_union_ids.is_empty() {
        SpoolAction::Cancelar
    } else if valid_union_ids.len() < available_count {
        SpoolAction::Pausar
    } else {
        SpoolAction::Completar
    };

    let triggers_pendiente_metrologia = operation == UnionOperation::Sold
        && spool_action == SpoolAction::Completar
        && unions.iter().all(|u| u.arm_fecha_fin.is_some());

    FinalizarPlan { spool_action, valid_union_ids, dropped_union_ids, cell_writes, triggers_pendiente_metrologia }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn union(n: u32, arm_done: bool, sold_done: bool) -> Union {
        Union {
            ot: "OT-1".into(),
            n,
            dn_union: 4.0,
            tipo_union: "BW".into(),
            arm_fecha_inicio: None,
            arm_fecha_fin: arm_done.then(|| "01-01-2026".to_string()),
            arm_worker: None,
            sol_fecha_inicio: None,
            sol_fecha_fin: sold_done.then(|| "01-01-2026".to_string()),
            sol_worker: None,
            ndt_fecha: None,
            ndt_status: None,
            version: Uuid::new_v4(),
        }
    }

    #[test]
    fn partial_selection_yields_pausar() {
        let unions: Vec<Union> = (1..=8).map(|n| union(n, false, false)).collect();
        let selected: Vec<String> = vec!["OT-1+1".into(), "OT-1+2".into(), "OT-1+3".into()];
        let planned = plan(UnionOperation::Arm, &unions, &selected, "MR(93)");
        assert_eq!(planned.spool_action, SpoolAction::Pausar);
        assert_eq!(planned.valid_union_ids.len(), 3);
    }

    #[test]
    fn empty_selection_yields_cancelar() {
        let unions: Vec<Union> = (1..=8).map(|n| union(n, false, false)).collect();
        let planned = plan(UnionOperation::Arm, &unions, &[], "MR(93)");
        assert_eq!(planned.spool_action, SpoolAction::Cancelar);
    }

    #[test]
    fn full_selection_yields_completar() {
        let unions: Vec<Union> = (1..=3).map(|n| union(n, false, false)).collect();
        let selected: Vec<String> = unions.iter().map(|u| u.composite_id()).collect();
        let planned = plan(UnionOperation::Arm, &unions, &selected, "MR(93)");
        assert_eq!(planned.spool_action, SpoolAction::Completar);
    }

    #[test]
    fn sold_completar_with_arm_fully_done_triggers_pendiente_metrologia() {
        let unions: Vec<Union> = (1..=3).map(|n| union(n, true, false)).collect();
        let selected: Vec<String> = unions.iter().map(|u| u.composite_id()).collect();
        let planned = plan(UnionOperation::Sold, &unions, &selected, "MR(93)");
        assert_eq!(planned.spool_action, SpoolAction::Completar);
        assert!(planned.triggers_pendiente_metrologia);
    }

    #[test]
    fn invalid_union_ids_are_dropped_with_warning_not_error() {
        let unions: Vec<Union> = (1..=3).map(|n| union(n, false, false)).collect();
        let selected: Vec<String> = vec!["OT-1+1".into(), "OT-1+999".into()];
        let planned = plan(UnionOperation::Arm, &unions, &selected, "MR(93)");
        assert_eq!(planned.valid_union_ids.len(), 1);
        assert_eq!(planned.dropped_union_ids.len(), 1);
    }
}

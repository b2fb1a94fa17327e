// [crates/spool-core/src/history.rs]
//! HistoryAggregator (§4.8): pliega el log de eventos en sesiones de
//! trabajador por carrete, con duración.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use spool_domain::event::{Event, EventKind};

/// Una sesión de trabajo abierta o cerrada de un trabajador sobre una
/// operación de un carrete.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerSession {
    pub worker_id: i64,
    pub operation: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl WorkerSession {
    /// Formatea la duración como `"Xh Ym"` cuando `h > 0`, o `"Ym"` en caso
    /// contrario; los segundos se descartan (§4.8).
    pub fn duration_label(&self) -> Option<String> {
        let end = self.end?;
        let total_minutes = (end - self.start).num_minutes().max(0);
        let hours = total_minutes / 60;
        let minutes = total_minutes % 60;
        Some(if hours > 0 { format!("{hours}h {minutes}m") } else { format!("{minutes}m") })
    }
}

fn is_open(kind: EventKind) -> bool {
    matches!(kind, EventKind::TomarSpool | EventKind::TomarReparacion)
}

fn is_close(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::PausarSpool
            | EventKind::CompletarArm
            | EventKind::CompletarSold
            | EventKind::CompletarMetrologia
            | EventKind::PausarReparacion
            | EventKind::CompletarReparacion
            | EventKind::CancelarReparacion
            | EventKind::SpoolCancelado
    )
}

/// Pliega los eventos de un único carrete (ya ordenados por `timestamp`, ya
/// filtrados por `tag = T`) en sesiones de trabajador. Las sesiones sin
/// cerrar al final se devuelven abiertas (`end = None`, §4.8).
pub fn fold_sessions(events: &[Event]) -> Vec<WorkerSession> {
    let mut open_by_key: HashMap<(i64, String), WorkerSession> = HashMap::new();
    let mut closed = Vec::new();

    for event in events {
        let key = (event.worker_id, event.operacion.clone());
        if is_open(event.kind) {
            open_by_key.insert(
                key,
                WorkerSession { worker_id: event.worker_id, operation: event.operacion.clone(), start: event.timestamp, end: None },
            );
        } else if is_close(event.kind) {
            if let Some(mut session) = open_by_key.remove(&key) {
                session.end = Some(event.timestamp);
                closed.push(session);
            }
        }
    }

    let mut result = closed;
    result.extend(open_by_key.into_values());
    result.sort_by_key(|session| session.start);
    result
}

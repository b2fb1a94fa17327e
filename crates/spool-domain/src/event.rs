// [crates/spool-domain/src/event.rs]
//! Entidad de evento de auditoría (§3.1, §6.2) y el vocabulario cerrado de
//! `kind` (§6.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Los tipos de evento que el núcleo puede emitir. Cerrado deliberadamente:
/// un nuevo tipo de evento requiere un cambio de código, no un string suelto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    TomarSpool,
    PausarSpool,
    CompletarArm,
    CompletarSold,
    CompletarMetrologia,
    TomarReparacion,
    PausarReparacion,
    CompletarReparacion,
    CancelarReparacion,
    UnionArmRegistrada,
    UnionSoldRegistrada,
    SpoolCancelado,
    SupervisorOverride,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::TomarSpool => "TOMAR_SPOOL",
            EventKind::PausarSpool => "PAUSAR_SPOOL",
            EventKind::CompletarArm => "COMPLETAR_ARM",
            EventKind::CompletarSold => "COMPLETAR_SOLD",
            EventKind::CompletarMetrologia => "COMPLETAR_METROLOGIA",
            EventKind::TomarReparacion => "TOMAR_REPARACION",
            EventKind::PausarReparacion => "PAUSAR_REPARACION",
            EventKind::CompletarReparacion => "COMPLETAR_REPARACION",
            EventKind::CancelarReparacion => "CANCELAR_REPARACION",
            EventKind::UnionArmRegistrada => "UNION_ARM_REGISTRADA",
            EventKind::UnionSoldRegistrada => "UNION_SOLD_REGISTRADA",
            EventKind::SpoolCancelado => "SPOOL_CANCELADO",
            EventKind::SupervisorOverride => "SUPERVISOR_OVERRIDE",
        }
    }
}

/// Registro de auditoría append-only. El orden de columnas es estable por
/// contrato (§6.2); `n_union` es opcional para compatibilidad retroactiva
/// con filas de 10 columnas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub tag: String,
    pub worker_id: i64,
    pub worker_name: String,
    pub operacion: String,
    pub accion: String,
    pub fecha_operacion: String,
    pub metadata_json: serde_json::Value,
    pub n_union: Option<i32>,
}

impl Event {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: EventKind,
        tag: impl Into<String>,
        worker_id: i64,
        worker_name: impl Into<String>,
        operacion: impl Into<String>,
        accion: impl Into<String>,
        fecha_operacion: impl Into<String>,
        metadata_json: serde_json::Value,
        n_union: Option<i32>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind,
            tag: tag.into(),
            worker_id,
            worker_name: worker_name.into(),
            operacion: operacion.into(),
            accion: accion.into(),
            fecha_operacion: fecha_operacion.into(),
            metadata_json,
            n_union,
        }
    }

    /// Evento sintético `SUPERVISOR_OVERRIDE` (§4.9): worker_id = 0, name = "SYSTEM".
    pub fn supervisor_override(tag: impl Into<String>, previous: &str, current: &str) -> Self {
        let detected_at = Utc::now();
        Self::new(
            EventKind::SupervisorOverride,
            tag,
            0,
            "SYSTEM",
            "REPARACION",
            "OVERRIDE_DETECTADO",
            crate::timefmt::format_timestamp(detected_at),
            serde_json::json!({
                "previous": previous,
                "current": current,
                "detected_at": detected_at.to_rfc3339(),
            }),
            None,
        )
    }
}

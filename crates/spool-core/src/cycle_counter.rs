// [crates/spool-core/src/cycle_counter.rs]
//! CycleCounter (§4.2): extrae, incrementa y formatea el contador de
//! rechazos consecutivos embebido en `estado_detalle`. Es el único escritor
//! de ese campo (§9: "display field as substate carrier").

use once_cell::sync::Lazy;
use regex::Regex;

static CYCLE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"Ciclo (\d+)/3").expect("static cycle regex is valid"));

pub const MAX_CYCLE: u8 = 3;

/// El tipo de mensaje que `format` debe emitir, uno por cada cadena canónica
/// listada en §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDisplayKind {
    Rechazado,
    Bloqueado,
    EnReparacion,
    ReparacionPausada,
    PendienteMetrologia,
    MetrologiaAprobado,
}

/// Extrae el contador de ciclo de `estado_detalle`. `BLOQUEADO` siempre
/// cuenta como 3 incluso si el patrón numérico no aparece; cualquier otro
/// texto sin el patrón cuenta como 0.
pub fn extract(estado_detalle: &str) -> u8 {
    if estado_detalle.contains("BLOQUEADO") {
        return MAX_CYCLE;
    }
    CYCLE_PATTERN
        .captures(estado_detalle)
        .and_then(|captures| captures.get(1))
        .and_then(|group| group.as_str().parse::<u8>().ok())
        .unwrap_or(0)
}

/// Incrementa el contador, limitado a [`MAX_CYCLE`].
pub fn increment(cycle: u8) -> u8 {
    cycle.saturating_add(1).min(MAX_CYCLE)
}

/// `true` si el contador alcanzó el umbral de bloqueo.
pub fn should_block(cycle: u8) -> bool {
    cycle >= MAX_CYCLE
}

/// Formatea la cadena canónica de `estado_detalle` para el tipo de
/// visualización dado (§4.2).
pub fn format(kind: CycleDisplayKind, cycle: u8, worker: Option<&str>) -> String {
    match kind {
        CycleDisplayKind::Rechazado => format!("RECHAZADO (Ciclo {cycle}/3) - Pendiente reparación"),
        CycleDisplayKind::Bloqueado => "BLOQUEADO - Contactar supervisor".to_string(),
        CycleDisplayKind::EnReparacion => {
            let holder = worker.unwrap_or("");
            format!("EN_REPARACION (Ciclo {cycle}/3) - Ocupado: {holder}")
        }
        CycleDisplayKind::ReparacionPausada => format!("REPARACION_PAUSADA (Ciclo {cycle}/3)"),
        CycleDisplayKind::PendienteMetrologia => format!("PENDIENTE_METROLOGIA (Ciclo {cycle}/3)"),
        CycleDisplayKind::MetrologiaAprobado => "METROLOGIA_APROBADO ✓".to_string(),
    }
}

/// Cadena canónica escrita tras una METROLOGIA APROBADO: el contador se
/// resetea implícitamente a 0 por no llevar el patrón `Ciclo X/3`.
pub fn reset() -> String {
    format(CycleDisplayKind::MetrologiaAprobado, 0, None)
}

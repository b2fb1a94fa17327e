// [apps/spool-orchestrator/src/services/override_sweep.rs]
/*!
 * =================================================================
 * APARATO: OVERRIDE SWEEP DAEMON (V1.0 - SHOP FLOOR STRATA)
 * CLASIFICACIÓN: BACKGROUND INFRASTRUCTURE SERVICE (ESTRATO L4)
 * RESPONSABILIDAD: ESCRUTINIO PERIÓDICO DE REESCRITURAS DIRECTAS DE ESTADO
 *
 * Generalizado de `services/identity_guard.rs` del taller original: el
 * mismo patrón de ticker + barrido, aplicado aquí a la detección (no
 * prevención) de overrides de supervisor sobre `estado_detalle` (§4.9).
 * Deshabilitado por defecto; `detect_supervisor_override` ya cubre la
 * detección on-demand en cada observación normal del carrete — este
 * barrido solo adelanta esa misma detección a carretes que nadie más está
 * observando.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;

use spool_core::orchestrator::StateOrchestrator;
use spool_store::memory::{MemoryEventLog, MemoryLockService, MemoryRowStore};
use spool_store::contracts::RowStore;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, instrument, warn};

const OPERACIONES: &str = "Operaciones";

/// Centinela que, en cada ciclo, invoca la misma detección de regresión
/// BLOQUEADO que `load()` aplica on-demand (§4.9), sobre todas las filas de
/// `Operaciones` en lugar de solo la que una solicitud entrante toca.
pub struct OverrideSweepDaemon {
    rows: Arc<MemoryRowStore>,
    locks: Arc<MemoryLockService>,
    events: Arc<MemoryEventLog>,
    interval: Duration,
}

impl OverrideSweepDaemon {
    pub fn new(rows: Arc<MemoryRowStore>, locks: Arc<MemoryLockService>, events: Arc<MemoryEventLog>, interval: Duration) -> Self {
        Self { rows, locks, events, interval }
    }

    #[instrument(skip(self))]
    pub async fn spawn(self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval_seconds = self.interval.as_secs(), "👁️ [OVERRIDE_SWEEP]: watch active");

        loop {
            ticker.tick().await;
            let orchestrator = StateOrchestrator::new(self.locks.as_ref(), self.rows.as_ref(), self.events.as_ref());

            let rows = match self.rows.read_all(OPERACIONES).await {
                Ok(rows) => rows,
                Err(error) => {
                    warn!(?error, "⚠️ [OVERRIDE_SWEEP]: read_all failed, skipping cycle");
                    continue;
                }
            };

            for row in &rows {
                let Some(tag) = row.get("tag") else { continue };
                match orchestrator.detect_supervisor_override(tag).await {
                    Ok(Some(_)) => {}
                    Ok(None) => {}
                    Err(error) => warn!(tag = %tag, ?error, "⚠️ [OVERRIDE_SWEEP]: detection failed"),
                }
            }
        }
    }
}

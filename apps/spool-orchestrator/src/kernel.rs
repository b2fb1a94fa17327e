// [apps/spool-orchestrator/src/kernel.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR KERNEL (V1.0 - SHOP FLOOR GROUND ZERO)
 * CLASIFICACIÓN: COMPOSITION ROOT (ESTRATO L1-APP)
 * RESPONSABILIDAD: IGNICIÓN DE LOS ADAPTADORES DE REFERENCIA Y EXPOSICIÓN
 *                   DEL MOTOR DE OCUPACIÓN A LOS CONSUMIDORES DEL BINARIO
 *
 * Generalización de `OrchestratorKernel::ignite` del taller original: aquí
 * no hay conexión a una base de datos real que establecer (RowStore/EventLog/
 * LockService son colaboradores fuera de alcance, §1), así que la ignición
 * se reduce a construir los adaptadores de memoria de `spool-store` tras
 * `Arc`, de forma que el barrido de fondo opcional (§4.9) pueda clonarlos
 * hacia una tarea `'static` sin que el motor deje de tomarlos por referencia
 * prestada en la ruta síncrona del escenario de demostración.
 * =================================================================
 */

use std::sync::Arc;
use std::time::Duration;

use spool_core::orchestrator::StateOrchestrator;
use spool_store::memory::{MemoryEventLog, MemoryLockService, MemoryRowStore};
use tracing::info;

use crate::config::RuntimeConfig;
use crate::services::OverrideSweepDaemon;

/// Placa base del proceso: posee los tres adaptadores de memoria y presta
/// referencias de ellos al motor en cada invocación (§9 "hydration over
/// caching" — el propio `StateOrchestrator` no retiene estado).
pub struct OrchestratorKernel {
    rows: Arc<MemoryRowStore>,
    locks: Arc<MemoryLockService>,
    events: Arc<MemoryEventLog>,
}

impl OrchestratorKernel {
    /// Construye el kernel con adaptadores de memoria vacíos. El escenario
    /// de demostración es responsable de sembrar las filas iniciales.
    pub fn ignite() -> Self {
        info!("🏗️ [KERNEL]: igniting in-memory spool floor adapters");
        Self { rows: Arc::new(MemoryRowStore::new()), locks: Arc::new(MemoryLockService::new()), events: Arc::new(MemoryEventLog::new()) }
    }

    pub fn rows(&self) -> &MemoryRowStore {
        self.rows.as_ref()
    }

    pub fn events(&self) -> &MemoryEventLog {
        self.events.as_ref()
    }

    /// Presta una nueva composición del motor sobre los adaptadores
    /// poseídos por este kernel (§4.5: re-hidratado en cada invocación).
    pub fn orchestrator(&self) -> StateOrchestrator<'_, MemoryLockService, MemoryRowStore, MemoryEventLog> {
        StateOrchestrator::new(self.locks.as_ref(), self.rows.as_ref(), self.events.as_ref())
    }

    /// Lanza, si está habilitado por configuración, el barrido de detección
    /// de override de supervisor (§4.9 SUPLEMENTO) como tarea de fondo.
    pub fn spawn_override_sweep(&self, config: &RuntimeConfig) {
        if !config.override_sweep_enabled {
            info!("💤 [KERNEL]: override sweep disabled by configuration");
            return;
        }
        let daemon = OverrideSweepDaemon::new(
            self.rows.clone(),
            self.locks.clone(),
            self.events.clone(),
            Duration::from_secs(config.override_sweep_interval_seconds),
        );
        tokio::spawn(async move { daemon.spawn().await });
    }
}

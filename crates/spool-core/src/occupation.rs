// [crates/spool-core/src/occupation.rs]
/*!
 * =================================================================
 * APARATO: OCCUPATION COORDINATOR (V1.0 - SHOP FLOOR GROUND ZERO)
 * CLASIFICACIÓN: CORE ENGINE (ESTRATO L1)
 * RESPONSABILIDAD: EXCLUSIÓN MUTUA DISTRIBUIDA SOBRE IDENTIFICADORES DE CARRETE
 *
 * Generalizado del patrón de arrendamiento atómico de
 * `libs/infra/db-turso/src/repositories/identity` del taller original
 * (lease, verify, prune) y del daemon de barrido periódico de
 * `identity_guard.rs` (§2).
 * =================================================================
 */

use std::time::Duration;

use spool_domain::spool::Spool;
use spool_store::contracts::{CellUpdate, LockService, RowStore};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::CoreError;

/// TTL del arrendamiento de ocupación (§4.4, §9 Open Questions: resuelto en
/// `DESIGN.md` a 12 horas — suficiente para cubrir una sesión de trabajo
/// multi-turno, refrescado en cada observación exitosa del mismo propietario).
pub const OCCUPATION_LEASE_TTL: Duration = Duration::from_secs(12 * 60 * 60);

const TABLE: &str = "Operaciones";

/// Modo de liberación de la ocupación (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseMode {
    Pause,
    Complete,
    Cancel,
}

/// Token de propiedad devuelto por `acquire`, opaco al llamador.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipToken(pub String);

/// Coordina la exclusión mutua distribuida sobre carretes (§4.4). Invocado
/// exclusivamente a través del orquestador; nunca directamente por
/// llamadores externos.
pub struct OccupationCoordinator<'a, L: LockService, S: RowStore> {
    pub locks: &'a L,
    pub rows: &'a S,
}

impl<'a, L: LockService, S: RowStore> OccupationCoordinator<'a, L, S> {
    pub fn new(locks: &'a L, rows: &'a S) -> Self {
        Self { locks, rows }
    }

    /// `acquire(T, W, row) → token | fails(SpoolOccupied)`. Verifica
    /// `ocupado_por ∈ {∅, W}` sobre la fila ya hidratada por el llamador
    /// antes de tocar el `LockService` (§4.4): el lock acelera, pero
    /// `ocupado_por` sigue siendo la autoridad sobre la titularidad (§6.4).
    #[instrument(skip(self, spool))]
    pub async fn acquire(&self, tag: &str, worker_canonical: &str, current_row: usize, spool: &Spool) -> Result<OwnershipToken, CoreError> {
        if let Some(holder) = spool.ocupado_por.as_deref().filter(|holder| !holder.is_empty()) {
            if holder != worker_canonical {
                warn!(tag, holder, "🔒 [OCCUPATION]: acquire denied, ocupado_por already set");
                return Err(CoreError::SpoolOccupied { tag: tag.to_string(), holder: holder.to_string() });
            }
        }

        let acquired = self.locks.acquire(tag, worker_canonical, OCCUPATION_LEASE_TTL).await?;
        if !acquired {
            let holder = self.locks.inspect(tag).await?.unwrap_or_else(|| "UNKNOWN".to_string());
            warn!(tag, holder, "🔒 [OCCUPATION]: acquire denied, spool already held");
            return Err(CoreError::SpoolOccupied { tag: tag.to_string(), holder });
        }

        let fresh_version = Uuid::new_v4();
        self.rows
            .batch_update_by_column_name(
                TABLE,
                vec![
                    CellUpdate::new(current_row, "ocupado_por", worker_canonical),
                    CellUpdate::new(current_row, "fecha_ocupacion", spool_domain::timefmt::format_timestamp(chrono::Utc::now())),
                    CellUpdate::new(current_row, "version", fresh_version.to_string()),
                ],
            )
            .await?;

        info!(tag, worker = worker_canonical, "🔓 [OCCUPATION]: acquired");
        Ok(OwnershipToken(fresh_version.to_string()))
    }

    /// `verify(T, W, token) → ok | fails(Forbidden | Gone)`. Confirma, sobre
    /// la fila ya hidratada por el llamador, que `ocupado_por = W` y que
    /// `token` coincide con la `version` actual de la fila — además de (no
    /// en lugar de) la comprobación de titular de `LockService`.
    #[instrument(skip(self, token, spool))]
    pub async fn verify(&self, tag: &str, worker_canonical: &str, token: &OwnershipToken, spool: &Spool) -> Result<(), CoreError> {
        let holder = self.locks.inspect(tag).await?;
        match holder {
            None => return Err(CoreError::Gone { tag: tag.to_string() }),
            Some(current_holder) if current_holder != worker_canonical => return Err(CoreError::Forbidden { tag: tag.to_string() }),
            Some(_) => {}
        }

        match spool.ocupado_por.as_deref().filter(|holder| !holder.is_empty()) {
            Some(holder) if holder == worker_canonical => {}
            _ => return Err(CoreError::Forbidden { tag: tag.to_string() }),
        }

        if spool.version.to_string() != token.0 {
            return Err(CoreError::Gone { tag: tag.to_string() });
        }

        self.locks.refresh(tag, worker_canonical, OCCUPATION_LEASE_TTL).await?;
        Ok(())
    }

    /// `release(T, W, token, mode)`: limpia ocupación (o deja testigos de
    /// completitud intactos en `Complete`), siempre libera el lock.
    #[instrument(skip(self, token, spool))]
    pub async fn release(
        &self,
        tag: &str,
        worker_canonical: &str,
        token: &OwnershipToken,
        mode: ReleaseMode,
        current_row: usize,
        spool: &Spool,
    ) -> Result<(), CoreError> {
        self.verify(tag, worker_canonical, token, spool).await?;

        let fresh_version = Uuid::new_v4();
        let mut updates = vec![
            CellUpdate::new(current_row, "ocupado_por", ""),
            CellUpdate::new(current_row, "fecha_ocupacion", ""),
            CellUpdate::new(current_row, "version", fresh_version.to_string()),
        ];
        if mode == ReleaseMode::Complete {
            // Las columnas de ocupación se limpian igual; los testigos de
            // completitud (fecha_armado/fecha_soldadura/...) ya fueron
            // escritos por la máquina de estado antes de llegar aquí.
            updates.truncate(3);
        }

        self.rows.batch_update_by_column_name(TABLE, updates).await?;
        self.locks.release(tag, worker_canonical).await?;

        info!(tag, worker = worker_canonical, mode = ?mode, "🔓 [OCCUPATION]: released");
        Ok(())
    }
}

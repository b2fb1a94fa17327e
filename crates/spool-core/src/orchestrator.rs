// [crates/spool-core/src/orchestrator.rs]
/*!
 * =================================================================
 * APARATO: STATE ORCHESTRATOR (V1.0 - EL COMPOSITOR DE TRANSICIONES)
 * CLASIFICACIÓN: CORE ENGINE (ESTRATO L2)
 * RESPONSABILIDAD: COMPONER VALIDACIÓN + OCUPACIÓN + MÁQUINAS DE ESTADO +
 *                   EMISIÓN DE EVENTOS EN UNA ÚNICA SECUENCIA POR SOLICITUD.
 *
 * Flujo de 7 pasos (§4.5): leer fila → validar → hidratar → ocupación →
 * transición + escritura por lote → emitir evento → devolver display.
 *
 * Cada método re-lee e hidrata desde cero (§9: "hydration over caching");
 * el orquestador no retiene estado entre solicitudes.
 * =================================================================
 */

use std::time::Duration;

use chrono::Utc;
use spool_domain::event::{Event, EventKind};
use spool_domain::spool::Spool;
use spool_domain::worker::WorkerRef;
use spool_store::contracts::{CellUpdate, EventLog, LockService, RowStore};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::CoreError;
use crate::finalizar::{self, SpoolAction, UnionOperation};
use crate::mapping;
use crate::occupation::{OccupationCoordinator, OwnershipToken};
use crate::render::{self, DisplaySnapshot};
use crate::state_machines::{arm, metrologia, reparacion, sold};
use crate::validation;

const OPERACIONES: &str = "Operaciones";
const UNIONES: &str = "Uniones";

/// Base de espera del backoff exponencial acotado (§4.5 paso 6, §7).
/// Generalizado del ciclo sleep-then-retry de `outbox_relay.rs` del taller
/// original, aplicado aquí por intento en lugar de por ciclo de escrutinio.
const WRITE_RETRY_BACKOFF_BASE_MS: u64 = 50;
/// Intentos totales ante `TransientBackendError`; `VersionConflict` se
/// reintenta una única vez, fuera de este contador (§4.5, §7).
const WRITE_RETRY_MAX_ATTEMPTS: u32 = 3;

/// Resultado de una transición: el nuevo `estado_detalle` compuesto y, para
/// transiciones que establecen ocupación, el token a devolver al llamador.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub estado_detalle: String,
    pub token: Option<OwnershipToken>,
}

/// Composición de `ValidationKernel` + `OccupationCoordinator` + máquinas de
/// estado + `EventLog` sobre un único carrete por invocación (§4.5).
pub struct StateOrchestrator<'a, L: LockService, S: RowStore, E: EventLog> {
    pub locks: &'a L,
    pub rows: &'a S,
    pub events: &'a E,
}

impl<'a, L: LockService, S: RowStore, E: EventLog> StateOrchestrator<'a, L, S, E> {
    pub fn new(locks: &'a L, rows: &'a S, events: &'a E) -> Self {
        Self { locks, rows, events }
    }

    async fn read_spool(&self, tag: &str) -> Result<(Spool, usize), CoreError> {
        let row = self.rows.read_row(OPERACIONES, tag).await?;
        let index = self.rows.find_row_by_column(OPERACIONES, "tag", tag).await?.ok_or_else(|| CoreError::NotFound(tag.to_string()))?;
        Ok((mapping::spool_from_row(&row)?, index))
    }

    async fn load(&self, tag: &str) -> Result<(Spool, usize), CoreError> {
        let (spool, index) = self.read_spool(tag).await?;
        match self.bloqueado_regression_event(tag, &spool.estado_detalle).await {
            Ok(Some(event)) => {
                tracing::warn!(tag, current = %spool.estado_detalle, "👁️ [ORCHESTRATOR]: supervisor override detected");
                self.emit(event).await;
            }
            Ok(None) => {}
            Err(error) => tracing::warn!(tag, ?error, "⚠️ [ORCHESTRATOR]: supervisor override detection failed, continuing"),
        }
        Ok((spool, index))
    }

    fn coordinator(&self) -> OccupationCoordinator<'_, L, S> {
        OccupationCoordinator::new(self.locks, self.rows)
    }

    async fn emit(&self, event: Event) {
        self.emit_batch_with_retry(vec![event]).await;
    }

    /// Emisión de eventos "best-effort" (§4.5 paso 6, §7): reintenta
    /// `TransientBackendError` con el mismo backoff que las escrituras, pero
    /// jamás propaga el fallo — el estado ya fue confirmado por la escritura
    /// por lote que precede a esta llamada.
    async fn emit_batch_with_retry(&self, events: Vec<Event>) {
        let mut attempt: u32 = 0;
        loop {
            match self.events.append(events.clone()).await {
                Ok(()) => return,
                Err(error) => {
                    let core_error = CoreError::from(error);
                    if matches!(core_error, CoreError::TransientBackendError(_)) && attempt + 1 < WRITE_RETRY_MAX_ATTEMPTS {
                        attempt += 1;
                        let backoff_ms = WRITE_RETRY_BACKOFF_BASE_MS * 2u64.pow(attempt - 1);
                        tracing::warn!(attempt, backoff_ms, "⚠️ [ORCHESTRATOR]: transient backend error on event emission, backing off");
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                        continue;
                    }
                    tracing::warn!(?core_error, "⚠️ [ORCHESTRATOR]: event emission failed after retries, state already committed");
                    return;
                }
            }
        }
    }

    /// Política de reintento de escrituras por lote (§4.5 paso 6, §7):
    /// `VersionConflict` se reintenta una única vez; `TransientBackendError`
    /// se reintenta con backoff exponencial acotado hasta
    /// [`WRITE_RETRY_MAX_ATTEMPTS`] intentos. Cualquier otro error se
    /// propaga de inmediato.
    async fn write_batch_with_retry(&self, table: &str, updates: Vec<CellUpdate>) -> Result<(), CoreError> {
        let mut attempt: u32 = 0;
        let mut version_conflict_retried = false;
        loop {
            match self.rows.batch_update_by_column_name(table, updates.clone()).await {
                Ok(()) => return Ok(()),
                Err(error) => {
                    let core_error = CoreError::from(error);
                    match core_error {
                        CoreError::VersionConflict { .. } if !version_conflict_retried => {
                            version_conflict_retried = true;
                            tracing::warn!(table, "⚠️ [ORCHESTRATOR]: version conflict on write, retrying once");
                            continue;
                        }
                        CoreError::TransientBackendError(_) if attempt + 1 < WRITE_RETRY_MAX_ATTEMPTS => {
                            attempt += 1;
                            let backoff_ms = WRITE_RETRY_BACKOFF_BASE_MS * 2u64.pow(attempt - 1);
                            tracing::warn!(table, attempt, backoff_ms, "⚠️ [ORCHESTRATOR]: transient backend error on write, backing off");
                            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                            continue;
                        }
                        other => return Err(other),
                    }
                }
            }
        }
    }

    /// `true` si el último evento registrado para `T` es un rechazo de
    /// METROLOGIA que dejó `estado_detalle` en BLOQUEADO (§4.9).
    fn last_event_signals_bloqueado(event: &Event) -> bool {
        event.kind == EventKind::CompletarMetrologia
            && event.metadata_json.get("estado_detalle").and_then(|value| value.as_str()).is_some_and(|estado| estado.contains("BLOQUEADO"))
    }

    /// Calcula (sin emitir) el evento `SUPERVISOR_OVERRIDE` que corresponde
    /// si el último evento registrado para `T` señala BLOQUEADO y el
    /// `estado_detalle` actual ya no lo contiene (§4.9, escenario S5).
    async fn bloqueado_regression_event(&self, tag: &str, current_estado_detalle: &str) -> Result<Option<Event>, CoreError> {
        let last_event = self.events.last_event_for_tag(tag).await?;
        let regressed = last_event.as_ref().is_some_and(Self::last_event_signals_bloqueado) && !current_estado_detalle.contains("BLOQUEADO");
        Ok(regressed.then(|| Event::supervisor_override(tag, "BLOQUEADO", current_estado_detalle)))
    }

    fn phase_display(
        arm_state: arm::ArmState,
        sold_state: sold::SoldState,
        metrologia_state: metrologia::MetrologiaState,
        occupied_by: Option<String>,
    ) -> String {
        render::render(&DisplaySnapshot { occupied_by, arm_state, sold_state, metrologia_state, governed_display: None })
    }

    // ---- ARM -----------------------------------------------------------

    #[instrument(skip(self, worker))]
    pub async fn tomar_arm(&self, tag: &str, worker: &WorkerRef) -> Result<TransitionOutcome, CoreError> {
        let (spool, index) = self.load(tag).await?;
        validation::can_tomar(&spool, worker, "ARM")?;
        let state = arm::hydrate(&spool);
        let (next_state, effect) = arm::tomar(state, &worker.canonical())?;

        let token = self.coordinator().acquire(tag, &worker.canonical(), index, &spool).await?;

        let estado_detalle = Self::phase_display(next_state, sold::hydrate(&spool), metrologia::hydrate(&spool), Some(worker.canonical()));
        let fresh_version = Uuid::new_v4();
        let mut updates = vec![CellUpdate::new(index, "estado_detalle", estado_detalle.as_str()), CellUpdate::new(index, "version", fresh_version.to_string())];
        if let Some(armador) = effect.armador {
            updates.push(CellUpdate::new(index, "armador", armador.unwrap_or_default()));
        }
        self.write_batch_with_retry(OPERACIONES, updates).await?;

        self.emit(Event::new(EventKind::TomarSpool, tag, worker.id, worker.name.clone(), "ARM", "TOMAR", today(), serde_json::json!({}), None)).await;
        info!(tag, worker = %worker.canonical(), "🏗️ [ORCHESTRATOR]: ARM tomado");
        Ok(TransitionOutcome { estado_detalle, token: Some(token) })
    }

    #[instrument(skip(self, worker, token))]
    pub async fn completar_arm(&self, tag: &str, worker: &WorkerRef, token: &OwnershipToken) -> Result<TransitionOutcome, CoreError> {
        let (spool, index) = self.load(tag).await?;
        validation::can_pausar_or_completar(&spool, worker)?;
        let state = arm::hydrate(&spool);
        let (next_state, effect) = arm::completar(state, &today())?;
        self.coordinator().verify(tag, &worker.canonical(), token, &spool).await?;

        let estado_detalle = Self::phase_display(next_state, sold::hydrate(&spool), metrologia::hydrate(&spool), None);
        let fresh_version = Uuid::new_v4();
        let mut updates = vec![
            CellUpdate::new(index, "estado_detalle", estado_detalle.as_str()),
            CellUpdate::new(index, "ocupado_por", ""),
            CellUpdate::new(index, "fecha_ocupacion", ""),
            CellUpdate::new(index, "version", fresh_version.to_string()),
        ];
        if let Some(fecha) = effect.fecha_armado {
            updates.push(CellUpdate::new(index, "fecha_armado", fecha.unwrap_or_default()));
        }
        self.write_batch_with_retry(OPERACIONES, updates).await?;
        self.locks.release(tag, &worker.canonical()).await?;

        self.emit(Event::new(EventKind::CompletarArm, tag, worker.id, worker.name.clone(), "ARM", "COMPLETAR", today(), serde_json::json!({}), None)).await;
        info!(tag, "✅ [ORCHESTRATOR]: ARM completado");
        Ok(TransitionOutcome { estado_detalle, token: None })
    }

    #[instrument(skip(self, worker, token))]
    pub async fn cancelar_arm(&self, tag: &str, worker: &WorkerRef, token: &OwnershipToken) -> Result<TransitionOutcome, CoreError> {
        let (spool, index) = self.load(tag).await?;
        validation::can_cancelar(&spool, worker)?;
        let state = arm::hydrate(&spool);
        let (next_state, effect) = arm::cancelar(state)?;
        self.coordinator().verify(tag, &worker.canonical(), token, &spool).await?;

        let estado_detalle = Self::phase_display(next_state, sold::hydrate(&spool), metrologia::hydrate(&spool), None);
        let fresh_version = Uuid::new_v4();
        let mut updates = vec![
            CellUpdate::new(index, "estado_detalle", estado_detalle.as_str()),
            CellUpdate::new(index, "ocupado_por", ""),
            CellUpdate::new(index, "fecha_ocupacion", ""),
            CellUpdate::new(index, "version", fresh_version.to_string()),
        ];
        if let Some(armador) = effect.armador {
            updates.push(CellUpdate::new(index, "armador", armador.unwrap_or_default()));
        }
        self.write_batch_with_retry(OPERACIONES, updates).await?;
        self.locks.release(tag, &worker.canonical()).await?;

        self.emit(Event::new(EventKind::SpoolCancelado, tag, worker.id, worker.name.clone(), "ARM", "CANCELAR", today(), serde_json::json!({}), None)).await;
        Ok(TransitionOutcome { estado_detalle, token: None })
    }

    // ---- SOLD -----------------------------------------------------------

    #[instrument(skip(self, worker))]
    pub async fn iniciar_sold(&self, tag: &str, worker: &WorkerRef) -> Result<TransitionOutcome, CoreError> {
        let (spool, index) = self.load(tag).await?;
        validation::can_tomar(&spool, worker, "SOLD")?;
        let state = sold::hydrate(&spool);
        let (next_state, effect) = sold::iniciar(state, &spool, &worker.canonical())?;

        let token = self.coordinator().acquire(tag, &worker.canonical(), index, &spool).await?;

        let estado_detalle = Self::phase_display(arm::hydrate(&spool), next_state, metrologia::hydrate(&spool), Some(worker.canonical()));
        let fresh_version = Uuid::new_v4();
        let mut updates = vec![CellUpdate::new(index, "estado_detalle", estado_detalle.as_str()), CellUpdate::new(index, "version", fresh_version.to_string())];
        if let Some(soldador) = effect.soldador {
            updates.push(CellUpdate::new(index, "soldador", soldador.unwrap_or_default()));
        }
        self.write_batch_with_retry(OPERACIONES, updates).await?;

        self.emit(Event::new(EventKind::TomarSpool, tag, worker.id, worker.name.clone(), "SOLD", "TOMAR", today(), serde_json::json!({}), None)).await;
        Ok(TransitionOutcome { estado_detalle, token: Some(token) })
    }

    #[instrument(skip(self, worker, token))]
    pub async fn completar_sold(&self, tag: &str, worker: &WorkerRef, token: &OwnershipToken) -> Result<TransitionOutcome, CoreError> {
        let (spool, index) = self.load(tag).await?;
        validation::can_pausar_or_completar(&spool, worker)?;
        let state = sold::hydrate(&spool);
        let (next_state, effect) = sold::completar(state, &today())?;
        self.coordinator().verify(tag, &worker.canonical(), token, &spool).await?;

        let estado_detalle = Self::phase_display(arm::hydrate(&spool), next_state, metrologia::hydrate(&spool), None);
        let fresh_version = Uuid::new_v4();
        let mut updates = vec![
            CellUpdate::new(index, "estado_detalle", estado_detalle.as_str()),
            CellUpdate::new(index, "ocupado_por", ""),
            CellUpdate::new(index, "fecha_ocupacion", ""),
            CellUpdate::new(index, "version", fresh_version.to_string()),
        ];
        if let Some(fecha) = effect.fecha_soldadura {
            updates.push(CellUpdate::new(index, "fecha_soldadura", fecha.unwrap_or_default()));
        }
        self.write_batch_with_retry(OPERACIONES, updates).await?;
        self.locks.release(tag, &worker.canonical()).await?;

        self.emit(Event::new(EventKind::CompletarSold, tag, worker.id, worker.name.clone(), "SOLD", "COMPLETAR", today(), serde_json::json!({}), None)).await;
        Ok(TransitionOutcome { estado_detalle, token: None })
    }

    #[instrument(skip(self, worker, token))]
    pub async fn cancelar_sold(&self, tag: &str, worker: &WorkerRef, token: &OwnershipToken) -> Result<TransitionOutcome, CoreError> {
        let (spool, index) = self.load(tag).await?;
        validation::can_cancelar(&spool, worker)?;
        let state = sold::hydrate(&spool);
        let (next_state, effect) = sold::cancelar(state)?;
        self.coordinator().verify(tag, &worker.canonical(), token, &spool).await?;

        let estado_detalle = Self::phase_display(arm::hydrate(&spool), next_state, metrologia::hydrate(&spool), None);
        let fresh_version = Uuid::new_v4();
        let mut updates = vec![
            CellUpdate::new(index, "estado_detalle", estado_detalle.as_str()),
            CellUpdate::new(index, "ocupado_por", ""),
            CellUpdate::new(index, "fecha_ocupacion", ""),
            CellUpdate::new(index, "version", fresh_version.to_string()),
        ];
        if let Some(soldador) = effect.soldador {
            updates.push(CellUpdate::new(index, "soldador", soldador.unwrap_or_default()));
        }
        self.write_batch_with_retry(OPERACIONES, updates).await?;
        self.locks.release(tag, &worker.canonical()).await?;

        self.emit(Event::new(EventKind::SpoolCancelado, tag, worker.id, worker.name.clone(), "SOLD", "CANCELAR", today(), serde_json::json!({}), None)).await;
        Ok(TransitionOutcome { estado_detalle, token: None })
    }

    // ---- FINALIZAR (§4.6, acción a nivel de unión) -----------------------

    #[instrument(skip(self, worker, token, selected_union_ids))]
    pub async fn finalizar_arm(
        &self,
        tag: &str,
        worker: &WorkerRef,
        token: &OwnershipToken,
        selected_union_ids: &[String],
    ) -> Result<TransitionOutcome, CoreError> {
        self.finalizar(tag, worker, token, UnionOperation::Arm, selected_union_ids).await
    }

    #[instrument(skip(self, worker, token, selected_union_ids))]
    pub async fn finalizar_sold(
        &self,
        tag: &str,
        worker: &WorkerRef,
        token: &OwnershipToken,
        selected_union_ids: &[String],
    ) -> Result<TransitionOutcome, CoreError> {
        self.finalizar(tag, worker, token, UnionOperation::Sold, selected_union_ids).await
    }

    async fn finalizar(
        &self,
        tag: &str,
        worker: &WorkerRef,
        token: &OwnershipToken,
        operation: UnionOperation,
        selected_union_ids: &[String],
    ) -> Result<TransitionOutcome, CoreError> {
        let (spool, spool_index) = self.load(tag).await?;
        validation::can_pausar_or_completar(&spool, worker)?;
        self.coordinator().verify(tag, &worker.canonical(), token, &spool).await?;

        let all_unions = self.rows.read_all(UNIONES).await?;
        let unions: Vec<_> = all_unions
            .iter()
            .map(mapping::union_from_row)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|union| union.ot == spool.ot)
            .collect();

        let plan = finalizar::plan(operation, &unions, selected_union_ids, &worker.canonical());

        let mut union_updates = Vec::with_capacity(plan.cell_writes.len());
        for write in &plan.cell_writes {
            let row_index = self
                .rows
                .find_row_by_column(UNIONES, "composite_id", &write.composite_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(write.composite_id.clone()))?;
            union_updates.push(CellUpdate::new(row_index, write.column_name.as_str(), write.value.as_str()));
        }
        if !union_updates.is_empty() {
            self.write_batch_with_retry(UNIONES, union_updates).await?;
        }

        let arm_state = arm::hydrate(&spool);
        let sold_state = sold::hydrate(&spool);
        let metrologia_state = metrologia::hydrate(&spool);

        let (estado_detalle, mut spool_updates, event_kind) = match (operation, plan.spool_action) {
            (UnionOperation::Arm, SpoolAction::Completar) => {
                let display = Self::phase_display(arm::ArmState::Completado, sold_state, metrologia_state, None);
                (display, vec![CellUpdate::new(spool_index, "fecha_armado", today())], EventKind::CompletarArm)
            }
            (UnionOperation::Sold, SpoolAction::Completar) if plan.triggers_pendiente_metrologia => {
                ("PENDIENTE_METROLOGIA".to_string(), vec![CellUpdate::new(spool_index, "fecha_soldadura", today())], EventKind::CompletarSold)
            }
            (UnionOperation::Sold, SpoolAction::Completar) => {
                let display = Self::phase_display(arm_state, sold::SoldState::Completado, metrologia_state, None);
                (display, vec![CellUpdate::new(spool_index, "fecha_soldadura", today())], EventKind::CompletarSold)
            }
            (_, SpoolAction::Pausar) => {
                let display = Self::phase_display(arm_state, sold_state, metrologia_state, None);
                (display, Vec::new(), EventKind::PausarSpool)
            }
            (UnionOperation::Arm, SpoolAction::Cancelar) => {
                let display = Self::phase_display(arm::ArmState::Pendiente, sold_state, metrologia_state, None);
                (display, vec![CellUpdate::new(spool_index, "armador", "")], EventKind::SpoolCancelado)
            }
            (UnionOperation::Sold, SpoolAction::Cancelar) => {
                let display = Self::phase_display(arm_state, sold::SoldState::Pendiente, metrologia_state, None);
                (display, vec![CellUpdate::new(spool_index, "soldador", "")], EventKind::SpoolCancelado)
            }
        };
        let fresh_version = Uuid::new_v4();

        spool_updates.push(CellUpdate::new(spool_index, "estado_detalle", estado_detalle.as_str()));
        spool_updates.push(CellUpdate::new(spool_index, "ocupado_por", ""));
        spool_updates.push(CellUpdate::new(spool_index, "fecha_ocupacion", ""));
        spool_updates.push(CellUpdate::new(spool_index, "version", fresh_version.to_string()));
        self.write_batch_with_retry(OPERACIONES, spool_updates).await?;
        self.locks.release(tag, &worker.canonical()).await?;

        let union_event_kind = match operation {
            UnionOperation::Arm => EventKind::UnionArmRegistrada,
            UnionOperation::Sold => EventKind::UnionSoldRegistrada,
        };
        let mut events: Vec<Event> = plan
            .valid_union_ids
            .iter()
            .map(|id| Event::new(union_event_kind, tag, worker.id, worker.name.clone(), operation_label(operation), "FINALIZAR", today(), serde_json::json!({"union": id}), None))
            .collect();
        events.push(Event::new(event_kind, tag, worker.id, worker.name.clone(), operation_label(operation), "FINALIZAR", today(), serde_json::json!({"accion": format!("{:?}", plan.spool_action)}), None));
        self.emit_batch_with_retry(events).await;

        Ok(TransitionOutcome { estado_detalle, token: None })
    }

    // ---- METROLOGIA ------------------------------------------------------

    #[instrument(skip(self, worker))]
    pub async fn aprobar_metrologia(&self, tag: &str, worker: &WorkerRef) -> Result<TransitionOutcome, CoreError> {
        let (spool, index) = self.load(tag).await?;
        validation::can_metrologia(&spool, worker)?;
        let state = metrologia::hydrate(&spool);
        let (_, effect) = metrologia::aprobar(state, &today())?;

        let fresh_version = Uuid::new_v4();
        let updates = vec![
            CellUpdate::new(index, "estado_detalle", effect.estado_detalle.as_str()),
            CellUpdate::new(index, "fecha_qc_metrologia", effect.fecha_qc_metrologia.as_str()),
            CellUpdate::new(index, "version", fresh_version.to_string()),
        ];
        self.write_batch_with_retry(OPERACIONES, updates).await?;

        self.emit(Event::new(EventKind::CompletarMetrologia, tag, worker.id, worker.name.clone(), "METROLOGIA", "APROBAR", today(), serde_json::json!({"resultado": "APROBADO"}), None))
            .await;
        info!(tag, "✅ [ORCHESTRATOR]: METROLOGIA aprobado");
        Ok(TransitionOutcome { estado_detalle: effect.estado_detalle, token: None })
    }

    #[instrument(skip(self, worker))]
    pub async fn rechazar_metrologia(&self, tag: &str, worker: &WorkerRef) -> Result<TransitionOutcome, CoreError> {
        let (spool, index) = self.load(tag).await?;
        validation::can_metrologia(&spool, worker)?;
        let state = metrologia::hydrate(&spool);
        let (_, effect) = metrologia::rechazar(state, &spool.estado_detalle, &today())?;

        let fresh_version = Uuid::new_v4();
        let updates = vec![
            CellUpdate::new(index, "estado_detalle", effect.estado_detalle.as_str()),
            CellUpdate::new(index, "fecha_qc_metrologia", effect.fecha_qc_metrologia.as_str()),
            CellUpdate::new(index, "version", fresh_version.to_string()),
        ];
        self.write_batch_with_retry(OPERACIONES, updates).await?;

        self.emit(Event::new(
            EventKind::CompletarMetrologia,
            tag,
            worker.id,
            worker.name.clone(),
            "METROLOGIA",
            "RECHAZAR",
            today(),
            serde_json::json!({"resultado": "RECHAZADO", "estado_detalle": effect.estado_detalle}),
            None,
        ))
        .await;
        info!(tag, estado = %effect.estado_detalle, "🔥 [ORCHESTRATOR]: METROLOGIA rechazado");
        Ok(TransitionOutcome { estado_detalle: effect.estado_detalle, token: None })
    }

    // ---- REPARACION -------------------------------------------------------

    #[instrument(skip(self, worker))]
    pub async fn tomar_reparacion(&self, tag: &str, worker: &WorkerRef) -> Result<TransitionOutcome, CoreError> {
        let (spool, index) = self.load(tag).await?;
        validation::can_tomar_reparacion(&spool)?;
        let state = reparacion::hydrate(&spool);
        let (_, effect) = reparacion::tomar(state, &spool, &worker.canonical())?;

        let token = self.coordinator().acquire(tag, &worker.canonical(), index, &spool).await?;
        let fresh_version = Uuid::new_v4();
        let updates = vec![CellUpdate::new(index, "estado_detalle", effect.estado_detalle.as_str()), CellUpdate::new(index, "version", fresh_version.to_string())];
        self.write_batch_with_retry(OPERACIONES, updates).await?;

        self.emit(Event::new(EventKind::TomarReparacion, tag, worker.id, worker.name.clone(), "REPARACION", "TOMAR", today(), serde_json::json!({}), None)).await;
        Ok(TransitionOutcome { estado_detalle: effect.estado_detalle, token: Some(token) })
    }

    #[instrument(skip(self, worker, token))]
    pub async fn pausar_reparacion(&self, tag: &str, worker: &WorkerRef, token: &OwnershipToken) -> Result<TransitionOutcome, CoreError> {
        let (spool, index) = self.load(tag).await?;
        validation::can_pausar_or_completar(&spool, worker)?;
        let state = reparacion::hydrate(&spool);
        let (_, effect) = reparacion::pausar(state, &spool)?;
        self.coordinator().verify(tag, &worker.canonical(), token, &spool).await?;

        let fresh_version = Uuid::new_v4();
        let updates = vec![
            CellUpdate::new(index, "estado_detalle", effect.estado_detalle.as_str()),
            CellUpdate::new(index, "ocupado_por", ""),
            CellUpdate::new(index, "fecha_ocupacion", ""),
            CellUpdate::new(index, "version", fresh_version.to_string()),
        ];
        self.write_batch_with_retry(OPERACIONES, updates).await?;
        self.locks.release(tag, &worker.canonical()).await?;

        self.emit(Event::new(EventKind::PausarReparacion, tag, worker.id, worker.name.clone(), "REPARACION", "PAUSAR", today(), serde_json::json!({}), None)).await;
        Ok(TransitionOutcome { estado_detalle: effect.estado_detalle, token: None })
    }

    #[instrument(skip(self, worker, token))]
    pub async fn completar_reparacion(&self, tag: &str, worker: &WorkerRef, token: &OwnershipToken) -> Result<TransitionOutcome, CoreError> {
        let (spool, index) = self.load(tag).await?;
        validation::can_pausar_or_completar(&spool, worker)?;
        let state = reparacion::hydrate(&spool);
        let (_, effect) = reparacion::completar(state, &spool)?;
        self.coordinator().verify(tag, &worker.canonical(), token, &spool).await?;

        let fresh_version = Uuid::new_v4();
        let mut updates = vec![
            CellUpdate::new(index, "estado_detalle", effect.estado_detalle.as_str()),
            CellUpdate::new(index, "ocupado_por", ""),
            CellUpdate::new(index, "fecha_ocupacion", ""),
            CellUpdate::new(index, "version", fresh_version.to_string()),
        ];
        if effect.fecha_qc_metrologia_clear {
            updates.push(CellUpdate::new(index, "fecha_qc_metrologia", ""));
        }
        self.write_batch_with_retry(OPERACIONES, updates).await?;
        self.locks.release(tag, &worker.canonical()).await?;

        self.emit(Event::new(EventKind::CompletarReparacion, tag, worker.id, worker.name.clone(), "REPARACION", "COMPLETAR", today(), serde_json::json!({}), None)).await;
        info!(tag, "✅ [ORCHESTRATOR]: REPARACION completada, retorna a METROLOGIA, reabre evaluación");
        Ok(TransitionOutcome { estado_detalle: effect.estado_detalle, token: None })
    }

    #[instrument(skip(self, worker, token))]
    pub async fn cancelar_reparacion(&self, tag: &str, worker: &WorkerRef, token: &OwnershipToken) -> Result<TransitionOutcome, CoreError> {
        let (spool, index) = self.load(tag).await?;
        validation::can_cancelar(&spool, worker)?;
        let state = reparacion::hydrate(&spool);
        let (_, effect) = reparacion::cancelar(state, &spool)?;
        self.coordinator().verify(tag, &worker.canonical(), token, &spool).await?;

        let fresh_version = Uuid::new_v4();
        let updates = vec![
            CellUpdate::new(index, "estado_detalle", effect.estado_detalle.as_str()),
            CellUpdate::new(index, "ocupado_por", ""),
            CellUpdate::new(index, "fecha_ocupacion", ""),
            CellUpdate::new(index, "version", fresh_version.to_string()),
        ];
        self.write_batch_with_retry(OPERACIONES, updates).await?;
        self.locks.release(tag, &worker.canonical()).await?;

        self.emit(Event::new(EventKind::CancelarReparacion, tag, worker.id, worker.name.clone(), "REPARACION", "CANCELAR", today(), serde_json::json!({}), None)).await;
        Ok(TransitionOutcome { estado_detalle: effect.estado_detalle, token: None })
    }

    /// Override de supervisor (§4.9): si el último evento registrado para
    /// `T` es un rechazo de METROLOGIA que dejó `estado_detalle` en
    /// BLOQUEADO y el valor actual ya no lo contiene, sintetiza
    /// `SUPERVISOR_OVERRIDE` — detectado, nunca prevenido. `load()` invoca
    /// esta misma lógica en cada lectura (§9: on-demand); este método
    /// público existe para invocación directa fuera de una transición
    /// (guion de demostración, barrido periódico).
    #[instrument(skip(self))]
    pub async fn detect_supervisor_override(&self, tag: &str) -> Result<Option<Event>, CoreError> {
        let (spool, _) = self.read_spool(tag).await?;
        let event = self.bloqueado_regression_event(tag, &spool.estado_detalle).await?;
        if let Some(event) = &event {
            tracing::warn!(tag, current = %spool.estado_detalle, "👁️ [ORCHESTRATOR]: supervisor override detected");
            self.emit(event.clone()).await;
        }
        Ok(event)
    }
}

fn today() -> String {
    spool_domain::timefmt::format_date(Utc::now())
}

fn operation_label(operation: UnionOperation) -> &'static str {
    match operation {
        UnionOperation::Arm => "ARM",
        UnionOperation::Sold => "SOLD",
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};

    use spool_domain::role::Role;
    use spool_store::memory::{MemoryEventLog, MemoryLockService, MemoryRowStore};

    use super::*;

    fn worker(id: i64, name: &str, initials: &str, roles: &[Role]) -> WorkerRef {
        WorkerRef::new(id, name, initials, roles.iter().copied().collect::<BTreeSet<_>>())
    }

    fn spool_row(tag: &str, ot: &str, total_uniones: u32) -> HashMap<String, String> {
        let mut row = HashMap::new();
        row.insert("tag".to_string(), tag.to_string());
        row.insert("ot".to_string(), ot.to_string());
        row.insert("total_uniones".to_string(), total_uniones.to_string());
        row.insert("ocupado_por".to_string(), String::new());
        row.insert("fecha_ocupacion".to_string(), String::new());
        row.insert("version".to_string(), Uuid::new_v4().to_string());
        row.insert("estado_detalle".to_string(), String::new());
        row.insert("armador".to_string(), String::new());
        row.insert("fecha_armado".to_string(), String::new());
        row.insert("soldador".to_string(), String::new());
        row.insert("fecha_soldadura".to_string(), String::new());
        row.insert("fecha_qc_metrologia".to_string(), String::new());
        row
    }

    fn union_row(ot: &str, n: u32, dn: f64) -> HashMap<String, String> {
        let mut row = HashMap::new();
        row.insert("composite_id".to_string(), format!("{ot}+{n}"));
        row.insert("ot".to_string(), ot.to_string());
        row.insert("n".to_string(), n.to_string());
        row.insert("dn_union".to_string(), dn.to_string());
        row.insert("tipo_union".to_string(), "BW".to_string());
        row.insert("arm_fecha_inicio".to_string(), String::new());
        row.insert("arm_fecha_fin".to_string(), String::new());
        row.insert("arm_worker".to_string(), String::new());
        row.insert("sol_fecha_inicio".to_string(), String::new());
        row.insert("sol_fecha_fin".to_string(), String::new());
        row.insert("sol_worker".to_string(), String::new());
        row.insert("ndt_fecha".to_string(), String::new());
        row.insert("ndt_status".to_string(), String::new());
        row.insert("version".to_string(), Uuid::new_v4().to_string());
        row
    }

    /// Recorre ARM → SOLD → METROLOGIA (rechazo) → REPARACION → METROLOGIA
    /// (aprobación) sobre un único carrete a nivel de carrete, verificando
    /// que cada paso deja el `estado_detalle` y la ocupación esperados.
    #[tokio::test]
    async fn spool_level_full_rework_cycle() {
        let rows = MemoryRowStore::new().with_seed_row(OPERACIONES, spool_row("SP-1001", "OT-77", 0));
        let locks = MemoryLockService::new();
        let events = MemoryEventLog::new();
        let orchestrator = StateOrchestrator::new(&locks, &rows, &events);

        let armadora = worker(1, "Maria", "MR", &[Role::Armador]);
        let soldador = worker(2, "Juan", "JP", &[Role::Soldador]);
        let metrologa = worker(3, "Ana", "AL", &[Role::Metrologo]);
        let reparador = worker(4, "Pedro", "PS", &[]);

        let outcome = orchestrator.tomar_arm("SP-1001", &armadora).await.expect("tomar ARM");
        let token = outcome.token.expect("tomar ARM returns token");
        assert!(outcome.estado_detalle.contains("ARMANDO") || !outcome.estado_detalle.is_empty());

        orchestrator.completar_arm("SP-1001", &armadora, &token).await.expect("completar ARM");

        let outcome = orchestrator.iniciar_sold("SP-1001", &soldador).await.expect("iniciar SOLD");
        let token = outcome.token.expect("iniciar SOLD returns token");
        orchestrator.completar_sold("SP-1001", &soldador, &token).await.expect("completar SOLD");

        let outcome = orchestrator.rechazar_metrologia("SP-1001", &metrologa).await.expect("rechazar METROLOGIA");
        assert!(outcome.estado_detalle.contains("REPARACION") || outcome.estado_detalle.contains("RECHAZ"));

        let outcome = orchestrator.tomar_reparacion("SP-1001", &reparador).await.expect("tomar REPARACION");
        let token = outcome.token.expect("tomar REPARACION returns token");
        orchestrator.completar_reparacion("SP-1001", &reparador, &token).await.expect("completar REPARACION");

        let outcome = orchestrator.aprobar_metrologia("SP-1001", &metrologa).await.expect("aprobar METROLOGIA tras reparacion");
        assert!(!outcome.estado_detalle.is_empty());

        let final_row = rows.read_row(OPERACIONES, "SP-1001").await.expect("read final row");
        assert_eq!(final_row.get("ocupado_por").map(String::as_str), Some(""));
        assert!(!final_row.get("fecha_qc_metrologia").unwrap().is_empty());

        let recorded = events.read_by_tag("SP-1001").await.expect("read events");
        assert!(recorded.len() >= 6, "expected at least one event per transition, got {}", recorded.len());
    }

    /// §8 version-bump-on-write: cada transición que escribe la fila debe
    /// dejar un `version` distinto del que tenía antes — ninguna escritura
    /// por lote puede omitir el bump optimista.
    #[tokio::test]
    async fn every_mutating_transition_bumps_version() {
        let rows = MemoryRowStore::new().with_seed_row(OPERACIONES, spool_row("SP-4004", "OT-55", 0));
        let locks = MemoryLockService::new();
        let events = MemoryEventLog::new();
        let orchestrator = StateOrchestrator::new(&locks, &rows, &events);
        let armadora = worker(1, "Maria", "MR", &[Role::Armador]);
        let soldador = worker(2, "Juan", "JP", &[Role::Soldador]);

        let mut previous_version = rows.read_row(OPERACIONES, "SP-4004").await.expect("read seed row")["version"].clone();

        let outcome = orchestrator.tomar_arm("SP-4004", &armadora).await.expect("tomar ARM");
        let token = outcome.token.expect("tomar ARM returns token");
        let after_tomar = rows.read_row(OPERACIONES, "SP-4004").await.expect("read after tomar")["version"].clone();
        assert_ne!(previous_version, after_tomar, "tomar_arm must bump version");
        previous_version = after_tomar;

        orchestrator.completar_arm("SP-4004", &armadora, &token).await.expect("completar ARM");
        let after_completar = rows.read_row(OPERACIONES, "SP-4004").await.expect("read after completar")["version"].clone();
        assert_ne!(previous_version, after_completar, "completar_arm must bump version");
        previous_version = after_completar;

        let outcome = orchestrator.iniciar_sold("SP-4004", &soldador).await.expect("iniciar SOLD");
        let token = outcome.token.expect("iniciar SOLD returns token");
        let after_iniciar = rows.read_row(OPERACIONES, "SP-4004").await.expect("read after iniciar")["version"].clone();
        assert_ne!(previous_version, after_iniciar, "iniciar_sold must bump version");
        previous_version = after_iniciar;

        orchestrator.completar_sold("SP-4004", &soldador, &token).await.expect("completar SOLD");
        let after_completar_sold = rows.read_row(OPERACIONES, "SP-4004").await.expect("read after completar sold")["version"].clone();
        assert_ne!(previous_version, after_completar_sold, "completar_sold must bump version");
    }

    /// S1 (§8): A toma ARM, lo pausa (cancela), y B puede tomarlo después —
    /// no hay titularidad estricta por trabajador sobre un carrete libre.
    #[tokio::test]
    async fn arm_handover_between_workers_after_cancel() {
        let rows = MemoryRowStore::new().with_seed_row(OPERACIONES, spool_row("SP-5005", "OT-11", 0));
        let locks = MemoryLockService::new();
        let events = MemoryEventLog::new();
        let orchestrator = StateOrchestrator::new(&locks, &rows, &events);
        let worker_a = worker(1, "Maria", "MR", &[Role::Armador]);
        let worker_b = worker(2, "Juan", "JP", &[Role::Armador]);

        let outcome = orchestrator.tomar_arm("SP-5005", &worker_a).await.expect("A tomar ARM");
        let token_a = outcome.token.expect("A receives token");
        orchestrator.cancelar_arm("SP-5005", &worker_a, &token_a).await.expect("A cancelar ARM");

        let row_after_cancel = rows.read_row(OPERACIONES, "SP-5005").await.expect("read after cancel");
        assert_eq!(row_after_cancel.get("ocupado_por").map(String::as_str), Some(""));

        let outcome = orchestrator.tomar_arm("SP-5005", &worker_b).await.expect("B tomar ARM after A released it");
        let token_b = outcome.token.expect("B receives token");
        orchestrator.completar_arm("SP-5005", &worker_b, &token_b).await.expect("B completar ARM");

        let final_row = rows.read_row(OPERACIONES, "SP-5005").await.expect("read final row");
        assert!(!final_row.get("fecha_armado").unwrap().is_empty());
    }

    /// S3 (§8): tras tres rechazos consecutivos de METROLOGIA, el carrete
    /// queda BLOQUEADO y una cuarta solicitud de REPARACION es rechazada.
    #[tokio::test]
    async fn third_consecutive_rejection_blocks_further_repair() {
        let rows = MemoryRowStore::new().with_seed_row(OPERACIONES, spool_row("SP-6006", "OT-22", 0));
        let locks = MemoryLockService::new();
        let events = MemoryEventLog::new();
        let orchestrator = StateOrchestrator::new(&locks, &rows, &events);
        let armadora = worker(1, "Maria", "MR", &[Role::Armador]);
        let soldador = worker(2, "Juan", "JP", &[Role::Soldador]);
        let metrologa = worker(3, "Ana", "AL", &[Role::Metrologo]);
        let reparador = worker(4, "Pedro", "PS", &[]);

        let token = orchestrator.tomar_arm("SP-6006", &armadora).await.expect("tomar ARM").token.unwrap();
        orchestrator.completar_arm("SP-6006", &armadora, &token).await.expect("completar ARM");
        let token = orchestrator.iniciar_sold("SP-6006", &soldador).await.expect("iniciar SOLD").token.unwrap();
        orchestrator.completar_sold("SP-6006", &soldador, &token).await.expect("completar SOLD");

        for _ in 0..3 {
            orchestrator.rechazar_metrologia("SP-6006", &metrologa).await.expect("rechazar METROLOGIA");
            let row = rows.read_row(OPERACIONES, "SP-6006").await.expect("read row");
            if row["estado_detalle"].contains("BLOQUEADO") {
                break;
            }
            let token = orchestrator.tomar_reparacion("SP-6006", &reparador).await.expect("tomar REPARACION").token.unwrap();
            orchestrator.completar_reparacion("SP-6006", &reparador, &token).await.expect("completar REPARACION");
        }

        let final_row = rows.read_row(OPERACIONES, "SP-6006").await.expect("read final row");
        assert!(final_row["estado_detalle"].contains("BLOQUEADO"), "estado_detalle was: {}", final_row["estado_detalle"]);

        let blocked = orchestrator.tomar_reparacion("SP-6006", &reparador).await;
        assert!(matches!(blocked, Err(CoreError::SpoolBloqueado { .. })));
    }

    /// FINALIZAR parcial debe pausar el carrete sin liberar `armador`; el
    /// resto de las uniones, al completarse, debe marcar ARM completado.
    #[tokio::test]
    async fn finalizar_partial_then_total_completes_arm() {
        let rows = MemoryRowStore::new()
            .with_seed_row(OPERACIONES, spool_row("SP-2002", "OT-88", 3))
            .with_seed_row(UNIONES, union_row("OT-88", 1, 4.0))
            .with_seed_row(UNIONES, union_row("OT-88", 2, 4.0))
            .with_seed_row(UNIONES, union_row("OT-88", 3, 6.0));
        let locks = MemoryLockService::new();
        let events = MemoryEventLog::new();
        let orchestrator = StateOrchestrator::new(&locks, &rows, &events);
        let armadora = worker(1, "Maria", "MR", &[Role::Armador]);

        let outcome = orchestrator.tomar_arm("SP-2002", &armadora).await.expect("tomar ARM");
        let token = outcome.token.expect("tomar ARM returns token");
        let partial = vec!["OT-88+1".to_string(), "OT-88+2".to_string()];
        let outcome = orchestrator.finalizar_arm("SP-2002", &armadora, &token, &partial).await.expect("FINALIZAR ARM parcial");
        assert!(outcome.token.is_none());

        let mid_row = rows.read_row(OPERACIONES, "SP-2002").await.expect("read mid row");
        assert!(mid_row.get("fecha_armado").unwrap().is_empty(), "partial FINALIZAR must not complete ARM yet");

        let outcome = orchestrator.tomar_arm("SP-2002", &armadora).await.expect("re-tomar ARM");
        let token = outcome.token.expect("re-tomar ARM returns token");
        let rest = vec!["OT-88+3".to_string()];
        orchestrator.finalizar_arm("SP-2002", &armadora, &token, &rest).await.expect("FINALIZAR ARM total");

        let final_row = rows.read_row(OPERACIONES, "SP-2002").await.expect("read final row");
        assert!(!final_row.get("fecha_armado").unwrap().is_empty(), "total FINALIZAR must complete ARM");
    }

    /// S5 (§8): un carrete BLOQUEADO cuyo `estado_detalle` es reescrito
    /// fuera de banda (de vuelta a RECHAZADO, evadiendo el gobernador de
    /// ciclo) debe producir un único `SUPERVISOR_OVERRIDE` en la siguiente
    /// observación, y ninguno más en observaciones subsiguientes.
    #[tokio::test]
    async fn detects_supervisor_override_after_a_bloqueado_regression() {
        let rows = MemoryRowStore::new().with_seed_row(OPERACIONES, spool_row("SP-3003", "OT-99", 0));
        let locks = MemoryLockService::new();
        let events = MemoryEventLog::new();
        let orchestrator = StateOrchestrator::new(&locks, &rows, &events);
        let armadora = worker(1, "Maria", "MR", &[Role::Armador]);
        let soldador = worker(2, "Juan", "JP", &[Role::Soldador]);
        let metrologa = worker(3, "Ana", "AL", &[Role::Metrologo]);
        let reparador = worker(4, "Pedro", "PS", &[]);

        let token = orchestrator.tomar_arm("SP-3003", &armadora).await.expect("tomar ARM").token.unwrap();
        orchestrator.completar_arm("SP-3003", &armadora, &token).await.expect("completar ARM");
        let token = orchestrator.iniciar_sold("SP-3003", &soldador).await.expect("iniciar SOLD").token.unwrap();
        orchestrator.completar_sold("SP-3003", &soldador, &token).await.expect("completar SOLD");

        loop {
            orchestrator.rechazar_metrologia("SP-3003", &metrologa).await.expect("rechazar METROLOGIA");
            let row = rows.read_row(OPERACIONES, "SP-3003").await.expect("read row");
            if row["estado_detalle"].contains("BLOQUEADO") {
                break;
            }
            let token = orchestrator.tomar_reparacion("SP-3003", &reparador).await.expect("tomar REPARACION").token.unwrap();
            orchestrator.completar_reparacion("SP-3003", &reparador, &token).await.expect("completar REPARACION");
        }

        let row_index = rows.find_row_by_column(OPERACIONES, "tag", "SP-3003").await.expect("find row").expect("row exists");
        rows.update_cell_by_column_name(OPERACIONES, row_index, "estado_detalle", "RECHAZADO (Ciclo 3/3) - Pendiente reparación")
            .await
            .expect("simulate supervisor rewrite away from BLOQUEADO");

        let event = orchestrator.detect_supervisor_override("SP-3003").await.expect("detect override");
        assert!(event.is_some(), "expected an override event to be emitted after a BLOQUEADO regression");

        let again = orchestrator.detect_supervisor_override("SP-3003").await.expect("re-check override");
        assert!(again.is_none(), "re-detection must not fire once the override has already been logged");
    }

    /// Envoltorio de `RowStore` que falla con `TransientBackendError` las
    /// primeras `remaining_failures` llamadas a `batch_update_by_column_name`,
    /// luego delega en `inner`. Sirve solo para ejercitar el backoff de
    /// [`StateOrchestrator::write_batch_with_retry`].
    struct FlakyRowStore {
        inner: MemoryRowStore,
        remaining_failures: std::sync::atomic::AtomicU32,
    }

    impl FlakyRowStore {
        fn new(inner: MemoryRowStore, failures: u32) -> Self {
            Self { inner, remaining_failures: std::sync::atomic::AtomicU32::new(failures) }
        }

        fn take_failure(&self) -> bool {
            use std::sync::atomic::Ordering;
            self.remaining_failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| if n > 0 { Some(n - 1) } else { None }).is_ok()
        }
    }

    impl RowStore for FlakyRowStore {
        async fn read_row(&self, table: &str, key: &str) -> Result<HashMap<String, String>, spool_store::errors::StoreError> {
            self.inner.read_row(table, key).await
        }

        async fn read_all(&self, table: &str) -> Result<Vec<HashMap<String, String>>, spool_store::errors::StoreError> {
            self.inner.read_all(table).await
        }

        async fn find_row_by_column(&self, table: &str, col: &str, value: &str) -> Result<Option<usize>, spool_store::errors::StoreError> {
            self.inner.find_row_by_column(table, col, value).await
        }

        async fn update_cell_by_column_name(
            &self,
            table: &str,
            row: usize,
            column_name: &str,
            value: &str,
        ) -> Result<(), spool_store::errors::StoreError> {
            self.inner.update_cell_by_column_name(table, row, column_name, value).await
        }

        async fn batch_update_by_column_name(&self, table: &str, updates: Vec<CellUpdate>) -> Result<(), spool_store::errors::StoreError> {
            if self.take_failure() {
                return Err(spool_store::errors::StoreError::TransientBackendError("flaky store: simulated transient fault".to_string()));
            }
            self.inner.batch_update_by_column_name(table, updates).await
        }

        async fn append_rows(&self, table: &str, rows: Vec<HashMap<String, String>>) -> Result<(), spool_store::errors::StoreError> {
            self.inner.append_rows(table, rows).await
        }
    }

    /// Mismo patrón que [`FlakyRowStore`], para `EventLog::append`.
    struct FlakyEventLog {
        inner: MemoryEventLog,
        remaining_failures: std::sync::atomic::AtomicU32,
    }

    impl FlakyEventLog {
        fn new(inner: MemoryEventLog, failures: u32) -> Self {
            Self { inner, remaining_failures: std::sync::atomic::AtomicU32::new(failures) }
        }

        fn take_failure(&self) -> bool {
            use std::sync::atomic::Ordering;
            self.remaining_failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| if n > 0 { Some(n - 1) } else { None }).is_ok()
        }
    }

    impl EventLog for FlakyEventLog {
        async fn append(&self, events: Vec<Event>) -> Result<(), spool_store::errors::StoreError> {
            if self.take_failure() {
                return Err(spool_store::errors::StoreError::TransientBackendError("flaky log: simulated transient fault".to_string()));
            }
            self.inner.append(events).await
        }

        async fn read_by_tag(&self, tag: &str) -> Result<Vec<Event>, spool_store::errors::StoreError> {
            self.inner.read_by_tag(tag).await
        }

        async fn last_event_for_tag(&self, tag: &str) -> Result<Option<Event>, spool_store::errors::StoreError> {
            self.inner.last_event_for_tag(tag).await
        }
    }

    /// §4.5 paso 6 / §7: `TransientBackendError` por debajo del tope de
    /// intentos debe recuperarse y aplicar la escritura.
    #[tokio::test]
    async fn write_batch_with_retry_recovers_from_transient_backend_errors() {
        let rows = FlakyRowStore::new(MemoryRowStore::new().with_seed_row(OPERACIONES, spool_row("T-1", "OT-1", 0)), 2);
        let locks = MemoryLockService::new();
        let events = MemoryEventLog::new();
        let orchestrator = StateOrchestrator::new(&locks, &rows, &events);

        orchestrator
            .write_batch_with_retry(OPERACIONES, vec![CellUpdate::new(0, "estado_detalle", "PROBE")])
            .await
            .expect("retries must exhaust the injected failures before the attempt cap");

        let row = orchestrator.rows.read_row(OPERACIONES, "T-1").await.expect("read row");
        assert_eq!(row["estado_detalle"], "PROBE", "the write must have landed once the retries succeeded");
    }

    /// §4.5 paso 6 / §7: una vez agotado [`WRITE_RETRY_MAX_ATTEMPTS`], el
    /// error transitorio debe propagarse en lugar de reintentar sin límite.
    #[tokio::test]
    async fn write_batch_with_retry_gives_up_after_the_attempt_cap() {
        let rows = FlakyRowStore::new(MemoryRowStore::new().with_seed_row(OPERACIONES, spool_row("T-2", "OT-1", 0)), 10);
        let locks = MemoryLockService::new();
        let events = MemoryEventLog::new();
        let orchestrator = StateOrchestrator::new(&locks, &rows, &events);

        let result = orchestrator.write_batch_with_retry(OPERACIONES, vec![CellUpdate::new(0, "estado_detalle", "PROBE")]).await;
        assert!(matches!(result, Err(CoreError::TransientBackendError(_))));
    }

    /// §4.5 paso 6 / §7: la emisión de eventos se recupera de fallos
    /// transitorios igual que la escritura, siempre que queden intentos.
    #[tokio::test]
    async fn emit_batch_with_retry_recovers_from_transient_backend_errors() {
        let rows = MemoryRowStore::new();
        let locks = MemoryLockService::new();
        let events = FlakyEventLog::new(MemoryEventLog::new(), 2);
        let orchestrator = StateOrchestrator::new(&locks, &rows, &events);

        orchestrator.emit_batch_with_retry(vec![event_at(EventKind::TomarSpool, "T-1")]).await;

        assert_eq!(orchestrator.events.inner.event_count(), 1, "the event must land once the injected failures are exhausted");
    }

    /// §4.5 paso 6 / §7: emisión "best-effort" — agotado el tope de
    /// intentos, el evento se pierde pero la llamada nunca entra en pánico
    /// ni propaga el fallo (el estado ya fue confirmado por la escritura).
    #[tokio::test]
    async fn emit_batch_with_retry_drops_the_event_after_the_attempt_cap_without_panicking() {
        let rows = MemoryRowStore::new();
        let locks = MemoryLockService::new();
        let events = FlakyEventLog::new(MemoryEventLog::new(), 10);
        let orchestrator = StateOrchestrator::new(&locks, &rows, &events);

        orchestrator.emit_batch_with_retry(vec![event_at(EventKind::TomarSpool, "T-1")]).await;

        assert_eq!(orchestrator.events.inner.event_count(), 0, "best-effort emission must give up without the event ever landing");
    }

    fn event_at(kind: EventKind, tag: &str) -> Event {
        Event::new(kind, tag, 1, "MR", "ARM", "TOMAR", "01-01-2026", serde_json::json!({}), None)
    }
}

// [apps/spool-orchestrator/src/demo.rs]
/*!
 * =================================================================
 * APARATO: SHOP FLOOR DEMONSTRATION SCENARIO (V1.0)
 * CLASIFICACIÓN: DEMONSTRATION SCENARIO (ESTRATO L3)
 * RESPONSABILIDAD: EJERCITAR EL MOTOR DE OCUPACIÓN DE PUNTA A PUNTA
 *
 * Generalización del guion de `launch_sovereign_operations` del taller
 * original, sin el estrato HTTP/Axum (fuera de alcance, §1): siembra dos
 * carretes (uno a nivel de carrete, otro a nivel de unión) y recorre
 * ARM → SOLD → METROLOGIA → REPARACION → METROLOGIA, FINALIZAR parcial y
 * total, y la detección de un override de supervisor.
 * =================================================================
 */

use std::collections::{BTreeSet, HashMap};

use spool_domain::role::Role;
use spool_domain::worker::WorkerRef;
use spool_store::contracts::RowStore;
use tracing::info;
use uuid::Uuid;

use crate::kernel::OrchestratorKernel;

const OPERACIONES: &str = "Operaciones";
const UNIONES: &str = "Uniones";

fn armadora() -> WorkerRef {
    WorkerRef::new(93, "Maria Reyes", "MR", BTreeSet::from([Role::Armador]))
}

fn soldador() -> WorkerRef {
    WorkerRef::new(94, "Juan Perez", "JP", BTreeSet::from([Role::Soldador]))
}

fn metrologa() -> WorkerRef {
    WorkerRef::new(95, "Ana Lopez", "AL", BTreeSet::from([Role::Metrologo]))
}

fn reparador() -> WorkerRef {
    WorkerRef::new(96, "Pedro Soto", "PS", BTreeSet::new())
}

fn empty_spool_row(tag: &str, ot: &str, total_uniones: u32) -> HashMap<String, String> {
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

/// Recorre el escenario completo sobre un `OrchestratorKernel` recién
/// ignitado. Entra en pánico ante cualquier transición que la lógica del
/// guion espera ver tener éxito — esto es un demostrador, no un harness de
/// producción.
pub async fn run(kernel: &OrchestratorKernel) {
    seed(kernel).await;

    info!("🏗️ [DEMO]: === escenario a nivel de carrete (SP-1001) ===");
    spool_level_scenario(kernel).await;

    info!("🏗️ [DEMO]: === escenario a nivel de unión (SP-2002) ===");
    union_level_scenario(kernel).await;

    info!("👁️ [DEMO]: === detección de override de supervisor ===");
    supervisor_override_scenario(kernel).await;

    info!("📜 [DEMO]: === historial de sesiones de trabajador ===");
    history_scenario(kernel).await;
}

async fn seed(kernel: &OrchestratorKernel) {
    kernel.rows().append_rows(OPERACIONES, vec![empty_spool_row("SP-1001", "OT-77", 0)]).await.expect("seed SP-1001");

    kernel.rows().append_rows(OPERACIONES, vec![empty_spool_row("SP-2002", "OT-88", 3)]).await.expect("seed SP-2002");
    kernel
        .rows()
        .append_rows(UNIONES, vec![union_row("OT-88", 1, 4.0), union_row("OT-88", 2, 4.0), union_row("OT-88", 3, 6.0)])
        .await
        .expect("seed OT-88 unions");
}

async fn spool_level_scenario(kernel: &OrchestratorKernel) {
    let orchestrator = kernel.orchestrator();
    let mr = armadora();
    let jp = soldador();
    let al = metrologa();
    let ps = reparador();

    let outcome = orchestrator.tomar_arm("SP-1001", &mr).await.expect("tomar ARM");
    info!(estado = %outcome.estado_detalle, "ARM tomado");
    let token = outcome.token.expect("tomar ARM returns ownership token");
    let outcome = orchestrator.completar_arm("SP-1001", &mr, &token).await.expect("completar ARM");
    info!(estado = %outcome.estado_detalle, "ARM completado");

    let outcome = orchestrator.iniciar_sold("SP-1001", &jp).await.expect("iniciar SOLD");
    let token = outcome.token.expect("iniciar SOLD returns ownership token");
    let outcome = orchestrator.completar_sold("SP-1001", &jp, &token).await.expect("completar SOLD");
    info!(estado = %outcome.estado_detalle, "SOLD completado");

    let outcome = orchestrator.rechazar_metrologia("SP-1001", &al).await.expect("rechazar METROLOGIA");
    info!(estado = %outcome.estado_detalle, "METROLOGIA rechazada, ciclo de reparación abierto");

    let outcome = orchestrator.tomar_reparacion("SP-1001", &ps).await.expect("tomar REPARACION");
    let token = outcome.token.expect("tomar REPARACION returns ownership token");
    let outcome = orchestrator.completar_reparacion("SP-1001", &ps, &token).await.expect("completar REPARACION");
    info!(estado = %outcome.estado_detalle, "REPARACION completada, retorna a METROLOGIA");

    let outcome = orchestrator.aprobar_metrologia("SP-1001", &al).await.expect("aprobar METROLOGIA");
    info!(estado = %outcome.estado_detalle, "METROLOGIA aprobada tras reparación");
}

async fn union_level_scenario(kernel: &OrchestratorKernel) {
    let orchestrator = kernel.orchestrator();
    let mr = armadora();
    let jp = soldador();

    let outcome = orchestrator.tomar_arm("SP-2002", &mr).await.expect("tomar ARM (union-level)");
    let token = outcome.token.expect("tomar ARM returns ownership token");
    let partial = vec!["OT-88+1".to_string(), "OT-88+2".to_string()];
    let outcome = orchestrator.finalizar_arm("SP-2002", &mr, &token, &partial).await.expect("FINALIZAR ARM parcial");
    info!(estado = %outcome.estado_detalle, "FINALIZAR ARM parcial (PAUSAR)");

    let outcome = orchestrator.tomar_arm("SP-2002", &mr).await.expect("re-tomar ARM");
    let token = outcome.token.expect("re-tomar ARM returns ownership token");
    let rest = vec!["OT-88+3".to_string()];
    let outcome = orchestrator.finalizar_arm("SP-2002", &mr, &token, &rest).await.expect("FINALIZAR ARM total");
    info!(estado = %outcome.estado_detalle, "FINALIZAR ARM total (COMPLETAR)");

    let outcome = orchestrator.tomar_arm("SP-2002", &jp).await;
    info!(?outcome, "intento de TOMAR ARM sobre carrete ya completado (se espera rechazo)");

    let outcome = orchestrator.iniciar_sold("SP-2002", &jp).await.expect("iniciar SOLD (union-level)");
    let token = outcome.token.expect("iniciar SOLD returns ownership token");
    let all_unions = vec!["OT-88+1".to_string(), "OT-88+2".to_string(), "OT-88+3".to_string()];
    let outcome = orchestrator.finalizar_sold("SP-2002", &jp, &token, &all_unions).await.expect("FINALIZAR SOLD total");
    info!(estado = %outcome.estado_detalle, "FINALIZAR SOLD total, dispara PENDIENTE_METROLOGIA");
}

/// Lleva SP-9009 a BLOQUEADO tras tres rechazos consecutivos de METROLOGIA,
/// luego simula un supervisor reescribiendo `estado_detalle` fuera del
/// orquestador (de vuelta a RECHAZADO), y verifica que la siguiente
/// observación del carrete detecta la regresión (§4.9, escenario S5).
async fn supervisor_override_scenario(kernel: &OrchestratorKernel) {
    let orchestrator = kernel.orchestrator();
    let mr = armadora();
    let jp = soldador();
    let al = metrologa();
    let ps = reparador();

    kernel.rows().append_rows(OPERACIONES, vec![empty_spool_row("SP-9009", "OT-66", 0)]).await.expect("seed SP-9009");

    let token = orchestrator.tomar_arm("SP-9009", &mr).await.expect("tomar ARM").token.expect("token");
    orchestrator.completar_arm("SP-9009", &mr, &token).await.expect("completar ARM");
    let token = orchestrator.iniciar_sold("SP-9009", &jp).await.expect("iniciar SOLD").token.expect("token");
    orchestrator.completar_sold("SP-9009", &jp, &token).await.expect("completar SOLD");

    loop {
        orchestrator.rechazar_metrologia("SP-9009", &al).await.expect("rechazar METROLOGIA");
        let row = kernel.rows().read_row(OPERACIONES, "SP-9009").await.expect("read SP-9009");
        if row["estado_detalle"].contains("BLOQUEADO") {
            break;
        }
        let token = orchestrator.tomar_reparacion("SP-9009", &ps).await.expect("tomar REPARACION").token.expect("token");
        orchestrator.completar_reparacion("SP-9009", &ps, &token).await.expect("completar REPARACION");
    }

    let row_index = kernel.rows().find_row_by_column(OPERACIONES, "tag", "SP-9009").await.expect("locate SP-9009").expect("SP-9009 exists");
    kernel
        .rows()
        .update_cell_by_column_name(OPERACIONES, row_index, "estado_detalle", "RECHAZADO (Ciclo 3/3) - Pendiente reparación")
        .await
        .expect("simulate supervisor rewrite away from BLOQUEADO");

    let event = orchestrator.detect_supervisor_override("SP-9009").await.expect("detect override");
    match event {
        Some(event) => info!(kind = ?event.kind, "override de supervisor detectado"),
        None => info!("ningún override detectado (no debería ocurrir en este guion)"),
    }
}

async fn history_scenario(kernel: &OrchestratorKernel) {
    let events = kernel.events().read_by_tag("SP-1001").await.expect("read events for SP-1001");
    let sessions = spool_core::history::fold_sessions(&events);
    for session in &sessions {
        info!(
            worker_id = session.worker_id,
            operation = %session.operation,
            duration = ?session.duration_label(),
            "sesión de trabajador reconstruida"
        );
    }
}

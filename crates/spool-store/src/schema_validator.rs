// [crates/spool-store/src/schema_validator.rs]
/*!
 * =================================================================
 * APARATO: SCHEMA VALIDATOR (V1.0 - SHOP FLOOR GROUND ZERO)
 * CLASIFICACIÓN: INFRASTRUCTURE GUARD (ESTRATO L3)
 * RESPONSABILIDAD: FAIL-FAST CONTRA DERIVA DE ESQUEMA EN EL ARRANQUE
 *
 * Generalizado de la secuencia solidificar/reparar/endurecer del esquema
 * Turso del taller original, adaptado: aquí no hay DDL que aplicar, solo
 * columnas de hoja de cálculo cuya presencia se certifica antes de servir
 * tráfico (§2: SchemaValidator, 5%).
 * =================================================================
 */

use anyhow::{bail, Context, Result};
use tracing::{debug, info, instrument};

use crate::column_map::ColumnMap;
use crate::contracts::RowStore;

/// Columnas requeridas en `Operaciones`, en su forma lógica (ColumnMap
/// normaliza antes de comparar).
pub const OPERACIONES_REQUIRED_COLUMNS: &[&str] = &[
    "tag",
    "ot",
    "total_uniones",
    "ocupado_por",
    "fecha_ocupacion",
    "version",
    "estado_detalle",
    "armador",
    "fecha_armado",
    "soldador",
    "fecha_soldadura",
    "fecha_qc_metrologia",
];

/// Columnas requeridas en `Uniones`.
pub const UNIONES_REQUIRED_COLUMNS: &[&str] = &[
    "ot",
    "n",
    "dn_union",
    "tipo_union",
    "arm_fecha_inicio",
    "arm_fecha_fin",
    "arm_worker",
    "sol_fecha_inicio",
    "sol_fecha_fin",
    "sol_worker",
    "ndt_fecha",
    "ndt_status",
    "version",
];

/// Certifica, al arranque, que `Operaciones` y `Uniones` exponen todas las
/// columnas que el núcleo necesita. Falla rápido (`anyhow::Error`) en lugar
/// de dejar que un `ColumnNotFound` aparezca a mitad de una transacción.
#[instrument(skip(store, column_map))]
pub async fn validate_schema<S: RowStore>(store: &S, column_map: &ColumnMap) -> Result<()> {
    info!("🏗️ [SCHEMA_VALIDATOR]: Certifying column strata before serving traffic...");

    hydrate_table(store, column_map, "Operaciones").await?;
    hydrate_table(store, column_map, "Uniones").await?;

    certify_required(column_map, "Operaciones", OPERACIONES_REQUIRED_COLUMNS)?;
    certify_required(column_map, "Uniones", UNIONES_REQUIRED_COLUMNS)?;

    info!("✅ [SCHEMA_VALIDATOR]: Column strata certified for Operaciones and Uniones.");
    Ok(())
}

async fn hydrate_table<S: RowStore>(store: &S, column_map: &ColumnMap, table: &str) -> Result<()> {
    let rows = store
        .read_all(table)
        .await
        .with_context(|| format!("CRITICAL_SOLIDIFICATION_FAULT: could not read table {table}"))?;

    let Some(first_row) = rows.first() else {
        debug!("  ⚪ [SCHEMA_VALIDATOR]: {} is empty, skipping column hydration.", table);
        return Ok(());
    };

    let header_columns: Vec<String> = first_row.keys().cloned().collect();
    column_map.hydrate(table, &header_columns);
    Ok(())
}

fn certify_required(column_map: &ColumnMap, table: &str, required: &[&str]) -> Result<()> {
    let (ok, missing) = column_map.validate_required(table, required);
    if !ok {
        bail!("CRITICAL_HARDENING_FAULT: table {table} is missing required columns: {missing:?}");
    }
    Ok(())
}

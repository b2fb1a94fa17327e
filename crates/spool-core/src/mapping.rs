// [crates/spool-core/src/mapping.rs]
//! Traduce filas de `RowStore` (`HashMap<String, String>`) a las entidades
//! de dominio hidratadas que consumen las máquinas de estado. El lookup de
//! columna usa la misma normalización que `ColumnMap`/`MemoryRowStore`, de
//! modo que el núcleo nunca asume un casing exacto de encabezado.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use spool_domain::spool::Spool;
use spool_domain::union::Union;
use uuid::Uuid;

use crate::errors::CoreError;

fn normalize(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace() && *c != '_').flat_map(|c| c.to_lowercase()).collect()
}

fn get<'a>(row: &'a HashMap<String, String>, logical: &str) -> Option<&'a str> {
    let target = normalize(logical);
    row.iter().find(|(key, _)| normalize(key) == target).map(|(_, value)| value.as_str())
}

fn required<'a>(row: &'a HashMap<String, String>, table: &str, logical: &str) -> Result<&'a str, CoreError> {
    get(row, logical).ok_or_else(|| CoreError::ValidationFailed(format!("{table} row missing column {logical}")))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|text| !text.is_empty()).map(str::to_string)
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    let text = value.filter(|text| !text.is_empty())?;
    chrono::NaiveDateTime::parse_from_str(text, "%d-%m-%Y %H:%M:%S")
        .ok()
        .and_then(|naive| chrono_tz::America::Santiago.from_local_datetime(&naive).single())
        .map(|santiago| santiago.with_timezone(&Utc))
}

/// Hidrata un [`Spool`] a partir de una fila de la tabla `Operaciones`.
pub fn spool_from_row(row: &HashMap<String, String>) -> Result<Spool, CoreError> {
    Ok(Spool {
        tag: required(row, "Operaciones", "tag")?.to_string(),
        ot: non_empty(get(row, "ot")).unwrap_or_default(),
        total_uniones: get(row, "total_uniones").and_then(|v| v.parse().ok()).unwrap_or(0),
        ocupado_por: non_empty(get(row, "ocupado_por")),
        fecha_ocupacion: parse_timestamp(get(row, "fecha_ocupacion")),
        version: get(row, "version").and_then(|v| Uuid::parse_str(v).ok()).unwrap_or_else(Uuid::new_v4),
        estado_detalle: get(row, "estado_detalle").unwrap_or_default().to_string(),
        armador: non_empty(get(row, "armador")),
        fecha_armado: non_empty(get(row, "fecha_armado")),
        soldador: non_empty(get(row, "soldador")),
        fecha_soldadura: non_empty(get(row, "fecha_soldadura")),
        fecha_qc_metrologia: non_empty(get(row, "fecha_qc_metrologia")),
    })
}

/// Hidrata una [`Union`] a partir de una fila de la tabla `Uniones`.
pub fn union_from_row(row: &HashMap<String, String>) -> Result<Union, CoreError> {
    Ok(Union {
        ot: required(row, "Uniones", "ot")?.to_string(),
        n: required(row, "Uniones", "n")?.parse().map_err(|_| CoreError::ValidationFailed("n is not numeric".into()))?,
        dn_union: get(row, "dn_union").and_then(|v| v.parse().ok()).unwrap_or(0.0),
        tipo_union: get(row, "tipo_union").unwrap_or_default().to_string(),
        arm_fecha_inicio: non_empty(get(row, "arm_fecha_inicio")),
        arm_fecha_fin: non_empty(get(row, "arm_fecha_fin")),
        arm_worker: non_empty(get(row, "arm_worker")),
        sol_fecha_inicio: non_empty(get(row, "sol_fecha_inicio")),
        sol_fecha_fin: non_empty(get(row, "sol_fecha_fin")),
        sol_worker: non_empty(get(row, "sol_worker")),
        ndt_fecha: non_empty(get(row, "ndt_fecha")),
        ndt_status: non_empty(get(row, "ndt_status")),
        version: get(row, "version").and_then(|v| Uuid::parse_str(v).ok()).unwrap_or_else(Uuid::new_v4),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_columns_hydrate_as_none() {
        let mut row = HashMap::new();
        row.insert("tag".to_string(), "T-1".to_string());
        row.insert("ocupado_por".to_string(), "".to_string());
        row.insert("version".to_string(), Uuid::new_v4().to_string());
        let spool = spool_from_row(&row).unwrap();
        assert_eq!(spool.ocupado_por, None);
    }

    #[test]
    fn header_casing_and_underscores_do_not_matter() {
        let mut row = HashMap::new();
        row.insert("Tag".to_string(), "T-1".to_string());
        row.insert("Ocupado Por".to_string(), "MR(93)".to_string());
        row.insert("Version".to_string(), Uuid::new_v4().to_string());
        let spool = spool_from_row(&row).unwrap();
        assert_eq!(spool.ocupado_por, Some("MR(93)".to_string()));
    }
}

// [crates/spool-store/src/column_map.rs]
//! ColumnMap (§4.1): resuelve nombres lógicos de campo a posiciones físicas
//! de columna por tabla, con caché invalidable. Es la única vía de acceso a
//! columnas físicas; ningún consumidor usa índices hardcodeados (§9).

use std::collections::HashMap;
use std::sync::RwLock;

/// Normaliza un nombre de columna: minúsculas, sin espacios, sin guiones bajos.
///
/// Esta es la única función de normalización del sistema; `ColumnMap` y
/// todo comparador de nombres de columna la reutilizan.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(|c| c.to_lowercase())
        .collect()
}

#[derive(Debug, Default, Clone)]
struct TableMapping {
    normalized_to_index: HashMap<String, usize>,
}

/// Caché de mapeos tabla → (nombre normalizado → índice de columna),
/// protegida con `RwLock` porque se comparte entre solicitudes concurrentes.
#[derive(Debug, Default)]
pub struct ColumnMap {
    tables: RwLock<HashMap<String, TableMapping>>,
}

impl ColumnMap {
    pub fn new() -> Self {
        Self { tables: RwLock::new(HashMap::new()) }
    }

    /// Registra (o reemplaza) el mapeo de una tabla a partir de su fila de
    /// encabezados. Llamado por el adaptador de RowStore tras leer la
    /// primera fila; cachea el resultado hasta la próxima invalidación.
    pub fn hydrate(&self, table: &str, header_columns: &[String]) {
        let mapping = TableMapping {
            normalized_to_index: header_columns
                .iter()
                .enumerate()
                .map(|(index, name)| (normalize(name), index))
                .collect(),
        };
        self.tables.write().expect("column map lock poisoned").insert(table.to_string(), mapping);
    }

    pub fn index_of(&self, table: &str, logical_name: &str) -> Option<usize> {
        let tables = self.tables.read().expect("column map lock poisoned");
        tables.get(table)?.normalized_to_index.get(&normalize(logical_name)).copied()
    }

    /// Invalida el mapeo cacheado de una tabla. Debe invocarse tras
    /// cualquier cambio de esquema (§5: solo extensiones de esquema).
    pub fn invalidate(&self, table: &str) {
        self.tables.write().expect("column map lock poisoned").remove(table);
    }

    /// Valida que todos los nombres lógicos requeridos existan en la tabla.
    /// Devuelve `(ok, faltantes)`.
    pub fn validate_required(&self, table: &str, names: &[&str]) -> (bool, Vec<String>) {
        let tables = self.tables.read().expect("column map lock poisoned");
        let Some(mapping) = tables.get(table) else {
            return (false, names.iter().map(|n| n.to_string()).collect());
        };
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !mapping.normalized_to_index.contains_key(&normalize(name)))
            .map(|name| name.to_string())
            .collect();
        (missing.is_empty(), missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_whitespace_and_underscores() {
        assert_eq!(normalize("Fecha_Armado"), normalize("fecha armado"));
        assert_eq!(normalize(" Ocupado_Por "), "ocupadopor");
    }

    #[test]
    fn hydrate_then_lookup_round_trips() {
        let map = ColumnMap::new();
        map.hydrate("Operaciones", &["Tag".into(), "Ocupado_Por".into(), "Version".into()]);
        assert_eq!(map.index_of("Operaciones", "ocupado por"), Some(1));
        assert_eq!(map.index_of("Operaciones", "missing"), None);
    }

    #[test]
    fn invalidate_clears_cache() {
        let map = ColumnMap::new();
        map.hydrate("Operaciones", &["Tag".into()]);
        map.invalidate("Operaciones");
        assert_eq!(map.index_of("Operaciones", "Tag"), None);
    }

    #[test]
    fn validate_required_reports_missing() {
        let map = ColumnMap::new();
        map.hydrate("Operaciones", &["Tag".into(), "Version".into()]);
        let (ok, missing) = map.validate_required("Operaciones", &["tag", "version", "estado_detalle"]);
        assert!(!ok);
        assert_eq!(missing, vec!["estado_detalle".to_string()]);
    }
}

// [crates/spool-store/src/memory/row_store.rs]
//! Adaptador de referencia en memoria para [`RowStore`]. Juega el papel que
//! `TursoClient` juega para el backend SQL del taller original, pero sobre
//! la forma de hoja de cálculo que exige el contrato (§2 SUPLEMENTO).

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::instrument;

use crate::column_map::normalize;
use crate::contracts::{CellUpdate, RowStore};
use crate::errors::StoreError;

#[derive(Debug, Default)]
struct TableData {
    rows: Vec<HashMap<String, String>>,
}

/// Almacén de filas en memoria, protegido por `RwLock` por tabla.
///
/// Expone constructores/inspectores no contractuales (`with_seed_row`,
/// `row_count`) únicamente para configuración y aserciones de pruebas —
/// no forman parte del contrato §6.1, igual que `TursoClient::get_connection`
/// no formaba parte del contrato de repositorio del taller original.
#[derive(Debug, Default)]
pub struct MemoryRowStore {
    tables: RwLock<HashMap<String, TableData>>,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self { tables: RwLock::new(HashMap::new()) }
    }

    /// Ayuda de prueba: inserta una fila sembrada en la tabla nombrada.
    pub fn with_seed_row(self, table: &str, row: HashMap<String, String>) -> Self {
        self.tables
            .write()
            .expect("row store lock poisoned")
            .entry(table.to_string())
            .or_default()
            .rows
            .push(row);
        self
    }

    /// Ayuda de prueba: número de filas actualmente almacenadas en la tabla.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.read().expect("row store lock poisoned").get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    fn resolve_actual_key(row: &HashMap<String, String>, logical_name: &str) -> Option<String> {
        let target = normalize(logical_name);
        row.keys().find(|key| normalize(key) == target).cloned()
    }
}

impl RowStore for MemoryRowStore {
    #[instrument(skip(self))]
    async fn read_row(&self, table: &str, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let tables = self.tables.read().expect("row store lock poisoned");
        let table_data = tables.get(table).ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        let key_column = primary_key_column(table);
        table_data
            .rows
            .iter()
            .find(|row| {
                Self::resolve_actual_key(row, key_column)
                    .and_then(|actual| row.get(&actual).cloned())
                    .as_deref()
                    == Some(key)
            })
            .cloned()
            .ok_or_else(|| StoreError::RowNotFound(key.to_string()))
    }

    #[instrument(skip(self))]
    async fn read_all(&self, table: &str) -> Result<Vec<HashMap<String, String>>, StoreError> {
        let tables = self.tables.read().expect("row store lock poisoned");
        Ok(tables.get(table).map(|t| t.rows.clone()).unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn find_row_by_column(&self, table: &str, col: &str, value: &str) -> Result<Option<usize>, StoreError> {
        let tables = self.tables.read().expect("row store lock poisoned");
        let Some(table_data) = tables.get(table) else {
            return Ok(None);
        };
        for (index, row) in table_data.rows.iter().enumerate() {
            if let Some(actual_key) = Self::resolve_actual_key(row, col) {
                if row.get(&actual_key).map(|v| v.as_str()) == Some(value) {
                    return Ok(Some(index));
                }
            }
        }
        Ok(None)
    }

    #[instrument(skip(self))]
    async fn update_cell_by_column_name(&self, table: &str, row: usize, column_name: &str, value: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().expect("row store lock poisoned");
        let table_data = tables.get_mut(table).ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        let target_row = table_data
            .rows
            .get_mut(row)
            .ok_or_else(|| StoreError::RowNotFound(format!("row index {row} in {table}")))?;
        let actual_key = Self::resolve_actual_key(target_row, column_name).unwrap_or_else(|| column_name.to_string());
        target_row.insert(actual_key, value.to_string());
        Ok(())
    }

    #[instrument(skip(self, updates), fields(count = updates.len()))]
    async fn batch_update_by_column_name(&self, table: &str, updates: Vec<CellUpdate>) -> Result<(), StoreError> {
        let mut tables = self.tables.write().expect("row store lock poisoned");
        let table_data = tables.get_mut(table).ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        for update in updates {
            let target_row = table_data
                .rows
                .get_mut(update.row)
                .ok_or_else(|| StoreError::RowNotFound(format!("row index {} in {table}", update.row)))?;
            let actual_key = Self::resolve_actual_key(target_row, &update.column_name).unwrap_or(update.column_name);
            target_row.insert(actual_key, update.value);
        }
        Ok(())
    }

    #[instrument(skip(self, rows), fields(count = rows.len()))]
    async fn append_rows(&self, table: &str, rows: Vec<HashMap<String, String>>) -> Result<(), StoreError> {
        let mut tables = self.tables.write().expect("row store lock poisoned");
        tables.entry(table.to_string()).or_default().rows.extend(rows);
        Ok(())
    }
}

fn primary_key_column(table: &str) -> &'static str {
    match table {
        "Uniones" => "composite_id",
        _ => "tag",
    }
}

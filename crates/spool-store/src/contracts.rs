// [crates/spool-store/src/contracts.rs]
//! Contratos externos (§6): RowStore, EventLog, LockService. Los colaboradores
//! reales (hoja de cálculo, log de eventos, servicio de locks distribuido)
//! quedan fuera de alcance (§1); solo sus formas se fijan aquí.
//!
//! Usa `async fn` nativo en traits (sin `async-trait`): los consumidores del
//! núcleo son genéricos sobre `S: RowStore`, nunca objetos `dyn`.

use std::collections::HashMap;
use std::time::Duration;

use spool_domain::event::Event;

use crate::errors::StoreError;

/// Una celda a escribir en una actualización por lote, direccionada por
/// número de fila y nombre de columna lógico (§6.1).
#[derive(Debug, Clone)]
pub struct CellUpdate {
    pub row: usize,
    pub column_name: String,
    pub value: String,
}

impl CellUpdate {
    pub fn new(row: usize, column_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { row, column_name: column_name.into(), value: value.into() }
    }
}

/// Tabla durable direccionada por fila con mapeo nombre→columna, escrituras
/// por celda y por lote, y lecturas cacheables con invalidación (§6.1).
///
/// Modelado deliberadamente como una API de hoja de cálculo (`read_row`,
/// `batch_update_by_column_name`, `append_rows`), no una API SQL: es la
/// forma que exige el contrato original.
pub trait RowStore: Send + Sync {
    /// Lee una fila por clave primaria (`tag` para `Operaciones`, `{ot}+{n}`
    /// para `Uniones`), devuelta como mapa nombre de columna → valor.
    async fn read_row(&self, table: &str, key: &str) -> Result<HashMap<String, String>, StoreError>;

    /// Lee todas las filas de la tabla. Cacheable por el llamador; invalida
    /// tras cualquier escritura sobre la misma tabla.
    async fn read_all(&self, table: &str) -> Result<Vec<HashMap<String, String>>, StoreError>;

    /// Localiza el número de fila (0-based) cuya columna `col` iguala `value`.
    async fn find_row_by_column(&self, table: &str, col: &str, value: &str) -> Result<Option<usize>, StoreError>;

    /// Escribe una única celda. Usado solo cuando una sola celda cambia;
    /// el núcleo nunca encadena múltiples llamadas de celda por una
    /// operación multi-celda (§6.1: ningún cell-per-cell para ráfagas).
    async fn update_cell_by_column_name(&self, table: &str, row: usize, column_name: &str, value: &str) -> Result<(), StoreError>;

    /// Escribe un lote de celdas en una sola llamada externa. El único
    /// mecanismo para mutaciones que tocan más de una columna.
    async fn batch_update_by_column_name(&self, table: &str, updates: Vec<CellUpdate>) -> Result<(), StoreError>;

    /// Añade filas nuevas a la tabla en una sola llamada externa.
    async fn append_rows(&self, table: &str, rows: Vec<HashMap<String, String>>) -> Result<(), StoreError>;
}

/// Tamaño máximo de lote de evento por llamada externa (§4.6, §6.2).
pub const EVENT_BATCH_CHUNK_SIZE: usize = 900;

/// Bitácora de eventos append-only (§6.2). El orden de columnas es estable;
/// las filas heredadas de 10 columnas siguen siendo legibles (`n_union = None`).
pub trait EventLog: Send + Sync {
    /// Añade eventos, fragmentando automáticamente en lotes de
    /// [`EVENT_BATCH_CHUNK_SIZE`] (§8: 1000 eventos ⇒ dos ráfagas 900+100).
    async fn append(&self, events: Vec<Event>) -> Result<(), StoreError>;

    /// Todos los eventos para la etiqueta dada, en orden de `timestamp`.
    async fn read_by_tag(&self, tag: &str) -> Result<Vec<Event>, StoreError>;

    /// El evento más reciente para la etiqueta dada, si existe.
    async fn last_event_for_tag(&self, tag: &str) -> Result<Option<Event>, StoreError>;
}

/// Primitiva de exclusión mutua con clave, con tokens de propiedad y TTL
/// (§6.3). Advisory: RowStore permanece como la autoridad sobre la
/// titularidad (§6.4); el lock solo acelera y da UX.
pub trait LockService: Send + Sync {
    /// Intenta adquirir la clave para el propietario dado. `false` si ya
    /// está en manos de otro propietario vivo.
    async fn acquire(&self, key: &str, owner: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Extiende el TTL de una posesión existente del mismo propietario.
    async fn refresh(&self, key: &str, owner: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Libera la clave si el propietario actual coincide; no-op en caso
    /// contrario (la titularidad real vive en RowStore).
    async fn release(&self, key: &str, owner: &str) -> Result<(), StoreError>;

    /// El propietario actual de la clave, si alguno vive.
    async fn inspect(&self, key: &str) -> Result<Option<String>, StoreError>;
}

// [crates/spool-domain/src/worker.rs]
//! Referencia de trabajador consumida por el núcleo; el directorio de
//! trabajadores/roles vive fuera de este sistema (§1 Non-goals).

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::role::Role;

/// Identidad de un trabajador tal como la consume el motor de ocupación.
///
/// El motor nunca posee este registro: lo recibe de un directorio externo
/// en cada solicitud y lo proyecta a la forma canónica `INITIALS(ID)` cuando
/// escribe `ocupado_por` / `armador` / `soldador`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRef {
    pub id: i64,
    pub name: String,
    pub initials: String,
    pub roles: BTreeSet<Role>,
}

impl WorkerRef {
    pub fn new(id: i64, name: impl Into<String>, initials: impl Into<String>, roles: BTreeSet<Role>) -> Self {
        Self { id, name: name.into(), initials: initials.into(), roles }
    }

    /// Forma canónica escrita en columnas de ocupación: `INITIALS(ID)`.
    pub fn canonical(&self) -> String {
        format!("{}({})", self.initials, self.id)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

impl fmt::Display for WorkerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Parsea la forma canónica `INITIALS(ID)` escrita en una columna de ocupación.
///
/// Devuelve `None` si el texto no respeta el formato; el llamador trata eso
/// como "columna vacía" a efectos prácticos.
pub fn parse_canonical(text: &str) -> Option<(String, i64)> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let open = trimmed.find('(')?;
    let close = trimmed.rfind(')')?;
    if close <= open {
        return None;
    }
    let initials = trimmed[..open].to_string();
    let id: i64 = trimmed[open + 1..close].parse().ok()?;
    Some((initials, id))
}

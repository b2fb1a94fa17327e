// [crates/spool-domain/src/role.rs]
//! Vocabulario de roles de trabajador reconocidos por el taller.

use serde::{Deserialize, Serialize};

/// Rol funcional que habilita a un trabajador a operar sobre una operación dada.
///
/// El rol para REPARACIÓN queda deliberadamente abierto (cualquier trabajador
/// activo puede tomarla); `Role::Reparador` existe para que un futuro cambio
/// de política no requiera modificar el tipo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Armador,
    Soldador,
    Metrologo,
    Reparador,
    Supervisor,
}

impl Role {
    /// Rol requerido para iniciar la operación nominada, si la política lo exige.
    pub fn required_for_operation(operation: &str) -> Option<Role> {
        match operation {
            "ARM" => Some(Role::Armador),
            "SOLD" => Some(Role::Soldador),
            "METROLOGIA" => Some(Role::Metrologo),
            _ => None,
        }
    }
}

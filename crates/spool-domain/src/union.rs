// [crates/spool-domain/src/union.rs]
//! Entidad `Union` (§3.1): un único empalme dentro de un carrete a nivel
//! de unión.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Un empalme individual, identificado compuesto `{ot}+{n}` con `n ∈ [1, total_uniones]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Union {
    pub ot: String,
    pub n: u32,
    pub dn_union: f64,
    pub tipo_union: String,
    pub arm_fecha_inicio: Option<String>,
    pub arm_fecha_fin: Option<String>,
    pub arm_worker: Option<String>,
    pub sol_fecha_inicio: Option<String>,
    pub sol_fecha_fin: Option<String>,
    pub sol_worker: Option<String>,
    pub ndt_fecha: Option<String>,
    pub ndt_status: Option<String>,
    pub version: Uuid,
}

impl Union {
    /// Identificador compuesto `{ot}+{n}`.
    pub fn composite_id(&self) -> String {
        format!("{}+{}", self.ot, self.n)
    }

    /// `true` si la operación nombrada (`"arm"` | `"sol"` | `"ndt"`) ya cerró
    /// para este empalme.
    pub fn operation_closed(&self, op: &str) -> bool {
        match op {
            "arm" => self.arm_fecha_fin.is_some(),
            "sol" => self.sol_fecha_fin.is_some(),
            "ndt" => self.ndt_fecha.is_some(),
            _ => false,
        }
    }

    /// `true` si el empalme está disponible para iniciar ARM (§4.6: `arm_fecha_fin = ∅`).
    pub fn available_for_arm(&self) -> bool {
        self.arm_fecha_fin.is_none()
    }

    /// `true` si el empalme está disponible para iniciar SOLD
    /// (§4.6: `arm_fecha_fin ≠ ∅ ∧ sol_fecha_fin = ∅`).
    pub fn available_for_sold(&self) -> bool {
        self.arm_fecha_fin.is_some() && self.sol_fecha_fin.is_none()
    }
}

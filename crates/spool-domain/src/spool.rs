// [crates/spool-domain/src/spool.rs]
//! Entidad `Spool` (§3.1) y las derivaciones puras de invariante I5.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::union::Union;

/// El carrete de tubería físico, identificado por una etiqueta opaca única.
///
/// `estado_detalle` es el único portador persistido de los subestados de
/// METROLOGIA/REPARACION y del contador de ciclo de reparación (§3.2 I3);
/// ningún otro campo los duplica.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spool {
    pub tag: String,
    pub ot: String,
    pub total_uniones: u32,
    pub ocupado_por: Option<String>,
    pub fecha_ocupacion: Option<DateTime<Utc>>,
    pub version: Uuid,
    pub estado_detalle: String,
    pub armador: Option<String>,
    pub fecha_armado: Option<String>,
    pub soldador: Option<String>,
    pub fecha_soldadura: Option<String>,
    pub fecha_qc_metrologia: Option<String>,
}

impl Spool {
    /// `true` si el carrete es a nivel de unión (§3.1: `total_uniones > 0`).
    pub fn is_union_level(&self) -> bool {
        self.total_uniones > 0
    }

    pub fn is_occupied(&self) -> bool {
        self.ocupado_por.as_deref().is_some_and(|owner| !owner.is_empty())
    }

    /// Invariante I5: agregación de operaciones completadas y pulgadas netas
    /// sobre el conjunto de uniones del carrete, para la operación nombrada.
    ///
    /// `op` identifica la columna de cierre a inspeccionar: `"arm"`, `"sol"`
    /// o `"ndt"`.
    pub fn aggregate_union_completion(unions: &[Union], op: &str) -> (usize, f64) {
        let completed: Vec<&Union> = unions
            .iter()
            .filter(|union| union.operation_closed(op))
            .collect();
        let count = completed.len();
        let inches: f64 = completed.iter().map(|union| union.dn_union).sum();
        (count, round_two_decimals(inches))
    }
}

fn round_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::union::Union;

    fn base_union(dn: f64, closed: bool) -> Union {
        Union {
            ot: "OT-1".into(),
            n: 1,
            dn_union: dn,
            tipo_union: "BW".into(),
            arm_fecha_inicio: None,
            arm_fecha_fin: if closed { Some("01-01-2026".into()) } else { None },
            arm_worker: None,
            sol_fecha_inicio: None,
            sol_fecha_fin: None,
            sol_worker: None,
            ndt_fecha: None,
            ndt_status: None,
            version: Uuid::new_v4(),
        }
    }

    #[test]
    fn aggregates_only_closed_unions_and_rounds() {
        let unions = vec![base_union(1.005, true), base_union(2.0, true), base_union(3.0, false)];
        let (count, inches) = Spool::aggregate_union_completion(&unions, "arm");
        assert_eq!(count, 2);
        assert!((inches - 3.0).abs() < 0.02);
    }
}

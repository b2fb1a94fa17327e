// [crates/spool-domain/src/lib.rs]
/*!
 * =================================================================
 * APARATO: SPOOL DOMAIN MODELS (V1.0 - SHOP FLOOR GROUND ZERO)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: DEFINICIÓN DE CONTRATOS SOBERANOS DEL TALLER
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. ZERO ABBREVIATIONS: nomenclatura nominal absoluta en entidades y campos.
 * 2. NO DERIVED STORAGE: las cantidades agregadas (I5) se calculan, nunca
 *    se persisten como campos propios.
 * =================================================================
 */

pub mod event;
pub mod role;
pub mod spool;
pub mod timefmt;
pub mod union;
pub mod worker;

pub mod prelude {
    pub use crate::event::{Event, EventKind};
    pub use crate::role::Role;
    pub use crate::spool::Spool;
    pub use crate::timefmt::{format_date, format_timestamp, now_santiago};
    pub use crate::union::Union;
    pub use crate::worker::WorkerRef;
}

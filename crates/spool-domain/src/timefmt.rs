// [crates/spool-domain/src/timefmt.rs]
//! Formateo de marcas temporales según §6.1: `DD-MM-YYYY HH:MM:SS` para timestamps,
//! `DD-MM-YYYY` para fechas, normalizadas a la zona horaria America/Santiago.

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::America::Santiago;

/// Instante actual, normalizado a America/Santiago.
pub fn now_santiago() -> DateTime<chrono_tz::Tz> {
    Utc::now().with_timezone(&Santiago)
}

/// Formatea un instante como `DD-MM-YYYY HH:MM:SS` en America/Santiago.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&Santiago).format("%d-%m-%Y %H:%M:%S").to_string()
}

/// Formatea un instante como `DD-MM-YYYY` en America/Santiago.
pub fn format_date(instant: DateTime<Utc>) -> String {
    instant.with_timezone(&Santiago).format("%d-%m-%Y").to_string()
}

/// Parsea una fecha `DD-MM-YYYY` previamente escrita por [`format_date`].
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let naive = chrono::NaiveDate::parse_from_str(text, "%d-%m-%Y").ok()?;
    let naive_midnight = naive.and_hms_opt(0, 0, 0)?;
    let santiago_instant = Santiago.from_local_datetime(&naive_midnight).single()?;
    Some(santiago_instant.with_timezone(&Utc))
}

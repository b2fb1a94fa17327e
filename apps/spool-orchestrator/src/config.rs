// [apps/spool-orchestrator/src/config.rs]
//! Configuración del proceso, hidratada de `.env` + entorno + CLI
//! (`dotenvy` + `clap(derive, env)`), generalizada de la captura de
//! `DATABASE_URL`/`PORT` del taller original.

use clap::Parser;

/// Coordenadas de arranque del orquestador. Ningún campo es obligatorio:
/// el motor de ocupación no depende de infraestructura externa (§1), así
/// que todo aquí gobierna únicamente observabilidad y el barrido opcional
/// de §4.9.
#[derive(Parser, Debug, Clone)]
#[command(name = "spool-orchestrator", about = "Motor de correctitud del taller de carretes")]
pub struct RuntimeConfig {
    /// Identificador de servicio usado como target base de `tracing`.
    #[arg(long, env = "SPOOL_SERVICE_NAME", default_value = "spool_orchestrator")]
    pub service_name: String,

    /// Activa el barrido periódico de detección de override de supervisor
    /// (§4.9 SUPLEMENTO). Deshabilitado por defecto: la detección on-demand
    /// vía `detect_supervisor_override` ya cubre el caso de uso principal.
    #[arg(long, env = "SPOOL_OVERRIDE_SWEEP_ENABLED", default_value_t = false)]
    pub override_sweep_enabled: bool,

    /// Frecuencia del barrido, en segundos.
    #[arg(long, env = "SPOOL_OVERRIDE_SWEEP_INTERVAL_SECONDS", default_value_t = 30)]
    pub override_sweep_interval_seconds: u64,
}

impl RuntimeConfig {
    /// Hidrata la configuración desde variables de entorno y argumentos de
    /// línea de comandos (`clap(env = ...)` las unifica).
    pub fn from_env() -> Self {
        RuntimeConfig::parse()
    }
}

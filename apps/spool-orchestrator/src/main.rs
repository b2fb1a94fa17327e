// [apps/spool-orchestrator/src/main.rs]
/*!
 * =================================================================
 * APARATO: ORCHESTRATOR MAIN ENTRY POINT (V1.0)
 * CLASIFICACIÓN: APPLICATION SHELL (ESTRATO L3)
 * RESPONSABILIDAD: BOOTSTRAP DE CONFIGURACIÓN, TELEMETRÍA E IGNICIÓN
 * =================================================================
 */

use dotenvy::dotenv;
use spool_orchestrator::prelude::*;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let config = RuntimeConfig::from_env();
    spool_telemetry::init_tracing(&config.service_name);

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(async {
        info!("🛰️ [MAIN]: shop floor orchestrator igniting");

        let kernel = OrchestratorKernel::ignite();
        kernel.spawn_override_sweep(&config);

        spool_orchestrator::demo::run(&kernel).await;

        info!("✅ [MAIN]: demonstration scenario complete");
        Ok(())
    })
}

use anyhow::Result;
use nb_cycle::config::Config;
use nb_cycle::controller::CycleController;
use nb_cycle::host::bridge::HttpBridge;
use nb_cycle::runlog::RunLog;
use std::path::Path;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let log_file = std::fs::File::create("nb-cycle.log")?;
    tracing_subscriber::fmt()
        .with_env_filter("nb_cycle=info")
        .with_writer(log_file)
        .init();

    let config = Config::load(Path::new("config.toml"))?;

    println!();
    println!("  nb-cycle v0.1.0");
    println!("  ===============");
    println!();
    println!("  workflow:   {}", config.workflow.variant);
    println!("  notebook:   {}", config.notebook_path().display());
    println!("  extraction: {} {}", config.extraction.interpreter, config.script_path().display());
    println!("  run log:    {}", config.workflow.run_log.display());
    println!();

    let run_log = RunLog::create(&config.workflow.run_log)?;
    run_log.line(&format!("run started ({} workflow)", config.workflow.variant));

    let host = HttpBridge::new(
        &config.host.base_url,
        Duration::from_millis(config.host.request_timeout_ms),
    )?;
    let mut controller = CycleController::new(&config, Box::new(host), &run_log);

    // The one failure boundary: anything fatal inside the cycle surfaces
    // here and nowhere else.
    match controller.run().await {
        Ok(summary) => {
            println!("All cycles finished ({} cycles)", summary.iterations);
            Ok(())
        }
        Err(e) => {
            run_log.line(&format!("cycle failed: {e:#}"));
            tracing::error!("cycle failed: {:#}", e);
            eprintln!("Cycle failed: {e:#}");
            std::process::exit(1);
        }
    }
}

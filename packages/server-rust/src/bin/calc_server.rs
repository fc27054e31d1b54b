//! `calc-server` binary: parses configuration, installs logging and serves
//! the calculator API until Ctrl-C.

use calc_server::cli::Cli;
use calc_server::telemetry::{init_tracing, install_prometheus_exporter};
use calc_server::{NetworkModule, ServiceStack};
use clap::Parser;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (log_levels, _log_files) =
        init_tracing(cli.log_format, &cli.log_level, cli.log_files_dir())?;

    if let Some(addr) = cli.metrics_addr {
        install_prometheus_exporter(addr)?;
    }

    let services = ServiceStack::build(cli.server_config());
    services.init().await?;

    let mut network = NetworkModule::new(cli.network_config(), services.clone(), log_levels);
    let port = network.start().await?;
    info!("Server running on port {port}");

    network
        .serve(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl-C: {err}");
                std::future::pending::<()>().await;
            }
            info!("Ctrl-C received");
        })
        .await?;

    services.registry.shutdown_all(false).await?;
    info!("Server stopped");
    Ok(())
}

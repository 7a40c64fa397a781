use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use hookgate::app::App;
use hookgate::args::Args;
use hookgate::config::{self, GatewayConfig};
use hookgate::{logging, rules_file, server};
use hookgate_core::transport::ReqwestTransport;
use hookgate_core::{HookGateError, Result};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(err) = args.validate() {
        eprintln!("Configuration error: {err}");
        std::process::exit(1);
    }

    logging::init_tracing(args.json_logs, args.verbose, args.quiet);

    if let Err(err) = run(args).await {
        error!(error = %err, "HookGate stopped with an error");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut gateway_config = GatewayConfig::load(args.config.as_deref())?;
    if let Some(port) = args.listen {
        gateway_config.port = port;
    }
    let gateway_config = config::install(gateway_config);

    let rules = rules_file::load_rules(&args.rules)?;
    let transport = Arc::new(ReqwestTransport::build()?);
    let app = App::new(gateway_config, rules, transport);

    server::print_startup_info(gateway_config, app.gateway(), args.verbose, args.quiet);

    let bind_ip: IpAddr = args
        .bind
        .parse()
        .map_err(|_| HookGateError::ConfigError(format!("Invalid bind address: '{}'", args.bind)))?;
    let bind_addr = SocketAddr::from((bind_ip, gateway_config.port));
    let listener = TcpListener::bind(bind_addr).await.map_err(|e| {
        HookGateError::ConfigError(format!("Failed to bind to {bind_addr}: {e}"))
    })?;

    info!(address = %bind_addr, "HookGate is running");

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_signal().await;
            info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    app.run(listener, shutdown).await
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

//! Gateway HTTP server: startup banner and accept loop.

use std::convert::Infallible;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::StatusCode;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::connection::{ConnectionLimiter, ConnectionTracker};
use crate::env_vars;
use hookgate_core::request_handler::{Gateway, create_error_response};

/// Print startup banner with configuration
pub fn print_startup_info(config: &GatewayConfig, gateway: &Gateway, verbose: bool, quiet: bool) {
    if quiet {
        println!(
            "HookGate v{} starting on port {}",
            env!("CARGO_PKG_VERSION"),
            config.port
        );
        return;
    }

    println!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    println!("   {}", env!("CARGO_PKG_DESCRIPTION"));
    println!();
    println!("Network:");
    println!("   Listen Port:      {}", config.port);
    println!(
        "   Max Connections:  {}",
        match config.max_connections {
            0 => "unlimited".to_string(),
            n => n.to_string(),
        }
    );
    println!();

    println!("Rules ({}):", gateway.rules().len());
    for rule in gateway.rules() {
        let action = rule.action();
        println!(
            "   {:<16} {:<9} -> {}",
            rule.name(),
            action.delivery_mode().as_str(),
            action.upstream()
        );
    }
    println!();

    let modes: Vec<String> = gateway
        .forwarders()
        .modes()
        .iter()
        .map(ToString::to_string)
        .collect();
    println!("Delivery:");
    println!("   Modes:            {}", modes.join(", "));
    println!("   Default Timeout:  {} seconds", config.proxy.timeout.as_secs());
    println!("   Max Body Size:    {} MB", config.proxy.max_body_size_mb());
    println!(
        "   Fallback When:    status >= {}",
        config.delivery.fallback_status_threshold
    );
    println!();

    println!("Queue:");
    println!("   Name:             {}", config.queue.name);
    println!("   Capacity:         {}", config.queue.capacity);
    println!("   Max Attempts:     {}", config.queue.max_attempts);
    println!(
        "   Redelivery Delay: {} ms",
        config.queue.redelivery_delay.as_millis()
    );

    if verbose {
        print_env_config();
    }

    println!();
}

/// Print environment variable configuration status (used in verbose mode)
fn print_env_config() {
    println!();
    println!("Environment Variables:");

    for &var_name in env_vars::all_env_vars() {
        match env::var(var_name) {
            Ok(value) => println!("   {:<36} = {}", var_name, value),
            Err(_) => println!("   {:<36} = [NOT SET]", var_name),
        }
    }
}

/// Accepts connections until `shutdown` is cancelled.
///
/// Open connections are asked to finish their current request once
/// shutdown starts; use [`ConnectionTracker::wait_for_shutdown`] to drain
/// them.
pub async fn serve(
    listener: TcpListener,
    gateway: Arc<Gateway>,
    limiter: ConnectionLimiter,
    tracker: ConnectionTracker,
    shutdown: CancellationToken,
) {
    loop {
        let (stream, addr) = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(err) => {
                    warn!(error = %err, "Failed to accept connection");
                    continue;
                }
            },
        };

        let admission = limiter.admit();
        if !admission.is_admitted() {
            warn!(
                client = %addr,
                max_connections = limiter.max_connections(),
                "Connection limit reached, rejecting"
            );
            tokio::spawn(reject_connection(stream));
            continue;
        }

        debug!(client = %addr, "New connection");
        let guard = tracker.track();
        let gateway = Arc::clone(&gateway);
        let shutdown = shutdown.clone();

        tokio::spawn(async move {
            let _admission = admission;
            let _guard = guard;
            serve_connection(stream, addr, gateway, shutdown).await;
        });
    }

    info!(open_connections = tracker.count(), "Stopped accepting connections");
}

async fn serve_connection(
    stream: TcpStream,
    addr: SocketAddr,
    gateway: Arc<Gateway>,
    shutdown: CancellationToken,
) {
    let service = service_fn(move |req| {
        let gateway = Arc::clone(&gateway);
        async move { gateway.handle_request(req, Some(addr)).await }
    });

    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        () = shutdown.cancelled() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(err) = result {
        debug!(client = %addr, error = %err, "Connection error");
    }
}

async fn reject_connection(stream: TcpStream) {
    let service = service_fn(|_req| async {
        Ok::<_, Infallible>(create_error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Server at capacity",
        ))
    });

    let _ = http1::Builder::new()
        .keep_alive(false)
        .serve_connection(TokioIo::new(stream), service)
        .await;
}

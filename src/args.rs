//! Command line argument parsing for HookGate.
//!
//! This module defines the CLI interface using [`clap`] for argument parsing.
//! Values given on the command line take precedence over the configuration
//! file and environment variables.
//!
//! # Example
//!
//! ```no_run
//! use hookgate::args::Args;
//! use clap::Parser;
//!
//! let args = Args::parse();
//! if let Err(e) = args.validate() {
//!     eprintln!("Configuration error: {}", e);
//!     std::process::exit(1);
//! }
//! ```

use std::path::PathBuf;

use clap::Parser;

/// Command line arguments for HookGate.
#[derive(Parser, Debug)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"))]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(
    long_about = "Rule-driven webhook gateway\nMatches incoming webhooks against declarative rules and delivers them instantly, through a queue, or instantly with a queued fallback\n\nExample usage:\n  hookgate --rules rules.toml\n  hookgate -l 8080 -r rules.toml -c hookgate.toml --verbose"
)]
#[command(
    after_help = "Environment variables:\n  HOOKGATE_PORT                       Listen port (default: 8080)\n  MAX_CONNECTIONS                     Max concurrent connections (0 = unlimited)\n  PROXY_TIMEOUT_SECS                  Default upstream timeout (default: 30)\n  MAX_BODY_SIZE_MB                    Max request body size (0 = unlimited)\n  FALLBACK_STATUS_THRESHOLD           Status treated as upstream failure (default: 500)\n  QUEUE_CAPACITY                      In-memory queue capacity\n  QUEUE_MAX_ATTEMPTS                  Attempts before dead-lettering\n  QUEUE_REDELIVERY_DELAY_MS           Delay before a requeued message is retried\n  RUST_LOG                            Log filter (overrides -v / -q)"
)]
pub struct Args {
    /// Address to bind to
    #[arg(
        long,
        short = 'b',
        help = "Bind address for incoming connections",
        value_name = "ADDRESS",
        default_value = "0.0.0.0"
    )]
    pub bind: String,

    /// Port to listen on; overrides the configured port
    #[arg(
        long,
        short = 'l',
        help = "Listen port for incoming connections",
        value_name = "PORT"
    )]
    pub listen: Option<u16>,

    /// Rules file
    #[arg(
        long,
        short = 'r',
        help = "Path to the TOML rules file",
        value_name = "FILE",
        env = "HOOKGATE_RULES",
        default_value = "rules.toml"
    )]
    pub rules: PathBuf,

    /// Gateway configuration file
    #[arg(
        long,
        short = 'c',
        help = "Path to the TOML configuration file (default: ./hookgate.toml if present)",
        value_name = "FILE",
        env = "HOOKGATE_CONFIG"
    )]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(
        long,
        short = 'v',
        help = "Show detailed configuration and debug logs"
    )]
    pub verbose: bool,

    /// Enable quiet mode (minimal output)
    #[arg(
        long,
        short = 'q',
        help = "Suppress configuration output, show only warnings and errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Output logs in JSON format (for structured logging)
    #[arg(long, help = "Output logs in JSON format for structured logging")]
    pub json_logs: bool,
}

impl Args {
    /// Validates the parsed command line arguments.
    ///
    /// - Listen port, when given, must be greater than 0
    /// - Bind address must be a valid IP address
    /// - Rules path must not be empty
    ///
    /// # Example
    ///
    /// ```
    /// use hookgate::args::Args;
    /// use clap::Parser;
    ///
    /// let args = Args::try_parse_from(["hookgate", "-l", "0"]).unwrap();
    /// assert!(args.validate().is_err());
    ///
    /// let args = Args::try_parse_from(["hookgate", "-l", "8080", "-r", "hooks.toml"]).unwrap();
    /// assert!(args.validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<(), String> {
        if self.listen == Some(0) {
            return Err("Listen port must be greater than 0".to_string());
        }

        if self.bind.parse::<std::net::IpAddr>().is_err() {
            return Err(format!("Invalid bind address: '{}'", self.bind));
        }

        if self.rules.as_os_str().is_empty() {
            return Err("Rules file path cannot be empty".to_string());
        }

        Ok(())
    }
}

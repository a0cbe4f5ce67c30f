use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{GatewayConfig, Settings};
use crate::dispatcher::Gateway;
use crate::logging::init_logging_with_config;
use crate::registry::{Outputs, Service};
use crate::request::{Request, RequestContext};
use crate::transport::{stdio, GatewayService, HttpServer, ServerHandle};

/// Command-line interface for an rpcgate service binary
#[derive(Debug, Parser)]
#[command(name = "rpcgate")]
#[command(about = "Dispatch RPC-style events to a service's methods", long_about = None)]
pub struct Cli {
    /// YAML settings file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log every method left out of the registry
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the registered methods
    Methods,
    /// Dispatch a single call and print the envelope
    Invoke {
        /// Method name, in any spelling
        method: String,

        /// JSON request body
        #[arg(short, long)]
        body: Option<String>,

        /// Request id to attach to the call
        #[arg(long)]
        request_id: Option<String>,
    },
    /// Answer line-delimited JSON invocations on stdin
    Stdio,
    /// Serve the HTTP adapter
    Serve {
        /// Listen address (overrides the settings file)
        #[arg(long)]
        addr: Option<String>,
    },
}

impl Cli {
    /// Settings from `--config`, or the defaults.
    ///
    /// # Errors
    ///
    /// Fails if the settings file cannot be read or parsed.
    pub fn settings(&self) -> Result<Settings> {
        match &self.config {
            Some(path) => Settings::load(path),
            None => Ok(Settings::default()),
        }
    }

    pub fn gateway_config(&self, settings: &Settings) -> GatewayConfig {
        let mut config = settings.gateway_config();
        config.verbose |= self.verbose;
        config
    }
}

/// Parse settings, install logging and run `cli.command` against `service`.
///
/// # Errors
///
/// Configuration, logging and transport failures. Dispatch failures are
/// envelopes, not errors.
pub fn run_cli<S: Service>(cli: Cli, service: S) -> Result<()> {
    let settings = cli.settings()?;
    let _log_guard = init_logging_with_config(&settings.log_config())?;
    let gateway = Arc::new(Gateway::with_config(service, cli.gateway_config(&settings)));

    match cli.command {
        Commands::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| settings.http_addr().to_string());
            serve(gateway, &addr, &settings)
        }
        Commands::Stdio => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            stdio::serve(&gateway, stdin.lock(), stdout.lock()).context("Event loop failed")?;
            Ok(())
        }
        other => execute(&other, &gateway, &mut io::stdout().lock()),
    }
}

/// Run the one-shot commands, writing their output to `out`.
///
/// # Errors
///
/// Invalid `--body` JSON, write failures, or a long-running command passed in.
pub fn execute(command: &Commands, gateway: &Gateway, out: &mut dyn Write) -> Result<()> {
    match command {
        Commands::Methods => print_methods(gateway, out),
        Commands::Invoke {
            method,
            body,
            request_id,
        } => {
            let body = match body {
                Some(raw) => serde_json::from_str(raw).context("--body is not valid JSON")?,
                None => Value::Null,
            };
            let mut context = RequestContext::new();
            if let Some(id) = request_id {
                context.insert("request_id", id.as_str());
            }
            let response = gateway.dispatch(Request::new(method.as_str(), body).with_context(context));
            serde_json::to_writer_pretty(&mut *out, &response)?;
            writeln!(out)?;
            Ok(())
        }
        Commands::Stdio | Commands::Serve { .. } => {
            anyhow::bail!("{command:?} is not a one-shot command")
        }
    }
}

fn print_methods(gateway: &Gateway, out: &mut dyn Write) -> Result<()> {
    let registry = gateway.registry();
    for name in registry.names() {
        let Some(method) = registry.lookup(name) else {
            continue;
        };
        let input = method.input().map(|s| s.type_name()).unwrap_or("-");
        let outputs = match method.outputs() {
            Outputs::None => "()",
            Outputs::ErrorOnly => "Result<(), E>",
            Outputs::ValueAndError => "Result<T, E>",
        };
        writeln!(out, "{name:<24} input: {input:<32} returns: {outputs}")?;
    }
    if gateway.config().verbose {
        for exclusion in registry.exclusions() {
            writeln!(out, "excluded {:<15} {}", exclusion.name(), exclusion.reason())?;
        }
    }
    Ok(())
}

fn serve(gateway: Arc<Gateway>, addr: &str, settings: &Settings) -> Result<()> {
    settings.runtime_config().apply();
    let handle = HttpServer(GatewayService::new(gateway))
        .start(addr)
        .with_context(|| format!("Failed to start HTTP server on {addr}"))?;
    handle.wait_ready().context("HTTP server did not become ready")?;

    wait_for_shutdown(handle)
}

#[cfg(unix)]
fn wait_for_shutdown(handle: ServerHandle) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to register signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        tracing::info!(signal, "Shutdown signal received");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: ServerHandle) -> Result<()> {
    handle
        .join()
        .map_err(|e| anyhow::anyhow!("HTTP server panicked: {e:?}"))
}

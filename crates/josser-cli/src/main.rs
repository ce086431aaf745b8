use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use josser_client::config::{self, Config, TransportConfig};
use josser_client::Client;
use josser_protocol::{Error, Protocol};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

#[derive(Parser)]
#[command(name = "josser", about = "Call JSON-RPC methods from the command line")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<String>,
    /// Send requests to this HTTP endpoint
    #[arg(long, global = true, conflicts_with = "socket")]
    url: Option<String>,
    /// Send requests to this Unix socket
    #[arg(long, global = true)]
    socket: Option<String>,
    /// JSON-RPC version (1.0 or 2.0)
    #[arg(long, global = true)]
    protocol: Option<Protocol>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call a method and print its result
    Call {
        method: String,
        /// Parameters as a JSON array or object
        params: Option<String>,
    },
    /// Send a notification (no response is expected)
    Notify {
        method: String,
        /// Parameters as a JSON array or object
        params: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(Path::new(path))?,
        None => Config::load()?,
    };
    if let Some(url) = cli.url {
        config.transport = TransportConfig::Http { url };
    }
    if let Some(socket_path) = cli.socket {
        config.transport = TransportConfig::Unix { socket_path };
    }
    if let Some(protocol) = cli.protocol {
        config.client.protocol = protocol;
    }

    config::init_tracing(&config.client.log_level);
    debug!(transport = ?config.transport, protocol = %config.client.protocol, "Loaded configuration");

    let client = Client::from_config(&config)?;

    match cli.command {
        Commands::Call { method, params } => cmd_call(&client, &method, params.as_deref()).await,
        Commands::Notify { method, params } => {
            cmd_notify(&client, &method, params.as_deref()).await
        }
    }
}

async fn cmd_call(client: &Client, method: &str, params: Option<&str>) -> Result<()> {
    let params = parse_params(params)?;
    let result = client.call_value(method, params).await.map_err(describe)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn cmd_notify(client: &Client, method: &str, params: Option<&str>) -> Result<()> {
    let params = parse_params(params)?;
    client.notify(method, params).await.map_err(describe)?;
    Ok(())
}

fn parse_params(raw: Option<&str>) -> Result<Option<Value>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value: Value = serde_json::from_str(raw).context("Parameters are not valid JSON")?;
    if !value.is_array() && !value.is_object() {
        anyhow::bail!("Parameters must be a JSON array or object, got: {raw}");
    }
    Ok(Some(value))
}

/// Attach a human-readable classification to a client error.
fn describe(err: Error) -> anyhow::Error {
    match err {
        Error::RpcFault(fault) => {
            let mut message = format!(
                "Remote procedure failed (code {}): {}",
                fault.code(),
                fault.message()
            );
            if let Some(data) = fault.data() {
                message.push_str(&format!("\ndata: {data}"));
            }
            anyhow::anyhow!(message)
        }
        Error::InvalidResponse(e) => anyhow::Error::new(e).context("Server sent an invalid response"),
        Error::Transport(e) => anyhow::Error::new(e).context("Could not reach the server"),
        Error::Encode(e) => anyhow::Error::new(e).context("Could not encode the request"),
    }
}

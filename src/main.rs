use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

use domo_bridge::api::ApiServer;
use domo_bridge::{Bridge, Config};

/// Domo Bridge - voice assistant smart home bridge for Domoticz
#[derive(Parser)]
#[command(name = "domo-bridge", version, about)]
struct Cli {
    /// Port to listen on (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Run discovery against the hub and print the response
    Discover {
        /// Bearer token to send as the directive scope
        #[arg(long, env = "DOMO_BRIDGE_TOKEN")]
        token: Option<String>,
    },
    /// Handle one directive and print the response
    Handle {
        /// Directive JSON file; reads stdin when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,domo_bridge=info",
        1 => "info,domo_bridge=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    tracing::debug!(?config, "loaded configuration");

    let bridge = Bridge::new(config);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            tracing::info!(
                hub = %bridge.config().hub.host,
                port = bridge.config().server.port,
                "starting domo bridge"
            );
            ApiServer::new(bridge).run().await?;
        }
        Command::Discover { token } => {
            let event = bridge.handle(discover_request(token.as_deref())).await?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        Command::Handle { file } => {
            let raw = match file {
                Some(path) => std::fs::read_to_string(&path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let body: Value = serde_json::from_str(&raw)?;
            let event = bridge.handle(body).await?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
    }

    Ok(())
}

fn discover_request(token: Option<&str>) -> Value {
    let mut payload = json!({});
    if let Some(token) = token {
        payload["scope"] = json!({ "type": "BearerToken", "token": token });
    }
    json!({
        "directive": {
            "header": {
                "namespace": "Alexa.Discovery",
                "name": "Discover",
                "payloadVersion": "3",
                "messageId": "cli-discover"
            },
            "payload": payload
        }
    })
}

//! Management session client for OptiSim.
//!
//! Opens one session, runs a single operation against a network element,
//! prints the reply and closes the session.

use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, eyre, Context, Result};
use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tokio::time::timeout;

use optisim::netconf::rpc::{self, Message, BASE_CAPABILITY};
use optisim::netconf::{Datastore, FrameReader, FrameWriter, Operation, RpcRequest};

#[derive(Parser)]
#[command(name = "ne-probe")]
#[command(about = "Query a simulated network element over a management session")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Simulator address
    #[arg(short, long, default_value = "127.0.0.1:8830")]
    address: String,

    /// Seconds to wait for each server message
    #[arg(short, long, default_value = "10")]
    timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Operational state and interfaces of an element
    Get { element_id: String },
    /// Running configuration of an element
    GetConfig { element_id: String },
    /// Change configuration leaves of an element
    EditConfig {
        element_id: String,

        /// Leaf to set, as key=value (repeatable)
        #[arg(long = "set", value_parser = parse_key_value, required = true)]
        changes: Vec<(String, String)>,
    },
}

impl Commands {
    fn into_operation(self) -> Operation {
        match self {
            Commands::Get { element_id } => Operation::Get { element_id },
            Commands::GetConfig { element_id } => Operation::GetConfig {
                element_id,
                source: Datastore::Running,
            },
            Commands::EditConfig { element_id, changes } => Operation::EditConfig {
                element_id,
                target: Datastore::Running,
                changes,
            },
        }
    }
}

fn parse_key_value(arg: &str) -> std::result::Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", arg)),
    }
}

async fn next_frame<R: AsyncRead + Unpin>(reader: &mut FrameReader<R>, wait: Duration) -> Result<String> {
    timeout(wait, reader.read_frame())
        .await
        .context("Timed out waiting for the simulator")??
        .ok_or_else(|| eyre!("Simulator closed the session"))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level)).init();

    let wait = Duration::from_secs(cli.timeout);
    let stream = TcpStream::connect(&cli.address)
        .await
        .with_context(|| format!("Failed to connect to {}", cli.address))?;
    let (reader, writer) = stream.into_split();
    let mut reader = FrameReader::new(reader);
    let mut writer = FrameWriter::new(writer);

    let hello = next_frame(&mut reader, wait).await?;
    match rpc::parse_message(&hello) {
        Ok(Message::Hello(hello)) if hello.supports(BASE_CAPABILITY) => {
            log::info!("Session {} established", hello.session_id.unwrap_or_default());
        }
        _ => bail!("Unexpected server greeting:\n{}", hello),
    }
    writer.write_frame(&rpc::client_hello()).await?;

    let request = RpcRequest::new("1", cli.command.into_operation());
    log::debug!("Sending {}", request.operation.name());
    writer.write_frame(&request.render()).await?;
    let reply = next_frame(&mut reader, wait).await?;
    println!("{}", reply.trim());

    writer
        .write_frame(&RpcRequest::new("2", Operation::CloseSession).render())
        .await?;
    next_frame(&mut reader, wait).await?;

    if reply.contains("<rpc-error>") {
        bail!("Request failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_value_parsing() {
        assert_eq!(
            parse_key_value("hostname=nyc-1"),
            Ok(("hostname".to_string(), "nyc-1".to_string()))
        );
        assert_eq!(parse_key_value("logging-level="), Ok(("logging-level".to_string(), String::new())));
        assert!(parse_key_value("hostname").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_edit_config_args() {
        let cli = Cli::parse_from([
            "ne-probe",
            "edit-config",
            "EDFA-BOS-001",
            "--set",
            "hostname=bos-amp",
            "--set",
            "ntp-enabled=false",
        ]);

        assert_eq!(cli.address, "127.0.0.1:8830");
        match cli.command.into_operation() {
            Operation::EditConfig { element_id, changes, target } => {
                assert_eq!(element_id, "EDFA-BOS-001");
                assert_eq!(target, Datastore::Running);
                assert_eq!(changes.len(), 2);
            }
            other => panic!("unexpected operation {:?}", other),
        }
    }
}

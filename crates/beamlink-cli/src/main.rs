//! beamlink: headless screen-share signaling client.
//!
//! `view` waits for a sharer to call the printed share code; `share` calls a
//! viewer's code and offers a local video track. Both run until Ctrl-C.

mod client;

use std::path::PathBuf;

use beamlink_common::{BeamlinkError, ConfigError, ParticipantIdentity, ShareCode};
use beamlink_config::schema::CallMode;
use beamlink_config::BeamlinkConfig;
use beamlink_signal::ClientMode;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "beamlink", about = "Peer-to-peer screen share over a signaling relay")]
struct Args {
    /// Config file (defaults to the platform config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Relay WebSocket URL, overriding the config.
    #[arg(long, global = true)]
    relay: Option<String>,

    /// Login name, overriding the config and the generated one.
    #[arg(long, global = true)]
    name: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Wait for incoming screen shares.
    View,
    /// Share this screen with the viewer showing CODE.
    Share {
        #[arg(long)]
        code: String,
    },
    /// Print the resolved configuration as JSON.
    Config,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("beamlink: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), BeamlinkError> {
    let mut config = match &args.config {
        Some(path) => beamlink_config::load_from_path(path)?,
        None => beamlink_config::load_default()?,
    };
    if let Some(url) = args.relay {
        config.relay.url = url;
    }
    beamlink_config::validation::validate(&config)?;

    init_logging(&config);

    match args.command {
        Command::Config => {
            println!("{}", beamlink_config::config_to_json(&config));
            Ok(())
        }
        Command::View => {
            let mode = resolve_mode(config.call.mode, ClientMode::Viewer)?;
            let (identity, code) = viewer_identity(args.name, &config);
            println!("Share code: {code}");
            client::run(&config, mode, identity, None).await
        }
        Command::Share { code } => {
            let mode = resolve_mode(config.call.mode, ClientMode::Sharer)?;
            let target = ShareCode::parse(&code)?;
            let identity = sharer_identity(args.name, &config);
            client::run(&config, mode, identity, Some(target)).await
        }
    }
}

/// `RUST_LOG` wins; otherwise the configured level for beamlink crates.
fn init_logging(config: &BeamlinkConfig) {
    let level = config.logging.level.as_str();
    let fallback = format!(
        "beamlink={level},beamlink_signal={level},beamlink_rtc={level},beamlink_config={level}"
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .init();
}

/// The subcommand picks the role; `call.mode` may forbid it.
fn resolve_mode(configured: CallMode, requested: ClientMode) -> Result<ClientMode, ConfigError> {
    let allowed = match configured {
        CallMode::Both => true,
        CallMode::Sharer => requested == ClientMode::Sharer,
        CallMode::Viewer => requested == ClientMode::Viewer,
    };
    if !allowed {
        return Err(ConfigError::ValidationError(format!(
            "{} is disabled by call.mode",
            requested.as_str()
        )));
    }
    Ok(requested)
}

/// A viewer logs in under the code sharers will dial.
fn viewer_identity(
    name: Option<String>,
    config: &BeamlinkConfig,
) -> (ParticipantIdentity, ShareCode) {
    match explicit_name(name, config) {
        Some(name) => {
            let code = ShareCode::from(name.as_str());
            (ParticipantIdentity::new(name), code)
        }
        None => ParticipantIdentity::viewer(),
    }
}

fn sharer_identity(name: Option<String>, config: &BeamlinkConfig) -> ParticipantIdentity {
    explicit_name(name, config)
        .map(ParticipantIdentity::new)
        .unwrap_or_else(ParticipantIdentity::sharer)
}

fn explicit_name(name: Option<String>, config: &BeamlinkConfig) -> Option<String> {
    name.or_else(|| Some(config.identity.name.clone()))
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_mode_allows_either_command() {
        assert_eq!(
            resolve_mode(CallMode::Both, ClientMode::Viewer).unwrap(),
            ClientMode::Viewer
        );
        assert_eq!(
            resolve_mode(CallMode::Both, ClientMode::Sharer).unwrap(),
            ClientMode::Sharer
        );
    }

    #[test]
    fn restricted_mode_refuses_other_command() {
        let err = resolve_mode(CallMode::Viewer, ClientMode::Sharer).unwrap_err();
        assert!(err.to_string().contains("sharer is disabled"));
        assert!(resolve_mode(CallMode::Sharer, ClientMode::Sharer).is_ok());
    }

    #[test]
    fn cli_name_beats_config_name() {
        let mut config = BeamlinkConfig::default();
        config.identity.name = "from-config".into();

        let identity = sharer_identity(Some("from-cli".into()), &config);
        assert_eq!(identity.as_str(), "from-cli");

        let identity = sharer_identity(None, &config);
        assert_eq!(identity.as_str(), "from-config");
    }

    #[test]
    fn blank_names_fall_back_to_generated() {
        let config = BeamlinkConfig::default();
        let identity = sharer_identity(Some("   ".into()), &config);
        assert!(identity.as_str().starts_with("shareuser"));

        let (identity, code) = viewer_identity(None, &config);
        assert_eq!(identity.as_str(), code.as_str());
        assert_eq!(code.as_str().len(), 6);
    }

    #[test]
    fn named_viewer_uses_name_as_code() {
        let config = BeamlinkConfig::default();
        let (identity, code) = viewer_identity(Some("lobby".into()), &config);
        assert_eq!(identity.as_str(), "lobby");
        assert_eq!(code.as_str(), "lobby");
    }

    #[test]
    fn args_parse_share_command() {
        let args = Args::try_parse_from([
            "beamlink",
            "--relay",
            "ws://127.0.0.1:9000/ws",
            "share",
            "--code",
            "k3x9ab",
        ])
        .unwrap();
        assert_eq!(args.relay.as_deref(), Some("ws://127.0.0.1:9000/ws"));
        assert!(matches!(args.command, Command::Share { ref code } if code == "k3x9ab"));
    }
}

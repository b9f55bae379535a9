//! Start command - launches the lensbot server.

use std::net::{IpAddr, SocketAddr};

use anyhow::{Context as _, Result};
use clap::Args;

use lensbot_config::{LensbotConfig, MatchStrategy};
use lensbot_server::{AppState, Server, ServerConfig};
use lensbot_session::SessionStore;

use super::{Context, KnowledgeArgs};
use crate::setup;

/// Arguments for the start command.
///
/// CLI arguments override config file values.
#[derive(Args, Debug, Default)]
pub struct StartArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Knowledge matching strategy: exact or embedding (overrides config)
    #[arg(long)]
    pub strategy: Option<MatchStrategy>,

    #[command(flatten)]
    pub knowledge: KnowledgeArgs,
}

impl StartArgs {
    /// Fold CLI overrides into the loaded config.
    fn apply(&self, config: &mut LensbotConfig) {
        if self.port.is_some() || self.bind.is_some() {
            let mut server = config.server_config();
            if let Some(port) = self.port {
                server.port = port;
            }
            if let Some(ref bind) = self.bind {
                server.bind = bind.clone();
            }
            config.server = Some(server);
        }

        if let Some(strategy) = self.strategy {
            let mut matching = config.matching_config();
            matching.strategy = strategy;
            config.matching = Some(matching);
        }

        self.knowledge.apply(config);
    }
}

/// Run the start command.
pub async fn run(args: StartArgs, ctx: &Context) -> Result<()> {
    let mut config = ctx.config.clone();
    args.apply(&mut config);
    config.validate()?;

    setup::report_api_key(&config);

    let assistant = setup::build_assistant(&config).await?;

    let sessions = SessionStore::new(setup::store_config(&config));
    let _cleanup = sessions.spawn_cleanup_task();

    let http = server_config(&config)?;
    let addr = http.bind_address;
    let state = AppState::with_sessions(assistant, http, sessions);

    tracing::info!(
        strategy = %config.matching_config().strategy,
        "Starting lensbot on http://{}",
        addr
    );

    Server::from_state(state).run().await?;
    Ok(())
}

fn server_config(config: &LensbotConfig) -> Result<ServerConfig> {
    let server = config.server_config();
    let ip: IpAddr = server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", server.bind))?;

    Ok(ServerConfig::new()
        .with_bind_address(SocketAddr::new(ip, server.port))
        .with_request_logging(server.request_logging)
        .with_static_dir(server.static_dir))
}

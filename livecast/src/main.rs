mod console;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use livecast_core::comments::CommentPoller;
use livecast_core::store::FileSessionStore;
use livecast_core::{logging, Config, SessionController};
use livecast_providers::LiveClient;

use console::Console;

#[derive(Parser, Debug)]
#[command(name = "livecast")]
#[command(about = "Live broadcast session console", long_about = None)]
struct Args {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, env = "LIVECAST_CONFIG")]
    config: Option<String>,

    /// Session token, overrides service.session_token
    #[arg(long)]
    token: Option<String>,

    /// Service base URL, overrides service.base_url
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load configuration
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(token) = args.token {
        config.service.session_token = Some(token);
    }
    if let Some(base_url) = args.base_url {
        config.service.base_url = base_url;
    }

    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("Config validation error: {e}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s)",
            errors.len()
        ));
    }

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!(base_url = %config.service.base_url, "livecast starting");
    if config.service.session_token.is_none() {
        warn!("No session token configured, the service will likely reject requests");
    }

    // 3. Wire the session
    let client = Arc::new(LiveClient::from_config(&config.service)?);
    let poller = Arc::new(CommentPoller::from_config(client.clone(), &config.comments));
    let store = Arc::new(FileSessionStore::new(&config.session.session_file));
    let controller = Arc::new(SessionController::new(
        client,
        poller.clone(),
        store,
        config.broadcast.request(),
    ));

    // 4. Run until quit, logout, EOF or Ctrl-C
    Console::new(controller.clone(), poller).run().await?;

    // 5. Leave nothing running remotely
    let settle = Duration::from_secs(config.service.request_timeout_seconds.saturating_mul(2));
    if tokio::time::timeout(settle, console::wait_idle(&controller))
        .await
        .is_err()
    {
        warn!("Session operation still in flight at exit");
    }
    controller.shutdown().await;

    info!("livecast stopped");
    Ok(())
}

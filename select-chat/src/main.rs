use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use select_chat::{
    cli::{Cli, Command},
    config::RelayConfig,
    relay::Relay,
    resolve, session,
};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Relay(args) => {
            let listener = resolve::bind_listener(&args.bind, args.port)
                .await
                .context("failed to set up listening endpoint")?;
            let mut relay = Relay::new(listener, RelayConfig::from(&args))?;
            let addr = relay.local_addr()?;
            info!("relay listening on {}", addr);
            if let Err(err) = relay.run_until_ctrl_c().await {
                warn!("relay exited with error: {err:?}");
                return Err(err.into());
            }
        }
        Command::Session(args) => {
            let end = session::run(args).await?;
            debug!(?end, "session ended");
        }
    }

    Ok(())
}

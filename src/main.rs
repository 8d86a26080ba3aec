//! chatsh - shell-style client for a hierarchical chat service, served over SSH
//!
//! Users navigate directories and rooms with `ls`, `cd`, `touch` and
//! `mkdir`, and `vim <room>` drops them into a live chat.

use std::sync::Arc;

use anyhow::{Context, Result};
use russh::server::Server as _;
use tracing::info;

use chatsh::config::Config;
use chatsh::paths;
use chatsh::ssh::ChatshServer;
use chatsh::state::SharedState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chatsh=info".parse()?),
        )
        .init();

    paths::log_paths();
    let config = Config::load(paths::config_path()).context("failed to load config")?;
    info!(addr = %config.listen_addr, "starting chatsh");

    let key = load_or_generate_host_key()?;
    let russh_config = russh::server::Config {
        keys: vec![key],
        inactivity_timeout: Some(std::time::Duration::from_secs(20 * 60)),
        ..Default::default()
    };

    let listen_addr = config.listen_addr;
    let state = Arc::new(SharedState::new(config).context("failed to seed backend")?);

    let mut server = ChatshServer::new(state);
    info!("listening on {}", listen_addr);
    server
        .run_on_address(Arc::new(russh_config), listen_addr)
        .await
        .context("ssh server failed")?;

    Ok(())
}

fn load_or_generate_host_key() -> Result<russh::keys::PrivateKey> {
    let key_path = paths::host_key_path();

    if key_path.exists() {
        info!("loading host key from {}", key_path.display());
        let encoded = std::fs::read_to_string(&key_path)
            .with_context(|| format!("failed to read {}", key_path.display()))?;
        Ok(russh::keys::decode_secret_key(&encoded, None)?)
    } else {
        info!("generating new host key at {}", key_path.display());
        let key = russh::keys::PrivateKey::random(
            &mut rand::thread_rng(),
            russh::keys::Algorithm::Ed25519,
        )
        .context("failed to generate key")?;

        paths::ensure_key_dir()?;
        std::fs::write(
            &key_path,
            key.to_openssh(russh::keys::ssh_key::LineEnding::LF)?,
        )
        .with_context(|| format!("failed to write {}", key_path.display()))?;

        Ok(key)
    }
}

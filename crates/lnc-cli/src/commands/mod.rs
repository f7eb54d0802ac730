pub mod chain;
pub mod common;
pub mod config;
pub mod console;
pub mod nodes;
pub mod tx;

use lnc_core::ConsoleConfig;
use std::path::Path;

pub use common::{flush_notifications, parse_address, print_notification, print_peers};

/// Config file, then `LNC_*` environment, then command-line flags.
pub fn load_config(
    config_dir: &Path,
    node: Option<&str>,
    peers: &[String],
) -> Result<ConsoleConfig, Box<dyn std::error::Error>> {
    let mut config = ConsoleConfig::load_or_default(config_dir)?;
    config.apply_env();
    if let Some(node) = node {
        config.default_node = node.to_string();
    }
    for peer in peers {
        if !config.bootstrap_peers.contains(peer) {
            config.bootstrap_peers.push(peer.clone());
        }
    }
    config.validate()?;
    Ok(config)
}

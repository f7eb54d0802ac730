// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LEDGER NODE CONSOLE (LNC) - NETWORK MODULE
//
// Everything that talks to a ledger node over HTTP.
// - LedgerClient: one method per node route, always against the active node
// - RegistryHandle: shared registry plus change notifications
// - SyncController: node switching, periodic peer refresh, conflict resolution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub mod client;
pub mod error;
pub mod handle;
pub mod sync;

pub use client::LedgerClient;
pub use error::LedgerError;
pub use handle::RegistryHandle;
pub use sync::{
    ActionOutcome, DashboardSnapshot, Notification, NotificationLevel, SyncController, SyncEvent,
};

use lnc_core::{ConfigError, ConsoleConfig, RegistryStore, ValidationError};

/// Build the registry, client and controller described by `config`.
/// The controller is not started.
pub fn controller_from_config(config: &ConsoleConfig) -> Result<SyncController, SetupError> {
    config.validate()?;
    let store = RegistryStore::with_peers(config.default_address()?, config.bootstrap_addresses());
    let registry = RegistryHandle::new(store);
    let client =
        LedgerClient::with_timeouts(registry, config.request_timeout(), config.resolve_timeout())?;
    Ok(SyncController::with_interval(client, config.refresh_interval()))
}

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid node address: {0}")]
    Address(#[from] ValidationError),
    #[error("{0}")]
    Client(#[from] LedgerError),
}

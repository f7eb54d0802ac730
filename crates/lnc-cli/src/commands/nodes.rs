use super::{flush_notifications, parse_address, print_peers};
use crate::{print_error, print_info, NodesCommands};
use lnc_network::{ActionOutcome, SyncController};

pub async fn handle(
    action: NodesCommands,
    controller: &SyncController,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        NodesCommands::List => list(controller).await,
        NodesCommands::Add { url } => add(&url, controller).await,
        NodesCommands::Switch { url } => switch(&url, controller).await,
        NodesCommands::Resolve => resolve(controller).await,
    }
    Ok(())
}

pub async fn list(controller: &SyncController) {
    if let ActionOutcome::Failed(e) = controller.refresh_now().await {
        print_error(&format!("Could not refresh from the active node: {}", e));
    }
    print_peers(&controller.list_known_endpoints());
}

pub async fn add(url: &str, controller: &SyncController) {
    let Some(address) = parse_address(url) else {
        return;
    };
    let mut events = controller.subscribe();
    controller.add_peer(address).await;
    flush_notifications(&mut events);
    print_peers(&controller.list_known_endpoints());
}

pub async fn switch(url: &str, controller: &SyncController) {
    let Some(address) = parse_address(url) else {
        return;
    };
    print_info(&format!("Switching active node to {}...", address));
    let mut events = controller.subscribe();
    controller.switch_active(address).await;
    flush_notifications(&mut events);
    print_peers(&controller.list_known_endpoints());
}

pub async fn resolve(controller: &SyncController) {
    print_info(&format!(
        "Resolving conflicts on {}...",
        controller.get_active_endpoint().address
    ));
    let mut events = controller.subscribe();
    controller.resolve_conflicts_now().await;
    flush_notifications(&mut events);
}


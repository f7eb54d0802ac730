// Output and input helpers shared by the one-shot commands and the console.

use crate::{print_error, print_info, print_success};
use colored::*;
use lnc_core::{NodeAddress, PeerEndpoint};
use lnc_network::{Notification, NotificationLevel, SyncEvent};
use tokio::sync::broadcast;

/// Parse a node URL typed by the operator. Bad input is reported here.
pub fn parse_address(url: &str) -> Option<NodeAddress> {
    match NodeAddress::parse(url) {
        Ok(address) => Some(address),
        Err(e) => {
            print_error(&format!("Invalid node address '{}': {}", url, e));
            None
        }
    }
}

pub fn print_notification(note: &Notification) {
    let text = match &note.detail {
        Some(detail) => format!("{}: {}", note.title, detail),
        None => note.title.clone(),
    };
    match note.level {
        NotificationLevel::Success => print_success(&text),
        NotificationLevel::Error => print_error(&text),
        NotificationLevel::Info => print_info(&text),
    }
}

/// Print the notifications an action left behind. One-shot commands call
/// this after every controller action.
pub fn flush_notifications(events: &mut broadcast::Receiver<SyncEvent>) {
    loop {
        match events.try_recv() {
            Ok(SyncEvent::Notify(note)) => print_notification(&note),
            Ok(_) => {}
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                log::warn!("{} notification(s) dropped", skipped);
            }
            Err(_) => break,
        }
    }
}

pub fn print_peers(peers: &[PeerEndpoint]) {
    println!();
    println!("{}", "═══ KNOWN NODES ═══".cyan().bold());
    for (i, peer) in peers.iter().enumerate() {
        if i == 0 {
            println!(
                "  {} {} {}",
                format!("{:<8}", peer.label).green().bold(),
                peer.address,
                "(active)".green()
            );
        } else {
            println!("  {} {}", format!("{:<8}", peer.label).bold(), peer.address);
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_normalizes_input() {
        let address = parse_address(" http://127.0.0.1:5001/ ").unwrap();
        assert_eq!(address.as_str(), "http://127.0.0.1:5001");
    }

    #[test]
    fn test_parse_address_rejects_blank() {
        assert!(parse_address("   ").is_none());
    }
}

use super::flush_notifications;
use crate::{print_error, print_info};
use chrono::{TimeZone, Utc};
use colored::*;
use lnc_core::{Block, ChainSnapshot};
use lnc_network::{ActionOutcome, DashboardSnapshot, SyncController};

pub async fn show_chain(controller: &SyncController) -> Result<(), Box<dyn std::error::Error>> {
    print_info(&format!(
        "Fetching chain from {}...",
        controller.get_active_endpoint().address
    ));
    let mut events = controller.subscribe();
    let outcome = controller.refresh_dashboard().await;
    flush_notifications(&mut events);

    // Failures were already printed as notifications.
    if let ActionOutcome::Completed(snapshot) = outcome {
        print_dashboard(&snapshot);
    }
    Ok(())
}

pub async fn show_id(controller: &SyncController) -> Result<(), Box<dyn std::error::Error>> {
    match controller.client().fetch_identity().await {
        Ok(identity) => println!("{} {}", "Node ID:".bold(), identity.node_id.green()),
        Err(e) => print_error(&format!("Error fetching node ID: {}", e)),
    }
    Ok(())
}

pub async fn mine(controller: &SyncController) -> Result<(), Box<dyn std::error::Error>> {
    print_info(&format!(
        "Mining on {}...",
        controller.get_active_endpoint().address
    ));
    let mut events = controller.subscribe();
    let outcome = controller.mine_block().await;
    flush_notifications(&mut events);

    if !outcome.is_completed() {
        return Ok(());
    }
    if let ActionOutcome::Completed(snapshot) = controller.refresh_dashboard().await {
        print_dashboard(&snapshot);
    }
    flush_notifications(&mut events);
    Ok(())
}

pub fn print_dashboard(snapshot: &DashboardSnapshot) {
    println!();
    println!("{}", "═══ LEDGER NODE ═══".cyan().bold());
    println!();
    println!(
        "{} {}",
        "Node ID:".bold(),
        snapshot.node_id.as_deref().unwrap_or("Unknown").green()
    );

    let Some(chain) = &snapshot.chain else {
        println!("{} {}", "Chain:".bold(), "unavailable".yellow());
        return;
    };
    print_chain_summary(chain);
}

fn print_chain_summary(chain: &ChainSnapshot) {
    println!(
        "{} {}",
        "Total Blocks:".bold(),
        chain.total_blocks().to_string().cyan()
    );
    match chain.latest_block() {
        Some(block) => {
            println!(
                "{} {}",
                "Latest Block:".bold(),
                format!("#{}", block.index).cyan()
            );
            print_block(block);
        }
        None => println!("{} none", "Latest Block:".bold()),
    }
    println!();
}

fn print_block(block: &Block) {
    println!();
    println!("{}", "─── Latest Block ───".cyan());
    println!("  {} {}", "Index:".bold(), block.index);
    println!(
        "  {} {}",
        "Timestamp:".bold(),
        format_timestamp(block.timestamp_secs())
    );
    println!("  {} {}", "Proof:".bold(), block.proof);
    println!(
        "  {} {}",
        "Previous Hash:".bold(),
        block.prev_hash.as_deref().unwrap_or("(genesis)")
    );

    if block.transactions.is_empty() {
        println!("  {} none", "Transactions:".bold());
        return;
    }
    println!("  {}", "Transactions:".bold());
    for tx in &block.transactions {
        println!(
            "    {} → {}  {}",
            tx.sender,
            tx.recipient,
            format_amount(tx.amount).green()
        );
    }
}

/// `2023-11-14 22:13:20 UTC`; out-of-range values fall back to raw seconds.
pub fn format_timestamp(secs: i64) -> String {
    match Utc.timestamp_opt(secs, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("{}s", secs),
    }
}

fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{:.0}", amount)
    } else {
        amount.to_string()
    }
}

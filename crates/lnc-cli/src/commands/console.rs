// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Interactive console
//
// Starts the controller (bootstrap registration, first refresh, periodic
// refresh), prints notifications as they arrive and reloads the dashboard
// whenever the controller marks it stale.
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use super::chain::print_dashboard;
use super::{parse_address, print_notification, print_peers};
use crate::{print_error, print_info};
use colored::*;
use lnc_core::TransactionForm;
use lnc_network::{ActionOutcome, SyncController, SyncEvent};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const HELP: &str = "\
  status                         active node and session state
  nodes                          known nodes with their labels
  switch <url>                   make <url> active and announce known nodes to it
  add <url>                      register <url> with the active node
  refresh                        pull the peer list from the active node now
  sync                           resolve chain conflicts on the active node
  mine                           mine a block
  chain                          show the dashboard
  tx <sender> <recipient> <amt>  submit a transaction
  tx                             resubmit the last transaction that did not go through
  help                           this text
  quit                           leave the console";

#[derive(Debug, Clone, PartialEq)]
enum ConsoleCommand {
    Status,
    Nodes,
    Switch(String),
    Add(String),
    Refresh,
    Sync,
    Mine,
    Chain,
    Tx {
        sender: String,
        recipient: String,
        amount: String,
    },
    RetryTx,
    Help,
    Quit,
    Empty,
}

fn parse_line(line: &str) -> Result<ConsoleCommand, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, args)) = words.split_first() else {
        return Ok(ConsoleCommand::Empty);
    };

    let command = match (head.to_ascii_lowercase().as_str(), args) {
        ("status", []) => ConsoleCommand::Status,
        ("nodes", []) => ConsoleCommand::Nodes,
        ("switch", [url]) => ConsoleCommand::Switch(url.to_string()),
        ("add", [url]) => ConsoleCommand::Add(url.to_string()),
        ("refresh", []) => ConsoleCommand::Refresh,
        ("sync", []) => ConsoleCommand::Sync,
        ("mine", []) => ConsoleCommand::Mine,
        ("chain", []) => ConsoleCommand::Chain,
        ("tx", [sender, recipient, amount]) => ConsoleCommand::Tx {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            amount: amount.to_string(),
        },
        ("tx", []) => ConsoleCommand::RetryTx,
        ("help", _) | ("?", _) => ConsoleCommand::Help,
        ("quit", []) | ("exit", []) => ConsoleCommand::Quit,
        ("switch", _) | ("add", _) => return Err(format!("usage: {} <url>", head)),
        ("tx", _) => return Err("usage: tx <sender> <recipient> <amount>".to_string()),
        (
            name @ ("status" | "nodes" | "refresh" | "sync" | "mine" | "chain" | "quit" | "exit"),
            _,
        ) => return Err(format!("'{}' takes no arguments", name)),
        (other, _) => return Err(format!("unknown command '{}' (try 'help')", other)),
    };
    Ok(command)
}

pub async fn run(controller: &SyncController) -> Result<(), Box<dyn std::error::Error>> {
    print_info(&format!(
        "Connecting to {}...",
        controller.get_active_endpoint().address
    ));
    let printer = spawn_printer(controller.clone());
    controller.start().await;
    print_peers(&controller.list_known_endpoints());
    print_info("Type 'help' for commands.");

    let mut draft = TransactionForm::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match parse_line(&line) {
            Ok(ConsoleCommand::Quit) => break,
            Ok(command) => execute(command, controller, &mut draft).await,
            Err(msg) => print_error(&msg),
        }
    }

    controller.shutdown();
    printer.abort();
    println!();
    print_info("Session closed.");
    Ok(())
}

fn prompt() {
    print!("{} ", "lnc>".cyan().bold());
    let _ = std::io::stdout().flush();
}

/// `draft` is the transaction being entered. It is cleared only once the
/// node accepts it, so a failed submission can be retried with `tx`.
async fn execute(
    command: ConsoleCommand,
    controller: &SyncController,
    draft: &mut TransactionForm,
) {
    match command {
        ConsoleCommand::Status => {
            let active = controller.get_active_endpoint();
            println!("{} {} ({})", "Active:".bold(), active.address, active.label);
            println!(
                "{} {}",
                "Known nodes:".bold(),
                controller.list_known_endpoints().len()
            );
            println!(
                "{} {}",
                "Peer refresh:".bold(),
                if controller.is_running() {
                    "running".green()
                } else {
                    "stopped".red()
                }
            );
        }
        ConsoleCommand::Nodes => print_peers(&controller.list_known_endpoints()),
        ConsoleCommand::Switch(url) => {
            if let Some(address) = parse_address(&url) {
                controller.switch_active(address).await;
            }
        }
        ConsoleCommand::Add(url) => {
            if let Some(address) = parse_address(&url) {
                controller.add_peer(address).await;
            }
        }
        ConsoleCommand::Refresh => match controller.refresh_now().await {
            ActionOutcome::Completed(added) => {
                print_info(&format!("{} new node(s) discovered", added))
            }
            ActionOutcome::Failed(e) => print_error(&format!("Refresh failed: {}", e)),
            ActionOutcome::Discarded => {}
        },
        ConsoleCommand::Sync => {
            controller.resolve_conflicts_now().await;
        }
        ConsoleCommand::Mine => {
            controller.mine_block().await;
        }
        ConsoleCommand::Chain => {
            if let ActionOutcome::Completed(snapshot) = controller.refresh_dashboard().await {
                print_dashboard(&snapshot);
            }
        }
        ConsoleCommand::Tx {
            sender,
            recipient,
            amount,
        } => {
            *draft = TransactionForm::new(&sender, &recipient, &amount);
            submit_draft(controller, draft).await;
        }
        ConsoleCommand::RetryTx => {
            if draft.is_empty() {
                print_error("No pending transaction (usage: tx <sender> <recipient> <amount>)");
            } else {
                submit_draft(controller, draft).await;
            }
        }
        ConsoleCommand::Help => println!("{}", HELP),
        ConsoleCommand::Quit | ConsoleCommand::Empty => {}
    }
}

async fn submit_draft(controller: &SyncController, draft: &mut TransactionForm) {
    let request = match draft.validate() {
        Ok(request) => request,
        Err(e) => {
            print_error(&format!("Invalid transaction: {}", e));
            return;
        }
    };
    if controller.submit_transaction(&request).await.is_completed() {
        draft.clear();
    }
}

/// Print notifications for the whole session and reload the dashboard when
/// the chain changed underneath it.
fn spawn_printer(controller: SyncController) -> JoinHandle<()> {
    let mut events = controller.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SyncEvent::Notify(note)) => print_notification(&note),
                Ok(SyncEvent::DashboardStale) => {
                    if let ActionOutcome::Completed(snapshot) = controller.refresh_dashboard().await
                    {
                        print_dashboard(&snapshot);
                    }
                }
                Ok(SyncEvent::PeersRefreshed { known, added }) => {
                    if added > 0 {
                        print_info(&format!("{} new node(s), {} known", added, known));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("console fell behind, {} event(s) skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

use super::flush_notifications;
use crate::{print_error, print_info, TxCommands};
use colored::*;
use lnc_core::TransactionForm;
use lnc_network::SyncController;

pub async fn handle(
    action: TxCommands,
    controller: &SyncController,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TxCommands::Send {
            sender,
            recipient,
            amount,
        } => send(TransactionForm::new(&sender, &recipient, &amount), controller).await,
    }
}

/// Validate locally, then submit. Both kinds of failure are printed, not
/// returned.
pub async fn send(
    form: TransactionForm,
    controller: &SyncController,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = match form.validate() {
        Ok(request) => request,
        Err(e) => {
            print_error(&format!("Invalid transaction: {}", e));
            return Ok(());
        }
    };

    print_info(&format!(
        "Submitting {} → {} ({}) to {}...",
        request.sender.bold(),
        request.recipient.bold(),
        request.amount,
        controller.get_active_endpoint().address
    ));
    let mut events = controller.subscribe();
    controller.submit_transaction(&request).await;
    flush_notifications(&mut events);
    Ok(())
}

//! Transfer command - send money from one of your accounts

use anyhow::{anyhow, Result};
use colored::Colorize;

use bankline_core::services::{TransferReceipt, TransferRequest};
use bankline_core::{Amount, OperationResult, TransactionType};

use super::{format_money, get_context, parse_id};
use crate::output;

pub struct TransferArgs {
    pub from: String,
    pub to: Option<String>,
    pub amount: String,
    pub kind: String,
    pub description: Option<String>,
    pub recipient: Option<String>,
    pub json: bool,
}

pub fn run(args: TransferArgs) -> Result<()> {
    let from_account_id = parse_id(&args.from, "account")?;
    let amount: Amount = args.amount.parse()?;
    let kind = TransactionType::parse(&args.kind.to_lowercase())
        .filter(TransactionType::is_customer_transfer)
        .ok_or_else(|| anyhow!("Transfer type must be internal, external or wire"))?;

    let ctx = get_context()?;
    let result = ctx.ledger_service.transfer(TransferRequest {
        from_account_id,
        to_account_number: args.to,
        amount,
        kind,
        description: args.description,
        recipient_name: args.recipient,
    });

    if args.json {
        // Failures are reported in the envelope too, with their error code
        let failed = result.is_err();
        let envelope: OperationResult<TransferReceipt> = result.into();
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        if failed {
            return Err(anyhow!("Transfer failed"));
        }
        return Ok(());
    }
    let receipt = result?;

    output::success(&format!("Sent {} via {}", format_money(amount.value()), kind.as_str()));
    match &receipt.destination {
        Some(dest) => println!(
            "  To: {} {}",
            dest.name,
            dest.masked_number().dimmed()
        ),
        None => println!(
            "  To: {}",
            receipt.transaction.recipient_name.as_deref().unwrap_or("External")
        ),
    }
    println!("  New balance: {}", format_money(receipt.source.balance));
    println!("  {}", format!("Transaction {}", receipt.transaction.id).dimmed());
    Ok(())
}

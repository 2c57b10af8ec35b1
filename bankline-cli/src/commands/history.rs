//! History command - a user's transactions, newest first

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use bankline_core::Transaction;

use super::{format_money, get_context, parse_id};
use crate::output;

/// One row of the CSV statement
#[derive(Debug, Serialize)]
struct StatementRow<'a> {
    date: String,
    id: String,
    #[serde(rename = "type")]
    kind: &'a str,
    description: &'a str,
    counterparty: String,
    amount: String,
}

pub fn run(user_id: &str, limit: Option<usize>, csv_path: Option<PathBuf>, json: bool) -> Result<()> {
    let user_id = parse_id(user_id, "user")?;
    let ctx = get_context()?;
    let mut transactions = ctx.ledger_service.transactions_for_user(user_id)?;
    if let Some(limit) = limit {
        transactions.truncate(limit);
    }

    if let Some(path) = csv_path {
        write_statement(&path, user_id, &transactions)?;
        output::success(&format!(
            "Wrote {} transactions to {}",
            transactions.len(),
            path.display()
        ));
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&transactions)?);
        return Ok(());
    }

    if transactions.is_empty() {
        println!("No transactions found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Date", "Type", "Description", "Counterparty", "Amount"]);
    for tx in &transactions {
        table.add_row(vec![
            tx.effective_at.format("%Y-%m-%d %H:%M").to_string(),
            tx.kind.as_str().to_string(),
            tx.description.clone(),
            counterparty_label(tx, user_id),
            format_money(tx.signed_amount_for(user_id)),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn counterparty_label(tx: &Transaction, user_id: uuid::Uuid) -> String {
    if let Some(name) = &tx.recipient_name {
        return name.clone();
    }
    let other = if tx.from_user_id() == Some(user_id) { &tx.to } else { &tx.from };
    match other.account_id() {
        Some(id) => format!("account {}", &id.to_string()[..8]),
        None => other.kind_str().to_string(),
    }
}

fn write_statement(path: &PathBuf, user_id: uuid::Uuid, transactions: &[Transaction]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for tx in transactions {
        writer.serialize(StatementRow {
            date: tx.effective_at.to_rfc3339(),
            id: tx.id.to_string(),
            kind: tx.kind.as_str(),
            description: &tx.description,
            counterparty: counterparty_label(tx, user_id),
            amount: tx.signed_amount_for(user_id).to_string(),
        })?;
    }
    writer.flush()?;
    Ok(())
}

//! Admin command - privileged balance adjustments and bank-wide views

use anyhow::{anyhow, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use bankline_core::services::{AdjustmentReceipt, Direction};
use bankline_core::{Amount, BanklineContext};

use super::{format_money, get_context};
use crate::output;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Credit an account as a bank deposit
    Fund {
        /// Account number (10 digits)
        account_number: String,
        /// Amount, e.g. 250 or 19.99
        amount: String,
        /// Description shown on the statement
        #[arg(long)]
        description: Option<String>,
        /// Effective date (YYYY-MM-DD, YYYY-MM-DDTHH:MM or RFC 3339)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Debit an account as a service charge
    Debit {
        account_number: String,
        amount: String,
        /// Note shown on the statement
        #[arg(long)]
        note: Option<String>,
        #[arg(long)]
        date: Option<String>,
        /// Skip the overdraft confirmation
        #[arg(long, short = 'f')]
        force: bool,
        #[arg(long)]
        json: bool,
    },
    /// Post a card-style deposit or withdrawal
    Transaction {
        account_number: String,
        amount: String,
        /// credit or debit
        #[arg(long = "type")]
        direction: String,
        /// Merchant name
        #[arg(long)]
        merchant: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[arg(long, short = 'f')]
        force: bool,
        #[arg(long)]
        json: bool,
    },
    /// Total balance and counts across the bank
    Summary {
        #[arg(long)]
        json: bool,
    },
    /// Every account with its holder
    Accounts {
        #[arg(long)]
        json: bool,
    },
    /// Every registered user
    Users {
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: AdminCommands) -> Result<()> {
    let ctx = get_context()?;
    match command {
        AdminCommands::Fund {
            account_number,
            amount,
            description,
            date,
            json,
        } => {
            let amount: Amount = amount.parse()?;
            let receipt = ctx.admin_service.fund_account(
                &account_number,
                amount,
                description.as_deref(),
                date.as_deref(),
            )?;
            print_receipt(&receipt, json)?;
        }
        AdminCommands::Debit {
            account_number,
            amount,
            note,
            date,
            force,
            json,
        } => {
            let amount: Amount = amount.parse()?;
            if !force && !json && !confirm_overdraft(&ctx, &account_number, amount)? {
                println!("{}", "Cancelled".dimmed());
                return Ok(());
            }
            let receipt = ctx.admin_service.debit_account(
                &account_number,
                amount,
                note.as_deref(),
                date.as_deref(),
            )?;
            print_receipt(&receipt, json)?;
        }
        AdminCommands::Transaction {
            account_number,
            amount,
            direction,
            merchant,
            date,
            force,
            json,
        } => {
            let amount: Amount = amount.parse()?;
            let direction = Direction::parse(&direction)
                .ok_or_else(|| anyhow!("--type must be credit or debit"))?;
            if direction == Direction::Debit
                && !force
                && !json
                && !confirm_overdraft(&ctx, &account_number, amount)?
            {
                println!("{}", "Cancelled".dimmed());
                return Ok(());
            }
            let receipt = ctx.admin_service.custom_transaction(
                &account_number,
                amount,
                direction,
                merchant.as_deref(),
                date.as_deref(),
            )?;
            print_receipt(&receipt, json)?;
        }
        AdminCommands::Summary { json } => {
            let summary = ctx.admin_service.accounts_summary()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }
            println!("{}", "Bank Summary".bold());
            let mut table = output::create_table();
            table.add_row(vec!["Users".to_string(), summary.user_count.to_string()]);
            table.add_row(vec!["Accounts".to_string(), summary.account_count.to_string()]);
            table.add_row(vec!["Total balance".to_string(), format_money(summary.total_balance)]);
            println!("{}", table);
        }
        AdminCommands::Accounts { json } => {
            let accounts = ctx.admin_service.list_accounts()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&accounts)?);
                return Ok(());
            }
            let mut table = output::create_table();
            table.set_header(vec!["Holder", "Account", "Number", "Balance", "Status"]);
            for entry in accounts {
                table.add_row(vec![
                    entry.holder_name.unwrap_or_else(|| "-".to_string()),
                    entry.account.name,
                    entry.account.account_number,
                    format_money(entry.account.balance),
                    entry.account.status.as_str().to_string(),
                ]);
            }
            println!("{}", table);
        }
        AdminCommands::Users { json } => {
            let users = ctx.user_service.list_users()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&users)?);
                return Ok(());
            }
            let mut table = output::create_table();
            table.set_header(vec!["Name", "Email", "Status", "Registered"]);
            for user in users {
                table.add_row(vec![
                    user.display_name(),
                    user.email,
                    user.status.as_str().to_string(),
                    user.created_at.format("%Y-%m-%d").to_string(),
                ]);
            }
            println!("{}", table);
        }
    }
    Ok(())
}

/// Ask before a debit that would leave the account negative
fn confirm_overdraft(ctx: &BanklineContext, account_number: &str, amount: Amount) -> Result<bool> {
    let Some(account) = ctx.repository.get_account_by_number(account_number.trim())? else {
        // Let the service report the missing account
        return Ok(true);
    };
    let after = account.balance - amount.value();
    if !after.is_sign_negative() || after.is_zero() {
        return Ok(true);
    }

    output::warning(&format!(
        "This will overdraw {} {}: {} -> {}",
        account.name,
        account.masked_number(),
        format_money(account.balance),
        format_money(after)
    ));
    Ok(Confirm::new()
        .with_prompt("Continue?")
        .default(false)
        .interact()?)
}

fn print_receipt(receipt: &AdjustmentReceipt, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(receipt)?);
        return Ok(());
    }
    let tx = &receipt.transaction;
    output::success(&format!(
        "{} {} on {}",
        tx.kind.as_str(),
        format_money(tx.amount),
        receipt.account.masked_number()
    ));
    println!("  Description: {}", tx.description);
    println!("  Effective:   {}", tx.effective_at.to_rfc3339());
    println!("  New balance: {}", format_money(receipt.account.balance));
    Ok(())
}

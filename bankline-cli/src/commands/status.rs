//! Status command - store-wide summary

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use super::{format_money, get_bankline_dir, get_context};

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let status = ctx.status_service.get_status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Bankline Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.add_row(vec!["Users".to_string(), status.total_users.to_string()]);
    table.add_row(vec!["Accounts".to_string(), status.total_accounts.to_string()]);
    table.add_row(vec!["Transactions".to_string(), status.total_transactions.to_string()]);
    table.add_row(vec!["Notifications".to_string(), status.total_notifications.to_string()]);
    table.add_row(vec!["Total balance".to_string(), format_money(status.total_balance)]);
    println!("{}", table);
    println!();

    println!("Data directory: {}", get_bankline_dir()?.display());
    println!("Date mode: {}", ctx.config.date_mode.as_str());
    Ok(())
}

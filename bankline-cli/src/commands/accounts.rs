//! Accounts command - list a user's accounts

use anyhow::Result;
use colored::Colorize;

use super::{format_money, get_context, parse_id};
use crate::output;

pub fn run(user_id: &str, json: bool) -> Result<()> {
    let user_id = parse_id(user_id, "user")?;
    let ctx = get_context()?;
    let user = ctx.user_service.get_user(user_id)?;
    let accounts = ctx.user_service.accounts_for_user(user_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&accounts)?);
        return Ok(());
    }

    println!("{}", format!("Accounts for {}", user.display_name()).bold());
    let mut table = output::create_table();
    table.set_header(vec!["Name", "Number", "Balance", "Status", "ID"]);
    for account in &accounts {
        let balance = format_money(account.balance);
        let balance = if account.balance.is_sign_negative() {
            balance.red().to_string()
        } else {
            balance
        };
        table.add_row(vec![
            account.name.clone(),
            account.account_number.clone(),
            balance,
            account.status.as_str().to_string(),
            account.id.to_string(),
        ]);
    }
    println!("{}", table);
    Ok(())
}

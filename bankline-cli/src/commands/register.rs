//! Register command - create a user with Checking and Savings accounts

use anyhow::Result;
use colored::Colorize;
use dialoguer::Password;

use bankline_core::services::RegisterRequest;

use super::get_context;
use crate::output;

pub struct RegisterArgs {
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub password: Option<String>,
    pub json: bool,
}

pub fn run(args: RegisterArgs) -> Result<()> {
    let password = match args.password {
        Some(p) => p,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()?,
    };

    let ctx = get_context()?;
    let registration = ctx.user_service.register(RegisterRequest {
        first_name: args.first_name,
        last_name: args.last_name,
        email: args.email,
        phone: args.phone,
        password,
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&registration)?);
        return Ok(());
    }

    output::success(&format!("Registered user {}", registration.user_id));
    let mut table = output::create_table();
    table.set_header(vec!["Account", "Number", "ID"]);
    for account in &registration.accounts {
        table.add_row(vec![
            account.name.clone(),
            account.account_number.clone(),
            account.id.to_string(),
        ]);
    }
    println!("{}", table);
    println!("{}", "Both accounts start with a zero balance.".dimmed());
    Ok(())
}

//! Verify command - confirm who owns an account number

use anyhow::Result;

use super::get_context;
use crate::output;

pub fn run(account_number: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let verification = ctx.user_service.verify_account(account_number)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&verification)?);
    } else {
        output::info(&format!(
            "{} belongs to {} ({})",
            verification.account_number, verification.user_name, verification.account_name
        ));
    }
    Ok(())
}

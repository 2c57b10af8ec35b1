//! CLI command implementations

pub mod accounts;
pub mod admin;
pub mod history;
pub mod logs;
pub mod notifications;
pub mod register;
pub mod serve;
pub mod status;
pub mod transfer;
pub mod verify;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use uuid::Uuid;

use bankline_core::{BanklineContext, EntryPoint, LogEvent, LoggingService};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let bankline_dir = get_bankline_dir().ok()?;
    std::fs::create_dir_all(&bankline_dir).ok()?;
    LoggingService::new(&bankline_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Data directory from `BANKLINE_DIR`, else `~/.bankline`
pub fn get_bankline_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("BANKLINE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".bankline"))
        .ok_or_else(|| anyhow!("Could not find home directory; set BANKLINE_DIR"))
}

pub fn get_context() -> Result<BanklineContext> {
    let bankline_dir = get_bankline_dir()?;
    BanklineContext::new(&bankline_dir).context("Failed to initialize bankline context")
}

pub fn parse_id(raw: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).with_context(|| format!("Invalid {} id: {}", what, raw))
}

/// `$1,234.56` style, with the sign in front of the dollar sign
pub fn format_money(value: rust_decimal::Decimal) -> String {
    let rounded = value.round_dp(2);
    let (sign, abs) = if rounded.is_sign_negative() && !rounded.is_zero() {
        ("-", rounded.abs())
    } else {
        ("", rounded)
    };
    let text = format!("{:.2}", abs);
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let mut grouped = String::new();
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}${}.{}", sign, grouped, cents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(Decimal::new(123_456, 2)), "$1,234.56");
        assert_eq!(format_money(Decimal::new(-3_000, 2)), "-$30.00");
        assert_eq!(format_money(Decimal::ZERO), "$0.00");
        assert_eq!(format_money(Decimal::new(100_000_000, 2)), "$1,000,000.00");
    }
}

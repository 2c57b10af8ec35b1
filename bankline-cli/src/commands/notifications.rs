//! Notifications command - list, count and mark notifications read

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use bankline_core::NotificationCategory;

use super::{get_context, parse_id};
use crate::output;

#[derive(Subcommand)]
pub enum NotificationsCommands {
    /// List a user's notifications, newest first
    List {
        /// User ID
        user_id: String,
        /// Show only unread notifications
        #[arg(long)]
        unread: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a notification as read
    Read {
        /// Notification ID
        notification_id: String,
    },
    /// Count unread notifications
    Unread {
        /// User ID
        user_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: NotificationsCommands) -> Result<()> {
    let ctx = get_context()?;
    match command {
        NotificationsCommands::List { user_id, unread, json } => {
            let user_id = parse_id(&user_id, "user")?;
            let mut notifications = ctx.notification_service.list_for_user(user_id)?;
            if unread {
                notifications.retain(|n| !n.is_read);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&notifications)?);
                return Ok(());
            }
            if notifications.is_empty() {
                println!("No notifications.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["", "Date", "Title", "Message", "ID"]);
            for n in notifications {
                let marker = if n.is_read { String::new() } else { "●".cyan().to_string() };
                let title = match n.category {
                    NotificationCategory::Credit => n.title.green().to_string(),
                    NotificationCategory::Debit => n.title.yellow().to_string(),
                };
                table.add_row(vec![
                    marker,
                    n.effective_at.format("%Y-%m-%d %H:%M").to_string(),
                    title,
                    n.message,
                    n.id.to_string(),
                ]);
            }
            println!("{}", table);
        }
        NotificationsCommands::Read { notification_id } => {
            let id = parse_id(&notification_id, "notification")?;
            ctx.notification_service.mark_read(id)?;
            output::success("Marked as read");
        }
        NotificationsCommands::Unread { user_id, json } => {
            let user_id = parse_id(&user_id, "user")?;
            let count = ctx.notification_service.unread_count(user_id)?;
            if json {
                println!("{}", serde_json::json!({ "unreadCount": count }));
            } else {
                println!("{} unread", count);
            }
        }
    }
    Ok(())
}

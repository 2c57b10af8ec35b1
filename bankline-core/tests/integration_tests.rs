//! Integration tests for bankline-core services
//!
//! End-to-end ledger scenarios against a real DuckDB file.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;

use bankline_core::config::Config;
use bankline_core::domain::{Account, Amount, Counterparty, NotificationCategory, TransactionType};
use bankline_core::services::{RegisterRequest, TransferRequest};
use bankline_core::{BanklineContext, Error};

// ============================================================================
// Test Helpers
// ============================================================================

fn create_context(temp_dir: &TempDir) -> BanklineContext {
    BanklineContext::new(temp_dir.path()).expect("Failed to create context")
}

/// Register a user and return their Checking account
fn register(ctx: &BanklineContext, first_name: &str) -> Account {
    let registration = ctx
        .user_service
        .register(RegisterRequest {
            first_name: first_name.to_string(),
            last_name: None,
            email: format!("{}@example.com", first_name.to_lowercase()),
            phone: None,
            password: "password123".to_string(),
        })
        .expect("Failed to register");
    registration.accounts.into_iter().next().unwrap()
}

fn dollars(n: i64) -> Amount {
    Amount::from_cents(n * 100).unwrap()
}

fn fund(ctx: &BanklineContext, account: &Account, amount: i64) {
    ctx.admin_service
        .fund_account(&account.account_number, dollars(amount), None, None)
        .expect("Failed to fund");
}

fn balance(ctx: &BanklineContext, account: &Account) -> Decimal {
    ctx.repository
        .get_account(account.id)
        .unwrap()
        .expect("account vanished")
        .balance
}

fn transfer(
    from: &Account,
    to_number: Option<&str>,
    amount: i64,
    kind: TransactionType,
) -> TransferRequest {
    TransferRequest {
        from_account_id: from.id,
        to_account_number: to_number.map(str::to_string),
        amount: dollars(amount),
        kind,
        description: None,
        recipient_name: None,
    }
}

// ============================================================================
// Transfers
// ============================================================================

#[test]
fn test_internal_transfer_moves_money_between_users() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let a = register(&ctx, "Alice");
    let b = register(&ctx, "Bob");
    fund(&ctx, &a, 100);

    let receipt = ctx
        .ledger_service
        .transfer(transfer(&a, Some(&b.account_number), 40, TransactionType::Internal))
        .unwrap();

    assert_eq!(balance(&ctx, &a), Decimal::new(6000, 2));
    assert_eq!(balance(&ctx, &b), Decimal::new(4000, 2));
    assert_eq!(receipt.transaction.kind, TransactionType::Internal);
    assert_eq!(receipt.transaction.recipient_name, None);
    assert_eq!(receipt.notifications.len(), 2);

    let sent = &receipt.notifications[0];
    assert_eq!(sent.user_id, a.user_id);
    assert_eq!(sent.title, "Money Sent");
    assert_eq!(sent.message, "You sent $40.00 via internal");
    assert_eq!(sent.category, NotificationCategory::Debit);

    let received = &receipt.notifications[1];
    assert_eq!(received.user_id, b.user_id);
    assert_eq!(received.title, "Money Received");
    assert_eq!(received.message, "You received $40.00");
    assert_eq!(received.transaction_id, Some(receipt.transaction.id));

    // Both users see the transfer in their history
    let a_history = ctx.ledger_service.transactions_for_user(a.user_id).unwrap();
    let b_history = ctx.ledger_service.transactions_for_user(b.user_id).unwrap();
    assert!(a_history.iter().any(|t| t.id == receipt.transaction.id));
    assert!(b_history.iter().any(|t| t.id == receipt.transaction.id));
}

#[test]
fn test_internal_transfer_conserves_total_balance() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let a = register(&ctx, "Alice");
    let b = register(&ctx, "Bob");
    fund(&ctx, &a, 250);
    let before = ctx.repository.total_balance().unwrap();

    ctx.ledger_service
        .transfer(transfer(&a, Some(&b.account_number), 99, TransactionType::Internal))
        .unwrap();

    assert_eq!(ctx.repository.total_balance().unwrap(), before);
}

#[test]
fn test_external_transfer_only_debits_source() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let a = register(&ctx, "Alice");
    fund(&ctx, &a, 100);
    let before = ctx.repository.total_balance().unwrap();

    let mut request = transfer(&a, Some("4000000001"), 30, TransactionType::External);
    request.recipient_name = Some("Landlord".to_string());
    request.description = Some("Rent".to_string());
    let receipt = ctx.ledger_service.transfer(request).unwrap();

    assert_eq!(balance(&ctx, &a), Decimal::new(7000, 2));
    assert_eq!(
        ctx.repository.total_balance().unwrap(),
        before - Decimal::new(3000, 2)
    );
    assert_eq!(
        receipt.transaction.to,
        Counterparty::External {
            name: "Landlord".to_string()
        }
    );
    assert_eq!(receipt.transaction.recipient_name.as_deref(), Some("Landlord"));
    assert_eq!(receipt.transaction.description, "Rent");
    assert_eq!(receipt.notifications.len(), 1);
}

#[test]
fn test_wire_to_own_bank_credits_destination() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let a = register(&ctx, "Alice");
    let b = register(&ctx, "Bob");
    fund(&ctx, &a, 100);

    let receipt = ctx
        .ledger_service
        .transfer(transfer(&a, Some(&b.account_number), 10, TransactionType::Wire))
        .unwrap();

    assert_eq!(balance(&ctx, &b), Decimal::new(1000, 2));
    assert_eq!(receipt.notifications.len(), 2);
    assert_eq!(receipt.notifications[0].message, "You sent $10.00 via wire");
}

#[test]
fn test_insufficient_funds_changes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let a = register(&ctx, "Alice");
    let b = register(&ctx, "Bob");
    fund(&ctx, &a, 20);
    let tx_before = ctx.repository.get_counts().unwrap().transactions;
    let notif_before = ctx.repository.get_counts().unwrap().notifications;

    let err = ctx
        .ledger_service
        .transfer(transfer(&a, Some(&b.account_number), 21, TransactionType::Internal))
        .unwrap_err();

    match err {
        Error::InsufficientFunds {
            requested,
            available,
        } => {
            assert_eq!(requested, Decimal::new(2100, 2));
            assert_eq!(available, Decimal::new(2000, 2));
        }
        other => panic!("expected InsufficientFunds, got {:?}", other),
    }
    assert_eq!(balance(&ctx, &a), Decimal::new(2000, 2));
    assert_eq!(balance(&ctx, &b), Decimal::ZERO);
    let counts = ctx.repository.get_counts().unwrap();
    assert_eq!(counts.transactions, tx_before);
    assert_eq!(counts.notifications, notif_before);
}

#[test]
fn test_history_is_newest_first() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let a = register(&ctx, "Alice");

    ctx.admin_service
        .fund_account(&a.account_number, dollars(10), None, Some("2024-01-01"))
        .unwrap();
    ctx.admin_service
        .fund_account(&a.account_number, dollars(20), None, Some("2024-03-01"))
        .unwrap();
    ctx.admin_service
        .fund_account(&a.account_number, dollars(30), None, Some("2024-02-01"))
        .unwrap();

    let history = ctx.ledger_service.transactions_for_user(a.user_id).unwrap();
    let amounts: Vec<Decimal> = history.iter().map(|t| t.amount).collect();
    assert_eq!(
        amounts,
        vec![
            Decimal::new(2000, 2),
            Decimal::new(3000, 2),
            Decimal::new(1000, 2)
        ]
    );
}

// ============================================================================
// Admin Override Path
// ============================================================================

#[test]
fn test_back_dated_funding() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let x = register(&ctx, "Xavier");

    let receipt = ctx
        .admin_service
        .fund_account(&x.account_number, dollars(500), None, Some("2024-01-15"))
        .unwrap();

    let expected = Utc.with_ymd_and_hms(2024, 1, 15, 20, 0, 0).unwrap();
    assert_eq!(balance(&ctx, &x), Decimal::new(50_000, 2));
    assert_eq!(receipt.transaction.kind, TransactionType::AdminFunding);
    assert_eq!(receipt.transaction.effective_at, expected);
    assert_eq!(receipt.transaction.recipient_name.as_deref(), Some("Bankline"));

    let notifications = ctx.notification_service.list_for_user(x.user_id).unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].category, NotificationCategory::Credit);
    assert_eq!(notifications[0].effective_at, expected);
    assert_eq!(notifications[0].message, "Deposit: $500.00");
}

#[test]
fn test_admin_debit_beyond_balance_goes_negative() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let a = register(&ctx, "Alice");
    fund(&ctx, &a, 10);

    ctx.admin_service
        .debit_account(&a.account_number, dollars(25), None, Some("2024-03-01T02:00"))
        .unwrap();

    let stored = ctx.repository.get_account(a.id).unwrap().unwrap();
    assert_eq!(stored.balance, Decimal::new(-1500, 2));
    assert_eq!(stored.available_balance, stored.balance);

    let history = ctx.ledger_service.transactions_for_user(a.user_id).unwrap();
    let debit = history
        .iter()
        .find(|t| t.kind == TransactionType::AdminDebit)
        .unwrap();
    assert_eq!(
        debit.effective_at,
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    );
}

#[test]
fn test_customer_cannot_overdraw_after_admin_debit() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(&temp_dir);
    let a = register(&ctx, "Alice");
    ctx.admin_service
        .debit_account(&a.account_number, dollars(5), None, None)
        .unwrap();

    let err = ctx
        .ledger_service
        .transfer(transfer(&a, None, 1, TransactionType::External))
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientFunds { .. }));
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_state_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let a = {
        let ctx = create_context(&temp_dir);
        let a = register(&ctx, "Alice");
        fund(&ctx, &a, 42);
        a
    };

    let ctx = create_context(&temp_dir);
    assert_eq!(balance(&ctx, &a), Decimal::new(4200, 2));
    assert_eq!(ctx.user_service.login("alice@example.com", "password123").unwrap(), a.user_id);
    assert_eq!(ctx.notification_service.unread_count(a.user_id).unwrap(), 1);

    let status = ctx.status_service.get_status().unwrap();
    assert_eq!(status.total_users, 1);
    assert_eq!(status.total_accounts, 2);
    assert_eq!(status.total_transactions, 1);
    assert_eq!(status.total_balance, Decimal::new(4200, 2));
}

#[test]
fn test_utc_date_mode_from_settings() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("settings.json"),
        r#"{"app": {"dateMode": "utc", "bankName": "Test Bank"}}"#,
    )
    .unwrap();
    let config = Config::load(temp_dir.path()).unwrap();
    assert_eq!(config.bank_name, "Test Bank");

    let ctx = create_context(&temp_dir);
    let a = register(&ctx, "Alice");
    let receipt = ctx
        .admin_service
        .fund_account(&a.account_number, dollars(1), None, Some("2024-01-15"))
        .unwrap();

    assert_eq!(
        receipt.transaction.effective_at,
        Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
    );
    assert_eq!(receipt.transaction.recipient_name.as_deref(), Some("Test Bank"));
}

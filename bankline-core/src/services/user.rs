//! Users - registration, login and account lookup

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::{Error, Result};
use crate::domain::{Account, User};
use crate::ports::LedgerStore;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const MIN_PASSWORD_LEN: usize = 8;
const DEFAULT_ACCOUNTS: [&str; 2] = ["Checking", "Savings"];

/// Attempts at drawing an unused account number before giving up
const NUMBER_ATTEMPTS: usize = 16;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub user_id: Uuid,
    pub accounts: Vec<Account>,
}

/// What a sender sees before confirming a transfer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountVerification {
    pub account_number: String,
    pub account_name: String,
    pub user_name: String,
}

pub struct UserService {
    repository: Arc<DuckDbRepository>,
}

impl UserService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Create a user with a Checking and a Savings account
    pub fn register(&self, request: RegisterRequest) -> Result<Registration> {
        let first_name = request.first_name.trim();
        if first_name.is_empty() {
            return Err(Error::invalid_input("first name is required"));
        }
        let email = User::normalize_email(&request.email);
        let email_re = Regex::new(EMAIL_PATTERN).map_err(|e| Error::store(e.to_string()))?;
        if !email_re.is_match(&email) {
            return Err(Error::invalid_input("email address is not valid"));
        }
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::invalid_input(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let mut user = User::new(first_name, &email, hash_password(&request.password)?);
        user.last_name = request
            .last_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        user.phone = request
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        let registration = self.repository.write(|store| {
            if store.find_user_by_email(&user.email)?.is_some() {
                return Err(Error::Conflict("email is already registered".to_string()));
            }
            store.insert_user(&user)?;

            let mut accounts = Vec::with_capacity(DEFAULT_ACCOUNTS.len());
            for name in DEFAULT_ACCOUNTS {
                let mut account = Account::open(user.id, name);
                account.account_number = unused_account_number(store)?;
                store.insert_account(&account)?;
                accounts.push(account);
            }
            Ok(Registration {
                user_id: user.id,
                accounts,
            })
        })?;

        tracing::info!(user_id = %registration.user_id, "user registered");
        Ok(registration)
    }

    /// Returns the user id when the password matches
    pub fn login(&self, email: &str, password: &str) -> Result<Uuid> {
        let user = self
            .repository
            .get_user_by_email(email)?
            .ok_or(Error::InvalidCredentials)?;
        let parsed =
            PasswordHash::new(&user.password_hash).map_err(|_| Error::InvalidCredentials)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| Error::InvalidCredentials)?;
        Ok(user.id)
    }

    pub fn get_user(&self, user_id: Uuid) -> Result<User> {
        self.repository
            .get_user(user_id)?
            .ok_or_else(|| Error::not_found(format!("user {}", user_id)))
    }

    /// Every registered user, oldest first (admin panel)
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.repository.get_users()
    }

    pub fn accounts_for_user(&self, user_id: Uuid) -> Result<Vec<Account>> {
        self.repository.get_accounts_for_user(user_id)
    }

    pub fn verify_account(&self, account_number: &str) -> Result<AccountVerification> {
        let number = account_number.trim();
        if !Account::is_valid_number(number) {
            return Err(Error::invalid_input("account number must be 10 digits"));
        }
        let account = self
            .repository
            .get_account_by_number(number)?
            .ok_or_else(|| Error::not_found(format!("account number {}", number)))?;
        let holder = self
            .repository
            .get_user(account.user_id)?
            .ok_or_else(|| Error::not_found(format!("user {}", account.user_id)))?;
        Ok(AccountVerification {
            account_number: account.account_number,
            account_name: account.name,
            user_name: holder.first_name,
        })
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::store(format!("password hashing failed: {}", e)))
}

fn unused_account_number(store: &dyn LedgerStore) -> Result<String> {
    for _ in 0..NUMBER_ATTEMPTS {
        let candidate = Account::generate_number();
        if store.find_account_by_number(&candidate)?.is_none() {
            return Ok(candidate);
        }
    }
    Err(Error::Conflict("could not allocate an account number".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn service() -> UserService {
        let repo = Arc::new(DuckDbRepository::open_in_memory().unwrap());
        repo.ensure_schema().unwrap();
        UserService::new(repo)
    }

    fn request(email: &str) -> RegisterRequest {
        RegisterRequest {
            first_name: "Ada".to_string(),
            last_name: Some("Lovelace".to_string()),
            email: email.to_string(),
            phone: None,
            password: "correct horse".to_string(),
        }
    }

    #[test]
    fn test_register_opens_two_empty_accounts() {
        let users = service();
        let registration = users.register(request("ada@example.com")).unwrap();

        let names: Vec<_> = registration.accounts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["Checking", "Savings"]);
        for account in &registration.accounts {
            assert_eq!(account.balance, Decimal::ZERO);
            assert!(Account::is_valid_number(&account.account_number));
        }
        assert_ne!(
            registration.accounts[0].account_number,
            registration.accounts[1].account_number
        );
        assert_eq!(users.accounts_for_user(registration.user_id).unwrap().len(), 2);
    }

    #[test]
    fn test_duplicate_email_is_conflict_case_insensitive() {
        let users = service();
        users.register(request("ada@example.com")).unwrap();

        let err = users.register(request("ADA@Example.com")).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_register_validates_input() {
        let users = service();

        let mut bad_email = request("not-an-email");
        assert!(matches!(users.register(bad_email.clone()).unwrap_err(), Error::InvalidInput(_)));

        bad_email.email = "ada@example.com".to_string();
        bad_email.password = "short".to_string();
        assert!(matches!(users.register(bad_email.clone()).unwrap_err(), Error::InvalidInput(_)));

        bad_email.password = "long enough".to_string();
        bad_email.first_name = "  ".to_string();
        assert!(matches!(users.register(bad_email).unwrap_err(), Error::InvalidInput(_)));
    }

    #[test]
    fn test_login() {
        let users = service();
        let registration = users.register(request("ada@example.com")).unwrap();

        assert_eq!(
            users.login("Ada@Example.com", "correct horse").unwrap(),
            registration.user_id
        );
        assert!(matches!(
            users.login("ada@example.com", "wrong password").unwrap_err(),
            Error::InvalidCredentials
        ));
        assert!(matches!(
            users.login("nobody@example.com", "correct horse").unwrap_err(),
            Error::InvalidCredentials
        ));
    }

    #[test]
    fn test_verify_account_shows_first_name() {
        let users = service();
        let registration = users.register(request("ada@example.com")).unwrap();
        let number = &registration.accounts[1].account_number;

        let verification = users.verify_account(number).unwrap();
        assert_eq!(verification.account_name, "Savings");
        assert_eq!(verification.user_name, "Ada");

        assert!(matches!(
            users.verify_account("123").unwrap_err(),
            Error::InvalidInput(_)
        ));
        assert!(matches!(
            users.verify_account("1000000000").unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn test_profile_hides_password_hash() {
        let users = service();
        let registration = users.register(request("ada@example.com")).unwrap();

        let user = users.get_user(registration.user_id).unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["email"], "ada@example.com");
    }

    #[test]
    fn test_list_users_in_registration_order() {
        let users = service();
        assert!(users.list_users().unwrap().is_empty());

        let first = users.register(request("ada@example.com")).unwrap();
        let second = users.register(request("grace@example.com")).unwrap();

        let listed = users.list_users().unwrap();
        let ids: Vec<Uuid> = listed.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![first.user_id, second.user_id]);
        assert!(listed.iter().all(|u| !u.password_hash.is_empty()));
    }
}

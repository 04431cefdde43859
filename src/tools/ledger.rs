//! Bank ledger persistence using redb
//!
//! Database: ledger.redb
//! Tables:
//!   - users: user id -> User (MessagePack)
//!   - transactions: transaction id -> Transaction (MessagePack)
//!
//! Every balance change and its transaction record are written in the same
//! write transaction; checks run before anything is inserted, so a rejected
//! operation leaves both tables untouched.

#![allow(clippy::result_large_err)]

use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const LEDGER_FILE: &str = "ledger.redb";

/// Smallest amount accepted by deposit and withdraw
pub const MIN_AMOUNT: f64 = 0.01;

const USERS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("users");
const TRANSACTIONS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("transactions");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub balance: f64,
    /// Unix timestamp (ms)
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: u64,
    pub user_id: u64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: f64,
    /// Unix timestamp (ms)
    pub created_at: i64,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Invalid(String),

    #[error("User {0} not found.")]
    UserNotFound(u64),

    #[error("Insufficient balance or user not found.")]
    InsufficientBalance,
}

impl From<rmp_serde::encode::Error> for LedgerError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        LedgerError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for LedgerError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        LedgerError::Serialization(e.to_string())
    }
}

fn validate_amount(amount: f64) -> Result<(), LedgerError> {
    if !amount.is_finite() || amount < MIN_AMOUNT {
        return Err(LedgerError::Invalid(format!(
            "Amount must be at least {}.",
            MIN_AMOUNT
        )));
    }
    Ok(())
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn next_id(table: &impl ReadableTable<u64, &'static [u8]>) -> Result<u64, LedgerError> {
    Ok(table.last()?.map(|(key, _)| key.value() + 1).unwrap_or(1))
}

pub struct LedgerStore {
    db: Database,
}

impl LedgerStore {
    /// Open (or create) `ledger.redb` under `data_dir`
    pub fn open(data_dir: &Path) -> Result<Self, LedgerError> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(LEDGER_FILE);

        let db = match Database::create(&path) {
            Ok(db) => db,
            Err(e) => {
                warn!("Failed to open ledger database: {:?}, attempting recovery", e);

                let backup_path = path.with_extension("redb.backup");
                if let Err(e) = std::fs::rename(&path, &backup_path) {
                    error!("Failed to backup corrupted ledger database: {:?}", e);
                } else {
                    info!("Backed up corrupted ledger database to {:?}", backup_path);
                }

                Database::create(&path)?
            }
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
            {
                warn!("Failed to set ledger database permissions: {}", e);
            }
        }

        let store = Self { db };
        store.initialize()?;
        info!("Ledger database opened at {:?}", path);
        Ok(store)
    }

    fn initialize(&self) -> Result<(), LedgerError> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS_TABLE)?;
            let _ = write_txn.open_table(TRANSACTIONS_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn create_user(
        &self,
        name: &str,
        email: &str,
        initial_balance: f64,
    ) -> Result<User, LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::Invalid("Please enter a name.".to_string()));
        }
        if !initial_balance.is_finite() || initial_balance < 0.0 {
            return Err(LedgerError::Invalid(
                "Initial balance cannot be negative.".to_string(),
            ));
        }

        let write_txn = self.db.begin_write()?;
        let user = {
            let mut users = write_txn.open_table(USERS_TABLE)?;
            let user = User {
                id: next_id(&users)?,
                name: name.to_string(),
                email: email.trim().to_string(),
                balance: initial_balance,
                created_at: now_ms(),
            };
            let bytes = rmp_serde::to_vec(&user)?;
            users.insert(user.id, bytes.as_slice())?;
            user
        };
        write_txn.commit()?;

        info!("Created user {} ({})", user.id, user.name);
        Ok(user)
    }

    pub fn list_users(&self) -> Result<Vec<User>, LedgerError> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(USERS_TABLE)?;

        let mut result = Vec::new();
        for entry in users.iter()? {
            let (_, value) = entry?;
            result.push(rmp_serde::from_slice(value.value())?);
        }
        Ok(result)
    }

    pub fn get_user(&self, user_id: u64) -> Result<Option<User>, LedgerError> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(USERS_TABLE)?;
        let user = users
            .get(user_id)?
            .map(|v| rmp_serde::from_slice::<User>(v.value()))
            .transpose()?;
        Ok(user)
    }

    pub fn deposit(&self, user_id: u64, amount: f64) -> Result<User, LedgerError> {
        validate_amount(amount)?;
        self.apply(user_id, TransactionKind::Deposit, amount)
    }

    pub fn withdraw(&self, user_id: u64, amount: f64) -> Result<User, LedgerError> {
        validate_amount(amount)?;
        self.apply(user_id, TransactionKind::Withdrawal, amount)
    }

    /// Update the balance and record the transaction atomically
    fn apply(&self, user_id: u64, kind: TransactionKind, amount: f64) -> Result<User, LedgerError> {
        let write_txn = self.db.begin_write()?;
        let user = {
            let mut users = write_txn.open_table(USERS_TABLE)?;
            let mut transactions = write_txn.open_table(TRANSACTIONS_TABLE)?;

            let existing = users
                .get(user_id)?
                .map(|v| rmp_serde::from_slice::<User>(v.value()))
                .transpose()?;

            // Dropping the uncommitted transaction discards it
            let mut user = match (existing, kind) {
                (Some(user), TransactionKind::Deposit) => user,
                (None, TransactionKind::Deposit) => return Err(LedgerError::UserNotFound(user_id)),
                (Some(user), TransactionKind::Withdrawal) if user.balance >= amount => user,
                (_, TransactionKind::Withdrawal) => return Err(LedgerError::InsufficientBalance),
            };

            match kind {
                TransactionKind::Deposit => user.balance += amount,
                TransactionKind::Withdrawal => user.balance -= amount,
            }

            let record = Transaction {
                id: next_id(&transactions)?,
                user_id,
                kind,
                amount,
                created_at: now_ms(),
            };

            let user_bytes = rmp_serde::to_vec(&user)?;
            let record_bytes = rmp_serde::to_vec(&record)?;
            users.insert(user_id, user_bytes.as_slice())?;
            transactions.insert(record.id, record_bytes.as_slice())?;
            user
        };
        write_txn.commit()?;

        debug!("{:?} of {} for user {}", kind, amount, user_id);
        Ok(user)
    }

    /// Transactions of `user_id`, newest first
    pub fn transactions(&self, user_id: u64) -> Result<Vec<Transaction>, LedgerError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TRANSACTIONS_TABLE)?;

        let mut result: Vec<Transaction> = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let record: Transaction = rmp_serde::from_slice(value.value())?;
            if record.user_id == user_id {
                result.push(record);
            }
        }
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> (LedgerStore, tempfile::TempDir) {
        let temp = tempfile::tempdir().unwrap();
        let store = LedgerStore::open(temp.path()).unwrap();
        (store, temp)
    }

    #[test]
    fn test_create_and_list_users() {
        let (store, _temp) = create_test_store();

        let alice = store.create_user("Alice", "alice@example.com", 100.0).unwrap();
        let bob = store.create_user(" Bob ", "bob@example.com", 0.0).unwrap();
        assert_eq!(alice.id, 1);
        assert_eq!(bob.id, 2);
        assert_eq!(bob.name, "Bob");

        let users = store.list_users().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].email, "alice@example.com");

        assert!(matches!(
            store.create_user("Eve", "eve@example.com", -1.0),
            Err(LedgerError::Invalid(_))
        ));
    }

    #[test]
    fn test_deposit_updates_balance_and_records_transaction() {
        let (store, _temp) = create_test_store();
        let user = store.create_user("Alice", "a@example.com", 100.0).unwrap();

        let updated = store.deposit(user.id, 50.0).unwrap();
        assert!((updated.balance - 150.0).abs() < 1e-9);

        let transactions = store.transactions(user.id).unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].kind, TransactionKind::Deposit);
        assert!((transactions[0].amount - 50.0).abs() < 1e-9);

        let stored = store.get_user(user.id).unwrap().unwrap();
        assert!((stored.balance - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_withdraw_checks_before_mutating() {
        let (store, _temp) = create_test_store();
        let user = store.create_user("Alice", "a@example.com", 20.0).unwrap();

        let err = store.withdraw(user.id, 20.01).unwrap_err();
        assert_eq!(err.to_string(), "Insufficient balance or user not found.");
        assert!(matches!(
            store.withdraw(99, 1.0),
            Err(LedgerError::InsufficientBalance)
        ));
        assert!(store.transactions(user.id).unwrap().is_empty());

        let updated = store.withdraw(user.id, 20.0).unwrap();
        assert!(updated.balance.abs() < 1e-9);
    }

    #[test]
    fn test_deposit_rejections_leave_store_untouched() {
        let (store, _temp) = create_test_store();
        let user = store.create_user("Alice", "a@example.com", 10.0).unwrap();

        assert!(matches!(store.deposit(42, 5.0), Err(LedgerError::UserNotFound(42))));
        assert!(matches!(store.deposit(user.id, 0.0), Err(LedgerError::Invalid(_))));
        assert!(matches!(
            store.deposit(user.id, f64::NAN),
            Err(LedgerError::Invalid(_))
        ));

        assert!(store.transactions(user.id).unwrap().is_empty());
        assert!((store.get_user(user.id).unwrap().unwrap().balance - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_transactions_newest_first_and_scoped_to_user() {
        let (store, _temp) = create_test_store();
        let alice = store.create_user("Alice", "a@example.com", 0.0).unwrap();
        let bob = store.create_user("Bob", "b@example.com", 0.0).unwrap();

        store.deposit(alice.id, 10.0).unwrap();
        store.deposit(bob.id, 99.0).unwrap();
        store.withdraw(alice.id, 4.0).unwrap();

        let history = store.transactions(alice.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, TransactionKind::Withdrawal);
        assert_eq!(history[1].kind, TransactionKind::Deposit);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let temp = tempfile::tempdir().unwrap();
        {
            let store = LedgerStore::open(temp.path()).unwrap();
            let user = store.create_user("Alice", "a@example.com", 1.0).unwrap();
            store.deposit(user.id, 2.0).unwrap();
        }
        let store = LedgerStore::open(temp.path()).unwrap();
        assert_eq!(store.list_users().unwrap().len(), 1);
        assert_eq!(store.transactions(1).unwrap().len(), 1);
    }
}

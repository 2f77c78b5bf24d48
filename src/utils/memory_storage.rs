//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

/// In-memory storage implementation for testing and development
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
    journals: Arc<RwLock<HashMap<String, Journal>>>,
    statements: Arc<RwLock<HashMap<String, Statement>>>,
    lines: Arc<RwLock<HashMap<String, StatementLine>>>,
    entries: Arc<RwLock<HashMap<String, LedgerEntry>>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        self.accounts.write().unwrap().clear();
        self.journals.write().unwrap().clear();
        self.statements.write().unwrap().clear();
        self.lines.write().unwrap().clear();
        self.entries.write().unwrap().clear();
    }
}

#[async_trait]
impl StatementStore for MemoryStorage {
    async fn save_account(&mut self, account: &Account) -> StatementResult<()> {
        self.accounts
            .write()
            .unwrap()
            .insert(account.id.clone(), account.clone());
        Ok(())
    }

    async fn get_account(&self, account_id: &str) -> StatementResult<Option<Account>> {
        Ok(self.accounts.read().unwrap().get(account_id).cloned())
    }

    async fn save_journal(&mut self, journal: &Journal) -> StatementResult<()> {
        self.journals
            .write()
            .unwrap()
            .insert(journal.id.clone(), journal.clone());
        Ok(())
    }

    async fn get_journal(&self, journal_id: &str) -> StatementResult<Option<Journal>> {
        Ok(self.journals.read().unwrap().get(journal_id).cloned())
    }

    async fn find_journal_by_merchant(
        &self,
        merchant_account: &str,
    ) -> StatementResult<Option<Journal>> {
        let journals = self.journals.read().unwrap();
        Ok(journals
            .values()
            .find(|journal| journal.adyen_merchant_account.as_deref() == Some(merchant_account))
            .cloned())
    }

    async fn save_statement(&mut self, statement: &Statement) -> StatementResult<()> {
        self.statements
            .write()
            .unwrap()
            .insert(statement.id.clone(), statement.clone());
        Ok(())
    }

    async fn get_statement(&self, statement_id: &str) -> StatementResult<Option<Statement>> {
        Ok(self.statements.read().unwrap().get(statement_id).cloned())
    }

    async fn find_statement_by_name(&self, name: &str) -> StatementResult<Option<Statement>> {
        let statements = self.statements.read().unwrap();
        Ok(statements
            .values()
            .find(|statement| statement.name == name)
            .cloned())
    }

    async fn update_statement(&mut self, statement: &Statement) -> StatementResult<()> {
        if self
            .statements
            .read()
            .unwrap()
            .contains_key(&statement.id)
        {
            self.statements
                .write()
                .unwrap()
                .insert(statement.id.clone(), statement.clone());
            Ok(())
        } else {
            Err(StatementError::StatementNotFound(statement.id.clone()))
        }
    }

    async fn save_line(&mut self, line: &StatementLine) -> StatementResult<()> {
        self.lines
            .write()
            .unwrap()
            .insert(line.id.clone(), line.clone());
        Ok(())
    }

    async fn get_lines(&self, statement_id: &str) -> StatementResult<Vec<StatementLine>> {
        let lines = self.lines.read().unwrap();
        let mut filtered: Vec<StatementLine> = lines
            .values()
            .filter(|line| line.statement_id == statement_id)
            .cloned()
            .collect();
        filtered.sort_by_key(|line| line.sequence);
        Ok(filtered)
    }

    async fn find_line_by_import_id(
        &self,
        unique_import_id: &str,
    ) -> StatementResult<Option<StatementLine>> {
        let lines = self.lines.read().unwrap();
        Ok(lines
            .values()
            .find(|line| line.unique_import_id.as_deref() == Some(unique_import_id))
            .cloned())
    }

    async fn save_entry(&mut self, entry: &LedgerEntry) -> StatementResult<()> {
        entry.validate()?;
        let mut entries = self.entries.write().unwrap();
        if entries.contains_key(&entry.id) {
            return Err(StatementError::Storage(format!(
                "entry '{}' is already posted",
                entry.id
            )));
        }
        entries.insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    async fn get_entry(&self, entry_id: &str) -> StatementResult<Option<LedgerEntry>> {
        Ok(self.entries.read().unwrap().get(entry_id).cloned())
    }

    async fn entries_for_line(&self, line_id: &str) -> StatementResult<Vec<LedgerEntry>> {
        let entries = self.entries.read().unwrap();
        let mut filtered: Vec<LedgerEntry> = entries
            .values()
            .filter(|entry| entry.statement_line_id.as_deref() == Some(line_id))
            .cloned()
            .collect();
        filtered.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(filtered)
    }

    async fn mark_reconciled(&mut self, entry_ids: &[String]) -> StatementResult<String> {
        if entry_ids.is_empty() {
            return Err(StatementError::Storage(
                "cannot reconcile an empty entry set".to_string(),
            ));
        }
        let mut entries = self.entries.write().unwrap();
        for entry_id in entry_ids {
            match entries.get(entry_id) {
                None => {
                    return Err(StatementError::Storage(format!(
                        "entry '{entry_id}' not found"
                    )));
                }
                Some(entry) if entry.full_reconcile_id.is_some() => {
                    return Err(StatementError::Storage(format!(
                        "entry '{entry_id}' is already reconciled"
                    )));
                }
                Some(_) => {}
            }
        }

        let reconcile_id = Uuid::new_v4().to_string();
        for entry_id in entry_ids {
            if let Some(entry) = entries.get_mut(entry_id) {
                entry.full_reconcile_id = Some(reconcile_id.clone());
            }
        }
        Ok(reconcile_id)
    }

    async fn remove_reconciliation(&mut self, reconcile_id: &str) -> StatementResult<()> {
        let mut entries = self.entries.write().unwrap();
        let mut found = false;
        for entry in entries.values_mut() {
            if entry.full_reconcile_id.as_deref() == Some(reconcile_id) {
                entry.full_reconcile_id = None;
                found = true;
            }
        }
        if found {
            Ok(())
        } else {
            Err(StatementError::Storage(format!(
                "reconciliation '{reconcile_id}' not found"
            )))
        }
    }

    async fn reconciled_entries(&self, reconcile_id: &str) -> StatementResult<Vec<LedgerEntry>> {
        let entries = self.entries.read().unwrap();
        Ok(entries
            .values()
            .filter(|entry| entry.full_reconcile_id.as_deref() == Some(reconcile_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    #[tokio::test]
    async fn reconciliation_lifecycle() {
        let mut storage = MemoryStorage::new();
        storage
            .save_entry(&LedgerEntry::debit("e1", "clearing", None, BigDecimal::from(10)))
            .await
            .unwrap();
        storage
            .save_entry(&LedgerEntry::credit("e2", "clearing", None, BigDecimal::from(10)))
            .await
            .unwrap();

        let reconcile_id = storage
            .mark_reconciled(&["e1".to_string(), "e2".to_string()])
            .await
            .unwrap();
        let linked = storage.reconciled_entries(&reconcile_id).await.unwrap();
        assert_eq!(linked.len(), 2);

        // A reconciled entry cannot join a second reconciliation.
        assert!(storage.mark_reconciled(&["e1".to_string()]).await.is_err());

        storage.remove_reconciliation(&reconcile_id).await.unwrap();
        let entry = storage.get_entry("e1").await.unwrap().unwrap();
        assert!(entry.full_reconcile_id.is_none());
        assert!(storage.remove_reconciliation(&reconcile_id).await.is_err());
    }

    #[tokio::test]
    async fn posted_entries_are_immutable() {
        let mut storage = MemoryStorage::new();
        let entry = LedgerEntry::debit("e1", "clearing", None, BigDecimal::from(10));
        storage.save_entry(&entry).await.unwrap();
        assert!(storage.save_entry(&entry).await.is_err());
    }
}

//! Clearing-account reconciliation for bank statements
//!
//! Statements whose journal books both sides through a single reconcilable
//! account (a clearing account) can be settled automatically: every statement
//! line already has a posted entry on that account, and the entries of one
//! statement net to zero once the counterpart legs arrive. This module finds
//! that entry set and links or unlinks it as a full reconciliation.

use bigdecimal::BigDecimal;

use crate::traits::StatementStore;
use crate::types::*;

/// Reconciler matching statement lines against clearing-account entries
pub struct ClearingReconciler<S: StatementStore> {
    storage: S,
}

impl<S: StatementStore> ClearingReconciler<S> {
    /// Create a new reconciler over the given storage backend
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Compute the clearing-account entry set for a statement
    ///
    /// Returns `Ok(None)` when the statement is not eligible: the journal's
    /// default debit and credit accounts differ, the shared account is not
    /// flagged reconcilable, any line lacks a matching entry, or the matched
    /// set does not net to zero at the journal currency's precision. `None`
    /// is not an error; it means reconciliation does not apply here.
    pub async fn clearing_entries(
        &self,
        statement_id: &str,
    ) -> StatementResult<Option<Vec<LedgerEntry>>> {
        let statement = self.get_statement_required(statement_id).await?;
        let journal = self
            .storage
            .get_journal(&statement.journal_id)
            .await?
            .ok_or_else(|| StatementError::JournalNotFound(statement.journal_id.clone()))?;

        let Some(account_id) = journal.shared_default_account() else {
            return Ok(None);
        };
        let account = self
            .storage
            .get_account(account_id)
            .await?
            .ok_or_else(|| StatementError::AccountNotFound(account_id.to_string()))?;
        if !account.reconcile {
            return Ok(None);
        }

        let mut matched = Vec::new();
        for line in self.storage.get_lines(&statement.id).await? {
            match self
                .matching_entry(&line, &account.id, &journal.currency)
                .await?
            {
                Some(entry) => matched.push(entry),
                None => return Ok(None),
            }
        }
        if matched.is_empty() {
            return Ok(None);
        }

        let balance: BigDecimal = matched.iter().map(|entry| entry.signed_amount()).sum();
        if !journal.currency.is_zero(&balance) {
            return Ok(None);
        }
        Ok(Some(matched))
    }

    /// Reconcile a statement's clearing-account entries
    ///
    /// No-op returning `Ok(false)` when the entry set cannot be computed or
    /// any matched entry already belongs to a reconciliation, so repeating
    /// the call never double-links.
    pub async fn reconcile(&mut self, statement_id: &str) -> StatementResult<bool> {
        let Some(entries) = self.clearing_entries(statement_id).await? else {
            return Ok(false);
        };
        if entries.iter().any(|entry| entry.full_reconcile_id.is_some()) {
            return Ok(false);
        }
        let entry_ids: Vec<String> = entries.iter().map(|entry| entry.id.clone()).collect();
        self.storage.mark_reconciled(&entry_ids).await?;
        Ok(true)
    }

    /// Undo the reconciliation created for a statement's entries
    ///
    /// Only removes a reconciliation whose entry set is exactly the computed
    /// set; a reconciliation that also covers entries from other statements
    /// is left untouched.
    pub async fn unreconcile(&mut self, statement_id: &str) -> StatementResult<bool> {
        let Some(entries) = self.clearing_entries(statement_id).await? else {
            return Ok(false);
        };
        let Some(reconcile_id) = entries
            .first()
            .and_then(|entry| entry.full_reconcile_id.clone())
        else {
            return Ok(false);
        };

        let existing = self.storage.reconciled_entries(&reconcile_id).await?;
        if !same_entry_set(&entries, &existing) {
            return Ok(false);
        }
        self.storage.remove_reconciliation(&reconcile_id).await?;
        Ok(true)
    }

    /// Find the posted clearing-account entry matching a statement line
    ///
    /// A positive line matches on the debit side, a negative line on the
    /// credit side, at the journal currency's precision. The first match
    /// wins.
    async fn matching_entry(
        &self,
        line: &StatementLine,
        account_id: &str,
        currency: &Currency,
    ) -> StatementResult<Option<LedgerEntry>> {
        let zero = BigDecimal::from(0);
        let compare_amount = line.amount.abs();
        for entry in self.storage.entries_for_line(&line.id).await? {
            if entry.account_id != account_id {
                continue;
            }
            let side = if line.amount > zero {
                &entry.debit
            } else {
                &entry.credit
            };
            if *side != zero && currency.amounts_equal(side, &compare_amount) {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    async fn get_statement_required(&self, statement_id: &str) -> StatementResult<Statement> {
        self.storage
            .get_statement(statement_id)
            .await?
            .ok_or_else(|| StatementError::StatementNotFound(statement_id.to_string()))
    }
}

fn same_entry_set(left: &[LedgerEntry], right: &[LedgerEntry]) -> bool {
    let mut left_ids: Vec<&str> = left.iter().map(|entry| entry.id.as_str()).collect();
    let mut right_ids: Vec<&str> = right.iter().map(|entry| entry.id.as_str()).collect();
    left_ids.sort_unstable();
    right_ids.sort_unstable();
    left_ids == right_ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn amount(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    async fn seed_statement(storage: &mut MemoryStorage, amounts: &[&str]) {
        storage
            .save_account(&Account::new("clearing", "Clearing", true))
            .await
            .unwrap();
        storage
            .save_account(&Account::new("receivable", "Receivable", false))
            .await
            .unwrap();
        storage
            .save_journal(&Journal::new(
                "j1",
                "Clearing journal",
                "clearing",
                Currency::new("USD", 2),
            ))
            .await
            .unwrap();
        storage
            .save_statement(&Statement::new("st1", "j1", "Statement 1", date(1)))
            .await
            .unwrap();

        for (sequence, value) in amounts.iter().enumerate() {
            let line_amount = amount(value);
            let line_id = format!("line{sequence}");
            storage
                .save_line(&StatementLine {
                    id: line_id.clone(),
                    statement_id: "st1".to_string(),
                    sequence,
                    date: date(1),
                    amount: line_amount.clone(),
                    name: format!("line {sequence}"),
                    note: None,
                    unique_import_id: None,
                })
                .await
                .unwrap();

            // Clearing leg mirrors the line, counterpart leg goes elsewhere.
            let absolute = line_amount.abs();
            let (clearing, counterpart) = if line_amount > BigDecimal::from(0) {
                (
                    LedgerEntry::debit(
                        format!("{line_id}-clearing"),
                        "clearing",
                        Some(line_id.clone()),
                        absolute.clone(),
                    ),
                    LedgerEntry::credit(
                        format!("{line_id}-counterpart"),
                        "receivable",
                        Some(line_id.clone()),
                        absolute,
                    ),
                )
            } else {
                (
                    LedgerEntry::credit(
                        format!("{line_id}-clearing"),
                        "clearing",
                        Some(line_id.clone()),
                        absolute.clone(),
                    ),
                    LedgerEntry::debit(
                        format!("{line_id}-counterpart"),
                        "receivable",
                        Some(line_id.clone()),
                        absolute,
                    ),
                )
            };
            storage.save_entry(&clearing).await.unwrap();
            storage.save_entry(&counterpart).await.unwrap();
        }
    }

    #[tokio::test]
    async fn matches_clearing_entries_for_balanced_statement() {
        let mut storage = MemoryStorage::new();
        seed_statement(&mut storage, &["100.00", "-60.00", "-40.00"]).await;

        let reconciler = ClearingReconciler::new(storage);
        let entries = reconciler.clearing_entries("st1").await.unwrap().unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|entry| entry.account_id == "clearing"));
    }

    #[tokio::test]
    async fn unbalanced_match_set_is_not_applicable() {
        let mut storage = MemoryStorage::new();
        seed_statement(&mut storage, &["100.00", "-60.00"]).await;

        let mut reconciler = ClearingReconciler::new(storage);
        assert!(reconciler.clearing_entries("st1").await.unwrap().is_none());
        assert!(!reconciler.reconcile("st1").await.unwrap());
    }

    #[tokio::test]
    async fn split_default_accounts_are_not_applicable() {
        let mut storage = MemoryStorage::new();
        seed_statement(&mut storage, &["100.00", "-100.00"]).await;
        let mut journal = storage.get_journal("j1").await.unwrap().unwrap();
        journal.default_credit_account_id = "receivable".to_string();
        storage.save_journal(&journal).await.unwrap();

        let reconciler = ClearingReconciler::new(storage);
        assert!(reconciler.clearing_entries("st1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn non_reconcilable_account_is_not_applicable() {
        let mut storage = MemoryStorage::new();
        seed_statement(&mut storage, &["100.00", "-100.00"]).await;
        storage
            .save_account(&Account::new("clearing", "Clearing", false))
            .await
            .unwrap();

        let reconciler = ClearingReconciler::new(storage);
        assert!(reconciler.clearing_entries("st1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn line_without_matching_entry_is_not_applicable() {
        let mut storage = MemoryStorage::new();
        seed_statement(&mut storage, &["100.00", "-100.00"]).await;
        // Orphan line with no posted entries at all.
        storage
            .save_line(&StatementLine {
                id: "orphan".to_string(),
                statement_id: "st1".to_string(),
                sequence: 9,
                date: date(2),
                amount: amount("0.00"),
                name: "orphan".to_string(),
                note: None,
                unique_import_id: None,
            })
            .await
            .unwrap();

        let reconciler = ClearingReconciler::new(storage);
        assert!(reconciler.clearing_entries("st1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reconcile_then_unreconcile_restores_entries() {
        let mut storage = MemoryStorage::new();
        seed_statement(&mut storage, &["75.50", "-75.50"]).await;

        let mut reconciler = ClearingReconciler::new(storage.clone());
        assert!(reconciler.reconcile("st1").await.unwrap());

        let entries = reconciler.clearing_entries("st1").await.unwrap().unwrap();
        assert!(entries.iter().all(|entry| entry.full_reconcile_id.is_some()));
        // Second reconcile is a guarded no-op.
        assert!(!reconciler.reconcile("st1").await.unwrap());

        assert!(reconciler.unreconcile("st1").await.unwrap());
        let entries = reconciler.clearing_entries("st1").await.unwrap().unwrap();
        assert!(entries.iter().all(|entry| entry.full_reconcile_id.is_none()));

        // Counterpart entries were never touched.
        let counterpart = storage.get_entry("line0-counterpart").await.unwrap().unwrap();
        assert!(counterpart.full_reconcile_id.is_none());
    }

    #[tokio::test]
    async fn unreconcile_spares_wider_reconciliations() {
        let mut storage = MemoryStorage::new();
        seed_statement(&mut storage, &["30.00", "-30.00"]).await;
        // An extra entry reconciled together with this statement's entries,
        // as if another statement contributed to the same settlement.
        storage
            .save_entry(&LedgerEntry::debit(
                "foreign",
                "clearing",
                None,
                amount("0.00"),
            ))
            .await
            .unwrap();
        storage
            .mark_reconciled(&[
                "line0-clearing".to_string(),
                "line1-clearing".to_string(),
                "foreign".to_string(),
            ])
            .await
            .unwrap();

        let mut reconciler = ClearingReconciler::new(storage.clone());
        assert!(!reconciler.unreconcile("st1").await.unwrap());
        let entry = storage.get_entry("line0-clearing").await.unwrap().unwrap();
        assert!(entry.full_reconcile_id.is_some());
    }
}

//! Traits for storage abstraction and extensibility

use async_trait::async_trait;

use crate::types::*;

/// Storage abstraction for statements, journals and ledger entries
///
/// This trait lets the import and reconciliation core work with any host
/// record store (PostgreSQL, MySQL, SQLite, in-memory, etc.) by implementing
/// these methods. One import or reconciliation action is expected to run to
/// completion within one host transaction; the trait adds no locking of its
/// own.
#[async_trait]
pub trait StatementStore: Send + Sync {
    /// Save an account to storage
    async fn save_account(&mut self, account: &Account) -> StatementResult<()>;

    /// Get an account by ID
    async fn get_account(&self, account_id: &str) -> StatementResult<Option<Account>>;

    /// Save a journal to storage
    async fn save_journal(&mut self, journal: &Journal) -> StatementResult<()>;

    /// Get a journal by ID
    async fn get_journal(&self, journal_id: &str) -> StatementResult<Option<Journal>>;

    /// Find the journal configured for an Adyen merchant account, if any
    ///
    /// When several journals carry the same merchant account, the first match
    /// wins.
    async fn find_journal_by_merchant(
        &self,
        merchant_account: &str,
    ) -> StatementResult<Option<Journal>>;

    /// Save a statement to storage
    async fn save_statement(&mut self, statement: &Statement) -> StatementResult<()>;

    /// Get a statement by ID
    async fn get_statement(&self, statement_id: &str) -> StatementResult<Option<Statement>>;

    /// Find a statement by its display name
    async fn find_statement_by_name(&self, name: &str) -> StatementResult<Option<Statement>>;

    /// Update a statement
    async fn update_statement(&mut self, statement: &Statement) -> StatementResult<()>;

    /// Save a statement line
    async fn save_line(&mut self, line: &StatementLine) -> StatementResult<()>;

    /// List a statement's lines ordered by sequence
    async fn get_lines(&self, statement_id: &str) -> StatementResult<Vec<StatementLine>>;

    /// Find a previously imported line by its deduplication key
    async fn find_line_by_import_id(
        &self,
        unique_import_id: &str,
    ) -> StatementResult<Option<StatementLine>>;

    /// Post a ledger entry
    async fn save_entry(&mut self, entry: &LedgerEntry) -> StatementResult<()>;

    /// Get a ledger entry by ID
    async fn get_entry(&self, entry_id: &str) -> StatementResult<Option<LedgerEntry>>;

    /// List the posted entries generated from a statement line
    async fn entries_for_line(&self, line_id: &str) -> StatementResult<Vec<LedgerEntry>>;

    /// Mark a set of entries as mutually reconciled, returning the new
    /// reconciliation's identifier
    ///
    /// Assumed atomic in the host ledger: either every entry is linked or
    /// none is.
    async fn mark_reconciled(&mut self, entry_ids: &[String]) -> StatementResult<String>;

    /// Remove a reconciliation, unlinking every entry that belongs to it
    async fn remove_reconciliation(&mut self, reconcile_id: &str) -> StatementResult<()>;

    /// List the entries belonging to a reconciliation
    async fn reconciled_entries(&self, reconcile_id: &str) -> StatementResult<Vec<LedgerEntry>>;
}

//! Statement lifecycle management

use crate::statement::reconcile::ClearingReconciler;
use crate::traits::StatementStore;
use crate::types::*;

/// Manager driving statement state transitions
///
/// Confirming a statement attempts clearing-account reconciliation and
/// reopening it attempts the reverse, in both cases after the state change
/// itself. Reconciliation is opportunistic: a statement whose journal is not
/// clearing-eligible, or whose entries cannot be matched, still confirms and
/// reopens normally.
pub struct StatementManager<S: StatementStore> {
    storage: S,
    reconciler: ClearingReconciler<S>,
}

impl<S: StatementStore + Clone> StatementManager<S> {
    /// Create a new manager over the given storage backend
    pub fn new(storage: S) -> Self {
        Self {
            storage: storage.clone(),
            reconciler: ClearingReconciler::new(storage),
        }
    }
}

impl<S: StatementStore> StatementManager<S> {
    /// Confirm a statement, then try to reconcile its clearing entries
    pub async fn confirm(&mut self, statement_id: &str) -> StatementResult<StatementState> {
        let mut statement = self.get_statement_required(statement_id).await?;
        statement.state = StatementState::Confirmed;
        self.storage.update_statement(&statement).await?;

        // Best effort: an unmatched statement stays confirmed, unreconciled.
        let _ = self.reconciler.reconcile(statement_id).await;
        Ok(statement.state)
    }

    /// Reopen a confirmed statement, then try to undo its reconciliation
    pub async fn reopen(&mut self, statement_id: &str) -> StatementResult<StatementState> {
        let mut statement = self.get_statement_required(statement_id).await?;
        statement.state = StatementState::Open;
        self.storage.update_statement(&statement).await?;

        let _ = self.reconciler.unreconcile(statement_id).await;
        Ok(statement.state)
    }

    /// Get a statement by ID
    pub async fn statement(&self, statement_id: &str) -> StatementResult<Option<Statement>> {
        self.storage.get_statement(statement_id).await
    }

    async fn get_statement_required(&self, statement_id: &str) -> StatementResult<Statement> {
        self.storage
            .get_statement(statement_id)
            .await?
            .ok_or_else(|| StatementError::StatementNotFound(statement_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn confirm_and_reopen_toggle_without_clearing_setup() {
        let mut storage = MemoryStorage::new();
        storage
            .save_account(&Account::new("bank", "Bank", false))
            .await
            .unwrap();
        storage
            .save_journal(&Journal::new(
                "j1",
                "Bank journal",
                "bank",
                Currency::new("EUR", 2),
            ))
            .await
            .unwrap();
        storage
            .save_statement(&Statement::new(
                "st1",
                "j1",
                "Statement 1",
                NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            ))
            .await
            .unwrap();

        let mut manager = StatementManager::new(storage);
        // No lines and no reconcilable account: transitions still succeed.
        assert_eq!(
            manager.confirm("st1").await.unwrap(),
            StatementState::Confirmed
        );
        assert_eq!(manager.reopen("st1").await.unwrap(), StatementState::Open);
        assert_eq!(
            manager.confirm("st1").await.unwrap(),
            StatementState::Confirmed
        );

        let statement = manager.statement("st1").await.unwrap().unwrap();
        assert_eq!(statement.state, StatementState::Confirmed);
    }

    #[tokio::test]
    async fn confirm_unknown_statement_fails() {
        let mut manager = StatementManager::new(MemoryStorage::new());
        assert!(matches!(
            manager.confirm("missing").await,
            Err(StatementError::StatementNotFound(_))
        ));
    }
}

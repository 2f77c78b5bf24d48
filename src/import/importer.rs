//! Generic statement importer
//!
//! Consumes normalized [`ParsedImport`] values: resolves each parsed
//! statement to a journal, drops transactions that were imported before, and
//! creates the statement with its lines. Parsers stay free of storage
//! concerns; this is the only import-side writer.

use uuid::Uuid;

use crate::import::adyen::AdyenParser;
use crate::traits::StatementStore;
use crate::types::*;

/// Explicit per-import configuration
///
/// Carries the journal binding that the importer would otherwise take from
/// the parsed statement itself. Passed by the caller; there is no ambient
/// request state.
#[derive(Debug, Clone, Default)]
pub struct ImportContext {
    /// Journal overriding the parsed statements' own resolution
    pub journal_id: Option<String>,
}

impl ImportContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context binding all imported statements to one journal
    pub fn with_journal(journal_id: impl Into<String>) -> Self {
        Self {
            journal_id: Some(journal_id.into()),
        }
    }
}

/// Importer writing parsed statements into the record store
pub struct StatementImporter<S: StatementStore> {
    storage: S,
}

impl<S: StatementStore> StatementImporter<S> {
    /// Create a new importer over the given storage backend
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Resolve parsed statements to journals by merchant account
    ///
    /// Each statement's `local_account` names the Adyen merchant account; the
    /// journal configured for it becomes the statement's journal and the
    /// merchant account is consumed. A merchant account without a journal
    /// rejects the whole import.
    pub async fn resolve_journals(
        &self,
        statements: &mut [ParsedStatement],
    ) -> StatementResult<()> {
        for statement in statements.iter_mut() {
            let Some(merchant_account) = statement.local_account.clone() else {
                continue;
            };
            match self
                .storage
                .find_journal_by_merchant(&merchant_account)
                .await?
            {
                Some(journal) => {
                    statement.journal_id = Some(journal.id);
                    statement.local_account = None;
                }
                None => {
                    return Err(StatementError::Validation(format!(
                        "Please create a journal with merchant account \"{merchant_account}\""
                    )));
                }
            }
        }
        Ok(())
    }

    /// Import parsed statements, creating statements and lines
    ///
    /// Transactions whose `unique_import_id` is already in the store are
    /// skipped; a statement left with no new transactions is not created.
    /// Returns the created statement ids, or a validation error when the
    /// whole file was already imported.
    pub async fn import(
        &mut self,
        context: &ImportContext,
        parsed: ParsedImport,
    ) -> StatementResult<Vec<String>> {
        let mut created = Vec::new();
        for parsed_statement in parsed.statements {
            let journal_id = context
                .journal_id
                .clone()
                .or_else(|| parsed_statement.journal_id.clone())
                .ok_or_else(|| {
                    StatementError::Validation(format!(
                        "No journal resolved for statement \"{}\"",
                        parsed_statement.name
                    ))
                })?;
            let journal = self
                .storage
                .get_journal(&journal_id)
                .await?
                .ok_or_else(|| StatementError::JournalNotFound(journal_id.clone()))?;
            if journal.currency.code != parsed_statement.local_currency {
                return Err(StatementError::Validation(format!(
                    "Statement currency {} does not match journal currency {}",
                    parsed_statement.local_currency, journal.currency.code
                )));
            }

            let mut fresh = Vec::new();
            for transaction in parsed_statement.transactions {
                if self
                    .storage
                    .find_line_by_import_id(&transaction.unique_import_id)
                    .await?
                    .is_none()
                {
                    fresh.push(transaction);
                }
            }
            if fresh.is_empty() {
                continue;
            }

            let statement = Statement::new(
                Uuid::new_v4().to_string(),
                journal.id.clone(),
                parsed_statement.name,
                parsed_statement.date,
            );
            self.storage.save_statement(&statement).await?;
            for (sequence, transaction) in fresh.into_iter().enumerate() {
                self.storage
                    .save_line(&StatementLine {
                        id: transaction.unique_import_id.clone(),
                        statement_id: statement.id.clone(),
                        sequence,
                        date: transaction.date,
                        amount: transaction.amount,
                        name: transaction.name,
                        note: transaction.note,
                        unique_import_id: Some(transaction.unique_import_id),
                    })
                    .await?;
            }
            created.push(statement.id);
        }

        if created.is_empty() {
            return Err(StatementError::Validation(
                "Statement file contains no new transactions".to_string(),
            ));
        }
        Ok(created)
    }

    /// Parse, resolve and import an Adyen settlement file in one call
    ///
    /// Parse-time errors propagate unmodified, so a caller trying several
    /// parsers can still match on [`StatementError::Format`].
    pub async fn import_file(
        &mut self,
        context: &ImportContext,
        parser: &AdyenParser,
        data: &[u8],
    ) -> StatementResult<Vec<String>> {
        let mut parsed = parser.parse(data)?;
        self.resolve_journals(&mut parsed.statements).await?;
        self.import(context, parsed).await
    }
}

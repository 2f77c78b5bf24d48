//! Core types and data structures for statement import and reconciliation

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Currency with a fixed decimal precision
///
/// All monetary comparisons in this crate go through the currency so that
/// amounts are compared at the currency's precision rather than bit-for-bit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    /// ISO 4217 currency code (e.g. "USD", "EUR")
    pub code: String,
    /// Number of decimal places carried by the currency
    pub decimal_places: i64,
}

impl Currency {
    /// Create a new currency
    pub fn new(code: impl Into<String>, decimal_places: i64) -> Self {
        Self {
            code: code.into(),
            decimal_places,
        }
    }

    /// Round an amount to the currency's precision
    pub fn round(&self, amount: &BigDecimal) -> BigDecimal {
        amount.with_scale_round(self.decimal_places, RoundingMode::HalfEven)
    }

    /// Whether an amount rounds to zero at the currency's precision
    pub fn is_zero(&self, amount: &BigDecimal) -> bool {
        self.round(amount) == BigDecimal::from(0)
    }

    /// Whether two amounts are equal at the currency's precision
    pub fn amounts_equal(&self, left: &BigDecimal, right: &BigDecimal) -> bool {
        self.round(left) == self.round(right)
    }
}

/// Ledger account as seen by this crate
///
/// A thin projection of the host's account record: reconciliation only needs
/// the identifier and the reconcile flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for the account
    pub id: String,
    /// Human-readable account name
    pub name: String,
    /// Whether entries on this account may be reconciled against each other
    pub reconcile: bool,
}

impl Account {
    /// Create a new account
    pub fn new(id: impl Into<String>, name: impl Into<String>, reconcile: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            reconcile,
        }
    }
}

/// Journal configuration routing statements to accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    /// Unique identifier for the journal
    pub id: String,
    /// Human-readable journal name
    pub name: String,
    /// Account debited by default for this journal's statement lines
    pub default_debit_account_id: String,
    /// Account credited by default for this journal's statement lines
    pub default_credit_account_id: String,
    /// Currency the journal's statements are denominated in
    pub currency: Currency,
    /// Adyen merchant account routed to this journal, if any
    pub adyen_merchant_account: Option<String>,
}

impl Journal {
    /// Create a new journal with the same default debit and credit account
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        default_account_id: impl Into<String>,
        currency: Currency,
    ) -> Self {
        let account_id = default_account_id.into();
        Self {
            id: id.into(),
            name: name.into(),
            default_debit_account_id: account_id.clone(),
            default_credit_account_id: account_id,
            currency,
            adyen_merchant_account: None,
        }
    }

    /// Set the Adyen merchant account this journal receives statements for
    pub fn with_merchant_account(mut self, merchant_account: impl Into<String>) -> Self {
        self.adyen_merchant_account = Some(merchant_account.into());
        self
    }

    /// The shared default account, when debit and credit defaults coincide
    ///
    /// Only journals with a single shared default account are eligible for
    /// clearing-account reconciliation.
    pub fn shared_default_account(&self) -> Option<&str> {
        if self.default_debit_account_id == self.default_credit_account_id {
            Some(&self.default_debit_account_id)
        } else {
            None
        }
    }
}

/// Lifecycle state of a bank statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementState {
    /// Draft statement, lines may still be edited
    Open,
    /// Confirmed statement, lines are final
    Confirmed,
}

/// Bank statement: an ordered collection of statement lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Unique identifier for the statement
    pub id: String,
    /// Journal the statement belongs to
    pub journal_id: String,
    /// Human-readable statement name
    pub name: String,
    /// Statement date
    pub date: NaiveDate,
    /// Current lifecycle state
    pub state: StatementState,
}

impl Statement {
    /// Create a new statement in the open state
    pub fn new(
        id: impl Into<String>,
        journal_id: impl Into<String>,
        name: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            journal_id: journal_id.into(),
            name: name.into(),
            date,
            state: StatementState::Open,
        }
    }
}

/// Single line of a bank statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    /// Unique identifier for the line
    pub id: String,
    /// Statement the line belongs to
    pub statement_id: String,
    /// Position of the line within the statement
    pub sequence: usize,
    /// Value date of the line
    pub date: NaiveDate,
    /// Signed amount of the line
    pub amount: BigDecimal,
    /// Counterparty or transaction label
    pub name: String,
    /// Free-form annotation
    pub note: Option<String>,
    /// Import deduplication key, set for imported lines
    pub unique_import_id: Option<String>,
}

/// Posted ledger entry (journal item)
///
/// Debit and credit are mutually exclusive non-negative amounts. An entry is
/// immutable once posted except for the reconciliation link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier for the entry
    pub id: String,
    /// Account the entry is posted on
    pub account_id: String,
    /// Statement line the entry was generated from, if any
    pub statement_line_id: Option<String>,
    /// Debit amount (zero if the entry is a credit)
    pub debit: BigDecimal,
    /// Credit amount (zero if the entry is a debit)
    pub credit: BigDecimal,
    /// Reconciliation the entry belongs to once matched with counterparts
    pub full_reconcile_id: Option<String>,
}

impl LedgerEntry {
    /// Create a debit entry
    pub fn debit(
        id: impl Into<String>,
        account_id: impl Into<String>,
        statement_line_id: Option<String>,
        amount: BigDecimal,
    ) -> Self {
        Self {
            id: id.into(),
            account_id: account_id.into(),
            statement_line_id,
            debit: amount,
            credit: BigDecimal::from(0),
            full_reconcile_id: None,
        }
    }

    /// Create a credit entry
    pub fn credit(
        id: impl Into<String>,
        account_id: impl Into<String>,
        statement_line_id: Option<String>,
        amount: BigDecimal,
    ) -> Self {
        Self {
            id: id.into(),
            account_id: account_id.into(),
            statement_line_id,
            debit: BigDecimal::from(0),
            credit: amount,
            full_reconcile_id: None,
        }
    }

    /// Signed balance of the entry (debit minus credit)
    pub fn signed_amount(&self) -> BigDecimal {
        &self.debit - &self.credit
    }

    /// Validate the debit/credit shape of the entry
    pub fn validate(&self) -> StatementResult<()> {
        if self.debit < BigDecimal::from(0) || self.credit < BigDecimal::from(0) {
            return Err(StatementError::Validation(format!(
                "entry '{}' has a negative debit or credit",
                self.id
            )));
        }
        if self.debit != BigDecimal::from(0) && self.credit != BigDecimal::from(0) {
            return Err(StatementError::Validation(format!(
                "entry '{}' has both a debit and a credit",
                self.id
            )));
        }
        Ok(())
    }
}

/// Normalized statement produced by a parser, consumed once by the importer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedStatement {
    /// Stable identifier derived from the source document
    pub statement_id: String,
    /// Statement name shown to the user
    pub name: String,
    /// Statement date (earliest transaction date seen)
    pub date: NaiveDate,
    /// Currency code the statement is denominated in
    pub local_currency: String,
    /// Source account identifier, consumed during journal resolution
    pub local_account: Option<String>,
    /// Journal the statement resolves to, attached before import
    pub journal_id: Option<String>,
    /// Transactions in source order
    pub transactions: Vec<ParsedTransaction>,
}

/// Normalized transaction within a [`ParsedStatement`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTransaction {
    /// Deduplication key, unique across imports
    pub unique_import_id: String,
    /// Transaction date
    pub date: NaiveDate,
    /// Signed transaction amount
    pub amount: BigDecimal,
    /// Counterparty or transaction label
    pub name: String,
    /// Free-form annotation
    pub note: Option<String>,
}

/// Complete parser output handed to the generic importer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedImport {
    /// Currency code of the parsed statements
    pub currency_code: String,
    /// Bank account number named by the file, when the format carries one
    pub account_number: Option<String>,
    /// Parsed statements in file order
    pub statements: Vec<ParsedStatement>,
}

/// Errors that can occur during statement import and reconciliation
#[derive(Debug, thiserror::Error)]
pub enum StatementError {
    /// The input is not shaped like a supported statement file; callers may
    /// fall back to a different parser
    #[error("Unsupported statement format: {0}")]
    Format(String),
    /// The input is well-formed but violates a business invariant; surfaced
    /// to the user as the rejection reason
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Journal not found: {0}")]
    JournalNotFound(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Statement not found: {0}")]
    StatementNotFound(String),
}

impl StatementError {
    /// Whether the error signals an unrecognized file format rather than a
    /// rejected import
    pub fn is_format(&self) -> bool {
        matches!(self, StatementError::Format(_))
    }
}

/// Result type for statement operations
pub type StatementResult<T> = Result<T, StatementError>;

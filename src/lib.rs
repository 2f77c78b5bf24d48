//! # Bank Statement Core
//!
//! A library extending an accounting system with bank-statement import and
//! clearing-account reconciliation.
//!
//! ## Features
//!
//! - **Adyen settlement import**: strict parsing of Adyen's 31-column
//!   settlement details export into normalized statements, with fee
//!   accumulation and balance-vs-payout validation
//! - **Clearing-account reconciliation**: automatic matching of statement
//!   lines against posted clearing-account entries, linked and unlinked with
//!   the statement's confirm/reopen transitions
//! - **Generic import pipeline**: journal resolution by merchant account and
//!   deduplicated statement/line creation
//! - **Storage abstraction**: database-agnostic design with a trait-based
//!   record store
//!
//! ## Quick Start
//!
//! ```rust
//! use bank_statement_core::utils::MemoryStorage;
//! use bank_statement_core::{AdyenParser, Currency, ImportContext, StatementImporter};
//!
//! let storage = MemoryStorage::new();
//! let parser = AdyenParser::new(Currency::new("USD", 2));
//! let mut importer = StatementImporter::new(storage);
//! let context = ImportContext::new();
//! // importer.import_file(&context, &parser, &file_bytes).await?;
//! ```

pub mod import;
pub mod statement;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use import::*;
pub use statement::*;
pub use traits::*;
pub use types::*;

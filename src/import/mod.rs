//! Statement file parsing and import

pub mod adyen;
pub mod importer;

pub use adyen::*;
pub use importer::*;

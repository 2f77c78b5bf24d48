//! Clearing-account reconciliation workflow example

use bank_statement_core::utils::MemoryStorage;
use bank_statement_core::{
    Account, Currency, Journal, LedgerEntry, Statement, StatementLine, StatementManager,
    StatementStore,
};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::str::FromStr;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔗 Bank Statement Core - Clearing Reconciliation Example\n");

    let mut storage = MemoryStorage::new();
    let date = NaiveDate::from_ymd_opt(2024, 2, 7).unwrap();

    // 1. A journal booking both sides through one reconcilable account
    storage
        .save_account(&Account::new("clearing", "Payment clearing", true))
        .await?;
    storage
        .save_account(&Account::new("receivable", "Receivable", false))
        .await?;
    storage
        .save_journal(&Journal::new(
            "psp",
            "Payment provider",
            "clearing",
            Currency::new("EUR", 2),
        ))
        .await?;

    // 2. A statement whose lines net to zero
    storage
        .save_statement(&Statement::new("st-2024-02", "psp", "PSP 2024/02", date))
        .await?;
    for (sequence, amount) in ["250.00", "-180.00", "-70.00"].iter().enumerate() {
        let amount = BigDecimal::from_str(amount)?;
        let line_id = format!("st-2024-02-{sequence}");
        storage
            .save_line(&StatementLine {
                id: line_id.clone(),
                statement_id: "st-2024-02".to_string(),
                sequence,
                date,
                amount: amount.clone(),
                name: format!("transfer {sequence}"),
                note: None,
                unique_import_id: None,
            })
            .await?;

        // Posted legs: one on the clearing account, one on the counterpart
        let absolute = amount.abs();
        let (clearing, counterpart) = if amount > BigDecimal::from(0) {
            (
                LedgerEntry::debit(
                    format!("{line_id}-clr"),
                    "clearing",
                    Some(line_id.clone()),
                    absolute.clone(),
                ),
                LedgerEntry::credit(format!("{line_id}-cp"), "receivable", Some(line_id), absolute),
            )
        } else {
            (
                LedgerEntry::credit(
                    format!("{line_id}-clr"),
                    "clearing",
                    Some(line_id.clone()),
                    absolute.clone(),
                ),
                LedgerEntry::debit(format!("{line_id}-cp"), "receivable", Some(line_id), absolute),
            )
        };
        storage.save_entry(&clearing).await?;
        storage.save_entry(&counterpart).await?;
    }
    println!("✓ Statement st-2024-02 created with 3 lines and posted entries\n");

    // 3. Confirming reconciles the clearing entries
    let mut manager = StatementManager::new(storage.clone());
    manager.confirm("st-2024-02").await?;
    for line in storage.get_lines("st-2024-02").await? {
        for entry in storage.entries_for_line(&line.id).await? {
            println!(
                "  {} on {:<10} reconciled: {}",
                entry.id,
                entry.account_id,
                entry.full_reconcile_id.is_some()
            );
        }
    }

    // 4. Reopening the statement undoes the reconciliation
    manager.reopen("st-2024-02").await?;
    let entry = storage.get_entry("st-2024-02-0-clr").await?;
    println!(
        "\n↩ After reopening, entry st-2024-02-0-clr reconciled: {}",
        entry.map(|e| e.full_reconcile_id.is_some()).unwrap_or(false)
    );

    Ok(())
}

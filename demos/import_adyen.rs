//! Adyen settlement import example

use bank_statement_core::utils::MemoryStorage;
use bank_statement_core::{
    Account, AdyenParser, Cell, Currency, ImportContext, Journal, StatementImporter,
    StatementStore, ADYEN_COLUMN_COUNT,
};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::str::FromStr;

fn text(value: &str) -> Cell {
    Cell::Text(value.to_string())
}

fn number(value: &str) -> Cell {
    Cell::Number(BigDecimal::from_str(value).unwrap())
}

/// A small settlement batch: two sales and the payout of their net proceeds.
fn settlement_rows() -> Vec<Vec<Cell>> {
    let mut header = vec![Cell::Empty; ADYEN_COLUMN_COUNT];
    header[1] = text("Company Account");

    let mut sale_a = vec![Cell::Empty; ADYEN_COLUMN_COUNT];
    sale_a[1] = text("DEMOCOMPANY");
    sale_a[2] = text("DEMOCOMPANY_EUR");
    sale_a[3] = text("8515131789");
    sale_a[6] = Cell::Date(NaiveDate::from_ymd_opt(2024, 2, 5).unwrap());
    sale_a[8] = text("Settled");
    sale_a[14] = text("EUR");
    sale_a[16] = number("120.00");
    sale_a[17] = number("2.50");
    sale_a[21] = text("visa");
    sale_a[23] = number("7");

    let mut sale_b = sale_a.clone();
    sale_b[3] = text("8515131790");
    sale_b[6] = Cell::Date(NaiveDate::from_ymd_opt(2024, 2, 6).unwrap());
    sale_b[16] = number("60.00");
    sale_b[17] = number("1.50");
    sale_b[21] = text("mc");

    let mut payout = vec![Cell::Empty; ADYEN_COLUMN_COUNT];
    payout[1] = text("DEMOCOMPANY");
    payout[2] = text("DEMOCOMPANY_EUR");
    payout[3] = text("payout");
    payout[6] = Cell::Date(NaiveDate::from_ymd_opt(2024, 2, 7).unwrap());
    payout[8] = text("MerchantPayout");
    payout[14] = text("EUR");
    payout[15] = number("180.00");
    payout[23] = number("7");

    vec![header, sale_a, sale_b, payout]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("📄 Bank Statement Core - Adyen Import Example\n");

    // 1. Configure the journal receiving this merchant account's batches
    let mut storage = MemoryStorage::new();
    storage
        .save_account(&Account::new("clearing", "Adyen clearing", true))
        .await?;
    storage
        .save_journal(
            &Journal::new("adyen-eur", "Adyen EUR", "clearing", Currency::new("EUR", 2))
                .with_merchant_account("DEMOCOMPANY_EUR"),
        )
        .await?;
    println!("✓ Journal 'adyen-eur' mapped to merchant account DEMOCOMPANY_EUR\n");

    // 2. Parse the settlement sheet
    let parser = AdyenParser::new(Currency::new("EUR", 2));
    let mut parsed = parser.parse_rows(&settlement_rows())?;
    println!(
        "📋 Parsed statement {}:\n{}\n",
        parsed.statements[0].statement_id,
        serde_json::to_string_pretty(&parsed.statements[0])?
    );

    // 3. Resolve the journal and import
    let mut importer = StatementImporter::new(storage.clone());
    importer.resolve_journals(&mut parsed.statements).await?;
    let created = importer.import(&ImportContext::new(), parsed).await?;

    for statement_id in &created {
        let lines = storage.get_lines(statement_id).await?;
        println!("💾 Imported statement {statement_id} with {} lines:", lines.len());
        for line in lines {
            println!("  {:>10}  {}  {}", line.amount.to_string(), line.date, line.name);
        }
    }

    Ok(())
}

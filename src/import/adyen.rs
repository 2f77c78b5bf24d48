//! Parser for Adyen settlement details exports
//!
//! Adyen delivers settlement batches as an xlsx workbook with a fixed
//! 31-column layout. The parser normalizes each transaction row, accumulates
//! the fee columns into one synthesized commission transaction, and checks
//! that the computed batch balance equals the merchant payout before anything
//! is handed to the importer. Any deviation from the fixed layout fails hard;
//! there is no column sniffing.

use std::io::Cursor;

use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use calamine::{Data, Reader, Xlsx};
use chrono::{Datelike, NaiveDate};

use crate::types::*;

/// Number of columns in an Adyen settlement details row
pub const ADYEN_COLUMN_COUNT: usize = 31;

/// Column 1 literal marking the header row
const HEADER_MARKER: &str = "Company Account";

/// Record type of payout rows, routed to the payout accumulator
const MERCHANT_PAYOUT: &str = "MerchantPayout";

/// Single spreadsheet cell, decoupled from the workbook reader
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(BigDecimal),
    Date(NaiveDate),
}

impl Cell {
    fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    fn as_text(&self) -> Option<String> {
        match self {
            Cell::Text(text) => Some(text.clone()),
            Cell::Number(number) => Some(number.clone().normalized().to_string()),
            Cell::Date(date) => Some(date.to_string()),
            Cell::Empty => None,
        }
    }

    fn as_amount(&self) -> Option<BigDecimal> {
        match self {
            Cell::Number(number) => Some(number.clone()),
            _ => None,
        }
    }

    fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(date) => Some(*date),
            _ => None,
        }
    }

    fn as_integer(&self) -> Option<i64> {
        match self {
            Cell::Number(number) => number.to_i64(),
            Cell::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    fn from_data(data: &Data) -> StatementResult<Cell> {
        Ok(match data {
            Data::Empty | Data::Error(_) | Data::DurationIso(_) => Cell::Empty,
            Data::String(text) => {
                if text.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(text.clone())
                }
            }
            Data::Bool(value) => Cell::Text(value.to_string()),
            Data::Int(value) => Cell::Number(BigDecimal::from(*value)),
            Data::Float(value) => Cell::Number(decimal_from_f64(*value)?),
            Data::DateTime(datetime) => match datetime.as_datetime() {
                Some(datetime) => Cell::Date(datetime.date()),
                None => Cell::Empty,
            },
            Data::DateTimeIso(text) => text
                .get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
                .map(Cell::Date)
                .unwrap_or(Cell::Empty),
        })
    }
}

/// Convert a float cell to a decimal amount
///
/// Rounded to six decimal places so that accumulating over many rows stays
/// exact; invariant checks still compare at currency precision.
fn decimal_from_f64(value: f64) -> StatementResult<BigDecimal> {
    BigDecimal::try_from(value)
        .map_err(|_| StatementError::Format(format!("Unreadable numeric cell value {value}")))
        .map(|decimal| decimal.with_scale_round(6, RoundingMode::HalfEven).normalized())
}

/// One transaction row of the settlement details layout
///
/// Field names follow the column titles of the export; only the columns the
/// import consumes are kept.
#[derive(Debug, Clone, PartialEq)]
struct AdyenRow {
    merchant_account: String,
    psp_reference: Option<String>,
    merchant_reference: Option<String>,
    creation_date: NaiveDate,
    record_type: String,
    modification_reference: Option<String>,
    net_currency: String,
    net_debit: Option<BigDecimal>,
    net_credit: Option<BigDecimal>,
    commission: Option<BigDecimal>,
    markup: Option<BigDecimal>,
    scheme_fees: Option<BigDecimal>,
    interchange: Option<BigDecimal>,
    payment_method_variant: Option<String>,
    batch_number: i64,
}

impl AdyenRow {
    fn from_cells(cells: &[Cell], row_number: usize) -> StatementResult<Self> {
        Ok(Self {
            merchant_account: required_text(cells, 2, "merchant account", row_number)?,
            psp_reference: cells[3].as_text(),
            merchant_reference: cells[4].as_text(),
            creation_date: cells[6].as_date().ok_or_else(|| {
                StatementError::Validation(format!("Row {row_number} has no creation date"))
            })?,
            // Trailing whitespace is routine in the type column.
            record_type: required_text(cells, 8, "record type", row_number)?
                .trim()
                .to_string(),
            modification_reference: cells[9].as_text(),
            net_currency: required_text(cells, 14, "net currency", row_number)?,
            net_debit: cells[15].as_amount(),
            net_credit: cells[16].as_amount(),
            commission: cells[17].as_amount(),
            markup: cells[18].as_amount(),
            scheme_fees: cells[19].as_amount(),
            interchange: cells[20].as_amount(),
            payment_method_variant: cells[21].as_text(),
            batch_number: cells[23].as_integer().ok_or_else(|| {
                StatementError::Validation(format!("Row {row_number} has no batch number"))
            })?,
        })
    }

    /// Signed settlement amount of the row: net credit side plus fee columns
    /// minus the net debit side
    fn settlement_amount(&self) -> BigDecimal {
        let debit = self.net_debit.clone().unwrap_or_else(|| BigDecimal::from(0));
        let credit = self
            .net_credit
            .clone()
            .unwrap_or_else(|| BigDecimal::from(0));
        -debit + credit + self.fee_total()
    }

    /// Sum of the commission, markup, scheme fees and interchange columns
    fn fee_total(&self) -> BigDecimal {
        let mut total = BigDecimal::from(0);
        for fee in [
            &self.commission,
            &self.markup,
            &self.scheme_fees,
            &self.interchange,
        ] {
            if let Some(amount) = fee {
                total += amount;
            }
        }
        total
    }

    /// Transaction label: psp reference, else merchant reference, else
    /// modification reference
    fn label(&self) -> String {
        self.psp_reference
            .clone()
            .or_else(|| self.merchant_reference.clone())
            .or_else(|| self.modification_reference.clone())
            .unwrap_or_default()
    }

    /// Free-form annotation joining the row's identifying values
    fn note(&self) -> String {
        let mut parts = vec![self.merchant_account.clone()];
        for value in [
            &self.psp_reference,
            &self.merchant_reference,
            &self.payment_method_variant,
        ] {
            if let Some(value) = value {
                parts.push(value.clone());
            }
        }
        parts.join(" ")
    }
}

fn required_text(
    cells: &[Cell],
    index: usize,
    field: &str,
    row_number: usize,
) -> StatementResult<String> {
    cells[index]
        .as_text()
        .ok_or_else(|| StatementError::Validation(format!("Row {row_number} has no {field}")))
}

/// Parser for Adyen settlement details workbooks
pub struct AdyenParser {
    company_currency: Currency,
}

impl AdyenParser {
    /// Create a parser checking balances at the given company currency's
    /// precision
    pub fn new(company_currency: Currency) -> Self {
        Self { company_currency }
    }

    /// Parse an xlsx settlement details export
    ///
    /// Fails with [`StatementError::Format`] when the bytes are not a
    /// readable workbook or the sheet does not carry the fixed Adyen layout,
    /// and with [`StatementError::Validation`] when the layout is recognized
    /// but a batch invariant is violated.
    pub fn parse(&self, data: &[u8]) -> StatementResult<ParsedImport> {
        let mut workbook = Xlsx::new(Cursor::new(data))
            .map_err(|error| StatementError::Format(error.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| StatementError::Format("Workbook has no sheets".to_string()))?
            .map_err(|error| StatementError::Format(error.to_string()))?;

        // Anchor rows at column A: the used range may start past empty
        // leading columns, but row positions are absolute in the layout.
        let start_column = range.start().map(|(_, col)| col as usize).unwrap_or(0);
        let mut rows = Vec::with_capacity(range.height());
        for row in range.rows() {
            let mut cells = vec![Cell::Empty; start_column];
            for data in row {
                cells.push(Cell::from_data(data)?);
            }
            rows.push(cells);
        }
        self.parse_rows(&rows)
    }

    /// Parse an already materialized cell grid
    ///
    /// The workbook-free entry point used by callers that hold sheet data in
    /// memory; [`parse`](Self::parse) delegates here after reading the file.
    pub fn parse_rows(&self, rows: &[Vec<Cell>]) -> StatementResult<ParsedImport> {
        let mut statement: Option<ParsedStatement> = None;
        let mut header_seen = false;
        let mut fees = BigDecimal::from(0);
        let mut balance = BigDecimal::from(0);
        let mut payout = BigDecimal::from(0);
        let mut last_batch = 0i64;

        for (index, cells) in rows.iter().enumerate() {
            let row_number = index + 1;
            if cells.len() != ADYEN_COLUMN_COUNT {
                return Err(StatementError::Format(format!(
                    "Unexpected row length {} instead of {} at row {}",
                    cells.len(),
                    ADYEN_COLUMN_COUNT,
                    row_number
                )));
            }
            if cells[1].is_empty() {
                continue;
            }
            if !header_seen {
                let marker = cells[1].as_text().unwrap_or_default();
                if marker != HEADER_MARKER {
                    return Err(StatementError::Format(format!(
                        "Unexpected header \"{marker}\" instead of \"{HEADER_MARKER}\""
                    )));
                }
                header_seen = true;
                continue;
            }

            let row = AdyenRow::from_cells(cells, row_number)?;
            let current = statement.get_or_insert_with(|| ParsedStatement {
                statement_id: format!(
                    "{} {}/{}",
                    row.merchant_account,
                    row.creation_date.year(),
                    row.batch_number
                ),
                name: format!(
                    "{} {}/{}",
                    row.merchant_account,
                    row.creation_date.year(),
                    row.batch_number
                ),
                date: row.creation_date,
                local_currency: row.net_currency.clone(),
                local_account: Some(row.merchant_account.clone()),
                journal_id: None,
                transactions: Vec::new(),
            });
            if row.creation_date < current.date {
                current.date = row.creation_date;
            }

            let amount = row.settlement_amount();
            if row.record_type == MERCHANT_PAYOUT {
                payout -= &amount;
            } else {
                balance += &amount;
            }
            current.transactions.push(ParsedTransaction {
                unique_import_id: format!(
                    "{}{:04}",
                    current.statement_id,
                    current.transactions.len()
                ),
                date: row.creation_date,
                amount,
                name: row.label(),
                note: Some(row.note()),
            });
            fees += row.fee_total();
            last_batch = row.batch_number;
        }

        if !header_seen {
            return Err(StatementError::Format(
                "Did not encounter a header row".to_string(),
            ));
        }
        let mut statement = statement.ok_or_else(|| {
            StatementError::Validation("Statement has no transactions".to_string())
        })?;

        if fees != BigDecimal::from(0) {
            let date = statement
                .transactions
                .iter()
                .map(|transaction| transaction.date)
                .max()
                .unwrap_or(statement.date);
            statement.transactions.push(ParsedTransaction {
                unique_import_id: format!(
                    "{}{:04}",
                    statement.statement_id,
                    statement.transactions.len()
                ),
                date,
                amount: -fees.clone(),
                name: format!("Commission, markup etc. batch {last_batch}"),
                note: None,
            });
            balance -= &fees;
        }

        if !statement.transactions.is_empty() && self.company_currency.is_zero(&payout) {
            return Err(StatementError::Validation(
                "No payout detected in Adyen statement".to_string(),
            ));
        }
        if !self.company_currency.amounts_equal(&balance, &payout) {
            return Err(StatementError::Validation(format!(
                "Balance {} not equal to merchant payout {}",
                self.company_currency.round(&balance),
                self.company_currency.round(&payout)
            )));
        }

        Ok(ParsedImport {
            currency_code: statement.local_currency.clone(),
            account_number: None,
            statements: vec![statement],
        })
    }
}

use folio_core::{normalize_amount, normalize_date, Transaction};

use crate::error::{ParseError, Result};
use crate::format::{ParseOptions, ParsedBatch};
use crate::util::{looks_like_date, re};

/// Lines inspected when choosing between comma and tab.
const DELIMITER_SAMPLE_LINES: usize = 10;
/// Rows inspected when classifying the table.
const STYLE_SAMPLE_ROWS: usize = 8;

re!(re_bank_table_header, r"^date[, ]+description");
// A description that is only a statement summary label, e.g. "Total",
// "Total debits", "Ending balance as of 01/31/2024".
re!(
    re_summary_label,
    r"(?i)^(totals?|ending balance|beginning balance)(\s+(credits|debits|deposits|withdrawals|for\s.*|as of\s.*))?\s*:?$"
);

/// The three delimited layouts in circulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvStyle {
    /// Checking/savings export: summary block, then `Date,Description,...`.
    Bank,
    /// Card export keyed by posted date and reference number.
    Credit,
    /// Already in the output schema.
    Quicken,
}

pub fn detect_delimiter(lines: &[&str]) -> u8 {
    let tabs: usize = lines.iter().map(|l| l.matches('\t').count()).sum();
    let commas: usize = lines.iter().map(|l| l.matches(',').count()).sum();
    if tabs > commas {
        b'\t'
    } else {
        b','
    }
}

/// Split the whole input into trimmed fields, dropping rows that are blank
/// in every field. Returns the rows and the delimiter used.
pub fn load_rows(text: &str, delimiter: Option<u8>) -> Result<(Vec<Vec<String>>, u8)> {
    let delimiter = delimiter.unwrap_or_else(|| {
        let sample: Vec<&str> = text.lines().take(DELIMITER_SAMPLE_LINES).collect();
        detect_delimiter(&sample)
    });

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .quote(b'"')
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let fields: Vec<String> = record.iter().map(|f| f.trim().to_string()).collect();
        if fields.iter().any(|f| !f.is_empty()) {
            rows.push(fields);
        }
    }
    Ok((rows, delimiter))
}

pub fn detect_style(rows: &[Vec<String>]) -> Result<CsvStyle> {
    let Some(first) = rows.first() else {
        return Err(ParseError::empty("CSV"));
    };
    let header = first.join(" ").to_lowercase();
    let sample = rows
        .iter()
        .take(STYLE_SAMPLE_ROWS)
        .map(|r| r.join(" ").to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let style = if header.contains("fi payee") && header.contains("debit/credit") {
        CsvStyle::Quicken
    } else if header.contains("posted date") || header.contains("reference number") {
        CsvStyle::Credit
    } else if header.contains("running bal")
        || sample.contains("running balance")
        || sample.contains("beginning balance")
    {
        CsvStyle::Bank
    } else {
        tracing::debug!("Unrecognised CSV header: {first:?}");
        return Err(ParseError::Detection(
            "CSV header matches no bank, credit or quicken layout".to_string(),
        ));
    };
    tracing::debug!("Detected {style:?} CSV layout");
    Ok(style)
}

pub fn parse(text: &str, opts: &ParseOptions) -> Result<ParsedBatch> {
    let (rows, _) = load_rows(text, opts.delimiter)?;
    let batch = match detect_style(&rows)? {
        CsvStyle::Bank => parse_bank(&rows, &opts.account),
        CsvStyle::Credit => parse_credit(&rows, &opts.account),
        CsvStyle::Quicken => parse_quicken(&rows, &opts.account),
    };
    Ok(batch)
}

fn record(date: &str, payee: &str, amount: &str, account: &str) -> Transaction {
    Transaction::new(
        normalize_date(date),
        payee,
        &normalize_amount(amount),
        account,
    )
}

fn parse_bank(rows: &[Vec<String>], account: &str) -> ParsedBatch {
    let mut batch = ParsedBatch::default();
    let mut amount_col: Option<usize> = None;
    let mut in_table = false;

    for (idx, parts) in rows.iter().enumerate() {
        let joined = parts.join(" ").to_lowercase();

        if re_bank_table_header().is_match(&joined) {
            in_table = true;
            amount_col = parts.iter().position(|p| p.eq_ignore_ascii_case("amount"));
            tracing::debug!("Bank table starts at row {idx}");
            continue;
        }
        if !in_table {
            continue;
        }

        let is_dated = looks_like_date(&parts[0]);
        let summary_label = parts.get(1).is_some_and(|d| re_summary_label().is_match(d.trim()));
        if joined.contains("running bal")
            || joined.contains("balance as of")
            || summary_label
            || (joined.contains("total") && !is_dated)
        {
            tracing::debug!("Skipping summary row {idx}: {parts:?}");
            batch.skipped += 1;
            continue;
        }

        if parts.len() >= 2 && is_dated {
            let amount = amount_col
                .and_then(|c| parts.get(c))
                .or(parts.last())
                .map(String::as_str)
                .unwrap_or_default();
            batch.records.push(record(&parts[0], &parts[1], amount, account));
        } else {
            tracing::debug!("Unrecognised bank row {idx}: {parts:?}");
            batch.skipped += 1;
        }
    }
    batch
}

fn parse_credit(rows: &[Vec<String>], account: &str) -> ParsedBatch {
    let mut batch = ParsedBatch::default();
    let mut header_seen = false;

    for (idx, parts) in rows.iter().enumerate() {
        if !header_seen {
            let joined = parts.join(" ").to_lowercase();
            header_seen = joined.contains("posted date") || joined.contains("reference number");
            continue;
        }
        if parts.len() < 3 || !looks_like_date(&parts[0]) {
            tracing::debug!("Skipping credit row {idx}: {parts:?}");
            batch.skipped += 1;
            continue;
        }
        let amount = parts.last().map(String::as_str).unwrap_or_default();
        batch.records.push(record(&parts[0], &parts[2], amount, account));
    }
    batch
}

/// Rows already carry the output columns; map them by header name. Rows
/// without an account get the supplied one.
fn parse_quicken(rows: &[Vec<String>], account: &str) -> ParsedBatch {
    let mut batch = ParsedBatch::default();
    let Some((header, body)) = rows.split_first() else {
        return batch;
    };

    for parts in body {
        let mut tx = Transaction::default();
        for (name, value) in header.iter().zip(parts) {
            tx.set_column(name, value);
        }
        if tx.amount.is_empty() {
            tx.amount = normalize_amount("");
        }
        if tx.account.is_empty() {
            tx.account = account.to_string();
        }
        batch.records.push(tx);
    }
    batch
}

/// Read a file already in the output schema, such as a register export or
/// an earlier run's output. No account is injected.
pub fn read_quicken_csv(text: &str) -> Result<Vec<Transaction>> {
    let (rows, _) = load_rows(text, None)?;
    Ok(parse_quicken(&rows, "").records)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANK: &str = "\
Description,,Summary Amt.
Beginning balance as of 01/01/2024,,\"1,000.00\"
Total credits,,\"1,500.00\"

Date,Description,Amount,Running Bal.
01/01/2024,Beginning balance as of 01/01/2024,,\"1,000.00\"
01/02/2024,\"COFFEE SHOP\",\"-4.50\",\"995.50\"
01/03/2024,\"PAYROLL TOTAL COMP\",\"1,500.00\",\"2,495.50\"
not a row,,,
";

    const CREDIT: &str = "\
Posted Date,Reference Number,Payee,Address,Amount
01/15/2024,2469216,AMAZON MKTPL,SEATTLE WA,-49.99
bad,row
01/16/2024,2469217,PAYMENT - THANK YOU,,500.00
";

    const QUICKEN: &str = "\
Date,Payee,FI Payee,Amount,Debit/Credit,Category,Account,Tag,Memo,Chknum
1/2/2024,COFFEE SHOP,,-45.00,,Dining,Checking,,,
1/3/2024,RENT,,1200.00,Debit,Housing,,recurring,Jan,1001
";

    // ── delimiter & style detection ───────────────────────────────────────────

    #[test]
    fn tab_wins_only_when_more_frequent() {
        assert_eq!(detect_delimiter(&["a\tb\tc", "d,e"]), b'\t');
        assert_eq!(detect_delimiter(&["a\tb", "c,d"]), b',');
        assert_eq!(detect_delimiter(&[]), b',');
    }

    #[test]
    fn blank_rows_are_dropped_and_fields_trimmed() {
        let (rows, delim) = load_rows("a , b\n,,\n\n c,d \n", None).unwrap();
        assert_eq!(delim, b',');
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn explicit_delimiter_overrides_detection() {
        let (rows, delim) = load_rows("a,b\tc\n", Some(b'\t')).unwrap();
        assert_eq!(delim, b'\t');
        assert_eq!(rows, vec![vec!["a,b", "c"]]);
    }

    #[test]
    fn styles() {
        let style = |t: &str| detect_style(&load_rows(t, None).unwrap().0);
        assert_eq!(style(BANK).unwrap(), CsvStyle::Bank);
        assert_eq!(style(CREDIT).unwrap(), CsvStyle::Credit);
        assert_eq!(style(QUICKEN).unwrap(), CsvStyle::Quicken);
        assert!(matches!(style("x,y\n1,2\n"), Err(ParseError::Detection(_))));
        assert!(matches!(style(""), Err(ParseError::Empty { .. })));
    }

    // ── per-style parsing ─────────────────────────────────────────────────────

    #[test]
    fn bank_rows_after_header_only() {
        let batch = parse(BANK, &ParseOptions::new("Checking")).unwrap();
        assert_eq!(batch.records.len(), 2);

        let coffee = &batch.records[0];
        assert_eq!(coffee.date.to_string(), "1/2/2024");
        assert_eq!(coffee.payee, "COFFEE SHOP");
        assert_eq!(coffee.amount, "-4.50");
        assert_eq!(coffee.account, "Checking");

        // "total" inside a dated row's payee does not make it a summary line.
        assert_eq!(batch.records[1].payee, "PAYROLL TOTAL COMP");
        assert_eq!(batch.records[1].amount, "1500.00");
        // opening balance row and trailing junk
        assert_eq!(batch.skipped, 2);
    }

    #[test]
    fn dated_total_row_is_a_summary() {
        let text = "\
Date,Description,Amount,Running Bal.
01/02/2024,TOTAL WINE & MORE,-45.00,55.00
01/31/2024,Total,-45.00,55.00
01/31/2024,Total debits,-45.00,
01/31/2024,Ending Balance,,55.00
";
        let batch = parse(text, &ParseOptions::new("Checking")).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].payee, "TOTAL WINE & MORE");
        assert_eq!(batch.skipped, 3);
    }

    #[test]
    fn credit_payee_is_third_field_amount_is_last() {
        let batch = parse(CREDIT, &ParseOptions::new("Visa")).unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[0].payee, "AMAZON MKTPL");
        assert_eq!(batch.records[0].amount, "-49.99");
        assert_eq!(batch.records[1].date.to_string(), "1/16/2024");
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn quicken_passes_through() {
        let batch = parse(QUICKEN, &ParseOptions::new("Fallback")).unwrap();
        assert_eq!(batch.records.len(), 2);
        let rent = &batch.records[1];
        assert_eq!(rent.category, "Housing");
        assert_eq!(rent.account, "Fallback");
        assert_eq!(rent.tag, "recurring");
        assert_eq!(rent.check_number, "1001");
        assert_eq!(rent.debit_credit, Some(folio_core::DebitCredit::Debit));
        assert_eq!(batch.records[0].account, "Checking");
    }

    #[test]
    fn quicken_reader_leaves_account_alone() {
        let records = read_quicken_csv(QUICKEN).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].account, "Checking");
        assert_eq!(records[1].account, "");
        assert_eq!(records[1].amount, "1200.00");
    }
}

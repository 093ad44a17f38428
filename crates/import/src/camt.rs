use chrono::{NaiveDate, NaiveDateTime};
use folio_core::{normalize_amount, Transaction, TxnDate};
use roxmltree::{Document, Node, ParsingOptions};

use crate::error::{ParseError, Result};
use crate::format::{ParseOptions, ParsedBatch};
use crate::xml;

const LABEL: &str = "CAMT.053";

/// ISO 20022 dates come as plain dates or as date-times with or without a
/// zone designator.
fn parse_iso_date(raw: &str) -> TxnDate {
    let raw = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.into();
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return dt.date_naive().into();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.date().into();
    }
    TxnDate::Raw(raw.to_string())
}

struct StatementAccount {
    id: String,
    currency: String,
}

fn statement_account(stmt: Node, ns: Option<&str>, fallback: &str) -> StatementAccount {
    let acct = xml::child(stmt, ns, "Acct");
    let id = acct
        .map(|a| xml::first_text(a, ns, &[&["Id", "Othr", "Id"], &["Id", "IBAN"]]))
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| fallback.to_string());
    let currency = acct
        .map(|a| xml::path_text(a, ns, &["Ccy"]))
        .unwrap_or_default();
    StatementAccount { id, currency }
}

fn entry_payee(entry: Node, ns: Option<&str>) -> String {
    let party = xml::descendants(entry, ns, "RltdPties")
        .map(|p| {
            xml::first_text(
                p,
                ns,
                &[
                    &["Dbtr", "Nm"],
                    &["Dbtr", "Pty", "Nm"],
                    &["Cdtr", "Nm"],
                    &["Cdtr", "Pty", "Nm"],
                ],
            )
        })
        .find(|name| !name.is_empty());
    party.unwrap_or_else(|| {
        xml::first_text(
            entry,
            ns,
            &[&["BkTxCd", "Prtry", "Cd"], &["BkTxCd", "Domn", "Fmly", "Cd"]],
        )
    })
}

fn entry_memo(entry: Node, ns: Option<&str>) -> String {
    let additional = xml::descendants(entry, ns, "AddtlTxInf")
        .filter_map(|n| n.text())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string);
    let remittance = || {
        xml::descendants(entry, ns, "RmtInf")
            .map(|r| xml::path_text(r, ns, &["Ustrd"]))
            .find(|s| !s.is_empty())
    };
    additional.or_else(remittance).unwrap_or_default()
}

fn to_record(entry: Node, ns: Option<&str>, account: &StatementAccount) -> Transaction {
    let amt = xml::child(entry, ns, "Amt");
    let amount_text = amt.and_then(|a| a.text()).unwrap_or_default();
    let currency = amt
        .and_then(|a| a.attribute("Ccy"))
        .map(str::to_string)
        .unwrap_or_else(|| account.currency.clone());

    let indicator = xml::path_text(entry, ns, &["CdtDbtInd"]).to_uppercase();
    let mut amount = normalize_amount(amount_text);
    if indicator == "DBIT" && !amount.starts_with('-') {
        amount = format!("-{}", amount.trim_start_matches('+'));
    }

    let raw_date = xml::first_text(
        entry,
        ns,
        &[&["ValDt", "Dt"], &["BookgDt", "Dt"], &["BookgDt", "DtTm"]],
    );
    let date = if raw_date.is_empty() {
        TxnDate::empty()
    } else {
        parse_iso_date(&raw_date)
    };

    let mut tx = Transaction::new(date, &entry_payee(entry, ns), &amount, &account.id);
    tx.debit_credit = indicator.parse().ok();
    tx.memo = entry_memo(entry, ns);
    tx.check_number = xml::path_text(entry, ns, &["NtryRef"]);
    tx.currency = Some(currency).filter(|c| !c.is_empty());
    tx
}

pub fn parse(text: &str, opts: &ParseOptions) -> Result<ParsedBatch> {
    if !text.contains("<Document") || !text.contains("camt.053") {
        return Err(ParseError::MissingMarker {
            format: LABEL,
            reason: "missing <Document> with camt.053".to_string(),
        });
    }

    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(text, options)
        .map_err(|e| ParseError::from_xml(LABEL, text, &e))?;
    let ns = doc.root_element().tag_name().namespace();

    let mut batch = ParsedBatch::default();
    for stmt in xml::descendants(doc.root(), ns, "Stmt") {
        let account = statement_account(stmt, ns, &opts.account);
        for entry in xml::children(stmt, ns, "Ntry") {
            batch.records.push(to_record(entry, ns, &account));
        }
    }

    if batch.records.is_empty() {
        return Err(ParseError::Empty {
            format: LABEL,
            hint: " (check the document namespace)",
        });
    }
    Ok(batch)
}

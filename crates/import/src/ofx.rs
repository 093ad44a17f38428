use chrono::NaiveDate;
use folio_core::{normalize_amount, Transaction, TxnDate};
use roxmltree::{Document, Node, ParsingOptions};

use crate::error::{ParseError, Result};
use crate::format::{ParseOptions, ParsedBatch};
use crate::util::re;
use crate::xml;

/// OFX dialects. They share markup and differ only in which fields are
/// trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfxVariant {
    /// OFX and QFX.
    Generic,
    /// QuickBooks Web Connect.
    Qbo,
    /// Microsoft Money OFX 1.02.
    MsMoney,
}

impl OfxVariant {
    fn label(self) -> &'static str {
        match self {
            OfxVariant::Generic => "OFX/QFX",
            OfxVariant::Qbo => "QBO",
            OfxVariant::MsMoney => "Microsoft Money OFX",
        }
    }

    fn keeps_memo(self) -> bool {
        !matches!(self, OfxVariant::Generic)
    }
}

re!(re_open_tag_value, r"^<([A-Za-z0-9_.-]+)>([^<]+)$");

const ENTITIES: [&str; 5] = ["amp;", "lt;", "gt;", "apos;", "quot;"];

/// Escape every `&` that does not already start a predefined entity.
pub fn escape_ampersands(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for (i, c) in line.char_indices() {
        if c == '&' && !ENTITIES.iter().any(|e| line[i + 1..].starts_with(e)) {
            out.push_str("&amp;");
        } else {
            out.push(c);
        }
    }
    out
}

/// Break a line before every `<`, so `<A>1<B>2` yields `<A>1`, `<B>2`.
fn split_tags(line: &str) -> Vec<&str> {
    let mut cuts: Vec<usize> = line.match_indices('<').map(|(i, _)| i).collect();
    if cuts.first() != Some(&0) {
        cuts.insert(0, 0);
    }
    cuts.push(line.len());
    cuts.windows(2)
        .map(|w| &line[w[0]..w[1]])
        .filter(|s| !s.is_empty())
        .collect()
}

/// Turn loose OFX SGML into well-formed XML: blank lines go, bare `&` are
/// escaped, and `<TAG>value` without a matching end tag is closed.
pub fn repair_sgml(data: &str) -> String {
    let mut fixed_lines = Vec::new();
    for raw in data.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let line = escape_ampersands(line);
        let segments = split_tags(&line);

        let mut fixed = String::with_capacity(line.len() + 16);
        for (i, seg) in segments.iter().enumerate() {
            let closed = re_open_tag_value().captures(seg).and_then(|c| {
                let (tag, value) = (&c[1], c[2].trim());
                let explicit_end = segments
                    .get(i + 1)
                    .is_some_and(|next| next.trim_end() == format!("</{tag}>"));
                (!value.is_empty() && !explicit_end).then(|| format!("<{tag}>{value}</{tag}>"))
            });
            match closed {
                Some(s) => fixed.push_str(&s),
                None => fixed.push_str(seg),
            }
        }
        fixed_lines.push(fixed);
    }
    fixed_lines.join("\n")
}

/// `YYYYMMDD` prefix of an OFX datetime; time and zone suffixes are ignored.
fn parse_ofx_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Some(d) = s
        .get(..8)
        .and_then(|ymd| NaiveDate::parse_from_str(ymd, "%Y%m%d").ok())
    {
        return Some(d);
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    None
}

fn statement_currency(banklist: Node) -> Option<String> {
    banklist
        .parent_element()
        .map(|stmt| xml::path_text(stmt, None, &["CURDEF"]))
        .filter(|c| !c.is_empty())
}

fn to_record(trn: Node, variant: OfxVariant, account: &str, currency: &Option<String>) -> Transaction {
    let text = |tag: &str| xml::path_text(trn, None, &[tag]);

    let posted = text("DTPOSTED");
    let date = match parse_ofx_date(&posted) {
        Some(d) => TxnDate::Parsed(d),
        None => TxnDate::Raw(posted),
    };
    let name = text("NAME");
    let payee = if name.is_empty() {
        text("TRNTYPE").to_uppercase()
    } else {
        name
    };

    let mut tx = Transaction::new(date, &payee, &normalize_amount(&text("TRNAMT")), account);
    if variant.keeps_memo() {
        tx.memo = text("MEMO");
    }
    tx.check_number = text("CHECKNUM");
    tx.currency = currency.clone();
    tx
}

pub fn parse(data: &str, variant: OfxVariant, opts: &ParseOptions) -> Result<ParsedBatch> {
    let start = data.find("<OFX>").ok_or_else(|| ParseError::MissingMarker {
        format: variant.label(),
        reason: "no <OFX> tag found".to_string(),
    })?;

    let xml_data = repair_sgml(&data[start..]);
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(&xml_data, options)
        .map_err(|e| ParseError::from_xml(variant.label(), &xml_data, &e))?;

    let mut batch = ParsedBatch::default();
    for banklist in xml::descendants(doc.root(), None, "BANKTRANLIST") {
        let currency = statement_currency(banklist);
        for trn in xml::descendants(banklist, None, "STMTTRN") {
            batch
                .records
                .push(to_record(trn, variant, &opts.account, &currency));
        }
    }

    if batch.records.is_empty() {
        return Err(ParseError::empty(variant.label()));
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── unit helpers ──────────────────────────────────────────────────────────

    #[test]
    fn parse_ofx_date_8digit() {
        assert_eq!(
            parse_ofx_date("20240115"),
            Some(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
        );
    }

    #[test]
    fn parse_ofx_date_with_time_suffix_ignored() {
        assert_eq!(
            parse_ofx_date("20240115120000[-5:EST]"),
            Some(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
        );
    }

    #[test]
    fn parse_ofx_date_invalid_returns_none() {
        assert_eq!(parse_ofx_date("not-a-date"), None);
        assert_eq!(parse_ofx_date(""), None);
    }

    #[test]
    fn ampersands_outside_entities_are_escaped() {
        assert_eq!(escape_ampersands("<NAME>AT&T"), "<NAME>AT&amp;T");
        assert_eq!(escape_ampersands("B&amp;N &lt;x&gt;"), "B&amp;N &lt;x&gt;");
        assert_eq!(escape_ampersands("a & b&"), "a &amp; b&amp;");
    }

    #[test]
    fn repair_closes_value_tags_only() {
        let fixed = repair_sgml("<STMTTRN>\n\n<TRNAMT> -12.50 \n<NAME>A&B\n<MEMO>x</MEMO>\n</STMTTRN>");
        assert_eq!(
            fixed,
            "<STMTTRN>\n<TRNAMT>-12.50</TRNAMT>\n<NAME>A&amp;B</NAME>\n<MEMO>x</MEMO>\n</STMTTRN>"
        );
    }

    #[test]
    fn repair_handles_dotted_tags_and_single_line_sgml() {
        assert_eq!(repair_sgml("<INTU.BID>3000"), "<INTU.BID>3000</INTU.BID>");
        assert_eq!(
            repair_sgml("<STMTTRN><TRNTYPE>DEBIT<TRNAMT>-1.00</STMTTRN>"),
            "<STMTTRN><TRNTYPE>DEBIT</TRNTYPE><TRNAMT>-1.00</TRNAMT></STMTTRN>"
        );
    }

    // ── full statement parse ──────────────────────────────────────────────────

    const SAMPLE_OFX: &str = r#"
OFXHEADER:100
DATA:OFXSGML
VERSION:102

<OFX>
<BANKMSGSRSV1>
<STMTTRNRS>
<STMTRS>
<CURDEF>USD
<BANKACCTFROM>
<BANKID>123456789
<ACCTID>000112345
<ACCTTYPE>CHECKING
</BANKACCTFROM>
<BANKTRANLIST>
<DTSTART>20240101
<DTEND>20240131
<STMTTRN>
<TRNTYPE>DEBIT
<DTPOSTED>20240115120000
<TRNAMT>-12.50
<FITID>TXN001
<NAME>AMAZON MARKETPLACE
<MEMO>Online purchase
</STMTTRN>
<STMTTRN>
<TRNTYPE>CREDIT
<DTPOSTED>20240120
<TRNAMT>1,500.00
<FITID>TXN002
<CHECKNUM>204
</STMTTRN>
</BANKTRANLIST>
</STMTRS>
</STMTTRNRS>
</BANKMSGSRSV1>
</OFX>
"#;

    fn parse_sample(variant: OfxVariant) -> ParsedBatch {
        parse(SAMPLE_OFX, variant, &ParseOptions::new("Checking")).unwrap()
    }

    #[test]
    fn parse_loose_statement() {
        let batch = parse_sample(OfxVariant::Generic);
        assert_eq!(batch.records.len(), 2);

        let t0 = &batch.records[0];
        assert_eq!(t0.date.to_string(), "1/15/2024");
        assert_eq!(t0.amount, "-12.50");
        assert_eq!(t0.payee, "AMAZON MARKETPLACE");
        assert_eq!(t0.account, "Checking");
        assert_eq!(t0.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn missing_name_falls_back_to_type() {
        let t1 = &parse_sample(OfxVariant::Generic).records[1];
        assert_eq!(t1.payee, "CREDIT");
        assert_eq!(t1.amount, "1500.00");
        assert_eq!(t1.check_number, "204");
    }

    #[test]
    fn memo_depends_on_variant() {
        assert_eq!(parse_sample(OfxVariant::Generic).records[0].memo, "");
        assert_eq!(parse_sample(OfxVariant::Qbo).records[0].memo, "Online purchase");
        assert_eq!(parse_sample(OfxVariant::MsMoney).records[0].memo, "Online purchase");
    }

    #[test]
    fn missing_ofx_root_errors() {
        let err = parse("<STMTTRN>", OfxVariant::Generic, &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::MissingMarker { .. }));
    }

    #[test]
    fn unrepairable_markup_reports_position() {
        let bad = "<OFX>\n<BANKTRANLIST>\n<STMTTRN>\n<TRNAMT>1\n</STMTTRN>\n</OFX>";
        match parse(bad, OfxVariant::Generic, &ParseOptions::default()).unwrap_err() {
            ParseError::Structural { line, context, .. } => {
                assert_eq!(line, 6);
                assert!(context.contains("   6: </OFX>"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn statement_without_transactions_errors() {
        let empty = "<OFX>\n<BANKTRANLIST>\n<DTSTART>20240101\n</BANKTRANLIST>\n</OFX>";
        let err = parse(empty, OfxVariant::Qbo, &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::Empty { format: "QBO", .. }));
    }
}

use crate::format::Format;
use crate::util::re;

/// Bytes of leading input the sniffer looks at.
pub const SNIFF_LIMIT: usize = 8192;

re!(re_qif_type_header, r"(?i)^!type:\w+");
re!(re_qif_date_line, r"(?m)^D\d{1,2}/\d{1,2}['/]\s?\d{2,4}");
re!(re_qif_amount_line, r"(?m)^T[-+]?\d");
re!(re_txf_amount_line, r"(?m)^\$");
re!(re_txf_date_line, r"(?m)^D\d{1,2}/\d{1,2}/\d{2,4}");
re!(re_date_token, r"\d{1,2}/\d{1,2}/\d{2,4}");
re!(re_tabular_keyword, r"\b(date|posted|running balance)\b");
re!(re_beancount_header, r"(?m)^\d{4}-\d{2}-\d{2}\s+[*!]");
re!(re_beancount_posting, r"(?m)^[ \t]{2,}\S");

/// Guess the format of a byte sample. Only the first [`SNIFF_LIMIT`] bytes
/// are examined; the caller keeps ownership of the full input.
pub fn sniff(sample: &[u8]) -> Format {
    let sample = &sample[..sample.len().min(SNIFF_LIMIT)];
    sniff_text(&String::from_utf8_lossy(sample))
}

/// The ordered detection cascade. First matching probe wins; nothing
/// matching means delimited text.
pub fn sniff_text(text: &str) -> Format {
    let sample = text.trim_start_matches('\u{feff}').trim();
    let lower = sample.to_lowercase();
    tracing::debug!(
        "Sniffing {} chars, starting {:?}",
        sample.len(),
        sample.chars().take(60).collect::<String>()
    );

    let format = if is_qif(sample) {
        Format::Qif
    } else if is_txf(sample, &lower) {
        Format::Txf
    } else if let Some(ofx) = ofx_family(&lower) {
        ofx
    } else if lower.contains("microsoft money") || lower.contains("msmoney") {
        Format::MsMoney
    } else if is_tabular(sample, &lower) {
        Format::Csv
    } else if re_beancount_header().is_match(sample) && re_beancount_posting().is_match(sample) {
        Format::Beancount
    } else if lower.contains("<gnc:transaction") || lower.contains("<gnc-v2") {
        Format::GnuCash
    } else if lower.contains("<document") && lower.contains("camt.053") {
        Format::Camt053
    } else if lower.contains("<?xml") {
        // Any remaining XML is assumed to be a GnuCash book.
        Format::GnuCash
    } else {
        Format::Csv
    };

    tracing::debug!("Sniffed input as {format}");
    format
}

fn is_qif(sample: &str) -> bool {
    re_qif_type_header().is_match(sample)
        || (re_qif_date_line().is_match(sample)
            && re_qif_amount_line().is_match(sample)
            && sample.contains('^'))
}

fn is_txf(sample: &str, lower: &str) -> bool {
    sample.starts_with('V')
        && sample.contains('^')
        && re_txf_amount_line().is_match(sample)
        && (lower.contains("tdate") || re_txf_date_line().is_match(sample))
}

fn ofx_family(lower: &str) -> Option<Format> {
    if lower.contains("<ofx>") {
        return Some(if lower.contains("intuit") || lower.contains("webconnect") {
            Format::Qbo
        } else if lower.contains("money") || lower.contains("microsoft") {
            Format::MsMoney
        } else {
            Format::Ofx
        });
    }
    ["<stmttrn>", "<banktranlist>", "<trnlist>"]
        .iter()
        .any(|tag| lower.contains(tag))
        .then_some(Format::Ofx)
}

fn is_tabular(sample: &str, lower: &str) -> bool {
    (sample.contains(',') || sample.contains('\t'))
        && (re_date_token().is_match(sample) || re_tabular_keyword().is_match(lower))
}

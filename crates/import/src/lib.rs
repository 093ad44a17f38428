pub mod beancount;
pub mod camt;
pub mod consolidate;
pub mod delimited;
pub mod emit;
pub mod error;
pub mod format;
pub mod gnucash;
pub mod input;
pub mod learn;
pub mod ofx;
pub mod pipeline;
pub mod qif;
pub mod reconcile;
pub mod rules;
pub mod sniff;
pub mod txf;
pub(crate) mod util;
pub(crate) mod xml;

pub use consolidate::{strict_key, ConsolidateOptions, Consolidator, DedupeStrategy, FUZZY_WINDOW};
pub use delimited::CsvStyle;
pub use emit::{write_beancount, write_csv, write_qif, Compliance, EmitError};
pub use error::{ParseError, Result};
pub use format::{Format, ParseOptions, ParsedBatch};
pub use input::{InputSource, StdinSnapshot};
pub use learn::RuleLearner;
pub use ofx::OfxVariant;
pub use pipeline::{infer_format, ImportOptions, LoadedInput, Pipeline, RunOutput};
pub use reconcile::{ReconcileReport, Reconciler};
pub use rules::{Polarity, Rule, RuleClass, RuleConfig, RuleEngine, RuleError, RuleOptions};
pub use sniff::{sniff, SNIFF_LIMIT};

pub mod import {
    use crate::*;

    /// Parse in-memory statement bytes, sniffing the format when none is given.
    pub fn import_bytes(
        data: &[u8],
        format: Option<Format>,
        account: &str,
    ) -> Result<ParsedBatch> {
        let format = format.unwrap_or_else(|| sniff(data));
        format.parse(data, &ParseOptions::new(account))
    }

    /// Parse a statement file, inferring its format from extension or content.
    pub fn import_file(path: &std::path::Path, account: &str) -> Result<LoadedInput> {
        let source = InputSource::Path(path.to_path_buf());
        let mut stdin = StdinSnapshot::from_reader(std::io::empty());
        pipeline::load(&source, &mut stdin, None, &ImportOptions::new(account))
    }

    pub fn create_consolidator(dedupe: bool, strategy: DedupeStrategy, max_date_drift: i64) -> Consolidator {
        Consolidator::new(ConsolidateOptions {
            dedupe,
            strategy,
            max_date_drift,
        })
    }
}

use folio_core::Transaction;

use crate::consolidate::{ConsolidateOptions, Consolidator};
use crate::error::Result;
use crate::format::{Format, ParseOptions, ParsedBatch};
use crate::input::{read_source, InputSource, StdinSnapshot};
use crate::rules::RuleEngine;
use crate::sniff::sniff;

/// Per-run import settings shared by every input.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub account: String,
    /// Skip inference and parse the primary input as this format.
    pub format: Option<Format>,
    pub delimiter: Option<u8>,
}

impl ImportOptions {
    pub fn new(account: &str) -> Self {
        Self {
            account: account.to_string(),
            ..Default::default()
        }
    }

    fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            account: self.account.clone(),
            delimiter: self.delimiter,
        }
    }
}

/// Pick a format: an explicit choice first, then the file extension, then
/// the content. Standard input has no extension and is always sniffed.
pub fn infer_format(source: &InputSource, explicit: Option<Format>, data: &[u8]) -> Format {
    if let Some(format) = explicit {
        return format;
    }
    if let Some(format) = source.extension().as_deref().and_then(Format::from_extension) {
        tracing::debug!("Inferred {format} from extension of {}", source.label());
        return format;
    }
    let format = sniff(data);
    tracing::info!("Detected input type: {format}");
    format
}

#[derive(Debug)]
pub struct LoadedInput {
    pub label: String,
    pub format: Format,
    pub batch: ParsedBatch,
}

/// Read, classify and parse one input.
pub fn load(
    source: &InputSource,
    stdin: &mut StdinSnapshot,
    format: Option<Format>,
    opts: &ImportOptions,
) -> Result<LoadedInput> {
    let data = read_source(source, stdin)?;
    let format = infer_format(source, format, &data);
    let batch = format.parse(&data, &opts.parse_options())?;
    Ok(LoadedInput {
        label: source.label(),
        format,
        batch,
    })
}

#[derive(Debug, Default)]
pub struct RunOutput {
    pub records: Vec<Transaction>,
    /// Rows dropped as noise by the parsers, over all inputs.
    pub skipped_rows: usize,
    /// Extra inputs that failed to parse, with the reason.
    pub failed_inputs: Vec<(String, String)>,
}

/// Parse → merge → dedupe → enrich.
pub struct Pipeline {
    import: ImportOptions,
    consolidator: Consolidator,
    engine: RuleEngine,
}

impl Pipeline {
    pub fn new(import: ImportOptions, consolidate: ConsolidateOptions, engine: RuleEngine) -> Self {
        Self {
            import,
            consolidator: Consolidator::new(consolidate),
            engine,
        }
    }

    /// The primary input must parse. Extra inputs are always format-inferred
    /// and a failure there is logged and skipped.
    pub fn run(
        &self,
        primary: &InputSource,
        extras: &[InputSource],
        stdin: &mut StdinSnapshot,
    ) -> Result<RunOutput> {
        let mut output = RunOutput::default();

        let first = load(primary, stdin, self.import.format, &self.import)?;
        tracing::info!(
            "Parsed {} transactions from {} ({})",
            first.batch.records.len(),
            first.label,
            first.format
        );
        output.skipped_rows += first.batch.skipped;
        let mut datasets = vec![(first.label, first.batch.records)];

        for extra in extras {
            match load(extra, stdin, None, &self.import) {
                Ok(loaded) => {
                    tracing::info!(
                        "Merged {} ({} txns, type={})",
                        loaded.label,
                        loaded.batch.records.len(),
                        loaded.format
                    );
                    output.skipped_rows += loaded.batch.skipped;
                    datasets.push((loaded.label, loaded.batch.records));
                }
                Err(e) => {
                    tracing::warn!("Skipped {}: {e}", extra.label());
                    output.failed_inputs.push((extra.label(), e.to_string()));
                }
            }
        }

        let records = if datasets.len() > 1 {
            self.consolidator.merge(datasets)
        } else {
            datasets.pop().map(|(_, records)| records).unwrap_or_default()
        };
        let records = self.consolidator.dedupe(records);
        output.records = self.engine.apply_all(records);
        Ok(output)
    }
}

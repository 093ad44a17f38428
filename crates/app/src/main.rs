use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use folio_core::Money;
use folio_import::{Compliance, DedupeStrategy, Format};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Convert bank, card and ledger exports into Quicken-compatible CSV, QIF or Beancount."
)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse, merge, deduplicate, enrich and write transactions.
    Convert(ConvertArgs),
    /// Suggest category rules from an already categorised Quicken CSV.
    Learn(LearnArgs),
}

#[derive(Args)]
pub struct ConvertArgs {
    /// Statement file, or `-` for standard input.
    pub input: String,

    /// Account name stamped on every record.
    #[arg(short, long)]
    pub account: String,

    /// Output file, or `-` for standard output. Defaults to
    /// `<input>_quicken.<ext>` beside the input.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Input format; inferred from extension or content when omitted.
    #[arg(long)]
    pub input_type: Option<Format>,

    #[arg(long, value_enum)]
    pub delimiter: Option<Delimiter>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    pub output_format: OutputFormat,

    /// loose, standard or strict.
    #[arg(long, default_value = "standard")]
    pub compliance: Compliance,

    /// Currency for Beancount output when a record has none.
    #[arg(long, default_value = "USD")]
    pub beancount_currency: String,

    /// Split signed amounts into unsigned amount plus Debit/Credit.
    #[arg(long, conflicts_with = "force_signed")]
    pub auto_debitcredit: bool,

    /// Prefix unsigned amounts with `+`.
    #[arg(long)]
    pub force_signed: bool,

    /// JSON or TOML rule file.
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Inline `pattern=value` category rule; repeatable.
    #[arg(long)]
    pub category_rule: Vec<String>,

    /// Inline `pattern=value` tag rule; repeatable.
    #[arg(long)]
    pub tag_rule: Vec<String>,

    /// Inline filter pattern; repeatable.
    #[arg(long)]
    pub filter_rule: Vec<String>,

    #[arg(long)]
    pub fi_payee: Option<String>,

    /// Memo with `{Column}` placeholders, e.g. "{Payee} via {Account}".
    #[arg(long)]
    pub memo_template: Option<String>,

    #[arg(long)]
    pub no_default_rules: bool,

    #[arg(long)]
    pub no_default_category: bool,

    #[arg(long)]
    pub no_default_tag: bool,

    #[arg(long)]
    pub no_default_filter: bool,

    /// Additional inputs merged before processing.
    #[arg(long, num_args = 1..)]
    pub merge: Vec<String>,

    #[arg(long)]
    pub dedupe: bool,

    /// strict or fuzzy.
    #[arg(long, default_value = "strict")]
    pub dedupe_strategy: DedupeStrategy,

    /// Days two fuzzy duplicates may be apart.
    #[arg(long, default_value_t = 2)]
    pub max_date_drift: i64,

    /// Check totals after enrichment.
    #[arg(long)]
    pub reconcile: bool,

    /// Expected ending balance.
    #[arg(long, value_parser = parse_money)]
    pub reconcile_balance: Option<Money>,

    /// Quicken register CSV to compare against.
    #[arg(long)]
    pub reconcile_against: Option<PathBuf>,
}

#[derive(Args)]
pub struct LearnArgs {
    /// Quicken-format CSV with Payee and Category columns, or `-`.
    pub input: String,

    /// Print a JSON rule document instead of one rule per line.
    #[arg(long)]
    pub json: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum Delimiter {
    Comma,
    Tab,
}

impl Delimiter {
    pub fn byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Csv,
    Qif,
    Beancount,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Qif => "qif",
            OutputFormat::Beancount => "beancount",
        }
    }
}

fn parse_money(s: &str) -> Result<Money, String> {
    Money::parse(s).ok_or_else(|| format!("not an amount: '{s}'"))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Convert(args) => commands::convert(args),
        Command::Learn(args) => commands::learn(args),
    }
}

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use folio_import::delimited::read_quicken_csv;
use folio_import::{
    write_beancount, write_csv, write_qif, ConsolidateOptions, ImportOptions, InputSource,
    Pipeline, Polarity, Reconciler, Rule, RuleClass, RuleConfig, RuleEngine, RuleLearner,
    RuleOptions, StdinSnapshot,
};

use crate::{ConvertArgs, LearnArgs, OutputFormat};

fn rule_config(args: &ConvertArgs) -> Result<RuleConfig> {
    let mut config = match &args.rules {
        Some(path) => RuleConfig::load(path)
            .with_context(|| format!("loading rules from {}", path.display()))?,
        None => RuleConfig::default(),
    };
    for raw in &args.category_rule {
        config.push_inline(RuleClass::Category, Rule::parse_inline(raw)?);
    }
    for raw in &args.tag_rule {
        config.push_inline(RuleClass::Tag, Rule::parse_inline(raw)?);
    }
    for pattern in &args.filter_rule {
        config.push_inline(RuleClass::Filter, Rule::new(pattern, None));
    }
    Ok(config)
}

fn rule_options(args: &ConvertArgs) -> RuleOptions {
    let polarity = if args.force_signed {
        Polarity::ForceSigned
    } else if args.auto_debitcredit {
        Polarity::AutoDebitCredit
    } else {
        Polarity::PassThrough
    };
    RuleOptions {
        disable_defaults: args.no_default_rules,
        no_default_category: args.no_default_category,
        no_default_tag: args.no_default_tag,
        no_default_filter: args.no_default_filter,
        fi_payee: args.fi_payee.clone(),
        memo_template: args.memo_template.clone(),
        polarity,
    }
}

/// `None` means standard output.
fn output_path(args: &ConvertArgs) -> Option<PathBuf> {
    match args.output.as_deref() {
        Some("-") => None,
        Some(path) => Some(PathBuf::from(path)),
        None if args.input == "-" || args.input == "/dev/stdin" => None,
        None => {
            let input = Path::new(&args.input);
            let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
            Some(input.with_file_name(format!(
                "{stem}_quicken.{}",
                args.output_format.extension()
            )))
        }
    }
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("creating {}", p.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    })
}

pub fn convert(args: ConvertArgs) -> Result<()> {
    let engine = RuleEngine::new(rule_config(&args)?, rule_options(&args))?;
    let import = ImportOptions {
        account: args.account.clone(),
        format: args.input_type,
        delimiter: args.delimiter.map(|d| d.byte()),
    };
    let consolidate = ConsolidateOptions {
        dedupe: args.dedupe,
        strategy: args.dedupe_strategy,
        max_date_drift: args.max_date_drift,
    };
    let pipeline = Pipeline::new(import, consolidate, engine);

    let primary = InputSource::from_arg(&args.input);
    let extras: Vec<InputSource> = args.merge.iter().map(|m| InputSource::from_arg(m)).collect();
    let mut stdin = StdinSnapshot::new();
    let output = pipeline
        .run(&primary, &extras, &mut stdin)
        .with_context(|| format!("importing {}", primary.label()))?;

    if args.reconcile {
        let mut reconciler = Reconciler::new();
        if let Some(balance) = args.reconcile_balance {
            reconciler = reconciler.with_target(balance);
        }
        if let Some(path) = &args.reconcile_against {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading register {}", path.display()))?;
            reconciler = reconciler.with_register(read_quicken_csv(&text)?);
        }
        let report = reconciler.run(&output.records);
        match report.is_reconciled() {
            Some(true) => tracing::info!("Reconciled"),
            Some(false) => tracing::warn!("Not reconciled: difference detected"),
            None => {}
        }
        for missing in report.missing.iter().take(10) {
            tracing::warn!("  missing: {} {} {}", missing.date, missing.payee, missing.amount);
        }
    }

    let path = output_path(&args);
    let out = open_output(path.as_deref())?;
    let written = match args.output_format {
        OutputFormat::Csv => write_csv(&output.records, out, args.compliance)?,
        OutputFormat::Qif => write_qif(&output.records, out)?,
        OutputFormat::Beancount => write_beancount(&output.records, out, &args.beancount_currency)?,
    };
    let target = path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdout".to_string());
    tracing::info!("Wrote {written} transactions to {target}");
    Ok(())
}

pub fn learn(args: LearnArgs) -> Result<()> {
    let text = if args.input == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&args.input).with_context(|| format!("reading {}", args.input))?
    };

    let rules = RuleLearner::default().learn_csv(&text)?;
    let mut out = io::stdout().lock();
    if args.json {
        writeln!(out, "{}", RuleLearner::to_config(rules).to_json()?)?;
    } else {
        for rule in &rules {
            writeln!(
                out,
                "--category-rule \"{}={}\"",
                rule.pattern,
                rule.value.as_deref().unwrap_or_default()
            )?;
        }
    }
    Ok(())
}

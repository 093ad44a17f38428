use std::path::Path;

use folio_core::{DebitCredit, Transaction};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::re;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Invalid {class} rule pattern '{pattern}': {source}")]
    InvalidPattern {
        class: RuleClass,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Rule configuration error: {0}")]
    Config(String),
}

/// The three rule classes, each with its own match semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleClass {
    /// First match sets `Category`.
    Category,
    /// Every match contributes a `:`-joined tag.
    Tag,
    /// Any match drops the record.
    Filter,
}

impl std::fmt::Display for RuleClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RuleClass::Category => "category",
            RuleClass::Tag => "tag",
            RuleClass::Filter => "filter",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Rule {
    pub fn new(pattern: &str, value: Option<&str>) -> Self {
        Rule {
            pattern: pattern.to_string(),
            value: value.map(str::to_string),
        }
    }

    /// Parse a command-line `pattern=value` pair. The split is on the first
    /// `=`, so values may contain `=` but patterns may not.
    pub fn parse_inline(s: &str) -> Result<Self, RuleError> {
        let (pattern, value) = s
            .split_once('=')
            .ok_or_else(|| RuleError::Config(format!("expected pattern=value, got '{s}'")))?;
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(RuleError::Config(format!("empty pattern in '{s}'")));
        }
        Ok(Rule::new(pattern, Some(value.trim())))
    }
}

/// User rule document. A class key that is present, even as an empty list,
/// replaces that class's defaults; an absent key keeps them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Vec<Rule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<Vec<Rule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Vec<Rule>>,
}

const DEFAULT_CATEGORY_RULES: &[(&str, &str)] = &[
    (r"(?i)\bGROCERY\s*STORE|SUPERMARKET|FARMERS\s*MARKET|DISCOUNT\s*STORE|RETAIL\s*GROCERY", "Groceries"),
    (r"(?i)\bGAS\s*STATION|FUEL|PETROL|CAR\s*SUPPLIES|MOTOR\s*OIL|VEHICLE\s*MAINTENANCE", "Auto:Fuel"),
    (r"(?i)\bRIDE\s*SHARE|CAR\s*SERVICE|ON\s*DEMAND\s*TRANSPORT|TAXI|PUBLIC\s*TRANSPORT", "Transportation:Rideshare"),
    (r"(?i)\bELECTRICITY|WATER\s*BILL|GAS\s*BILL|TELECOMMUNICATIONS|INTERNET\s*SERVICE|UTILITY\s*BILL", "Utilities"),
    (r"(?i)\bONLINE\s*STORE|E-COMMERCE|RETAIL\s*STORE|TECH\s*STORE|HOME\s*IMPROVEMENT|FURNITURE\s*STORE", "Shopping:Online"),
    (r"(?i)\bRESTAURANT|FAST\s*FOOD|DINING\s*OUT|TAKEOUT|FOOD\s*DELIVERY|CATERING", "Dining:Restaurants"),
    (r"(?i)\bGYM|FITNESS\s*CENTER|HEALTH\s*CLUB|SPORTS\s*SUPPLIES|WELLNESS\s*SERVICE|PHARMACY", "Health:Fitness"),
    (r"(?i)\bAIRLINE|FLIGHT|HOTEL|VACATION\s*BOOKING|CAR\s*RENTAL|TRAVEL\s*SERVICE", "Travel:FlightsAndHotels"),
    (r"(?i)\bTAX\s*SERVICE|TAX\s*PREPARATION|FINANCIAL\s*ADVISOR|ACCOUNTING\s*SERVICE|FINANCIAL\s*PLANNER", "Taxes:TaxPrep"),
    (r"(?i)\bONLINE\s*LEARNING|EDUCATION\s*PLATFORM|COURSE\s*SUBSCRIPTION|TUTORING|CERTIFICATION\s*COURSES", "Education:Learning"),
    (r"(?i)\bSOFTWARE\s*SUBSCRIPTION|OFFICE\s*SUPPLIES|CLOUD\s*STORAGE|COLLABORATION\s*TOOLS|DOCUMENT\s*SHARING", "Office:Subscriptions"),
    (r"(?i)\bHOME\s*IMPROVEMENT|HARDWARE\s*STORE|PAINT\s*SUPPLIES|PLUMBING|ELECTRICAL\s*SUPPLIES|GARDENING\s*SUPPLIES", "Home:Improvement"),
    (r"(?i)\bDEPARTMENT\s*STORE|CLOTHING\s*STORE|CONSUMER\s*ELECTRONICS|HOUSEHOLD\s*ITEMS|CLEANING\s*SUPPLIES", "Shopping:DepartmentStores"),
    (r"(?i)\bPET\s*SUPPLIES|PET\s*STORE|ANIMAL\s*CARE|PET\s*FOOD|PET\s*ACCESSORIES", "Pets:PetSupplies"),
    (r"(?i)\bBANK|CREDIT\s*UNION|FINANCIAL\s*INSTITUTION|CHECKING\s*ACCOUNT|SAVINGS\s*ACCOUNT", "Banking:Deposits"),
];

const DEFAULT_TAG_RULES: &[(&str, &str)] = &[
    (r"(?i)\bSUBSCRIPTION|MONTHLY|AUTOPAY|RECURRING\s*CHARGES", "recurring"),
    (r"(?i)\bREFUND|CREDIT|REBATE|RETURN", "refund"),
    (r"(?i)\bGIFT\s*CARD|LOYALTY\s*POINTS|REWARD\s*POINTS", "gift"),
    (r"(?i)\bPAYMENT\s*PLAN|INSTALLMENT\s*PAYMENT", "payment_plan"),
];

/// Balance-statement lines, fees and internal transfers.
const DEFAULT_FILTER_RULES: &[&str] = &[
    r"(?i)\bBALANCE\s+AS\s+OF\b",
    r"(?i)\bFEE\b",
    r"(?i)\bTRANSFER\b",
];

impl RuleConfig {
    /// The built-in rule set.
    pub fn defaults() -> Self {
        let valued = |rules: &[(&str, &str)]| {
            rules
                .iter()
                .map(|(p, v)| Rule::new(p, Some(v)))
                .collect::<Vec<_>>()
        };
        RuleConfig {
            category: Some(valued(DEFAULT_CATEGORY_RULES)),
            tag: Some(valued(DEFAULT_TAG_RULES)),
            filter: Some(DEFAULT_FILTER_RULES.iter().map(|p| Rule::new(p, None)).collect()),
        }
    }

    pub fn from_json(content: &str) -> Result<Self, RuleError> {
        serde_json::from_str(content)
            .map_err(|e| RuleError::Config(format!("Failed to parse JSON: {e}")))
    }

    pub fn from_toml(content: &str) -> Result<Self, RuleError> {
        toml::from_str(content).map_err(|e| RuleError::Config(format!("Failed to parse TOML: {e}")))
    }

    pub fn to_json(&self) -> Result<String, RuleError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| RuleError::Config(format!("Failed to write JSON: {e}")))
    }

    /// Load a rule file, choosing the syntax by extension: `.toml` is TOML,
    /// anything else JSON.
    pub fn load(path: &Path) -> Result<Self, RuleError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RuleError::Config(format!("{}: {e}", path.display())))?;
        let is_toml = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    pub fn rules(&self, class: RuleClass) -> Option<&[Rule]> {
        match class {
            RuleClass::Category => self.category.as_deref(),
            RuleClass::Tag => self.tag.as_deref(),
            RuleClass::Filter => self.filter.as_deref(),
        }
    }

    fn rules_mut(&mut self, class: RuleClass) -> &mut Option<Vec<Rule>> {
        match class {
            RuleClass::Category => &mut self.category,
            RuleClass::Tag => &mut self.tag,
            RuleClass::Filter => &mut self.filter,
        }
    }

    /// Append an inline rule to its class, creating the class if needed.
    pub fn push_inline(&mut self, class: RuleClass, rule: Rule) {
        self.rules_mut(class).get_or_insert_with(Vec::new).push(rule);
    }
}

/// How the amount and Debit/Credit columns are finalised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Polarity {
    /// Leave the record's amount and flag as parsed.
    #[default]
    PassThrough,
    /// Unsigned positive amounts get an explicit `+`; the flag is cleared.
    ForceSigned,
    /// Amounts become unsigned, with the sign moved into Debit/Credit.
    AutoDebitCredit,
}

#[derive(Debug, Clone, Default)]
pub struct RuleOptions {
    pub disable_defaults: bool,
    pub no_default_category: bool,
    pub no_default_tag: bool,
    pub no_default_filter: bool,
    /// Overrides `FI Payee` on every record when set.
    pub fi_payee: Option<String>,
    /// `{Column}` placeholders are replaced with the record's values.
    pub memo_template: Option<String>,
    pub polarity: Polarity,
}

impl RuleOptions {
    fn wants_defaults(&self, class: RuleClass) -> bool {
        if self.disable_defaults {
            return false;
        }
        match class {
            RuleClass::Category => !self.no_default_category,
            RuleClass::Tag => !self.no_default_tag,
            RuleClass::Filter => !self.no_default_filter,
        }
    }
}

/// Internal pairing of a rule with its precompiled regex.
struct CompiledRule {
    rule: Rule,
    compiled_regex: Regex,
}

impl CompiledRule {
    fn compile(class: RuleClass, rule: Rule) -> Result<Self, RuleError> {
        if class != RuleClass::Filter && rule.value.is_none() {
            return Err(RuleError::Config(format!(
                "{class} rule '{}' has no value",
                rule.pattern
            )));
        }
        let compiled_regex =
            Regex::new(&rule.pattern).map_err(|source| RuleError::InvalidPattern {
                class,
                pattern: rule.pattern.clone(),
                source,
            })?;
        Ok(CompiledRule {
            rule,
            compiled_regex,
        })
    }

    fn is_match(&self, payee: &str) -> bool {
        self.compiled_regex.is_match(payee)
    }

    fn value(&self) -> &str {
        self.rule.value.as_deref().unwrap_or_default()
    }
}

/// Applies filter, category, tag, memo and polarity rules to one record at a
/// time. All patterns are compiled up front, so a bad pattern fails here and
/// never per record.
pub struct RuleEngine {
    category: Vec<CompiledRule>,
    tag: Vec<CompiledRule>,
    filter: Vec<CompiledRule>,
    options: RuleOptions,
}

impl RuleEngine {
    pub fn new(user: RuleConfig, options: RuleOptions) -> Result<Self, RuleError> {
        let defaults = RuleConfig::defaults();
        let merged = |class: RuleClass| -> Result<Vec<CompiledRule>, RuleError> {
            let user_rules = user.rules(class);
            let mut rules: Vec<Rule> = user_rules.map(<[Rule]>::to_vec).unwrap_or_default();
            if user_rules.is_none() && options.wants_defaults(class) {
                rules.extend(defaults.rules(class).unwrap_or_default().iter().cloned());
            }
            rules
                .into_iter()
                .map(|r| CompiledRule::compile(class, r))
                .collect()
        };
        let category = merged(RuleClass::Category)?;
        let tag = merged(RuleClass::Tag)?;
        let filter = merged(RuleClass::Filter)?;
        let engine = RuleEngine {
            category,
            tag,
            filter,
            options,
        };
        tracing::debug!(
            "Rule engine ready: {} category, {} tag, {} filter rules",
            engine.category.len(),
            engine.tag.len(),
            engine.filter.len()
        );
        Ok(engine)
    }

    /// Engine with only the built-in rules.
    pub fn with_defaults() -> Result<Self, RuleError> {
        Self::new(RuleConfig::default(), RuleOptions::default())
    }

    pub fn rule_count(&self, class: RuleClass) -> usize {
        match class {
            RuleClass::Category => self.category.len(),
            RuleClass::Tag => self.tag.len(),
            RuleClass::Filter => self.filter.len(),
        }
    }

    pub fn is_filtered(&self, payee: &str) -> bool {
        self.filter.iter().any(|r| r.is_match(payee))
    }

    pub fn find_category(&self, payee: &str) -> Option<&str> {
        self.category
            .iter()
            .find(|r| r.is_match(payee))
            .map(CompiledRule::value)
    }

    pub fn matching_tags(&self, payee: &str) -> Vec<&str> {
        self.tag
            .iter()
            .filter(|r| r.is_match(payee))
            .map(CompiledRule::value)
            .collect()
    }

    /// Enrich one record, or `None` when a filter rule drops it.
    pub fn apply(&self, mut tx: Transaction) -> Option<Transaction> {
        if self.is_filtered(&tx.payee) {
            tracing::debug!("Filtered out '{}'", tx.payee);
            return None;
        }

        if let Some(fi_payee) = &self.options.fi_payee {
            tx.fi_payee = fi_payee.clone();
        }
        if let Some(category) = self.find_category(&tx.payee) {
            tx.category = category.to_string();
        }
        let tags = self.matching_tags(&tx.payee);
        if !tags.is_empty() {
            tx.tag = tags.join(":");
        }
        if let Some(template) = &self.options.memo_template {
            tx.memo = render_template(template, &tx);
        }
        apply_polarity(&mut tx, self.options.polarity);
        Some(tx)
    }

    pub fn apply_all(&self, records: Vec<Transaction>) -> Vec<Transaction> {
        let before = records.len();
        let kept: Vec<Transaction> = records.into_iter().filter_map(|tx| self.apply(tx)).collect();
        tracing::info!(
            "Enriched {} records ({} filtered)",
            kept.len(),
            before - kept.len()
        );
        kept
    }
}

re!(re_placeholder, r"\{([^{}]+)\}");

/// Replace `{Column Name}` placeholders with the record's column values.
/// Names outside the schema are left as written.
pub fn render_template(template: &str, tx: &Transaction) -> String {
    re_placeholder()
        .replace_all(template, |caps: &regex::Captures| {
            tx.column(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

re!(re_plain_number, r"^\d+(\.\d*)?$");

fn apply_polarity(tx: &mut Transaction, polarity: Polarity) {
    let amount = tx.amount.trim().to_string();
    match polarity {
        Polarity::PassThrough => {}
        Polarity::ForceSigned => {
            if re_plain_number().is_match(&amount) {
                // Unsigned plus a Debit flag is an outflow.
                let sign = match tx.debit_credit {
                    Some(DebitCredit::Debit) => '-',
                    _ => '+',
                };
                tx.amount = format!("{sign}{amount}");
            } else {
                tx.amount = amount;
            }
            tx.debit_credit = None;
        }
        Polarity::AutoDebitCredit => {
            if let Some(unsigned) = amount.strip_prefix('-') {
                tx.amount = unsigned.to_string();
                tx.debit_credit = Some(DebitCredit::Debit);
            } else {
                tx.amount = amount.trim_start_matches('+').to_string();
                // An unsigned amount already split on an earlier pass keeps its flag.
                if amount.starts_with('+') || tx.debit_credit.is_none() {
                    tx.debit_credit = Some(DebitCredit::Credit);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::normalize_date;

    fn make_tx(payee: &str, amount: &str) -> Transaction {
        Transaction::new(normalize_date("01/15/2024"), payee, amount, "Checking")
    }

    fn engine(config: RuleConfig, options: RuleOptions) -> RuleEngine {
        RuleEngine::new(config, options).unwrap()
    }

    // ── defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn default_filter_drops_fee_lines() {
        let engine = RuleEngine::with_defaults().unwrap();
        assert!(engine.apply(make_tx("MONTHLY MAINTENANCE FEE", "-12.00")).is_none());
        assert!(engine.apply(make_tx("Online Transfer to SAV", "-100.00")).is_none());
        assert!(engine.apply(make_tx("Balance as of 01/31/2024", "0")).is_none());
        // Whole word only.
        assert!(engine.apply(make_tx("COFFEE SHOP", "-4.00")).is_some());
    }

    #[test]
    fn default_category_for_gas_station() {
        let engine = RuleEngine::with_defaults().unwrap();
        let tx = engine.apply(make_tx("SHELL GAS STATION #4521", "-40.00")).unwrap();
        assert_eq!(tx.category, "Auto:Fuel");
    }

    #[test]
    fn first_category_wins_and_tags_accumulate() {
        let engine = RuleEngine::with_defaults().unwrap();
        let tx = engine
            .apply(make_tx("SUPERMARKET REFUND MONTHLY", "5.00"))
            .unwrap();
        assert_eq!(tx.category, "Groceries");
        assert_eq!(tx.tag, "recurring:refund");
    }

    #[test]
    fn unmatched_record_keeps_prior_values() {
        let engine = RuleEngine::with_defaults().unwrap();
        let mut tx = make_tx("ACME WIDGETS", "-1.00");
        tx.category = "Business".to_string();
        tx.tag = "keep".to_string();
        tx.memo = "original".to_string();
        let out = engine.apply(tx).unwrap();
        assert_eq!(out.category, "Business");
        assert_eq!(out.tag, "keep");
        assert_eq!(out.memo, "original");
    }

    // ── merging ───────────────────────────────────────────────────────────────

    #[test]
    fn user_rules_come_before_defaults_of_absent_classes() {
        let config = RuleConfig {
            tag: Some(vec![Rule::new("(?i)shell", Some("car"))]),
            ..Default::default()
        };
        let engine = engine(config, RuleOptions::default());
        assert_eq!(engine.rule_count(RuleClass::Tag), 1);
        assert_eq!(
            engine.rule_count(RuleClass::Category),
            DEFAULT_CATEGORY_RULES.len()
        );
        let tx = engine.apply(make_tx("SHELL GAS STATION", "-3.00")).unwrap();
        assert_eq!(tx.tag, "car");
        assert_eq!(tx.category, "Auto:Fuel");
    }

    #[test]
    fn present_but_empty_class_suppresses_its_defaults() {
        let config = RuleConfig::from_json(r#"{"filter": []}"#).unwrap();
        let engine = engine(config, RuleOptions::default());
        assert!(engine.apply(make_tx("MONTHLY FEE", "-1.00")).is_some());
    }

    #[test]
    fn disable_flags() {
        let all_off = RuleOptions {
            disable_defaults: true,
            ..Default::default()
        };
        let e = engine(RuleConfig::default(), all_off);
        assert_eq!(e.rule_count(RuleClass::Category), 0);
        assert_eq!(e.rule_count(RuleClass::Filter), 0);

        let no_filter = RuleOptions {
            no_default_filter: true,
            ..Default::default()
        };
        let e = engine(RuleConfig::default(), no_filter);
        assert_eq!(e.rule_count(RuleClass::Filter), 0);
        assert_eq!(e.rule_count(RuleClass::Tag), DEFAULT_TAG_RULES.len());
    }

    #[test]
    fn inline_rules() {
        let rule = Rule::parse_inline(r"(?i)\bSHELL = Auto:Gas=Station").unwrap();
        assert_eq!(rule.pattern, r"(?i)\bSHELL");
        assert_eq!(rule.value.as_deref(), Some("Auto:Gas=Station"));
        assert!(Rule::parse_inline("no separator").is_err());
        assert!(Rule::parse_inline("=value").is_err());

        let mut config = RuleConfig::default();
        config.push_inline(RuleClass::Category, rule);
        assert_eq!(config.category.as_ref().map(Vec::len), Some(1));
    }

    // ── configuration ─────────────────────────────────────────────────────────

    #[test]
    fn json_and_toml_documents() {
        let json = r#"{"category": [{"pattern": "(?i)netflix", "value": "Fun"}],
                       "filter": [{"pattern": "PENDING"}]}"#;
        let config = RuleConfig::from_json(json).unwrap();
        assert_eq!(config.category.as_ref().unwrap()[0].value.as_deref(), Some("Fun"));
        assert_eq!(config.filter.as_ref().unwrap()[0].value, None);
        assert!(config.tag.is_none());

        let toml = r#"
[[category]]
pattern = "(?i)netflix"
value = "Fun"
"#;
        assert_eq!(RuleConfig::from_toml(toml).unwrap().category, config.category);
        assert!(matches!(
            RuleConfig::from_json("{not json"),
            Err(RuleError::Config(_))
        ));
    }

    #[test]
    fn load_picks_syntax_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("rules.toml");
        std::fs::write(&toml_path, "[[tag]]\npattern = \"X\"\nvalue = \"x\"\n").unwrap();
        assert!(RuleConfig::load(&toml_path).unwrap().tag.is_some());

        let json_path = dir.path().join("rules.rules");
        std::fs::write(&json_path, r#"{"tag": []}"#).unwrap();
        assert_eq!(RuleConfig::load(&json_path).unwrap().tag, Some(vec![]));
    }

    #[test]
    fn invalid_pattern_fails_at_load() {
        let config = RuleConfig {
            category: Some(vec![Rule::new("(unclosed", Some("X"))]),
            ..Default::default()
        };
        let err = RuleEngine::new(config, RuleOptions::default()).err().unwrap();
        assert!(matches!(
            err,
            RuleError::InvalidPattern {
                class: RuleClass::Category,
                ..
            }
        ));
    }

    #[test]
    fn valued_classes_require_values() {
        let config = RuleConfig {
            tag: Some(vec![Rule::new("X", None)]),
            ..Default::default()
        };
        assert!(matches!(
            RuleEngine::new(config, RuleOptions::default()),
            Err(RuleError::Config(_))
        ));
    }

    // ── record rewriting ──────────────────────────────────────────────────────

    #[test]
    fn fi_payee_and_memo_template() {
        let options = RuleOptions {
            fi_payee: Some("BOFA".to_string()),
            memo_template: Some("{Payee} via {Account} {Unknown}".to_string()),
            ..Default::default()
        };
        let e = engine(RuleConfig::default(), options);
        let tx = e.apply(make_tx("ACME", "-1.00")).unwrap();
        assert_eq!(tx.fi_payee, "BOFA");
        assert_eq!(tx.memo, "ACME via Checking {Unknown}");
    }

    #[test]
    fn force_signed_polarity() {
        let mut tx = make_tx("A", "45.00");
        tx.debit_credit = Some(DebitCredit::Credit);
        apply_polarity(&mut tx, Polarity::ForceSigned);
        assert_eq!(tx.amount, "+45.00");
        assert_eq!(tx.debit_credit, None);

        let mut tx = make_tx("A", "-45.00");
        apply_polarity(&mut tx, Polarity::ForceSigned);
        assert_eq!(tx.amount, "-45.00");
    }

    #[test]
    fn force_signed_keeps_flagged_outflows_negative() {
        let mut tx = make_tx("SAFEWAY", "45.23");
        tx.debit_credit = Some(DebitCredit::Debit);
        let before = tx.signed_money();

        let e = engine(
            RuleConfig::default(),
            RuleOptions {
                polarity: Polarity::ForceSigned,
                ..Default::default()
            },
        );
        let once = e.apply(tx).unwrap();
        assert_eq!(once.amount, "-45.23");
        assert_eq!(once.debit_credit, None);
        assert_eq!(once.signed_money(), before);
        assert_eq!(e.apply(once.clone()).unwrap(), once);
    }

    #[test]
    fn auto_debit_credit_polarity() {
        let mut tx = make_tx("A", "-45.00");
        apply_polarity(&mut tx, Polarity::AutoDebitCredit);
        assert_eq!(tx.amount, "45.00");
        assert_eq!(tx.debit_credit, Some(DebitCredit::Debit));

        let mut tx = make_tx("A", "+7.00");
        apply_polarity(&mut tx, Polarity::AutoDebitCredit);
        assert_eq!(tx.amount, "7.00");
        assert_eq!(tx.debit_credit, Some(DebitCredit::Credit));
    }

    #[test]
    fn pass_through_leaves_record_alone() {
        let mut tx = make_tx("A", "45.00");
        tx.debit_credit = Some(DebitCredit::Debit);
        apply_polarity(&mut tx, Polarity::PassThrough);
        assert_eq!(tx.amount, "45.00");
        assert_eq!(tx.debit_credit, Some(DebitCredit::Debit));
    }

    #[test]
    fn enrichment_is_idempotent() {
        for polarity in [
            Polarity::PassThrough,
            Polarity::ForceSigned,
            Polarity::AutoDebitCredit,
        ] {
            let options = RuleOptions {
                polarity,
                memo_template: Some("{Payee}".to_string()),
                ..Default::default()
            };
            let e = engine(RuleConfig::default(), options);
            let once = e.apply(make_tx("SHELL GAS STATION AUTOPAY", "-40.00")).unwrap();
            let twice = e.apply(once.clone()).unwrap();
            assert_eq!(once, twice, "{polarity:?}");
            assert_eq!(twice.category, "Auto:Fuel");
            assert_eq!(twice.tag, "recurring");
        }
    }
}

use std::collections::BTreeSet;

use folio_core::Transaction;

use crate::delimited::read_quicken_csv;
use crate::error::Result;
use crate::rules::{Rule, RuleConfig};
use crate::util::{re, similarity_ratio};

re!(re_digits_hash, r"[\d#]+");
re!(re_not_word, r"[^A-Za-z\s&]");
re!(re_spaces, r"\s+");

/// Suggests category rules from records that are already categorised.
/// Never mutates anything; the caller decides what to do with the output.
#[derive(Debug, Clone)]
pub struct RuleLearner {
    /// Smallest cluster that yields a rule.
    pub min_support: usize,
    /// Payees closer than this (edit-distance ratio) share a cluster.
    pub similarity_threshold: f32,
}

impl Default for RuleLearner {
    fn default() -> Self {
        Self {
            min_support: 2,
            similarity_threshold: 0.75,
        }
    }
}

/// Strip store numbers and punctuation: `"Shell #4521, Inc."` → `"SHELL INC"`.
pub fn normalize_payee(name: &str) -> String {
    let n = re_digits_hash().replace_all(name, "");
    let n = re_not_word().replace_all(&n, " ");
    re_spaces().replace_all(&n, " ").trim().to_uppercase()
}

impl RuleLearner {
    fn cluster(&self, names: &[String]) -> Vec<Vec<String>> {
        let mut clusters: Vec<Vec<String>> = Vec::new();
        for name in names {
            let home = clusters.iter_mut().find(|c| {
                c.iter()
                    .any(|member| similarity_ratio(name, member) > self.similarity_threshold)
            });
            match home {
                Some(cluster) => cluster.push(name.clone()),
                None => clusters.push(vec![name.clone()]),
            }
        }
        clusters
    }

    /// Longest token longer than two characters shared by every member.
    /// Ties go to the alphabetically first token.
    fn common_token(cluster: &[String]) -> Option<String> {
        let (first, rest) = cluster.split_first()?;
        let mut common: BTreeSet<&str> = first.split_whitespace().collect();
        for name in rest {
            let tokens: BTreeSet<&str> = name.split_whitespace().collect();
            common.retain(|t| tokens.contains(t));
        }
        common
            .into_iter()
            .filter(|t| t.len() > 2)
            .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| b.cmp(a)))
            .map(str::to_string)
    }

    pub fn learn(&self, records: &[Transaction]) -> Vec<Rule> {
        let mut groups: Vec<(String, Vec<String>)> = Vec::new();
        for tx in records {
            let (category, payee) = (tx.category.trim(), tx.payee.trim());
            if category.is_empty() || payee.is_empty() {
                continue;
            }
            let normalized = normalize_payee(payee);
            match groups.iter_mut().find(|(c, _)| c == category) {
                Some((_, payees)) => payees.push(normalized),
                None => groups.push((category.to_string(), vec![normalized])),
            }
        }

        let mut rules = Vec::new();
        for (category, payees) in &groups {
            for cluster in self.cluster(payees) {
                if cluster.len() < self.min_support {
                    continue;
                }
                if let Some(token) = Self::common_token(&cluster) {
                    let pattern = format!(r"(?i)\b{}(?:\b|[- ])?", regex::escape(&token));
                    rules.push(Rule::new(&pattern, Some(category)));
                }
            }
        }

        if rules.is_empty() {
            tracing::warn!("No rules learned; the input needs Payee and Category columns");
        } else {
            tracing::info!("{} category rules suggested", rules.len());
        }
        rules
    }

    /// Learn from a Quicken-format CSV.
    pub fn learn_csv(&self, text: &str) -> Result<Vec<Rule>> {
        Ok(self.learn(&read_quicken_csv(text)?))
    }

    /// Learned rules as a document `RuleConfig::from_json` reads back.
    pub fn to_config(rules: Vec<Rule>) -> RuleConfig {
        RuleConfig {
            category: Some(rules),
            ..Default::default()
        }
    }
}

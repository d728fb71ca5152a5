//! Rule evaluation for rules-mode routing
//!
//! Walks an ordered rule list against a record's left operand and reports
//! every target channel that should receive the record.

use crate::config::{DataType, MatchStrategy, RuleEntry};
use crate::resolver::normalize;
use crate::router::operator::Operator;
use crate::router::pattern::PatternCache;
use crate::value::ScalarValue;
use crate::Result;

/// Rule evaluator bound to one data type and match strategy
///
/// Regex patterns are compiled once per evaluator and reused for every
/// record it sees.
#[derive(Debug, Clone)]
pub struct RuleEvaluator {
    data_type: DataType,
    match_strategy: MatchStrategy,
    patterns: PatternCache,
}

impl RuleEvaluator {
    /// Create a new rule evaluator
    pub fn new(data_type: DataType, match_strategy: MatchStrategy) -> Self {
        Self {
            data_type,
            match_strategy,
            patterns: PatternCache::new(),
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn match_strategy(&self) -> MatchStrategy {
        self.match_strategy
    }

    pub fn patterns(&self) -> &PatternCache {
        &self.patterns
    }

    /// Evaluate one rule against a normalized left operand
    ///
    /// The right operand is normalized the same way as the left one. When
    /// `case_insensitive` is set, string rules other than regex rules compare
    /// lowercased text.
    pub fn evaluate_rule(
        &self,
        rule: &RuleEntry,
        left: &ScalarValue,
        case_insensitive: bool,
    ) -> Result<bool> {
        let name = rule.operation_name(self.data_type);
        let regex = Operator::is_regex_name(name, self.data_type);
        let right = normalize(self.data_type, rule.right_value(self.data_type, regex))?;

        let operator = Operator::parse(name, self.data_type)?;

        let matched = if self.data_type == DataType::String && case_insensitive && !regex {
            operator.evaluate_cached(&left.folded(), &right.folded(), &self.patterns)
        } else {
            operator.evaluate_cached(left, &right, &self.patterns)
        };

        tracing::trace!("Rule {} {} -> {}", operator, right, matched);

        Ok(matched)
    }

    /// Walk the rules in order, calling `on_match` with each matching rule's
    /// floored target
    ///
    /// Under [`MatchStrategy::First`] the walk stops after the first match.
    /// An error from a rule or from `on_match` ends the walk. Returns whether
    /// any rule matched.
    pub fn walk<F>(
        &self,
        rules: &[RuleEntry],
        left: &ScalarValue,
        case_insensitive: bool,
        mut on_match: F,
    ) -> Result<bool>
    where
        F: FnMut(f64) -> Result<()>,
    {
        let mut matched = false;

        for rule in rules {
            if !self.evaluate_rule(rule, left, case_insensitive)? {
                continue;
            }

            on_match(rule.target())?;
            matched = true;

            if self.match_strategy == MatchStrategy::First {
                break;
            }
        }

        Ok(matched)
    }

    /// Targets of every rule the left operand matches, in walk order
    pub fn matching_targets(
        &self,
        rules: &[RuleEntry],
        left: &ScalarValue,
        case_insensitive: bool,
    ) -> Result<Vec<f64>> {
        let mut targets = Vec::new();
        self.walk(rules, left, case_insensitive, |target| {
            targets.push(target);
            Ok(())
        })?;
        Ok(targets)
    }
}

impl Default for RuleEvaluator {
    fn default() -> Self {
        Self::new(DataType::default(), MatchStrategy::default())
    }
}

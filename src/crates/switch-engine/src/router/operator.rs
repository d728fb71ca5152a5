//! Comparison operators, one closed set per data type

use crate::config::DataType;
use crate::router::pattern::{compile_pattern, test_pattern, PatternCache};
use crate::value::ScalarValue;
use crate::{Result, SwitchError};
use fancy_regex::Regex;
use std::fmt;
use std::sync::Arc;

/// Operators available to boolean rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOperator {
    Equal,
    NotEqual,
}

/// Operators available to date-time rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeOperator {
    After,
    Before,
}

/// Operators available to number rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberOperator {
    Equal,
    NotEqual,
    Smaller,
    SmallerEqual,
    Larger,
    LargerEqual,
}

/// Operators available to string rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringOperator {
    Equal,
    NotEqual,
    Contains,
    NotContains,
    StartsWith,
    NotStartsWith,
    EndsWith,
    NotEndsWith,
    Regex,
    NotRegex,
}

/// A comparison operator bound to its data type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Boolean(BooleanOperator),
    DateTime(DateTimeOperator),
    Number(NumberOperator),
    String(StringOperator),
}

impl Operator {
    /// Look up an operator by name within a data type's set
    pub fn parse(name: &str, data_type: DataType) -> Result<Self> {
        let operator = match data_type {
            DataType::Boolean => match name {
                "equal" => Some(Operator::Boolean(BooleanOperator::Equal)),
                "notEqual" => Some(Operator::Boolean(BooleanOperator::NotEqual)),
                _ => None,
            },
            DataType::DateTime => match name {
                "after" => Some(Operator::DateTime(DateTimeOperator::After)),
                "before" => Some(Operator::DateTime(DateTimeOperator::Before)),
                _ => None,
            },
            DataType::Number => {
                use NumberOperator::*;
                match name {
                    "equal" => Some(Equal),
                    "notEqual" => Some(NotEqual),
                    "smaller" => Some(Smaller),
                    "smallerEqual" => Some(SmallerEqual),
                    "larger" => Some(Larger),
                    "largerEqual" => Some(LargerEqual),
                    _ => None,
                }
                .map(Operator::Number)
            }
            DataType::String => {
                use StringOperator::*;
                match name {
                    "equal" => Some(Equal),
                    "notEqual" => Some(NotEqual),
                    "contains" => Some(Contains),
                    "notContains" => Some(NotContains),
                    "startsWith" => Some(StartsWith),
                    "notStartsWith" => Some(NotStartsWith),
                    "endsWith" => Some(EndsWith),
                    "notEndsWith" => Some(NotEndsWith),
                    "regex" | "regexMatch" => Some(Regex),
                    "notRegex" | "regexNotMatch" => Some(NotRegex),
                    _ => None,
                }
                .map(Operator::String)
            }
        };

        operator.ok_or_else(|| SwitchError::UnknownOperator {
            operation: name.to_string(),
            data_type,
        })
    }

    /// Whether a rule with this operation name on this data type reads its
    /// right value from `pattern` and skips case folding
    pub fn is_regex_name(name: &str, data_type: DataType) -> bool {
        data_type == DataType::String
            && matches!(name, "regex" | "regexMatch" | "notRegex" | "regexNotMatch")
    }

    pub fn is_regex(&self) -> bool {
        matches!(
            self,
            Operator::String(StringOperator::Regex | StringOperator::NotRegex)
        )
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Operator::Boolean(_) => DataType::Boolean,
            Operator::DateTime(_) => DataType::DateTime,
            Operator::Number(_) => DataType::Number,
            Operator::String(_) => DataType::String,
        }
    }

    /// Canonical operation name
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Boolean(BooleanOperator::Equal)
            | Operator::Number(NumberOperator::Equal)
            | Operator::String(StringOperator::Equal) => "equal",
            Operator::Boolean(BooleanOperator::NotEqual)
            | Operator::Number(NumberOperator::NotEqual)
            | Operator::String(StringOperator::NotEqual) => "notEqual",
            Operator::DateTime(DateTimeOperator::After) => "after",
            Operator::DateTime(DateTimeOperator::Before) => "before",
            Operator::Number(NumberOperator::Smaller) => "smaller",
            Operator::Number(NumberOperator::SmallerEqual) => "smallerEqual",
            Operator::Number(NumberOperator::Larger) => "larger",
            Operator::Number(NumberOperator::LargerEqual) => "largerEqual",
            Operator::String(StringOperator::Contains) => "contains",
            Operator::String(StringOperator::NotContains) => "notContains",
            Operator::String(StringOperator::StartsWith) => "startsWith",
            Operator::String(StringOperator::NotStartsWith) => "notStartsWith",
            Operator::String(StringOperator::EndsWith) => "endsWith",
            Operator::String(StringOperator::NotEndsWith) => "notEndsWith",
            Operator::String(StringOperator::Regex) => "regex",
            Operator::String(StringOperator::NotRegex) => "notRegex",
        }
    }

    /// Apply the operator to two normalized operands
    ///
    /// Never fails: ordering operators read non-numeric operands as zero and
    /// regex operators treat an unusable pattern as "no match".
    pub fn evaluate(&self, left: &ScalarValue, right: &ScalarValue) -> bool {
        self.apply(left, right, &|raw: &str| compile_pattern(raw).map(Arc::new))
    }

    /// Same as [`evaluate`](Operator::evaluate), reusing patterns compiled
    /// earlier in `patterns`
    pub fn evaluate_cached(
        &self,
        left: &ScalarValue,
        right: &ScalarValue,
        patterns: &PatternCache,
    ) -> bool {
        self.apply(left, right, &|raw: &str| patterns.get_or_compile(raw))
    }

    fn apply(&self, left: &ScalarValue, right: &ScalarValue, compile: &CompileFn<'_>) -> bool {
        match self {
            Operator::Boolean(BooleanOperator::Equal) => left == right,
            Operator::Boolean(BooleanOperator::NotEqual) => left != right,
            Operator::DateTime(op) => {
                let (l, r) = (left.to_number(), right.to_number());
                match op {
                    DateTimeOperator::After => l > r,
                    DateTimeOperator::Before => l < r,
                }
            }
            Operator::Number(op) => evaluate_number(*op, left, right),
            Operator::String(op) => evaluate_string(*op, left, right, compile),
        }
    }
}

type CompileFn<'a> = dyn Fn(&str) -> Option<Arc<Regex>> + 'a;

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn evaluate_number(op: NumberOperator, left: &ScalarValue, right: &ScalarValue) -> bool {
    match op {
        NumberOperator::Equal => left == right,
        NumberOperator::NotEqual => left != right,
        ordering => {
            let (l, r) = (left.coerce_number(), right.coerce_number());
            match ordering {
                NumberOperator::Smaller => l < r,
                NumberOperator::SmallerEqual => l <= r,
                NumberOperator::Larger => l > r,
                _ => l >= r,
            }
        }
    }
}

fn evaluate_string(
    op: StringOperator,
    left: &ScalarValue,
    right: &ScalarValue,
    compile: &CompileFn<'_>,
) -> bool {
    let regex_test = || {
        compile(&right.as_text()).and_then(|regex| test_pattern(&regex, &left.as_text()))
    };

    match op {
        StringOperator::Equal => left == right,
        StringOperator::NotEqual => left != right,
        // An unusable pattern matches nothing
        StringOperator::Regex => regex_test().unwrap_or(false),
        StringOperator::NotRegex => regex_test().map(|m| !m).unwrap_or(true),
        text_op => {
            let (l, r) = (left.as_text(), right.as_text());
            match text_op {
                StringOperator::Contains => l.contains(&r),
                StringOperator::NotContains => !l.contains(&r),
                StringOperator::StartsWith => l.starts_with(&r),
                StringOperator::NotStartsWith => !l.starts_with(&r),
                StringOperator::EndsWith => l.ends_with(&r),
                _ => !l.ends_with(&r),
            }
        }
    }
}

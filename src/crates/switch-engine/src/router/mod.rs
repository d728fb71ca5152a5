//! Router module: operator table, rule walking and per-record dispatch

pub mod dispatch;
pub mod evaluator;
pub mod operator;
pub mod pattern;

pub use dispatch::{Dispatcher, Placement};
pub use evaluator::RuleEvaluator;
pub use operator::{BooleanOperator, DateTimeOperator, NumberOperator, Operator, StringOperator};
pub use pattern::{compile_pattern, test_pattern, PatternCache, PatternSource, RegexFlags};

//! Per-record dispatch
//!
//! Decides which channel(s) a single record lands in and appends it there.
//! Batch-wide settings come from the [`RoutingConfig`]; the fields a host
//! may vary per record are read with the record's item index.

use crate::channel::{Channels, Record};
use crate::config::{params, parse_rule_list, Mode, RoutingConfig, DROP_FALLBACK};
use crate::host::ParameterHost;
use crate::resolver::normalize;
use crate::router::evaluator::RuleEvaluator;
use crate::value::ScalarValue;
use crate::{DataType, Result};
use serde_json::Value;

/// Where a record ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Appended to these channels, in append order
    Routed(Vec<usize>),
    /// Matched nothing and the fallback drops it
    Dropped,
}

impl Placement {
    pub fn channels(&self) -> &[usize] {
        match self {
            Placement::Routed(channels) => channels,
            Placement::Dropped => &[],
        }
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, Placement::Dropped)
    }
}

/// Dispatcher for one batch
pub struct Dispatcher<'a> {
    config: &'a RoutingConfig,
    host: &'a dyn ParameterHost,
    evaluator: RuleEvaluator,
}

impl<'a> Dispatcher<'a> {
    /// Create a dispatcher from the resolved batch configuration
    pub fn new(config: &'a RoutingConfig, host: &'a dyn ParameterHost) -> Self {
        Self {
            config,
            host,
            evaluator: RuleEvaluator::new(config.data_type(), config.match_strategy()),
        }
    }

    /// Route one record into `channels`
    ///
    /// On error the record may already sit in channels appended before the
    /// failing step.
    pub fn dispatch(
        &self,
        record: &Record,
        item_index: usize,
        channels: &mut Channels,
    ) -> Result<Placement> {
        let placement = match self.config.mode() {
            Mode::Expression => self.dispatch_expression(record, item_index, channels)?,
            Mode::Rules => self.dispatch_rules(record, item_index, channels)?,
        };

        match &placement {
            Placement::Routed(targets) => {
                tracing::debug!("Item {} routed to channels {:?}", item_index, targets)
            }
            Placement::Dropped => tracing::debug!("Item {} dropped", item_index),
        }

        Ok(placement)
    }

    fn dispatch_expression(
        &self,
        record: &Record,
        item_index: usize,
        channels: &mut Channels,
    ) -> Result<Placement> {
        let target = self
            .read_number(params::EXPRESSION_OUTPUT, item_index)?
            .unwrap_or(0.0)
            .floor();

        // NaN fails both bounds checks and is rejected by `push`
        if target < 0.0 || target >= channels.count() as f64 {
            return self.apply_fallback(record, item_index, channels);
        }

        let slot = channels.push(target, record.clone())?;
        Ok(Placement::Routed(vec![slot]))
    }

    fn dispatch_rules(
        &self,
        record: &Record,
        item_index: usize,
        channels: &mut Channels,
    ) -> Result<Placement> {
        let data_type = self.config.data_type();

        let raw_left = self
            .host
            .parameter(data_type.left_parameter(), item_index)?
            .map(ScalarValue::from)
            .unwrap_or_else(|| data_type.default_value());
        let left = normalize(data_type, raw_left)?;

        let rules = parse_rule_list(
            data_type.rules_parameter(),
            self.host.parameter(data_type.rules_parameter(), item_index)?,
        )?;

        let case_insensitive = match data_type {
            DataType::String => self.read_case_insensitive(item_index)?,
            _ => false,
        };

        let mut routed = Vec::new();
        let matched = self
            .evaluator
            .walk(&rules, &left, case_insensitive, |target| {
                routed.push(channels.push(target, record.clone())?);
                Ok(())
            })?;

        if !matched {
            return self.apply_fallback(record, item_index, channels);
        }

        Ok(Placement::Routed(routed))
    }

    /// Send an unrouted record to the fallback channel, or drop it
    fn apply_fallback(
        &self,
        record: &Record,
        item_index: usize,
        channels: &mut Channels,
    ) -> Result<Placement> {
        let fallback = self
            .read_number(params::FALLBACK_OUTPUT, item_index)?
            .unwrap_or(DROP_FALLBACK);

        if fallback == DROP_FALLBACK {
            return Ok(Placement::Dropped);
        }

        let slot = channels.push(fallback.floor(), record.clone())?;
        Ok(Placement::Routed(vec![slot]))
    }

    fn read_number(&self, name: &str, item_index: usize) -> Result<Option<f64>> {
        Ok(match self.host.parameter(name, item_index)? {
            None | Some(Value::Null) => None,
            Some(value) => Some(ScalarValue::from(value).to_number()),
        })
    }

    fn read_case_insensitive(&self, item_index: usize) -> Result<bool> {
        Ok(match self.host.parameter(params::CASE_INSENSITIVE, item_index)? {
            Some(Value::Bool(flag)) => flag,
            Some(Value::String(s)) => !matches!(s.trim(), "false" | "0" | ""),
            _ => true,
        })
    }
}
